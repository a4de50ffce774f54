//! Line-oriented console commands, one per stdin line.

use std::fmt;

use promptdj::prelude::*;

pub const HELP: &str = "\
commands:
  play                    toggle playback
  learn <slot>            wait for the next CC on a slot (panel shown)
  toggle <slot>           toggle learn mode on a slot (panel shown)
  weight <slot> <0..2>    set a slot's weight
  text <slot> <words>     set a slot's prompt text
  midi show|hide          show or hide the MIDI panel
  device <id>|none        select the active MIDI input
  refresh                 re-scan MIDI devices
  help                    this text
  quit                    exit";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Input(Input),
    Help,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CommandError {
    Empty,
    Unknown(String),
    MissingArgument(&'static str),
    InvalidSlot(String),
    InvalidWeight(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty command"),
            Self::Unknown(word) => write!(f, "unknown command '{}'", word),
            Self::MissingArgument(name) => write!(f, "missing {}", name),
            Self::InvalidSlot(raw) => {
                write!(f, "slot must be 0..{}, got '{}'", SLOT_COUNT - 1, raw)
            }
            Self::InvalidWeight(raw) => write!(f, "invalid weight '{}'", raw),
        }
    }
}

impl std::error::Error for CommandError {}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Err(CommandError::Empty);
    };

    let input = match head.to_lowercase().as_str() {
        "play" | "pause" => Input::PlayPause,
        "learn" => Input::RequestLearn(slot(words.next())?),
        "toggle" => Input::ToggleLearn(slot(words.next())?),
        "weight" => {
            let id = slot(words.next())?;
            let raw = words
                .next()
                .ok_or(CommandError::MissingArgument("weight"))?;
            let weight = raw
                .parse::<f32>()
                .map_err(|_| CommandError::InvalidWeight(raw.to_string()))?;
            Input::EditWeight(id, weight)
        }
        "text" => {
            let id = slot(words.next())?;
            Input::EditText(id, after_words(line, 2).to_string())
        }
        "midi" => match words.next() {
            Some("show") => Input::SetMidiPanelVisible(true),
            Some("hide") => Input::SetMidiPanelVisible(false),
            _ => return Err(CommandError::MissingArgument("show|hide")),
        },
        "device" => match words.next() {
            Some("none") => Input::SelectMidiDevice(None),
            Some(id) => Input::SelectMidiDevice(Some(DeviceId::new(id))),
            None => return Err(CommandError::MissingArgument("device id")),
        },
        "refresh" => Input::RefreshMidiDevices,
        "quit" | "exit" => Input::Quit,
        "help" | "?" => return Ok(Command::Help),
        other => return Err(CommandError::Unknown(other.to_string())),
    };

    Ok(Command::Input(input))
}

fn slot(word: Option<&str>) -> Result<PromptId, CommandError> {
    let raw = word.ok_or(CommandError::MissingArgument("slot"))?;
    match raw.parse::<usize>() {
        Ok(index) if index < SLOT_COUNT => Ok(PromptId::for_slot(index)),
        _ => Err(CommandError::InvalidSlot(raw.to_string())),
    }
}

/// The line past its first `count` words, with inner spacing intact.
fn after_words(line: &str, count: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_slot_commands() {
        assert_eq!(
            parse("weight 3 1.5"),
            Ok(Command::Input(Input::EditWeight(PromptId::for_slot(3), 1.5)))
        );
        assert_eq!(
            parse("learn 0"),
            Ok(Command::Input(Input::RequestLearn(PromptId::for_slot(0))))
        );
    }

    #[test]
    fn text_keeps_rest_of_line_verbatim() {
        assert_eq!(
            parse("text 2   Dark   Ambient  "),
            Ok(Command::Input(Input::EditText(
                PromptId::for_slot(2),
                "Dark   Ambient  ".to_string()
            )))
        );
        assert_eq!(
            parse("text 4"),
            Ok(Command::Input(Input::EditText(
                PromptId::for_slot(4),
                String::new()
            )))
        );
    }

    #[test]
    fn rejects_out_of_range_slot() {
        assert_eq!(
            parse("toggle 16"),
            Err(CommandError::InvalidSlot("16".to_string()))
        );
        assert_eq!(
            parse("weight 1"),
            Err(CommandError::MissingArgument("weight"))
        );
    }

    #[test]
    fn device_none_clears_selection() {
        assert_eq!(
            parse("device none"),
            Ok(Command::Input(Input::SelectMidiDevice(None)))
        );
        assert_eq!(parse("   "), Err(CommandError::Empty));
        assert_eq!(parse("QUIT"), Ok(Command::Input(Input::Quit)));
    }
}
