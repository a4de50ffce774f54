use std::fmt;
use std::sync::mpsc;
use std::sync::mpsc::{Receiver, Sender};

use super::orchestrator::{ClientEvent, PlaybackState};
use crate::control::{BindingState, Prompt, PromptId, PromptSnapshot};
use crate::io::midi::{DeviceId, RawMidiMessage};

/// Everything that mutates the app, funneled onto one queue and handled in
/// arrival order.
#[derive(Clone, Debug, PartialEq)]
pub enum Input {
    Midi(RawMidiMessage),
    RefreshMidiDevices,
    SelectMidiDevice(Option<DeviceId>),
    SetMidiPanelVisible(bool),
    RequestLearn(PromptId),
    ToggleLearn(PromptId),
    EditText(PromptId, String),
    EditWeight(PromptId, f32),
    PlayPause,
    Client(ClientEvent),
    Quit,
}

/// Transient, user-facing messages.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    MidiUnavailable(String),
    MidiDevice(String),
    GenerationRejected { text: String, reason: String },
    GenerationError(String),
    NoActivePrompts,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MidiUnavailable(message) | Self::MidiDevice(message) => {
                f.write_str(message)
            }
            Self::GenerationRejected { text, reason } => {
                write!(f, "Weighted prompt '{}' was filtered: {}", text, reason)
            }
            Self::GenerationError(message) => f.write_str(message),
            Self::NoActivePrompts => write!(
                f,
                "There needs to be at least one active prompt to play"
            ),
        }
    }
}

/// Outbound events for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    PromptsChanged(PromptSnapshot),
    PromptChanged(Prompt),
    LearnState(PromptId, BindingState),
    PlaybackState(PlaybackState),
    MidiDevices(Vec<(DeviceId, String)>),
    ActiveMidiDevice(Option<DeviceId>),
    Toast(Notice),
}

pub type InputSender = Sender<Input>;
pub type InputReceiver = Receiver<Input>;
pub type UiEventReceiver = Receiver<UiEvent>;

pub fn input_channel() -> (InputSender, InputReceiver) {
    mpsc::channel()
}
