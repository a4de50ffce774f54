//! Startup prompt presets, either the built-in table or a YAML file:
//!
//! ```yaml
//! prompts:
//!   - text: Bossa Nova
//!     color: "#9900ff"
//!     weight: 1.0
//!   - text: Chillwave
//!     color: "#5200ff"
//!     cc: 21
//!     channel: 1
//!   # ...exactly 16 entries
//! ```

use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

use super::prompt::{
    CC_MAX, CHANNEL_MAX, Color, Prompt, SLOT_COUNT, WEIGHT_MAX, WEIGHT_MIN,
};

const BUILTIN: [(&str, &str); SLOT_COUNT] = [
    ("Bossa Nova", "#9900ff"),
    ("Chillwave", "#5200ff"),
    ("Drum and Bass", "#ff25f6"),
    ("Post Punk", "#2af6de"),
    ("Shoegaze", "#ffdd28"),
    ("Funk", "#2af6de"),
    ("Chiptune", "#9900ff"),
    ("Lush Strings", "#3dffab"),
    ("Sparkling Arpeggios", "#d8ff3e"),
    ("Staccato Rhythms", "#d9b2ff"),
    ("Punchy Kick", "#3dffab"),
    ("Dubstep", "#ffdd28"),
    ("K Pop", "#ff25f6"),
    ("Neo Soul", "#d8ff3e"),
    ("Trip Hop", "#5200ff"),
    ("Thrash", "#d9b2ff"),
];

/// Slots that start audible in the built-in preset.
const BUILTIN_ACTIVE: [usize; 3] = [0, 7, 13];

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct PresetEntry {
    pub text: String,
    pub color: Color,
    #[serde(default)]
    pub weight: f32,
    #[serde(default)]
    pub cc: Option<u8>,
    #[serde(default)]
    pub channel: Option<u8>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Preset {
    pub prompts: Vec<PresetEntry>,
}

impl Preset {
    pub fn builtin() -> Self {
        let prompts = BUILTIN
            .iter()
            .enumerate()
            .map(|(index, (text, hex))| PresetEntry {
                text: text.to_string(),
                color: Color::from_hex(hex).unwrap_or(Color::WHITE),
                weight: if BUILTIN_ACTIVE.contains(&index) { 1.0 } else { 0.0 },
                cc: None,
                channel: None,
            })
            .collect();

        Self { prompts }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, PresetError> {
        serde_yml::from_str(yaml).map_err(|e| PresetError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let yaml = fs::read_to_string(path)?;
        Ok(Self::from_yaml_str(&yaml)?)
    }

    /// Validate and build the fixed slot table with `prompt-<index>` ids.
    pub fn to_prompts(&self) -> Result<Vec<Prompt>, PresetError> {
        if self.prompts.len() != SLOT_COUNT {
            return Err(PresetError::WrongSlotCount {
                expected: SLOT_COUNT,
                found: self.prompts.len(),
            });
        }

        self.prompts
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let text = entry.text.trim();
                if text.is_empty() {
                    return Err(PresetError::EmptyText(index));
                }
                if !(WEIGHT_MIN..=WEIGHT_MAX).contains(&entry.weight) {
                    return Err(PresetError::WeightOutOfRange {
                        index,
                        weight: entry.weight,
                    });
                }

                let mut prompt = Prompt::new(index, text, entry.color)
                    .with_weight(entry.weight);

                if let Some(cc) = entry.cc {
                    if cc > CC_MAX {
                        return Err(PresetError::BindingOutOfRange(index));
                    }
                    prompt.cc = cc;
                }
                if let Some(channel) = entry.channel {
                    if channel > CHANNEL_MAX {
                        return Err(PresetError::BindingOutOfRange(index));
                    }
                    prompt.channel = channel;
                }

                Ok(prompt)
            })
            .collect()
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::builtin()
    }
}

#[derive(Debug, PartialEq)]
pub enum PresetError {
    Parse(String),
    WrongSlotCount { expected: usize, found: usize },
    EmptyText(usize),
    WeightOutOfRange { index: usize, weight: f32 },
    BindingOutOfRange(usize),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(message) => {
                write!(f, "Unable to parse preset: {}", message)
            }
            Self::WrongSlotCount { expected, found } => write!(
                f,
                "Preset must define exactly {} prompts; found {}",
                expected, found
            ),
            Self::EmptyText(index) => {
                write!(f, "Preset prompt {} has empty text", index)
            }
            Self::WeightOutOfRange { index, weight } => write!(
                f,
                "Preset prompt {} weight {} is outside [{}, {}]",
                index, weight, WEIGHT_MIN, WEIGHT_MAX
            ),
            Self::BindingOutOfRange(index) => write!(
                f,
                "Preset prompt {} cc must be <= {} and channel <= {}",
                index, CC_MAX, CHANNEL_MAX
            ),
        }
    }
}

impl Error for PresetError {}
