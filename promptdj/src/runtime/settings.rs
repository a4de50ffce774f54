use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use crate::control::{Preset, Prompt};
use crate::render::gradient::DEFAULT_THROTTLE;

pub const SETTINGS_VERSION: &str = "1";
const DEFAULT_FPS: f32 = 60.0;

/// Persistent host settings. Missing fields fall back to defaults so older
/// files keep loading.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    /// Preferred MIDI input port name; empty selects the first-seen device.
    pub midi_device_name: String,
    /// Audio input to visualize; empty uses the host default.
    pub audio_device_name: String,
    pub fps: f32,
    pub gradient_throttle_ms: u64,
    pub preset_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            midi_device_name: String::new(),
            audio_device_name: String::new(),
            fps: DEFAULT_FPS,
            gradient_throttle_ms: DEFAULT_THROTTLE.as_millis() as u64,
            preset_path: None,
        }
    }
}

impl Settings {
    pub fn gradient_throttle(&self) -> Duration {
        Duration::from_millis(self.gradient_throttle_ms)
    }

    pub fn midi_device(&self) -> Option<String> {
        non_empty(&self.midi_device_name)
    }

    pub fn audio_device(&self) -> Option<String> {
        non_empty(&self.audio_device_name)
    }

    /// The startup slot table: the configured preset file or the built-in
    /// one.
    pub fn load_prompts(&self) -> Result<Vec<Prompt>, Box<dyn Error>> {
        let preset = match &self.preset_path {
            Some(path) => Preset::load(path)?,
            None => Preset::builtin(),
        };
        Ok(preset.to_prompts()?)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
