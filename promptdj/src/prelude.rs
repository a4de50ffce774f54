pub use crate::control::*;
pub use crate::debug_throttled;
pub use crate::framework::logging::init_logger;
pub use crate::framework::logging::{debug, error, info, trace, warn};
pub use crate::framework::publisher::Publisher;
pub use crate::io::audio::{
    AudioFrame, AudioSampler, InputSampler, SilentSampler, list_audio_devices,
};
pub use crate::io::midi::{
    CcMessage, DeviceId, DeviceInfo, MidiAccess, MidiError, MidiEvent,
    MidiLink, MidirAccess, RawMidiMessage, RawSink,
};
pub use crate::render::*;
pub use crate::runtime::app::{App, AppConfig};
pub use crate::runtime::events::{
    Input, InputReceiver, InputSender, Notice, UiEvent, UiEventReceiver,
    input_channel,
};
pub use crate::runtime::frame_clock::{FrameClock, FrameTick};
pub use crate::runtime::orchestrator::{
    ClientEvent, GenerationClient, PlaybackOrchestrator, PlaybackState,
};
pub use crate::runtime::settings::Settings;
pub use crate::runtime::storage;
pub use crate::warn_once;
