#![allow(dead_code)]

use std::env;
use std::error::Error;
use std::sync::Arc;

use parking_lot::Mutex;
use promptdj::prelude::*;

macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        assert_approx_eq!($left, $right, 1e-5)
    };
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right) = ($left as f32, $right as f32);
        assert!(
            (left - right).abs() <= $epsilon,
            "expected {} ~= {} (epsilon {})",
            left,
            right,
            $epsilon
        );
    }};
}

#[allow(unused_imports)]
pub(crate) use assert_approx_eq;

pub fn device_tests_enabled() -> bool {
    matches!(
        env::var("PROMPTDJ_RUN_DEVICE_TESTS")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Default)]
struct MidiState {
    devices: Vec<DeviceInfo>,
    listening: Option<(DeviceId, RawSink)>,
    denied: bool,
}

/// In-memory MIDI backend. Clones share state so a test can plug, unplug and
/// play devices while the app owns its copy.
#[derive(Clone, Default)]
pub struct FakeMidi {
    state: Arc<Mutex<MidiState>>,
}

impl FakeMidi {
    pub fn with_devices(devices: &[(&str, &str)]) -> Self {
        let midi = Self::default();
        for (id, name) in devices {
            midi.plug(id, name);
        }
        midi
    }

    pub fn denied() -> Self {
        let midi = Self::default();
        midi.state.lock().denied = true;
        midi
    }

    pub fn plug(&self, id: &str, name: &str) {
        self.state.lock().devices.push(DeviceInfo {
            id: DeviceId::new(id),
            name: Some(name.to_string()),
        });
    }

    pub fn unplug(&self, id: &str) {
        let mut state = self.state.lock();
        state.devices.retain(|d| d.id.as_str() != id);
        if state
            .listening
            .as_ref()
            .is_some_and(|(listening, _)| listening.as_str() == id)
        {
            state.listening = None;
        }
    }

    pub fn listening(&self) -> Option<DeviceId> {
        self.state.lock().listening.as_ref().map(|(id, _)| id.clone())
    }

    /// Play a control change on `device`. Like a real port, only the device
    /// being listened to reaches the sink.
    pub fn cc(&self, device: &str, channel: u8, controller: u8, value: u8) {
        let sink = self
            .state
            .lock()
            .listening
            .as_ref()
            .filter(|(id, _)| id.as_str() == device)
            .map(|(_, sink)| sink.clone());

        if let Some(sink) = sink {
            sink(RawMidiMessage {
                device: DeviceId::new(device),
                bytes: CcMessage::new(channel, controller, value)
                    .to_bytes()
                    .to_vec(),
            });
        }
    }
}

impl MidiAccess for FakeMidi {
    fn devices(&mut self) -> Result<Vec<DeviceInfo>, MidiError> {
        let state = self.state.lock();
        if state.denied {
            return Err(MidiError::PermissionDenied);
        }
        Ok(state.devices.clone())
    }

    fn listen(
        &mut self,
        device: &DeviceId,
        sink: RawSink,
    ) -> Result<(), MidiError> {
        self.state.lock().listening = Some((device.clone(), sink));
        Ok(())
    }

    fn unlisten(&mut self) {
        self.state.lock().listening = None;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClientCall {
    Prompts(Vec<WeightedPrompt>),
    Play,
    Pause,
    Stop,
}

/// Generation client that records calls and never echoes on its own; tests
/// feed state changes back explicitly.
#[derive(Clone, Default)]
pub struct RecordingClient {
    calls: Arc<Mutex<Vec<ClientCall>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl RecordingClient {
    pub fn take_calls(&self) -> Vec<ClientCall> {
        std::mem::take(&mut *self.calls.lock())
    }

    pub fn last_prompts(&self) -> Option<Vec<WeightedPrompt>> {
        self.calls.lock().iter().rev().find_map(|call| match call {
            ClientCall::Prompts(prompts) => Some(prompts.clone()),
            _ => None,
        })
    }

    pub fn fail_with(&self, message: &str) {
        *self.failure.lock() = Some(message.to_string());
    }

    fn record(&self, call: ClientCall) -> Result<(), Box<dyn Error>> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(message.into());
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl GenerationClient for RecordingClient {
    fn set_weighted_prompts(
        &mut self,
        prompts: &[WeightedPrompt],
    ) -> Result<(), Box<dyn Error>> {
        self.record(ClientCall::Prompts(prompts.to_vec()))
    }

    fn play(&mut self) -> Result<(), Box<dyn Error>> {
        self.record(ClientCall::Play)
    }

    fn pause(&mut self) -> Result<(), Box<dyn Error>> {
        self.record(ClientCall::Pause)
    }

    fn stop(&mut self) -> Result<(), Box<dyn Error>> {
        self.record(ClientCall::Stop)
    }
}

#[derive(Default)]
struct SamplerState {
    frame: AudioFrame,
    started: bool,
}

/// Sampler whose output the test sets directly.
#[derive(Clone, Default)]
pub struct ScriptedSampler {
    state: Arc<Mutex<SamplerState>>,
}

impl ScriptedSampler {
    pub fn set(&self, level: f32, spectrum: Vec<u8>) {
        self.state.lock().frame = AudioFrame { level, spectrum };
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }
}

impl AudioSampler for ScriptedSampler {
    fn start(&mut self) -> Result<(), Box<dyn Error>> {
        self.state.lock().started = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().started = false;
    }

    fn current(&self) -> AudioFrame {
        self.state.lock().frame.clone()
    }
}

pub type TestApp = App<FakeMidi, RecordingClient, ScriptedSampler>;

pub struct Harness {
    pub app: TestApp,
    pub midi: FakeMidi,
    pub client: RecordingClient,
    pub sampler: ScriptedSampler,
    pub events: UiEventReceiver,
}

impl Harness {
    pub fn new(midi: FakeMidi) -> Self {
        let client = RecordingClient::default();
        let sampler = ScriptedSampler::default();
        let prompts = Preset::builtin()
            .to_prompts()
            .expect("built-in preset is valid");

        let mut app = App::new(
            AppConfig::default(),
            midi.clone(),
            client.clone(),
            sampler.clone(),
            prompts,
        );
        let events = app.subscribe();
        app.start();

        Self {
            app,
            midi,
            client,
            sampler,
            events,
        }
    }

    pub fn with_controller() -> Self {
        Self::new(FakeMidi::with_devices(&[("in-1", "Controller")]))
    }

    pub fn show_midi_panel(&mut self) {
        self.send(Input::SetMidiPanelVisible(true));
    }

    pub fn send(&mut self, input: Input) {
        assert!(self.app.dispatch(input), "unexpected quit");
    }

    /// Play a CC on the controller and process the queued callback.
    pub fn cc(&mut self, channel: u8, controller: u8, value: u8) {
        self.midi.cc("in-1", channel, controller, value);
        assert!(self.app.drain_inputs(), "unexpected quit");
    }

    pub fn echo(&mut self, state: PlaybackState) {
        self.send(Input::Client(ClientEvent::PlaybackStateChanged(state)));
    }

    /// Press play and let the client report it is streaming.
    pub fn play(&mut self) {
        self.send(Input::PlayPause);
        self.echo(PlaybackState::Loading);
        self.echo(PlaybackState::Playing);
    }

    pub fn drain_events(&self) -> Vec<UiEvent> {
        self.events.try_iter().collect()
    }

    pub fn prompt(&self, slot: usize) -> Prompt {
        self.app
            .registry()
            .get(&PromptId::for_slot(slot))
            .cloned()
            .expect("slot exists")
    }
}

pub fn prompt_changes(events: &[UiEvent]) -> Vec<Prompt> {
    events
        .iter()
        .filter_map(|event| match event {
            UiEvent::PromptChanged(prompt) => Some(prompt.clone()),
            _ => None,
        })
        .collect()
}

pub fn toasts(events: &[UiEvent]) -> Vec<Notice> {
    events
        .iter()
        .filter_map(|event| match event {
            UiEvent::Toast(notice) => Some(notice.clone()),
            _ => None,
        })
        .collect()
}

pub fn last_snapshot(events: &[UiEvent]) -> Option<PromptSnapshot> {
    events.iter().rev().find_map(|event| match event {
        UiEvent::PromptsChanged(snapshot) => Some(snapshot.clone()),
        _ => None,
    })
}
