//! Composition root. Every input (MIDI callbacks, performer edits, client
//! echoes) is funneled onto one queue and handled on a single thread, together
//! with the render tick, so registry mutations and snapshot reads never
//! interleave.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use super::events::{
    Input, InputReceiver, InputSender, Notice, UiEvent, UiEventReceiver,
    input_channel,
};
use super::frame_clock::FrameClock;
use super::orchestrator::{
    GenerationClient, PlaybackOrchestrator, PlaybackState,
};
use super::settings::Settings;
use crate::control::{
    BindingState, CcOutcome, Prompt, PromptBinding, PromptId, PromptRegistry,
    PromptSnapshot,
};
use crate::framework::prelude::*;
use crate::io::audio::AudioSampler;
use crate::io::midi::{CcMessage, MidiAccess, MidiEvent, MidiLink, RawSink};
use crate::render::feedback::{FeedbackLoop, FrameOutput};
use crate::render::gradient::DEFAULT_THROTTLE;
use crate::render::visualizer::Canvas;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gradient_throttle: Duration,
    pub preferred_midi_device: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gradient_throttle: DEFAULT_THROTTLE,
            preferred_midi_device: None,
        }
    }
}

impl From<&Settings> for AppConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            gradient_throttle: settings.gradient_throttle(),
            preferred_midi_device: settings.midi_device(),
        }
    }
}

pub struct App<A, G, S>
where
    A: MidiAccess,
    G: GenerationClient,
    S: AudioSampler,
{
    midi: MidiLink<A>,
    midi_events: Receiver<MidiEvent>,
    bindings: Vec<PromptBinding>,
    registry: PromptRegistry,
    snapshots: Receiver<PromptSnapshot>,
    snapshot: PromptSnapshot,
    orchestrator: PlaybackOrchestrator<G>,
    orchestrator_events: Receiver<UiEvent>,
    sampler: S,
    feedback: FeedbackLoop,
    ui: Publisher<UiEvent>,
    inputs: InputReceiver,
    input_tx: InputSender,
    midi_panel_visible: bool,
}

impl<A, G, S> App<A, G, S>
where
    A: MidiAccess,
    G: GenerationClient,
    S: AudioSampler,
{
    pub fn new(
        config: AppConfig,
        access: A,
        client: G,
        sampler: S,
        prompts: Vec<Prompt>,
    ) -> Self {
        Self::with_inputs(
            config,
            input_channel(),
            access,
            client,
            sampler,
            prompts,
        )
    }

    /// Like [`App::new`] but on a caller-created queue, for clients that need
    /// an [`InputSender`] before the app exists.
    pub fn with_inputs(
        config: AppConfig,
        (input_tx, inputs): (InputSender, InputReceiver),
        access: A,
        client: G,
        sampler: S,
        prompts: Vec<Prompt>,
    ) -> Self {
        let midi_tx = input_tx.clone();
        let sink: RawSink = Arc::new(move |raw| {
            let _ = midi_tx.send(Input::Midi(raw));
        });
        let mut midi = MidiLink::new(access, sink);
        midi.set_preferred_device_name(config.preferred_midi_device);
        let midi_events = midi.subscribe();

        let mut registry = PromptRegistry::new(prompts.clone());
        let snapshots = registry.subscribe();
        let snapshot = registry.snapshot();

        let mut orchestrator = PlaybackOrchestrator::new(client);
        let orchestrator_events = orchestrator.subscribe();

        Self {
            midi,
            midi_events,
            bindings: prompts.into_iter().map(PromptBinding::new).collect(),
            registry,
            snapshots,
            snapshot,
            orchestrator,
            orchestrator_events,
            sampler,
            feedback: FeedbackLoop::new(config.gradient_throttle),
            ui: Publisher::new(),
            inputs,
            input_tx,
            midi_panel_visible: false,
        }
    }

    /// Handle for other threads (MIDI backend, stdin, generation client) to
    /// queue inputs.
    pub fn input_sender(&self) -> InputSender {
        self.input_tx.clone()
    }

    pub fn subscribe(&mut self) -> UiEventReceiver {
        self.ui.subscribe()
    }

    pub fn snapshot(&self) -> &PromptSnapshot {
        &self.snapshot
    }

    pub fn registry(&self) -> &PromptRegistry {
        &self.registry
    }

    pub fn bindings(&self) -> &[PromptBinding] {
        &self.bindings
    }

    pub fn binding(&self, id: &PromptId) -> Option<&PromptBinding> {
        self.bindings.iter().find(|b| b.id() == id)
    }

    pub fn midi(&self) -> &MidiLink<A> {
        &self.midi
    }

    pub fn orchestrator(&self) -> &PlaybackOrchestrator<G> {
        &self.orchestrator
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.orchestrator.state()
    }

    pub fn is_midi_panel_visible(&self) -> bool {
        self.midi_panel_visible
    }

    /// Acquire MIDI and publish the initial state. Failure to get MIDI is
    /// reported once and leaves the app usable without devices.
    pub fn start(&mut self) {
        if let Err(err) = self.midi.request_access() {
            self.ui.publish(UiEvent::MidiDevices(vec![]));
            let notice = Notice::MidiUnavailable(err.to_string());
            self.ui.publish(UiEvent::Toast(notice));
        }
        self.ui.publish(UiEvent::PromptsChanged(self.snapshot.clone()));
        self.pump();
    }

    /// Process one input to completion. Returns `false` on [`Input::Quit`].
    pub fn dispatch(&mut self, input: Input) -> bool {
        match input {
            Input::Midi(raw) => self.midi.handle_raw(&raw),
            Input::RefreshMidiDevices => self.midi.refresh_devices(),
            Input::SelectMidiDevice(id) => self.midi.set_active_device(id),
            Input::SetMidiPanelVisible(visible) => {
                self.set_midi_panel_visible(visible)
            }
            Input::RequestLearn(id) | Input::ToggleLearn(id)
                if !self.midi_panel_visible =>
            {
                debug!("Ignoring learn request for {}; MIDI panel hidden", id);
            }
            Input::RequestLearn(id) => self.with_binding(&id, |binding| {
                binding.request_learn();
                None
            }),
            Input::ToggleLearn(id) => self.with_binding(&id, |binding| {
                binding.toggle_learn();
                None
            }),
            Input::EditText(id, text) => {
                self.with_binding(&id, |binding| binding.edit_text(&text))
            }
            Input::EditWeight(id, weight) => self
                .with_binding(&id, |binding| Some(binding.edit_weight(weight))),
            Input::PlayPause => self.orchestrator.play_pause(&self.snapshot),
            Input::Client(event) => self
                .orchestrator
                .handle_client_event(event, &mut self.registry),
            Input::Quit => return false,
        }

        self.pump();
        true
    }

    /// Dispatch everything already queued. Returns `false` once a quit was
    /// seen.
    pub fn drain_inputs(&mut self) -> bool {
        while let Ok(input) = self.inputs.try_recv() {
            if !self.dispatch(input) {
                return false;
            }
        }
        true
    }

    /// One animation frame.
    pub fn frame<C: Canvas + ?Sized>(
        &mut self,
        now: Instant,
        canvas: &mut C,
    ) -> FrameOutput {
        self.feedback
            .tick(now, &self.sampler, &self.snapshot, canvas)
    }

    /// Run until [`Input::Quit`]: wait for inputs until the next frame is due,
    /// then render it.
    pub fn run<C, F>(
        &mut self,
        clock: &mut FrameClock,
        canvas: &mut C,
        mut on_frame: F,
    ) where
        C: Canvas + ?Sized,
        F: FnMut(&FrameOutput),
    {
        self.start();
        info!("Running at {} fps", clock.fps());

        loop {
            match self.inputs.recv_timeout(clock.until_next(Instant::now())) {
                Ok(input) => {
                    if !self.dispatch(input) || !self.drain_inputs() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            if let Some(tick) = clock.tick(now) {
                if tick.dropped > 0 {
                    debug_throttled!(
                        1_000,
                        "Dropped {} frame(s); average fps {:.1}",
                        tick.dropped,
                        clock.average_fps()
                    );
                }
                let output = self.frame(now, canvas);
                on_frame(&output);
            }
        }

        self.sampler.stop();
        info!("Stopped after {} frames", clock.frame_count());
    }

    fn set_midi_panel_visible(&mut self, visible: bool) {
        self.midi_panel_visible = visible;
        if visible {
            return;
        }
        for binding in &mut self.bindings {
            if binding.cancel_learn() {
                self.ui.publish(UiEvent::LearnState(
                    binding.id().clone(),
                    BindingState::Idle,
                ));
            }
        }
    }

    fn with_binding<F>(&mut self, id: &PromptId, f: F)
    where
        F: FnOnce(&mut PromptBinding) -> Option<Prompt>,
    {
        let Some(binding) = self.bindings.iter_mut().find(|b| b.id() == id)
        else {
            warn!("Input for unknown prompt {}", id);
            return;
        };

        let before = binding.state();
        let change = f(binding);
        let after = binding.state();

        if before != after {
            self.ui.publish(UiEvent::LearnState(id.clone(), after));
        }
        if let Some(prompt) = change {
            self.commit(prompt);
        }
    }

    /// A CC goes to every slot, except that only the first learning slot
    /// consumes it as a learn; other learning slots keep waiting.
    fn on_cc(&mut self, message: CcMessage) {
        let mut learned = false;
        let mut changes = Vec::new();

        for binding in &mut self.bindings {
            if learned && binding.is_learning() {
                continue;
            }
            match binding.handle_cc(&message) {
                CcOutcome::Learned(prompt) => {
                    info!(
                        "{} learned CC {} on channel {}",
                        prompt.id, prompt.cc, prompt.channel
                    );
                    learned = true;
                    self.ui.publish(UiEvent::LearnState(
                        prompt.id.clone(),
                        BindingState::Idle,
                    ));
                    changes.push(prompt);
                }
                CcOutcome::WeightChanged(prompt) => changes.push(prompt),
                CcOutcome::Ignored => {}
            }
        }

        for prompt in changes {
            self.commit(prompt);
        }
    }

    fn commit(&mut self, prompt: Prompt) {
        self.ui.publish(UiEvent::PromptChanged(prompt.clone()));
        if let Err(err) = self.registry.apply_change(&prompt) {
            debug!("Dropped prompt change: {}", err);
        }
    }

    /// Drain the internal channels until quiet. Handling one event may
    /// publish another (a filtered prompt republishes the registry, for
    /// example), hence the loop.
    fn pump(&mut self) {
        loop {
            let mut progressed = false;

            while let Ok(event) = self.midi_events.try_recv() {
                progressed = true;
                self.on_midi_event(event);
            }
            while let Ok(snapshot) = self.snapshots.try_recv() {
                progressed = true;
                self.on_snapshot(snapshot);
            }
            while let Ok(event) = self.orchestrator_events.try_recv() {
                progressed = true;
                self.on_orchestrator_event(event);
            }

            if !progressed {
                break;
            }
        }
    }

    fn on_midi_event(&mut self, event: MidiEvent) {
        match event {
            MidiEvent::Cc(message) => self.on_cc(message),
            MidiEvent::DevicesChanged(ids) => {
                let devices = ids
                    .into_iter()
                    .map(|id| {
                        let name = self.midi.device_name(&id);
                        (id, name)
                    })
                    .collect();
                self.ui.publish(UiEvent::MidiDevices(devices));
            }
            MidiEvent::ActiveDeviceChanged(id) => {
                self.ui.publish(UiEvent::ActiveMidiDevice(id));
            }
            MidiEvent::Error(message) => {
                self.ui.publish(UiEvent::Toast(Notice::MidiDevice(message)));
            }
        }
    }

    fn on_snapshot(&mut self, snapshot: PromptSnapshot) {
        self.orchestrator.forward_snapshot(&snapshot);
        self.snapshot = snapshot.clone();
        self.ui.publish(UiEvent::PromptsChanged(snapshot));
    }

    fn on_orchestrator_event(&mut self, event: UiEvent) {
        if let UiEvent::PlaybackState(state) = &event {
            self.set_audio_feed(state.is_active());
        }
        self.ui.publish(event);
    }

    /// Audio only flows while playback is active; stopping or pausing clears
    /// it so the visuals return to rest.
    fn set_audio_feed(&mut self, active: bool) {
        if active == self.feedback.is_feed_active() {
            return;
        }
        if active {
            if let Err(err) = self.sampler.start() {
                warn_once!("Audio sampling unavailable: {}", err);
            }
        } else {
            self.sampler.stop();
        }
        self.feedback.set_feed_active(active);
    }
}
