//! Thin pass-through between the prompt registry and the external music
//! generation client.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::mpsc::Receiver;

use super::events::{Notice, UiEvent};
use crate::control::{PromptRegistry, PromptSnapshot, WeightedPrompt};
use crate::framework::prelude::*;

#[derive(
    Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Loading,
    Playing,
    Paused,
}

impl PlaybackState {
    /// Whether audio is (about to be) flowing.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Loading | Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stopped => "stopped",
            Self::Loading => "loading",
            Self::Playing => "playing",
            Self::Paused => "paused",
        };
        f.write_str(label)
    }
}

/// Events the generation client reports back.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    PlaybackStateChanged(PlaybackState),
    FilteredPrompt { text: String, reason: String },
    Error(String),
}

/// The streaming generation service. Its state changes and errors come back
/// asynchronously as [`ClientEvent`]s.
pub trait GenerationClient {
    fn set_weighted_prompts(
        &mut self,
        prompts: &[WeightedPrompt],
    ) -> Result<(), Box<dyn Error>>;
    fn play(&mut self) -> Result<(), Box<dyn Error>>;
    fn pause(&mut self) -> Result<(), Box<dyn Error>>;
    fn stop(&mut self) -> Result<(), Box<dyn Error>>;
}

pub struct PlaybackOrchestrator<G: GenerationClient> {
    client: G,
    state: PlaybackState,
    last_sent: Option<Vec<WeightedPrompt>>,
    events: Publisher<UiEvent>,
}

impl<G: GenerationClient> PlaybackOrchestrator<G> {
    pub fn new(client: G) -> Self {
        Self {
            client,
            state: PlaybackState::Stopped,
            last_sent: None,
            events: Publisher::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn client(&self) -> &G {
        &self.client
    }

    /// Send the registry's latest state to the client. Empty and unchanged
    /// prompt sets are not sent. If nothing audible remains while playback
    /// is active, playback is paused.
    pub fn forward_snapshot(&mut self, snapshot: &PromptSnapshot) {
        let prompts = snapshot.weighted_prompts();

        if prompts.is_empty() {
            if self.state.is_active() {
                self.toast(Notice::NoActivePrompts);
                self.call("pause", |client| client.pause());
            }
            return;
        }

        if self.last_sent.as_ref() == Some(&prompts) {
            return;
        }

        if self.send(&prompts) {
            self.last_sent = Some(prompts);
        }
    }

    /// Handle the play/pause control.
    pub fn play_pause(&mut self, snapshot: &PromptSnapshot) {
        match self.state {
            PlaybackState::Playing => {
                self.call("pause", |client| client.pause());
            }
            PlaybackState::Paused | PlaybackState::Stopped => {
                let prompts = snapshot.weighted_prompts();
                if prompts.is_empty() {
                    self.toast(Notice::NoActivePrompts);
                    return;
                }
                if self.send(&prompts) {
                    self.last_sent = Some(prompts);
                    self.call("play", |client| client.play());
                }
            }
            PlaybackState::Loading => {
                self.call("stop", |client| client.stop());
            }
        }
    }

    pub fn handle_client_event(
        &mut self,
        event: ClientEvent,
        registry: &mut PromptRegistry,
    ) {
        match event {
            ClientEvent::PlaybackStateChanged(state) => {
                if state != self.state {
                    info!("Playback {} -> {}", self.state, state);
                }
                self.state = state;
                self.events.publish(UiEvent::PlaybackState(state));
            }
            ClientEvent::FilteredPrompt { text, reason } => {
                warn!("Prompt '{}' filtered: {}", text, reason);
                self.toast(Notice::GenerationRejected {
                    text: text.clone(),
                    reason,
                });
                registry.mark_filtered(&text);
            }
            ClientEvent::Error(message) => {
                error!("Generation error: {}", message);
                self.toast(Notice::GenerationError(message));
            }
        }
    }

    fn send(&mut self, prompts: &[WeightedPrompt]) -> bool {
        debug!("Sending {} weighted prompt(s)", prompts.len());
        self.call("set_weighted_prompts", |client| {
            client.set_weighted_prompts(prompts)
        })
    }

    fn call<F>(&mut self, operation: &str, f: F) -> bool
    where
        F: FnOnce(&mut G) -> Result<(), Box<dyn Error>>,
    {
        match f(&mut self.client) {
            Ok(()) => true,
            Err(err) => {
                error!("Generation client {} failed: {}", operation, err);
                self.toast(Notice::GenerationError(err.to_string()));
                false
            }
        }
    }

    fn toast(&mut self, notice: Notice) {
        self.events.publish(UiEvent::Toast(notice));
    }
}
