//! Per-slot MIDI learn/bind state machine and edit handling.
//!
//! Every operation that changes the slot returns the full [`Prompt`] snapshot
//! to publish; `None` means no notification fires.

use crate::control::prompt::{
    CC_MAX, Prompt, PromptId, WEIGHT_MAX, WEIGHT_MIN, clamp_weight,
};
use crate::framework::prelude::*;
use crate::io::midi::CcMessage;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BindingState {
    #[default]
    Idle,
    Learning,
}

/// Linear map from the 7-bit MIDI range onto `[0, WEIGHT_MAX]`.
pub fn weight_from_cc_value(value: u8) -> f32 {
    let value = f32::from(value.min(CC_MAX));
    map_range(value, 0.0, f32::from(CC_MAX), WEIGHT_MIN, WEIGHT_MAX)
}

/// Outcome of offering a control change to a slot.
#[derive(Clone, Debug, PartialEq)]
pub enum CcOutcome {
    /// The slot was learning and is now bound to the message's cc/channel.
    Learned(Prompt),
    /// The slot's bound controller moved; weight updated.
    WeightChanged(Prompt),
    Ignored,
}

impl CcOutcome {
    pub fn into_prompt(self) -> Option<Prompt> {
        match self {
            Self::Learned(prompt) | Self::WeightChanged(prompt) => Some(prompt),
            Self::Ignored => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromptBinding {
    prompt: Prompt,
    state: BindingState,
    last_valid_text: String,
}

impl PromptBinding {
    pub fn new(prompt: Prompt) -> Self {
        let last_valid_text = prompt.text.clone();
        Self {
            prompt,
            state: BindingState::Idle,
            last_valid_text,
        }
    }

    pub fn id(&self) -> &PromptId {
        &self.prompt.id
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn state(&self) -> BindingState {
        self.state
    }

    pub fn is_learning(&self) -> bool {
        self.state == BindingState::Learning
    }

    /// Enter learn mode. Repeated requests leave the slot learning.
    pub fn request_learn(&mut self) {
        self.state = BindingState::Learning;
    }

    pub fn toggle_learn(&mut self) {
        self.state = match self.state {
            BindingState::Idle => BindingState::Learning,
            BindingState::Learning => BindingState::Idle,
        };
    }

    /// Force `Idle`, e.g. when the MIDI panel is hidden. Returns whether the
    /// slot was learning.
    pub fn cancel_learn(&mut self) -> bool {
        std::mem::take(&mut self.state) == BindingState::Learning
    }

    pub fn handle_cc(&mut self, message: &CcMessage) -> CcOutcome {
        match self.state {
            BindingState::Learning => {
                self.prompt.cc = message.controller;
                self.prompt.channel = message.channel;
                self.state = BindingState::Idle;
                CcOutcome::Learned(self.prompt.clone())
            }
            BindingState::Idle if message.controller == self.prompt.cc => {
                self.prompt.weight = weight_from_cc_value(message.value);
                CcOutcome::WeightChanged(self.prompt.clone())
            }
            BindingState::Idle => CcOutcome::Ignored,
        }
    }

    /// Apply a text field edit. Blank input reverts to the last valid text
    /// silently.
    pub fn edit_text(&mut self, raw: &str) -> Option<Prompt> {
        let text = raw.trim();
        if text.is_empty() {
            self.prompt.text = self.last_valid_text.clone();
            return None;
        }
        self.prompt.text = text.to_string();
        self.last_valid_text = self.prompt.text.clone();
        Some(self.prompt.clone())
    }

    /// Direct (pointer) weight edit; no scaling beyond clamping.
    pub fn edit_weight(&mut self, weight: f32) -> Prompt {
        self.prompt.weight = clamp_weight(weight);
        self.prompt.clone()
    }

    /// What the slot's binding badge shows.
    pub fn cc_label(&self) -> String {
        match self.state {
            BindingState::Learning => "Learn".to_string(),
            BindingState::Idle => format!("CC {}", self.prompt.cc),
        }
    }
}
