//! The authoritative `PromptId -> Prompt` table plus the set of texts the
//! generation service has rejected. Every mutation republishes the full
//! snapshot.

use indexmap::IndexMap;
use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::mpsc::Receiver;

use super::prompt::{Color, Prompt, PromptId};
use crate::framework::prelude::*;

/// Prompts above this weight compete for the visualizer color.
pub const DOMINANT_WEIGHT_THRESHOLD: f32 = 0.5;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeightedPrompt {
    pub text: String,
    pub weight: f32,
}

/// Full ordered registry state at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PromptSnapshot {
    pub prompts: Vec<Prompt>,
    pub filtered_texts: Vec<String>,
}

impl PromptSnapshot {
    pub fn get(&self, id: &PromptId) -> Option<&Prompt> {
        self.prompts.iter().find(|p| &p.id == id)
    }

    pub fn is_filtered(&self, prompt: &Prompt) -> bool {
        self.filtered_texts.iter().any(|t| *t == prompt.text)
    }

    /// Weight as seen downstream: filtered prompts count as silent.
    pub fn effective_weight(&self, prompt: &Prompt) -> f32 {
        if self.is_filtered(prompt) {
            0.0
        } else {
            prompt.weight
        }
    }

    /// What the generation client receives: audible, unfiltered prompts in
    /// slot order.
    pub fn weighted_prompts(&self) -> Vec<WeightedPrompt> {
        self.prompts
            .iter()
            .filter(|p| p.is_active() && !self.is_filtered(p))
            .map(|p| WeightedPrompt {
                text: p.text.clone(),
                weight: p.weight,
            })
            .collect()
    }

    /// Color of the heaviest unfiltered prompt above `threshold`; the first
    /// slot wins ties.
    pub fn dominant_color(&self, threshold: f32) -> Option<Color> {
        self.prompts
            .iter()
            .filter(|p| !self.is_filtered(p) && p.weight > threshold)
            .fold(None::<&Prompt>, |best, p| match best {
                Some(b) if b.weight >= p.weight => Some(b),
                _ => Some(p),
            })
            .map(|p| p.color)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RegistryError {
    UnknownPrompt(PromptId),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPrompt(id) => write!(f, "Unknown prompt: {}", id),
        }
    }
}

impl Error for RegistryError {}

#[derive(Debug)]
pub struct PromptRegistry {
    prompts: IndexMap<PromptId, Prompt>,
    filtered_texts: HashSet<String>,
    snapshots: Publisher<PromptSnapshot>,
}

impl PromptRegistry {
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self {
            prompts: prompts.into_iter().map(|p| (p.id.clone(), p)).collect(),
            filtered_texts: HashSet::default(),
            snapshots: Publisher::new(),
        }
    }

    pub fn subscribe(&mut self) -> Receiver<PromptSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    pub fn get(&self, id: &PromptId) -> Option<&Prompt> {
        self.prompts.get(id)
    }

    pub fn prompts(&self) -> impl Iterator<Item = &Prompt> {
        self.prompts.values()
    }

    /// Copy the mutable fields of `change` into the stored record. `id` and
    /// `color` are never touched.
    pub fn apply_change(
        &mut self,
        change: &Prompt,
    ) -> Result<(), RegistryError> {
        let Some(prompt) = self.prompts.get_mut(&change.id) else {
            warn!("Ignoring change for unknown prompt {}", change.id);
            return Err(RegistryError::UnknownPrompt(change.id.clone()));
        };

        prompt.text = change.text.clone();
        prompt.weight = change.weight;
        prompt.cc = change.cc;
        prompt.channel = change.channel;

        self.notify();
        Ok(())
    }

    /// Flag `text` as rejected. Returns `false` if it already was; the
    /// snapshot is republished only on a new flag.
    pub fn mark_filtered(&mut self, text: &str) -> bool {
        if !self.filtered_texts.insert(text.to_string()) {
            return false;
        }
        warn!("Prompt text filtered: {}", text);
        self.notify();
        true
    }

    pub fn is_filtered(&self, text: &str) -> bool {
        self.filtered_texts.contains(text)
    }

    pub fn is_prompt_filtered(&self, id: &PromptId) -> bool {
        self.get(id).is_some_and(|p| self.is_filtered(&p.text))
    }

    pub fn snapshot(&self) -> PromptSnapshot {
        let mut filtered_texts: Vec<String> =
            self.filtered_texts.iter().cloned().collect();
        filtered_texts.sort();

        PromptSnapshot {
            prompts: self.prompts.values().cloned().collect(),
            filtered_texts,
        }
    }

    /// Republish the current state to every subscriber.
    pub fn notify(&mut self) {
        let snapshot = self.snapshot();
        self.snapshots.publish(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::preset::Preset;

    fn registry() -> PromptRegistry {
        PromptRegistry::new(Preset::builtin().to_prompts().unwrap())
    }

    #[test]
    fn apply_change_round_trips_mutable_fields() {
        let mut registry = registry();
        let original = registry.get(&PromptId::for_slot(2)).unwrap().clone();

        let mut change = original.clone();
        change.text = "Acid Bass".to_string();
        change.weight = 0.75;
        change.cc = 42;
        change.channel = 5;
        change.color = Color::rgb(1, 2, 3);

        registry.apply_change(&change).unwrap();

        let stored = registry.get(&original.id).unwrap();
        assert_eq!(stored.text, "Acid Bass");
        assert_eq!(stored.weight, 0.75);
        assert_eq!((stored.cc, stored.channel), (42, 5));
        assert_eq!(stored.color, original.color);
        assert_eq!(stored.id, original.id);
    }

    #[test]
    fn unknown_prompt_is_a_noop() {
        let mut registry = registry();
        let rx = registry.subscribe();
        let before = registry.snapshot();

        let mut change = before.prompts[0].clone();
        change.id = PromptId::from("prompt-99");

        assert_eq!(
            registry.apply_change(&change),
            Err(RegistryError::UnknownPrompt(PromptId::from("prompt-99")))
        );
        assert_eq!(registry.snapshot(), before);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn every_mutation_publishes_full_snapshot() {
        let mut registry = registry();
        let rx = registry.subscribe();

        let mut change = registry.get(&PromptId::for_slot(0)).unwrap().clone();
        change.weight = 1.4;
        registry.apply_change(&change).unwrap();

        let snapshot = rx.try_recv().unwrap();
        assert_eq!(snapshot.prompts.len(), 16);
        assert_eq!(snapshot.prompts[0].weight, 1.4);
    }

    #[test]
    fn mark_filtered_is_idempotent() {
        let mut registry = registry();
        let rx = registry.subscribe();

        assert!(registry.mark_filtered("Funk"));
        assert!(!registry.mark_filtered("Funk"));

        assert_eq!(rx.try_iter().count(), 1);
        assert!(registry.is_prompt_filtered(&PromptId::for_slot(5)));
        assert!(!registry.is_prompt_filtered(&PromptId::for_slot(4)));
    }

    #[test]
    fn weighted_prompts_skip_silent_and_filtered() {
        let mut registry = registry();
        registry.mark_filtered("Lush Strings");
        let weighted = registry.snapshot().weighted_prompts();
        let texts: Vec<&str> =
            weighted.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["Bossa Nova", "Neo Soul"]);
    }

    #[test]
    fn dominant_color_needs_weight_above_threshold() {
        let mut registry = registry();
        let mut snapshot = registry.snapshot();
        for prompt in &mut snapshot.prompts {
            prompt.weight = 0.5;
        }
        assert_eq!(snapshot.dominant_color(DOMINANT_WEIGHT_THRESHOLD), None);

        let mut change = registry.get(&PromptId::for_slot(4)).unwrap().clone();
        change.weight = 1.9;
        registry.apply_change(&change).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot.dominant_color(DOMINANT_WEIGHT_THRESHOLD),
            Some(change.color)
        );

        registry.mark_filtered(&change.text);
        let snapshot = registry.snapshot();
        assert_eq!(
            snapshot.dominant_color(DOMINANT_WEIGHT_THRESHOLD),
            Some(snapshot.prompts[0].color)
        );
    }
}
