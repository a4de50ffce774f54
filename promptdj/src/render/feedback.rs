//! The per-frame audio feedback loop: sample, recompute the background at a
//! throttled rate, paint the visualizer and derive the reactive transforms.

use std::time::{Duration, Instant};

use super::gradient::{BackgroundGradient, GradientInput};
use super::visualizer::{Canvas, DEFAULT_BAR_COLOR, paint_spectrum};
use crate::control::{Color, DOMINANT_WEIGHT_THRESHOLD, PromptSnapshot};
use crate::framework::prelude::*;
use crate::io::audio::{AudioFrame, AudioSampler};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridTransform {
    pub scale: f32,
    pub brightness: f32,
}

impl GridTransform {
    pub fn from_level(level: f32) -> Self {
        Self {
            scale: 1.0 + level * 0.05,
            brightness: 1.0 + level * 0.5,
        }
    }
}

pub fn play_button_scale(level: f32) -> f32 {
    1.0 + level * 0.1
}

/// Everything the presentation layer needs to draw one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOutput {
    pub audio: AudioFrame,
    pub background: String,
    pub bar_color: Color,
    pub grid: GridTransform,
    pub play_button_scale: f32,
}

#[derive(Debug)]
pub struct FeedbackLoop {
    background: BackgroundGradient,
    feed_active: bool,
}

impl Default for FeedbackLoop {
    fn default() -> Self {
        Self::new(super::gradient::DEFAULT_THROTTLE)
    }
}

impl FeedbackLoop {
    pub fn new(gradient_throttle: Duration) -> Self {
        Self {
            background: BackgroundGradient::new(gradient_throttle),
            feed_active: false,
        }
    }

    /// Gate the upstream audio feed. While inactive every frame reads as
    /// silent so the display decays to rest instead of freezing.
    pub fn set_feed_active(&mut self, active: bool) {
        if self.feed_active != active {
            debug!("Audio feed {}", if active { "resumed" } else { "cleared" });
        }
        self.feed_active = active;
    }

    pub fn is_feed_active(&self) -> bool {
        self.feed_active
    }

    pub fn tick<S, C>(
        &mut self,
        now: Instant,
        sampler: &S,
        snapshot: &PromptSnapshot,
        canvas: &mut C,
    ) -> FrameOutput
    where
        S: AudioSampler + ?Sized,
        C: Canvas + ?Sized,
    {
        let audio = if self.feed_active {
            sampler.current()
        } else {
            AudioFrame::silent()
        };
        let level = clamp01(audio.level);

        let background = self
            .background
            .update(now, GradientInput::from_snapshot(snapshot, level))
            .to_string();

        let bar_color = snapshot
            .dominant_color(DOMINANT_WEIGHT_THRESHOLD)
            .unwrap_or(DEFAULT_BAR_COLOR);
        paint_spectrum(canvas, &audio.spectrum, bar_color);

        FrameOutput {
            background,
            bar_color,
            grid: GridTransform::from_level(level),
            play_button_scale: play_button_scale(level),
            audio: AudioFrame {
                level,
                spectrum: audio.spectrum,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Preset;
    use crate::control::PromptRegistry;
    use crate::render::visualizer::DrawList;
    use std::error::Error;

    struct FixedSampler(AudioFrame);

    impl AudioSampler for FixedSampler {
        fn start(&mut self) -> Result<(), Box<dyn Error>> {
            Ok(())
        }
        fn stop(&mut self) {}
        fn current(&self) -> AudioFrame {
            self.0.clone()
        }
    }

    fn snapshot() -> PromptSnapshot {
        PromptRegistry::new(Preset::builtin().to_prompts().unwrap()).snapshot()
    }

    fn loud() -> FixedSampler {
        FixedSampler(AudioFrame {
            level: 0.8,
            spectrum: vec![200, 100, 50],
        })
    }

    #[test]
    fn active_feed_passes_audio_through() {
        let mut feedback = FeedbackLoop::default();
        feedback.set_feed_active(true);
        let mut canvas = DrawList::new(600.0, 100.0);

        let out =
            feedback.tick(Instant::now(), &loud(), &snapshot(), &mut canvas);

        assert_eq!(out.audio.level, 0.8);
        assert_eq!(out.audio.spectrum, vec![200, 100, 50]);
        assert_eq!(canvas.rects.len(), 12);
        crate::assert_approx_eq!(out.grid.scale, 1.04);
        crate::assert_approx_eq!(out.grid.brightness, 1.4);
        crate::assert_approx_eq!(out.play_button_scale, 1.08);
    }

    #[test]
    fn clearing_feed_resets_next_frame() {
        let mut feedback = FeedbackLoop::default();
        feedback.set_feed_active(true);
        let mut canvas = DrawList::new(600.0, 100.0);
        let start = Instant::now();

        feedback.tick(start, &loud(), &snapshot(), &mut canvas);
        feedback.set_feed_active(false);
        let out = feedback.tick(
            start + Duration::from_millis(16),
            &loud(),
            &snapshot(),
            &mut canvas,
        );

        assert_eq!(out.audio.level, 0.0);
        assert!(out.audio.spectrum.is_empty());
        assert!(canvas.rects.is_empty());
        assert_eq!(out.grid, GridTransform::from_level(0.0));
    }

    #[test]
    fn bar_color_follows_heaviest_prompt() {
        let mut feedback = FeedbackLoop::default();
        let mut canvas = DrawList::new(100.0, 100.0);
        let mut snapshot = snapshot();

        snapshot.prompts[9].weight = 1.8;
        let out =
            feedback.tick(Instant::now(), &loud(), &snapshot, &mut canvas);
        assert_eq!(out.bar_color, snapshot.prompts[9].color);

        for prompt in &mut snapshot.prompts {
            prompt.weight = 0.0;
        }
        let out =
            feedback.tick(Instant::now(), &loud(), &snapshot, &mut canvas);
        assert_eq!(out.bar_color, DEFAULT_BAR_COLOR);
    }
}
