//! Audio-reactive background: one radial gradient per prompt slot laid out on
//! a 4x4 grid.

use std::time::{Duration, Instant};

use super::throttle::Throttle;
use crate::control::{Color, PromptSnapshot};
use crate::framework::prelude::*;

pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(30);
pub const GRID_COLUMNS: usize = 4;

/// Weight at which a slot reaches full opacity before audio boost.
const FULL_OPACITY_WEIGHT: f32 = 0.5;
const MAX_OPACITY: f32 = 0.5;
const LEVEL_OPACITY_BOOST: f32 = 0.3;
const LEVEL_RADIUS_BOOST: f32 = 0.3;

#[derive(Clone, Debug, PartialEq)]
pub struct GradientInput {
    /// Color and effective weight per slot, in slot order.
    pub slots: Vec<(Color, f32)>,
    pub level: f32,
}

impl GradientInput {
    pub fn from_snapshot(snapshot: &PromptSnapshot, level: f32) -> Self {
        Self {
            slots: snapshot
                .prompts
                .iter()
                .map(|p| (p.color, snapshot.effective_weight(p)))
                .collect(),
            level: clamp01(level),
        }
    }
}

pub fn slot_opacity(weight: f32, level: f32) -> f32 {
    clamp01(weight / FULL_OPACITY_WEIGHT + level * LEVEL_OPACITY_BOOST)
        * MAX_OPACITY
}

pub fn slot_radius(weight: f32, level: f32) -> f32 {
    weight / 2.0 + level * LEVEL_RADIUS_BOOST
}

/// Grid position of a slot as percentages of the viewport.
pub fn slot_position(index: usize) -> (f32, f32) {
    let rows = GRID_COLUMNS - 1;
    let x = (index % GRID_COLUMNS) as f32 / rows as f32;
    let y = (index / GRID_COLUMNS) as f32 / rows as f32;
    (x * 100.0, y * 100.0)
}

pub fn slot_gradient(
    index: usize,
    color: Color,
    weight: f32,
    level: f32,
) -> String {
    let (x, y) = slot_position(index);
    let alpha = (slot_opacity(weight, level) * 255.0).round() as u8;
    let stop = slot_radius(weight, level) * 100.0;
    format!(
        "radial-gradient(circle at {:.0}% {:.0}%, {}{:02x} 0px, {}00 {:.1}%)",
        x, y, color, alpha, color, stop
    )
}

pub fn background_gradient(input: &GradientInput) -> String {
    input
        .slots
        .iter()
        .enumerate()
        .map(|(index, (color, weight))| {
            slot_gradient(index, *color, *weight, input.level)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// The throttled background recomputation.
#[derive(Debug)]
pub struct BackgroundGradient {
    throttle: Throttle<GradientInput, String>,
}

impl Default for BackgroundGradient {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}

impl BackgroundGradient {
    pub fn new(window: Duration) -> Self {
        Self {
            throttle: Throttle::new(window),
        }
    }

    pub fn update(&mut self, now: Instant, input: GradientInput) -> &str {
        self.throttle.call(now, input, background_gradient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(0xff, 0, 0);

    fn input(weight: f32, level: f32) -> GradientInput {
        GradientInput {
            slots: vec![(RED, weight); 16],
            level,
        }
    }

    #[test]
    fn opacity_and_radius_formulas() {
        crate::assert_approx_eq!(slot_opacity(0.0, 0.0), 0.0);
        crate::assert_approx_eq!(slot_opacity(0.25, 0.0), 0.25);
        crate::assert_approx_eq!(slot_opacity(2.0, 1.0), 0.5);
        crate::assert_approx_eq!(slot_opacity(0.0, 1.0), 0.15);
        crate::assert_approx_eq!(slot_radius(1.0, 0.5), 0.65);
    }

    #[test]
    fn slots_are_laid_out_on_four_by_four_grid() {
        assert_eq!(slot_position(0), (0.0, 0.0));
        assert_eq!(slot_position(3), (100.0, 0.0));
        assert_eq!(slot_position(15), (100.0, 100.0));
        let (x, y) = slot_position(5);
        crate::assert_approx_eq!(x, 33.333_33, 1e-3);
        crate::assert_approx_eq!(y, 33.333_33, 1e-3);
    }

    #[test]
    fn slot_gradient_format() {
        assert_eq!(
            slot_gradient(1, RED, 1.0, 0.0),
            "radial-gradient(circle at 33% 0%, #ff000080 0px, #ff000000 50.0%)"
        );
    }

    #[test]
    fn background_joins_every_slot() {
        let gradient = background_gradient(&input(0.0, 0.0));
        assert_eq!(gradient.matches("radial-gradient").count(), 16);
    }

    #[test]
    fn throttled_update_within_window_repeats_output() {
        let start = Instant::now();
        let mut background = BackgroundGradient::default();

        let first = background.update(start, input(0.2, 0.0)).to_string();
        let second = background
            .update(start + Duration::from_millis(10), input(1.5, 0.9))
            .to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn update_after_window_reflects_new_inputs() {
        let start = Instant::now();
        let mut background = BackgroundGradient::default();

        let first = background.update(start, input(0.2, 0.0)).to_string();
        let second = background
            .update(start + Duration::from_millis(31), input(1.5, 0.9))
            .to_string();
        assert_ne!(first, second);
        assert_eq!(second, background_gradient(&input(1.5, 0.9)));
    }
}
