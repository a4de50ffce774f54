//! Mirrored frequency bars.

use crate::control::Color;

pub const DEFAULT_BAR_COLOR: Color = Color::WHITE;

/// Fraction of the canvas height a full-scale bin reaches.
pub const MAX_BAR_HEIGHT: f32 = 0.4;
pub const HIGHLIGHT_HEIGHT: f32 = 2.0;

const HIGHLIGHT_MIX: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }
}

/// Minimal 2D surface the visualizer paints on. Origin is top-left.
pub trait Canvas {
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: Color);
}

/// A canvas that records what was drawn since the last clear.
#[derive(Clone, Debug, Default)]
pub struct DrawList {
    width: f32,
    height: f32,
    pub rects: Vec<(Rect, Color)>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            rects: Vec::new(),
        }
    }
}

impl Canvas for DrawList {
    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.rects.clear();
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.rects.push((rect, color));
    }
}

pub fn bar_height(magnitude: u8, canvas_height: f32) -> f32 {
    f32::from(magnitude) / 255.0 * MAX_BAR_HEIGHT * canvas_height
}

/// Clear the canvas and draw each bin twice, once counting from the left edge
/// and once from the right, so the halves meet in the middle. Silent bins
/// draw nothing.
pub fn paint_spectrum<C: Canvas + ?Sized>(
    canvas: &mut C,
    spectrum: &[u8],
    color: Color,
) {
    canvas.clear();

    if spectrum.is_empty() {
        return;
    }

    let (width, height) = canvas.size();
    let bar_width = width / (spectrum.len() * 2) as f32;
    let highlight = color.mix(Color::WHITE, HIGHLIGHT_MIX);

    for (index, &magnitude) in spectrum.iter().enumerate() {
        let h = bar_height(magnitude, height);
        if h <= 0.0 {
            continue;
        }

        let y = height - h;
        let left = index as f32 * bar_width;
        let right = width - (index + 1) as f32 * bar_width;

        for x in [left, right] {
            canvas.fill_rect(Rect::new(x, y, bar_width, h), color);
            canvas.fill_rect(
                Rect::new(x, y, bar_width, HIGHLIGHT_HEIGHT.min(h)),
                highlight,
            );
        }
    }
}
