pub mod feedback;
pub mod gradient;
pub mod throttle;
pub mod visualizer;

pub use feedback::*;
pub use gradient::{BackgroundGradient, GradientInput};
pub use throttle::Throttle;
pub use visualizer::{Canvas, DrawList, Rect};
