pub mod binding;
pub mod preset;
pub mod prompt;
pub mod registry;

pub use binding::*;
pub use preset::*;
pub use prompt::*;
pub use registry::*;
