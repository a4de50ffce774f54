pub mod control;
pub mod framework;
pub mod io;
pub mod prelude;
pub mod render;
pub mod runtime;

pub use runtime::app::{App, AppConfig};
