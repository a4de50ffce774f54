pub mod logging;
pub mod prelude;
pub mod publisher;
pub mod util;
