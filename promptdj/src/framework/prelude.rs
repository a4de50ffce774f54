pub use crate::debug_throttled;
pub use crate::framework::logging::init_logger;
pub use crate::framework::logging::{debug, error, info, trace, warn};
pub use crate::framework::util::HashSet;
pub use crate::framework::util::clamp01;
pub use crate::framework::util::map_range;
pub use crate::warn_once;
pub use crate::framework::publisher::Publisher;
