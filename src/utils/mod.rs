pub mod error;
pub mod logging;

pub use error::{ConfigError, Result, ShimError};
pub use logging::init_logging;
