pub mod core;
pub mod layout;

pub use self::core::ShimConfig;
pub use layout::{FieldMapping, HostLayout};
