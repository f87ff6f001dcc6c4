pub mod capability;
pub mod chunk_util;
pub mod config;
pub mod host;
pub mod reflect;
pub mod utils;
pub mod world;

// Re-export commonly used types
pub use capability::{Capabilities, CapabilityReport, FlagState, Representation, RepresentationSet};
pub use chunk_util::ChunkUtil;
pub use config::{FieldMapping, HostLayout, ShimConfig};
pub use host::{ChunkRef, HostChunk, HostWorld, PlayerManager, WorldAccess, WorldRef};
pub use reflect::{AccessError, FieldHandle, FieldLocator, Unavailable};
pub use utils::error::{ConfigError, Result, ShimError};
pub use world::{ChunkCollection, ChunkKey, Entity, EntityCollection};
