pub mod chunk_key;
pub mod entity;
pub mod long_map;
pub mod section;
pub mod views;

// Re-export commonly used types
pub use chunk_key::ChunkKey;
pub use entity::{Entity, EntityId, EntityIndex, EntityRegistry};
pub use long_map::{LongHashSet, LongObjectMap};
pub use section::{section_base, section_index, ChunkSection, NibbleArray, Sections};
pub use views::{ChunkCollection, ChunkEntities, EntityCollection, LiveChunks, WorldListeners};
