//! The boundary with the host that owns the world.
//!
//! The public API of the host (`HostWorld`, `HostChunk`) is always available
//! and is what the fallback paths use. Internal state is only reachable
//! through `Introspect` and the field layout of the running host version.

pub mod sim;

use crate::reflect::class::Introspect;
use crate::world::entity::Entity;
use crate::world::long_map::{LongHashSet, LongObjectMap};
use parking_lot::RwLock;
use std::sync::Arc;

pub type ChunkRef = Arc<dyn HostChunk>;
pub type WorldRef = Arc<dyn HostWorld>;

/// The chunk provider's loaded chunks, keyed by packed chunk key.
pub type ChunkMap = RwLock<LongObjectMap<ChunkRef>>;
/// The chunk provider's set of chunks marked for unloading.
pub type UnloadQueue = RwLock<LongHashSet>;
/// Listeners the world notifies about block changes.
pub type AccessList = RwLock<Vec<Arc<dyn WorldAccess>>>;
pub type PlayerManagerSlot = Arc<dyn PlayerManager>;

pub trait HostWorld: Introspect + Send + Sync {
    fn name(&self) -> &str;

    fn max_height(&self) -> i32;

    /// Internal object that owns loaded chunks and the unload queue.
    fn chunk_provider(&self) -> &dyn Introspect;

    fn loaded_chunks(&self) -> Vec<ChunkRef>;

    fn is_chunk_loaded(&self, x: i32, z: i32) -> bool;

    /// Gets the chunk at (x, z), loading or generating it if needed.
    fn chunk_at(&self, x: i32, z: i32) -> ChunkRef;

    fn entities_in_chunk(&self, x: i32, z: i32) -> Vec<Entity>;

    /// Lighting recheck hook, absolute block coordinates.
    fn check_light(&self, x: i32, y: i32, z: i32);

    /// Physics update hook, absolute block coordinates.
    fn apply_physics(&self, x: i32, y: i32, z: i32, type_id: i32);

    fn save_chunk(&self, chunk: &ChunkRef);
}

/// A chunk column. Block coordinates are local to the chunk.
pub trait HostChunk: Introspect + Send + Sync {
    fn x(&self) -> i32;

    fn z(&self) -> i32;

    /// None once the owning world has been dropped.
    fn world(&self) -> Option<WorldRef>;

    fn height(&self, x: i32, z: i32) -> i32;

    fn block_light(&self, x: i32, y: i32, z: i32) -> i32;

    fn sky_light(&self, x: i32, y: i32, z: i32) -> i32;

    fn data(&self, x: i32, y: i32, z: i32) -> i32;

    fn type_id(&self, x: i32, y: i32, z: i32) -> i32;

    /// Writes type and data, returning whether anything changed. Does not run
    /// the world's lighting or physics hooks.
    fn set_block(&self, x: i32, y: i32, z: i32, type_id: i32, data: i32) -> bool;
}

pub trait WorldAccess: Send + Sync {
    fn block_changed(&self, x: i32, y: i32, z: i32);
}

pub trait PlayerManager: Send + Sync {
    /// Marks an absolute block position for resending to watching players.
    fn flag_dirty(&self, x: i32, y: i32, z: i32);
}
