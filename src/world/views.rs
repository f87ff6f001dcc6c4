//! Views handed out by the facade. Live views keep the host's container and
//! delegate to it, so they observe every later change; fallback views are
//! snapshots taken from the host's public API.

use crate::host::{AccessList, ChunkMap, ChunkRef, WorldAccess};
use crate::world::chunk_key::ChunkKey;
use crate::world::entity::{Entity, EntityId, EntityRegistry};
use crate::world::long_map::LongObjectMap;
use parking_lot::RwLockReadGuard;
use std::sync::Arc;

fn key_of(chunk: &ChunkRef) -> ChunkKey {
    ChunkKey::new(chunk.x(), chunk.z())
}

/// Live view over the values of the host's chunk map.
#[derive(Clone)]
pub struct LiveChunks {
    map: Arc<ChunkMap>,
}

impl LiveChunks {
    pub fn new(map: Arc<ChunkMap>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    pub fn contains(&self, chunk: &ChunkRef) -> bool {
        self.map
            .read()
            .get(key_of(chunk))
            .map_or(false, |stored| Arc::ptr_eq(stored, chunk))
    }

    /// Stores `chunk` under its own coordinates, returning what it replaced.
    pub fn insert(&self, chunk: ChunkRef) -> Option<ChunkRef> {
        let key = key_of(&chunk);
        self.map.write().put(key, chunk)
    }

    /// Removes `chunk` if it is the chunk stored under its coordinates.
    pub fn remove(&self, chunk: &ChunkRef) -> bool {
        let key = key_of(chunk);
        let mut map = self.map.write();
        let present = map
            .get(key)
            .map_or(false, |stored| Arc::ptr_eq(stored, chunk));
        if present {
            map.remove(key);
        }
        present
    }

    /// Holds the map's read lock until the guard is dropped.
    pub fn read(&self) -> LiveChunksGuard<'_> {
        LiveChunksGuard {
            map: self.map.read(),
        }
    }

    pub fn to_vec(&self) -> Vec<ChunkRef> {
        self.map.read().values().cloned().collect()
    }
}

pub struct LiveChunksGuard<'a> {
    map: RwLockReadGuard<'a, LongObjectMap<ChunkRef>>,
}

impl<'a> LiveChunksGuard<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &ChunkRef> + '_ {
        self.map.values()
    }
}

/// Result of `ChunkUtil::chunks`.
#[derive(Clone)]
pub enum ChunkCollection {
    Live(LiveChunks),
    Loaded(Vec<ChunkRef>),
}

impl ChunkCollection {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Live(live) => live.len(),
            Self::Loaded(chunks) => chunks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, chunk: &ChunkRef) -> bool {
        match self {
            Self::Live(live) => live.contains(chunk),
            Self::Loaded(chunks) => chunks.iter().any(|c| Arc::ptr_eq(c, chunk)),
        }
    }

    pub fn to_vec(&self) -> Vec<ChunkRef> {
        match self {
            Self::Live(live) => live.to_vec(),
            Self::Loaded(chunks) => chunks.clone(),
        }
    }
}

/// Live view of the entities whose position lies in one chunk.
#[derive(Clone)]
pub struct ChunkEntities {
    registry: Arc<EntityRegistry>,
    key: ChunkKey,
}

impl ChunkEntities {
    pub fn new(registry: Arc<EntityRegistry>, key: ChunkKey) -> Self {
        Self { registry, key }
    }

    pub fn key(&self) -> ChunkKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.registry.read().in_chunk(self.key).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.registry
            .read()
            .get(id)
            .map_or(false, |entity| entity.chunk_key() == self.key)
    }

    /// Adds `entity` to the world registry. Rejected if it is not positioned
    /// inside this chunk.
    pub fn add(&self, entity: Entity) -> bool {
        if entity.chunk_key() != self.key {
            return false;
        }
        self.registry.write().insert(entity);
        true
    }

    pub fn remove(&self, id: EntityId) -> Option<Entity> {
        let mut registry = self.registry.write();
        if registry.get(id)?.chunk_key() != self.key {
            return None;
        }
        registry.remove(id)
    }

    pub fn to_vec(&self) -> Vec<Entity> {
        let registry = self.registry.read();
        let mut entities: Vec<Entity> = registry.in_chunk(self.key).cloned().collect();
        entities.sort_by_key(|entity| entity.id);
        entities
    }

    pub fn for_each(&self, mut f: impl FnMut(&Entity)) {
        for entity in self.registry.read().in_chunk(self.key) {
            f(entity);
        }
    }
}

/// Result of `ChunkUtil::entities`.
#[derive(Clone)]
pub enum EntityCollection {
    Live(ChunkEntities),
    Snapshot(Vec<Entity>),
}

impl EntityCollection {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Live(live) => live.len(),
            Self::Snapshot(entities) => entities.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: EntityId) -> bool {
        match self {
            Self::Live(live) => live.contains(id),
            Self::Snapshot(entities) => entities.iter().any(|entity| entity.id == id),
        }
    }

    /// Sorted by entity id.
    pub fn to_vec(&self) -> Vec<Entity> {
        match self {
            Self::Live(live) => live.to_vec(),
            Self::Snapshot(entities) => {
                let mut entities = entities.clone();
                entities.sort_by_key(|entity| entity.id);
                entities
            }
        }
    }
}

/// Live view over the world's access list.
#[derive(Clone)]
pub struct WorldListeners {
    list: Arc<AccessList>,
}

impl WorldListeners {
    pub fn new(list: Arc<AccessList>) -> Self {
        Self { list }
    }

    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    pub fn add(&self, listener: Arc<dyn WorldAccess>) {
        self.list.write().push(listener);
    }

    pub fn remove(&self, listener: &Arc<dyn WorldAccess>) -> bool {
        let mut list = self.list.write();
        let before = list.len();
        list.retain(|l| !Arc::ptr_eq(l, listener));
        list.len() != before
    }

    /// Notifies every listener of a change at an absolute block position.
    pub fn block_changed(&self, x: i32, y: i32, z: i32) {
        let listeners: Vec<_> = self.list.read().clone();
        for listener in listeners {
            listener.block_changed(x, y, z);
        }
    }
}
