use crate::world::chunk_key::ChunkKey;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type EntityId = u32;

/// The world's global entity registry.
pub type EntityRegistry = RwLock<EntityIndex>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub kind: String,
    pub position: [f64; 3],
}

impl Entity {
    pub fn new(id: EntityId, kind: impl Into<String>, position: [f64; 3]) -> Self {
        Self {
            id,
            kind: kind.into(),
            position,
        }
    }

    pub fn chunk_key(&self) -> ChunkKey {
        ChunkKey::from_block(
            self.position[0].floor() as i32,
            self.position[2].floor() as i32,
        )
    }
}

/// Entities by id. Chunks do not own entities; they are found through the
/// chunk key of their position.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    by_id: HashMap<EntityId, Entity>,
}

impl EntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        self.by_id.insert(entity.id, entity)
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.by_id.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn in_chunk(&self, key: ChunkKey) -> impl Iterator<Item = &Entity> + '_ {
        self.by_id
            .values()
            .filter(move |entity| entity.chunk_key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_membership_by_position() {
        let mut index = EntityIndex::new();
        index.insert(Entity::new(1, "pig", [0.5, 64.0, 15.9]));
        index.insert(Entity::new(2, "cow", [-0.5, 64.0, 3.0]));
        index.insert(Entity::new(3, "sheep", [16.0, 64.0, 0.0]));

        let origin: Vec<_> = index.in_chunk(ChunkKey::new(0, 0)).map(|e| e.id).collect();
        assert_eq!(origin, vec![1]);
        assert_eq!(index.in_chunk(ChunkKey::new(-1, 0)).count(), 1);
        assert_eq!(index.in_chunk(ChunkKey::new(1, 0)).count(), 1);
    }
}
