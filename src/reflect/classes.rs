use crate::host::{AccessList, ChunkMap, PlayerManagerSlot, UnloadQueue};
use crate::reflect::handle::FieldHandle;
use crate::reflect::locator::FieldLocator;
use crate::world::entity::EntityRegistry;
use crate::world::section::Sections;

pub mod class {
    pub const WORLD: &str = "World";
    pub const WORLD_SERVER: &str = "WorldServer";
    pub const CHUNK_PROVIDER: &str = "ChunkProviderServer";
    pub const CHUNK: &str = "Chunk";
}

pub mod field {
    pub const PLAYER_MANAGER: &str = "player_manager";
    pub const ACCESS_LIST: &str = "access_list";
    pub const ENTITIES_BY_ID: &str = "entities_by_id";
    pub const CHUNKS: &str = "chunks";
    pub const UNLOAD_QUEUE: &str = "unload_queue";
    pub const SECTIONS: &str = "sections";
}

#[derive(Debug, Clone)]
pub struct WorldServerFields {
    pub player_manager: FieldHandle<PlayerManagerSlot>,
    pub access_list: FieldHandle<AccessList>,
    pub entities_by_id: FieldHandle<EntityRegistry>,
}

impl WorldServerFields {
    pub fn resolve(locator: &FieldLocator) -> Self {
        Self {
            player_manager: locator.resolve(class::WORLD_SERVER, field::PLAYER_MANAGER),
            access_list: locator.resolve(class::WORLD, field::ACCESS_LIST),
            entities_by_id: locator.resolve(class::WORLD_SERVER, field::ENTITIES_BY_ID),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkProviderFields {
    pub chunks: FieldHandle<ChunkMap>,
    pub unload_queue: FieldHandle<UnloadQueue>,
}

impl ChunkProviderFields {
    pub fn resolve(locator: &FieldLocator) -> Self {
        Self {
            chunks: locator.resolve(class::CHUNK_PROVIDER, field::CHUNKS),
            unload_queue: locator.resolve(class::CHUNK_PROVIDER, field::UNLOAD_QUEUE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkFields {
    pub sections: FieldHandle<Sections>,
}

impl ChunkFields {
    pub fn resolve(locator: &FieldLocator) -> Self {
        Self {
            sections: locator.resolve(class::CHUNK, field::SECTIONS),
        }
    }
}
