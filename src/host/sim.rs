//! An in-memory host with switchable internals.
//!
//! A `HostProfile` decides which internals match the built-in `v1_4_5`
//! layout. Internals that do not match are published under a different type
//! or symbol, the way a different host build would, while the public API
//! keeps working on the same data.

use crate::host::{
    AccessList, ChunkMap, ChunkRef, HostChunk, HostWorld, PlayerManager, PlayerManagerSlot,
    UnloadQueue, WorldAccess, WorldRef,
};
use crate::reflect::class::{ClassDecl, ClassRegistry, FieldDecl, FieldTable, FieldValue, Introspect};
use crate::reflect::classes::class;
use crate::world::chunk_key::ChunkKey;
use crate::world::entity::{Entity, EntityId, EntityIndex, EntityRegistry};
use crate::world::long_map::{LongHashSet, LongObjectMap};
use crate::world::section::{
    section_base, section_index, ChunkSection, Sections, ABSENT_SKY_LIGHT, MAX_TYPE_ID,
    SECTION_HEIGHT,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

pub const SIM_VERSION: &str = "v1_4_5";

/// Chunk map published under a type no layout knows about.
pub struct ChunkTable(pub Arc<ChunkMap>);
/// Unload queue published under a type no layout knows about.
pub struct UnloadList(pub Arc<UnloadQueue>);
/// Entity registry published under a type no layout knows about.
pub struct EntityTable(pub Arc<EntityRegistry>);
/// Section array published under a type no layout knows about.
pub struct SectionList(pub Arc<Sections>);
/// Player manager published under a type no layout knows about.
pub struct ManagerHolder(pub Arc<SimPlayerManager>);

#[derive(Debug, Clone)]
pub struct HostProfile {
    pub version: String,
    pub chunk_map: bool,
    pub unload_queue: bool,
    pub sections: bool,
    pub entity_index: bool,
    pub access_list: bool,
    pub player_manager: bool,
}

impl HostProfile {
    /// Every internal matches the built-in layout.
    pub fn v1_4_5() -> Self {
        Self {
            version: SIM_VERSION.to_string(),
            chunk_map: true,
            unload_queue: true,
            sections: true,
            entity_index: true,
            access_list: true,
            player_manager: true,
        }
    }

    /// Same version string, but no internal matches the layout.
    pub fn public_only() -> Self {
        Self {
            version: SIM_VERSION.to_string(),
            chunk_map: false,
            unload_queue: false,
            sections: false,
            entity_index: false,
            access_list: false,
            player_manager: false,
        }
    }
}

pub struct SimClasses {
    version: String,
    classes: HashMap<String, ClassDecl>,
}

impl SimClasses {
    pub fn new(profile: &HostProfile) -> Self {
        let world = if profile.access_list {
            ClassDecl::new(class::WORLD).with_field(FieldDecl::of::<AccessList>("w"))
        } else {
            ClassDecl::new(class::WORLD)
        };

        let world_server = ClassDecl::new(class::WORLD_SERVER)
            .extends(class::WORLD)
            .with_field(if profile.player_manager {
                FieldDecl::of::<PlayerManagerSlot>("manager")
            } else {
                FieldDecl::of::<ManagerHolder>("manager")
            })
            .with_field(if profile.entity_index {
                FieldDecl::of::<EntityRegistry>("entitiesById")
            } else {
                FieldDecl::of::<EntityTable>("entitiesById")
            });

        let provider = ClassDecl::new(class::CHUNK_PROVIDER)
            .with_field(if profile.chunk_map {
                FieldDecl::of::<ChunkMap>("chunks")
            } else {
                FieldDecl::of::<ChunkTable>("chunks")
            })
            .with_field(if profile.unload_queue {
                FieldDecl::of::<UnloadQueue>("unloadQueue")
            } else {
                FieldDecl::of::<UnloadList>("unloadQueue")
            });

        // renamed rather than retyped when the profile does not match
        let chunk = ClassDecl::new(class::CHUNK).with_field(FieldDecl::of::<Sections>(
            if profile.sections { "sections" } else { "blockSections" },
        ));

        let classes = [world, world_server, provider, chunk]
            .into_iter()
            .map(|decl| (decl.name.clone(), decl))
            .collect();
        Self {
            version: profile.version.clone(),
            classes,
        }
    }
}

impl ClassRegistry for SimClasses {
    fn host_version(&self) -> &str {
        &self.version
    }

    fn class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.get(name)
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.keys().cloned().collect()
    }
}

/// Creates worlds that share one set of class declarations.
pub struct SimHost {
    profile: HostProfile,
    classes: Arc<SimClasses>,
}

impl SimHost {
    pub fn new(profile: HostProfile) -> Self {
        let classes = Arc::new(SimClasses::new(&profile));
        Self { profile, classes }
    }

    pub fn version(&self) -> &str {
        &self.profile.version
    }

    pub fn classes(&self) -> Arc<dyn ClassRegistry> {
        self.classes.clone()
    }

    pub fn create_world(&self, name: &str, max_height: i32) -> Arc<SimWorld> {
        SimWorld::new(name, max_height, self.profile.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    CheckLight { x: i32, y: i32, z: i32 },
    Physics { x: i32, y: i32, z: i32, type_id: i32 },
    Saved { x: i32, z: i32 },
    Generated { x: i32, z: i32 },
    ListedChunks,
}

#[derive(Debug, Default)]
pub struct SimPlayerManager {
    dirty: Mutex<Vec<(i32, i32, i32)>>,
}

impl SimPlayerManager {
    pub fn dirty(&self) -> Vec<(i32, i32, i32)> {
        self.dirty.lock().clone()
    }
}

impl PlayerManager for SimPlayerManager {
    fn flag_dirty(&self, x: i32, y: i32, z: i32) {
        self.dirty.lock().push((x, y, z));
    }
}

/// World access listener that records every change it is told about.
#[derive(Debug, Default)]
pub struct BlockChangeLog {
    changes: Mutex<Vec<(i32, i32, i32)>>,
}

impl BlockChangeLog {
    pub fn changes(&self) -> Vec<(i32, i32, i32)> {
        self.changes.lock().clone()
    }
}

impl WorldAccess for BlockChangeLog {
    fn block_changed(&self, x: i32, y: i32, z: i32) {
        self.changes.lock().push((x, y, z));
    }
}

pub struct SimChunkProvider {
    fields: FieldTable,
}

impl Introspect for SimChunkProvider {
    fn class_name(&self) -> &str {
        class::CHUNK_PROVIDER
    }

    fn field(&self, symbol: &str) -> Option<Arc<FieldValue>> {
        self.fields.get(symbol)
    }

    fn replace_field(&self, symbol: &str, value: Arc<FieldValue>) -> bool {
        self.fields.replace(symbol, value)
    }
}

pub struct SimWorld {
    name: String,
    max_height: i32,
    profile: HostProfile,
    this: Weak<SimWorld>,
    chunks: Arc<ChunkMap>,
    unload_queue: Arc<UnloadQueue>,
    entities: Arc<EntityRegistry>,
    access_list: Arc<AccessList>,
    player_manager: Arc<SimPlayerManager>,
    fields: FieldTable,
    provider: SimChunkProvider,
    events: Mutex<Vec<HostEvent>>,
}

impl SimWorld {
    pub fn new(name: &str, max_height: i32, profile: HostProfile) -> Arc<Self> {
        let chunks: Arc<ChunkMap> = Arc::new(RwLock::new(LongObjectMap::new()));
        let unload_queue: Arc<UnloadQueue> = Arc::new(RwLock::new(LongHashSet::new()));
        let entities: Arc<EntityRegistry> = Arc::new(RwLock::new(EntityIndex::new()));
        let access_list: Arc<AccessList> = Arc::new(RwLock::new(Vec::new()));
        let player_manager = Arc::new(SimPlayerManager::default());

        let provider_chunks: Arc<FieldValue> = if profile.chunk_map {
            chunks.clone()
        } else {
            Arc::new(ChunkTable(chunks.clone()))
        };
        let provider_unload: Arc<FieldValue> = if profile.unload_queue {
            unload_queue.clone()
        } else {
            Arc::new(UnloadList(unload_queue.clone()))
        };
        let provider = SimChunkProvider {
            fields: FieldTable::new()
                .with("chunks", provider_chunks)
                .with("unloadQueue", provider_unload),
        };

        let manager: Arc<FieldValue> = if profile.player_manager {
            let slot: PlayerManagerSlot = player_manager.clone();
            Arc::new(slot)
        } else {
            Arc::new(ManagerHolder(player_manager.clone()))
        };
        let registry: Arc<FieldValue> = if profile.entity_index {
            entities.clone()
        } else {
            Arc::new(EntityTable(entities.clone()))
        };
        let mut fields = FieldTable::new()
            .with("manager", manager)
            .with("entitiesById", registry);
        if profile.access_list {
            fields = fields.with("w", access_list.clone());
        }

        Arc::new_cyclic(|this| Self {
            name: name.to_string(),
            max_height,
            profile,
            this: this.clone(),
            chunks,
            unload_queue,
            entities,
            access_list,
            player_manager,
            fields,
            provider,
            events: Mutex::new(Vec::new()),
        })
    }

    /// Creates a chunk belonging to this world without registering it.
    pub fn new_chunk(&self, x: i32, z: i32) -> ChunkRef {
        Arc::new(SimChunk::new(
            self.this.clone(),
            x,
            z,
            self.max_height,
            self.profile.sections,
        ))
    }

    /// Generates and registers an empty chunk, replacing any loaded one.
    pub fn load_chunk(&self, x: i32, z: i32) -> ChunkRef {
        let chunk = self.new_chunk(x, z);
        self.chunks.write().put(ChunkKey::new(x, z), chunk.clone());
        self.events.lock().push(HostEvent::Generated { x, z });
        chunk
    }

    pub fn unload_chunk(&self, x: i32, z: i32) -> Option<ChunkRef> {
        self.chunks.write().remove(ChunkKey::new(x, z))
    }

    pub fn is_marked_for_unload(&self, x: i32, z: i32) -> bool {
        self.unload_queue.read().contains(x, z)
    }

    pub fn spawn(&self, entity: Entity) {
        self.entities.write().insert(entity);
    }

    pub fn despawn(&self, id: EntityId) -> Option<Entity> {
        self.entities.write().remove(id)
    }

    pub fn add_listener(&self, listener: Arc<dyn WorldAccess>) {
        self.access_list.write().push(listener);
    }

    pub fn player_manager(&self) -> Arc<SimPlayerManager> {
        self.player_manager.clone()
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    pub fn clear_events(&self) {
        self.events.lock().clear();
    }

    /// Republishes the chunk map under an unknown type, as a plugin swapping
    /// the provider's internals at runtime would.
    pub fn swap_chunk_map_representation(&self) -> bool {
        self.provider
            .fields
            .replace("chunks", Arc::new(ChunkTable(self.chunks.clone())))
    }

    pub fn swap_unload_queue_representation(&self) -> bool {
        self.provider
            .fields
            .replace("unloadQueue", Arc::new(UnloadList(self.unload_queue.clone())))
    }

    pub fn swap_entity_registry_representation(&self) -> bool {
        self.fields
            .replace("entitiesById", Arc::new(EntityTable(self.entities.clone())))
    }
}

impl Introspect for SimWorld {
    fn class_name(&self) -> &str {
        class::WORLD_SERVER
    }

    fn field(&self, symbol: &str) -> Option<Arc<FieldValue>> {
        self.fields.get(symbol)
    }

    fn replace_field(&self, symbol: &str, value: Arc<FieldValue>) -> bool {
        self.fields.replace(symbol, value)
    }
}

impl HostWorld for SimWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn max_height(&self) -> i32 {
        self.max_height
    }

    fn chunk_provider(&self) -> &dyn Introspect {
        &self.provider
    }

    fn loaded_chunks(&self) -> Vec<ChunkRef> {
        self.events.lock().push(HostEvent::ListedChunks);
        self.chunks.read().values().cloned().collect()
    }

    fn is_chunk_loaded(&self, x: i32, z: i32) -> bool {
        self.chunks.read().contains_key(ChunkKey::new(x, z))
    }

    fn chunk_at(&self, x: i32, z: i32) -> ChunkRef {
        let existing = self.chunks.read().get(ChunkKey::new(x, z)).cloned();
        match existing {
            Some(chunk) => chunk,
            None => self.load_chunk(x, z),
        }
    }

    fn entities_in_chunk(&self, x: i32, z: i32) -> Vec<Entity> {
        self.entities
            .read()
            .in_chunk(ChunkKey::new(x, z))
            .cloned()
            .collect()
    }

    fn check_light(&self, x: i32, y: i32, z: i32) {
        self.events.lock().push(HostEvent::CheckLight { x, y, z });
    }

    fn apply_physics(&self, x: i32, y: i32, z: i32, type_id: i32) {
        self.events
            .lock()
            .push(HostEvent::Physics { x, y, z, type_id });
    }

    fn save_chunk(&self, chunk: &ChunkRef) {
        self.events.lock().push(HostEvent::Saved {
            x: chunk.x(),
            z: chunk.z(),
        });
    }
}

pub struct SimChunk {
    x: i32,
    z: i32,
    world: Weak<SimWorld>,
    sections: Arc<Sections>,
    height_map: RwLock<Vec<i32>>,
    fields: FieldTable,
}

impl SimChunk {
    fn new(world: Weak<SimWorld>, x: i32, z: i32, max_height: i32, sections_match: bool) -> Self {
        let count = ((max_height.max(0) + SECTION_HEIGHT - 1) / SECTION_HEIGHT) as usize;
        let sections: Arc<Sections> = Arc::new(RwLock::new(vec![None; count]));
        let symbol = if sections_match { "sections" } else { "blockSections" };
        let fields = FieldTable::new().with(symbol, sections.clone());
        Self {
            x,
            z,
            world,
            sections,
            height_map: RwLock::new(vec![0; 256]),
            fields,
        }
    }

    fn top(&self) -> i32 {
        self.sections.read().len() as i32 * SECTION_HEIGHT
    }

    fn column(x: i32, z: i32) -> usize {
        (((z & 15) << 4) | (x & 15)) as usize
    }

    fn read_section<R>(&self, y: i32, absent: R, read: impl FnOnce(&ChunkSection) -> R) -> R {
        if y < 0 || y >= self.top() {
            return absent;
        }
        let sections = self.sections.read();
        match &sections[section_index(y) as usize] {
            Some(section) => read(section),
            None => absent,
        }
    }
}

impl Introspect for SimChunk {
    fn class_name(&self) -> &str {
        class::CHUNK
    }

    fn field(&self, symbol: &str) -> Option<Arc<FieldValue>> {
        self.fields.get(symbol)
    }

    fn replace_field(&self, symbol: &str, value: Arc<FieldValue>) -> bool {
        self.fields.replace(symbol, value)
    }
}

impl HostChunk for SimChunk {
    fn x(&self) -> i32 {
        self.x
    }

    fn z(&self) -> i32 {
        self.z
    }

    fn world(&self) -> Option<WorldRef> {
        let world: WorldRef = self.world.upgrade()?;
        Some(world)
    }

    fn height(&self, x: i32, z: i32) -> i32 {
        self.height_map.read()[Self::column(x, z)]
    }

    fn block_light(&self, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(y, 0, |section| section.block_light(x, y, z))
    }

    fn sky_light(&self, x: i32, y: i32, z: i32) -> i32 {
        if y < 0 {
            return 0;
        }
        self.read_section(y, ABSENT_SKY_LIGHT, |section| section.sky_light(x, y, z))
    }

    fn data(&self, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(y, 0, |section| section.data(x, y, z))
    }

    fn type_id(&self, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(y, 0, |section| section.type_id(x, y, z))
    }

    fn set_block(&self, x: i32, y: i32, z: i32, type_id: i32, data: i32) -> bool {
        if y < 0 || y >= self.top() {
            return false;
        }
        let (type_id, data) = (type_id & MAX_TYPE_ID, data & 0xF);
        let mut sections = self.sections.write();
        let index = section_index(y) as usize;

        let previous = sections[index]
            .as_ref()
            .map_or((0, 0), |s| (s.type_id(x, y, z), s.data(x, y, z)));
        if previous == (type_id, data) {
            return false;
        }

        let section = sections[index].get_or_insert_with(|| ChunkSection::new(section_base(y)));
        section.set_type_id(x, y, z, type_id);
        section.set_data(x, y, z, data);

        let mut heights = self.height_map.write();
        let column = Self::column(x, z);
        if type_id != 0 && y + 1 > heights[column] {
            heights[column] = y + 1;
        } else if type_id == 0 && y + 1 == heights[column] {
            heights[column] = (0..y)
                .rev()
                .find(|&below| {
                    sections[section_index(below) as usize]
                        .as_ref()
                        .map_or(false, |s| s.type_id(x, below, z) != 0)
                })
                .map_or(0, |below| below + 1);
        }
        true
    }
}
