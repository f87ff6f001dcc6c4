//! High-level access to chunks of a host world.
//!
//! Every operation that can use one of the host's internal representations
//! tries it first and falls back to the host's public API once the
//! representation is unavailable. A fault on a fast path disables that path
//! for the rest of the process.

use crate::capability::{Capabilities, Representation};
use crate::config::core::ShimConfig;
use crate::config::layout::HostLayout;
use crate::host::{ChunkRef, HostChunk, HostWorld, PlayerManagerSlot};
use crate::reflect::class::ClassRegistry;
use crate::reflect::classes::{ChunkFields, ChunkProviderFields, WorldServerFields};
use crate::reflect::handle::AccessError;
use crate::reflect::locator::FieldLocator;
use crate::utils::error::{Result, ShimError};
use crate::world::chunk_key::ChunkKey;
use crate::world::section::{section_base, section_index, ChunkSection, ABSENT_SKY_LIGHT};
use crate::world::views::{
    ChunkCollection, ChunkEntities, EntityCollection, LiveChunks, WorldListeners,
};
use log::debug;
use once_cell::sync::OnceCell;
use std::sync::Arc;

static INSTALLED: OnceCell<ChunkUtil> = OnceCell::new();

pub struct ChunkUtil {
    locator: FieldLocator,
    capabilities: Arc<Capabilities>,
    world_fields: WorldServerFields,
    provider_fields: ChunkProviderFields,
    chunk_fields: ChunkFields,
}

impl ChunkUtil {
    pub fn new(layout: HostLayout, classes: Arc<dyn ClassRegistry>) -> Self {
        Self::with_capabilities(layout, classes, Arc::new(Capabilities::new()))
    }

    pub fn with_capabilities(
        layout: HostLayout,
        classes: Arc<dyn ClassRegistry>,
        capabilities: Arc<Capabilities>,
    ) -> Self {
        let locator = FieldLocator::new(layout, classes);
        let world_fields = WorldServerFields::resolve(&locator);
        let provider_fields = ChunkProviderFields::resolve(&locator);
        let chunk_fields = ChunkFields::resolve(&locator);
        Self {
            locator,
            capabilities,
            world_fields,
            provider_fields,
            chunk_fields,
        }
    }

    /// Picks the layout for the running host and applies the configured
    /// disabled fast paths.
    pub fn from_config(config: &ShimConfig, classes: Arc<dyn ClassRegistry>) -> Result<Self> {
        let layout = config.layout_for(classes.host_version())?;
        let capabilities = Arc::new(Capabilities::with_disabled(config.disabled));
        Ok(Self::with_capabilities(layout, classes, capabilities))
    }

    /// Makes this the process-wide instance returned by `global`.
    pub fn install(self) -> Result<&'static ChunkUtil> {
        let mut fresh = false;
        let installed = INSTALLED.get_or_init(|| {
            fresh = true;
            self
        });
        if fresh {
            Ok(installed)
        } else {
            Err(ShimError::AlreadyInstalled)
        }
    }

    pub fn global() -> Option<&'static ChunkUtil> {
        INSTALLED.get()
    }

    pub fn capabilities(&self) -> &Arc<Capabilities> {
        &self.capabilities
    }

    pub fn locator(&self) -> &FieldLocator {
        &self.locator
    }

    /// Runs `attempt` if the fast path for `repr` is usable. Returns `None`
    /// when the caller has to take the public path instead.
    fn fast<R>(
        &self,
        repr: Representation,
        available: bool,
        attempt: impl FnOnce() -> std::result::Result<R, AccessError>,
    ) -> Option<R> {
        if self.capabilities.is_usable(repr, || available) {
            match attempt() {
                Ok(value) => return Some(value),
                Err(fault) => {
                    self.capabilities.downgrade(repr, &fault);
                }
            }
        }
        self.capabilities.record_fallback(repr);
        None
    }

    /// Like `fast`, for operations the public API cannot carry out.
    fn required<R>(
        &self,
        repr: Representation,
        available: bool,
        operation: &'static str,
        attempt: impl FnOnce() -> std::result::Result<R, AccessError>,
    ) -> Result<R> {
        if self.capabilities.is_usable(repr, || available) {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(fault) => {
                    self.capabilities.downgrade(repr, &fault);
                }
            }
        }
        Err(ShimError::NoSupportedRepresentation {
            operation,
            tried: repr.as_set(),
        })
    }

    /// Reads from the section holding `y`. `None` means the public accessor
    /// has to answer, either because the fast path is off or because `y` is
    /// outside the section array.
    fn read_section<R>(
        &self,
        chunk: &dyn HostChunk,
        y: i32,
        absent: R,
        read: impl FnOnce(&ChunkSection) -> R,
    ) -> Option<R> {
        let handle = &self.chunk_fields.sections;
        self.fast(Representation::SectionArray, handle.is_available(), || {
            let sections = handle.get(chunk)?;
            let sections = sections.read();
            Ok(usize::try_from(section_index(y))
                .ok()
                .and_then(|index| sections.get(index))
                .map(|slot| slot.as_ref().map_or(absent, read)))
        })
        .flatten()
    }

    pub fn height(&self, chunk: &dyn HostChunk, x: i32, z: i32) -> i32 {
        chunk.height(x & 15, z & 15)
    }

    pub fn block_light(&self, chunk: &dyn HostChunk, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(chunk, y, 0, |section| section.block_light(x, y, z))
            .unwrap_or_else(|| chunk.block_light(x, y, z))
    }

    pub fn sky_light(&self, chunk: &dyn HostChunk, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(chunk, y, ABSENT_SKY_LIGHT, |section| {
            section.sky_light(x, y, z)
        })
        .unwrap_or_else(|| chunk.sky_light(x, y, z))
    }

    pub fn block_data(&self, chunk: &dyn HostChunk, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(chunk, y, 0, |section| section.data(x, y, z))
            .unwrap_or_else(|| chunk.data(x, y, z))
    }

    pub fn block_type_id(&self, chunk: &dyn HostChunk, x: i32, y: i32, z: i32) -> i32 {
        self.read_section(chunk, y, 0, |section| section.type_id(x, y, z))
            .unwrap_or_else(|| chunk.type_id(x, y, z))
    }

    /// Writes type and data straight into the section, without physics,
    /// lighting or neighbour updates. Positions outside `0..max_height` and
    /// chunks without a world are ignored. `x` and `z` are taken mod 16.
    pub fn set_block_fast(
        &self,
        chunk: &dyn HostChunk,
        x: i32,
        y: i32,
        z: i32,
        type_id: i32,
        data: i32,
    ) {
        let Some(world) = chunk.world() else {
            debug!("Ignoring write to detached chunk ({}, {})", chunk.x(), chunk.z());
            return;
        };
        if y < 0 || y >= world.max_height() {
            return;
        }

        let handle = &self.chunk_fields.sections;
        let written = self.fast(Representation::SectionArray, handle.is_available(), || {
            let sections = handle.get(chunk)?;
            let mut sections = sections.write();
            let slot = usize::try_from(section_index(y))
                .ok()
                .and_then(|index| sections.get_mut(index));
            if let Some(slot) = slot {
                let section = slot.get_or_insert_with(|| ChunkSection::new(section_base(y)));
                section.set_type_id(x, y, z, type_id);
                section.set_data(x, y, z, data);
            }
            Ok(())
        });
        if written.is_none() {
            chunk.set_block(x, y, z, type_id, data);
        }
    }

    /// Writes type and data, then runs the world's lighting and physics hooks
    /// at the absolute position if anything changed. `x` and `z` are taken
    /// mod 16.
    pub fn set_block(
        &self,
        chunk: &dyn HostChunk,
        x: i32,
        y: i32,
        z: i32,
        type_id: i32,
        data: i32,
    ) -> bool {
        let Some(world) = chunk.world() else {
            debug!("Ignoring write to detached chunk ({}, {})", chunk.x(), chunk.z());
            return false;
        };
        if y < 0 || y >= world.max_height() {
            return false;
        }
        if !chunk.set_block(x, y, z, type_id, data) {
            return false;
        }

        let block_x = (chunk.x() << 4) + (x & 15);
        let block_z = (chunk.z() << 4) + (z & 15);
        world.check_light(block_x, y, block_z);
        world.apply_physics(block_x, y, block_z, type_id);
        true
    }

    /// The entities positioned in `chunk`. Live when the world's entity
    /// registry is reachable, a snapshot otherwise.
    pub fn entities(&self, chunk: &dyn HostChunk) -> Result<EntityCollection> {
        let world = chunk.world().ok_or(ShimError::Detached {
            x: chunk.x(),
            z: chunk.z(),
        })?;
        let handle = &self.world_fields.entities_by_id;
        let key = ChunkKey::new(chunk.x(), chunk.z());
        let live = self.fast(Representation::EntityIndex, handle.is_available(), || {
            handle.get(&*world)
        });
        Ok(match live {
            Some(registry) => EntityCollection::Live(ChunkEntities::new(registry, key)),
            None => EntityCollection::Snapshot(world.entities_in_chunk(chunk.x(), chunk.z())),
        })
    }

    /// All loaded chunks of `world`.
    pub fn chunks(&self, world: &dyn HostWorld) -> ChunkCollection {
        let handle = &self.provider_fields.chunks;
        let live = self.fast(Representation::ChunkMap, handle.is_available(), || {
            handle.get(world.chunk_provider())
        });
        match live {
            Some(map) => ChunkCollection::Live(LiveChunks::new(map)),
            None => ChunkCollection::Loaded(world.loaded_chunks()),
        }
    }

    /// The chunk at (x, z) if it is loaded. Never loads or generates.
    pub fn chunk(&self, world: &dyn HostWorld, x: i32, z: i32) -> Option<ChunkRef> {
        let handle = &self.provider_fields.chunks;
        let found = self.fast(Representation::ChunkMap, handle.is_available(), || {
            let map = handle.get(world.chunk_provider())?;
            let chunk = map.read().get(ChunkKey::new(x, z)).cloned();
            Ok(chunk)
        });
        match found {
            Some(chunk) => chunk,
            None if world.is_chunk_loaded(x, z) => Some(world.chunk_at(x, z)),
            None => None,
        }
    }

    /// Stores `chunk` in the world's chunk map under (x, z).
    pub fn set_chunk(&self, world: &dyn HostWorld, x: i32, z: i32, chunk: ChunkRef) -> Result<()> {
        let handle = &self.provider_fields.chunks;
        self.required(
            Representation::ChunkMap,
            handle.is_available(),
            "set chunk",
            || {
                let map = handle.get(world.chunk_provider())?;
                map.write().put(ChunkKey::new(x, z), chunk);
                Ok(())
            },
        )
    }

    pub fn save_chunk(&self, chunk: &ChunkRef) -> Result<()> {
        let world = chunk.world().ok_or(ShimError::Detached {
            x: chunk.x(),
            z: chunk.z(),
        })?;
        world.save_chunk(chunk);
        Ok(())
    }

    /// Marks or unmarks (x, z) for unloading.
    pub fn set_chunk_unloading(
        &self,
        world: &dyn HostWorld,
        x: i32,
        z: i32,
        unload: bool,
    ) -> Result<()> {
        let handle = &self.provider_fields.unload_queue;
        self.required(
            Representation::UnloadQueue,
            handle.is_available(),
            "set unload queue",
            || {
                let queue = handle.get(world.chunk_provider())?;
                let mut queue = queue.write();
                if unload {
                    queue.add(x, z);
                } else {
                    queue.remove(x, z);
                }
                Ok(())
            },
        )
    }

    /// Live view over the listeners the world notifies about block changes.
    pub fn world_listeners(&self, world: &dyn HostWorld) -> Result<WorldListeners> {
        let handle = &self.world_fields.access_list;
        self.required(
            Representation::AccessList,
            handle.is_available(),
            "access world listeners",
            || handle.get(world).map(WorldListeners::new),
        )
    }

    pub fn player_manager(&self, world: &dyn HostWorld) -> Option<PlayerManagerSlot> {
        let handle = &self.world_fields.player_manager;
        self.fast(Representation::PlayerManager, handle.is_available(), || {
            handle.get(world).map(|slot| PlayerManagerSlot::clone(&slot))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{FlagState, RepresentationSet};
    use crate::host::sim::{BlockChangeLog, HostEvent, HostProfile, SimHost, SimWorld};
    use crate::host::sim::SectionList;
    use crate::host::{PlayerManager, WorldAccess};
    use crate::reflect::class::Introspect;
    use crate::world::entity::Entity;
    use crate::world::section::Sections;

    fn setup(profile: HostProfile) -> (ChunkUtil, Arc<SimWorld>) {
        let host = SimHost::new(profile);
        let world = host.create_world("world", 256);
        let util = ChunkUtil::new(HostLayout::v1_4_5(), host.classes());
        (util, world)
    }

    fn sections_of(chunk: &ChunkRef) -> Arc<Sections> {
        chunk
            .field("sections")
            .unwrap()
            .downcast::<Sections>()
            .unwrap()
    }

    #[test]
    fn test_fast_set_round_trip_without_hooks() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        world.clear_events();

        util.set_block_fast(&*chunk, 3, 64, 9, 1, 2);
        assert_eq!(util.block_type_id(&*chunk, 3, 64, 9), 1);
        assert_eq!(util.block_data(&*chunk, 3, 64, 9), 2);
        assert_eq!(chunk.type_id(3, 64, 9), 1);
        assert!(world.events().is_empty());
        assert_eq!(
            util.capabilities().state(Representation::SectionArray),
            FlagState::Available
        );
    }

    #[test]
    fn test_extended_type_ids() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 0, 0, 0, 0xABC, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, 0, 0), 0xABC);
        util.set_block_fast(&*chunk, 0, 0, 0, 0x1FFF, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, 0, 0), 0xFFF);
    }

    #[test]
    fn test_local_coordinates_wrap() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 16, 5, -1, 9, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, 5, 15), 9);
        assert_eq!(util.block_type_id(&*chunk, 32, 5, 31), 9);
        assert_eq!(chunk.type_id(0, 5, 15), 9);
    }

    #[test]
    fn test_out_of_range_writes_are_ignored() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        world.clear_events();

        util.set_block_fast(&*chunk, 0, -1, 0, 1, 0);
        util.set_block_fast(&*chunk, 0, 256, 0, 1, 0);
        assert!(!util.set_block(&*chunk, 0, -1, 0, 1, 0));
        assert!(!util.set_block(&*chunk, 0, 256, 0, 1, 0));

        assert!(sections_of(&chunk).read().iter().all(Option::is_none));
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_out_of_range_reads_use_public_accessors() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, -5, 0), 0);
        assert_eq!(util.sky_light(&*chunk, 0, 300, 0), ABSENT_SKY_LIGHT);
        assert_eq!(util.sky_light(&*chunk, 0, 100, 0), ABSENT_SKY_LIGHT);
        assert_eq!(util.block_light(&*chunk, 0, 100, 0), 0);
    }

    #[test]
    fn test_set_block_runs_hooks_once_per_change() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(2, -3);
        world.clear_events();

        assert!(util.set_block(&*chunk, 1, 70, 2, 4, 0));
        assert_eq!(
            world.events(),
            vec![
                HostEvent::CheckLight { x: 33, y: 70, z: -46 },
                HostEvent::Physics {
                    x: 33,
                    y: 70,
                    z: -46,
                    type_id: 4
                },
            ]
        );
        assert_eq!(util.block_type_id(&*chunk, 1, 70, 2), 4);
        assert_eq!(util.height(&*chunk, 1, 2), 71);

        world.clear_events();
        assert!(!util.set_block(&*chunk, 1, 70, 2, 4, 0));
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_section_anchor() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 1, 37, 1, 5, 0);

        {
            let sections = sections_of(&chunk);
            let sections = sections.read();
            let section = sections[2].as_ref().unwrap();
            assert_eq!(section.y_base(), 32);
            assert_eq!(sections.iter().filter(|s| s.is_some()).count(), 1);
        }

        util.set_block_fast(&*chunk, 1, 32, 1, 6, 0);
        util.set_block_fast(&*chunk, 1, 47, 1, 7, 0);
        let sections = sections_of(&chunk);
        let sections = sections.read();
        assert_eq!(sections.iter().filter(|s| s.is_some()).count(), 1);
        assert_eq!(sections[2].as_ref().unwrap().non_empty_count(), 3);
    }

    #[test]
    fn test_chunks_live_view() {
        let (util, world) = setup(HostProfile::v1_4_5());
        world.load_chunk(0, 0);
        let chunks = util.chunks(&*world);
        assert!(chunks.is_live());
        assert_eq!(chunks.len(), 1);

        let later = world.load_chunk(1, 1);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.contains(&later));

        world.unload_chunk(1, 1);
        assert_eq!(chunks.len(), 1);
        assert!(!chunks.contains(&later));

        let ChunkCollection::Live(live) = &chunks else {
            panic!("expected a live chunk view");
        };
        let placed = world.new_chunk(2, 2);
        assert!(live.insert(placed.clone()).is_none());
        assert!(world.is_chunk_loaded(2, 2));

        let other = world.new_chunk(2, 2);
        assert!(!live.remove(&other));
        assert!(world.is_chunk_loaded(2, 2));

        let mut coords: Vec<_> = live.read().iter().map(|c| (c.x(), c.z())).collect();
        coords.sort();
        assert_eq!(coords, vec![(0, 0), (2, 2)]);
        assert_eq!(world.loaded_chunks().len(), 2);

        assert!(live.remove(&placed));
        assert!(!world.is_chunk_loaded(2, 2));
        assert_eq!(world.loaded_chunks().len(), 1);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunks_fault_downgrades_once() {
        let (util, world) = setup(HostProfile::v1_4_5());
        world.load_chunk(0, 0);
        assert!(util.chunks(&*world).is_live());

        assert!(world.swap_chunk_map_representation());
        world.clear_events();
        for _ in 0..3 {
            let chunks = util.chunks(&*world);
            assert!(!chunks.is_live());
            assert_eq!(chunks.len(), 1);
        }

        let flag = util.capabilities().flag(Representation::ChunkMap);
        assert_eq!(flag.state(), FlagState::Unavailable);
        assert_eq!(flag.downgrade_count(), 1);
        assert_eq!(flag.fallback_count(), 3);
        assert_eq!(world.events(), vec![HostEvent::ListedChunks; 3]);
    }

    #[test]
    fn test_chunk_lookup_never_generates() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let loaded = world.load_chunk(4, -4);
        world.clear_events();

        assert!(Arc::ptr_eq(&util.chunk(&*world, 4, -4).unwrap(), &loaded));
        assert!(util.chunk(&*world, 9, 9).is_none());
        assert!(!world.is_chunk_loaded(9, 9));
        assert_eq!(
            util.capabilities().flag(Representation::ChunkMap).fallback_count(),
            0
        );

        let (util, world) = setup(HostProfile::public_only());
        let loaded = world.load_chunk(4, -4);
        world.clear_events();
        assert!(Arc::ptr_eq(&util.chunk(&*world, 4, -4).unwrap(), &loaded));
        assert!(util.chunk(&*world, 9, 9).is_none());
        assert!(world.events().is_empty());
    }

    #[test]
    fn test_set_chunk_and_unloading() {
        let (util, world) = setup(HostProfile::v1_4_5());
        world.load_chunk(0, 0);
        let replacement = world.new_chunk(0, 0);
        util.set_chunk(&*world, 0, 0, replacement.clone()).unwrap();
        assert!(Arc::ptr_eq(&util.chunk(&*world, 0, 0).unwrap(), &replacement));

        util.set_chunk_unloading(&*world, 0, 0, true).unwrap();
        assert!(world.is_marked_for_unload(0, 0));
        util.set_chunk_unloading(&*world, 0, 0, false).unwrap();
        assert!(!world.is_marked_for_unload(0, 0));
    }

    #[test]
    fn test_fatal_without_fast_path() {
        let (util, world) = setup(HostProfile::public_only());
        let chunk = world.new_chunk(0, 0);

        match util.set_chunk(&*world, 0, 0, chunk) {
            Err(ShimError::NoSupportedRepresentation { operation, tried }) => {
                assert_eq!(operation, "set chunk");
                assert_eq!(tried, RepresentationSet::CHUNK_MAP);
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
        assert!(matches!(
            util.set_chunk_unloading(&*world, 0, 0, true),
            Err(ShimError::NoSupportedRepresentation { .. })
        ));
        assert!(!world.is_marked_for_unload(0, 0));

        let forced = ChunkUtil::with_capabilities(
            HostLayout::v1_4_5(),
            SimHost::new(HostProfile::v1_4_5()).classes(),
            Arc::new(Capabilities::forced(RepresentationSet::empty())),
        );
        let world = SimHost::new(HostProfile::v1_4_5()).create_world("forced", 256);
        assert!(forced.set_chunk_unloading(&*world, 1, 1, true).is_err());
        assert!(forced.world_listeners(&*world).is_err());
    }

    #[test]
    fn test_unload_queue_fault_is_fatal_after_downgrade() {
        let (util, world) = setup(HostProfile::v1_4_5());
        util.set_chunk_unloading(&*world, 0, 0, true).unwrap();
        world.swap_unload_queue_representation();
        assert!(util.set_chunk_unloading(&*world, 0, 0, false).is_err());
        assert!(util.set_chunk_unloading(&*world, 0, 0, false).is_err());
        let flag = util.capabilities().flag(Representation::UnloadQueue);
        assert_eq!(flag.downgrade_count(), 1);
        assert!(world.is_marked_for_unload(0, 0));
    }

    #[test]
    fn test_public_only_host_uses_fallbacks_quietly() {
        let (util, world) = setup(HostProfile::public_only());
        let chunk = world.load_chunk(0, 0);

        util.set_block_fast(&*chunk, 2, 20, 2, 3, 1);
        assert_eq!(util.block_type_id(&*chunk, 2, 20, 2), 3);
        assert_eq!(util.block_data(&*chunk, 2, 20, 2), 1);
        assert!(!util.chunks(&*world).is_live());
        assert!(!util.entities(&*chunk).unwrap().is_live());
        assert!(util.player_manager(&*world).is_none());

        for report in util.capabilities().report() {
            assert_eq!(report.downgrades, 0);
        }
        let sections = util.capabilities().flag(Representation::SectionArray);
        assert_eq!(sections.state(), FlagState::Unavailable);
        assert_eq!(sections.fallback_count(), 3);
    }

    #[test]
    fn test_section_fault_falls_back_to_public_accessors() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 0, 10, 0, 7, 0);

        assert!(chunk.replace_field("sections", Arc::new(SectionList(sections_of(&chunk)))));

        assert_eq!(util.block_type_id(&*chunk, 0, 10, 0), 7);
        util.set_block_fast(&*chunk, 0, 11, 0, 8, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, 11, 0), 8);
        let flag = util.capabilities().flag(Representation::SectionArray);
        assert_eq!(flag.downgrade_count(), 1);
        assert_eq!(flag.state(), FlagState::Unavailable);
    }

    #[test]
    fn test_entities_live_view() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(1, 0);
        world.spawn(Entity::new(1, "pig", [20.0, 64.0, 3.0]));
        world.spawn(Entity::new(2, "cow", [-3.0, 64.0, 3.0]));

        let entities = util.entities(&*chunk).unwrap();
        assert!(entities.is_live());
        assert_eq!(entities.len(), 1);

        world.spawn(Entity::new(3, "sheep", [30.5, 70.0, 15.9]));
        assert_eq!(entities.len(), 2);
        world.despawn(1);
        assert!(!entities.contains(1));
        assert!(entities.contains(3));

        if let EntityCollection::Live(live) = &entities {
            assert!(live.add(Entity::new(4, "chicken", [16.0, 64.0, 0.0])));
            assert!(!live.add(Entity::new(5, "chicken", [0.0, 64.0, 0.0])));
        }
        let ids: Vec<_> = entities.to_vec().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3, 4]);

        if let EntityCollection::Live(live) = &entities {
            let mut visited = Vec::new();
            live.for_each(|entity| visited.push(entity.id));
            visited.sort();
            assert_eq!(visited, vec![3, 4]);
        }
    }

    #[test]
    fn test_entities_fault_downgrades_once() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        world.spawn(Entity::new(1, "pig", [1.0, 64.0, 1.0]));

        let live = util.entities(&*chunk).unwrap();
        assert!(live.is_live());

        assert!(world.swap_entity_registry_representation());
        for _ in 0..2 {
            let entities = util.entities(&*chunk).unwrap();
            assert!(!entities.is_live());
            assert!(entities.contains(1));
        }

        let flag = util.capabilities().flag(Representation::EntityIndex);
        assert_eq!(flag.state(), FlagState::Unavailable);
        assert_eq!(flag.downgrade_count(), 1);
        assert_eq!(flag.fallback_count(), 2);

        // the registry behind an earlier view is still the world's
        world.spawn(Entity::new(2, "cow", [2.0, 64.0, 2.0]));
        assert_eq!(live.len(), 2);
    }

    #[test]
    fn test_light_reads_from_sections() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 5, 20, 6, 1, 0);
        {
            let sections = sections_of(&chunk);
            let mut sections = sections.write();
            let section = sections[1].as_mut().unwrap();
            section.set_block_light(5, 20, 6, 12);
            section.set_sky_light(5, 20, 6, 3);
        }

        assert_eq!(util.block_light(&*chunk, 5, 20, 6), 12);
        assert_eq!(util.sky_light(&*chunk, 5, 20, 6), 3);
        assert_eq!(chunk.block_light(5, 20, 6), 12);
        assert_eq!(chunk.sky_light(5, 20, 6), 3);

        assert_eq!(util.block_light(&*chunk, 4, 20, 6), 0);
        assert_eq!(util.sky_light(&*chunk, 4, 20, 6), 0);
        assert_eq!(util.sky_light(&*chunk, 5, 40, 6), ABSENT_SKY_LIGHT);
        assert_eq!(
            util.capabilities().flag(Representation::SectionArray).fallback_count(),
            0
        );
    }

    #[test]
    fn test_entities_of_detached_chunk() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(0, 0);
        drop(world);
        assert!(matches!(
            util.entities(&*chunk),
            Err(ShimError::Detached { x: 0, z: 0 })
        ));
        assert!(matches!(
            util.save_chunk(&chunk),
            Err(ShimError::Detached { .. })
        ));
        assert!(!util.set_block(&*chunk, 0, 0, 0, 1, 0));
    }

    #[test]
    fn test_save_chunk_delegates() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let chunk = world.load_chunk(3, 4);
        world.clear_events();
        util.save_chunk(&chunk).unwrap();
        assert_eq!(world.events(), vec![HostEvent::Saved { x: 3, z: 4 }]);
    }

    #[test]
    fn test_world_listeners_and_player_manager() {
        let (util, world) = setup(HostProfile::v1_4_5());
        let log = Arc::new(BlockChangeLog::default());
        let listeners = util.world_listeners(&*world).unwrap();
        assert!(listeners.is_empty());

        let registered = Arc::new(BlockChangeLog::default());
        world.add_listener(registered.clone());
        assert_eq!(listeners.len(), 1);

        let listener: Arc<dyn WorldAccess> = log.clone();
        listeners.add(listener.clone());
        listeners.block_changed(1, 2, 3);
        assert_eq!(log.changes(), vec![(1, 2, 3)]);
        assert_eq!(registered.changes(), vec![(1, 2, 3)]);
        assert!(listeners.remove(&listener));
        assert_eq!(listeners.len(), 1);

        let manager = util.player_manager(&*world).unwrap();
        manager.flag_dirty(4, 5, 6);
        assert_eq!(world.player_manager().dirty(), vec![(4, 5, 6)]);
    }

    #[test]
    fn test_from_config_disables_fast_paths() {
        let host = SimHost::new(HostProfile::v1_4_5());
        let config =
            ShimConfig::from_toml_str("disabled = \"CHUNK_MAP | ENTITY_INDEX\"").unwrap();
        let util = ChunkUtil::from_config(&config, host.classes()).unwrap();
        assert_eq!(util.locator().layout().version, "v1_4_5");
        assert_eq!(util.locator().classes().host_version(), "v1_4_5");
        let world = host.create_world("world", 256);
        let chunk = world.load_chunk(0, 0);

        assert!(!util.chunks(&*world).is_live());
        assert!(!util.entities(&*chunk).unwrap().is_live());
        assert!(util.set_chunk(&*world, 0, 0, chunk.clone()).is_err());
        assert!(util.set_chunk_unloading(&*world, 0, 0, true).is_ok());

        let unknown = ShimConfig {
            host_version: Some("v9_9_9".to_string()),
            ..ShimConfig::default()
        };
        assert!(matches!(
            ChunkUtil::from_config(&unknown, host.classes()),
            Err(ShimError::Config(_))
        ));
    }

    #[test]
    fn test_layout_for_other_version_uses_public_api() {
        let host = SimHost::new(HostProfile::v1_4_5());
        let util = ChunkUtil::new(HostLayout::new("v1_5_0"), host.classes());
        let world = host.create_world("world", 256);
        let chunk = world.load_chunk(0, 0);
        util.set_block_fast(&*chunk, 0, 0, 0, 1, 0);
        assert_eq!(util.block_type_id(&*chunk, 0, 0, 0), 1);
        assert!(!util.chunks(&*world).is_live());
    }

    #[test]
    fn test_install_once() {
        let host = SimHost::new(HostProfile::v1_4_5());
        let util = ChunkUtil::new(HostLayout::v1_4_5(), host.classes());
        let installed = util.install().unwrap();
        assert!(std::ptr::eq(installed, ChunkUtil::global().unwrap()));

        let again = ChunkUtil::new(HostLayout::v1_4_5(), host.classes());
        assert!(matches!(again.install(), Err(ShimError::AlreadyInstalled)));
    }
}
