use anyhow::{Context, Result};
use chunk_shim::host::sim::{BlockChangeLog, HostProfile, SimHost};
use chunk_shim::utils::init_logging;
use chunk_shim::world::Entity;
use chunk_shim::{ChunkUtil, HostWorld, PlayerManager, ShimConfig};
use log::{info, warn};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn load_config(path: Option<PathBuf>) -> Result<ShimConfig> {
    let path = match path.or_else(ShimConfig::default_path) {
        Some(path) => path,
        None => return Ok(ShimConfig::default()),
    };
    ShimConfig::load_or_default(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

fn main() -> Result<()> {
    let mut public_only = false;
    let mut config_path = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--public-only" => public_only = true,
            path => config_path = Some(PathBuf::from(path)),
        }
    }

    let config = load_config(config_path)?;
    init_logging(&config.log_level)?;

    let profile = if public_only {
        HostProfile::public_only()
    } else {
        HostProfile::v1_4_5()
    };
    let host = SimHost::new(profile);
    let util = ChunkUtil::from_config(&config, host.classes())?.install()?;
    let world = host.create_world("world", 256);
    info!("Created world {} for host {}", world.name(), host.version());

    for x in -1..=1 {
        for z in -1..=1 {
            world.load_chunk(x, z);
        }
    }
    let changes = Arc::new(BlockChangeLog::default());
    let listeners = util.world_listeners(&*world);
    match &listeners {
        Ok(listeners) => listeners.add(changes.clone()),
        Err(err) => warn!("{}", err),
    }

    let origin = world.chunk_at(0, 0);
    for y in 0..4 {
        util.set_block_fast(&*origin, 8, y, 8, 1, 0);
    }
    if util.set_block(&*origin, 8, 4, 8, 2, 0) {
        if let Ok(listeners) = &listeners {
            listeners.block_changed(8, 4, 8);
        }
    }
    info!("{} block changes broadcast", changes.changes().len());
    info!(
        "Column (8, 8) is {} high, top block {}",
        util.height(&*origin, 8, 8),
        util.block_type_id(&*origin, 8, 4, 8)
    );

    world.spawn(Entity::new(1, "pig", [8.5, 5.0, 8.5]));
    info!("{} entities in chunk (0, 0)", util.entities(&*origin)?.len());
    info!("{} chunks loaded", util.chunks(&*world).len());

    if let Err(err) = util.set_chunk_unloading(&*world, 1, 1, true) {
        warn!("{}", err);
    }
    if let Some(manager) = util.player_manager(&*world) {
        manager.flag_dirty(8, 4, 8);
    }
    util.save_chunk(&origin)?;

    world.swap_chunk_map_representation();
    info!(
        "{} chunks loaded after the chunk map changed",
        util.chunks(&*world).len()
    );

    println!(
        "{}",
        serde_json::to_string_pretty(&util.capabilities().report())?
    );
    Ok(())
}
