//! Shared application state.

use crate::buildings::BuildingSource;
use crate::config::Config;
use crate::error::Error;
use crate::tile_cache::TileCache;

use sqlx::PgPool;

/// Everything the handlers share: the connection pool, the building tile
/// source, and the tile cache in front of it. The cache is owned here, not
/// hidden in module state, so tests construct their own instances.
pub struct AppState {
    pub pool: PgPool,
    pub buildings: BuildingSource,
    pub tile_cache: TileCache,
}

impl AppState {
    pub fn new(config: &Config) -> Result<AppState, Error> {
        Ok(AppState {
            pool: config.connect_pool()?,
            buildings: BuildingSource::default(),
            tile_cache: TileCache::new(config.tile_cache_capacity),
        })
    }
}
