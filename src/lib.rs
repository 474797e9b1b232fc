//! # Heatbox
//!
//! HTTP service for municipal heat-planning geodata.
//!
//! ## Current features
//!
//! Given a PostGIS database holding the planning datasets (administrative
//! areas, energy installations, heat networks, building footprints,
//! potential and suitability zones), this crate serves them as GeoJSON
//! feature collections and renders Mapbox Vector Tiles for the building
//! footprints, with a bounded in-process tile cache in front of the
//! rendering path.
//!
//! ## Known limitations
//!
//! The focus is on serving from a single PostGIS database. Building
//! footprints are assumed to be stored in EPSG:3857 web mercator already;
//! the remaining datasets are assumed to be in EPSG:4326. Cached tiles are
//! never invalidated before process restart, so the underlying datasets are
//! treated as static.
//!
//! The trait-based design allows for further extensibility, so additional
//! tile sources can be added in the future.

use async_trait::async_trait;

use bytes::Bytes;
use sqlx::PgPool;

use crate::error::Error;

pub mod buildings;
pub mod config;
pub mod datasets;
pub mod error;
pub mod handlers;
pub mod kommunen;
pub mod state;
pub mod tile_cache;

/// Highest zoom level accepted on the tile endpoint.
pub const MAX_ZOOM: u8 = 22;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// A slippy map tile address in XYZ format.
///
/// Construction through [`TileCoord::new`] guarantees the address lies
/// within the quad-tree: `z <= MAX_ZOOM` and `x, y < 2^z`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Result<TileCoord, Error> {
        if z > MAX_ZOOM {
            return Err(Error::InvalidTileCoordinate { z, x, y });
        }
        let n = 1u32 << z;
        if x >= n || y >= n {
            return Err(Error::InvalidTileCoordinate { z, x, y });
        }
        Ok(TileCoord { z, x, y })
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Tile envelope in EPSG:3857 web mercator coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TileBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

fn lonlat_to_epsg_3857(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS_M * lon.to_radians();
    let y = EARTH_RADIUS_M
        * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0)
            .tan()
            .ln();
    (x, y)
}

/// Computes the EPSG:3857 envelope of a tile, expanded on every side by
/// `buffer` units of the `extent`-unit tile grid.
pub fn tile_bounds_3857(coord: TileCoord, extent: u32, buffer: u32) -> TileBounds {
    let (west_lon, north_lat) = slippy_map_tilenames::tile2lonlat(coord.x, coord.y, coord.z);
    let (east_lon, south_lat) =
        slippy_map_tilenames::tile2lonlat(coord.x + 1, coord.y + 1, coord.z);

    let (west, north) = lonlat_to_epsg_3857(west_lon, north_lat);
    let (east, south) = lonlat_to_epsg_3857(east_lon, south_lat);

    let margin = (east - west) * buffer as f64 / extent as f64;
    TileBounds {
        west: west - margin,
        south: south - margin,
        east: east + margin,
        north: north + margin,
    }
}

/// A source of rendered vector tiles. Implementations hold the dataset
/// specifics; the pool is supplied per call so the caller owns connection
/// lifecycle.
#[async_trait]
pub trait TileSource: Sized {
    /// Renders the Mapbox vector tile for a slippy map tile in XYZ format.
    async fn render_mvt(&self, pool: &PgPool, coord: TileCoord) -> Result<Bytes, Error>;
}
