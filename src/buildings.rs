//! Building-footprint vector tile source.
//!
//! All geometry processing happens inside PostGIS: `ST_Simplify` with a
//! fixed tolerance, then `ST_AsMVTGeom` to clip and quantize into the tile
//! grid, then `ST_AsMVT` to encode the attribute+geometry set into one
//! binary layer. The tile envelope is computed in Rust and bound as query
//! parameters together with the tolerance; no request value is ever
//! interpolated into the statement text.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::TryStreamExt;
use sqlx::{PgPool, Row};

use crate::error::Error;
use crate::{tile_bounds_3857, TileCoord, TileSource};

/// Units per tile in the encoded grid. Changing this changes the wire
/// format for every client; treat it as a protocol constant.
pub const MVT_EXTENT: u32 = 4096;

/// Clip margin around the tile envelope, in extent units.
pub const MVT_BUFFER: u32 = 0;

/// Simplification tolerance in web-mercator meters, applied before
/// clipping.
pub const SIMPLIFY_TOLERANCE: f64 = 2.0;

/// Renders building footprints from a PostGIS relation into a single MVT
/// layer. The relation is expected to carry `id`, `name`, `hoehe` and an
/// EPSG:3857 `geom` column.
#[derive(Clone, Debug)]
pub struct BuildingSource {
    layer_name: String,
    table: String,
}

impl Default for BuildingSource {
    fn default() -> Self {
        BuildingSource::new("buildings_layer", "buildings")
    }
}

impl BuildingSource {
    pub fn new(layer_name: &str, table: &str) -> BuildingSource {
        BuildingSource {
            layer_name: layer_name.to_string(),
            table: table.to_string(),
        }
    }

    // $1..$4 are the envelope corners, $5 the simplification tolerance.
    // The layer name and relation are code-level constants, never request
    // input, so interpolating them is safe.
    fn mvt_sql(&self) -> String {
        let envelope = "ST_MakeBox2D(ST_Point($1, $2), ST_Point($3, $4))";
        format!(
            "SELECT ST_AsMVT(tile, '{layer}', {extent}, 'mvtgeometry') FROM (\
             SELECT id, name, COALESCE(hoehe, 10.0)::float8 AS height, \
             ST_AsMVTGeom(ST_Simplify(geom, $5), {envelope}, {extent}, {buffer}, true) AS mvtgeometry \
             FROM {table} WHERE geom && {envelope}\
             ) AS tile WHERE mvtgeometry IS NOT NULL",
            layer = self.layer_name,
            extent = MVT_EXTENT,
            buffer = MVT_BUFFER,
            envelope = envelope,
            table = self.table,
        )
    }
}

#[async_trait]
impl TileSource for BuildingSource {
    async fn render_mvt(&self, pool: &PgPool, coord: TileCoord) -> Result<Bytes, Error> {
        let bounds = tile_bounds_3857(coord, MVT_EXTENT, MVT_BUFFER);
        let sql = self.mvt_sql();

        let query = sqlx::query(&sql)
            .bind(bounds.west)
            .bind(bounds.south)
            .bind(bounds.east)
            .bind(bounds.north)
            .bind(SIMPLIFY_TOLERANCE);

        // A tile with no intersecting footprints yields an empty payload,
        // not an error.
        let mut raw_tile = BytesMut::new();
        let mut stream = query.fetch(pool);
        while let Some(row) = stream.try_next().await? {
            let layer: Option<Vec<u8>> = row.try_get(0)?;
            if let Some(layer) = layer {
                raw_tile.extend_from_slice(&layer);
            }
        }

        Ok(raw_tile.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_single_layer_mvt_statement() {
        let source = BuildingSource::default();
        let sql = source.mvt_sql();

        // Make sure it's not empty
        assert_ne!(0, sql.len());

        assert_eq!(
            sql.contains("ST_AsMVT(tile, 'buildings_layer', 4096, 'mvtgeometry')"),
            true
        );
        assert_eq!(sql.contains("ST_Simplify(geom, $5)"), true);
        assert_eq!(sql.contains("COALESCE(hoehe, 10.0)"), true);
        assert_eq!(sql.contains("FROM buildings"), true);
    }

    #[test]
    fn envelope_is_bound_not_interpolated() {
        let sql = BuildingSource::default().mvt_sql();

        for param in ["$1", "$2", "$3", "$4", "$5"] {
            assert!(sql.contains(param), "missing placeholder {}", param);
        }
        assert!(!sql.contains("$6"));
    }

    #[test]
    fn custom_layer_name_and_table() {
        let source = BuildingSource::new("footprints", "lod2_buildings");
        let sql = source.mvt_sql();

        assert!(sql.contains("'footprints'"));
        assert!(sql.contains("FROM lod2_buildings"));
    }
}
