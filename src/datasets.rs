//! Fixed dataset queries and their GeoJSON feature mappings.
//!
//! Each dataset is one parameterless query against PostGIS; the geometry
//! column is produced as GeoJSON text by `ST_AsGeoJSON` and parsed back into
//! a structured geometry before embedding, so responses carry real geometry
//! objects rather than escaped strings.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::json;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::Error;

/// The enumerated set of collection endpoints. Table names are quoted where
/// the schema uses case-sensitive identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dataset {
    Features,
    Kommunen,
    Windenergieanlagen,
    Energieanlagen,
    Waermenetze,
    Erzeugungspotenziale,
    Eignungsgebiete,
    Buildings,
}

impl Dataset {
    pub fn sql(self) -> &'static str {
        match self {
            Dataset::Features => {
                "SELECT id::bigint AS id, name, info, ST_AsGeoJSON(geom) AS geometry \
                 FROM features"
            }
            Dataset::Kommunen => {
                "SELECT id::bigint AS id, objid, ags, gen, bez, nuts, \
                 population::bigint AS population, konvoi, verfahren, \
                 ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Kommunen\""
            }
            Dataset::Windenergieanlagen => {
                "SELECT id::bigint AS id, name, leistung::float8 AS leistung, \
                 ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Windenergieanlagen\""
            }
            Dataset::Energieanlagen => {
                "SELECT id::bigint AS id, name, anlage, leistung::float8 AS leistung, \
                 energietraeger, ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Energieanlagen\""
            }
            Dataset::Waermenetze => {
                "SELECT name, bemerkung, art, ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Waermenetze\""
            }
            Dataset::Erzeugungspotenziale => {
                "SELECT name, art, bemerkung, erzeugungs, ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Erzeugungspotenziale\""
            }
            Dataset::Eignungsgebiete => {
                "SELECT name, art, ST_AsGeoJSON(geom) AS geometry \
                 FROM \"Eignungsgebiete\""
            }
            // Multi-part footprints are split into their parts and
            // reprojected for GeoJSON output; the stored height may be NULL.
            Dataset::Buildings => {
                "SELECT id::bigint AS id, name, COALESCE(hoehe, 10.0)::float8 AS height, \
                 ST_AsGeoJSON(ST_Transform((ST_Dump(geom)).geom, 4326)) AS geometry \
                 FROM buildings"
            }
        }
    }

    fn feature(self, row: &PgRow) -> Result<Feature, Error> {
        match self {
            Dataset::Features => data_feature(
                row.try_get("id")?,
                row.try_get("name")?,
                row.try_get("info")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Kommunen => kommune_feature(
                row.try_get("id")?,
                row.try_get("objid")?,
                row.try_get("ags")?,
                row.try_get("gen")?,
                row.try_get("bez")?,
                row.try_get("nuts")?,
                row.try_get("population")?,
                row.try_get("konvoi")?,
                row.try_get("verfahren")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Windenergieanlagen => windenergieanlage_feature(
                row.try_get("id")?,
                row.try_get("name")?,
                row.try_get("leistung")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Energieanlagen => energieanlage_feature(
                row.try_get("id")?,
                row.try_get("name")?,
                row.try_get("anlage")?,
                row.try_get("leistung")?,
                row.try_get("energietraeger")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Waermenetze => waermenetz_feature(
                row.try_get("name")?,
                row.try_get("bemerkung")?,
                row.try_get("art")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Erzeugungspotenziale => erzeugungspotenzial_feature(
                row.try_get("name")?,
                row.try_get("art")?,
                row.try_get("bemerkung")?,
                row.try_get("erzeugungs")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Eignungsgebiete => eignungsgebiet_feature(
                row.try_get("name")?,
                row.try_get("art")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
            Dataset::Buildings => building_feature(
                row.try_get("id")?,
                row.try_get("name")?,
                row.try_get("height")?,
                row.try_get::<String, _>("geometry")?.as_str(),
            ),
        }
    }
}

/// Runs the dataset query and maps every row into a feature. Rows are
/// consumed eagerly; result order follows the store.
pub async fn fetch_collection(pool: &PgPool, dataset: Dataset) -> Result<FeatureCollection, Error> {
    let rows = sqlx::query(dataset.sql()).fetch_all(pool).await?;
    let features = rows
        .iter()
        .map(|row| dataset.feature(row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn feature(properties: JsonObject, geometry: &str) -> Result<Feature, Error> {
    let geometry: Geometry = serde_json::from_str(geometry)?;
    Ok(Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

pub fn data_feature(
    id: i64,
    name: Option<String>,
    info: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("name".to_string(), json!(name));
    properties.insert("info".to_string(), json!(info));
    feature(properties, geometry)
}

#[allow(clippy::too_many_arguments)]
pub fn kommune_feature(
    id: i64,
    objid: Option<String>,
    ags: Option<String>,
    gen: Option<String>,
    bez: Option<String>,
    nuts: Option<String>,
    population: Option<i64>,
    konvoi: Option<String>,
    verfahren: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("objid".to_string(), json!(objid));
    properties.insert("ags".to_string(), json!(ags));
    properties.insert("gen".to_string(), json!(gen));
    properties.insert("bez".to_string(), json!(bez));
    properties.insert("nuts".to_string(), json!(nuts));
    properties.insert("population".to_string(), json!(population));
    properties.insert("konvoi".to_string(), json!(konvoi));
    properties.insert("verfahren".to_string(), json!(verfahren));
    feature(properties, geometry)
}

pub fn windenergieanlage_feature(
    id: i64,
    name: Option<String>,
    leistung: Option<f64>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("name".to_string(), json!(name));
    properties.insert("leistung".to_string(), json!(leistung));
    feature(properties, geometry)
}

pub fn energieanlage_feature(
    id: i64,
    name: Option<String>,
    anlage: Option<String>,
    leistung: Option<f64>,
    energietraeger: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("name".to_string(), json!(name));
    properties.insert("anlage".to_string(), json!(anlage));
    properties.insert("leistung".to_string(), json!(leistung));
    properties.insert("energietraeger".to_string(), json!(energietraeger));
    feature(properties, geometry)
}

pub fn waermenetz_feature(
    name: Option<String>,
    bemerkung: Option<String>,
    art: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!(name));
    properties.insert("bemerkung".to_string(), json!(bemerkung));
    properties.insert("art".to_string(), json!(art));
    feature(properties, geometry)
}

pub fn erzeugungspotenzial_feature(
    name: Option<String>,
    art: Option<String>,
    bemerkung: Option<String>,
    erzeugungs: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!(name));
    properties.insert("art".to_string(), json!(art));
    properties.insert("bemerkung".to_string(), json!(bemerkung));
    properties.insert("erzeugungs".to_string(), json!(erzeugungs));
    feature(properties, geometry)
}

pub fn eignungsgebiet_feature(
    name: Option<String>,
    art: Option<String>,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("name".to_string(), json!(name));
    properties.insert("art".to_string(), json!(art));
    feature(properties, geometry)
}

pub fn building_feature(
    id: i64,
    name: Option<String>,
    height: f64,
    geometry: &str,
) -> Result<Feature, Error> {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(id));
    properties.insert("name".to_string(), json!(name));
    properties.insert("height".to_string(), json!(height));
    feature(properties, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const POINT: &str = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;

    fn property_keys(feature: &Feature) -> Vec<String> {
        let mut keys: Vec<String> = feature
            .properties
            .as_ref()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    fn sorted(mut keys: Vec<&str>) -> Vec<String> {
        keys.sort();
        keys.into_iter().map(str::to_string).collect()
    }

    #[test]
    fn windenergieanlage_collection_serializes_as_documented() {
        let feature = windenergieanlage_feature(
            1,
            Some("Turbine A".to_string()),
            Some(2.5),
            POINT,
        )
        .unwrap();
        let collection = FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        };

        let expected: Value = serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "id": 1, "name": "Turbine A", "leistung": 2.5 },
                "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }
            }]
        });
        assert_eq!(serde_json::to_value(&collection).unwrap(), expected);
    }

    #[test]
    fn geometry_text_round_trips_unchanged() {
        let geometry_text =
            r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]}"#;
        let feature = eignungsgebiet_feature(None, None, geometry_text).unwrap();

        let embedded = serde_json::to_value(feature.geometry.as_ref().unwrap()).unwrap();
        let direct: Value = serde_json::from_str(geometry_text).unwrap();
        assert_eq!(embedded, direct);
    }

    #[test]
    fn invalid_geometry_text_is_rejected() {
        let result = eignungsgebiet_feature(None, None, r#"{"type":"Nope"}"#);
        assert!(matches!(result, Err(Error::Geometry(_))));
    }

    #[test]
    fn kommune_properties_match_the_documented_mapping() {
        let feature = kommune_feature(
            7,
            Some("DEBKGDL20000E8KT".to_string()),
            Some("06412000".to_string()),
            Some("Frankfurt am Main".to_string()),
            Some("Kreisfreie Stadt".to_string()),
            Some("DE712".to_string()),
            Some(773_068),
            None,
            None,
            POINT,
        )
        .unwrap();
        assert_eq!(
            property_keys(&feature),
            sorted(vec![
                "id",
                "objid",
                "ags",
                "gen",
                "bez",
                "nuts",
                "population",
                "konvoi",
                "verfahren"
            ])
        );
    }

    #[test]
    fn collection_property_keys_per_dataset() {
        let data = data_feature(1, None, None, POINT).unwrap();
        assert_eq!(property_keys(&data), sorted(vec!["id", "name", "info"]));

        let anlage =
            energieanlage_feature(1, None, None, None, None, POINT).unwrap();
        assert_eq!(
            property_keys(&anlage),
            sorted(vec!["id", "name", "anlage", "leistung", "energietraeger"])
        );

        let netz = waermenetz_feature(None, None, None, POINT).unwrap();
        assert_eq!(
            property_keys(&netz),
            sorted(vec!["name", "bemerkung", "art"])
        );

        let potenzial =
            erzeugungspotenzial_feature(None, None, None, None, POINT).unwrap();
        assert_eq!(
            property_keys(&potenzial),
            sorted(vec!["name", "art", "bemerkung", "erzeugungs"])
        );

        let gebiet = eignungsgebiet_feature(None, None, POINT).unwrap();
        assert_eq!(property_keys(&gebiet), sorted(vec!["name", "art"]));

        let building = building_feature(1, None, 10.0, POINT).unwrap();
        assert_eq!(
            property_keys(&building),
            sorted(vec!["id", "name", "height"])
        );
    }

    #[test]
    fn building_query_defaults_missing_heights() {
        let sql = Dataset::Buildings.sql();
        assert!(sql.contains("COALESCE(hoehe, 10.0)"));
        assert!(sql.contains("ST_Dump"));
        assert!(sql.contains("ST_Transform"));
    }

    #[test]
    fn case_sensitive_tables_stay_quoted() {
        assert!(Dataset::Kommunen.sql().contains("FROM \"Kommunen\""));
        assert!(Dataset::Windenergieanlagen
            .sql()
            .contains("FROM \"Windenergieanlagen\""));
    }
}
