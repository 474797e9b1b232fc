//! Per-area detail lookups: heat-planning status and the energy-mix series
//! consumed by the client's info box and chart.

use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::Error;

#[derive(Debug, Serialize)]
pub struct KommuneDetail {
    pub ags: String,
    pub name: String,
    pub kwp_status: Option<String>,
    pub energiemix: EnergiemixShares,
}

/// Heating-energy shares in percent. Serialized key names follow the
/// client's chart labels, umlauts included.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct EnergiemixShares {
    #[serde(rename = "Gas")]
    pub gas: f64,
    #[serde(rename = "Öl")]
    pub oel: f64,
    #[serde(rename = "Fernwärme")]
    pub fernwaerme: f64,
    #[serde(rename = "Elektro")]
    pub elektro: f64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct EnergiemixYear {
    pub jahr: i32,
    #[serde(rename = "Gas")]
    pub gas: f64,
    #[serde(rename = "Öl")]
    pub oel: f64,
    #[serde(rename = "Elektro")]
    pub elektro: f64,
    #[serde(rename = "Fernwärme")]
    pub fernwaerme: f64,
    #[serde(rename = "Sonstiges")]
    pub sonstiges: f64,
}

/// Looks up one administrative area by its AGS key. The current energy-mix
/// shares come from the most recent recorded year; an area without any
/// recorded mix still resolves, with zeroed shares.
pub async fn fetch_detail(pool: &PgPool, ags: &str) -> Result<KommuneDetail, Error> {
    let row = sqlx::query("SELECT ags, gen, kwp_status FROM \"Kommunen\" WHERE ags = $1")
        .bind(ags)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("kommune {}", ags)))?;

    let mix = sqlx::query(
        "SELECT gas::float8 AS gas, oel::float8 AS oel, \
         fernwaerme::float8 AS fernwaerme, elektro::float8 AS elektro \
         FROM energiemix WHERE ags = $1 ORDER BY jahr DESC LIMIT 1",
    )
    .bind(ags)
    .fetch_optional(pool)
    .await?;

    let energiemix = match mix {
        Some(mix) => EnergiemixShares {
            gas: mix.try_get("gas")?,
            oel: mix.try_get("oel")?,
            fernwaerme: mix.try_get("fernwaerme")?,
            elektro: mix.try_get("elektro")?,
        },
        None => EnergiemixShares::default(),
    };

    Ok(KommuneDetail {
        ags: row.try_get("ags")?,
        name: row.try_get("gen")?,
        kwp_status: row.try_get("kwp_status")?,
        energiemix,
    })
}

/// The full energy-mix history for one area, ordered by year. An unknown
/// AGS yields an empty series; the client only asks after a successful
/// detail lookup.
pub async fn fetch_energiemix(pool: &PgPool, ags: &str) -> Result<Vec<EnergiemixYear>, Error> {
    let series = sqlx::query_as::<_, EnergiemixYear>(
        "SELECT jahr, gas::float8 AS gas, oel::float8 AS oel, \
         elektro::float8 AS elektro, fernwaerme::float8 AS fernwaerme, \
         sonstiges::float8 AS sonstiges \
         FROM energiemix WHERE ags = $1 ORDER BY jahr",
    )
    .bind(ags)
    .fetch_all(pool)
    .await?;

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energiemix_year_uses_client_facing_keys() {
        let year = EnergiemixYear {
            jahr: 2020,
            gas: 48.0,
            oel: 22.5,
            elektro: 10.0,
            fernwaerme: 12.5,
            sonstiges: 7.0,
        };
        let value = serde_json::to_value(&year).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec!["Elektro", "Fernwärme", "Gas", "Sonstiges", "jahr", "Öl"]
        );
        assert_eq!(value["Öl"], serde_json::json!(22.5));
    }

    #[test]
    fn detail_serializes_nested_shares() {
        let detail = KommuneDetail {
            ags: "06412000".to_string(),
            name: "Frankfurt am Main".to_string(),
            kwp_status: Some("in Bearbeitung".to_string()),
            energiemix: EnergiemixShares {
                gas: 50.0,
                oel: 20.0,
                fernwaerme: 20.0,
                elektro: 10.0,
            },
        };
        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["ags"], serde_json::json!("06412000"));
        assert_eq!(value["energiemix"]["Fernwärme"], serde_json::json!(20.0));
        assert_eq!(value["energiemix"]["Öl"], serde_json::json!(20.0));
    }
}
