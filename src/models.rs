//! Data models for the air-quality pipeline.

use serde::{Deserialize, Serialize};

use crate::quality::AirQuality;

// ---

/// One row of the readings-to-sensor-metadata join, exactly as fetched.
///
/// `measured_at` stays a string here: readings are stored with text
/// timestamps in a fixed pattern, and parsing them is the aggregation
/// pipeline's job (a mismatch is a reportable error, not a silent skip).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReadingRow {
    // ---
    pub sensor_id: i64,
    pub name: String,
    pub municipio: String,
    pub measured_at: String,
    pub pm25: f64,
}

/// Aggregated per-sensor result row served to the table grid, the scatter
/// plot, and the CSV export.
#[derive(Debug, Clone, Serialize)]
pub struct SensorAverage {
    // ---
    pub sensor_id: i64,
    pub name: String,
    pub municipio: String,
    pub avg_pm25: i64,
    pub quality: AirQuality,
    pub color: &'static str,
}

/// A sensor site from the reference catalog (`sensores.csv`).
///
/// Column names are a fixed contract with the file:
/// `sensor_id,name,municipio,lat,lon`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSite {
    // ---
    pub sensor_id: i64,
    pub name: String,
    pub municipio: String,
    pub lat: f64,
    pub lon: f64,
}

/// A map marker: a cataloged site, colored by its aggregate when one
/// exists. Sites whose readings were all consumed by the warm-up offset
/// (or that have none) stay on the map with `null` average and quality.
#[derive(Debug, Clone, Serialize)]
pub struct MapMarker {
    // ---
    pub sensor_id: i64,
    pub name: String,
    pub municipio: String,
    pub lat: f64,
    pub lon: f64,
    pub avg_pm25: Option<i64>,
    pub quality: Option<AirQuality>,
    pub color: Option<&'static str>,
}

impl MapMarker {
    // ---
    pub fn from_site(site: SensorSite, average: Option<SensorAverage>) -> Self {
        // ---
        let (avg_pm25, quality, color) = match average {
            Some(avg) => (Some(avg.avg_pm25), Some(avg.quality), Some(avg.color)),
            None => (None, None, None),
        };

        MapMarker {
            sensor_id: site.sensor_id,
            name: site.name,
            municipio: site.municipio,
            lat: site.lat,
            lon: site.lon,
            avg_pm25,
            quality,
            color,
        }
    }
}
