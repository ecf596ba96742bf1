//! Map payload: viewport settings plus quality-colored sensor markers.
//!
//! `GET /api/map` returns everything the map component needs in one shot:
//! the Mapbox access token and viewport defaults, and one marker per
//! cataloged sensor site, colored by that sensor's current aggregate when
//! it has one.

use std::collections::HashMap;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::aggregate;
use crate::error::AppError;
use crate::sites;
use crate::{Config, MapMarker, SensorAverage};

// ---

// Default viewport, centered on the Monterrey metropolitan area.
const MAP_STYLE: &str = "light";
const MAP_ZOOM: u32 = 12;
const MAP_CENTER_LAT: f64 = 25.65409262897884;
const MAP_CENTER_LON: f64 = -100.37682059704264;

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/api/map", get(map_view))
}

/// Full payload for the map component.
#[derive(Debug, Serialize)]
struct MapView {
    mapbox: MapboxSettings,
    markers: Vec<MapMarker>,
}

#[derive(Debug, Serialize)]
struct MapboxSettings {
    token: String,
    style: &'static str,
    zoom: u32,
    center: MapCenter,
}

#[derive(Debug, Serialize)]
struct MapCenter {
    lat: f64,
    lon: f64,
}

async fn map_view(State((pool, config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    info!("GET /api/map - merging sensor catalog with averages");

    match build_view(&pool, &config).await {
        Ok(view) => {
            info!("GET /api/map - returning {} markers", view.markers.len());
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => {
            error!("GET /api/map failed: {err}");
            err.into_response()
        }
    }
}

async fn build_view(pool: &PgPool, config: &Config) -> Result<MapView, AppError> {
    // ---
    let catalog = sites::load_sites(&config.sites_csv)?;

    // A store with no qualifying readings still gets a map: every marker
    // simply stays uncolored. Other aggregation failures propagate.
    let averages = match aggregate::load_sensor_averages(pool).await {
        Ok(rows) => rows,
        Err(AppError::NoData) => Vec::new(),
        Err(err) => return Err(err),
    };

    let mut by_sensor: HashMap<i64, SensorAverage> = averages
        .into_iter()
        .map(|avg| (avg.sensor_id, avg))
        .collect();

    let markers = catalog
        .into_iter()
        .map(|site| {
            let average = by_sensor.remove(&site.sensor_id);
            MapMarker::from_site(site, average)
        })
        .collect();

    Ok(MapView {
        mapbox: MapboxSettings {
            token: config.mapbox_token.clone(),
            style: MAP_STYLE,
            zoom: MAP_ZOOM,
            center: MapCenter {
                lat: MAP_CENTER_LAT,
                lon: MAP_CENTER_LON,
            },
        },
        markers,
    })
}
