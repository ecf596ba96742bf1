//! Sensor catalog endpoint.
//!
//! `GET /api/sensors` returns the static site catalog (id, display name,
//! municipality, coordinates) straight from the reference CSV. The catalog
//! is republished by the monitoring network a few times a year, so it is
//! re-read per request rather than cached at startup.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use sqlx::PgPool;
use tracing::{error, info};

use crate::sites;
use crate::Config;

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new().route("/api/sensors", get(sensor_catalog))
}

async fn sensor_catalog(State((_, config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    info!("GET /api/sensors - loading site catalog");

    match sites::load_sites(&config.sites_csv) {
        Ok(catalog) => {
            info!("GET /api/sensors - returning {} sites", catalog.len());
            (StatusCode::OK, Json(catalog)).into_response()
        }
        Err(err) => {
            error!("GET /api/sensors failed: {err}");
            err.into_response()
        }
    }
}
