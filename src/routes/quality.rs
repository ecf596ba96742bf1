//! Aggregated air-quality rows for the dashboard.
//!
//! Two routes share the same derived data:
//! - `GET /api/quality` — JSON rows for the data table and the scatter
//!   plot, with optional post-aggregation filters.
//! - `GET /api/quality/export` — the full table as a downloadable CSV.
//!
//! Everything is recomputed from the store on each call; see the
//! `aggregate` module for the pipeline itself.

use axum::{
    extract::Query,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::aggregate;
use crate::error::AppError;
use crate::{Config, SensorAverage};

// ---

pub fn router() -> Router<(PgPool, Config)> {
    // ---
    Router::new()
        .route("/api/quality", get(summary))
        .route("/api/quality/export", get(export))
}

/// Optional filters applied to the aggregated rows.
#[derive(Debug, Deserialize)]
pub struct QualityQuery {
    /// Keep only sensors in this municipality (exact match).
    municipio: Option<String>,
    limit: Option<u32>,
}

async fn summary(
    Query(params): Query<QualityQuery>,
    State((pool, _config)): State<(PgPool, Config)>,
) -> impl IntoResponse {
    // ---
    info!("GET /api/quality - aggregating sensor readings");

    match aggregate::load_sensor_averages(&pool).await {
        Ok(rows) => {
            let rows = apply_filters(rows, &params);
            info!("GET /api/quality - returning {} sensors", rows.len());
            (StatusCode::OK, Json(rows)).into_response()
        }
        Err(err) => {
            error!("GET /api/quality failed: {err}");
            err.into_response()
        }
    }
}

async fn export(State((pool, _config)): State<(PgPool, Config)>) -> impl IntoResponse {
    // ---
    info!("GET /api/quality/export - building csv");

    match export_body(&pool).await {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"calidad_del_aire.csv\"",
                ),
            ],
            body,
        )
            .into_response(),
        Err(err) => {
            error!("GET /api/quality/export failed: {err}");
            err.into_response()
        }
    }
}

// ---

/// Serialize the full (unfiltered) aggregation as CSV.
async fn export_body(pool: &PgPool) -> Result<Vec<u8>, AppError> {
    // ---
    let rows = aggregate::load_sensor_averages(pool).await?;

    let mut buf = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut buf);
        writer.write_record(["sensor_id", "name", "municipio", "avg_pm25", "quality"])?;

        for row in &rows {
            writer.write_record([
                row.sensor_id.to_string(),
                row.name.clone(),
                row.municipio.clone(),
                row.avg_pm25.to_string(),
                row.quality.label().to_string(),
            ])?;
        }

        writer.flush().map_err(csv::Error::from)?;
    }

    Ok(buf)
}

/// Apply query filters to aggregated rows.
fn apply_filters(rows: Vec<SensorAverage>, params: &QualityQuery) -> Vec<SensorAverage> {
    // ---
    rows.into_iter()
        .filter(|r| {
            params
                .municipio
                .as_ref()
                .map_or(true, |m| &r.municipio == m)
        })
        .take(params.limit.unwrap_or(1000) as usize)
        .collect()
}
