//! Error taxonomy for the dashboard backend.
//!
//! Every failure the request pipeline can hit is a named variant here, so
//! handlers never collapse distinct problems into one opaque 500 string:
//! - store connectivity/query failures (fatal to the request, no retry),
//! - a reading timestamp that does not match the fixed storage pattern,
//! - an aggregation that produced no rows at all,
//! - an average outside the quality scale (negative means, only reachable
//!   when the non-positive-reading filter is disabled),
//! - an unreadable sensor reference file.
//!
//! The [`IntoResponse`] impl maps the taxonomy onto HTTP: an empty result is
//! a 404 (the store has nothing to show yet), everything else is a 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

// ---

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Store connection or query failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored reading timestamp that does not match the fixed pattern.
    #[error("malformed reading timestamp {raw:?}: {source}")]
    Timestamp {
        raw: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The aggregation produced no rows (empty store, or the warm-up
    /// offset consumed every reading).
    #[error("no qualifying readings after the warm-up offset")]
    NoData,

    /// A per-sensor average that falls outside the quality scale.
    #[error("average {avg_pm25} for sensor {sensor_id} falls outside the quality scale")]
    Unclassifiable { sensor_id: i64, avg_pm25: i64 },

    /// The sensor reference CSV could not be opened or parsed.
    #[error("sensor reference file {path}: {source}")]
    SiteFile {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// CSV serialization failure while building an export body.
    #[error("csv export failed: {0}")]
    Export(#[from] csv::Error),
}

impl AppError {
    // ---
    fn status(&self) -> StatusCode {
        match self {
            AppError::NoData => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_empty_result_maps_to_not_found() {
        // ---
        assert_eq!(AppError::NoData.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_data_errors_map_to_internal_error() {
        // ---
        let err = AppError::Unclassifiable {
            sensor_id: 143390,
            avg_pm25: -3,
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("143390"));
    }
}
