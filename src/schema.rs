//! Database schema management for the air-quality store.
//!
//! Ensures required tables and indexes exist before serving requests.
//! Applied once on startup from `main.rs`; the tables are otherwise owned
//! by the external ingestion job that writes readings into them.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates the `sensor_readings` table (written by the ingestion job, read
/// here) and the `sensors` metadata table joined against it. Safe to call
/// on every startup; no-op if the objects already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Raw readings. `measured_at` is deliberately TEXT: the ingestion job
    // writes fixed-pattern timestamp strings and the aggregation pipeline
    // owns parsing them.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            id          BIGSERIAL PRIMARY KEY,
            sensor_id   BIGINT NOT NULL,
            measured_at TEXT   NOT NULL,
            pm25        DOUBLE PRECISION NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Display metadata joined into every aggregation.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensors (
            sensor_id BIGINT PRIMARY KEY,
            name      TEXT NOT NULL,
            municipio TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_sensor_id
            ON sensor_readings (sensor_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
