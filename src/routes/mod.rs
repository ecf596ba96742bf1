use axum::Router;
use sqlx::PgPool;

use crate::Config;

mod health;
mod map;
mod quality;
mod sensors;

// ---

pub fn router(pool: PgPool, config: Config) -> Router {
    // ---
    Router::new()
        .merge(quality::router())
        .merge(map::router())
        .merge(sensors::router())
        .merge(health::router())
        .with_state((pool, config))
}
