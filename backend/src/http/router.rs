//! Router configuration for the HTTP API.
//!
//! Sets up all routes and middleware (CORS, compression, tracing).

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers;
use super::state::AppState;
use crate::routes::{countries, facilities, stats};

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // The map is read-only, so any origin may query it.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        .route(facilities::LIST_FACILITIES, get(handlers::list_facilities))
        .route(stats::GET_FACILITY_SUMMARY, get(handlers::get_facility_summary))
        .route(facilities::GET_FACILITY, get(handlers::get_facility))
        .route(stats::GET_FUEL_CAPACITY, get(handlers::get_fuel_capacity))
        .route(countries::LIST_COUNTRIES, get(handlers::list_countries))
        .route(countries::GET_COUNTRY_FUELS, get(handlers::get_country_fuels));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/v1", api_v1)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::LocalRepository;
    use crate::db::repository::FullRepository;
    use std::sync::Arc;

    #[test]
    fn test_router_creation() {
        let repo = Arc::new(LocalRepository::new()) as Arc<dyn FullRepository>;
        let _router = create_router(AppState::new(repo));
    }
}
