//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use super::dto::{FacilityPageResponse, FacilityQuery, FacilityRow, HealthResponse};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::models::FacilityId;
use crate::routes::countries::{CountryFuelsResponse, CountryListResponse};
use crate::routes::stats::{FacilitySummary, FuelCapacity};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Facilities
// =============================================================================

/// GET /v1/facilities?bounds=w,s,e,n&country=&fuel=&limit=&offset=
///
/// One page of facilities ordered by capacity, with the total match count.
pub async fn list_facilities(
    State(state): State<AppState>,
    Query(params): Query<FacilityQuery>,
) -> HandlerResult<FacilityPageResponse> {
    let query = params.into_filter();
    let page = db_services::query_facilities(state.repository.as_ref(), &query).await?;
    Ok(Json(FacilityPageResponse::from(page)))
}

/// GET /v1/facilities/{facility_id}
pub async fn get_facility(
    State(state): State<AppState>,
    Path(facility_id): Path<String>,
) -> HandlerResult<FacilityRow> {
    let id = facility_id.trim();
    if id.is_empty() {
        return Err(AppError::BadRequest("facility id must not be empty".into()));
    }
    let facility = db_services::get_facility(state.repository.as_ref(), &FacilityId::new(id)).await?;
    Ok(Json(FacilityRow::from(&facility)))
}

// =============================================================================
// Statistics
// =============================================================================

/// GET /v1/facilities/stats/summary
pub async fn get_facility_summary(
    State(state): State<AppState>,
) -> HandlerResult<FacilitySummary> {
    let summary = db_services::facility_summary(state.repository.as_ref()).await?;
    Ok(Json(summary))
}

/// GET /v1/fuels/capacity
pub async fn get_fuel_capacity(State(state): State<AppState>) -> HandlerResult<Vec<FuelCapacity>> {
    let fuels = db_services::capacity_by_fuel(state.repository.as_ref()).await?;
    Ok(Json(fuels))
}

// =============================================================================
// Countries
// =============================================================================

/// GET /v1/countries/summary
pub async fn list_countries(State(state): State<AppState>) -> HandlerResult<CountryListResponse> {
    let countries = db_services::countries(state.repository.as_ref()).await?;
    Ok(Json(CountryListResponse::from(countries)))
}

/// GET /v1/countries/{country}/fuels
pub async fn get_country_fuels(
    State(state): State<AppState>,
    Path(country): Path<String>,
) -> HandlerResult<CountryFuelsResponse> {
    let country_code = db_services::normalize_country_code(&country)
        .ok_or_else(|| AppError::BadRequest("country code must not be empty".into()))?;
    let fuels = db_services::country_fuel_mix(state.repository.as_ref(), &country_code).await?;
    Ok(Json(CountryFuelsResponse {
        country_code,
        fuels,
    }))
}
