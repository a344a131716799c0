use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{AuthUser, MaybeUser};
use crate::error::AppError;
use crate::extract::JsonBody;
use crate::services::analytics::location_analytics;
use crate::services::locations::{self, CreateLocation, UpdateLocation};
use crate::services::nearby::{find_nearby, NearbyQuery};
use crate::services::ratings::{rate_location, RateLocation};
use crate::services::visits::{log_visit, LogVisit};
use crate::AppState;

/// Set on nearby responses that were emptied by an internal failure.
pub const DEGRADED_HEADER: &str = "x-nearby-degraded";

#[derive(Deserialize)]
pub struct NearbyParams {
    lat: Option<String>,
    #[serde(alias = "lon")]
    lng: Option<String>,
    radius: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/locations", get(list_locations).post(create_location))
        .route("/api/locations/nearby", get(nearby))
        .route("/api/locations/visit", post(visit))
        .route("/api/locations/rate", post(rate))
        .route(
            "/api/locations/{id}",
            get(show_location).put(update_location).delete(delete_location),
        )
        .route("/api/locations/{id}/analytics", get(analytics))
}

async fn list_locations(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(locations::list_locations(&state.db).await?))
}

async fn create_location(
    State(state): State<AppState>,
    user: MaybeUser,
    JsonBody(input): JsonBody<CreateLocation>,
) -> Result<impl IntoResponse, AppError> {
    let location = locations::create_location(&state.db, input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(location)))
}

async fn show_location(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(locations::show_location(&state.db, id, user.id()).await?))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<UpdateLocation>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(locations::update_location(&state.db, id, input).await?))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    locations::delete_location(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn nearby(
    State(state): State<AppState>,
    params: Result<Query<NearbyParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params?;
    let query = NearbyQuery::parse(
        params.lat.as_deref(),
        params.lng.as_deref(),
        params.radius.as_deref(),
    )?;
    let outcome = find_nearby(&state.db, query, state.nearby_strategy).await;

    let degraded = if outcome.is_degraded() { "true" } else { "false" };
    let header = [(
        HeaderName::from_static(DEGRADED_HEADER),
        HeaderValue::from_static(degraded),
    )];

    Ok((header, Json(outcome.into_locations())))
}

async fn visit(
    State(state): State<AppState>,
    user: MaybeUser,
    JsonBody(input): JsonBody<LogVisit>,
) -> Result<impl IntoResponse, AppError> {
    let logged = log_visit(&state.db, &state.placement, input, user.id()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Visit logged successfully",
            "location": logged.location,
            "visit": logged.visit,
        })),
    ))
}

async fn rate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(input): JsonBody<RateLocation>,
) -> Result<impl IntoResponse, AppError> {
    let rating = rate_location(&state.db, &user.id, input).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

async fn analytics(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(location_analytics(&state.db, id, chrono::Utc::now()).await?))
}
