/// Workout endpoints the catalog serves: adding settings and the cached
/// canonical representation

use crate::api::{auth::Actor, commit, error::{ApiError, JsonBody}, AppState};
use crate::workouts::{SettingInput, WorkoutSetting};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;

pub fn create_workout_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/setting/", post(create_setting))
        .route(
            "/api/v2/workout/{id}/canonical_representation/",
            get(canonical_representation),
        )
}

async fn create_setting(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<SettingInput>,
) -> Result<(StatusCode, Json<WorkoutSetting>), ApiError> {
    actor.require_editor()?;
    let setting = commit(&state, state.workouts.create_setting(input).await?).await?;
    Ok((StatusCode::CREATED, Json(setting)))
}

async fn canonical_representation(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, ApiError> {
    state
        .workouts
        .canonical_representation(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}
