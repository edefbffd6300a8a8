/// Read-only reference data: equipment, categories, muscles, languages

use crate::api::{error::ApiError, list_records, retrieve_record, AppState, Params};
use crate::catalog::{
    query::{FieldKind, FilterField},
    types::{Equipment, ExerciseCategory, Language, Muscle},
};
use axum::{
    extract::{OriginalUri, Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde_json::Value;

const NAME_FILTERS: &[FilterField] = &[FilterField::column("name", "name", FieldKind::Text)];

const MUSCLE_FILTERS: &[FilterField] = &[
    FilterField::column("name", "name", FieldKind::Text),
    FilterField::column("is_front", "is_front", FieldKind::Boolean),
];

const LANGUAGE_FILTERS: &[FilterField] = &[
    FilterField::column("short_name", "short_name", FieldKind::Text),
    FilterField::column("full_name", "full_name", FieldKind::Text),
];

pub fn create_lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/equipment/", get(list_equipment))
        .route("/api/v2/equipment/{id}/", get(get_equipment))
        .route("/api/v2/exercisecategory/", get(list_categories))
        .route("/api/v2/exercisecategory/{id}/", get(get_category))
        .route("/api/v2/muscle/", get(list_muscles))
        .route("/api/v2/muscle/{id}/", get(get_muscle))
        .route("/api/v2/language/", get(list_languages))
        .route("/api/v2/language/{id}/", get(get_language))
}

async fn list_equipment(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Equipment>(&state, &uri, &params, NAME_FILTERS).await
}

async fn get_equipment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Equipment>, ApiError> {
    retrieve_record::<Equipment>(&state, id).await
}

async fn list_categories(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<ExerciseCategory>(&state, &uri, &params, NAME_FILTERS).await
}

async fn get_category(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseCategory>, ApiError> {
    retrieve_record::<ExerciseCategory>(&state, id).await
}

async fn list_muscles(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Muscle>(&state, &uri, &params, MUSCLE_FILTERS).await
}

async fn get_muscle(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Muscle>, ApiError> {
    retrieve_record::<Muscle>(&state, id).await
}

async fn list_languages(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Language>(&state, &uri, &params, LANGUAGE_FILTERS).await
}

async fn get_language(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Language>, ApiError> {
    retrieve_record::<Language>(&state, id).await
}
