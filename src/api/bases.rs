/// Exercise base endpoints

use crate::api::{auth::Actor, commit, error::{ApiError, JsonBody}, paginate, AppState, Params};
use crate::catalog::{
    input::ExerciseBaseInput,
    query::{FieldKind, FilterField, ListQuery, Listing, Record},
    types::{ExerciseBase, ExerciseBaseInfo},
};
use crate::events::activity::Verb;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::Value;

const MUSCLES: FilterField = FilterField::related(
    "muscles",
    FieldKind::IntegerList,
    "id",
    "exercise_base_muscles",
    "exercise_base_id",
    "muscle_id",
);
const MUSCLES_SECONDARY: FilterField = FilterField::related(
    "muscles_secondary",
    FieldKind::IntegerList,
    "id",
    "exercise_base_muscles_secondary",
    "exercise_base_id",
    "muscle_id",
);
const EQUIPMENT: FilterField = FilterField::related(
    "equipment",
    FieldKind::IntegerList,
    "id",
    "exercise_base_equipment",
    "exercise_base_id",
    "equipment_id",
);

const BASE_FILTERS: &[FilterField] = &[
    FilterField::column("category", "category_id", FieldKind::Integer),
    MUSCLES,
    MUSCLES_SECONDARY,
    EQUIPMENT,
];

const BASE_INFO_FILTERS: &[FilterField] = &[
    FilterField::column("category", "category_id", FieldKind::Integer),
    MUSCLES,
    MUSCLES_SECONDARY,
    EQUIPMENT,
    FilterField::column("variations", "variation_id", FieldKind::Integer),
    FilterField::column("license", "license_id", FieldKind::Integer),
    FilterField::column("license_author", "license_author", FieldKind::Text),
];

pub fn create_base_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/exercisebase/", get(list_bases).post(create_base))
        .route(
            "/api/v2/exercisebase/{id}/",
            get(get_base).put(replace_base).patch(patch_base).delete(delete_base),
        )
        .route("/api/v2/exercisebaseinfo/", get(list_base_info))
        .route("/api/v2/exercisebaseinfo/{id}/", get(get_base_info))
}

async fn list_bases(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::from_params(&params, BASE_FILTERS, ExerciseBase::ORDERING);
    let listing = state.storage.list_bases(&query).await?;
    Ok(paginate(&uri, &params, &query, listing))
}

async fn get_base(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseBase>, ApiError> {
    state.storage.get_base(id).await?.map(Json).ok_or(ApiError::NotFound)
}

/// POST /api/v2/exercisebase/
async fn create_base(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<ExerciseBaseInput>,
) -> Result<(StatusCode, Json<ExerciseBase>), ApiError> {
    let user = actor.require_editor()?;
    let outcome = state.storage.create_base(input).await?;
    let id = outcome.instance.id;
    let base = commit(&state, outcome.record_activity(&user.username, Verb::Created, "exercisebase", id)?).await?;
    Ok((StatusCode::CREATED, Json(base)))
}

async fn replace_base(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ExerciseBaseInput>,
) -> Result<Json<ExerciseBase>, ApiError> {
    update_base(state, actor, id, input, false).await
}

async fn patch_base(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ExerciseBaseInput>,
) -> Result<Json<ExerciseBase>, ApiError> {
    update_base(state, actor, id, input, true).await
}

async fn update_base(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<ExerciseBaseInput>,
    partial: bool,
) -> Result<Json<ExerciseBase>, ApiError> {
    let user = actor.require_editor()?;
    let outcome = state
        .storage
        .update_base(id, input, partial)
        .await?
        .record_activity(&user.username, Verb::Updated, "exercisebase", id)?;
    Ok(Json(commit(&state, outcome).await?))
}

async fn delete_base(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let user = actor.require_deleter()?;
    commit(&state, state.storage.delete_base(id).await?).await?;
    tracing::info!("🗑️ {} deleted exercise base {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

async fn list_base_info(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::from_params(&params, BASE_INFO_FILTERS, ExerciseBase::ORDERING);
    let listing = state.storage.list_bases(&query).await?;

    let mut results = Vec::with_capacity(listing.results.len());
    for base in listing.results {
        results.push(state.storage.base_info(base).await?);
    }
    Ok(paginate(&uri, &params, &query, Listing { count: listing.count, results }))
}

async fn get_base_info(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseBaseInfo>, ApiError> {
    let base = state.storage.get_base(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(state.storage.base_info(base).await?))
}
