/// Image and video endpoints

use crate::api::{auth::Actor, commit, error::{ApiError, JsonBody}, list_records, retrieve_record, AppState, Params};
use crate::catalog::{
    input::ImageInput,
    query::{FieldKind, FilterField},
    types::{ExerciseImage, ExerciseVideo},
};
use crate::events::activity::Verb;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{Map, Value};

const IMAGE_FILTERS: &[FilterField] = &[
    FilterField::column("is_main", "is_main", FieldKind::Boolean),
    FilterField::column("status", "status", FieldKind::Text),
    FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
    FilterField::column("license", "license_id", FieldKind::Integer),
    FilterField::column("license_author", "license_author", FieldKind::Text),
];

const VIDEO_FILTERS: &[FilterField] = &[
    FilterField::column("is_main", "is_main", FieldKind::Boolean),
    FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
    FilterField::column("license", "license_id", FieldKind::Integer),
    FilterField::column("license_author", "license_author", FieldKind::Text),
];

pub fn create_media_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/exerciseimage/", get(list_images).post(create_image))
        .route(
            "/api/v2/exerciseimage/{id}/",
            get(get_image).put(replace_image).patch(patch_image).delete(delete_image),
        )
        .route("/api/v2/exerciseimage/{id}/thumbnails/", get(thumbnails))
        .route("/api/v2/video/", get(list_videos))
        .route("/api/v2/video/{id}/", get(get_video))
}

async fn list_images(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<ExerciseImage>(&state, &uri, &params, IMAGE_FILTERS).await
}

async fn get_image(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseImage>, ApiError> {
    retrieve_record::<ExerciseImage>(&state, id).await
}

async fn create_image(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<ImageInput>,
) -> Result<(StatusCode, Json<ExerciseImage>), ApiError> {
    let user = actor.require_editor()?;
    let outcome = state.storage.create_image(input).await?;
    let id = outcome.instance.id;
    let image = commit(&state, outcome.record_activity(&user.username, Verb::Created, "exerciseimage", id)?).await?;
    Ok((StatusCode::CREATED, Json(image)))
}

async fn replace_image(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ImageInput>,
) -> Result<Json<ExerciseImage>, ApiError> {
    update_image(state, actor, id, input, false).await
}

async fn patch_image(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ImageInput>,
) -> Result<Json<ExerciseImage>, ApiError> {
    update_image(state, actor, id, input, true).await
}

async fn update_image(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<ImageInput>,
    partial: bool,
) -> Result<Json<ExerciseImage>, ApiError> {
    let user = actor.require_editor()?;
    let outcome = state
        .storage
        .update_image(id, input, partial)
        .await?
        .record_activity(&user.username, Verb::Updated, "exerciseimage", id)?;
    Ok(Json(commit(&state, outcome).await?))
}

async fn delete_image(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    actor.require_deleter()?;
    commit(&state, state.storage.delete_image(id).await?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v2/exerciseimage/{id}/thumbnails/
///
/// Every configured thumbnail of the image plus the original. An unknown
/// image yields an empty object, not a 404.
async fn thumbnails(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Map<String, Value>>, ApiError> {
    match state.storage.get::<ExerciseImage>(id).await? {
        Some(image) => Ok(Json(state.thumbnailer.thumbnails(&image.image))),
        None => {
            tracing::debug!("No image {}, no thumbnails", id);
            Ok(Json(Map::new()))
        }
    }
}

async fn list_videos(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<ExerciseVideo>(&state, &uri, &params, VIDEO_FILTERS).await
}

async fn get_video(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseVideo>, ApiError> {
    retrieve_record::<ExerciseVideo>(&state, id).await
}
