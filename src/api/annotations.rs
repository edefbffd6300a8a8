/// Comments, aliases and variation groups

use crate::api::{auth::Actor, commit, error::{ApiError, JsonBody}, list_records, retrieve_record, AppState, Params};
use crate::catalog::{
    input::{AliasInput, CommentInput},
    query::{FieldKind, FilterField},
    types::{Alias, ExerciseComment, Variation},
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

const COMMENT_FILTERS: &[FilterField] = &[
    FilterField::column("comment", "comment", FieldKind::Text),
    FilterField::column("exercise", "exercise_id", FieldKind::Integer),
    // Comments on translations written in that language
    FilterField::related("language", FieldKind::Integer, "exercise_id", "exercises", "id", "language_id"),
];

const ALIAS_FILTERS: &[FilterField] = &[
    FilterField::column("alias", "alias", FieldKind::Text),
    FilterField::column("exercise", "exercise_id", FieldKind::Integer),
];

pub fn create_annotation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v2/exercisecomment/", get(list_comments).post(create_comment))
        .route(
            "/api/v2/exercisecomment/{id}/",
            get(get_comment).put(replace_comment).patch(patch_comment),
        )
        .route("/api/v2/exercisealias/", get(list_aliases).post(create_alias))
        .route(
            "/api/v2/exercisealias/{id}/",
            get(get_alias).put(replace_alias).patch(patch_alias).delete(delete_alias),
        )
        .route("/api/v2/variation/", get(list_variations).post(create_variation))
        .route(
            "/api/v2/variation/{id}/",
            get(get_variation).put(touch_variation).patch(touch_variation).delete(delete_variation),
        )
}

// ----------------------------------------------------------------------
// Comments
// ----------------------------------------------------------------------

async fn list_comments(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<ExerciseComment>(&state, &uri, &params, COMMENT_FILTERS).await
}

async fn get_comment(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseComment>, ApiError> {
    retrieve_record::<ExerciseComment>(&state, id).await
}

async fn create_comment(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<CommentInput>,
) -> Result<(StatusCode, Json<ExerciseComment>), ApiError> {
    let user = actor.require_editor()?;
    let outcome = state.storage.create_comment(input).await?;
    let id = outcome.instance.id;
    let comment = commit(&state, outcome.record_activity(&user.username, Verb::Created, "exercisecomment", id)?).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn replace_comment(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<CommentInput>,
) -> Result<Json<ExerciseComment>, ApiError> {
    update_comment(state, actor, id, input, false).await
}

async fn patch_comment(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<CommentInput>,
) -> Result<Json<ExerciseComment>, ApiError> {
    update_comment(state, actor, id, input, true).await
}

async fn update_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<CommentInput>,
    partial: bool,
) -> Result<Json<ExerciseComment>, ApiError> {
    let user = actor.require_editor()?;
    let outcome = state
        .storage
        .update_comment(id, input, partial)
        .await?
        .record_activity(&user.username, Verb::Updated, "exercisecomment", id)?;
    Ok(Json(commit(&state, outcome).await?))
}

// ----------------------------------------------------------------------
// Aliases
// ----------------------------------------------------------------------

async fn list_aliases(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Alias>(&state, &uri, &params, ALIAS_FILTERS).await
}

async fn get_alias(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Alias>, ApiError> {
    retrieve_record::<Alias>(&state, id).await
}

async fn create_alias(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<AliasInput>,
) -> Result<(StatusCode, Json<Alias>), ApiError> {
    actor.require_editor()?;
    let alias = commit(&state, state.storage.create_alias(input).await?).await?;
    Ok((StatusCode::CREATED, Json(alias)))
}

async fn replace_alias(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<AliasInput>,
) -> Result<Json<Alias>, ApiError> {
    update_alias(state, actor, id, input, false).await
}

async fn patch_alias(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<AliasInput>,
) -> Result<Json<Alias>, ApiError> {
    update_alias(state, actor, id, input, true).await
}

async fn update_alias(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<AliasInput>,
    partial: bool,
) -> Result<Json<Alias>, ApiError> {
    actor.require_editor()?;
    let outcome = state.storage.update_alias(id, input, partial).await?;
    Ok(Json(commit(&state, outcome).await?))
}

async fn delete_alias(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    actor.require_deleter()?;
    if state.storage.delete::<Alias>(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// ----------------------------------------------------------------------
// Variations
// ----------------------------------------------------------------------

async fn list_variations(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Variation>(&state, &uri, &params, &[]).await
}

async fn get_variation(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Variation>, ApiError> {
    retrieve_record::<Variation>(&state, id).await
}

async fn create_variation(State(state): State<AppState>, actor: Actor) -> Result<(StatusCode, Json<Variation>), ApiError> {
    actor.require_editor()?;
    let variation = commit(&state, state.storage.create_variation().await?).await?;
    Ok((StatusCode::CREATED, Json(variation)))
}

/// A variation has no writable fields; updating it only checks it exists
async fn touch_variation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Json<Variation>, ApiError> {
    actor.require_editor()?;
    retrieve_record::<Variation>(&state, id).await
}

async fn delete_variation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    actor.require_deleter()?;
    if state.storage.delete::<Variation>(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}
