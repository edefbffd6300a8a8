/// Exercise translation endpoints
///
/// `exercise-translation` is the writable resource, `exercise` and
/// `exerciseinfo` are read-only views that pull in the base's data, and
/// `exercise/search` feeds the autocompleter.

use crate::api::{
    auth::Actor, commit, error::{ApiError, JsonBody}, list_records, paginate, retrieve_record, AppState, Params,
};
use crate::catalog::{
    input::ExerciseInput,
    languages::SHOW_ITEM_EXERCISES,
    query::{FieldKind, FilterField, ListQuery, Listing, Record},
    types::{main_image, Exercise, ExerciseImage, ExerciseInfo, ExerciseSummary},
};
use crate::events::activity::Verb;
use crate::thumbnails::SEARCH_ALIAS;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;

const TRANSLATION_FILTERS: &[FilterField] = &[
    FilterField::column("uuid", "uuid", FieldKind::Uuid),
    FilterField::column("creation_date", "creation_date", FieldKind::Date),
    FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
    FilterField::column("description", "description", FieldKind::Text),
    FilterField::column("name", "name", FieldKind::Text),
];

/// Translation filters plus those reaching into the base
const EXERCISE_FILTERS: &[FilterField] = &[
    FilterField::column("uuid", "uuid", FieldKind::Uuid),
    FilterField::column("creation_date", "creation_date", FieldKind::Date),
    FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
    FilterField::column("description", "description", FieldKind::Text),
    FilterField::column("language", "language_id", FieldKind::Integer),
    FilterField::column("name", "name", FieldKind::Text),
    FilterField::related("category", FieldKind::Integer, "exercise_base_id", "exercise_bases", "id", "category_id"),
    FilterField::related(
        "muscles",
        FieldKind::IntegerList,
        "exercise_base_id",
        "exercise_base_muscles",
        "exercise_base_id",
        "muscle_id",
    ),
    FilterField::related(
        "muscles_secondary",
        FieldKind::IntegerList,
        "exercise_base_id",
        "exercise_base_muscles_secondary",
        "exercise_base_id",
        "muscle_id",
    ),
    FilterField::related(
        "equipment",
        FieldKind::IntegerList,
        "exercise_base_id",
        "exercise_base_equipment",
        "exercise_base_id",
        "equipment_id",
    ),
    FilterField::related("license", FieldKind::Integer, "exercise_base_id", "exercise_bases", "id", "license_id"),
];

const INFO_FILTERS: &[FilterField] = &[
    FilterField::column("creation_date", "creation_date", FieldKind::Date),
    FilterField::column("description", "description", FieldKind::Text),
    FilterField::column("name", "name", FieldKind::Text),
    FilterField::column("exercise_base", "exercise_base_id", FieldKind::Integer),
    FilterField::column("license", "license_id", FieldKind::Integer),
    FilterField::column("license_author", "license_author", FieldKind::Text),
];

pub fn create_exercise_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v2/exercise-translation/",
            get(list_translations).post(create_translation),
        )
        .route(
            "/api/v2/exercise-translation/{id}/",
            get(get_translation)
                .put(replace_translation)
                .patch(patch_translation)
                .delete(delete_translation),
        )
        .route("/api/v2/exercise/", get(list_exercises))
        .route("/api/v2/exercise/search/", get(search))
        .route("/api/v2/exercise/{id}/", get(get_exercise))
        .route("/api/v2/exerciseinfo/", get(list_exercise_info))
        .route("/api/v2/exerciseinfo/{id}/", get(get_exercise_info))
}

async fn list_translations(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    list_records::<Exercise>(&state, &uri, &params, TRANSLATION_FILTERS).await
}

async fn get_translation(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Exercise>, ApiError> {
    retrieve_record::<Exercise>(&state, id).await
}

/// POST /api/v2/exercise-translation/
async fn create_translation(
    State(state): State<AppState>,
    actor: Actor,
    JsonBody(input): JsonBody<ExerciseInput>,
) -> Result<(StatusCode, Json<Exercise>), ApiError> {
    let user = actor.require_editor()?;
    let outcome = state.storage.create_exercise(input, Some(&user.username)).await?;
    let id = outcome.instance.id;
    let outcome = outcome.record_activity(&user.username, Verb::Created, "exercise", id)?;

    let exercise = commit(&state, outcome).await?;
    tracing::info!("🏋️ {} created exercise {} '{}'", user.username, exercise.id, exercise.name);
    Ok((StatusCode::CREATED, Json(exercise)))
}

async fn replace_translation(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ExerciseInput>,
) -> Result<Json<Exercise>, ApiError> {
    update_translation(state, actor, id, input, false).await
}

async fn patch_translation(
    state: State<AppState>,
    actor: Actor,
    id: Path<i64>,
    input: JsonBody<ExerciseInput>,
) -> Result<Json<Exercise>, ApiError> {
    update_translation(state, actor, id, input, true).await
}

async fn update_translation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    JsonBody(input): JsonBody<ExerciseInput>,
    partial: bool,
) -> Result<Json<Exercise>, ApiError> {
    let user = actor.require_editor()?;
    let outcome = state
        .storage
        .update_exercise(id, input, partial, Some(&user.username))
        .await?
        .record_activity(&user.username, Verb::Updated, "exercise", id)?;
    Ok(Json(commit(&state, outcome).await?))
}

async fn delete_translation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let user = actor.require_deleter()?;
    let outcome = state.storage.delete_exercise(id, Some(&user.username)).await?;
    commit(&state, outcome).await?;
    tracing::info!("🗑️ {} deleted exercise {}", user.username, id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v2/exercise/
async fn list_exercises(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::from_params(&params, EXERCISE_FILTERS, Exercise::ORDERING);
    let listing = state.storage.list::<Exercise>(&query).await?;
    let results = state.storage.summarize(listing.results).await?;
    Ok(paginate(&uri, &params, &query, Listing { count: listing.count, results }))
}

async fn get_exercise(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseSummary>, ApiError> {
    let exercise = state.storage.get::<Exercise>(id).await?.ok_or(ApiError::NotFound)?;
    let mut summaries = state.storage.summarize(vec![exercise]).await?;
    summaries.pop().map(Json).ok_or(ApiError::NotFound)
}

/// GET /api/v2/exerciseinfo/
async fn list_exercise_info(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<Params>,
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::from_params(&params, INFO_FILTERS, Exercise::ORDERING);
    let listing = state.storage.list::<Exercise>(&query).await?;

    let mut results = Vec::with_capacity(listing.results.len());
    for exercise in listing.results {
        results.push(state.storage.exercise_info(exercise).await?);
    }
    Ok(paginate(&uri, &params, &query, Listing { count: listing.count, results }))
}

async fn get_exercise_info(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<ExerciseInfo>, ApiError> {
    let exercise = state.storage.get::<Exercise>(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(state.storage.exercise_info(exercise).await?))
}

/// GET /api/v2/exercise/search/?term=...&language=...
///
/// Suggestions for the exercise autocompleter, in the languages visible
/// for the requested UI language.
async fn search(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Json<Value>, ApiError> {
    let term = params.get("term").map(String::as_str).unwrap_or_default();
    if term.is_empty() {
        return Ok(Json(json!({ "suggestions": [] })));
    }

    let languages: Vec<i64> = state
        .languages
        .load_item_languages(SHOW_ITEM_EXERCISES, params.get("language").map(String::as_str))
        .iter()
        .map(|l| l.id)
        .collect();
    let matches = state.storage.search_exercises(term, &languages).await?;

    let mut base_ids: Vec<i64> = matches.iter().map(|(e, _)| e.exercise_base).collect();
    base_ids.sort_unstable();
    base_ids.dedup();
    let mut images: HashMap<i64, Vec<ExerciseImage>> = HashMap::new();
    for image in state.storage.images_for_bases(&base_ids).await? {
        images.entry(image.exercise_base).or_default().push(image);
    }

    let suggestions: Vec<Value> = matches
        .into_iter()
        .map(|(exercise, category)| {
            let main = images.get(&exercise.exercise_base).and_then(|list| main_image(list));
            let image = main.map(|i| state.thumbnailer.media_url(&i.image));
            let thumbnail = main.and_then(|i| state.thumbnailer.thumbnail_url(&i.image, SEARCH_ALIAS));
            json!({
                "value": exercise.name,
                "data": {
                    "id": exercise.id,
                    "name": exercise.name,
                    "category": category,
                    "image": image,
                    "image_thumbnail": thumbnail,
                }
            })
        })
        .collect();

    tracing::debug!("🔎 Search '{}' in {} languages: {} hits", term, languages.len(), suggestions.len());
    Ok(Json(json!({ "suggestions": suggestions })))
}
