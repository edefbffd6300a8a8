/// HTTP API layer
///
/// REST endpoints under `/api/v2`. Every resource module exposes a
/// `create_*_routes()` builder; list endpoints share the pagination and
/// filtering helpers below.

pub mod annotations;
pub mod auth;
pub mod bases;
pub mod error;
pub mod exercises;
pub mod lookups;
pub mod media;
pub mod workouts;

use crate::{
    catalog::{
        query::{FilterField, ListQuery, Listing, Record},
        CatalogStorage, LanguageRegistry,
    },
    config::Config,
    events::{activity::ActivityLog, cache::CacheStore, EventDispatcher, WriteOutcome},
    history::HistoryStore,
    thumbnails::Thumbnailer,
    workouts::WorkoutStore,
};
use auth::UserStore;
use axum::{http::Uri, response::Json, Router};
use error::ApiError;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Catalog persistence
    pub storage: CatalogStorage,
    /// In-memory language snapshot
    pub languages: Arc<LanguageRegistry>,
    /// Post-write reactions (cache invalidation, activity stream)
    pub events: EventDispatcher,
    /// Rendered fragments and canonical workout forms
    pub cache: Arc<dyn CacheStore>,
    pub thumbnailer: Arc<Thumbnailer>,
    pub activity: ActivityLog,
    pub history: HistoryStore,
    pub workouts: WorkoutStore,
    pub users: UserStore,
}

/// Query string as a plain map
pub type Params = HashMap<String, String>;

/// Build all `/api/v2` routes
pub fn create_api_routes() -> Router<AppState> {
    Router::new()
        .merge(exercises::create_exercise_routes())
        .merge(bases::create_base_routes())
        .merge(media::create_media_routes())
        .merge(annotations::create_annotation_routes())
        .merge(lookups::create_lookup_routes())
        .merge(workouts::create_workout_routes())
}

/// Wrap one page of results the way every list endpoint answers:
/// `{count, next, previous, results}`
pub fn paginate<T: Serialize>(uri: &Uri, params: &Params, query: &ListQuery, listing: Listing<T>) -> Json<Value> {
    let link = |offset: i64| {
        let mut pairs: Vec<(&str, String)> = params
            .iter()
            .filter(|(key, _)| key.as_str() != "limit" && key.as_str() != "offset")
            .map(|(key, value)| (key.as_str(), value.clone()))
            .collect();
        pairs.sort();
        pairs.push(("limit", query.limit.to_string()));
        pairs.push(("offset", offset.to_string()));

        let query_string = pairs
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", uri.path(), query_string)
    };

    let next = (query.offset + query.limit < listing.count).then(|| link(query.offset + query.limit));
    let previous = (query.offset > 0).then(|| link((query.offset - query.limit).max(0)));

    Json(json!({
        "count": listing.count,
        "next": next,
        "previous": previous,
        "results": listing.results,
    }))
}

/// Generic list endpoint body for flat records
pub(crate) async fn list_records<T: Record + Serialize>(
    state: &AppState,
    uri: &Uri,
    params: &Params,
    filters: &[FilterField],
) -> Result<Json<Value>, ApiError> {
    let query = ListQuery::from_params(params, filters, T::ORDERING);
    let listing = state.storage.list::<T>(&query).await?;
    Ok(paginate(uri, params, &query, listing))
}

/// Generic retrieve endpoint body for flat records
pub(crate) async fn retrieve_record<T: Record + Serialize>(state: &AppState, id: i64) -> Result<Json<T>, ApiError> {
    state.storage.get::<T>(id).await?.map(Json).ok_or(ApiError::NotFound)
}

/// Run the reactions of a successful write and hand back the instance
pub(crate) async fn commit<T>(state: &AppState, outcome: WriteOutcome<T>) -> Result<T, ApiError> {
    state.events.dispatch(outcome.events).await?;
    Ok(outcome.instance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pagination_links_keep_filters() {
        let uri: Uri = "/api/v2/exercise/?language=2&limit=2".parse().unwrap();
        let params: Params = [("language", "2"), ("limit", "2"), ("offset", "2")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let query = ListQuery::from_params(&params, &[], &[]);
        let listing = Listing {
            count: 5,
            results: vec![3, 4],
        };

        let Json(page) = paginate(&uri, &params, &query, listing);
        assert_eq!(page["next"], "/api/v2/exercise/?language=2&limit=2&offset=4");
        assert_eq!(page["previous"], "/api/v2/exercise/?language=2&limit=2&offset=0");
        assert_eq!(page["results"], json!([3, 4]));
    }

    #[test]
    fn single_page_has_no_links() {
        let uri: Uri = "/api/v2/muscle/".parse().unwrap();
        let params = Params::new();
        let query = ListQuery::from_params(&params, &[], &[]);
        let Json(page) = paginate(&uri, &params, &query, Listing { count: 1, results: vec!["Biceps"] });
        assert_eq!(page["next"], Value::Null);
        assert_eq!(page["previous"], Value::Null);
        assert_eq!(page["count"], 1);
    }
}
