/// Exercise catalog: a multilingual exercise database with a REST API
///
/// Exercises are language-neutral bases with per-language translations,
/// media, comments and aliases. Writes keep cached overview pages and
/// workout representations fresh and feed the activity stream and the
/// translation history.

// Core configuration and setup
pub mod config;

// SQLite pool and schema
pub mod db;

// Catalog data model, storage, filtering and validation
pub mod catalog;

// Post-write reactions: cache invalidation and the activity stream
pub mod events;

// Snapshots and revisions of exercise translations
pub mod history;

// Thumbnail URL rendering
pub mod thumbnails;

// Workout settings and their cached canonical form
pub mod workouts;

// HTTP API layer - REST endpoints under /api/v2
pub mod api;

// Server-rendered pages
pub mod views;

// Translatable string export
pub mod i18n;

// Server setup and initialization
pub mod server;

pub use catalog::{CatalogStorage, LanguageRegistry};
pub use config::Config;
pub use server::{build_state, start_server};
