/// Exercise catalog: entities, storage and language visibility

pub mod input;
pub mod languages;
pub mod media;
pub mod query;
pub mod storage;
pub mod types;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use languages::LanguageRegistry;
pub use storage::CatalogStorage;
