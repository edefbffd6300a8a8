/// Export of translatable catalog names
///
/// Category, muscle and equipment names live in the database but are shown
/// translated, so they are written to a gettext template for translators.

use crate::catalog::{
    storage::CatalogStorage,
    types::{Equipment, ExerciseCategory, Muscle},
};
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;

/// Quote a string for a `.po`/`.pot` file
fn po_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Every translatable name, sorted and without duplicates
pub async fn collect_strings(storage: &CatalogStorage) -> Result<BTreeSet<String>> {
    let mut strings = BTreeSet::new();
    strings.extend(storage.all::<ExerciseCategory>().await?.into_iter().map(|c| c.name));
    strings.extend(storage.all::<Muscle>().await?.into_iter().map(|m| m.name));
    strings.extend(storage.all::<Equipment>().await?.into_iter().map(|e| e.name));
    strings.retain(|s| !s.trim().is_empty());
    Ok(strings)
}

pub fn render_template(strings: &BTreeSet<String>) -> String {
    let mut out = String::new();
    for text in strings {
        out.push_str(&format!("msgid {}\nmsgstr \"\"\n\n", po_quote(text)));
    }
    out
}

/// Write the template to `path`, returning the number of entries
pub async fn extract(storage: &CatalogStorage, path: &Path) -> Result<usize> {
    let strings = collect_strings(storage).await?;
    tokio::fs::write(path, render_template(&strings))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("🌐 Wrote {} translatable strings to {}", strings.len(), path.display());
    Ok(strings.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::storage;
    use pretty_assertions::assert_eq;

    #[test]
    fn quotes_special_characters() {
        assert_eq!(po_quote(r#"SZ-Bar "curl""#), r#""SZ-Bar \"curl\"""#);
        assert_eq!(po_quote("a\\b"), r#""a\\b""#);
    }

    #[tokio::test]
    async fn extracts_sorted_unique_names() {
        let storage = storage().await;
        storage.insert_named("exercise_categories", "Legs").await;
        storage.insert_named("exercise_categories", "Arms").await;
        storage.insert_named("equipment", "Barbell").await;
        storage.insert_named("equipment", "Arms").await;
        storage.insert_muscle("Biceps brachii", true).await;

        let path = std::env::temp_dir().join(format!("i18n-{}.pot", uuid::Uuid::new_v4()));
        let written = extract(&storage, &path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(written, 4);
        assert_eq!(
            content,
            "msgid \"Arms\"\nmsgstr \"\"\n\n\
             msgid \"Barbell\"\nmsgstr \"\"\n\n\
             msgid \"Biceps brachii\"\nmsgstr \"\"\n\n\
             msgid \"Legs\"\nmsgstr \"\"\n\n"
        );
    }
}
