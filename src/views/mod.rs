/// Server-rendered HTML pages
///
/// Overview pages cache their rendered body per language under the
/// template fragment keys that exercise writes invalidate. History pages
/// are restricted to exercise editors.

pub mod detail;
pub mod history;
pub mod overview;

use crate::api::AppState;
use axum::{routing::get, Router};
use maud::{html, Markup, DOCTYPE};

pub fn create_view_routes() -> Router<AppState> {
    Router::new()
        .route("/exercise/overview/", get(overview::exercise_overview))
        .route("/muscle/overview/", get(overview::muscle_overview))
        .route("/equipment/overview/", get(overview::equipment_overview))
        .route("/exercise/{id}/view/", get(detail::exercise_view))
        .route("/exercise/history/", get(history::activity_stream))
        .route("/exercise/history/revisions/", get(history::revisions))
}

/// Wrap a rendered body in the page skeleton
pub fn layout(title: &str, language: &str, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(language) {
            head {
                meta charset="utf-8";
                title { (title) }
            }
            body {
                h1 { (title) }
                (body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maud::PreEscaped;

    #[test]
    fn layout_escapes_title_but_not_body() {
        let page = layout("Arms & Legs", "en", PreEscaped("<p>body</p>".to_string())).into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("<title>Arms &amp; Legs</title>"));
        assert!(page.contains("<html lang=\"en\">"));
        assert!(page.contains("<p>body</p>"));
    }
}
