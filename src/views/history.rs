/// Editor-only history pages: the activity stream and translation revisions

use crate::api::{
    auth::{Actor, CHANGE_EXERCISE},
    error::ApiError,
    AppState,
};
use crate::history::{self, Revision};
use crate::views::layout;
use axum::{
    extract::{OriginalUri, State},
    http::{header::LOCATION, StatusCode},
    response::{Html, IntoResponse, Response},
};
use maud::{html, Markup};

/// Anonymous callers are sent to the login page, users without the change
/// permission get a 403 page.
fn guard(state: &AppState, actor: &Actor, uri: &axum::http::Uri) -> Option<Response> {
    match &actor.0 {
        None => {
            let next = uri.path_and_query().map(|p| p.as_str()).unwrap_or(uri.path());
            let location = format!("{}?next={}", state.config.server.login_url, urlencoding::encode(next));
            tracing::debug!("🔒 Redirecting anonymous history request to {}", location);
            Some((StatusCode::FOUND, [(LOCATION, location)]).into_response())
        }
        Some(user) if !user.has_perm(CHANGE_EXERCISE) => {
            tracing::warn!("🚫 {} may not view the exercise history", user.username);
            let page = layout("Forbidden", "en", html! { p { "You are not allowed to view this page." } });
            Some((StatusCode::FORBIDDEN, Html(page.into_string())).into_response())
        }
        Some(_) => None,
    }
}

/// GET /exercise/history/
pub async fn activity_stream(
    State(state): State<AppState>,
    actor: Actor,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    if let Some(response) = guard(&state, &actor, &uri) {
        return Ok(response);
    }

    let actions = state.activity.list_all().await?;
    let body = html! {
        table {
            thead {
                tr { th { "When" } th { "Who" } th { "Action" } th { "Object" } }
            }
            tbody {
                @for action in &actions {
                    tr {
                        td { (action.timestamp.format("%Y-%m-%d %H:%M")) }
                        td { (action.actor) }
                        td { (action.verb) }
                        td { (action.target_type) " #" (action.target_id) }
                    }
                }
            }
        }
    };

    Ok(Html(layout("Exercise history", "en", body).into_string()).into_response())
}

/// GET /exercise/history/revisions/
pub async fn revisions(
    State(state): State<AppState>,
    actor: Actor,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, ApiError> {
    if let Some(response) = guard(&state, &actor, &uri) {
        return Ok(response);
    }

    let revisions = history::revisions(&state.history).await?;
    let body = render_revisions(&revisions);
    Ok(Html(layout("Exercise revisions", "en", body).into_string()).into_response())
}

fn render_revisions(revisions: &[Revision]) -> Markup {
    html! {
        @for revision in revisions {
            @let record = &revision.record;
            section {
                h2 { (record.name) " (" (record.id) ")" }
                p {
                    (record.history_type.label())
                    " by " (record.history_user.as_deref().unwrap_or("unknown"))
                    " on " (record.history_date.format("%Y-%m-%d %H:%M"))
                }
                @if !revision.changes.is_empty() {
                    table {
                        thead {
                            tr { th { "Field" } th { "Before" } th { "After" } }
                        }
                        tbody {
                            @for change in &revision.changes {
                                tr {
                                    td { (change.field) }
                                    td { (change.old) }
                                    td { (change.new) }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::input::ExerciseInput;
    use crate::catalog::testing::Fixture;
    use crate::history::HistoryStore;

    #[tokio::test]
    async fn revision_table_shows_old_and_new_values() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Chin up", fx.en).await;
        fx.storage
            .update_exercise(
                exercise.id,
                ExerciseInput {
                    name: Some("Chin-up <strict>".into()),
                    ..Default::default()
                },
                true,
                Some("editor"),
            )
            .await
            .unwrap();

        let store = HistoryStore::new(fx.storage.pool().clone());
        let html = render_revisions(&history::revisions(&store).await.unwrap()).into_string();

        assert!(html.contains("by editor"));
        assert!(html.contains("<tr><td>name</td><td>Chin up</td><td>Chin-up &lt;strict&gt;</td></tr>"));
    }
}
