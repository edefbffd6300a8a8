/// Single exercise page

use crate::api::{error::ApiError, AppState};
use crate::catalog::types::{Exercise, ExerciseInfo, Muscle};
use crate::thumbnails::Thumbnailer;
use crate::views::layout;
use axum::{
    extract::{Path, State},
    response::Html,
};
use maud::{html, Markup};

const PAGE_ALIAS: &str = "medium";

pub async fn exercise_view(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Html<String>, ApiError> {
    let exercise = state.storage.get::<Exercise>(id).await?.ok_or(ApiError::NotFound)?;
    let info = state.storage.exercise_info(exercise).await?;
    let body = render(&info, &state.thumbnailer);
    Ok(Html(layout(&info.name, &info.language.short_name, body).into_string()))
}

fn muscle_names(muscles: &[&Muscle]) -> String {
    muscles.iter().map(|m| m.name.as_str()).collect::<Vec<_>>().join(", ")
}

fn render(info: &ExerciseInfo, thumbnails: &Thumbnailer) -> Markup {
    let image_url = info.main_image().map(|image| {
        thumbnails
            .thumbnail_url(&image.image, PAGE_ALIAS)
            .unwrap_or_else(|| thumbnails.media_url(&image.image))
    });
    let aliases: Vec<&str> = info.aliases.iter().map(|a| a.alias.as_str()).collect();
    let equipment: Vec<&str> = info.equipment.iter().map(|e| e.name.as_str()).collect();

    html! {
        p.category { (info.category.name) }
        @if let Some(url) = &image_url {
            img src=(url) alt=(info.name);
        }
        @if !aliases.is_empty() {
            p.aliases { "Also known as: " (aliases.join(", ")) }
        }
        div.description { (info.description_clean) }

        h2 { "Muscles" }
        dl {
            @for (label, secondary) in [("Primary", false), ("Secondary", true)] {
                @let front = info.muscles_front(secondary);
                @let back = info.muscles_back(secondary);
                @if !front.is_empty() || !back.is_empty() {
                    dt { (label) }
                    @if !front.is_empty() {
                        dd { "Front: " (muscle_names(&front)) }
                    }
                    @if !back.is_empty() {
                        dd { "Back: " (muscle_names(&back)) }
                    }
                }
            }
        }

        @if !equipment.is_empty() {
            h2 { "Equipment" }
            p { (equipment.join(", ")) }
        }

        @if !info.variations.is_empty() {
            h2 { "Variations" }
            ul {
                @for id in &info.variations {
                    li { a href=(format!("/exercise/{id}/view/")) { "#" (id) } }
                }
            }
        }

        @if !info.comments.is_empty() {
            h2 { "Notes" }
            ul {
                @for comment in &info.comments {
                    li { (comment.comment) }
                }
            }
        }

        p.license {
            (info.license.short_name) " " (info.license_author.as_deref().unwrap_or(""))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::input::ExerciseBaseInput;
    use crate::catalog::testing::Fixture;

    #[tokio::test]
    async fn renders_muscles_by_side_and_escaped_aliases() {
        let fx = Fixture::new().await;
        let lats = fx.storage.insert_muscle("Latissimus dorsi", false).await;
        fx.storage
            .update_base(
                fx.base,
                ExerciseBaseInput {
                    muscles: Some(vec![fx.biceps]),
                    muscles_secondary: Some(vec![lats]),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();
        let exercise = fx.exercise("Chin up", fx.en).await;
        fx.alias(exercise.id, "Underhand <pull> up").await;

        let info = fx.storage.exercise_info(exercise).await.unwrap();
        let html = render(&info, &Thumbnailer::new("/media/", Vec::new())).into_string();

        assert!(html.contains("<p class=\"category\">Arms</p>"));
        assert!(html.contains("Also known as: Underhand &lt;pull&gt; up"));
        assert!(html.contains("<dt>Primary</dt><dd>Front: Biceps brachii</dd>"));
        assert!(html.contains("<dt>Secondary</dt><dd>Back: Latissimus dorsi</dd>"));
        assert!(!html.contains("<img"));
    }
}
