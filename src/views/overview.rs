/// Exercise, muscle and equipment overview pages
///
/// The body of each page depends only on the visible exercises of one
/// language, so it is rendered once and cached under
/// `template.cache.<fragment>.<language id>` until exercise data changes.

use crate::api::{error::ApiError, AppState, Params};
use crate::catalog::{
    languages::SHOW_ITEM_EXERCISES,
    storage::CatalogStorage,
    types::{main_image, Equipment, Exercise, ExerciseBase, ExerciseCategory, ExerciseImage, Muscle},
};
use crate::events::cache::template_fragment_key;
use crate::thumbnails::{Thumbnailer, SEARCH_ALIAS};
use crate::views::layout;
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Html,
};
use maud::{html, Markup, PreEscaped};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    Exercises,
    Muscles,
    Equipment,
}

impl Fragment {
    /// Cache name of the fragment
    pub fn name(&self) -> &'static str {
        match self {
            Fragment::Exercises => "exercise-overview",
            Fragment::Muscles => "muscle-overview",
            Fragment::Equipment => "equipment-overview",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Fragment::Exercises => "Exercises",
            Fragment::Muscles => "Muscles",
            Fragment::Equipment => "Equipment",
        }
    }

    fn render(&self, data: &OverviewData, thumbnails: &Thumbnailer) -> Markup {
        match self {
            Fragment::Exercises => render_exercises(data, thumbnails),
            Fragment::Muscles => render_muscles(data),
            Fragment::Equipment => render_equipment(data),
        }
    }
}

/// Everything the overview pages show for one set of languages
struct OverviewData {
    exercises: Vec<Exercise>,
    bases: HashMap<i64, ExerciseBase>,
    categories: Vec<ExerciseCategory>,
    muscles: Vec<Muscle>,
    equipment: Vec<Equipment>,
    images: HashMap<i64, Vec<ExerciseImage>>,
}

impl OverviewData {
    async fn load(storage: &CatalogStorage, language_ids: &[i64]) -> Result<Self> {
        let exercises = storage.records_where_in::<Exercise>("language_id", language_ids).await?;
        let mut base_ids: Vec<i64> = exercises.iter().map(|e| e.exercise_base).collect();
        base_ids.sort_unstable();
        base_ids.dedup();

        let mut images: HashMap<i64, Vec<ExerciseImage>> = HashMap::new();
        for image in storage.images_for_bases(&base_ids).await? {
            images.entry(image.exercise_base).or_default().push(image);
        }

        Ok(Self {
            bases: storage.bases_by_id(&base_ids).await?,
            categories: storage.all::<ExerciseCategory>().await?,
            muscles: storage.all::<Muscle>().await?,
            equipment: storage.all::<Equipment>().await?,
            exercises,
            images,
        })
    }

    fn exercises_where(&self, predicate: impl Fn(&ExerciseBase) -> bool) -> Vec<&Exercise> {
        self.exercises
            .iter()
            .filter(|e| self.bases.get(&e.exercise_base).is_some_and(&predicate))
            .collect()
    }
}

fn exercise_list(exercises: &[&Exercise], thumbnails: Option<(&Thumbnailer, &OverviewData)>) -> Markup {
    html! {
        @if exercises.is_empty() {
            p { "No exercises." }
        } @else {
            ul {
                @for exercise in exercises {
                    li {
                        a href=(format!("/exercise/{}/view/", exercise.id)) { (exercise.name) }
                        @if let Some(url) = thumbnails.and_then(|(thumbnailer, data)| thumbnail(thumbnailer, data, exercise)) {
                            " "
                            img src=(url) alt="";
                        }
                    }
                }
            }
        }
    }
}

fn thumbnail(thumbnailer: &Thumbnailer, data: &OverviewData, exercise: &Exercise) -> Option<String> {
    let images = data.images.get(&exercise.exercise_base)?;
    let image = main_image(images)?;
    thumbnailer.thumbnail_url(&image.image, SEARCH_ALIAS)
}

fn render_exercises(data: &OverviewData, thumbnails: &Thumbnailer) -> Markup {
    html! {
        @for category in &data.categories {
            @let exercises = data.exercises_where(|base| base.category == category.id);
            @if !exercises.is_empty() {
                section {
                    h2 { (category.name) }
                    (exercise_list(&exercises, Some((thumbnails, data))))
                }
            }
        }
    }
}

fn render_muscles(data: &OverviewData) -> Markup {
    html! {
        @for (heading, front) in [("Front", true), ("Back", false)] {
            h2 { (heading) }
            @for muscle in data.muscles.iter().filter(|m| m.is_front == front) {
                section {
                    h3 { (muscle.name) }
                    (exercise_list(&data.exercises_where(|base| base.muscles.contains(&muscle.id)), None))
                }
            }
        }
    }
}

fn render_equipment(data: &OverviewData) -> Markup {
    html! {
        @for equipment in &data.equipment {
            section {
                h2 { (equipment.name) }
                (exercise_list(&data.exercises_where(|base| base.equipment.contains(&equipment.id)), None))
            }
        }
    }
}

/// Render (or fetch from cache) one overview page
pub async fn overview_page(state: &AppState, code: Option<&str>, fragment: Fragment) -> Result<Html<String>, ApiError> {
    let language = state
        .languages
        .resolve(code)
        .ok_or_else(|| anyhow::anyhow!("No languages configured"))?;
    let key = template_fragment_key(fragment.name(), language.id);

    let body = match state.cache.get(&key).await {
        Some(cached) => PreEscaped(cached),
        None => {
            let visible: Vec<i64> = state
                .languages
                .load_item_languages(SHOW_ITEM_EXERCISES, Some(&language.short_name))
                .iter()
                .map(|l| l.id)
                .collect();
            let data = OverviewData::load(&state.storage, &visible).await?;
            let body = fragment.render(&data, &state.thumbnailer);
            state.cache.set(&key, body.clone().into_string()).await;
            tracing::debug!("Rendered {} for language {}", fragment.name(), language.short_name);
            body
        }
    };

    Ok(Html(layout(fragment.title(), &language.short_name, body).into_string()))
}

pub async fn exercise_overview(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Html<String>, ApiError> {
    overview_page(&state, params.get("language").map(String::as_str), Fragment::Exercises).await
}

pub async fn muscle_overview(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Html<String>, ApiError> {
    overview_page(&state, params.get("language").map(String::as_str), Fragment::Muscles).await
}

pub async fn equipment_overview(State(state): State<AppState>, Query(params): Query<Params>) -> Result<Html<String>, ApiError> {
    overview_page(&state, params.get("language").map(String::as_str), Fragment::Equipment).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::input::{ExerciseBaseInput, ExerciseInput};
    use crate::catalog::testing::Fixture;
    use crate::config::Config;
    use crate::server::build_state;

    #[tokio::test]
    async fn pages_are_cached_per_language_until_exercises_change() {
        let state = build_state(Config::in_memory()).await.unwrap();
        let fx = Fixture::on(state.storage.clone()).await;
        state.languages.reload().await.unwrap();
        let exercise = fx.exercise("Curl <heavy>", fx.en).await;

        let Html(page) = overview_page(&state, Some("en"), Fragment::Exercises).await.unwrap();
        assert!(page.contains("<h2>Arms</h2>"));
        assert!(page.contains("Curl &lt;heavy&gt;"));
        let key = template_fragment_key("exercise-overview", fx.en);
        assert!(state.cache.get(&key).await.is_some());
        assert!(state.cache.get(&template_fragment_key("exercise-overview", fx.de)).await.is_none());

        let outcome = fx
            .storage
            .update_exercise(
                exercise.id,
                ExerciseInput {
                    name: Some("Concentration curl".into()),
                    ..Default::default()
                },
                true,
                None,
            )
            .await
            .unwrap();
        state.events.dispatch(outcome.events).await.unwrap();
        assert!(state.cache.get(&key).await.is_none());

        let Html(page) = overview_page(&state, Some("en"), Fragment::Exercises).await.unwrap();
        assert!(page.contains("Concentration curl"));
    }

    #[tokio::test]
    async fn muscle_page_splits_front_and_back() {
        let state = build_state(Config::in_memory()).await.unwrap();
        let fx = Fixture::on(state.storage.clone()).await;
        state.languages.reload().await.unwrap();
        let back = fx.storage.insert_muscle("Latissimus dorsi", false).await;
        fx.storage
            .update_base(
                fx.base,
                ExerciseBaseInput {
                    muscles: Some(vec![back]),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();
        fx.exercise("Pull up", fx.en).await;

        let Html(page) = overview_page(&state, None, Fragment::Muscles).await.unwrap();
        let back_section = page.split("<h2>Back</h2>").nth(1).unwrap();
        assert!(back_section.contains("Latissimus dorsi"));
        assert!(back_section.contains("Pull up"));
        let front_section = page.split("<h2>Back</h2>").next().unwrap();
        assert!(front_section.contains("Biceps brachii"));
        assert!(!front_section.contains("Pull up"));
    }
}
