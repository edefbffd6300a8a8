/// Images, comments, aliases and variations
///
/// Smaller resources attached to a base or a translation. Videos are
/// read-only here and go through the generic record access.

use crate::catalog::input::{AliasInput, CommentInput, ImageInput};
use crate::catalog::storage::CatalogStorage;
use crate::catalog::types::{Alias, Exercise, ExerciseBase, ExerciseComment, ExerciseImage, ImageStatus, License, Variation};
use crate::catalog::validation::{resolve, resolve_or, FieldErrors, WriteError};
use crate::events::{CatalogEvent, WriteOutcome};
use anyhow::Result;
use uuid::Uuid;

pub const COMMENT_MAX_LENGTH: usize = 200;
pub const ALIAS_MAX_LENGTH: usize = 200;

impl CatalogStorage {
    async fn image_changed(&self, base_id: i64) -> Result<CatalogEvent> {
        Ok(CatalogEvent::ExerciseDataChanged {
            base_id,
            workout_ids: self.workouts_using_base(base_id).await?,
        })
    }

    async fn validate_image(
        &self,
        input: ImageInput,
        current: Option<&ExerciseImage>,
        partial: bool,
    ) -> Result<ExerciseImage, WriteError> {
        let mut errors = FieldErrors::new();

        let exercise_base = resolve(&mut errors, "exercise_base", input.exercise_base, current.map(|c| &c.exercise_base), partial);
        self.check_reference::<ExerciseBase>(&mut errors, "exercise_base", exercise_base).await?;

        let image = resolve(&mut errors, "image", input.image, current.map(|c| &c.image), partial);
        if image.as_deref().is_some_and(|path| path.trim().is_empty()) {
            errors.add("image", "This field may not be blank.");
        }

        let license = resolve_or(input.license, current.map(|c| &c.license), 1);
        self.check_reference::<License>(&mut errors, "license", Some(license)).await?;

        match (exercise_base, image) {
            (Some(exercise_base), Some(image)) if errors.is_empty() => Ok(ExerciseImage {
                id: current.map(|c| c.id).unwrap_or_default(),
                uuid: current.map(|c| c.uuid).unwrap_or_else(Uuid::new_v4),
                exercise_base,
                image,
                is_main: resolve_or(input.is_main, current.map(|c| &c.is_main), false),
                status: resolve_or(input.status, current.map(|c| &c.status), ImageStatus::Pending),
                license,
                license_author: resolve_or(input.license_author, current.map(|c| &c.license_author), None),
            }),
            _ => Err(WriteError::Invalid(errors)),
        }
    }

    pub async fn create_image(&self, input: ImageInput) -> Result<WriteOutcome<ExerciseImage>, WriteError> {
        let mut image = self.validate_image(input, None, false).await?;
        image.id = sqlx::query(
            r#"
            INSERT INTO exercise_images (uuid, exercise_base_id, image, is_main, status, license_id, license_author)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(image.uuid.to_string())
        .bind(image.exercise_base)
        .bind(&image.image)
        .bind(image.is_main)
        .bind(image.status.as_code())
        .bind(image.license)
        .bind(&image.license_author)
        .execute(self.pool())
        .await?
        .last_insert_rowid();

        tracing::info!("Added image {} to exercise base {}", image.id, image.exercise_base);
        let event = self.image_changed(image.exercise_base).await?;
        Ok(WriteOutcome::new(image).with_event(event))
    }

    pub async fn update_image(
        &self,
        id: i64,
        input: ImageInput,
        partial: bool,
    ) -> Result<WriteOutcome<ExerciseImage>, WriteError> {
        let current = self.get::<ExerciseImage>(id).await?.ok_or(WriteError::NotFound)?;
        let image = self.validate_image(input, Some(&current), partial).await?;
        sqlx::query(
            r#"
            UPDATE exercise_images
            SET exercise_base_id = ?, image = ?, is_main = ?, status = ?, license_id = ?, license_author = ?
            WHERE id = ?
            "#,
        )
        .bind(image.exercise_base)
        .bind(&image.image)
        .bind(image.is_main)
        .bind(image.status.as_code())
        .bind(image.license)
        .bind(&image.license_author)
        .bind(image.id)
        .execute(self.pool())
        .await?;

        let mut outcome = WriteOutcome::new(image);
        if current.exercise_base != outcome.instance.exercise_base {
            outcome = outcome.with_event(self.image_changed(current.exercise_base).await?);
        }
        let event = self.image_changed(outcome.instance.exercise_base).await?;
        Ok(outcome.with_event(event))
    }

    pub async fn delete_image(&self, id: i64) -> Result<WriteOutcome<i64>, WriteError> {
        let image = self.get::<ExerciseImage>(id).await?.ok_or(WriteError::NotFound)?;
        self.delete::<ExerciseImage>(id).await?;
        let event = self.image_changed(image.exercise_base).await?;
        Ok(WriteOutcome::new(id).with_event(event))
    }

    /// Images of several bases at once
    pub async fn images_for_bases(&self, base_ids: &[i64]) -> Result<Vec<ExerciseImage>> {
        self.records_where_in::<ExerciseImage>("exercise_base_id", base_ids).await
    }

    async fn validate_comment(
        &self,
        input: CommentInput,
        current: Option<&ExerciseComment>,
        partial: bool,
    ) -> Result<ExerciseComment, WriteError> {
        let mut errors = FieldErrors::new();
        let exercise = resolve(&mut errors, "exercise", input.exercise, current.map(|c| &c.exercise), partial);
        self.check_reference::<Exercise>(&mut errors, "exercise", exercise).await?;

        let comment = resolve(&mut errors, "comment", input.comment, current.map(|c| &c.comment), partial);
        if let Some(comment) = &comment {
            errors.check_length("comment", comment, 1, COMMENT_MAX_LENGTH);
        }

        match (exercise, comment) {
            (Some(exercise), Some(comment)) if errors.is_empty() => Ok(ExerciseComment {
                id: current.map(|c| c.id).unwrap_or_default(),
                exercise,
                comment,
            }),
            _ => Err(WriteError::Invalid(errors)),
        }
    }

    pub async fn create_comment(&self, input: CommentInput) -> Result<WriteOutcome<ExerciseComment>, WriteError> {
        let mut comment = self.validate_comment(input, None, false).await?;
        comment.id = sqlx::query("INSERT INTO exercise_comments (exercise_id, comment) VALUES (?, ?)")
            .bind(comment.exercise)
            .bind(&comment.comment)
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(WriteOutcome::new(comment))
    }

    pub async fn update_comment(
        &self,
        id: i64,
        input: CommentInput,
        partial: bool,
    ) -> Result<WriteOutcome<ExerciseComment>, WriteError> {
        let current = self.get::<ExerciseComment>(id).await?.ok_or(WriteError::NotFound)?;
        let comment = self.validate_comment(input, Some(&current), partial).await?;
        sqlx::query("UPDATE exercise_comments SET exercise_id = ?, comment = ? WHERE id = ?")
            .bind(comment.exercise)
            .bind(&comment.comment)
            .bind(comment.id)
            .execute(self.pool())
            .await?;
        Ok(WriteOutcome::new(comment))
    }

    async fn validate_alias(
        &self,
        input: AliasInput,
        current: Option<&Alias>,
        partial: bool,
    ) -> Result<Alias, WriteError> {
        let mut errors = FieldErrors::new();
        let exercise = resolve(&mut errors, "exercise", input.exercise, current.map(|c| &c.exercise), partial);
        self.check_reference::<Exercise>(&mut errors, "exercise", exercise).await?;

        let alias = resolve(&mut errors, "alias", input.alias, current.map(|c| &c.alias), partial);
        if let Some(alias) = &alias {
            if alias.trim().is_empty() {
                errors.add("alias", "This field may not be blank.");
            } else {
                errors.check_length("alias", alias, 1, ALIAS_MAX_LENGTH);
            }
        }

        match (exercise, alias) {
            (Some(exercise), Some(alias)) if errors.is_empty() => Ok(Alias {
                id: current.map(|c| c.id).unwrap_or_default(),
                exercise,
                alias,
            }),
            _ => Err(WriteError::Invalid(errors)),
        }
    }

    pub async fn create_alias(&self, input: AliasInput) -> Result<WriteOutcome<Alias>, WriteError> {
        let mut alias = self.validate_alias(input, None, false).await?;
        alias.id = sqlx::query("INSERT INTO exercise_aliases (exercise_id, alias) VALUES (?, ?)")
            .bind(alias.exercise)
            .bind(&alias.alias)
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(WriteOutcome::new(alias))
    }

    pub async fn update_alias(&self, id: i64, input: AliasInput, partial: bool) -> Result<WriteOutcome<Alias>, WriteError> {
        let current = self.get::<Alias>(id).await?.ok_or(WriteError::NotFound)?;
        let alias = self.validate_alias(input, Some(&current), partial).await?;
        sqlx::query("UPDATE exercise_aliases SET exercise_id = ?, alias = ? WHERE id = ?")
            .bind(alias.exercise)
            .bind(&alias.alias)
            .bind(alias.id)
            .execute(self.pool())
            .await?;
        Ok(WriteOutcome::new(alias))
    }

    pub async fn create_variation(&self) -> Result<WriteOutcome<Variation>, WriteError> {
        let id = sqlx::query("INSERT INTO variations DEFAULT VALUES")
            .execute(self.pool())
            .await?
            .last_insert_rowid();
        Ok(WriteOutcome::new(Variation { id }))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::input::{AliasInput, CommentInput, ImageInput};
    use crate::catalog::testing::Fixture;
    use crate::catalog::types::{ExerciseImage, ImageStatus};
    use crate::catalog::validation::WriteError;
    use crate::events::CatalogEvent;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn image_writes_report_the_base() {
        let fx = Fixture::new().await;
        fx.setting(3, fx.base).await;

        let outcome = fx
            .storage
            .create_image(ImageInput {
                exercise_base: Some(fx.base),
                image: Some("exercise-images/1/curl.png".into()),
                is_main: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome.instance.status, ImageStatus::Pending);
        assert_eq!(
            outcome.events,
            vec![CatalogEvent::ExerciseDataChanged {
                base_id: fx.base,
                workout_ids: vec![3],
            }]
        );

        let accepted = fx
            .storage
            .update_image(
                outcome.instance.id,
                ImageInput {
                    status: Some(ImageStatus::Accepted),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap()
            .instance;
        assert_eq!(accepted.status, ImageStatus::Accepted);
        assert_eq!(accepted.image, "exercise-images/1/curl.png");

        fx.storage.delete_image(accepted.id).await.unwrap();
        assert!(fx.storage.get::<ExerciseImage>(accepted.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_update_requires_every_field() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Hammer Curl", fx.en).await;
        let alias = fx.alias(exercise.id, "Hammer").await;

        let result = fx
            .storage
            .update_alias(
                alias.id,
                AliasInput {
                    alias: Some("Neutral grip curl".into()),
                    ..Default::default()
                },
                false,
            )
            .await;
        let Err(WriteError::Invalid(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.contains("exercise"));
        assert!(!errors.contains("alias"));
    }

    #[tokio::test]
    async fn comments_are_length_checked() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Hammer Curl", fx.en).await;

        let result = fx
            .storage
            .create_comment(CommentInput {
                exercise: Some(exercise.id),
                comment: Some("x".repeat(201)),
            })
            .await;
        assert!(matches!(result, Err(WriteError::Invalid(ref e)) if e.contains("comment")));

        let comment = fx
            .storage
            .create_comment(CommentInput {
                exercise: Some(exercise.id),
                comment: Some("Keep the elbows still".into()),
            })
            .await
            .unwrap()
            .instance;
        assert_eq!(comment.exercise, exercise.id);
    }
}
