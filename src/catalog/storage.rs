/// SQLite persistence layer for the exercise catalog
///
/// Generic listing/lookup for every `Record`, plus the validated write
/// paths for exercise bases and translations. Writes run in a transaction,
/// record the edit history of translations and return the events the
/// change triggers instead of reacting to them here.

use crate::catalog::input::{ExerciseBaseInput, ExerciseInput};
use crate::catalog::languages::LanguageConfigEntry;
use crate::catalog::query::{ListQuery, Listing, Record};
use crate::catalog::types::{
    Equipment, Exercise, ExerciseBase, ExerciseBaseInfo, ExerciseCategory, ExerciseComment,
    ExerciseImage, ExerciseInfo, ExerciseSummary, ExerciseVideo, Language, License, Muscle,
    Variation, Alias,
};
use crate::catalog::validation::{
    resolve, resolve_or, too_similar, FieldErrors, WriteError, DESCRIPTION_MAX_LENGTH,
    DESCRIPTION_MIN_LENGTH, NAME_MAX_LENGTH,
};
use crate::events::{CatalogEvent, WriteOutcome};
use crate::history::records::{record_exercise, HistoryType};
use anyhow::Result;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashMap;
use uuid::Uuid;

/// Many-to-many tables hanging off exercise_bases: (table, value column)
const MUSCLES: (&str, &str) = ("exercise_base_muscles", "muscle_id");
const MUSCLES_SECONDARY: (&str, &str) = ("exercise_base_muscles_secondary", "muscle_id");
const EQUIPMENT: (&str, &str) = ("exercise_base_equipment", "equipment_id");

/// Shared handle to the catalog tables
#[derive(Debug, Clone)]
pub struct CatalogStorage {
    pool: SqlitePool,
}

/// Push `(?, ?, ...)` for a list of ids
pub(crate) fn push_id_list(qb: &mut QueryBuilder<'_, Sqlite>, ids: &[i64]) {
    qb.push("(");
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    qb.push(")");
}

impl CatalogStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ------------------------------------------------------------------
    // Generic record access
    // ------------------------------------------------------------------

    /// One page of records matching the query, plus the total count
    pub async fn list<T: Record>(&self, query: &ListQuery) -> Result<Listing<T>> {
        let mut count_qb = QueryBuilder::new(format!("SELECT COUNT(*) AS n FROM {}", T::TABLE));
        query.push_where(&mut count_qb);
        let count: i64 = count_qb.build().fetch_one(&self.pool).await?.try_get("n")?;

        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", T::COLUMNS, T::TABLE));
        query.push_where(&mut qb);
        query.push_order_and_page(&mut qb, T::DEFAULT_ORDER);
        let rows = qb.build().fetch_all(&self.pool).await?;

        let results = rows.iter().map(T::from_row).collect::<sqlx::Result<Vec<_>>>()?;
        Ok(Listing { count, results })
    }

    pub async fn get<T: Record>(&self, id: i64) -> Result<Option<T>> {
        let row = sqlx::query(&format!("SELECT {} FROM {} WHERE id = ?", T::COLUMNS, T::TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(T::from_row).transpose()?)
    }

    /// Every record, in default order
    pub async fn all<T: Record>(&self) -> Result<Vec<T>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            T::COLUMNS,
            T::TABLE,
            T::DEFAULT_ORDER
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(T::from_row).collect::<sqlx::Result<Vec<_>>>()?)
    }

    /// Records whose `column` equals `value`, in default order
    pub async fn records_where<T: Record>(&self, column: &str, value: i64) -> Result<Vec<T>> {
        self.records_where_in(column, &[value]).await
    }

    /// Records whose `column` is one of `values`, in default order
    pub async fn records_where_in<T: Record>(&self, column: &str, values: &[i64]) -> Result<Vec<T>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM {} WHERE {} IN ", T::COLUMNS, T::TABLE, column));
        push_id_list(&mut qb, values);
        qb.push(format!(" ORDER BY {}", T::DEFAULT_ORDER));
        let rows = qb.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(T::from_row).collect::<sqlx::Result<Vec<_>>>()?)
    }

    pub async fn exists<T: Record>(&self, id: i64) -> Result<bool> {
        let row = sqlx::query(&format!("SELECT 1 FROM {} WHERE id = ?", T::TABLE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// Delete by primary key, `false` if nothing matched
    pub async fn delete<T: Record>(&self, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = ?", T::TABLE))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a field error when a referenced row does not exist
    pub(crate) async fn check_reference<T: Record>(
        &self,
        errors: &mut FieldErrors,
        field: &str,
        id: Option<i64>,
    ) -> Result<()> {
        if let Some(id) = id {
            if !self.exists::<T>(id).await? {
                errors.missing_object(field, id);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Languages
    // ------------------------------------------------------------------

    pub async fn all_languages(&self) -> Result<Vec<Language>> {
        let rows = sqlx::query(&format!("SELECT {} FROM languages ORDER BY id", Language::COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(Language::from_row).collect::<sqlx::Result<Vec<_>>>()?)
    }

    pub async fn language_by_code(&self, code: &str) -> Result<Option<Language>> {
        let row = sqlx::query(&format!("SELECT {} FROM languages WHERE short_name = ?", Language::COLUMNS))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(Language::from_row).transpose()?)
    }

    pub async fn language_config(&self) -> Result<Vec<LanguageConfigEntry>> {
        let rows = sqlx::query("SELECT language_id, item, show_language_id, show FROM language_config ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            entries.push(LanguageConfigEntry {
                language_id: row.try_get("language_id")?,
                item: row.try_get("item")?,
                show_language_id: row.try_get("show_language_id")?,
                show: row.try_get("show")?,
            });
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Exercise bases
    // ------------------------------------------------------------------

    /// Fill in the many-to-many id lists of loaded bases
    async fn load_base_relations(&self, bases: &mut [ExerciseBase]) -> Result<()> {
        if bases.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = bases.iter().map(|b| b.id).collect();
        let muscles = self.base_relation(MUSCLES, &ids).await?;
        let secondary = self.base_relation(MUSCLES_SECONDARY, &ids).await?;
        let equipment = self.base_relation(EQUIPMENT, &ids).await?;

        for base in bases.iter_mut() {
            base.muscles = muscles.get(&base.id).cloned().unwrap_or_default();
            base.muscles_secondary = secondary.get(&base.id).cloned().unwrap_or_default();
            base.equipment = equipment.get(&base.id).cloned().unwrap_or_default();
        }
        Ok(())
    }

    async fn base_relation(&self, (table, column): (&str, &str), ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT exercise_base_id, {column} AS value FROM {table} WHERE exercise_base_id IN "
        ));
        push_id_list(&mut qb, ids);
        qb.push(format!(" ORDER BY {column}"));

        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in qb.build().fetch_all(&self.pool).await? {
            map.entry(row.try_get("exercise_base_id")?)
                .or_default()
                .push(row.try_get("value")?);
        }
        Ok(map)
    }

    pub async fn get_base(&self, id: i64) -> Result<Option<ExerciseBase>> {
        let Some(base) = self.get::<ExerciseBase>(id).await? else {
            return Ok(None);
        };
        let mut bases = [base];
        self.load_base_relations(&mut bases).await?;
        let [base] = bases;
        Ok(Some(base))
    }

    pub async fn list_bases(&self, query: &ListQuery) -> Result<Listing<ExerciseBase>> {
        let mut listing = self.list::<ExerciseBase>(query).await?;
        self.load_base_relations(&mut listing.results).await?;
        Ok(listing)
    }

    pub async fn bases_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, ExerciseBase>> {
        let mut bases = self.records_where_in::<ExerciseBase>("id", ids).await?;
        self.load_base_relations(&mut bases).await?;
        Ok(bases.into_iter().map(|b| (b.id, b)).collect())
    }

    /// Workouts whose settings use the base
    pub async fn workouts_using_base(&self, base_id: i64) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT DISTINCT workout_id FROM workout_settings WHERE exercise_base_id = ? ORDER BY workout_id",
        )
        .bind(base_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| row.try_get("workout_id"))
            .collect::<sqlx::Result<Vec<i64>>>()?)
    }

    async fn base_changed(&self, base_id: i64) -> Result<CatalogEvent> {
        Ok(CatalogEvent::ExerciseDataChanged {
            base_id,
            workout_ids: self.workouts_using_base(base_id).await?,
        })
    }

    async fn validate_base(
        &self,
        input: ExerciseBaseInput,
        current: Option<&ExerciseBase>,
        partial: bool,
    ) -> Result<ExerciseBase, WriteError> {
        let mut errors = FieldErrors::new();

        let category = resolve(&mut errors, "category", input.category, current.map(|c| &c.category), partial);
        self.check_reference::<ExerciseCategory>(&mut errors, "category", category).await?;

        let muscles = resolve_or(input.muscles, current.map(|c| &c.muscles), Vec::new());
        let muscles_secondary = resolve_or(input.muscles_secondary, current.map(|c| &c.muscles_secondary), Vec::new());
        let equipment = resolve_or(input.equipment, current.map(|c| &c.equipment), Vec::new());
        for id in muscles.iter().copied() {
            self.check_reference::<Muscle>(&mut errors, "muscles", Some(id)).await?;
        }
        for id in muscles_secondary.iter().copied() {
            self.check_reference::<Muscle>(&mut errors, "muscles_secondary", Some(id)).await?;
        }
        for id in equipment.iter().copied() {
            self.check_reference::<Equipment>(&mut errors, "equipment", Some(id)).await?;
        }

        let variations = resolve_or(input.variations, current.map(|c| &c.variations), None);
        self.check_reference::<Variation>(&mut errors, "variations", variations).await?;

        let license = resolve_or(input.license, current.map(|c| &c.license), 1);
        self.check_reference::<License>(&mut errors, "license", Some(license)).await?;

        let license_author = resolve_or(input.license_author, current.map(|c| &c.license_author), None);

        match category {
            Some(category) if errors.is_empty() => {
                let now = Utc::now();
                Ok(ExerciseBase {
                    id: current.map(|c| c.id).unwrap_or_default(),
                    uuid: current.map(|c| c.uuid).unwrap_or_else(Uuid::new_v4),
                    category,
                    muscles: dedup(muscles),
                    muscles_secondary: dedup(muscles_secondary),
                    equipment: dedup(equipment),
                    variations,
                    license,
                    license_author,
                    creation_date: current.map(|c| c.creation_date).unwrap_or_else(|| now.date_naive()),
                    update_date: now,
                })
            }
            _ => Err(WriteError::Invalid(errors)),
        }
    }

    async fn write_base_relations(&self, conn: &mut SqliteConnection, base: &ExerciseBase) -> Result<()> {
        for ((table, column), ids) in [
            (MUSCLES, &base.muscles),
            (MUSCLES_SECONDARY, &base.muscles_secondary),
            (EQUIPMENT, &base.equipment),
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE exercise_base_id = ?"))
                .bind(base.id)
                .execute(&mut *conn)
                .await?;
            for id in ids {
                sqlx::query(&format!("INSERT INTO {table} (exercise_base_id, {column}) VALUES (?, ?)"))
                    .bind(base.id)
                    .bind(id)
                    .execute(&mut *conn)
                    .await?;
            }
        }
        Ok(())
    }

    pub async fn create_base(&self, input: ExerciseBaseInput) -> Result<WriteOutcome<ExerciseBase>, WriteError> {
        let mut base = self.validate_base(input, None, false).await?;

        let mut tx = self.pool.begin().await?;
        base.id = sqlx::query(
            r#"
            INSERT INTO exercise_bases
                (uuid, category_id, variation_id, license_id, license_author, creation_date, update_date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(base.uuid.to_string())
        .bind(base.category)
        .bind(base.variations)
        .bind(base.license)
        .bind(&base.license_author)
        .bind(base.creation_date)
        .bind(base.update_date)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        self.write_base_relations(&mut tx, &base).await?;
        tx.commit().await?;

        tracing::info!("Created exercise base {} ({})", base.id, base.uuid);
        let event = self.base_changed(base.id).await?;
        Ok(WriteOutcome::new(base).with_event(event))
    }

    pub async fn update_base(
        &self,
        id: i64,
        input: ExerciseBaseInput,
        partial: bool,
    ) -> Result<WriteOutcome<ExerciseBase>, WriteError> {
        let current = self.get_base(id).await?.ok_or(WriteError::NotFound)?;
        let base = self.validate_base(input, Some(&current), partial).await?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE exercise_bases
            SET category_id = ?, variation_id = ?, license_id = ?, license_author = ?, update_date = ?
            WHERE id = ?
            "#,
        )
        .bind(base.category)
        .bind(base.variations)
        .bind(base.license)
        .bind(&base.license_author)
        .bind(base.update_date)
        .bind(base.id)
        .execute(&mut *tx)
        .await?;
        self.write_base_relations(&mut tx, &base).await?;
        tx.commit().await?;

        tracing::info!("Updated exercise base {}", base.id);
        let event = self.base_changed(base.id).await?;
        Ok(WriteOutcome::new(base).with_event(event))
    }

    /// Delete a base with all its translations, media and workout settings
    pub async fn delete_base(&self, id: i64) -> Result<WriteOutcome<i64>, WriteError> {
        // Settings cascade away with the base, collect their workouts first
        let event = self.base_changed(id).await?;
        let translations = self.records_where::<Exercise>("exercise_base_id", id).await?;

        let mut tx = self.pool.begin().await?;
        for exercise in &translations {
            record_exercise(&mut tx, exercise, HistoryType::Deleted, None).await?;
        }
        let result = sqlx::query("DELETE FROM exercise_bases WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(WriteError::NotFound);
        }
        tx.commit().await?;

        tracing::info!("Deleted exercise base {} with {} translations", id, translations.len());
        Ok(WriteOutcome::new(id).with_event(event))
    }

    pub async fn base_info(&self, base: ExerciseBase) -> Result<ExerciseBaseInfo> {
        let category = self
            .get::<ExerciseCategory>(base.category)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category {} of base {} missing", base.category, base.id))?;
        let license = self
            .get::<License>(base.license)
            .await?
            .ok_or_else(|| anyhow::anyhow!("License {} of base {} missing", base.license, base.id))?;

        Ok(ExerciseBaseInfo {
            id: base.id,
            uuid: base.uuid,
            creation_date: base.creation_date,
            update_date: base.update_date,
            category,
            muscles: self.records_where_in::<Muscle>("id", &base.muscles).await?,
            muscles_secondary: self.records_where_in::<Muscle>("id", &base.muscles_secondary).await?,
            equipment: self.records_where_in::<Equipment>("id", &base.equipment).await?,
            license,
            license_author: base.license_author,
            images: self.records_where::<ExerciseImage>("exercise_base_id", base.id).await?,
            videos: self.records_where::<ExerciseVideo>("exercise_base_id", base.id).await?,
            exercises: self.records_where::<Exercise>("exercise_base_id", base.id).await?,
            variations: base.variations,
        })
    }

    // ------------------------------------------------------------------
    // Exercises (translations)
    // ------------------------------------------------------------------

    async fn validate_exercise(
        &self,
        input: ExerciseInput,
        current: Option<&Exercise>,
        partial: bool,
    ) -> Result<ValidExercise, WriteError> {
        let mut errors = FieldErrors::new();

        let name = resolve(&mut errors, "name", input.name, current.map(|c| &c.name), partial);
        if let Some(name) = &name {
            if name.trim().is_empty() {
                errors.add("name", "This field may not be blank.");
            } else {
                errors.check_length("name", name, 1, NAME_MAX_LENGTH);
            }
        }

        let description = resolve(&mut errors, "description", input.description, current.map(|c| &c.description), partial);
        if let Some(description) = &description {
            errors.check_length("description", description, DESCRIPTION_MIN_LENGTH, DESCRIPTION_MAX_LENGTH);
        }

        let language = resolve(&mut errors, "language", input.language, current.map(|c| &c.language), partial);
        self.check_reference::<Language>(&mut errors, "language", language).await?;

        let exercise_base = resolve(
            &mut errors,
            "exercise_base",
            input.exercise_base,
            current.map(|c| &c.exercise_base),
            partial,
        );
        self.check_reference::<ExerciseBase>(&mut errors, "exercise_base", exercise_base).await?;

        let license = resolve_or(input.license, current.map(|c| &c.license), 1);
        self.check_reference::<License>(&mut errors, "license", Some(license)).await?;
        let license_author = resolve_or(input.license_author, current.map(|c| &c.license_author), None);

        // Only new translations are checked against existing names
        if current.is_none() && !errors.contains("name") {
            if let (Some(name), Some(language)) = (&name, language) {
                if let Some(existing) = self.similar_name(name, language).await? {
                    errors.add(
                        "name",
                        format!("{} is too similar to existing exercise \"{}\"", name, existing),
                    );
                }
            }
        }

        match (name, description, language, exercise_base) {
            (Some(name), Some(description), Some(language), Some(exercise_base)) if errors.is_empty() => {
                Ok(ValidExercise {
                    name,
                    description,
                    language,
                    exercise_base,
                    license,
                    license_author,
                })
            }
            _ => Err(WriteError::Invalid(errors)),
        }
    }

    async fn similar_name(&self, name: &str, language: i64) -> Result<Option<String>> {
        let rows = sqlx::query("SELECT name FROM exercises WHERE language_id = ?")
            .bind(language)
            .fetch_all(&self.pool)
            .await?;
        for row in rows {
            let existing: String = row.try_get("name")?;
            if too_similar(name, &existing) {
                return Ok(Some(existing));
            }
        }
        Ok(None)
    }

    pub async fn create_exercise(
        &self,
        input: ExerciseInput,
        user: Option<&str>,
    ) -> Result<WriteOutcome<Exercise>, WriteError> {
        let valid = self.validate_exercise(input, None, false).await?;
        let now = Utc::now();
        let mut exercise = Exercise {
            id: 0,
            uuid: Uuid::new_v4(),
            name: valid.name,
            description: valid.description,
            language: valid.language,
            exercise_base: valid.exercise_base,
            license: valid.license,
            license_author: valid.license_author,
            creation_date: now.date_naive(),
            update_date: now,
        };

        let mut tx = self.pool.begin().await?;
        exercise.id = sqlx::query(
            r#"
            INSERT INTO exercises
                (uuid, name, description, language_id, exercise_base_id, license_id, license_author,
                 creation_date, update_date)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(exercise.uuid.to_string())
        .bind(&exercise.name)
        .bind(&exercise.description)
        .bind(exercise.language)
        .bind(exercise.exercise_base)
        .bind(exercise.license)
        .bind(&exercise.license_author)
        .bind(exercise.creation_date)
        .bind(exercise.update_date)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();
        record_exercise(&mut tx, &exercise, HistoryType::Created, user).await?;
        tx.commit().await?;

        tracing::info!("Created exercise {} '{}'", exercise.id, exercise.name);
        let event = self.base_changed(exercise.exercise_base).await?;
        Ok(WriteOutcome::new(exercise).with_event(event))
    }

    pub async fn update_exercise(
        &self,
        id: i64,
        input: ExerciseInput,
        partial: bool,
        user: Option<&str>,
    ) -> Result<WriteOutcome<Exercise>, WriteError> {
        let current = self.get::<Exercise>(id).await?.ok_or(WriteError::NotFound)?;
        let valid = self.validate_exercise(input, Some(&current), partial).await?;
        let exercise = Exercise {
            name: valid.name,
            description: valid.description,
            language: valid.language,
            exercise_base: valid.exercise_base,
            license: valid.license,
            license_author: valid.license_author,
            update_date: Utc::now(),
            ..current.clone()
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            UPDATE exercises
            SET name = ?, description = ?, language_id = ?, exercise_base_id = ?, license_id = ?,
                license_author = ?, update_date = ?
            WHERE id = ?
            "#,
        )
        .bind(&exercise.name)
        .bind(&exercise.description)
        .bind(exercise.language)
        .bind(exercise.exercise_base)
        .bind(exercise.license)
        .bind(&exercise.license_author)
        .bind(exercise.update_date)
        .bind(exercise.id)
        .execute(&mut *tx)
        .await?;
        record_exercise(&mut tx, &exercise, HistoryType::Changed, user).await?;
        tx.commit().await?;

        tracing::info!("Updated exercise {} '{}'", exercise.id, exercise.name);
        let mut outcome = WriteOutcome::new(exercise);
        if current.exercise_base != outcome.instance.exercise_base {
            outcome = outcome.with_event(self.base_changed(current.exercise_base).await?);
        }
        let event = self.base_changed(outcome.instance.exercise_base).await?;
        Ok(outcome.with_event(event))
    }

    pub async fn delete_exercise(&self, id: i64, user: Option<&str>) -> Result<WriteOutcome<i64>, WriteError> {
        let exercise = self.get::<Exercise>(id).await?.ok_or(WriteError::NotFound)?;
        let event = self.base_changed(exercise.exercise_base).await?;

        let mut tx = self.pool.begin().await?;
        record_exercise(&mut tx, &exercise, HistoryType::Deleted, user).await?;
        sqlx::query("DELETE FROM exercises WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!("Deleted exercise {} '{}'", exercise.id, exercise.name);
        Ok(WriteOutcome::new(id).with_event(event))
    }

    /// Attach the base fields every translation proxies
    pub async fn summarize(&self, exercises: Vec<Exercise>) -> Result<Vec<ExerciseSummary>> {
        let mut base_ids: Vec<i64> = exercises.iter().map(|e| e.exercise_base).collect();
        base_ids.sort_unstable();
        base_ids.dedup();
        let bases = self.bases_by_id(&base_ids).await?;

        exercises
            .into_iter()
            .map(|exercise| {
                let base = bases
                    .get(&exercise.exercise_base)
                    .ok_or_else(|| anyhow::anyhow!("Base {} of exercise {} missing", exercise.exercise_base, exercise.id))?;
                Ok(ExerciseSummary::new(exercise, base))
            })
            .collect()
    }

    /// Translation with all derived data resolved
    pub async fn exercise_info(&self, exercise: Exercise) -> Result<ExerciseInfo> {
        let base = self
            .get_base(exercise.exercise_base)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Base {} of exercise {} missing", exercise.exercise_base, exercise.id))?;
        let category = self
            .get::<ExerciseCategory>(base.category)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Category {} missing", base.category))?;
        let language = self
            .get::<Language>(exercise.language)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Language {} missing", exercise.language))?;
        let license = self
            .get::<License>(exercise.license)
            .await?
            .ok_or_else(|| anyhow::anyhow!("License {} missing", exercise.license))?;

        Ok(ExerciseInfo {
            id: exercise.id,
            uuid: exercise.uuid,
            exercise_base_id: base.id,
            description_clean: exercise.description_clean(),
            creation_date: exercise.creation_date,
            category,
            muscles: self.records_where_in::<Muscle>("id", &base.muscles).await?,
            muscles_secondary: self.records_where_in::<Muscle>("id", &base.muscles_secondary).await?,
            equipment: self.records_where_in::<Equipment>("id", &base.equipment).await?,
            language,
            license,
            license_author: exercise.license_author.clone(),
            images: self.records_where::<ExerciseImage>("exercise_base_id", base.id).await?,
            videos: self.records_where::<ExerciseVideo>("exercise_base_id", base.id).await?,
            comments: self.records_where::<ExerciseComment>("exercise_id", exercise.id).await?,
            aliases: self.records_where::<Alias>("exercise_id", exercise.id).await?,
            variations: self.variation_ids(&base, exercise.language).await?,
            name: exercise.name,
            description: exercise.description,
        })
    }

    /// Translations in `language` of every base in the variation group of
    /// `base` (the base itself included)
    async fn variation_ids(&self, base: &ExerciseBase, language: i64) -> Result<Vec<i64>> {
        let Some(variation) = base.variations else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query(
            r#"
            SELECT e.id FROM exercises e
            JOIN exercise_bases b ON b.id = e.exercise_base_id
            WHERE b.variation_id = ? AND e.language_id = ?
            ORDER BY e.id
            "#,
        )
        .bind(variation)
        .bind(language)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|r| r.try_get("id")).collect::<sqlx::Result<Vec<i64>>>()?)
    }

    /// Translations in one of `languages` whose name or any alias contains
    /// `term` (Unicode case-insensitive), ordered by category and name, each
    /// paired with its category name
    ///
    /// SQLite only folds ASCII in LIKE, so matching happens on the Rust side.
    pub async fn search_exercises(&self, term: &str, languages: &[i64]) -> Result<Vec<(Exercise, String)>> {
        if languages.is_empty() {
            return Ok(Vec::new());
        }
        let needle = term.to_lowercase();

        let mut qb = QueryBuilder::new(
            r#"
            SELECT e.id, e.uuid, e.name, e.description, e.language_id, e.exercise_base_id,
                   e.license_id, e.license_author, e.creation_date, e.update_date,
                   c.name AS category_name, a.alias
            FROM exercises e
            JOIN exercise_bases b ON b.id = e.exercise_base_id
            JOIN exercise_categories c ON c.id = b.category_id
            LEFT JOIN exercise_aliases a ON a.exercise_id = e.id
            WHERE e.language_id IN "#,
        );
        push_id_list(&mut qb, languages);
        qb.push(" ORDER BY c.name, e.name, e.id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let mut results: Vec<(Exercise, String)> = Vec::new();
        for row in &rows {
            let id: i64 = row.try_get("id")?;
            if results.last().is_some_and(|(e, _)| e.id == id) {
                continue;
            }
            let name: String = row.try_get("name")?;
            let alias: Option<String> = row.try_get("alias")?;
            let matches = name.to_lowercase().contains(&needle)
                || alias.is_some_and(|a| a.to_lowercase().contains(&needle));
            if matches {
                results.push((Exercise::from_row(row)?, row.try_get("category_name")?));
            }
        }
        Ok(results)
    }
}

/// Validated translation fields
struct ValidExercise {
    name: String,
    description: String,
    language: i64,
    exercise_base: i64,
    license: i64,
    license_author: Option<String>,
}

fn dedup(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::query::{FieldKind, FilterField};
    use crate::catalog::testing::{self, Fixture};
    use crate::events::cache::workout_canonical_key;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn short_description_is_rejected() {
        let fx = Fixture::new().await;
        let input = ExerciseInput {
            name: Some("Squat".into()),
            description: Some("Too short".into()),
            language: Some(fx.en),
            exercise_base: Some(fx.base),
            ..Default::default()
        };

        match fx.storage.create_exercise(input, None).await {
            Err(WriteError::Invalid(errors)) => {
                assert!(errors.contains("description"));
                assert!(!errors.contains("name"));
            }
            other => panic!("expected validation error, got {:?}", other.map(|o| o.instance)),
        }
    }

    #[tokio::test]
    async fn missing_references_are_field_errors() {
        let fx = Fixture::new().await;
        let input = ExerciseInput {
            name: Some("Squat".into()),
            description: Some(testing::DESCRIPTION.into()),
            language: Some(999),
            exercise_base: Some(998),
            ..Default::default()
        };

        let Err(WriteError::Invalid(errors)) = fx.storage.create_exercise(input, None).await else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors.messages("language"),
            ["Invalid pk \"999\" - object does not exist.".to_string()]
        );
        assert!(errors.contains("exercise_base"));
    }

    #[tokio::test]
    async fn similar_names_are_rejected_on_create_only() {
        let fx = Fixture::new().await;
        let existing = fx.exercise("Bench Press", fx.en).await;

        let input = ExerciseInput {
            name: Some("bench press".into()),
            description: Some(testing::DESCRIPTION.into()),
            language: Some(fx.en),
            exercise_base: Some(fx.base),
            ..Default::default()
        };
        let Err(WriteError::Invalid(errors)) = fx.storage.create_exercise(input, None).await else {
            panic!("expected validation error");
        };
        assert!(errors.contains("name"));

        // Renaming the existing one to a near-identical name is fine
        let rename = ExerciseInput {
            name: Some("Bench press".into()),
            ..Default::default()
        };
        let outcome = fx.storage.update_exercise(existing.id, rename, true, None).await.unwrap();
        assert_eq!(outcome.instance.name, "Bench press");
        assert_eq!(outcome.instance.uuid, existing.uuid);
    }

    #[tokio::test]
    async fn delete_reports_workouts_using_the_base() {
        let fx = Fixture::new().await;
        let exercise = fx.exercise("Deadlift", fx.en).await;
        fx.setting(7, fx.base).await;
        fx.setting(7, fx.base).await;
        fx.setting(9, fx.base).await;

        let outcome = fx.storage.delete_exercise(exercise.id, Some("admin")).await.unwrap();
        assert_eq!(
            outcome.events,
            vec![CatalogEvent::ExerciseDataChanged {
                base_id: fx.base,
                workout_ids: vec![7, 9],
            }]
        );
        assert!(fx.storage.get::<Exercise>(exercise.id).await.unwrap().is_none());
        assert_eq!(workout_canonical_key(7), "workout-canonical-representation-7");
    }

    #[tokio::test]
    async fn base_filters_follow_many_to_many() {
        let fx = Fixture::new().await;
        let other = fx.base_with_muscles(&[fx.biceps]).await;

        let filters = [FilterField::related(
            "muscles",
            FieldKind::IntegerList,
            "id",
            "exercise_base_muscles",
            "exercise_base_id",
            "muscle_id",
        )];
        let params = [("muscles".to_string(), fx.biceps.to_string())].into_iter().collect();
        let query = ListQuery::from_params(&params, &filters, ExerciseBase::ORDERING);

        let listing = fx.storage.list_bases(&query).await.unwrap();
        assert_eq!(listing.count, 1);
        assert_eq!(listing.results[0].id, other);
        assert_eq!(listing.results[0].muscles, vec![fx.biceps]);
    }

    #[tokio::test]
    async fn search_matches_name_or_alias_once() {
        let fx = Fixture::new().await;
        let curl = fx.exercise("Biceps Curl", fx.en).await;
        fx.alias(curl.id, "Curl for arms").await;
        fx.alias(curl.id, "Arm curl").await;
        fx.exercise("Kniebeuge", fx.de).await;

        let results = fx.storage.search_exercises("CURL", &[fx.en]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, curl.id);
        assert_eq!(results[0].1, "Arms");

        let results = fx.storage.search_exercises("kniebeuge", &[fx.en]).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_folds_non_ascii_case() {
        let fx = Fixture::new().await;
        let sleeve = fx.exercise("Übung Ärmel", fx.de).await;
        fx.exercise("Kniebeuge", fx.de).await;

        for term in ["übung", "ÜBUNG", "ärmel"] {
            let results = fx.storage.search_exercises(term, &[fx.de]).await.unwrap();
            assert_eq!(results.len(), 1, "term {term}");
            assert_eq!(results[0].0.id, sleeve.id);
        }
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let fx = Fixture::new().await;
        fx.exercise("Biceps Curl", fx.en).await;
        let discount = fx.exercise("Curl 50% off", fx.en).await;

        let results = fx.storage.search_exercises("50%", &[fx.en]).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, discount.id);
        assert!(fx.storage.search_exercises("_", &[fx.en]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exercise_info_resolves_variations_in_same_language() {
        let fx = Fixture::new().await;
        let variation = fx.storage.create_variation().await.unwrap().instance;
        fx.storage
            .update_base(
                fx.base,
                ExerciseBaseInput {
                    variations: Some(Some(variation.id)),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();
        let second = fx.base_with_muscles(&[]).await;
        fx.storage
            .update_base(
                second,
                ExerciseBaseInput {
                    variations: Some(Some(variation.id)),
                    ..Default::default()
                },
                true,
            )
            .await
            .unwrap();

        let first = fx.exercise("Push up", fx.en).await;
        let sibling = fx.exercise_for(second, "Diamond push up", fx.en).await;
        fx.exercise_for(second, "Diamant-Liegestütz", fx.de).await;

        let info = fx.storage.exercise_info(first.clone()).await.unwrap();
        assert_eq!(info.variations, vec![first.id, sibling.id]);
        assert_eq!(info.category.name, "Arms");
        assert_eq!(info.language.short_name, "en");
    }
}
