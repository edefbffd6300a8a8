/// Database schema
///
/// All statements use IF NOT EXISTS / INSERT OR IGNORE so initialisation is
/// safe on every start.

use anyhow::Result;
use sqlx::sqlite::SqlitePool;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS languages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        short_name TEXT NOT NULL UNIQUE,
        full_name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS language_config (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        language_id INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
        item TEXT NOT NULL,
        show_language_id INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
        show INTEGER NOT NULL DEFAULT 1,
        UNIQUE (language_id, item, show_language_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS licenses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        short_name TEXT NOT NULL,
        url TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_categories (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS equipment (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS muscles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        name_en TEXT NOT NULL DEFAULT '',
        is_front INTEGER NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS variations (
        id INTEGER PRIMARY KEY AUTOINCREMENT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_bases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        category_id INTEGER NOT NULL REFERENCES exercise_categories(id),
        variation_id INTEGER REFERENCES variations(id) ON DELETE SET NULL,
        license_id INTEGER NOT NULL DEFAULT 1 REFERENCES licenses(id),
        license_author TEXT,
        creation_date TEXT NOT NULL,
        update_date TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_base_muscles (
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        muscle_id INTEGER NOT NULL REFERENCES muscles(id) ON DELETE CASCADE,
        PRIMARY KEY (exercise_base_id, muscle_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_base_muscles_secondary (
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        muscle_id INTEGER NOT NULL REFERENCES muscles(id) ON DELETE CASCADE,
        PRIMARY KEY (exercise_base_id, muscle_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_base_equipment (
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        equipment_id INTEGER NOT NULL REFERENCES equipment(id) ON DELETE CASCADE,
        PRIMARY KEY (exercise_base_id, equipment_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercises (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        language_id INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        license_id INTEGER NOT NULL DEFAULT 1 REFERENCES licenses(id),
        license_author TEXT,
        creation_date TEXT NOT NULL,
        update_date TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        image TEXT NOT NULL,
        is_main INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT '1',
        license_id INTEGER NOT NULL DEFAULT 1 REFERENCES licenses(id),
        license_author TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        video TEXT NOT NULL,
        is_main INTEGER NOT NULL DEFAULT 0,
        size INTEGER NOT NULL DEFAULT 0,
        duration REAL NOT NULL DEFAULT 0,
        width INTEGER NOT NULL DEFAULT 0,
        height INTEGER NOT NULL DEFAULT 0,
        codec TEXT NOT NULL DEFAULT '',
        codec_long TEXT NOT NULL DEFAULT '',
        license_id INTEGER NOT NULL DEFAULT 1 REFERENCES licenses(id),
        license_author TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
        comment TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_aliases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
        alias TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS workout_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        workout_id INTEGER NOT NULL,
        exercise_base_id INTEGER NOT NULL REFERENCES exercise_bases(id) ON DELETE CASCADE,
        sets_order INTEGER NOT NULL DEFAULT 1,
        reps INTEGER NOT NULL,
        rir TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL DEFAULT '',
        token TEXT NOT NULL UNIQUE,
        permissions TEXT NOT NULL DEFAULT ''
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_actions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        actor TEXT NOT NULL,
        verb TEXT NOT NULL,
        target_type TEXT NOT NULL,
        target_id INTEGER NOT NULL,
        payload JSON NOT NULL,
        timestamp TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS exercise_history (
        history_id INTEGER PRIMARY KEY AUTOINCREMENT,
        id INTEGER NOT NULL,
        uuid TEXT NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        language_id INTEGER NOT NULL,
        exercise_base_id INTEGER NOT NULL,
        license_id INTEGER NOT NULL,
        license_author TEXT,
        history_date TEXT NOT NULL,
        history_type TEXT NOT NULL,
        history_user TEXT
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_exercises_base ON exercises(exercise_base_id)",
    "CREATE INDEX IF NOT EXISTS idx_exercises_language ON exercises(language_id)",
    "CREATE INDEX IF NOT EXISTS idx_aliases_exercise ON exercise_aliases(exercise_id)",
    "CREATE INDEX IF NOT EXISTS idx_images_base ON exercise_images(exercise_base_id)",
    "CREATE INDEX IF NOT EXISTS idx_settings_base ON workout_settings(exercise_base_id)",
    "CREATE INDEX IF NOT EXISTS idx_history_exercise ON exercise_history(id, history_date)",
];

/// Create all tables and indexes
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("📋 Schema initialised ({} tables)", TABLES.len());
    Ok(())
}

/// Insert the rows other tables default to
pub async fn seed_defaults(pool: &SqlitePool, default_language: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO licenses (id, full_name, short_name, url)
        VALUES (1, 'Creative Commons Attribution Share Alike 4', 'CC-BY-SA 4',
                'https://creativecommons.org/licenses/by-sa/4.0/deed.en')
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO languages (short_name, full_name) VALUES (?, ?)")
        .bind(default_language)
        .bind(default_language)
        .execute(pool)
        .await?;

    Ok(())
}
