//! Database module for SQLite persistence.
//!
//! Each aggregate is one row. Embedded arrays (sub-categories, actions,
//! comments, tags, authors) are JSON columns mutated in place with single
//! `UPDATE` statements.

mod actions;
mod arrays;
mod categories;
mod comments;
mod courses;
mod rows;

pub use actions::CourseActionLedger;
pub use categories::CategoryStore;
pub use comments::CommentThread;
pub use courses::CourseStore;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::errors::{persistence, AppError};

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path, store: &StoreConfig) -> Result<SqlitePool, AppError> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(persistence("init_database"))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(persistence("init_database"))?;

    run_migrations(&pool, store).await?;

    Ok(pool)
}

/// Create the category and course tables if they don't exist.
pub async fn run_migrations(pool: &SqlitePool, store: &StoreConfig) -> Result<(), AppError> {
    let categories = store.categories_table();
    let courses = store.courses_table();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {categories} (
            id TEXT PRIMARY KEY,
            langs TEXT NOT NULL DEFAULT '[]',
            names TEXT NOT NULL,
            logo_img TEXT,
            sub_categories TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 1
        );
        "#
    ))
    .execute(pool)
    .await
    .map_err(persistence("run_migrations"))?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {courses} (
            id TEXT PRIMARY KEY,
            author_ids TEXT NOT NULL DEFAULT '[]',
            names TEXT NOT NULL,
            langs TEXT NOT NULL DEFAULT '[]',
            category_id TEXT NOT NULL,
            sub_category_number INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '[]',
            header_img TEXT,
            description TEXT,
            rating INTEGER NOT NULL DEFAULT 0,
            date_create TEXT NOT NULL,
            date_update TEXT NOT NULL,
            actions TEXT NOT NULL DEFAULT '[]',
            comments TEXT NOT NULL DEFAULT '[]'
        );
        "#
    ))
    .execute(pool)
    .await
    .map_err(persistence("run_migrations"))?;

    // Create indexes for common queries
    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{courses}_ranking ON {courses}(rating DESC, date_update DESC);
        CREATE INDEX IF NOT EXISTS idx_{courses}_category ON {courses}(category_id);
        "#
    ))
    .execute(pool)
    .await
    .map_err(persistence("run_migrations"))?;

    Ok(())
}

/// Entry point handing out the category and course stores over one pool.
#[derive(Clone)]
pub struct Repository {
    categories: CategoryStore,
    courses: CourseStore,
}

impl Repository {
    pub fn new(pool: SqlitePool, config: StoreConfig) -> Self {
        let config = Arc::new(config);
        Self {
            categories: CategoryStore::new(pool.clone(), config.clone()),
            courses: CourseStore::new(pool, config),
        }
    }

    pub fn categories(&self) -> &CategoryStore {
        &self.categories
    }

    pub fn courses(&self) -> &CourseStore {
        &self.courses
    }
}

/// New identifier in its external hex form.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Parse a caller-supplied identifier and return it in canonical hex form.
pub(crate) fn parse_id(op: &'static str, field: &'static str, raw: &str) -> Result<String, AppError> {
    Uuid::parse_str(raw.trim())
        .map(|id| id.simple().to_string())
        .map_err(|_| AppError::InvalidIdentifier {
            op,
            field,
            id: raw.to_string(),
        })
}

pub(crate) fn parse_ids(
    op: &'static str,
    field: &'static str,
    raw: &[String],
) -> Result<Vec<String>, AppError> {
    raw.iter().map(|id| parse_id(op, field, id)).collect()
}

/// Current time truncated to the stored precision, plus its stored form.
///
/// Stored stamps are fixed-width so that text order matches time order.
pub(crate) fn now_stamp() -> (DateTime<Utc>, String) {
    let now = Utc::now().trunc_subsecs(6);
    (now, now.to_rfc3339_opts(SecondsFormat::Micros, true))
}
