//! Course aggregate store.
//!
//! A course row embeds its authors, tags, reactions and comments. Every
//! mutation below is one `UPDATE` that also refreshes `date_update`, so a
//! zero row count means the course does not exist.

use std::sync::Arc;

use sqlx::SqlitePool;

use super::arrays::{extended, retained, Elements};
use super::rows::{course_from_row, encode};
use super::{new_id, now_stamp, parse_id, parse_ids, CommentThread, CourseActionLedger};
use crate::config::StoreConfig;
use crate::errors::{persistence, AppError};
use crate::models::{langs_of, AddCourseQuery, Course, LocalizedText};

const COURSE_COLUMNS: &str = "id, author_ids, names, langs, category_id, sub_category_number, tags, \
     header_img, description, rating, date_create, date_update, actions, comments";

/// Store for course aggregates.
#[derive(Clone)]
pub struct CourseStore {
    pool: SqlitePool,
    config: Arc<StoreConfig>,
}

impl CourseStore {
    pub(crate) fn new(pool: SqlitePool, config: Arc<StoreConfig>) -> Self {
        Self { pool, config }
    }

    pub(crate) fn table(&self) -> &str {
        self.config.courses_table()
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Reactions embedded in courses of this store.
    pub fn actions(&self) -> CourseActionLedger<'_> {
        CourseActionLedger::new(self)
    }

    /// Comments embedded in courses of this store.
    pub fn comments(&self) -> CommentThread<'_> {
        CommentThread::new(self)
    }

    /// Create a course authored by `author_id` and return its ID.
    pub async fn add_course(
        &self,
        author_id: &str,
        query: &AddCourseQuery,
    ) -> Result<String, AppError> {
        const OP: &str = "add_course";
        if query.names.is_empty() {
            return Err(AppError::validation(OP, "names", "at least one name is required"));
        }
        if query.names.iter().any(|n| n.text.trim().is_empty() || n.lang.trim().is_empty()) {
            return Err(AppError::validation(OP, "names", "names need both lang and text"));
        }
        let author_id = parse_id(OP, "author_id", author_id)?;
        let category_id = parse_id(OP, "category_id", &query.category_id)?;

        let langs = if query.langs.is_empty() {
            langs_of(&query.names)
        } else {
            query.langs.clone()
        };

        let id = new_id();
        let (_, now) = now_stamp();

        sqlx::query(&format!(
            r#"INSERT INTO {table} (
                id, author_ids, names, langs, category_id, sub_category_number, tags,
                header_img, description, rating, date_create, date_update, actions, comments
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, '[]', '[]')"#,
            table = self.table()
        ))
        .bind(&id)
        .bind(encode(OP, "course", &[&author_id])?)
        .bind(encode(OP, "course", &query.names)?)
        .bind(encode(OP, "course", &langs)?)
        .bind(&category_id)
        .bind(query.sub_category_number)
        .bind(encode(OP, "tag", &query.tags)?)
        .bind(&query.header_img)
        .bind(&query.description)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(persistence(OP))?;

        tracing::info!(course_id = %id, author_id = %author_id, category_id = %category_id, "Course created");
        Ok(id)
    }

    /// Get a course by ID.
    pub async fn get_course(&self, id: &str) -> Result<Course, AppError> {
        const OP: &str = "get_course";
        let id = parse_id(OP, "course_id", id)?;

        let row = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM {table} WHERE id = ?",
            table = self.table()
        ))
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence(OP))?;

        match row {
            Some(row) => course_from_row(OP, &row),
            None => Err(AppError::not_found(OP, "course", id)),
        }
    }

    /// Page through courses, most popular first and freshest among equals.
    pub async fn get_courses(&self, take: u32, skip: u32) -> Result<Vec<Course>, AppError> {
        const OP: &str = "get_courses";

        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM {table} ORDER BY rating DESC, date_update DESC LIMIT ? OFFSET ?",
            table = self.table()
        ))
        .bind(i64::from(take))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence(OP))?;

        rows.iter().map(|row| course_from_row(OP, row)).collect()
    }

    /// Same ranking as [`CourseStore::get_courses`], limited to one category.
    pub async fn get_category_courses(
        &self,
        category_id: &str,
        take: u32,
        skip: u32,
    ) -> Result<Vec<Course>, AppError> {
        const OP: &str = "get_category_courses";
        let category_id = parse_id(OP, "category_id", category_id)?;

        let rows = sqlx::query(&format!(
            "SELECT {COURSE_COLUMNS} FROM {table} WHERE category_id = ? ORDER BY rating DESC, date_update DESC LIMIT ? OFFSET ?",
            table = self.table()
        ))
        .bind(&category_id)
        .bind(i64::from(take))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence(OP))?;

        rows.iter().map(|row| course_from_row(OP, row)).collect()
    }

    /// Append authors. Duplicates are kept.
    pub async fn add_course_authors(&self, id: &str, author_ids: &[String]) -> Result<(), AppError> {
        const OP: &str = "add_course_authors";
        let id = parse_id(OP, "course_id", id)?;
        let author_ids = parse_ids(OP, "author_id", author_ids)?;
        if author_ids.is_empty() {
            return self.ensure_exists(OP, &id).await;
        }

        let added = encode(OP, "course", &author_ids)?;

        let table = self.table();
        let sql = format!(
            "UPDATE {table} SET author_ids = {authors}, date_update = ?2 WHERE id = ?3",
            authors = extended(table, "author_ids", "?1", Elements::Strings),
        );
        let query = sqlx::query(&sql).bind(added);
        self.finish(OP, &id, query).await
    }

    /// Remove every author entry equal to one of `author_ids`.
    pub async fn remove_course_authors(
        &self,
        id: &str,
        author_ids: &[String],
    ) -> Result<(), AppError> {
        const OP: &str = "remove_course_authors";
        let id = parse_id(OP, "course_id", id)?;
        let author_ids = parse_ids(OP, "author_id", author_ids)?;
        let removed = encode(OP, "course", &author_ids)?;

        let table = self.table();
        let sql = format!(
            "UPDATE {table} SET author_ids = {authors}, date_update = ?2 WHERE id = ?3",
            authors = retained(
                table,
                "author_ids",
                "elem.value NOT IN (SELECT value FROM json_each(?1))",
                Elements::Strings,
            ),
        );
        let query = sqlx::query(&sql).bind(removed);
        self.finish(OP, &id, query).await
    }

    /// Append tags. Duplicates are kept.
    pub async fn add_course_tags(&self, id: &str, tags: &[LocalizedText]) -> Result<(), AppError> {
        const OP: &str = "add_course_tags";
        let id = parse_id(OP, "course_id", id)?;
        if tags.is_empty() {
            return self.ensure_exists(OP, &id).await;
        }

        let added = encode(OP, "tag", tags)?;

        let table = self.table();
        let sql = format!(
            "UPDATE {table} SET tags = {tags}, date_update = ?2 WHERE id = ?3",
            tags = extended(table, "tags", "?1", Elements::Objects),
        );
        let query = sqlx::query(&sql).bind(added);
        self.finish(OP, &id, query).await
    }

    /// Remove every tag equal on (lang, text) to one of `tags`.
    pub async fn remove_course_tags(&self, id: &str, tags: &[LocalizedText]) -> Result<(), AppError> {
        const OP: &str = "remove_course_tags";
        let id = parse_id(OP, "course_id", id)?;
        let removed = encode(OP, "tag", tags)?;

        let table = self.table();
        let sql = format!(
            "UPDATE {table} SET tags = {tags}, date_update = ?2 WHERE id = ?3",
            tags = retained(
                table,
                "tags",
                "NOT EXISTS (
                    SELECT 1 FROM json_each(?1) AS gone
                    WHERE json_extract(gone.value, '$.lang') = json_extract(elem.value, '$.lang')
                      AND json_extract(gone.value, '$.text') = json_extract(elem.value, '$.text')
                )",
                Elements::Objects,
            ),
        );
        let query = sqlx::query(&sql).bind(removed);
        self.finish(OP, &id, query).await
    }

    /// Delete every course. Administrative reset only.
    pub async fn clear_courses(&self) -> Result<u64, AppError> {
        const OP: &str = "clear_courses";
        let result = sqlx::query(&format!("DELETE FROM {table}", table = self.table()))
            .execute(&self.pool)
            .await
            .map_err(persistence(OP))?;

        tracing::warn!(removed = result.rows_affected(), "All courses cleared");
        Ok(result.rows_affected())
    }

    /// Bind the trailing `date_update` and `id`, run, and map a miss to
    /// `NotFound`.
    async fn finish<'q>(
        &self,
        op: &'static str,
        id: &'q str,
        query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> Result<(), AppError> {
        let (_, now) = now_stamp();
        let result = query
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence(op))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(op, "course", id));
        }

        tracing::debug!(operation = op, course_id = %id, "Course updated");
        Ok(())
    }

    pub(crate) async fn exists(&self, op: &'static str, id: &str) -> Result<bool, AppError> {
        let row = sqlx::query(&format!("SELECT 1 FROM {table} WHERE id = ?", table = self.table()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence(op))?;
        Ok(row.is_some())
    }

    pub(crate) async fn ensure_exists(&self, op: &'static str, id: &str) -> Result<(), AppError> {
        if self.exists(op, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found(op, "course", id))
        }
    }
}
