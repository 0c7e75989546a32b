//! Category taxonomy store.
//!
//! Sub-category add/delete rewrite the whole embedded array, so both are
//! guarded by the row's `version`: a write only lands if nobody else bumped
//! the version since it was read. Losers get [`AppError::Conflict`].

use std::sync::Arc;

use sqlx::{Row, SqlitePool};

use super::arrays::{contains, element_path};
use super::rows::{category_from_row, encode, StoredSubCategory};
use super::{new_id, parse_id};
use crate::config::StoreConfig;
use crate::errors::{persistence, AppError};
use crate::models::{AddCategoryQuery, Category, LocalizedText, NewSubCategory, SubCategory};

const CATEGORY_COLUMNS: &str = "id, langs, names, logo_img, sub_categories, version";

/// Store for categories and their embedded sub-categories.
#[derive(Clone)]
pub struct CategoryStore {
    pool: SqlitePool,
    config: Arc<StoreConfig>,
}

impl CategoryStore {
    pub(crate) fn new(pool: SqlitePool, config: Arc<StoreConfig>) -> Self {
        Self { pool, config }
    }

    fn table(&self) -> &str {
        self.config.categories_table()
    }

    /// List categories supporting at least one of `langs`, oldest first.
    pub async fn get_categories(&self, langs: &[String]) -> Result<Vec<Category>, AppError> {
        const OP: &str = "get_categories";
        let langs_json = encode(OP, "category", langs)?;

        let rows = sqlx::query(&format!(
            r#"SELECT {CATEGORY_COLUMNS} FROM {table} c
               WHERE EXISTS (
                   SELECT 1 FROM json_each(c.langs) l JOIN json_each(?) q ON l.value = q.value
               )
               ORDER BY c.rowid"#,
            table = self.table()
        ))
        .bind(&langs_json)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence(OP))?;

        rows.iter().map(|row| category_from_row(OP, row)).collect()
    }

    /// Get a category by ID.
    pub async fn get_category(&self, id: &str) -> Result<Category, AppError> {
        const OP: &str = "get_category";
        let id = parse_id(OP, "category_id", id)?;
        self.load(OP, &id).await
    }

    async fn load(&self, op: &'static str, id: &str) -> Result<Category, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM {table} WHERE id = ?",
            table = self.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence(op))?;

        match row {
            Some(row) => category_from_row(op, &row),
            None => Err(AppError::not_found(op, "category", id)),
        }
    }

    /// Create a new category and return its ID.
    pub async fn add_category(&self, query: &AddCategoryQuery) -> Result<String, AppError> {
        const OP: &str = "add_category";
        let (name, lang) = validate_name_lang(OP, &query.name, &query.lang)?;

        let sub_categories = initial_sub_categories(OP, &query.sub_categories)?;

        let id = new_id();
        let names = encode(OP, "category", &[LocalizedText::new(lang, name)])?;
        let langs = encode(OP, "category", &[lang])?;
        let stored: Vec<StoredSubCategory> =
            sub_categories.iter().map(StoredSubCategory::from).collect();
        let sub_categories_json = encode(OP, "sub_category", &stored)?;

        sqlx::query(&format!(
            "INSERT INTO {table} (id, langs, names, logo_img, sub_categories, version) VALUES (?, ?, ?, ?, ?, 1)",
            table = self.table()
        ))
        .bind(&id)
        .bind(&langs)
        .bind(&names)
        .bind(&query.logo_img)
        .bind(&sub_categories_json)
        .execute(&self.pool)
        .await
        .map_err(persistence(OP))?;

        tracing::info!(category_id = %id, lang, sub_categories = sub_categories.len(), "Category created");
        Ok(id)
    }

    /// Replace the category's name and language.
    pub async fn update_category(&self, id: &str, name: &str, lang: &str) -> Result<(), AppError> {
        const OP: &str = "update_category";
        let id = parse_id(OP, "category_id", id)?;
        let (name, lang) = validate_name_lang(OP, name, lang)?;

        let names = encode(OP, "category", &[LocalizedText::new(lang, name)])?;
        let langs = encode(OP, "category", &[lang])?;

        let result = sqlx::query(&format!(
            "UPDATE {table} SET names = ?, langs = ?, version = version + 1 WHERE id = ?",
            table = self.table()
        ))
        .bind(&names)
        .bind(&langs)
        .bind(&id)
        .execute(&self.pool)
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(OP, "category", id));
        }

        Ok(())
    }

    /// Append a sub-category and return the number it was given.
    pub async fn add_sub_category(
        &self,
        category_id: &str,
        name: &str,
        lang: &str,
    ) -> Result<i32, AppError> {
        const OP: &str = "add_sub_category";
        let id = parse_id(OP, "category_id", category_id)?;
        let name = name.trim();
        let lang = lang.trim();
        if name.is_empty() {
            return Err(AppError::validation(OP, "name", "sub-category name is required"));
        }
        if lang.is_empty() {
            return Err(AppError::validation(OP, "lang", "language is required"));
        }

        let category = self.load(OP, &id).await?;
        let number = next_number(&category.sub_categories);

        let mut sub_categories = category.sub_categories;
        sub_categories.push(SubCategory {
            number,
            names: vec![LocalizedText::new(lang, name)],
        });

        self.write_sub_categories(OP, &id, category.version, &sub_categories)
            .await?;

        tracing::debug!(category_id = %id, number, "Sub-category added");
        Ok(number)
    }

    /// Remove sub-category `number` and renumber the rest from zero.
    ///
    /// Returns the surviving sub-categories. Removing a number that does not
    /// exist leaves the category untouched.
    pub async fn delete_sub_category(
        &self,
        category_id: &str,
        number: i32,
    ) -> Result<Vec<SubCategory>, AppError> {
        const OP: &str = "delete_sub_category";
        let id = parse_id(OP, "category_id", category_id)?;

        let category = self.load(OP, &id).await?;
        let Some(sub_categories) = renumber_without(&category.sub_categories, number) else {
            return Ok(category.sub_categories);
        };

        self.write_sub_categories(OP, &id, category.version, &sub_categories)
            .await?;

        tracing::debug!(category_id = %id, number, remaining = sub_categories.len(), "Sub-category deleted");
        Ok(sub_categories)
    }

    /// Replace the names of sub-category `number` in place.
    pub async fn update_sub_category(
        &self,
        category_id: &str,
        number: i32,
        names: &[LocalizedText],
    ) -> Result<(), AppError> {
        const OP: &str = "update_sub_category";
        let id = parse_id(OP, "category_id", category_id)?;
        if names.is_empty() {
            return Err(AppError::validation(OP, "names", "at least one name is required"));
        }
        let names_json = encode(OP, "sub_category", names)?;

        let table = self.table();
        let matches = "json_extract(elem.value, '$.number') = ?1";
        // Legacy elements carry `name`; drop it so only `names` remains.
        let result = sqlx::query(&format!(
            r#"UPDATE {table}
               SET sub_categories = json_remove(
                       json_set(sub_categories, {names_path}, json(?2)),
                       {name_path}
                   ),
                   version = version + 1
               WHERE id = ?3 AND {exists}"#,
            names_path = element_path(table, "sub_categories", matches, "names"),
            name_path = element_path(table, "sub_categories", matches, "name"),
            exists = contains(table, "sub_categories", matches),
        ))
        .bind(number)
        .bind(&names_json)
        .bind(&id)
        .execute(&self.pool)
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            return match self.current_version(OP, &id).await? {
                None => Err(AppError::not_found(OP, "category", id)),
                Some(_) => Err(AppError::not_found(
                    OP,
                    "sub_category",
                    format!("{}/{}", id, number),
                )),
            };
        }

        Ok(())
    }

    /// Delete every category. Administrative reset only.
    pub async fn clear_categories(&self) -> Result<u64, AppError> {
        const OP: &str = "clear_categories";
        let result = sqlx::query(&format!("DELETE FROM {table}", table = self.table()))
            .execute(&self.pool)
            .await
            .map_err(persistence(OP))?;

        tracing::warn!(removed = result.rows_affected(), "All categories cleared");
        Ok(result.rows_affected())
    }

    async fn write_sub_categories(
        &self,
        op: &'static str,
        id: &str,
        expected_version: i64,
        sub_categories: &[SubCategory],
    ) -> Result<(), AppError> {
        let stored: Vec<StoredSubCategory> =
            sub_categories.iter().map(StoredSubCategory::from).collect();
        let json = encode(op, "sub_category", &stored)?;

        let result = sqlx::query(&format!(
            "UPDATE {table} SET sub_categories = ?, version = version + 1 WHERE id = ? AND version = ?",
            table = self.table()
        ))
        .bind(&json)
        .bind(id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(persistence(op))?;

        if result.rows_affected() == 0 {
            let current = self.current_version(op, id).await?;
            tracing::warn!(operation = op, category_id = %id, expected_version, ?current, "Concurrent modification detected");
            return match current {
                Some(current_version) => Err(AppError::Conflict {
                    op,
                    id: id.to_string(),
                    current_version,
                }),
                None => Err(AppError::not_found(op, "category", id)),
            };
        }

        Ok(())
    }

    async fn current_version(&self, op: &'static str, id: &str) -> Result<Option<i64>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT version FROM {table} WHERE id = ?",
            table = self.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence(op))?;

        row.map(|r| r.try_get("version").map_err(persistence(op)))
            .transpose()
    }
}

fn validate_name_lang<'a>(
    op: &'static str,
    name: &'a str,
    lang: &'a str,
) -> Result<(&'a str, &'a str), AppError> {
    let name = name.trim();
    let lang = lang.trim();
    if name.chars().count() < 2 {
        return Err(AppError::validation(
            op,
            "name",
            "category name must be at least 2 characters",
        ));
    }
    if lang.is_empty() {
        return Err(AppError::validation(op, "lang", "language is required"));
    }
    Ok((name, lang))
}

/// Number the seeded sub-categories 0..n-1 in the order given.
fn initial_sub_categories(
    op: &'static str,
    seeds: &[NewSubCategory],
) -> Result<Vec<SubCategory>, AppError> {
    seeds
        .iter()
        .enumerate()
        .map(|(i, seed)| {
            let complete = !seed.names.is_empty()
                && seed
                    .names
                    .iter()
                    .all(|n| !n.lang.trim().is_empty() && !n.text.trim().is_empty());
            if !complete {
                return Err(AppError::validation(
                    op,
                    "sub_categories",
                    format!("sub-category {} needs names with both lang and text", i),
                ));
            }
            Ok(SubCategory {
                number: i as i32,
                names: seed.names.clone(),
            })
        })
        .collect()
}

/// Number the next appended sub-category receives.
fn next_number(sub_categories: &[SubCategory]) -> i32 {
    sub_categories.last().map(|s| s.number + 1).unwrap_or(0)
}

/// Drop `number` and renumber the rest 0..n-1 in their current order.
/// `None` when no sub-category carries `number`.
fn renumber_without(sub_categories: &[SubCategory], number: i32) -> Option<Vec<SubCategory>> {
    if !sub_categories.iter().any(|s| s.number == number) {
        return None;
    }

    Some(
        sub_categories
            .iter()
            .filter(|s| s.number != number)
            .enumerate()
            .map(|(i, s)| SubCategory {
                number: i as i32,
                names: s.names.clone(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(names: &[&str]) -> Vec<SubCategory> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| SubCategory {
                number: i as i32,
                names: vec![LocalizedText::new("en", *n)],
            })
            .collect()
    }

    #[test]
    fn next_number_follows_last() {
        assert_eq!(next_number(&[]), 0);
        assert_eq!(next_number(&subs(&["Go", "Rust"])), 2);
    }

    #[test]
    fn renumber_keeps_relative_order() {
        let result = renumber_without(&subs(&["Go", "Rust", "Zig", "C"]), 1).unwrap();
        let numbers: Vec<i32> = result.iter().map(|s| s.number).collect();
        let names: Vec<&str> = result.iter().map(|s| s.names[0].text.as_str()).collect();
        assert_eq!(numbers, vec![0, 1, 2]);
        assert_eq!(names, vec!["Go", "Zig", "C"]);
    }

    #[test]
    fn seeded_sub_categories_are_numbered_in_order() {
        let seeds = vec![
            NewSubCategory {
                names: vec![LocalizedText::new("en", "Go")],
            },
            NewSubCategory {
                names: vec![LocalizedText::new("en", "Rust")],
            },
        ];
        assert_eq!(initial_sub_categories("add_category", &seeds).unwrap(), subs(&["Go", "Rust"]));

        let blank = vec![NewSubCategory { names: Vec::new() }];
        let err = initial_sub_categories("add_category", &blank).unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::VALIDATION_ERROR);
    }

    #[test]
    fn renumber_missing_number_is_none() {
        assert!(renumber_without(&subs(&["Go"]), 5).is_none());
    }

    #[tokio::test]
    async fn stale_version_write_is_a_conflict() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::default();
        let pool = super::super::init_database(&temp_dir.path().join("test.sqlite"), &config)
            .await
            .unwrap();
        let store = CategoryStore::new(pool, Arc::new(config));

        let id = store
            .add_category(&AddCategoryQuery::new("Programming", "en"))
            .await
            .unwrap();
        let stale = store.get_category(&id).await.unwrap();
        store.add_sub_category(&id, "Go", "en").await.unwrap();

        let err = store
            .write_sub_categories("add_sub_category", &id, stale.version, &subs(&["Rust"]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { current_version: 2, .. }));

        let category = store.get_category(&id).await.unwrap();
        assert_eq!(category.sub_categories, subs(&["Go"]));
    }

    #[test]
    fn short_category_name_is_rejected() {
        assert!(validate_name_lang("add_category", " P ", "en").is_err());
        assert!(validate_name_lang("add_category", "Programming", "  ").is_err());
        assert_eq!(
            validate_name_lang("add_category", " Go ", " en ").unwrap(),
            ("Go", "en")
        );
    }
}
