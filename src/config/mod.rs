//! Configuration module for the course core.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;

use crate::errors::AppError;

/// Table names used by the stores. Injected at construction so no store
/// depends on a global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    categories: String,
    courses: String,
}

impl StoreConfig {
    pub fn new(categories: impl Into<String>, courses: impl Into<String>) -> Result<Self, AppError> {
        let categories = categories.into();
        let courses = courses.into();
        check_identifier("categories_table", &categories)?;
        check_identifier("courses_table", &courses)?;
        if categories == courses {
            return Err(AppError::validation(
                "store_config",
                "courses_table",
                "categories and courses must live in different tables",
            ));
        }
        Ok(Self {
            categories,
            courses,
        })
    }

    pub fn categories_table(&self) -> &str {
        &self.categories
    }

    pub fn courses_table(&self) -> &str {
        &self.courses
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            categories: "categories".to_string(),
            courses: "courses".to_string(),
        }
    }
}

// Table names are spliced into SQL text, so only plain identifiers pass.
fn check_identifier(field: &'static str, name: &str) -> Result<(), AppError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::validation(
            "store_config",
            field,
            format!("`{}` is not a valid table name", name),
        ))
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Table names for categories and courses
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let db_path = env::var("OPENCOURSE_DB_PATH")
            .unwrap_or_else(|_| "./data/opencourse.sqlite".to_string())
            .into();

        let log_level = env::var("OPENCOURSE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let store = StoreConfig::new(
            env::var("OPENCOURSE_CATEGORIES_TABLE").unwrap_or_else(|_| "categories".to_string()),
            env::var("OPENCOURSE_COURSES_TABLE").unwrap_or_else(|_| "courses".to_string()),
        )?;

        Ok(Self {
            db_path,
            log_level,
            store,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("OPENCOURSE_DB_PATH");
        env::remove_var("OPENCOURSE_LOG_LEVEL");
        env::remove_var("OPENCOURSE_CATEGORIES_TABLE");
        env::remove_var("OPENCOURSE_COURSES_TABLE");

        let config = Config::from_env().unwrap();

        assert_eq!(config.db_path, PathBuf::from("./data/opencourse.sqlite"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_rejects_unsafe_table_names() {
        assert!(StoreConfig::new("categories; DROP", "courses").is_err());
        assert!(StoreConfig::new("", "courses").is_err());
        assert!(StoreConfig::new("1cats", "courses").is_err());
        assert!(StoreConfig::new("same", "same").is_err());

        let config = StoreConfig::new("test_categories", "test_courses").unwrap();
        assert_eq!(config.categories_table(), "test_categories");
        assert_eq!(config.courses_table(), "test_courses");
    }
}
