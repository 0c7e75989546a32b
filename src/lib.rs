//! OpenCourse catalog core
//!
//! Category taxonomy and course aggregates persisted in SQLite. Reactions,
//! comments, tags and sub-categories live inside their parent row and are
//! edited in place.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;

pub use config::{Config, StoreConfig};
pub use db::{
    init_database, CategoryStore, CommentThread, CourseActionLedger, CourseStore, Repository,
};
pub use errors::AppError;
