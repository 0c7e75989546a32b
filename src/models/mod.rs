//! Domain models for the course catalog.
//!
//! These are the shapes handed to callers. Stored JSON layouts live in
//! `db::rows` and are converted at the persistence boundary.

mod category;
mod course;
mod localized;
mod role;

pub use category::*;
pub use course::*;
pub use localized::*;
pub use role::*;
