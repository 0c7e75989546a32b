//! Comments embedded in a course.
//!
//! The array is flat. Replies point at their parent through `parent_id`, and
//! removing a comment takes its direct replies with it.

use super::arrays::{contains, retained, Elements};
use super::rows::{encode, StoredComment};
use super::{new_id, now_stamp, parse_id, CourseStore};
use crate::errors::{persistence, AppError};

const MAX_COMMENT_LEN: usize = 5000;

/// Comment operations over the `comments` array of a course.
pub struct CommentThread<'a> {
    store: &'a CourseStore,
}

impl<'a> CommentThread<'a> {
    pub(crate) fn new(store: &'a CourseStore) -> Self {
        Self { store }
    }

    /// Post a top-level comment and return its ID.
    pub async fn add_course_comment(
        &self,
        course_id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<String, AppError> {
        const OP: &str = "add_course_comment";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let comment = new_comment(OP, user_id, text, None)?;

        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET comments = json_insert(comments, '$[#]', json(?1)), date_update = ?2 \
             WHERE id = ?3"
        ))
        .bind(encode(OP, "comment", &comment)?)
        .bind(&now)
        .bind(&course_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(OP, "course", course_id));
        }

        tracing::debug!(course_id = %course_id, comment_id = %comment.id, "Comment added");
        Ok(comment.id)
    }

    /// Reply to `parent_id` and return the reply's ID.
    ///
    /// The parent must already be a comment of the same course.
    pub async fn reply_course_comment(
        &self,
        course_id: &str,
        user_id: &str,
        parent_id: &str,
        text: &str,
    ) -> Result<String, AppError> {
        const OP: &str = "reply_course_comment";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let parent_id = parse_id(OP, "parent_id", parent_id)?;
        let comment = new_comment(OP, user_id, text, Some(parent_id.clone()))?;

        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET comments = json_insert(comments, '$[#]', json(?1)), date_update = ?2 \
             WHERE id = ?3 AND {parent}",
            parent = contains(table, "comments", "json_extract(elem.value, '$.id') = ?4"),
        ))
        .bind(encode(OP, "comment", &comment)?)
        .bind(&now)
        .bind(&course_id)
        .bind(&parent_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            self.store.ensure_exists(OP, &course_id).await?;
            return Err(AppError::not_found(OP, "comment", parent_id));
        }

        tracing::debug!(course_id = %course_id, comment_id = %comment.id, parent_id = %parent_id, "Reply added");
        Ok(comment.id)
    }

    /// Remove `comment_id` together with its direct replies.
    ///
    /// Returns `false` when the course holds no such comment.
    pub async fn remove_course_comment(
        &self,
        course_id: &str,
        comment_id: &str,
    ) -> Result<bool, AppError> {
        const OP: &str = "remove_course_comment";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let comment_id = parse_id(OP, "comment_id", comment_id)?;

        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET comments = {kept}, date_update = ?2 \
             WHERE id = ?3 AND {present}",
            kept = retained(
                table,
                "comments",
                "json_extract(elem.value, '$.id') != ?1 \
                 AND coalesce(json_extract(elem.value, '$.parent_id'), '') != ?1",
                Elements::Objects,
            ),
            present = contains(table, "comments", "json_extract(elem.value, '$.id') = ?1"),
        ))
        .bind(&comment_id)
        .bind(&now)
        .bind(&course_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            self.store.ensure_exists(OP, &course_id).await?;
            return Ok(false);
        }

        tracing::debug!(course_id = %course_id, comment_id = %comment_id, "Comment removed");
        Ok(true)
    }
}

fn new_comment(
    op: &'static str,
    user_id: &str,
    text: &str,
    parent_id: Option<String>,
) -> Result<StoredComment, AppError> {
    let user_id = parse_id(op, "user_id", user_id)?;
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::validation(op, "text", "comment text is required"));
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(AppError::validation(
            op,
            "text",
            format!("comment text exceeds {} characters", MAX_COMMENT_LEN),
        ));
    }

    Ok(StoredComment {
        id: new_id(),
        user_id,
        text: text.to_string(),
        parent_id,
        actions: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comment_is_rejected() {
        let user = new_id();
        let err = new_comment("add_course_comment", &user, "   ", None).unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::VALIDATION_ERROR);

        let long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(new_comment("add_course_comment", &user, &long, None).is_err());
    }

    #[test]
    fn comment_text_is_trimmed() {
        let comment = new_comment("add_course_comment", &new_id(), "  Nice course ", None).unwrap();
        assert_eq!(comment.text, "Nice course");
        assert!(comment.parent_id.is_none());
    }
}
