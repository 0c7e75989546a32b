//! Per-user reactions embedded in a course.
//!
//! A user is in one of three states per course: no reaction, liked, or
//! disliked. Adding only moves out of "no reaction", changing only moves
//! between like and dislike, and removing goes back to "no reaction".

use super::arrays::{contains, element_path, retained, Elements};
use super::rows::{encode, StoredAction};
use super::{now_stamp, parse_id, CourseStore};
use crate::errors::{persistence, AppError};
use crate::models::{Action, ActionType};

const USER_MATCHES: &str = "json_extract(elem.value, '$.user_id') = ?4";

/// Reaction operations over the `actions` array of a course.
pub struct CourseActionLedger<'a> {
    store: &'a CourseStore,
}

impl<'a> CourseActionLedger<'a> {
    pub(crate) fn new(store: &'a CourseStore) -> Self {
        Self { store }
    }

    /// Record `user_id`'s reaction unless they already have one.
    ///
    /// Returns `false` when an entry for the user already existed; the stored
    /// reaction is left as it was in that case.
    pub async fn add_course_action(
        &self,
        course_id: &str,
        user_id: &str,
        action_type: ActionType,
    ) -> Result<bool, AppError> {
        const OP: &str = "add_course_action";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let user_id = parse_id(OP, "user_id", user_id)?;

        let action = StoredAction::from(&Action {
            user_id: user_id.clone(),
            action_type,
        });
        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET actions = json_insert(actions, '$[#]', json(?1)), date_update = ?2 \
             WHERE id = ?3 AND NOT {taken}",
            taken = contains(table, "actions", USER_MATCHES),
        ))
        .bind(encode(OP, "action", &action)?)
        .bind(&now)
        .bind(&course_id)
        .bind(&user_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            self.store.ensure_exists(OP, &course_id).await?;
            tracing::debug!(course_id = %course_id, user_id = %user_id, "Reaction already recorded");
            return Ok(false);
        }

        tracing::debug!(course_id = %course_id, user_id = %user_id, action = action_type.as_str(), "Reaction recorded");
        Ok(true)
    }

    /// Switch an existing reaction to `action_type` in place.
    pub async fn change_course_action(
        &self,
        course_id: &str,
        user_id: &str,
        action_type: ActionType,
    ) -> Result<(), AppError> {
        const OP: &str = "change_course_action";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let user_id = parse_id(OP, "user_id", user_id)?;

        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET actions = json_set(actions, {path}, ?1), date_update = ?2 \
             WHERE id = ?3 AND {present}",
            path = element_path(table, "actions", USER_MATCHES, "action_type"),
            present = contains(table, "actions", USER_MATCHES),
        ))
        .bind(action_type.as_str())
        .bind(&now)
        .bind(&course_id)
        .bind(&user_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            self.store.ensure_exists(OP, &course_id).await?;
            return Err(AppError::not_found(
                OP,
                "action",
                format!("{}/{}", course_id, user_id),
            ));
        }

        Ok(())
    }

    /// Drop `user_id`'s reaction. Returns `false` if there was none.
    pub async fn remove_course_action(&self, course_id: &str, user_id: &str) -> Result<bool, AppError> {
        const OP: &str = "remove_course_action";
        let course_id = parse_id(OP, "course_id", course_id)?;
        let user_id = parse_id(OP, "user_id", user_id)?;

        let table = self.store.table();
        let (_, now) = now_stamp();

        let result = sqlx::query(&format!(
            "UPDATE {table} SET actions = {kept}, date_update = ?2 \
             WHERE id = ?3 AND {present}",
            kept = retained(
                table,
                "actions",
                "json_extract(elem.value, '$.user_id') != ?1",
                Elements::Objects,
            ),
            present = contains(
                table,
                "actions",
                "json_extract(elem.value, '$.user_id') = ?1"
            ),
        ))
        .bind(&user_id)
        .bind(&now)
        .bind(&course_id)
        .execute(self.store.pool())
        .await
        .map_err(persistence(OP))?;

        if result.rows_affected() == 0 {
            self.store.ensure_exists(OP, &course_id).await?;
            return Ok(false);
        }

        Ok(true)
    }
}
