//! Course aggregate model and its embedded reactions and comments.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LocalizedText;
use crate::errors::AppError;

/// Reaction a user leaves on a course.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActionType {
    Like,
    Dislike,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Like => "Like",
            ActionType::Dislike => "Dislike",
        }
    }
}

impl FromStr for ActionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Like" => Ok(ActionType::Like),
            "Dislike" => Ok(ActionType::Dislike),
            other => Err(AppError::validation(
                "parse_action_type",
                "action_type",
                format!("unknown action type `{}`, expected Like or Dislike", other),
            )),
        }
    }
}

/// One user's reaction. A course holds at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub user_id: String,
    pub action_type: ActionType,
}

/// A course comment. `parent_id` is set on replies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Comment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

/// A course document with everything embedded in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub author_ids: Vec<String>,
    pub names: Vec<LocalizedText>,
    pub langs: Vec<String>,
    pub category_id: String,
    pub sub_category_number: i32,
    pub tags: Vec<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_img: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub rating: i32,
    pub date_create: DateTime<Utc>,
    pub date_update: DateTime<Utc>,
    pub actions: Vec<Action>,
    pub comments: Vec<Comment>,
}

impl Course {
    /// Reaction left by `user_id`, if any.
    pub fn action_of(&self, user_id: &str) -> Option<ActionType> {
        self.actions
            .iter()
            .find(|a| a.user_id == user_id)
            .map(|a| a.action_type)
    }

    /// Direct replies to `comment_id`.
    pub fn replies_to<'a>(&'a self, comment_id: &'a str) -> impl Iterator<Item = &'a Comment> + 'a {
        self.comments
            .iter()
            .filter(move |c| c.parent_id.as_deref() == Some(comment_id))
    }
}

/// Request body for creating a new course.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCourseQuery {
    pub names: Vec<LocalizedText>,
    /// Supported languages; derived from `names` when empty
    #[serde(default)]
    pub langs: Vec<String>,
    pub category_id: String,
    #[serde(default)]
    pub sub_category_number: i32,
    #[serde(default)]
    pub tags: Vec<LocalizedText>,
    #[serde(default)]
    pub header_img: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_type_round_trips_through_str() {
        for t in [ActionType::Like, ActionType::Dislike] {
            assert_eq!(t.as_str().parse::<ActionType>().unwrap(), t);
        }
        assert!("Love".parse::<ActionType>().is_err());
    }

    #[test]
    fn add_course_query_defaults() {
        let query: AddCourseQuery = serde_json::from_value(serde_json::json!({
            "names": [{"lang": "en", "text": "Go Basics"}],
            "categoryId": "c1"
        }))
        .unwrap();

        assert!(query.langs.is_empty());
        assert!(query.tags.is_empty());
        assert_eq!(query.sub_category_number, 0);
        assert!(query.header_img.is_none());
    }
}
