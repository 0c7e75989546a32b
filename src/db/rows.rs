//! Stored document shapes and their conversion to domain models.
//!
//! Older documents kept a single plain-string name next to a language code.
//! Those are adapted here, so the domain model only ever sees localized
//! arrays.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use crate::errors::{mapping, persistence, AppError};
use crate::models::{Action, Category, Comment, Course, LocalizedText, SubCategory};

/// Reaction as stored inside `courses.actions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredAction {
    pub user_id: String,
    pub action_type: String,
}

impl From<&Action> for StoredAction {
    fn from(action: &Action) -> Self {
        Self {
            user_id: action.user_id.clone(),
            action_type: action.action_type.as_str().to_string(),
        }
    }
}

/// Comment as stored inside `courses.comments`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredComment {
    pub id: String,
    pub user_id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<StoredAction>,
}

/// Sub-category as stored inside `categories.sub_categories`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredSubCategory {
    pub number: i32,
    #[serde(alias = "name")]
    pub names: StoredTexts,
}

impl From<&SubCategory> for StoredSubCategory {
    fn from(sub: &SubCategory) -> Self {
        Self {
            number: sub.number,
            names: StoredTexts::Localized(sub.names.clone()),
        }
    }
}

/// Either the localized array or the legacy single string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredTexts {
    Localized(Vec<LocalizedText>),
    Plain(String),
}

impl StoredTexts {
    fn localize(
        self,
        op: &'static str,
        model: &'static str,
        fallback_lang: Option<&str>,
    ) -> Result<Vec<LocalizedText>, AppError> {
        match self {
            StoredTexts::Localized(texts) => Ok(texts),
            StoredTexts::Plain(text) => match fallback_lang {
                Some(lang) => Ok(vec![LocalizedText::new(lang, text)]),
                None => Err(AppError::Mapping {
                    op,
                    model,
                    message: "legacy name has no language to adopt".to_string(),
                }),
            },
        }
    }
}

pub(crate) fn decode<T: DeserializeOwned>(
    op: &'static str,
    model: &'static str,
    raw: &str,
) -> Result<T, AppError> {
    serde_json::from_str(raw).map_err(mapping(op, model))
}

pub(crate) fn encode<T: Serialize + ?Sized>(
    op: &'static str,
    model: &'static str,
    value: &T,
) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(mapping(op, model))
}

fn column<'r, T>(op: &'static str, row: &'r SqliteRow, name: &str) -> Result<T, AppError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(persistence(op))
}

fn stamp(op: &'static str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            tracing::error!(operation = op, "Timestamp error: {:?}", e);
            AppError::Mapping {
                op,
                model: "course",
                message: format!("bad timestamp `{}`", raw),
            }
        })
}

pub(crate) fn sub_categories_from_json(
    op: &'static str,
    raw: &str,
    fallback_lang: Option<&str>,
) -> Result<Vec<SubCategory>, AppError> {
    let stored: Vec<StoredSubCategory> = decode(op, "sub_category", raw)?;
    stored
        .into_iter()
        .map(|sub| {
            Ok(SubCategory {
                number: sub.number,
                names: sub.names.localize(op, "sub_category", fallback_lang)?,
            })
        })
        .collect()
}

pub(crate) fn category_from_row(op: &'static str, row: &SqliteRow) -> Result<Category, AppError> {
    let langs: Vec<String> = decode(op, "category", &column::<String>(op, row, "langs")?)?;
    let fallback = langs.first().map(String::as_str);
    let names: StoredTexts = decode(op, "category", &column::<String>(op, row, "names")?)?;
    let names = names.localize(op, "category", fallback)?;
    let sub_categories =
        sub_categories_from_json(op, &column::<String>(op, row, "sub_categories")?, fallback)?;

    Ok(Category {
        id: column(op, row, "id")?,
        names,
        logo_img: column(op, row, "logo_img")?,
        sub_categories,
        version: column(op, row, "version")?,
        langs,
    })
}

fn action_from_stored(op: &'static str, stored: StoredAction) -> Result<Action, AppError> {
    let action_type = stored.action_type.parse().map_err(|_| AppError::Mapping {
        op,
        model: "action",
        message: format!("unknown action type `{}`", stored.action_type),
    })?;
    Ok(Action {
        user_id: stored.user_id,
        action_type,
    })
}

fn comment_from_stored(op: &'static str, stored: StoredComment) -> Result<Comment, AppError> {
    Ok(Comment {
        id: stored.id,
        user_id: stored.user_id,
        text: stored.text,
        parent_id: stored.parent_id.filter(|p| !p.is_empty()),
        actions: stored
            .actions
            .into_iter()
            .map(|a| action_from_stored(op, a))
            .collect::<Result<_, _>>()?,
    })
}

pub(crate) fn course_from_row(op: &'static str, row: &SqliteRow) -> Result<Course, AppError> {
    let langs: Vec<String> = decode(op, "course", &column::<String>(op, row, "langs")?)?;
    let names: StoredTexts = decode(op, "course", &column::<String>(op, row, "names")?)?;
    let names = names.localize(op, "course", langs.first().map(String::as_str))?;
    let actions: Vec<StoredAction> = decode(op, "action", &column::<String>(op, row, "actions")?)?;
    let comments: Vec<StoredComment> =
        decode(op, "comment", &column::<String>(op, row, "comments")?)?;

    Ok(Course {
        id: column(op, row, "id")?,
        author_ids: decode(op, "course", &column::<String>(op, row, "author_ids")?)?,
        names,
        langs,
        category_id: column(op, row, "category_id")?,
        sub_category_number: column(op, row, "sub_category_number")?,
        tags: decode(op, "tag", &column::<String>(op, row, "tags")?)?,
        header_img: column(op, row, "header_img")?,
        description: column(op, row, "description")?,
        rating: column(op, row, "rating")?,
        date_create: stamp(op, &column::<String>(op, row, "date_create")?)?,
        date_update: stamp(op, &column::<String>(op, row, "date_update")?)?,
        actions: actions
            .into_iter()
            .map(|a| action_from_stored(op, a))
            .collect::<Result<_, _>>()?,
        comments: comments
            .into_iter()
            .map(|c| comment_from_stored(op, c))
            .collect::<Result<_, _>>()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_sub_category_name_adopts_category_lang() {
        let subs = sub_categories_from_json("test", r#"[{"number":0,"name":"Go"}]"#, Some("en"))
            .unwrap();
        assert_eq!(subs[0].names, vec![LocalizedText::new("en", "Go")]);
    }

    #[test]
    fn legacy_name_without_lang_is_a_mapping_error() {
        let err = sub_categories_from_json("test", r#"[{"number":0,"name":"Go"}]"#, None)
            .unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::MAPPING_ERROR);
    }

    #[test]
    fn unknown_stored_action_type_is_a_mapping_error() {
        let stored = StoredAction {
            user_id: "u".into(),
            action_type: "Love".into(),
        };
        let err = action_from_stored("test", stored).unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::MAPPING_ERROR);
    }

    #[test]
    fn top_level_comment_omits_parent() {
        let stored = StoredComment {
            id: "c".into(),
            user_id: "u".into(),
            text: "hi".into(),
            parent_id: None,
            actions: Vec::new(),
        };
        let json = encode("test", "comment", &stored).unwrap();
        assert!(!json.contains("parent_id"));
    }
}
