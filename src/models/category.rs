//! Category and sub-category models.

use serde::{Deserialize, Serialize};

use super::LocalizedText;

/// A sub-category. Numbers within a category run 0..n-1 in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubCategory {
    pub number: i32,
    pub names: Vec<LocalizedText>,
}

/// A course category with its embedded sub-categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub langs: Vec<String>,
    pub names: Vec<LocalizedText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_img: Option<String>,
    pub sub_categories: Vec<SubCategory>,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a new category.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCategoryQuery {
    pub name: String,
    pub lang: String,
    #[serde(default)]
    pub logo_img: Option<String>,
    /// Initial sub-categories, numbered 0..n-1 in the given order
    #[serde(default)]
    pub sub_categories: Vec<NewSubCategory>,
}

/// Sub-category supplied with a new category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubCategory {
    pub names: Vec<LocalizedText>,
}

impl AddCategoryQuery {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
            logo_img: None,
            sub_categories: Vec::new(),
        }
    }

    /// Add an initial sub-category named `name` in `lang`.
    pub fn with_sub_category(mut self, name: impl Into<String>, lang: impl Into<String>) -> Self {
        self.sub_categories.push(NewSubCategory {
            names: vec![LocalizedText::new(lang, name)],
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_category_query_accepts_sub_categories() {
        let query: AddCategoryQuery = serde_json::from_value(serde_json::json!({
            "name": "Programming",
            "lang": "en",
            "subCategories": [
                {"number": 7, "names": [{"lang": "en", "text": "Go"}]},
                {"names": [{"lang": "en", "text": "Rust"}]}
            ]
        }))
        .unwrap();

        assert_eq!(query.sub_categories.len(), 2);
        assert_eq!(query.sub_categories[1].names, vec![LocalizedText::new("en", "Rust")]);

        let bare: AddCategoryQuery =
            serde_json::from_value(serde_json::json!({"name": "Design", "lang": "en"})).unwrap();
        assert!(bare.sub_categories.is_empty());
    }
}
