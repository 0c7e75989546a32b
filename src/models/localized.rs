//! Localized text value type.

use serde::{Deserialize, Serialize};

/// One translation of a string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LocalizedText {
    pub lang: String,
    pub text: String,
}

impl LocalizedText {
    pub fn new(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            text: text.into(),
        }
    }
}

/// Distinct languages of `texts`, in first-seen order.
pub fn langs_of(texts: &[LocalizedText]) -> Vec<String> {
    let mut langs: Vec<String> = Vec::new();
    for text in texts {
        if !langs.contains(&text.lang) {
            langs.push(text.lang.clone());
        }
    }
    langs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn langs_are_distinct_and_ordered() {
        let texts = vec![
            LocalizedText::new("en", "Go Basics"),
            LocalizedText::new("ru", "Основы Go"),
            LocalizedText::new("en", "Go 101"),
        ];
        assert_eq!(langs_of(&texts), vec!["en".to_string(), "ru".to_string()]);
    }
}
