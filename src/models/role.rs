//! User roles.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Role a user holds in the catalog.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    User,
    Author,
    #[serde(rename = "Administrator", alias = "Admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Author => "Author",
            Role::Admin => "Administrator",
        }
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Author" => Ok(Role::Author),
            "Administrator" | "Admin" => Ok(Role::Admin),
            other => Err(AppError::validation(
                "parse_role",
                "role",
                format!("unknown role `{}`, expected User, Author or Administrator", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert_eq!("Author".parse::<Role>().unwrap(), Role::Author);
        assert_eq!("Admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Administrator".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!(Role::Admin.as_str(), "Administrator");
    }

    #[test]
    fn rejects_unknown_role() {
        let err = "root".parse::<Role>().unwrap_err();
        assert_eq!(err.error_code(), crate::errors::codes::VALIDATION_ERROR);
    }
}
