//! Securable types and privileges understood by the Unity Catalog permissions API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Invalid securable type: {0}")]
    SecurableType(String),

    #[error("Invalid privilege(s): {}", .0.join(", "))]
    Privileges(Vec<String>),

    #[error("No valid privileges provided")]
    NoPrivileges,
}

/// Kind of object a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurableType {
    Metastore,
    Catalog,
    Schema,
    Table,
    Function,
    Volume,
    RegisteredModel,
}

impl SecurableType {
    /// Path segment used by the permissions API
    #[must_use]
    pub fn as_path_segment(&self) -> &'static str {
        match self {
            Self::Metastore => "metastore",
            Self::Catalog => "catalog",
            Self::Schema => "schema",
            Self::Table => "table",
            Self::Function => "function",
            Self::Volume => "volume",
            Self::RegisteredModel => "registered_model",
        }
    }
}

impl fmt::Display for SecurableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path_segment())
    }
}

impl FromStr for SecurableType {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "METASTORE" => Ok(Self::Metastore),
            "CATALOG" => Ok(Self::Catalog),
            "SCHEMA" => Ok(Self::Schema),
            "TABLE" => Ok(Self::Table),
            "FUNCTION" => Ok(Self::Function),
            "VOLUME" => Ok(Self::Volume),
            "REGISTERED_MODEL" => Ok(Self::RegisteredModel),
            _ => Err(TokenError::SecurableType(s.to_string())),
        }
    }
}

/// Catalog privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Privilege {
    CreateCatalog,
    UseCatalog,
    CreateSchema,
    UseSchema,
    CreateTable,
    Select,
    Modify,
    CreateFunction,
    Execute,
    CreateVolume,
    ReadVolume,
    CreateModel,
}

impl Privilege {
    pub const ALL: [Privilege; 12] = [
        Self::CreateCatalog,
        Self::UseCatalog,
        Self::CreateSchema,
        Self::UseSchema,
        Self::CreateTable,
        Self::Select,
        Self::Modify,
        Self::CreateFunction,
        Self::Execute,
        Self::CreateVolume,
        Self::ReadVolume,
        Self::CreateModel,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCatalog => "CREATE_CATALOG",
            Self::UseCatalog => "USE_CATALOG",
            Self::CreateSchema => "CREATE_SCHEMA",
            Self::UseSchema => "USE_SCHEMA",
            Self::CreateTable => "CREATE_TABLE",
            Self::Select => "SELECT",
            Self::Modify => "MODIFY",
            Self::CreateFunction => "CREATE_FUNCTION",
            Self::Execute => "EXECUTE",
            Self::CreateVolume => "CREATE_VOLUME",
            Self::ReadVolume => "READ_VOLUME",
            Self::CreateModel => "CREATE_MODEL",
        }
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| TokenError::Privileges(vec![s.to_string()]))
    }
}

/// Split a comma-separated privilege list
///
/// Tokens are trimmed and upper-cased; empty tokens are dropped.
#[must_use]
pub fn normalize_privilege_tokens(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|token| token.trim().to_ascii_uppercase())
        .filter(|token| !token.is_empty())
        .collect()
}

/// Parse a comma-separated privilege list
///
/// # Errors
/// - `TokenError::Privileges` listing every unrecognised token
/// - `TokenError::NoPrivileges` when nothing is left after normalisation
pub fn parse_privileges(raw: &str) -> Result<Vec<Privilege>, TokenError> {
    let tokens = normalize_privilege_tokens(raw);
    if tokens.is_empty() {
        return Err(TokenError::NoPrivileges);
    }

    let mut privileges = Vec::with_capacity(tokens.len());
    let mut invalid = Vec::new();
    for token in tokens {
        match token.parse::<Privilege>() {
            Ok(privilege) => privileges.push(privilege),
            Err(_) => invalid.push(token),
        }
    }
    if invalid.is_empty() {
        Ok(privileges)
    } else {
        Err(TokenError::Privileges(invalid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_privilege_tokens() {
        assert_eq!(
            normalize_privilege_tokens(" select, Modify ,,"),
            vec!["SELECT".to_string(), "MODIFY".to_string()]
        );
        assert!(normalize_privilege_tokens(" , ").is_empty());
    }

    #[test]
    fn test_parse_privileges() {
        assert_eq!(
            parse_privileges("SELECT, MODIFY"),
            Ok(vec![Privilege::Select, Privilege::Modify])
        );
        assert_eq!(
            parse_privileges("SELECT, DROP, TRUNCATE"),
            Err(TokenError::Privileges(vec!["DROP".into(), "TRUNCATE".into()]))
        );
        assert_eq!(parse_privileges(""), Err(TokenError::NoPrivileges));
    }

    #[test]
    fn test_securable_type_from_str() {
        assert_eq!("catalog".parse(), Ok(SecurableType::Catalog));
        assert_eq!("TABLE".parse(), Ok(SecurableType::Table));
        assert_eq!(
            "Registered_Model".parse::<SecurableType>().map(|t| t.as_path_segment()),
            Ok("registered_model")
        );
        assert!("database".parse::<SecurableType>().is_err());
    }

    #[test]
    fn test_privilege_serde_matches_display() {
        for privilege in Privilege::ALL {
            let json = serde_json::to_value(privilege).expect("serializes");
            assert_eq!(json, serde_json::Value::from(privilege.as_str()));
        }
    }
}
