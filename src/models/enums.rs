//! Shared domain enums

use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Language a book is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Language {
    #[default]
    French,
    English,
}

impl Language {
    /// Wire and storage name
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::French => "FRENCH",
            Language::English => "ENGLISH",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("french") {
            Ok(Language::French)
        } else if s.eq_ignore_ascii_case("english") {
            Ok(Language::English)
        } else {
            Err(format!("Unknown language '{}', expected FRENCH or ENGLISH", s))
        }
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
