use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

static BASE36_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]{1,32}$").expect("valid natural id regex"));

/// Type prefixes the platform attaches to "fullnames" (`t1_` comment, `t3_` link).
const TYPE_PREFIXES: [&str; 2] = ["t1_", "t3_"];

/// Canonical platform identifier of an item.
///
/// Every id entering the system passes through [`NaturalId::parse`], so
/// `"t1_Abc123"`, `"abc123"` and `" ABC123 "` all map to the same key and
/// dedup can compare ids byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NaturalId(String);

impl NaturalId {
    /// Canonicalize a raw platform id.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidNaturalId`] when the remainder after prefix
    /// stripping is empty or is not a base-36 token.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let lowered = raw.trim().to_ascii_lowercase();
        let stripped = TYPE_PREFIXES
            .iter()
            .find_map(|prefix| lowered.strip_prefix(prefix))
            .unwrap_or(&lowered);

        if !BASE36_ID.is_match(stripped) {
            return Err(CoreError::InvalidNaturalId(raw.to_string()));
        }

        Ok(Self(stripped.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Platform "fullname" used when replying to a comment.
    #[must_use]
    pub fn comment_fullname(&self) -> String {
        format!("t1_{}", self.0)
    }
}

impl std::fmt::Display for NaturalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for NaturalId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<NaturalId> for String {
    fn from(value: NaturalId) -> Self {
        value.0
    }
}

impl std::str::FromStr for NaturalId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
