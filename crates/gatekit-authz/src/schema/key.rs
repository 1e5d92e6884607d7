//! Dynamic attribute keys.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

static DYNAMIC_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$.+").expect("Invalid dynamic key regex"));

/// A policy-side attribute reference of the form `$name`.
///
/// The leading `$` marks the identifier as a lookup into an entity's
/// attribute map; the resolved name is everything after it. Keys without the
/// sigil are rejected at schema time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DynamicKey(String);

impl DynamicKey {
    /// Parse a raw key, enforcing the `^\$.+` lexical rule.
    ///
    /// # Errors
    ///
    /// Returns an error when the `$` prefix or the name after it is missing.
    pub fn parse(raw: &str) -> Result<Self, DynamicKeyError> {
        if DYNAMIC_KEY_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(DynamicKeyError(raw.to_string()))
        }
    }

    /// The raw key, including the `$` sigil.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The resolved attribute name (the substring after `$`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for DynamicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DynamicKey {
    type Err = DynamicKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Violation of the dynamic-key lexical rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a dynamic key (expected a `$` prefix followed by a name)")]
pub struct DynamicKeyError(pub String);

// =============================================================================
// Tests
// =============================================================================
