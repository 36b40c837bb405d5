//! JWT infrastructure: key resolution and token validation
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────┐
//! │  KeyResolver (jwks)           │
//! │  - KeySource fetch (HTTPS)    │
//! │  - atomic key-set snapshots   │
//! │  - refresh on miss / TTL      │
//! └───────────────▲───────────────┘
//!                 │ resolve(kid)
//! ┌───────────────┴───────────────┐
//! │  TokenValidator (validator)   │
//! │  - bearer extraction          │
//! │  - algorithm pinning          │
//! │  - signature, exp, iss, aud   │
//! └───────────────────────────────┘
//! ```

pub mod jwks;
pub mod validator;

pub use jwks::{HttpKeySource, KeyResolver, KeySet, KeySource, SigningKey, StaticKeySource};
pub use validator::{TokenValidator, extract_bearer_token};

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

/// Audience claim value, which can be a single string or array of strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// A single audience string
    Single(String),
    /// Multiple audience strings
    Multiple(Vec<String>),
}

impl Audience {
    /// Check if the audience contains a specific value
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Audience::Single(s) => s == value,
            Audience::Multiple(v) => v.iter().any(|s| s == value),
        }
    }

    /// Check if at least one of `expected` is present
    pub fn intersects<S: AsRef<str>>(&self, expected: &[S]) -> bool {
        expected.iter().any(|e| self.contains(e.as_ref()))
    }
}

/// Claims decoded from a verified token payload
///
/// Only ever constructed from a payload whose signature has been checked.
/// Presence of `iss`, `aud` and `exp` is enforced by the validator, not by
/// deserialization, so a missing claim is reported as the matching mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Expiration time (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,

    /// Not before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Space-delimited permissions; a non-string value decodes as `None`
    #[serde(
        default,
        deserialize_with = "string_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub scope: Option<String>,

    /// Claims not covered above
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

fn string_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}

impl Claims {
    /// Parse the scope string into a set of individual permissions
    pub fn scopes(&self) -> HashSet<&str> {
        self.scope
            .as_deref()
            .unwrap_or("")
            .split_whitespace()
            .collect()
    }
}
