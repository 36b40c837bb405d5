//! Authorization configuration
//!
//! [`AuthorizationConfig`] is built once at startup and shared read-only by
//! every request. Nothing in this crate holds issuer, audience or key-source
//! settings anywhere else.

use std::time::Duration;

use jsonwebtoken::Algorithm;
use serde::{Deserialize, Deserializer, Serialize};
use url::{Host, Url};

use crate::error::ConfigError;

/// Authorization settings for one protected surface
///
/// # Example
///
/// ```rust
/// use gatehouse_auth::AuthorizationConfig;
///
/// let config = AuthorizationConfig::new(
///     "https://tenant.example.com/.well-known/jwks.json",
///     "https://tenant.example.com/",
///     vec!["https://api.example.com".to_string()],
///     "read:messages",
/// );
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// JWKS endpoint of the identity provider
    pub jwks_uri: String,
    /// Expected `iss` claim, compared exactly
    pub issuer: String,
    /// Accepted `aud` values; a token needs at least one of them
    #[serde(deserialize_with = "one_or_many")]
    pub audiences: Vec<String>,
    /// Permission that must appear in the `scope` claim
    pub required_scope: String,
    /// The only signing algorithm accepted in token headers
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    /// Clock-skew tolerance applied to `exp`
    #[serde(default = "default_leeway_secs")]
    pub leeway_secs: u64,
    /// How long a fetched key set is served before it is refetched
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Minimum spacing between forced refreshes triggered by unknown key ids
    #[serde(default = "default_min_refresh_interval_secs")]
    pub min_refresh_interval_secs: u64,
    /// Timeout for one key-set fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

fn default_algorithm() -> Algorithm {
    Algorithm::RS256
}

fn default_leeway_secs() -> u64 {
    60
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_min_refresh_interval_secs() -> u64 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

/// Accept `"aud"` as well as `["aud1", "aud2"]`
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

impl AuthorizationConfig {
    /// Create a configuration with default algorithm (RS256) and timings
    pub fn new(
        jwks_uri: impl Into<String>,
        issuer: impl Into<String>,
        audiences: Vec<String>,
        required_scope: impl Into<String>,
    ) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            issuer: issuer.into(),
            audiences,
            required_scope: required_scope.into(),
            algorithm: default_algorithm(),
            leeway_secs: default_leeway_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_refresh_interval_secs: default_min_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }

    /// Set the accepted signing algorithm
    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the clock-skew tolerance
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway_secs = leeway.as_secs();
        self
    }

    /// Set the key-set cache TTL
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    /// Set the minimum interval between forced key-set refreshes
    pub fn with_min_refresh_interval(mut self, interval: Duration) -> Self {
        self.min_refresh_interval_secs = interval.as_secs();
        self
    }

    /// Clock-skew tolerance
    pub fn leeway(&self) -> Duration {
        Duration::from_secs(self.leeway_secs)
    }

    /// Key-set cache TTL
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Minimum interval between forced refreshes
    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }

    /// Timeout for one key-set fetch
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Check the configuration before it is used to build the gate
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required field is empty, the key-source
    /// URI is not HTTPS (loopback hosts excepted), or the algorithm is HMAC.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::Empty("issuer"));
        }
        if self.required_scope.trim().is_empty() {
            return Err(ConfigError::Empty("required_scope"));
        }
        if self.audiences.iter().all(|aud| aud.trim().is_empty()) {
            return Err(ConfigError::Empty("audiences"));
        }
        if matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::SymmetricAlgorithm(format!(
                "{:?}",
                self.algorithm
            )));
        }
        check_key_source_uri(&self.jwks_uri)
    }
}

/// Require HTTPS for the key source, allowing plain HTTP to loopback hosts
pub(crate) fn check_key_source_uri(uri: &str) -> Result<(), ConfigError> {
    if uri.trim().is_empty() {
        return Err(ConfigError::Empty("jwks_uri"));
    }
    let parsed = Url::parse(uri).map_err(|e| ConfigError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(&parsed) => Ok(()),
        _ => Err(ConfigError::InsecureKeySource(uri.to_string())),
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}
