//! Token validation and scope enforcement composed into one decision

use std::sync::Arc;

use http::HeaderMap;
use tracing::{debug, warn};

use crate::config::AuthorizationConfig;
use crate::error::{ConfigError, Rejection};
use crate::jwt::{Claims, KeyResolver, TokenValidator};
use crate::scope::has_permission;

/// Per-request authorization decision
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Valid token carrying the required permission
    Authorized(Claims),
    /// Request must be rejected
    Unauthorized(Rejection),
}

impl Outcome {
    /// Whether the request may proceed
    pub fn is_authorized(&self) -> bool {
        matches!(self, Outcome::Authorized(_))
    }
}

/// Decides whether a request may reach a protected handler
///
/// Cheap to clone; clones share the configuration and key cache.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use gatehouse_auth::{AuthorizationConfig, Authorizer};
/// use gatehouse_auth::jwt::{KeyResolver, StaticKeySource};
/// use jsonwebtoken::jwk::JwkSet;
///
/// let config = AuthorizationConfig::new(
///     "https://tenant.example.com/.well-known/jwks.json",
///     "https://tenant.example.com/",
///     vec!["https://api.example.com".to_string()],
///     "read:messages",
/// );
/// let resolver = KeyResolver::new(Arc::new(StaticKeySource::new(JwkSet { keys: vec![] })));
/// let authorizer = Authorizer::new(config, Arc::new(resolver)).unwrap();
/// assert_eq!(authorizer.required_scope(), "read:messages");
/// ```
#[derive(Debug, Clone)]
pub struct Authorizer {
    validator: TokenValidator,
}

impl Authorizer {
    /// Build an authorizer over an existing key resolver
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn new(
        config: AuthorizationConfig,
        resolver: Arc<KeyResolver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            validator: TokenValidator::new(Arc::new(config), resolver),
        })
    }

    /// Build an authorizer fetching keys from the configured JWKS endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate or the
    /// key source cannot be set up.
    pub fn from_config(config: AuthorizationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let resolver = KeyResolver::from_config(&config)?;
        Self::new(config, Arc::new(resolver))
    }

    /// Permission required by this authorizer
    pub fn required_scope(&self) -> &str {
        &self.validator.config().required_scope
    }

    /// The underlying token validator
    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// The shared key resolver
    pub fn resolver(&self) -> &Arc<KeyResolver> {
        self.validator.resolver()
    }

    /// Decide on a request given its headers
    pub async fn authorize(&self, headers: &HeaderMap) -> Outcome {
        let claims = match self.validator.validate(headers).await {
            Ok(claims) => claims,
            Err(reason) => {
                debug!(reason = %reason, "Token is not valid or missing token");
                return Outcome::Unauthorized(Rejection::InvalidToken(reason));
            }
        };

        let required = self.required_scope();
        if !has_permission(&claims, required) {
            warn!(
                subject = ?claims.sub,
                required = %required,
                "Token lacks required scope"
            );
            return Outcome::Unauthorized(Rejection::InsufficientScope {
                required: required.to_string(),
            });
        }

        Outcome::Authorized(claims)
    }
}
