//! Bearer token validation against the identity provider's keys
//!
//! Checks run in a fixed order and the first failure is reported:
//!
//! 1. `Authorization: Bearer <token>` present
//! 2. token decodes as a three-segment JWT
//! 3. header algorithm equals the configured one (no algorithm substitution)
//! 4. header carries a `kid` that the [`KeyResolver`] can resolve
//! 5. signature verifies
//! 6. `exp` in the future and `nbf` not in the future (both with leeway),
//!    then `iss`, then `aud`

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use http::HeaderMap;
use http::header::AUTHORIZATION;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Validation, decode, decode_header};
use tracing::debug;

use super::{Claims, KeyResolver};
use crate::config::AuthorizationConfig;
use crate::error::ValidationError;

/// Extract the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively; anything other than exactly
/// two space-separated parts is treated as a missing token.
///
/// # Errors
///
/// Returns [`ValidationError::MissingToken`] if the header is absent, not
/// visible ASCII, or not a bearer credential.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ValidationError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(ValidationError::MissingToken)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(ValidationError::MissingToken),
    }
}

/// Validates bearer tokens for one [`AuthorizationConfig`]
#[derive(Debug, Clone)]
pub struct TokenValidator {
    config: Arc<AuthorizationConfig>,
    resolver: Arc<KeyResolver>,
}

impl TokenValidator {
    /// Create a validator sharing the given key resolver
    pub fn new(config: Arc<AuthorizationConfig>, resolver: Arc<KeyResolver>) -> Self {
        Self { config, resolver }
    }

    /// The configuration this validator enforces
    pub fn config(&self) -> &AuthorizationConfig {
        &self.config
    }

    /// The key resolver backing signature checks
    pub fn resolver(&self) -> &Arc<KeyResolver> {
        &self.resolver
    }

    /// Validate the bearer token carried by a request's headers
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub async fn validate(&self, headers: &HeaderMap) -> Result<Claims, ValidationError> {
        let token = extract_bearer_token(headers)?;
        self.validate_token(token).await
    }

    /// Validate a compact JWT
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`ValidationError`].
    pub async fn validate_token(&self, token: &str) -> Result<Claims, ValidationError> {
        if token.split('.').count() != 3 {
            return Err(ValidationError::MalformedToken {
                reason: "expected three dot-separated segments".to_string(),
            });
        }

        let header = decode_header(token).map_err(|e| ValidationError::MalformedToken {
            reason: e.to_string(),
        })?;

        if header.alg != self.config.algorithm {
            debug!(
                algorithm = ?header.alg,
                expected = ?self.config.algorithm,
                "JWT algorithm not allowed"
            );
            return Err(ValidationError::UnsupportedAlgorithm {
                found: format!("{:?}", header.alg),
            });
        }

        let kid = header.kid.ok_or(ValidationError::MissingKeyId)?;
        let key = self.resolver.resolve(&kid).await?;

        // Signature only; claim checks below keep a fixed order
        let mut validation = Validation::new(self.config.algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let token_data =
            decode::<Claims>(token, key.decoding_key(), &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                        ValidationError::MalformedToken {
                            reason: e.to_string(),
                        }
                    }
                    _ => ValidationError::InvalidSignature,
                }
            })?;

        self.check_claims(&token_data.claims, now_secs())?;

        debug!(
            kid = %kid,
            subject = ?token_data.claims.sub,
            "JWT validation successful"
        );

        Ok(token_data.claims)
    }

    /// Registered-claim checks in order: expiry, not-before, issuer, audience
    fn check_claims(&self, claims: &Claims, now: u64) -> Result<(), ValidationError> {
        match claims.exp {
            Some(exp) if exp.saturating_add(self.config.leeway_secs) > now => {}
            _ => return Err(ValidationError::TokenExpired),
        }

        if let Some(nbf) = claims.nbf
            && nbf > now.saturating_add(self.config.leeway_secs)
        {
            return Err(ValidationError::TokenNotYetValid);
        }

        if claims.iss.as_deref() != Some(self.config.issuer.as_str()) {
            return Err(ValidationError::IssuerMismatch);
        }

        let audience_ok = claims
            .aud
            .as_ref()
            .is_some_and(|aud| aud.intersects(&self.config.audiences));
        if !audience_ok {
            return Err(ValidationError::AudienceMismatch);
        }

        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
