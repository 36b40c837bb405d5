//! # Gatehouse Auth - Bearer-Token Authorization Gate
//!
//! Protects HTTP routes with JWTs issued by an external identity provider.
//! Verification keys are fetched from the provider's JWKS endpoint and cached;
//! tokens are checked for signature, expiry, issuer and audience, and the
//! `scope` claim must grant the route's permission.
//!
//! ## Architecture
//!
//! - [`config`] - [`AuthorizationConfig`] with the issuer, audiences, key source and timings
//! - [`jwt`] - key resolution ([`jwt::KeyResolver`]) and token validation ([`jwt::TokenValidator`])
//! - [`scope`] - permission checks on the `scope` claim
//! - [`authorizer`] - validation and scope check composed into an [`Outcome`]
//! - [`tower`] - [`AuthorizationLayer`] wrapping protected services
//! - [`error`] - error taxonomy and the client-facing [`Rejection`]
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use gatehouse_auth::{AuthorizationConfig, AuthorizationLayer, Authorizer};
//! use gatehouse_auth::jwt::{KeyResolver, StaticKeySource};
//! use jsonwebtoken::jwk::JwkSet;
//!
//! let config = AuthorizationConfig::new(
//!     "https://tenant.example.com/.well-known/jwks.json",
//!     "https://tenant.example.com/",
//!     vec!["https://api.example.com".to_string()],
//!     "read:messages",
//! );
//!
//! // Keys come from the JWKS endpoint in production; a fixed set works for tests.
//! let source = Arc::new(StaticKeySource::new(JwkSet { keys: vec![] }));
//! let resolver = Arc::new(KeyResolver::new(source));
//!
//! let authorizer = Authorizer::new(config, resolver).unwrap();
//! let layer = AuthorizationLayer::new(authorizer);
//!
//! let outcome = tokio_test::block_on(
//!     layer.authorizer().authorize(&http::HeaderMap::new()),
//! );
//! assert!(!outcome.is_authorized());
//! ```
//!
//! ## Responses
//!
//! Every rejection is a `401` with a JSON body `{"message": ...}`. Validation
//! failures share the message [`INVALID_TOKEN_MESSAGE`]; a valid token without
//! the permission gets `"You do not have the <scope> scope."`.

pub mod authorizer;
pub mod config;
pub mod error;
pub mod jwt;
pub mod scope;
pub mod tower;

pub use authorizer::{Authorizer, Outcome};
pub use config::AuthorizationConfig;
pub use error::{ConfigError, INVALID_TOKEN_MESSAGE, KeyResolutionError, Rejection, ValidationError};
pub use jwt::Claims;
pub use scope::has_permission;
pub use crate::tower::{AuthorizationLayer, AuthorizationService};
