//! Error taxonomy for the authorization gate
//!
//! Every error here is request-scoped. The middleware recovers all of them and
//! turns them into one of two client-visible rejections, see [`Rejection`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Client-facing message for every token validation failure
pub const INVALID_TOKEN_MESSAGE: &str = "Missing or invalid token.";

/// Failure to obtain a verification key
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyResolutionError {
    /// The key set could not be fetched or parsed
    #[error("key source {uri} unavailable: {reason}")]
    KeySourceUnavailable {
        /// Key-source URI that failed
        uri: String,
        /// Underlying network or parse failure
        reason: String,
    },

    /// No key with this identifier exists, even after a refresh
    #[error("key not found: {kid}")]
    KeyNotFound {
        /// The key identifier from the token header
        kid: String,
    },
}

impl KeyResolutionError {
    pub(crate) fn unavailable(uri: &str, reason: impl std::fmt::Display) -> Self {
        Self::KeySourceUnavailable {
            uri: uri.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Reason a bearer token was not accepted
///
/// Variants are ordered the way the validator checks them; the first failing
/// check is the one reported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// No `Authorization: Bearer <token>` header
    #[error("missing bearer token")]
    MissingToken,

    /// Token is not a decodable three-segment JWT
    #[error("malformed token: {reason}")]
    MalformedToken {
        /// Decoder error
        reason: String,
    },

    /// Header names an algorithm other than the configured one
    #[error("unsupported algorithm: {found}")]
    UnsupportedAlgorithm {
        /// Algorithm found in the token header
        found: String,
    },

    /// Header carries no `kid`
    #[error("token header has no key identifier")]
    MissingKeyId,

    /// Verification key could not be resolved
    #[error("key resolution failed: {0}")]
    KeyResolutionFailed(#[from] KeyResolutionError),

    /// Signature does not verify against the resolved key
    #[error("invalid signature")]
    InvalidSignature,

    /// `exp` is missing or not in the future
    #[error("token expired")]
    TokenExpired,

    /// `nbf` is later than now plus leeway
    #[error("token not yet valid")]
    TokenNotYetValid,

    /// `iss` is missing or differs from the expected issuer
    #[error("issuer mismatch")]
    IssuerMismatch,

    /// `aud` is missing or shares nothing with the expected audiences
    #[error("audience mismatch")]
    AudienceMismatch,
}

/// Reason a request was short-circuited by the middleware
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The token failed validation
    #[error("invalid token: {0}")]
    InvalidToken(#[from] ValidationError),

    /// The token is valid but lacks the required permission
    #[error("insufficient scope: {required} required")]
    InsufficientScope {
        /// Permission the route requires
        required: String,
    },
}

impl Rejection {
    /// HTTP status for this rejection
    pub fn status(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    /// Message shown to the client
    ///
    /// Validation sub-reasons are collapsed into one generic message.
    pub fn client_message(&self) -> String {
        match self {
            Self::InvalidToken(_) => INVALID_TOKEN_MESSAGE.to_string(),
            Self::InsufficientScope { required } => {
                format!("You do not have the {required} scope.")
            }
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({ "message": self.client_message() })),
        )
            .into_response()
    }
}

/// Invalid [`AuthorizationConfig`](crate::AuthorizationConfig)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required field is empty
    #[error("configuration field `{0}` must not be empty")]
    Empty(&'static str),

    /// The key-source URI does not parse
    #[error("invalid key-source URI {uri}: {reason}")]
    InvalidUri {
        /// The configured URI
        uri: String,
        /// Parser error
        reason: String,
    },

    /// The key source is not served over HTTPS
    #[error("key-source URI {0} must use HTTPS (plain HTTP only allowed for loopback hosts)")]
    InsecureKeySource(String),

    /// The HTTP client for the key source could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The configured algorithm is not an asymmetric signature algorithm
    #[error("algorithm {0} is not an asymmetric signing algorithm")]
    SymmetricAlgorithm(String),
}
