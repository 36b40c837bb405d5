//! Tower Layer implementation for authorization

use tower::Layer;

use crate::authorizer::Authorizer;
use crate::config::AuthorizationConfig;
use crate::error::ConfigError;

use super::service::AuthorizationService;

/// Tower Layer that puts an [`Authorizer`] in front of services
///
/// # Example
///
/// ```rust,ignore
/// use tower::ServiceBuilder;
/// use gatehouse_auth::tower::AuthorizationLayer;
///
/// let service = ServiceBuilder::new()
///     .layer(AuthorizationLayer::new(authorizer))
///     .service(my_inner_service);
/// ```
#[derive(Debug, Clone)]
pub struct AuthorizationLayer {
    authorizer: Authorizer,
}

impl AuthorizationLayer {
    /// Create a layer from a ready authorizer
    pub fn new(authorizer: Authorizer) -> Self {
        Self { authorizer }
    }

    /// Create a layer that fetches keys from the configured JWKS endpoint
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid.
    pub fn from_config(config: AuthorizationConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Authorizer::from_config(config)?))
    }

    /// The authorizer applied by this layer
    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationService::new(inner, self.authorizer.clone())
    }
}
