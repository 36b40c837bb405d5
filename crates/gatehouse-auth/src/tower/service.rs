//! Tower Service implementation for authorization
//!
//! Every request is run through [`Authorizer::authorize`]. Authorized requests
//! reach the inner service unchanged and its response is returned as-is;
//! anything else is answered with the rejection's 401 response and the inner
//! service is never called.

use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::Service;

use crate::authorizer::{Authorizer, Outcome};

/// Tower Service guarding an inner service with an [`Authorizer`]
#[derive(Debug, Clone)]
pub struct AuthorizationService<S> {
    inner: S,
    authorizer: Authorizer,
}

impl<S> AuthorizationService<S> {
    /// Wrap `inner` so every request is authorized first
    pub fn new(inner: S, authorizer: Authorizer) -> Self {
        Self { inner, authorizer }
    }

    /// Get a reference to the inner service
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The authorizer guarding the inner service
    pub fn authorizer(&self) -> &Authorizer {
        &self.authorizer
    }
}

/// Future returned by [`AuthorizationService`]
pub type AuthorizationFuture<E> = BoxFuture<'static, Result<Response, E>>;

impl<S, B> Service<http::Request<B>> for AuthorizationService<S>
where
    S: Service<http::Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
    B: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = AuthorizationFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let authorizer = self.authorizer.clone();
        // Take the instance that was driven to readiness, leave a clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match authorizer.authorize(req.headers()).await {
                Outcome::Authorized(_) => inner.call(req).await,
                Outcome::Unauthorized(rejection) => Ok(rejection.into_response()),
            }
        })
    }
}
