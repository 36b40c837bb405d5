//! # Tower Middleware Integration
//!
//! [`AuthorizationLayer`] wraps a protected service with [`AuthorizationService`],
//! which runs the [`Authorizer`](crate::Authorizer) before every request:
//!
//! ```text
//! Start → Validating ─┬─ Authorized   → inner service → response passed through
//!                     └─ Unauthorized → 401 {"message": ...}
//! ```
//!
//! The request is handed to the inner service untouched.
//!
//! ## Usage with axum
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use gatehouse_auth::tower::AuthorizationLayer;
//!
//! let app = Router::new()
//!     .route("/api/private", get(private_handler))
//!     .route_layer(AuthorizationLayer::new(authorizer))
//!     .route("/api/public", get(public_handler));
//! ```

mod layer;
mod service;

pub use layer::AuthorizationLayer;
pub use service::{AuthorizationFuture, AuthorizationService};
