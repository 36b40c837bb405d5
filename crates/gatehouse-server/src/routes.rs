//! HTTP routes
//!
//! ```text
//! GET /api/public  → 200 {"message": <public>}
//! GET /api/private → AuthorizationLayer → 200 {"message": <private>}
//!                                       └→ 401 {"message": <reason>}
//! ```

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use gatehouse_auth::{AuthorizationLayer, Authorizer};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::config::Messages;

/// JSON body of every response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone)]
struct AppState {
    messages: Arc<Messages>,
}

/// Build the router; `/api/private` is guarded by `authorizer`
pub fn app(messages: Messages, authorizer: Authorizer) -> Router {
    let state = AppState {
        messages: Arc::new(messages),
    };

    Router::new()
        .route("/api/private", get(private_message))
        .route_layer(AuthorizationLayer::new(authorizer))
        .route("/api/public", get(public_message))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn public_message(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.messages.public.clone(),
    })
}

async fn private_message(State(state): State<AppState>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: state.messages.private.clone(),
    })
}
