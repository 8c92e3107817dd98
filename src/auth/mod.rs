//! Session authentication module.
//!
//! The browser presents its opaque session id as a bearer token. A live
//! session is attached to the request; anything else is answered with a 401
//! envelope before reaching a handler.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::session::SessionManager;

/// Session authentication layer function that takes the session manager as a parameter.
pub async fn session_auth_layer(
    sessions: SessionManager,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = bearer_token(&request) else {
        return AppError::Unauthorized("Missing session token".to_string()).into_response();
    };

    match sessions.resolve(&session_id).await {
        Ok(session) => {
            request.extensions_mut().insert(session);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

fn bearer_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
