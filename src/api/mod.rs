//! REST API module.
//!
//! Contains all console routes and handlers. Every handler runs against the
//! session attached by the auth layer and talks to the quoting backend with
//! that session's token.

mod accounts;
mod companies;
mod customers;
mod menus;
mod navigation;
mod role_menus;
mod session;

pub use accounts::*;
pub use companies::*;
pub use customers::*;
pub use menus::*;
pub use navigation::*;
pub use role_menus::*;
pub use session::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::session::Session;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Pass a backend result through, ending the session if the backend
/// rejected its token.
pub(crate) async fn checked<T>(
    state: &AppState,
    session: &Session,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if let Err(AppError::Unauthorized(_)) = &result {
        tracing::info!("Backend rejected token of session {}, logging out", session.id);
        if let Err(e) = state.sessions.clear(&session.id).await {
            tracing::warn!("Failed to clear session {}: {}", session.id, e);
        }
    }
    result
}
