//! Session API endpoints.

use axum::{extract::State, Extension, Json};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::LoginRequest;
use crate::session::{Session, SessionInfo};
use crate::AppState;

/// POST /api/session - Log in against the backend and start a session.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<SessionInfo> {
    if request.username.trim().is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required".to_string(),
        ));
    }

    let login = state.backend.login(&request).await?;
    let session = state.sessions.init(login).await?;
    success(SessionInfo::from(&session))
}

/// GET /api/session - Describe the current session.
pub async fn current_session(Extension(session): Extension<Session>) -> ApiResult<SessionInfo> {
    success(SessionInfo::from(&session))
}

/// DELETE /api/session - Log out.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<()> {
    state.sessions.clear(&session.id).await?;
    success(())
}
