//! Account management endpoints, open to superadmins and company admins.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::companies::company_index;
use super::{checked, success, ApiResult};
use crate::errors::AppError;
use crate::models::{
    sort_accounts, Account, CreateAccountRequest, ResetPasswordRequest, UpdateAccountRequest,
};
use crate::scope::{ensure_account_manager, CompanyScopeResolver};
use crate::session::Session;
use crate::AppState;

/// GET /api/accounts - List accounts, admins first.
pub async fn list_accounts(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<Account>> {
    ensure_account_manager(&session.role)?;
    let mut accounts =
        checked(&state, &session, state.backend.list_accounts(&session.token).await).await?;
    sort_accounts(&mut accounts);
    success(accounts)
}

/// POST /api/accounts - Create an account inside the caller's company scope.
pub async fn create_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateAccountRequest>,
) -> ApiResult<Account> {
    ensure_account_manager(&session.role)?;
    let index = company_index(&state, &session).await?;
    CompanyScopeResolver::new(&index).authorize_account(
        &session.role,
        session.company_id,
        &request,
    )?;

    let account = checked(
        &state,
        &session,
        state.backend.create_account(&session.token, &request).await,
    )
    .await?;
    tracing::info!(
        "Account {} created in company {:?} by role {}",
        account.username,
        account.company_id,
        session.role
    );
    success(account)
}

/// PUT /api/accounts/{id} - Change an account's role or active flag.
pub async fn update_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateAccountRequest>,
) -> ApiResult<Account> {
    let mut account = account_in_scope(&state, &session, id).await?;
    checked(
        &state,
        &session,
        state.backend.update_account(&session.token, id, &request).await,
    )
    .await?;
    tracing::info!(
        "Account {} set to role {} (active: {}) by role {}",
        account.username,
        request.role,
        request.is_active,
        session.role
    );
    account.role = request.role;
    account.is_active = request.is_active;
    success(account)
}

/// PUT /api/accounts/{id}/password - Set a new password.
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(request): Json<ResetPasswordRequest>,
) -> ApiResult<()> {
    ensure_account_manager(&session.role)?;
    if request.password.is_empty() {
        return Err(AppError::Validation("New password is required".to_string()));
    }
    let account = account_in_scope(&state, &session, id).await?;
    checked(
        &state,
        &session,
        state.backend.reset_password(&session.token, id, &request).await,
    )
    .await?;
    tracing::info!("Password of account {} reset by role {}", account.username, session.role);
    success(())
}

/// DELETE /api/accounts/{id} - Delete an account.
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let account = account_in_scope(&state, &session, id).await?;
    checked(
        &state,
        &session,
        state.backend.delete_account(&session.token, id).await,
    )
    .await?;
    tracing::info!("Account {} deleted by role {}", account.username, session.role);
    success(())
}

/// Load account `id` and check the caller may manage it.
async fn account_in_scope(
    state: &AppState,
    session: &Session,
    id: i64,
) -> Result<Account, AppError> {
    ensure_account_manager(&session.role)?;
    let accounts =
        checked(state, session, state.backend.list_accounts(&session.token).await).await?;
    let account = accounts
        .into_iter()
        .find(|a| a.id == id)
        .ok_or_else(|| AppError::NotFound(format!("Account {} not found", id)))?;
    let index = company_index(state, session).await?;
    CompanyScopeResolver::new(&index).authorize_account_target(
        &session.role,
        session.company_id,
        &account,
    )?;
    Ok(account)
}
