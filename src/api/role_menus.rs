//! Role-menu assignment editor endpoints.

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};

use super::navigation::menu_index;
use super::{checked, success, ApiResult};
use crate::editor::{EditorSnapshot, LoadOutcome};
use crate::errors::AppError;
use crate::hierarchy::IntegrityIssue;
use crate::menus::{EditableMenuNode, MenuAuthorizationResolver, MenuIdSet};
use crate::session::Session;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectRoleRequest {
    pub role_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleMenuRequest {
    pub menu_id: i64,
    pub checked: bool,
}

/// The editor as shown to an admin: all menus with checked flags.
#[derive(Debug, Serialize)]
pub struct EditorView {
    #[serde(flatten)]
    pub editor: EditorSnapshot,
    pub menus: Vec<EditableMenuNode>,
    /// Assigned ids with no matching menu; never rendered.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_menu_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IntegrityIssue>,
}

/// GET /api/role-menus/editor - Current editing view.
pub async fn get_editor(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<EditorView> {
    let snapshot = state.editors.with(&session.id, |e| e.snapshot()).await;
    success(editor_view(&state, &session, snapshot).await?)
}

/// POST /api/role-menus/editor/select - Load a role's assignment.
pub async fn select_role(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<SelectRoleRequest>,
) -> ApiResult<EditorView> {
    let ticket = state
        .editors
        .with(&session.id, |e| e.select_role(request.role_id))
        .await;

    let fetched = state
        .backend
        .role_menus(&session.token, request.role_id)
        .await;
    let outcome = state
        .editors
        .with(&session.id, |e| e.apply_loaded(ticket, fetched))
        .await;

    match checked(&state, &session, outcome).await? {
        LoadOutcome::Applied => {
            let snapshot = state.editors.with(&session.id, |e| e.snapshot()).await;
            success(editor_view(&state, &session, snapshot).await?)
        }
        LoadOutcome::Stale => Err(AppError::Conflict(format!(
            "Selection of role {} was superseded",
            request.role_id
        ))),
    }
}

/// POST /api/role-menus/editor/toggle - Check or uncheck one menu. Only
/// menus that exist may be checked.
pub async fn toggle_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<ToggleMenuRequest>,
) -> ApiResult<EditorSnapshot> {
    if request.checked {
        let index = menu_index(&state, &session).await?;
        MenuAuthorizationResolver::new(&index)
            .ensure_checkable(request.menu_id, request.checked)?;
    }
    let snapshot = state
        .editors
        .with(&session.id, |e| {
            e.toggle(request.menu_id, request.checked)
                .map(|()| e.snapshot())
        })
        .await?;
    success(snapshot)
}

/// POST /api/role-menus/editor/save - Replace the role's assignment with the
/// current set.
pub async fn save_role_menus(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<EditorSnapshot> {
    let (role_id, menu_ids) = state
        .editors
        .with(&session.id, |e| e.pending_commit())
        .await?;

    checked(
        &state,
        &session,
        state
            .backend
            .commit_role_menus(&session.token, role_id, &menu_ids)
            .await,
    )
    .await?;

    let snapshot = state
        .editors
        .with(&session.id, |e| {
            e.mark_saved(role_id, &menu_ids);
            e.snapshot()
        })
        .await;
    success(snapshot)
}

async fn editor_view(
    state: &AppState,
    session: &Session,
    editor: EditorSnapshot,
) -> Result<EditorView, AppError> {
    let index = menu_index(state, session).await?;
    let resolver = MenuAuthorizationResolver::new(&index);
    let set: MenuIdSet = editor.checked.iter().copied().collect();
    Ok(EditorView {
        menus: resolver.editing_tree(&set),
        unknown_menu_ids: resolver.unknown_ids(&set),
        issues: index.issues().to_vec(),
        editor,
    })
}
