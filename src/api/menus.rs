//! Menu definition endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use super::navigation::menu_index;
use super::{checked, success, ApiResult};
use crate::errors::AppError;
use crate::hierarchy::{FlatEntry, Flattened, IntegrityIssue, TreeIndex};
use crate::menus::MenuAuthorizationResolver;
use crate::models::{Menu, MenuRequest};
use crate::session::Session;
use crate::AppState;

/// A menu with its depth, for the indented management list.
#[derive(Debug, Serialize)]
pub struct MenuRow {
    #[serde(flatten)]
    pub menu: Menu,
    pub level: usize,
}

impl From<FlatEntry<'_, Menu>> for MenuRow {
    fn from(entry: FlatEntry<'_, Menu>) -> Self {
        Self {
            menu: entry.node.clone(),
            level: entry.level,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MenuList {
    pub menus: Vec<MenuRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IntegrityIssue>,
}

impl From<Flattened<'_, Menu>> for MenuList {
    fn from(flat: Flattened<'_, Menu>) -> Self {
        Self {
            menus: flat.entries.into_iter().map(MenuRow::from).collect(),
            issues: flat.issues,
        }
    }
}

/// GET /api/menus - Every menu, active or not, in tree order.
pub async fn list_menus(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<MenuList> {
    let menus = checked(&state, &session, state.backend.list_menus(&session.token).await).await?;
    let index = TreeIndex::build(menus);
    success(index.flatten().into())
}

/// POST /api/menus - Create a menu.
pub async fn create_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<MenuRequest>,
) -> ApiResult<Menu> {
    success(save_menu(&state, &session, None, request).await?)
}

/// PUT /api/menus/{id} - Update a menu.
pub async fn update_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(request): Json<MenuRequest>,
) -> ApiResult<Menu> {
    success(save_menu(&state, &session, Some(id), request).await?)
}

/// DELETE /api/menus/{id} - Delete a menu without submenus.
pub async fn delete_menu(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let index = menu_index(&state, &session).await?;
    MenuAuthorizationResolver::new(&index).validate_menu_removal(id)?;
    checked(
        &state,
        &session,
        state.backend.delete_menu(&session.token, id).await,
    )
    .await?;
    tracing::info!("Deleted menu {}", id);
    success(())
}

async fn save_menu(
    state: &AppState,
    session: &Session,
    id: Option<i64>,
    mut request: MenuRequest,
) -> Result<Menu, AppError> {
    let index = menu_index(state, session).await?;
    if let Some(id) = id.filter(|id| !index.contains(*id)) {
        return Err(AppError::NotFound(format!("Menu {} not found", id)));
    }
    request.name = request.name.trim().to_string();
    request.path = request.path.trim().to_string();
    MenuAuthorizationResolver::new(&index).validate_menu(id, &request)?;

    let saved = match id {
        Some(id) => state.backend.update_menu(&session.token, id, &request).await,
        None => state.backend.create_menu(&session.token, &request).await,
    };
    let menu = checked(state, session, saved).await?;
    tracing::info!("Saved menu {} ({})", menu.id, menu.path);
    Ok(menu)
}
