//! Navigation and role API endpoints.

use axum::{extract::State, Extension};
use serde::Serialize;

use super::{checked, success, ApiResult};
use crate::errors::AppError;
use crate::hierarchy::{IntegrityIssue, TreeIndex};
use crate::menus::{
    static_navigation, MenuAuthorizationResolver, MenuIdSet, NavEntry, NavigationNode,
};
use crate::models::{Menu, Role};
use crate::session::Session;
use crate::AppState;

/// Sidebar contents for the session's role.
#[derive(Debug, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Navigation {
    /// Built from the backend's menu tree and the role's assignment.
    Dynamic {
        menus: Vec<NavigationNode>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        issues: Vec<IntegrityIssue>,
    },
    /// Built-in entries used when the menu system is unavailable.
    Static { entries: &'static [NavEntry] },
}

/// GET /api/navigation - Visible menu tree for the session's role.
pub async fn get_navigation(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Navigation> {
    match dynamic_navigation(&state, &session).await {
        Ok(navigation) => success(navigation),
        Err(err @ AppError::Unauthorized(_)) => Err(err),
        Err(err) => {
            tracing::warn!(
                "Menu system unavailable for role {} ({}), using static navigation",
                session.role,
                err
            );
            success(Navigation::Static {
                entries: static_navigation(&session.role),
            })
        }
    }
}

async fn dynamic_navigation(state: &AppState, session: &Session) -> Result<Navigation, AppError> {
    let index = menu_index(state, session).await?;
    let roles = checked(state, session, state.backend.list_roles(&session.token).await).await?;
    let role = roles
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(session.role.as_str()));
    // A role the menu system does not define has nothing assigned.
    let allowed = match role {
        Some(role) => {
            checked(
                state,
                session,
                state.backend.role_menus(&session.token, role.id).await,
            )
            .await?
        }
        None => {
            tracing::warn!("Role {} is not defined in the menu system", session.role);
            MenuIdSet::new()
        }
    };

    let resolver = MenuAuthorizationResolver::new(&index);
    let unknown = resolver.unknown_ids(&allowed);
    if !unknown.is_empty() {
        tracing::warn!(
            "Role {} is assigned unknown menus {:?}",
            session.role,
            unknown
        );
    }
    Ok(Navigation::Dynamic {
        menus: resolver.visible_tree(&allowed),
        issues: index.issues().to_vec(),
    })
}

/// GET /api/roles - List roles.
pub async fn list_roles(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<Role>> {
    let roles = checked(&state, &session, state.backend.list_roles(&session.token).await).await?;
    success(roles)
}

/// Fetch the menu tree and index it.
pub(crate) async fn menu_index(
    state: &AppState,
    session: &Session,
) -> Result<TreeIndex<Menu>, AppError> {
    let menus = checked(state, session, state.backend.menu_tree(&session.token).await).await?;
    let index = TreeIndex::build(menus);
    for issue in index.issues() {
        tracing::warn!("Menu hierarchy issue: {:?}", issue);
    }
    Ok(index)
}
