//! Role-based menu visibility.
//!
//! Two read views are built over the same menu index:
//! - the navigation view shown to an end user, strictly filtered by the
//!   role's assignment and the menu's active flag;
//! - the editing view shown to an admin, listing every reachable menu with a
//!   checked flag.

mod fallback;
mod icons;

pub use fallback::*;
pub use icons::*;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::errors::AppError;
use crate::hierarchy::TreeIndex;
use crate::models::{Menu, MenuRequest};

/// Menu ids assigned to one role.
pub type MenuIdSet = BTreeSet<i64>;

/// A menu entry as rendered in the navigation sidebar.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavigationNode {
    pub id: i64,
    pub name: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<MenuIcon>,
    pub children: Vec<NavigationNode>,
}

/// A menu entry as rendered in the role assignment editor.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EditableMenuNode {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub is_active: bool,
    pub checked: bool,
    pub children: Vec<EditableMenuNode>,
}

/// Resolves a role's assignment against the menu hierarchy.
pub struct MenuAuthorizationResolver<'a> {
    menus: &'a TreeIndex<Menu>,
}

impl<'a> MenuAuthorizationResolver<'a> {
    pub fn new(menus: &'a TreeIndex<Menu>) -> Self {
        Self { menus }
    }

    /// Navigation tree for a role. A node is shown only if it is assigned and
    /// active; an excluded node hides its whole subtree, even assigned
    /// descendants.
    pub fn visible_tree(&self, allowed: &MenuIdSet) -> Vec<NavigationNode> {
        self.visible_level(self.menus.roots(), allowed)
    }

    fn visible_level(&self, ids: &[i64], allowed: &MenuIdSet) -> Vec<NavigationNode> {
        ids.iter()
            .filter(|id| allowed.contains(*id))
            .filter_map(|id| self.menus.get(*id))
            .filter(|menu| menu.is_active)
            .map(|menu| NavigationNode {
                id: menu.id,
                name: menu.name.clone(),
                path: menu.path.clone(),
                icon: menu.icon.as_deref().and_then(MenuIcon::from_key),
                children: self.visible_level(self.menus.children_of(menu.id), allowed),
            })
            .collect()
    }

    /// Editing tree: every menu reachable from a root, active or not, with
    /// `checked` reflecting the set. Ids in `checked` that are not in the
    /// index are never rendered.
    pub fn editing_tree(&self, checked: &MenuIdSet) -> Vec<EditableMenuNode> {
        self.editing_level(self.menus.roots(), checked)
    }

    fn editing_level(&self, ids: &[i64], checked: &MenuIdSet) -> Vec<EditableMenuNode> {
        ids.iter()
            .filter_map(|id| self.menus.get(*id))
            .map(|menu| EditableMenuNode {
                id: menu.id,
                name: menu.name.clone(),
                path: menu.path.clone(),
                is_active: menu.is_active,
                checked: checked.contains(&menu.id),
                children: self.editing_level(self.menus.children_of(menu.id), checked),
            })
            .collect()
    }

    /// Assigned ids the menu index does not know about.
    pub fn unknown_ids(&self, checked: &MenuIdSet) -> Vec<i64> {
        checked
            .iter()
            .filter(|id| !self.menus.contains(**id))
            .copied()
            .collect()
    }

    /// Only menus in the index may be checked. Unchecking is always allowed
    /// so stale ids can be cleared from an assignment.
    pub fn ensure_checkable(&self, menu_id: i64, checked: bool) -> Result<(), AppError> {
        if checked && !self.menus.contains(menu_id) {
            tracing::warn!("Refusing to assign unknown menu {}", menu_id);
            return Err(AppError::Validation(format!(
                "Menu {} does not exist",
                menu_id
            )));
        }
        Ok(())
    }

    /// Checks for the menu form: a name and a path, and a parent that exists
    /// and is not the edited menu or below it.
    pub fn validate_menu(
        &self,
        editing: Option<i64>,
        request: &MenuRequest,
    ) -> Result<(), AppError> {
        if request.name.trim().is_empty() || request.path.trim().is_empty() {
            return Err(AppError::Validation(
                "Menu name and path are required".to_string(),
            ));
        }
        let Some(parent) = request.parent_id else {
            return Ok(());
        };
        if !self.menus.contains(parent) {
            return Err(AppError::Validation(format!(
                "Parent menu {} does not exist",
                parent
            )));
        }
        if editing.is_some_and(|id| id == parent || self.menus.is_within(id, parent)) {
            return Err(AppError::Validation(format!(
                "Menu {} cannot be placed below itself",
                parent
            )));
        }
        Ok(())
    }

    /// A menu can only be removed once it has no submenus.
    pub fn validate_menu_removal(&self, id: i64) -> Result<(), AppError> {
        if !self.menus.contains(id) {
            return Err(AppError::NotFound(format!("Menu {} not found", id)));
        }
        if !self.menus.children_of(id).is_empty() {
            return Err(AppError::Validation(format!(
                "Menu {} still has submenus",
                id
            )));
        }
        Ok(())
    }

    /// Check or uncheck a single menu. Parents and children are left alone.
    pub fn toggle(state: &MenuIdSet, menu_id: i64, checked: bool) -> MenuIdSet {
        let mut next = state.clone();
        if checked {
            next.insert(menu_id);
        } else {
            next.remove(&menu_id);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(id: i64, parent_id: Option<i64>, is_active: bool) -> Menu {
        Menu {
            id,
            name: format!("menu-{}", id),
            path: format!("/dashboard/m{}", id),
            icon: None,
            parent_id,
            order_no: None,
            is_active,
            children: Vec::new(),
        }
    }

    fn ids(nodes: &[NavigationNode]) -> Vec<i64> {
        nodes.iter().map(|n| n.id).collect()
    }

    fn set(ids: &[i64]) -> MenuIdSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_inactive_menu_hidden_in_navigation_but_checked_in_editor() {
        let index = TreeIndex::build(vec![
            menu(5, None, true),
            menu(6, None, false),
            menu(7, None, true),
        ]);
        let resolver = MenuAuthorizationResolver::new(&index);
        let allowed = set(&[5, 6]);

        assert_eq!(ids(&resolver.visible_tree(&allowed)), vec![5]);

        let editing = resolver.editing_tree(&allowed);
        let flags: Vec<(i64, bool, bool)> = editing
            .iter()
            .map(|n| (n.id, n.is_active, n.checked))
            .collect();
        assert_eq!(
            flags,
            vec![(5, true, true), (6, false, true), (7, true, false)]
        );
    }

    #[test]
    fn test_excluded_parent_hides_assigned_child() {
        let index = TreeIndex::build(vec![
            menu(1, None, true),
            menu(2, Some(1), true),
            menu(3, None, true),
            menu(4, Some(3), true),
            menu(5, Some(3), true),
        ]);
        let resolver = MenuAuthorizationResolver::new(&index);
        let tree = resolver.visible_tree(&set(&[2, 3, 5]));

        assert_eq!(ids(&tree), vec![3]);
        assert_eq!(ids(&tree[0].children), vec![5]);
    }

    #[test]
    fn test_empty_assignment_shows_nothing() {
        let index = TreeIndex::build(vec![menu(1, None, true)]);
        let resolver = MenuAuthorizationResolver::new(&index);
        assert!(resolver.visible_tree(&MenuIdSet::new()).is_empty());
        assert_eq!(resolver.editing_tree(&MenuIdSet::new()).len(), 1);
    }

    #[test]
    fn test_toggle_does_not_cascade() {
        let state = set(&[1]);
        let checked = MenuAuthorizationResolver::toggle(&state, 2, true);
        assert_eq!(checked, set(&[1, 2]));
        assert_eq!(state, set(&[1]));

        let unchecked = MenuAuthorizationResolver::toggle(&checked, 1, false);
        assert_eq!(unchecked, set(&[2]));

        let again = MenuAuthorizationResolver::toggle(&unchecked, 2, true);
        assert_eq!(again, unchecked);
    }

    #[test]
    fn test_phantom_ids_are_reported_not_rendered() {
        let index = TreeIndex::build(vec![menu(1, None, true)]);
        let resolver = MenuAuthorizationResolver::new(&index);
        let assignment = set(&[1, 99]);
        assert_eq!(ids(&resolver.visible_tree(&assignment)), vec![1]);
        assert_eq!(resolver.unknown_ids(&assignment), vec![99]);
    }

    #[test]
    fn test_only_known_menus_can_be_checked() {
        let index = TreeIndex::build(vec![menu(1, None, true)]);
        let resolver = MenuAuthorizationResolver::new(&index);

        assert!(resolver.ensure_checkable(1, true).is_ok());
        assert!(matches!(
            resolver.ensure_checkable(99, true),
            Err(AppError::Validation(_))
        ));
        assert!(resolver.ensure_checkable(99, false).is_ok());
    }

    #[test]
    fn test_validate_menu() {
        let index = TreeIndex::build(vec![
            menu(1, None, true),
            menu(2, Some(1), true),
            menu(3, Some(2), true),
        ]);
        let resolver = MenuAuthorizationResolver::new(&index);
        let request = |name: &str, path: &str, parent_id: Option<i64>| MenuRequest {
            name: name.to_string(),
            path: path.to_string(),
            icon: None,
            parent_id,
            order_no: None,
            is_active: true,
        };

        assert!(resolver.validate_menu(None, &request("Quotes", "/q", Some(3))).is_ok());
        assert!(resolver.validate_menu(Some(2), &request("Moved", "/m", None)).is_ok());

        for (editing, req) in [
            (None, request("", "/q", None)),
            (None, request("Quotes", " ", None)),
            (None, request("Ghost", "/g", Some(42))),
            (Some(2), request("Self", "/s", Some(2))),
            (Some(1), request("Loop", "/l", Some(3))),
        ] {
            assert!(matches!(
                resolver.validate_menu(editing, &req),
                Err(AppError::Validation(_))
            ));
        }

        assert!(resolver.validate_menu_removal(3).is_ok());
        assert!(matches!(
            resolver.validate_menu_removal(2),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolver.validate_menu_removal(8),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_icon_key_resolved() {
        let mut users = menu(1, None, true);
        users.icon = Some("users".to_string());
        let mut mystery = menu(2, None, true);
        mystery.icon = Some("sparkle-unicorn".to_string());
        let index = TreeIndex::build(vec![users, mystery]);
        let tree = MenuAuthorizationResolver::new(&index).visible_tree(&set(&[1, 2]));
        assert_eq!(tree[0].icon, Some(MenuIcon::Users));
        assert_eq!(tree[1].icon, None);
    }
}
