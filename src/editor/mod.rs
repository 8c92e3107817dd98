//! Role-menu assignment editing state, one editor per console session.
//!
//! Selecting a role issues a ticket; the assignment fetched for that
//! selection is only applied if the ticket is still current, so a slow answer
//! for a previously selected role never overwrites the role shown now.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::menus::{MenuAuthorizationResolver, MenuIdSet};

/// Proof of which selection a fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionTicket {
    pub role_id: i64,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer selection was made while the fetch was in flight.
    Stale,
}

/// Serializable view of an editor.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EditorSnapshot {
    pub role_id: Option<i64>,
    pub loading: bool,
    pub dirty: bool,
    pub checked: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct RoleMenuEditor {
    generation: u64,
    selected_role: Option<i64>,
    loading: bool,
    dirty: bool,
    checked: MenuIdSet,
}

impl RoleMenuEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_role(&self) -> Option<i64> {
        self.selected_role
    }

    pub fn checked(&self) -> &MenuIdSet {
        &self.checked
    }

    /// Switch to `role_id`. Unsaved edits of the previous role are dropped.
    pub fn select_role(&mut self, role_id: i64) -> SelectionTicket {
        if self.dirty {
            tracing::info!(
                "Discarding unsaved menu edits for role {:?}",
                self.selected_role
            );
        }
        self.generation += 1;
        self.selected_role = Some(role_id);
        self.loading = true;
        self.dirty = false;
        self.checked.clear();
        SelectionTicket {
            role_id,
            generation: self.generation,
        }
    }

    /// Apply the fetched assignment for `ticket`. Results for superseded
    /// tickets are dropped, errors included. A failed fetch for the current
    /// selection leaves an empty set and is returned to the caller.
    pub fn apply_loaded(
        &mut self,
        ticket: SelectionTicket,
        fetched: Result<MenuIdSet, AppError>,
    ) -> Result<LoadOutcome, AppError> {
        if ticket.generation != self.generation {
            tracing::warn!(
                "Discarding stale menu assignment for role {} (now editing {:?})",
                ticket.role_id,
                self.selected_role
            );
            return Ok(LoadOutcome::Stale);
        }
        self.loading = false;
        match fetched {
            Ok(ids) => {
                self.checked = ids;
                Ok(LoadOutcome::Applied)
            }
            Err(err) => {
                self.checked.clear();
                Err(err)
            }
        }
    }

    /// Check or uncheck one menu for the selected role.
    pub fn toggle(&mut self, menu_id: i64, checked: bool) -> Result<(), AppError> {
        self.require_ready()?;
        let next = MenuAuthorizationResolver::toggle(&self.checked, menu_id, checked);
        if next != self.checked {
            self.checked = next;
            self.dirty = true;
        }
        Ok(())
    }

    /// Role and complete set to commit.
    pub fn pending_commit(&self) -> Result<(i64, MenuIdSet), AppError> {
        let role_id = self.require_ready()?;
        Ok((role_id, self.checked.clone()))
    }

    /// Mark `saved` as persisted for `role_id`, unless the editor has moved on.
    pub fn mark_saved(&mut self, role_id: i64, saved: &MenuIdSet) {
        if self.selected_role == Some(role_id) && &self.checked == saved {
            self.dirty = false;
        }
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            role_id: self.selected_role,
            loading: self.loading,
            dirty: self.dirty,
            checked: self.checked.iter().copied().collect(),
        }
    }

    fn require_ready(&self) -> Result<i64, AppError> {
        let role_id = self
            .selected_role
            .ok_or_else(|| AppError::Validation("Select a role first".to_string()))?;
        if self.loading {
            return Err(AppError::Conflict(format!(
                "Menu assignment for role {} is still loading",
                role_id
            )));
        }
        Ok(role_id)
    }
}

/// Editors keyed by console session id.
#[derive(Debug, Default)]
pub struct EditorRegistry {
    editors: Mutex<HashMap<String, RoleMenuEditor>>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the session's editor, creating it on first use. The
    /// lock is released before returning; never hold it across a backend call.
    pub async fn with<R>(&self, session_id: &str, f: impl FnOnce(&mut RoleMenuEditor) -> R) -> R {
        let mut editors = self.editors.lock().await;
        let editor = editors.entry(session_id.to_string()).or_default();
        f(editor)
    }

    pub async fn remove(&self, session_id: &str) {
        self.editors.lock().await.remove(session_id);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.editors.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> MenuIdSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_late_response_for_previous_role_is_discarded() {
        let mut editor = RoleMenuEditor::new();
        let sales = editor.select_role(1);
        let engineer = editor.select_role(2);

        assert_eq!(
            editor.apply_loaded(engineer, Ok(set(&[10]))).unwrap(),
            LoadOutcome::Applied
        );
        assert_eq!(
            editor.apply_loaded(sales, Ok(set(&[5, 6]))).unwrap(),
            LoadOutcome::Stale
        );

        assert_eq!(editor.selected_role(), Some(2));
        assert_eq!(editor.checked(), &set(&[10]));
    }

    #[test]
    fn test_stale_error_is_swallowed() {
        let mut editor = RoleMenuEditor::new();
        let first = editor.select_role(1);
        let second = editor.select_role(2);
        editor.apply_loaded(second, Ok(set(&[3]))).unwrap();

        let outcome = editor.apply_loaded(first, Err(AppError::Network("timeout".into())));
        assert_eq!(outcome.unwrap(), LoadOutcome::Stale);
        assert_eq!(editor.checked(), &set(&[3]));
    }

    #[test]
    fn test_failed_load_leaves_empty_set() {
        let mut editor = RoleMenuEditor::new();
        let ticket = editor.select_role(4);
        assert!(editor
            .apply_loaded(ticket, Err(AppError::Network("down".into())))
            .is_err());
        assert!(editor.checked().is_empty());
        assert!(!editor.snapshot().loading);
    }

    #[test]
    fn test_new_role_with_no_assignment_is_empty_not_error() {
        let mut editor = RoleMenuEditor::new();
        let ticket = editor.select_role(9);
        editor.apply_loaded(ticket, Ok(MenuIdSet::new())).unwrap();
        assert_eq!(editor.pending_commit().unwrap(), (9, MenuIdSet::new()));
    }

    #[test]
    fn test_toggle_requires_loaded_selection() {
        let mut editor = RoleMenuEditor::new();
        assert!(matches!(editor.toggle(1, true), Err(AppError::Validation(_))));

        let ticket = editor.select_role(1);
        assert!(matches!(editor.toggle(1, true), Err(AppError::Conflict(_))));

        editor.apply_loaded(ticket, Ok(set(&[1]))).unwrap();
        editor.toggle(2, true).unwrap();
        editor.toggle(1, false).unwrap();
        let snapshot = editor.snapshot();
        assert!(snapshot.dirty);
        assert_eq!(snapshot.checked, vec![2]);
    }

    #[test]
    fn test_switching_role_discards_unsaved_edits() {
        let mut editor = RoleMenuEditor::new();
        let ticket = editor.select_role(1);
        editor.apply_loaded(ticket, Ok(set(&[1]))).unwrap();
        editor.toggle(2, true).unwrap();

        let ticket = editor.select_role(1);
        editor.apply_loaded(ticket, Ok(set(&[1]))).unwrap();
        assert_eq!(editor.checked(), &set(&[1]));
        assert!(!editor.snapshot().dirty);
    }

    #[test]
    fn test_mark_saved_only_when_unchanged() {
        let mut editor = RoleMenuEditor::new();
        let ticket = editor.select_role(1);
        editor.apply_loaded(ticket, Ok(MenuIdSet::new())).unwrap();
        editor.toggle(3, true).unwrap();

        let (role_id, saved) = editor.pending_commit().unwrap();
        editor.toggle(4, true).unwrap();
        editor.mark_saved(role_id, &saved);
        assert!(editor.snapshot().dirty);

        let (role_id, saved) = editor.pending_commit().unwrap();
        editor.mark_saved(role_id, &saved);
        assert!(!editor.snapshot().dirty);
    }

    #[tokio::test]
    async fn test_registry_isolates_sessions() {
        let registry = EditorRegistry::new();
        registry.with("a", |e| e.select_role(1)).await;
        let b_role = registry.with("b", |e| e.selected_role()).await;
        assert_eq!(b_role, None);

        registry.remove("a").await;
        let a_role = registry.with("a", |e| e.selected_role()).await;
        assert_eq!(a_role, None);
    }
}
