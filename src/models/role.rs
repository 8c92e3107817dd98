//! Roles and role-to-menu assignments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A role as listed by `/api/roles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: String,
}

/// The role string carried in a session.
///
/// Known roles get their own variant; anything else is kept verbatim so a
/// newly introduced backend role still round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConsoleRole {
    Superadmin,
    CompanyAdmin,
    Sales,
    Engineer,
    Other(String),
}

impl ConsoleRole {
    pub fn as_str(&self) -> &str {
        match self {
            ConsoleRole::Superadmin => "superadmin",
            ConsoleRole::CompanyAdmin => "company_admin",
            ConsoleRole::Sales => "sales",
            ConsoleRole::Engineer => "engineer",
            ConsoleRole::Other(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "superadmin" => ConsoleRole::Superadmin,
            "company_admin" => ConsoleRole::CompanyAdmin,
            "sales" => ConsoleRole::Sales,
            "engineer" => ConsoleRole::Engineer,
            other => ConsoleRole::Other(other.to_string()),
        }
    }

    /// Roles allowed into account management.
    pub fn can_manage_accounts(&self) -> bool {
        matches!(self, ConsoleRole::Superadmin | ConsoleRole::CompanyAdmin)
    }
}

impl From<String> for ConsoleRole {
    fn from(value: String) -> Self {
        ConsoleRole::parse(&value)
    }
}

impl From<ConsoleRole> for String {
    fn from(value: ConsoleRole) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ConsoleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of a `/api/role-menus?role_id=` response.
///
/// Backend versions disagree on the shape: bare ids, full menu objects, or
/// assignment rows. `menu_id` is tried before `id` so assignment rows are not
/// mistaken for menus.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleMenuEntry {
    Id(i64),
    Assignment { menu_id: i64 },
    Menu { id: i64 },
}

impl RoleMenuEntry {
    pub fn menu_id(&self) -> i64 {
        match self {
            RoleMenuEntry::Id(id) => *id,
            RoleMenuEntry::Assignment { menu_id } => *menu_id,
            RoleMenuEntry::Menu { id } => *id,
        }
    }
}

/// Full `/api/role-menus` response body in any of the known shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RoleMenusResponse {
    List(Vec<RoleMenuEntry>),
    Wrapped { menu_ids: Vec<i64> },
}

impl RoleMenusResponse {
    /// Collapse every shape into a plain id set.
    pub fn into_menu_ids(self) -> BTreeSet<i64> {
        match self {
            RoleMenusResponse::List(entries) => {
                entries.iter().map(RoleMenuEntry::menu_id).collect()
            }
            RoleMenusResponse::Wrapped { menu_ids } => menu_ids.into_iter().collect(),
        }
    }
}

/// Replace-all commit body for `POST /api/role-menus`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitRoleMenusRequest {
    pub role_id: i64,
    pub menu_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: serde_json::Value) -> Vec<i64> {
        let response: RoleMenusResponse = serde_json::from_value(value).unwrap();
        response.into_menu_ids().into_iter().collect()
    }

    #[test]
    fn test_bare_id_array() {
        assert_eq!(normalize(json!([5, 6, 5])), vec![5, 6]);
    }

    #[test]
    fn test_full_menu_objects() {
        let body = json!([
            { "id": 6, "name": "Quotes", "path": "/dashboard/quotes", "is_active": false },
            { "id": 5, "name": "Customers", "path": "/dashboard/customers", "is_active": true }
        ]);
        assert_eq!(normalize(body), vec![5, 6]);
    }

    #[test]
    fn test_assignment_rows_prefer_menu_id() {
        let body = json!([{ "id": 100, "role_id": 2, "menu_id": 7 }]);
        assert_eq!(normalize(body), vec![7]);
    }

    #[test]
    fn test_wrapped_and_empty() {
        assert_eq!(normalize(json!({ "menu_ids": [3, 1] })), vec![1, 3]);
        assert!(normalize(json!([])).is_empty());
    }

    #[test]
    fn test_role_round_trip() {
        let role: ConsoleRole = serde_json::from_value(json!("company_admin")).unwrap();
        assert_eq!(role, ConsoleRole::CompanyAdmin);
        assert!(role.can_manage_accounts());

        let custom: ConsoleRole = serde_json::from_value(json!("auditor")).unwrap();
        assert_eq!(custom, ConsoleRole::Other("auditor".to_string()));
        assert!(!custom.can_manage_accounts());
        assert_eq!(serde_json::to_value(&custom).unwrap(), json!("auditor"));
    }
}
