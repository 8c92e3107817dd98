//! Static per-role navigation, used when the dynamic menu API is unavailable.

use serde::Serialize;

use crate::models::ConsoleRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub name: &'static str,
    pub path: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

const fn entry(name: &'static str, path: &'static str) -> NavEntry {
    NavEntry {
        name,
        path,
        description: None,
    }
}

const SUPERADMIN: &[NavEntry] = &[
    entry("Account Management", "/dashboard/manage-accounts"),
    entry("Company Organization", "/dashboard/definitions/companies"),
    entry("All Customers", "/dashboard/definitions/customers"),
    entry("System Log", "/dashboard/system-log"),
];

const COMPANY_ADMIN: &[NavEntry] = &[
    entry("Account Management", "/dashboard/manage-accounts"),
    entry("Company Organization", "/dashboard/companies"),
    entry("Customer Management", "/dashboard/customers"),
];

const SALES: &[NavEntry] = &[
    entry("Quotes", "/dashboard/quotes"),
    entry("Customers", "/dashboard/customers"),
    entry("Shipment Tracking", "/dashboard/shipments"),
];

const ENGINEER: &[NavEntry] = &[
    entry("Specification Review", "/dashboard/spec-review"),
    entry("Production Tracking", "/dashboard/production"),
];

/// Navigation for a role from the built-in map. Roles without an entry get an
/// empty list and a warning.
pub fn static_navigation(role: &ConsoleRole) -> &'static [NavEntry] {
    match role {
        ConsoleRole::Superadmin => SUPERADMIN,
        ConsoleRole::CompanyAdmin => COMPANY_ADMIN,
        ConsoleRole::Sales => SALES,
        ConsoleRole::Engineer => ENGINEER,
        ConsoleRole::Other(name) => {
            tracing::warn!("No static navigation configured for role {:?}", name);
            &[]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_roles_have_entries() {
        for role in [
            ConsoleRole::Superadmin,
            ConsoleRole::CompanyAdmin,
            ConsoleRole::Sales,
            ConsoleRole::Engineer,
        ] {
            assert!(!static_navigation(&role).is_empty(), "{} has no entries", role);
        }
    }

    #[test]
    fn test_unknown_role_degrades_to_empty() {
        assert!(static_navigation(&ConsoleRole::Other("auditor".into())).is_empty());
    }

    #[test]
    fn test_sales_paths() {
        let paths: Vec<&str> = static_navigation(&ConsoleRole::Sales)
            .iter()
            .map(|e| e.path)
            .collect();
        assert_eq!(
            paths,
            vec!["/dashboard/quotes", "/dashboard/customers", "/dashboard/shipments"]
        );
    }
}
