//! Company scoping: which companies a caller may assign accounts to, and
//! which parents a company may be moved under.

mod form;

pub use form::*;

use std::collections::BTreeSet;

use crate::errors::AppError;
use crate::hierarchy::{FlatEntry, Flattened, TreeIndex};
use crate::models::{Account, Company, CompanyRequest, ConsoleRole, CreateAccountRequest};

pub struct CompanyScopeResolver<'a> {
    companies: &'a TreeIndex<Company>,
}

impl<'a> CompanyScopeResolver<'a> {
    pub fn new(companies: &'a TreeIndex<Company>) -> Self {
        Self { companies }
    }

    /// Companies the caller may pick, flattened for an indented select.
    ///
    /// A superadmin sees the whole forest. Everyone else sees their home
    /// company's subtree, levelled from the home company. A missing or zero
    /// home company yields nothing.
    pub fn selectable_companies(
        &self,
        role: &ConsoleRole,
        home_company_id: Option<i64>,
    ) -> Flattened<'a, Company> {
        if *role == ConsoleRole::Superadmin {
            return self.companies.flatten();
        }
        match home_company_id.filter(|id| *id != 0) {
            Some(home) => {
                if !self.companies.contains(home) {
                    tracing::warn!("Home company {} is not in the company list", home);
                }
                self.companies.flatten_from(home)
            }
            None => {
                tracing::warn!("Session for role {} has no home company", role);
                Flattened {
                    entries: Vec::new(),
                    issues: Vec::new(),
                }
            }
        }
    }

    pub fn selectable_ids(
        &self,
        role: &ConsoleRole,
        home_company_id: Option<i64>,
    ) -> BTreeSet<i64> {
        self.selectable_companies(role, home_company_id)
            .ids()
            .into_iter()
            .collect()
    }

    /// Parent choices for the company form. When editing company `C`, `C`
    /// and everything below it are left out.
    pub fn parent_options(&self, editing: Option<i64>) -> Vec<FlatEntry<'a, Company>> {
        let excluded = editing
            .map(|id| self.companies.descendant_ids(id))
            .unwrap_or_default();
        self.companies
            .flatten()
            .entries
            .into_iter()
            .filter(|e| !excluded.contains(&e.node.id))
            .collect()
    }

    /// Form checks run before anything is sent to the backend.
    pub fn validate_company(
        &self,
        editing: Option<i64>,
        request: &CompanyRequest,
    ) -> Result<(), AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("Company name is required".to_string()));
        }
        let Some(parent) = request.parent_id else {
            return Ok(());
        };
        if !self.companies.contains(parent) {
            return Err(AppError::Validation(format!(
                "Parent company {} does not exist",
                parent
            )));
        }
        if let Some(id) = editing {
            if id == parent {
                return Err(AppError::Validation(
                    "A company cannot be its own parent".to_string(),
                ));
            }
            if self.companies.is_within(id, parent) {
                return Err(AppError::Validation(format!(
                    "Company {} is below company {} and cannot become its parent",
                    parent, id
                )));
            }
        }
        Ok(())
    }

    /// Gate for creating an account: caller role, required fields, and the
    /// chosen company being inside the caller's scope.
    pub fn authorize_account(
        &self,
        role: &ConsoleRole,
        home_company_id: Option<i64>,
        request: &CreateAccountRequest,
    ) -> Result<(), AppError> {
        ensure_account_manager(role)?;
        let company_id = request.company_id.filter(|id| *id != 0);
        let Some(company_id) = company_id
            .filter(|_| !request.username.trim().is_empty() && !request.password.is_empty())
        else {
            return Err(AppError::Validation(
                "Username, password and company are required".to_string(),
            ));
        };
        if !self.selectable_ids(role, home_company_id).contains(&company_id) {
            return Err(AppError::Validation(format!(
                "Company {} is outside the companies you may assign",
                company_id
            )));
        }
        Ok(())
    }

    /// Gate for changing, resetting or deleting an existing account. Its
    /// company must be one the caller may assign.
    pub fn authorize_account_target(
        &self,
        role: &ConsoleRole,
        home_company_id: Option<i64>,
        account: &Account,
    ) -> Result<(), AppError> {
        ensure_account_manager(role)?;
        if *role == ConsoleRole::Superadmin {
            return Ok(());
        }
        let in_scope = account
            .company_id
            .is_some_and(|id| self.selectable_ids(role, home_company_id).contains(&id));
        if in_scope {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Account {} belongs to a company outside your scope",
                account.username
            )))
        }
    }

    /// A company can only be removed once nothing hangs below it.
    pub fn validate_company_removal(&self, id: i64) -> Result<(), AppError> {
        if !self.companies.contains(id) {
            return Err(AppError::NotFound(format!("Company {} not found", id)));
        }
        if !self.companies.children_of(id).is_empty() {
            return Err(AppError::Validation(format!(
                "Company {} still has child companies",
                id
            )));
        }
        Ok(())
    }
}

/// Only superadmins and company admins may manage accounts.
pub fn ensure_account_manager(role: &ConsoleRole) -> Result<(), AppError> {
    if role.can_manage_accounts() {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Role {} may not manage accounts",
            role
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn company(id: i64, parent_id: Option<i64>) -> Company {
        Company {
            id,
            name: format!("company-{}", id),
            parent_id,
            currency: None,
            language: None,
            created_at: None,
            updated_at: None,
            children: Vec::new(),
        }
    }

    pub(super) fn sample_index() -> TreeIndex<Company> {
        TreeIndex::build(vec![
            company(1, None),
            company(2, Some(1)),
            company(3, Some(2)),
            company(4, None),
            company(5, Some(4)),
        ])
    }

    fn account(company_id: Option<i64>) -> Account {
        Account {
            id: 9,
            username: "bob".to_string(),
            role: ConsoleRole::Sales,
            company_id,
            is_active: true,
        }
    }

    fn account_request(company_id: Option<i64>) -> CreateAccountRequest {
        CreateAccountRequest {
            username: "alice".to_string(),
            password: "secret".to_string(),
            role: ConsoleRole::Sales,
            company_id,
        }
    }

    #[test]
    fn test_superadmin_sees_everything_with_levels() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        let flattened = resolver.selectable_companies(&ConsoleRole::Superadmin, Some(2));
        let levels: Vec<(i64, usize)> = flattened
            .entries
            .iter()
            .map(|e| (e.node.id, e.level))
            .collect();
        assert_eq!(levels, vec![(1, 0), (2, 1), (3, 2), (4, 0), (5, 1)]);
    }

    #[test]
    fn test_scoped_role_sees_exactly_its_subtree() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        for home in 1..=5 {
            let ids = resolver.selectable_ids(&ConsoleRole::CompanyAdmin, Some(home));
            assert_eq!(ids, index.descendant_ids(home));
        }
        let ids = resolver.selectable_ids(&ConsoleRole::Sales, Some(2));
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_missing_home_company_yields_nothing() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        assert!(resolver
            .selectable_companies(&ConsoleRole::CompanyAdmin, None)
            .entries
            .is_empty());
        assert!(resolver
            .selectable_companies(&ConsoleRole::CompanyAdmin, Some(0))
            .entries
            .is_empty());
        assert!(resolver
            .selectable_companies(&ConsoleRole::CompanyAdmin, Some(77))
            .entries
            .is_empty());
    }

    #[test]
    fn test_parent_options_exclude_self_and_descendants() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        let ids: Vec<i64> = resolver
            .parent_options(Some(2))
            .iter()
            .map(|e| e.node.id)
            .collect();
        assert_eq!(ids, vec![1, 4, 5]);

        assert_eq!(resolver.parent_options(None).len(), 5);
    }

    #[test]
    fn test_validate_company() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        let request = |name: &str, parent_id: Option<i64>| CompanyRequest {
            name: name.to_string(),
            parent_id,
            currency: None,
            language: None,
        };

        assert!(resolver.validate_company(None, &request("New", Some(3))).is_ok());
        assert!(resolver.validate_company(Some(2), &request("Moved", Some(4))).is_ok());
        assert!(resolver.validate_company(Some(2), &request("Root", None)).is_ok());

        for (editing, req) in [
            (None, request("   ", None)),
            (Some(2), request("Self", Some(2))),
            (Some(2), request("Loop", Some(3))),
            (None, request("Ghost", Some(99))),
        ] {
            assert!(matches!(
                resolver.validate_company(editing, &req),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn test_account_gate() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);

        assert!(resolver
            .authorize_account(&ConsoleRole::CompanyAdmin, Some(2), &account_request(Some(3)))
            .is_ok());
        assert!(resolver
            .authorize_account(&ConsoleRole::Superadmin, None, &account_request(Some(5)))
            .is_ok());

        let admin = ConsoleRole::CompanyAdmin;
        assert!(matches!(
            resolver.authorize_account(&admin, Some(2), &account_request(Some(5))),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolver.authorize_account(&admin, Some(2), &account_request(None)),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolver.authorize_account(&ConsoleRole::Sales, Some(2), &account_request(Some(2))),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_existing_account_must_be_in_scope() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);
        let admin = ConsoleRole::CompanyAdmin;

        assert!(resolver
            .authorize_account_target(&admin, Some(2), &account(Some(3)))
            .is_ok());
        assert!(resolver
            .authorize_account_target(&ConsoleRole::Superadmin, Some(1), &account(None))
            .is_ok());

        for target in [account(Some(5)), account(Some(1)), account(None)] {
            assert!(matches!(
                resolver.authorize_account_target(&admin, Some(2), &target),
                Err(AppError::Forbidden(_))
            ));
        }
        assert!(matches!(
            resolver.authorize_account_target(&ConsoleRole::Engineer, Some(2), &account(Some(3))),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_only_leaf_companies_can_be_removed() {
        let index = sample_index();
        let resolver = CompanyScopeResolver::new(&index);

        assert!(resolver.validate_company_removal(3).is_ok());
        assert!(matches!(
            resolver.validate_company_removal(2),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            resolver.validate_company_removal(42),
            Err(AppError::NotFound(_))
        ));
    }
}
