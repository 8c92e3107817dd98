//! Login accounts managed through `/api/manage-accounts`.

use serde::{Deserialize, Serialize};

use super::ConsoleRole;

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub role: ConsoleRole,
    #[serde(default)]
    pub company_id: Option<i64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Request body for creating an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: ConsoleRole,
    #[serde(default)]
    pub company_id: Option<i64>,
}

/// Request body for changing an account's role or disabling it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAccountRequest {
    pub role: ConsoleRole,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Request body for setting a new password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
}

fn default_role() -> ConsoleRole {
    ConsoleRole::Sales
}

fn default_active() -> bool {
    true
}

/// Credentials forwarded to `/api/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful `/api/login` answer.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: ConsoleRole,
    #[serde(default)]
    pub company_id: Option<i64>,
}

/// Admin roles first, then by id.
pub fn sort_accounts(accounts: &mut [Account]) {
    accounts.sort_by_key(|a| (!a.role.can_manage_accounts(), a.id));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: i64, role: ConsoleRole) -> Account {
        Account {
            id,
            username: format!("user{}", id),
            role,
            company_id: Some(1),
            is_active: true,
        }
    }

    #[test]
    fn test_admins_sort_first() {
        let mut accounts = vec![
            account(1, ConsoleRole::Sales),
            account(4, ConsoleRole::CompanyAdmin),
            account(2, ConsoleRole::Engineer),
            account(3, ConsoleRole::Superadmin),
        ];
        sort_accounts(&mut accounts);
        let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![3, 4, 1, 2]);
    }

    #[test]
    fn test_account_without_active_flag_is_active() {
        let account: Account =
            serde_json::from_str(r#"{"id": 7, "username": "kim", "role": "engineer"}"#).unwrap();
        assert!(account.is_active);
        assert_eq!(account.company_id, None);
    }
}
