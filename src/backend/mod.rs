//! HTTP client for the quoting backend.
//!
//! Every call except login carries the session's bearer token. Response
//! shapes that differ between backend versions are normalized here, before
//! anything reaches the resolvers.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::AppError;
use crate::menus::MenuIdSet;
use crate::models::{
    Account, CommitRoleMenusRequest, Company, CompanyRequest, CreateAccountRequest, Customer,
    CustomerRequest, LoginRequest, LoginResponse, Menu, MenuRequest, ResetPasswordRequest, Role,
    RoleMenusResponse, UpdateAccountRequest,
};

/// Error body returned by the backend.
#[derive(Debug, Default, Deserialize)]
struct BackendErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Client for the quoting backend REST API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    retry_backoff: Duration,
}

impl BackendClient {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        retry_backoff: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            retry_backoff,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ==================== SESSION ====================

    /// POST /api/login
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, AppError> {
        let response = self
            .http
            .post(self.url("/api/login"))
            .json(credentials)
            .send()
            .await?;
        match decode(response).await {
            Err(AppError::Unauthorized(_)) => Err(AppError::Unauthorized(
                "Invalid username or password".to_string(),
            )),
            other => other,
        }
    }

    // ==================== COMPANIES ====================

    /// GET /api/definitions/companies (flat or nested)
    pub async fn list_companies(&self, token: &str) -> Result<Vec<Company>, AppError> {
        self.get_json(token, "/api/definitions/companies").await
    }

    /// POST /api/definitions/companies
    pub async fn create_company(
        &self,
        token: &str,
        request: &CompanyRequest,
    ) -> Result<Company, AppError> {
        let builder = self.authed(Method::POST, token, "/api/definitions/companies");
        decode(builder.json(request).send().await?).await
    }

    /// PUT /api/definitions/companies/{id}
    pub async fn update_company(
        &self,
        token: &str,
        id: i64,
        request: &CompanyRequest,
    ) -> Result<Company, AppError> {
        let path = format!("/api/definitions/companies/{}", id);
        let builder = self.authed(Method::PUT, token, &path);
        decode(builder.json(request).send().await?).await
    }

    /// DELETE /api/definitions/companies/{id}
    pub async fn delete_company(&self, token: &str, id: i64) -> Result<(), AppError> {
        let path = format!("/api/definitions/companies/{}", id);
        expect_success(self.authed(Method::DELETE, token, &path).send().await?).await?;
        Ok(())
    }

    // ==================== MENUS & ROLES ====================

    /// GET /api/menus/tree (flat or nested)
    pub async fn menu_tree(&self, token: &str) -> Result<Vec<Menu>, AppError> {
        self.get_json(token, "/api/menus/tree").await
    }

    /// GET /api/menus (flat)
    pub async fn list_menus(&self, token: &str) -> Result<Vec<Menu>, AppError> {
        self.get_json(token, "/api/menus").await
    }

    /// POST /api/menus
    pub async fn create_menu(&self, token: &str, request: &MenuRequest) -> Result<Menu, AppError> {
        let builder = self.authed(Method::POST, token, "/api/menus");
        decode(builder.json(request).send().await?).await
    }

    /// PUT /api/menus/{id}
    pub async fn update_menu(
        &self,
        token: &str,
        id: i64,
        request: &MenuRequest,
    ) -> Result<Menu, AppError> {
        let path = format!("/api/menus/{}", id);
        let builder = self.authed(Method::PUT, token, &path);
        decode(builder.json(request).send().await?).await
    }

    /// DELETE /api/menus/{id}
    pub async fn delete_menu(&self, token: &str, id: i64) -> Result<(), AppError> {
        let path = format!("/api/menus/{}", id);
        expect_success(self.authed(Method::DELETE, token, &path).send().await?).await?;
        Ok(())
    }

    /// GET /api/roles
    pub async fn list_roles(&self, token: &str) -> Result<Vec<Role>, AppError> {
        self.get_json(token, "/api/roles").await
    }

    /// GET /api/role-menus?role_id= normalized to an id set. A role with no
    /// assignment yields an empty set.
    pub async fn role_menus(&self, token: &str, role_id: i64) -> Result<MenuIdSet, AppError> {
        let path = format!("/api/role-menus?role_id={}", role_id);
        let response: Option<RoleMenusResponse> = self.get_json(token, &path).await?;
        Ok(response
            .map(RoleMenusResponse::into_menu_ids)
            .unwrap_or_default())
    }

    /// POST /api/role-menus with the complete set for the role. The backend
    /// replaces the role's assignment. Never retried.
    pub async fn commit_role_menus(
        &self,
        token: &str,
        role_id: i64,
        menu_ids: &MenuIdSet,
    ) -> Result<(), AppError> {
        let body = CommitRoleMenusRequest {
            role_id,
            menu_ids: menu_ids.iter().copied().collect(),
        };
        let builder = self.authed(Method::POST, token, "/api/role-menus");
        expect_success(builder.json(&body).send().await?).await?;
        tracing::info!(
            "Committed {} menus for role {}",
            body.menu_ids.len(),
            role_id
        );
        Ok(())
    }

    // ==================== ACCOUNTS ====================

    /// GET /api/manage-accounts
    pub async fn list_accounts(&self, token: &str) -> Result<Vec<Account>, AppError> {
        self.get_json(token, "/api/manage-accounts").await
    }

    /// POST /api/manage-accounts
    pub async fn create_account(
        &self,
        token: &str,
        request: &CreateAccountRequest,
    ) -> Result<Account, AppError> {
        let builder = self.authed(Method::POST, token, "/api/manage-accounts");
        decode(builder.json(request).send().await?).await
    }

    /// PUT /api/manage-accounts/{id} with `{role, is_active}`
    pub async fn update_account(
        &self,
        token: &str,
        id: i64,
        request: &UpdateAccountRequest,
    ) -> Result<(), AppError> {
        let path = format!("/api/manage-accounts/{}", id);
        let builder = self.authed(Method::PUT, token, &path);
        expect_success(builder.json(request).send().await?).await?;
        Ok(())
    }

    /// PUT /api/manage-accounts/{id}/reset-password
    pub async fn reset_password(
        &self,
        token: &str,
        id: i64,
        request: &ResetPasswordRequest,
    ) -> Result<(), AppError> {
        let path = format!("/api/manage-accounts/{}/reset-password", id);
        let builder = self.authed(Method::PUT, token, &path);
        expect_success(builder.json(request).send().await?).await?;
        Ok(())
    }

    /// DELETE /api/manage-accounts/{id}
    pub async fn delete_account(&self, token: &str, id: i64) -> Result<(), AppError> {
        let path = format!("/api/manage-accounts/{}", id);
        expect_success(self.authed(Method::DELETE, token, &path).send().await?).await?;
        Ok(())
    }

    // ==================== CUSTOMERS ====================

    /// GET /api/definitions/customers
    pub async fn list_customers(&self, token: &str) -> Result<Vec<Customer>, AppError> {
        self.get_json(token, "/api/definitions/customers").await
    }

    /// GET /api/definitions/customers/{id}
    pub async fn get_customer(&self, token: &str, id: i64) -> Result<Customer, AppError> {
        self.get_json(token, &format!("/api/definitions/customers/{}", id))
            .await
    }

    /// POST /api/definitions/customers
    pub async fn create_customer(
        &self,
        token: &str,
        request: &CustomerRequest,
    ) -> Result<Customer, AppError> {
        let builder = self.authed(Method::POST, token, "/api/definitions/customers");
        decode(builder.json(request).send().await?).await
    }

    /// PUT /api/definitions/customers/{id}
    pub async fn update_customer(
        &self,
        token: &str,
        id: i64,
        request: &CustomerRequest,
    ) -> Result<Customer, AppError> {
        let path = format!("/api/definitions/customers/{}", id);
        let builder = self.authed(Method::PUT, token, &path);
        decode(builder.json(request).send().await?).await
    }

    /// DELETE /api/definitions/customers/{id}
    pub async fn delete_customer(&self, token: &str, id: i64) -> Result<(), AppError> {
        let path = format!("/api/definitions/customers/{}", id);
        expect_success(self.authed(Method::DELETE, token, &path).send().await?).await?;
        Ok(())
    }

    // ==================== PLUMBING ====================

    fn authed(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .bearer_auth(token)
    }

    /// GET with one retry after the configured backoff when the request
    /// never reached the backend. HTTP error statuses are not retried.
    async fn get_json<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, AppError> {
        match self.try_get(token, path).await {
            Err(AppError::Network(reason)) => {
                tracing::warn!(
                    "GET {} failed ({}), retrying in {:?}",
                    path,
                    reason,
                    self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.try_get(token, path).await
            }
            other => other,
        }
    }

    async fn try_get<T: DeserializeOwned>(&self, token: &str, path: &str) -> Result<T, AppError> {
        let response = self.authed(Method::GET, token, path).send().await?;
        decode(response).await
    }
}

/// Map the status to an error, or parse the body as `T`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
    let response = expect_success(response).await?;
    Ok(response.json::<T>().await?)
}

async fn expect_success(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(AppError::Unauthorized(
            "Backend rejected the session token".to_string(),
        ));
    }
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let parsed: BackendErrorBody = serde_json::from_str(&body).unwrap_or_default();
    let message = parsed
        .error
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
    tracing::warn!("Backend answered {}: {}", status, message);
    Err(AppError::Server {
        status: status.as_u16(),
        message,
    })
}
