//! Customer API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{checked, success, ApiResult};
use crate::models::{Customer, CustomerRequest};
use crate::session::Session;
use crate::AppState;

/// GET /api/customers - List customers.
pub async fn list_customers(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Vec<Customer>> {
    let customers = checked(
        &state,
        &session,
        state.backend.list_customers(&session.token).await,
    )
    .await?;
    success(customers)
}

/// GET /api/customers/{id} - Get a single customer.
pub async fn get_customer(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<Customer> {
    let customer = checked(
        &state,
        &session,
        state.backend.get_customer(&session.token, id).await,
    )
    .await?;
    success(customer)
}

/// POST /api/customers - Create a customer.
pub async fn create_customer(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<Customer> {
    let request = request.normalized()?;
    let customer = checked(
        &state,
        &session,
        state.backend.create_customer(&session.token, &request).await,
    )
    .await?;
    tracing::info!("Created customer {}", request.group_customer_code);
    success(customer)
}

/// PUT /api/customers/{id} - Update a customer.
pub async fn update_customer(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(request): Json<CustomerRequest>,
) -> ApiResult<Customer> {
    let request = request.normalized()?;
    let customer = checked(
        &state,
        &session,
        state
            .backend
            .update_customer(&session.token, id, &request)
            .await,
    )
    .await?;
    success(customer)
}

/// DELETE /api/customers/{id} - Delete a customer.
pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    checked(
        &state,
        &session,
        state.backend.delete_customer(&session.token, id).await,
    )
    .await?;
    tracing::info!("Deleted customer {}", id);
    success(())
}
