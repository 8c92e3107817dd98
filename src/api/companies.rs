//! Company API endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use super::{checked, success, ApiResult};
use crate::errors::AppError;
use crate::hierarchy::{FlatEntry, Flattened, IntegrityIssue, TreeIndex};
use crate::models::{Company, CompanyRequest};
use crate::scope::{CompanyForm, CompanyScopeResolver};
use crate::session::Session;
use crate::AppState;

/// A company with its depth, ready for an indented list.
#[derive(Debug, Serialize)]
pub struct CompanyRow {
    #[serde(flatten)]
    pub company: Company,
    pub level: usize,
}

impl From<FlatEntry<'_, Company>> for CompanyRow {
    fn from(entry: FlatEntry<'_, Company>) -> Self {
        Self {
            company: entry.node.clone(),
            level: entry.level,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompanyList {
    pub companies: Vec<CompanyRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<IntegrityIssue>,
}

impl From<Flattened<'_, Company>> for CompanyList {
    fn from(flat: Flattened<'_, Company>) -> Self {
        Self {
            companies: flat.entries.into_iter().map(CompanyRow::from).collect(),
            issues: flat.issues,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ParentOptionsQuery {
    pub editing: Option<i64>,
}

/// GET /api/companies - Full company tree, flattened.
pub async fn list_companies(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<CompanyList> {
    let index = company_index(&state, &session).await?;
    success(index.flatten().into())
}

/// GET /api/companies/selectable - Companies the session may assign.
pub async fn selectable_companies(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<CompanyList> {
    let index = company_index(&state, &session).await?;
    let resolver = CompanyScopeResolver::new(&index);
    success(
        resolver
            .selectable_companies(&session.role, session.company_id)
            .into(),
    )
}

/// GET /api/companies/parent-options - Parent choices for the company form.
pub async fn parent_options(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ParentOptionsQuery>,
) -> ApiResult<Vec<CompanyRow>> {
    let index = company_index(&state, &session).await?;
    let resolver = CompanyScopeResolver::new(&index);
    let options = resolver
        .parent_options(query.editing)
        .into_iter()
        .map(CompanyRow::from)
        .collect();
    success(options)
}

/// GET /api/companies/{id}/ancestors - Breadcrumb from the top company down
/// to `id`.
pub async fn company_ancestors(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Company>> {
    let index = company_index(&state, &session).await?;
    let path = index
        .ancestor_path(id)?
        .into_iter()
        .filter_map(|id| index.get(id).cloned())
        .collect();
    success(path)
}

/// POST /api/companies - Create a company.
pub async fn create_company(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(request): Json<CompanyRequest>,
) -> ApiResult<Company> {
    success(save_company(&state, &session, None, request).await?)
}

/// PUT /api/companies/{id} - Update a company.
pub async fn update_company(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(request): Json<CompanyRequest>,
) -> ApiResult<Company> {
    success(save_company(&state, &session, Some(id), request).await?)
}

/// DELETE /api/companies/{id} - Delete a company without child companies.
pub async fn delete_company(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let index = company_index(&state, &session).await?;
    CompanyScopeResolver::new(&index).validate_company_removal(id)?;
    checked(
        &state,
        &session,
        state.backend.delete_company(&session.token, id).await,
    )
    .await?;
    tracing::info!("Deleted company {}", id);
    success(())
}

async fn save_company(
    state: &AppState,
    session: &Session,
    id: Option<i64>,
    request: CompanyRequest,
) -> Result<Company, AppError> {
    let index = company_index(state, session).await?;
    if let Some(id) = id.filter(|id| !index.contains(*id)) {
        return Err(AppError::NotFound(format!("Company {} not found", id)));
    }
    let resolver = CompanyScopeResolver::new(&index);

    let mut form = CompanyForm::new();
    form.open(id, request)?;
    let draft = form.submit(&resolver)?;

    let saved = match draft.id {
        Some(id) => {
            state
                .backend
                .update_company(&session.token, id, &draft.request)
                .await
        }
        None => {
            state
                .backend
                .create_company(&session.token, &draft.request)
                .await
        }
    };
    let company = form.finish(checked(state, session, saved).await)?;
    tracing::info!("Saved company {} ({})", company.id, company.name);
    Ok(company)
}

/// Fetch the company list and index it.
pub(crate) async fn company_index(
    state: &AppState,
    session: &Session,
) -> Result<TreeIndex<Company>, AppError> {
    let companies = checked(
        state,
        session,
        state.backend.list_companies(&session.token).await,
    )
    .await?;
    let index = TreeIndex::build(companies);
    for issue in index.issues() {
        tracing::warn!("Company hierarchy issue: {:?}", issue);
    }
    Ok(index)
}
