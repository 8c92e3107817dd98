//! Company model as returned by `/api/definitions/companies`.

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyNode;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LANGUAGE: &str = "en";

/// A company in the organisation hierarchy.
///
/// The backend returns either a flat list or a pre-nested tree; `children` is
/// only read on the way in and is emptied once the record enters a tree index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing)]
    pub children: Vec<Company>,
}

impl HierarchyNode for Company {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn set_parent_id(&mut self, parent_id: Option<i64>) {
        self.parent_id = parent_id;
    }

    fn take_children(&mut self) -> Vec<Self> {
        std::mem::take(&mut self.children)
    }
}

/// Request body for creating or updating a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl CompanyRequest {
    /// Fill in the form defaults for empty currency and language.
    pub fn with_defaults(mut self) -> Self {
        self.name = self.name.trim().to_string();
        if self.currency.as_deref().map_or(true, |c| c.trim().is_empty()) {
            self.currency = Some(DEFAULT_CURRENCY.to_string());
        }
        if self.language.as_deref().map_or(true, |l| l.trim().is_empty()) {
            self.language = Some(DEFAULT_LANGUAGE.to_string());
        }
        self
    }
}
