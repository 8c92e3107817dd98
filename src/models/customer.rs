//! Customer model as returned by `/api/definitions/customers`.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A customer record. Only the identifying fields are typed; trade terms and
/// other backend-owned columns pass through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_customer_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_customer_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Request body for creating or updating a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRequest {
    #[serde(default)]
    pub group_customer_code: String,
    #[serde(default)]
    pub group_customer_name: String,
    #[serde(default)]
    pub remarks: Option<String>,
}

impl CustomerRequest {
    /// Trim the identifying fields; both must be present.
    pub fn normalized(mut self) -> Result<Self, AppError> {
        self.group_customer_code = self.group_customer_code.trim().to_string();
        self.group_customer_name = self.group_customer_name.trim().to_string();
        if self.group_customer_code.is_empty() || self.group_customer_name.is_empty() {
            return Err(AppError::Validation(
                "Group customer code and name are required".to_string(),
            ));
        }
        Ok(self)
    }
}
