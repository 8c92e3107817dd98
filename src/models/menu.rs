//! Navigation menu model as returned by `/api/menus` and `/api/menus/tree`.

use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyNode;

/// A navigation menu entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Menu {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub children: Vec<Menu>,
}

/// Request body for creating or updating a menu.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_no: Option<i32>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl HierarchyNode for Menu {
    fn id(&self) -> i64 {
        self.id
    }

    fn parent_id(&self) -> Option<i64> {
        self.parent_id
    }

    fn order_no(&self) -> Option<i32> {
        self.order_no
    }

    fn set_parent_id(&mut self, parent_id: Option<i64>) {
        self.parent_id = parent_id;
    }

    fn take_children(&mut self) -> Vec<Self> {
        std::mem::take(&mut self.children)
    }
}
