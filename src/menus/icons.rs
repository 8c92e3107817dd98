//! Menu icon keys.

use serde::Serialize;

/// Icons the console knows how to render. The backend stores the key string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MenuIcon {
    Users,
    Building,
    Package,
    Shield,
    FileText,
    Truck,
    Settings,
    Layers,
    LayoutDashboard,
}

impl MenuIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuIcon::Users => "users",
            MenuIcon::Building => "building",
            MenuIcon::Package => "package",
            MenuIcon::Shield => "shield",
            MenuIcon::FileText => "file-text",
            MenuIcon::Truck => "truck",
            MenuIcon::Settings => "settings",
            MenuIcon::Layers => "layers",
            MenuIcon::LayoutDashboard => "layout-dashboard",
        }
    }

    /// Keys are matched case-insensitively; `_` and `-` are interchangeable
    /// (`FileText`, `file_text` and `file-text` are the same icon).
    pub fn from_key(key: &str) -> Option<Self> {
        let normalized: String = key
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        let icon = match normalized.as_str() {
            "users" => MenuIcon::Users,
            "building" => MenuIcon::Building,
            "package" => MenuIcon::Package,
            "shield" => MenuIcon::Shield,
            "filetext" => MenuIcon::FileText,
            "truck" => MenuIcon::Truck,
            "settings" => MenuIcon::Settings,
            "layers" => MenuIcon::Layers,
            "layoutdashboard" => MenuIcon::LayoutDashboard,
            _ => {
                tracing::debug!("No icon mapped for key {:?}", key);
                return None;
            }
        };
        Some(icon)
    }
}
