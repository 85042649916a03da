//! Display data shared by every admin page.

use tower_sessions::Session;

use crate::middleware::take_flash;
use crate::models::CurrentAdmin;

/// Signed-in admin shown in the sidebar.
#[derive(Debug, Clone)]
pub struct AdminUserView {
    pub name: String,
    pub email: String,
}

impl From<&CurrentAdmin> for AdminUserView {
    fn from(admin: &CurrentAdmin) -> Self {
        Self {
            name: admin.name.clone(),
            email: admin.email.clone(),
        }
    }
}

/// A pending one-shot message.
#[derive(Debug, Clone)]
pub struct FlashView {
    pub is_error: bool,
    pub message: String,
}

/// Sidebar and chrome data for `base.html`.
#[derive(Debug, Clone)]
pub struct Shell {
    pub admin_user: AdminUserView,
    /// Highlights the matching sidebar entry.
    pub current_path: &'static str,
    pub flash: Option<FlashView>,
}

impl Shell {
    /// Build the chrome, consuming any pending flash message.
    pub async fn load(session: &Session, admin: &CurrentAdmin, current_path: &'static str) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            current_path,
            flash: take_flash(session).await.map(|flash| FlashView {
                is_error: flash.is_error(),
                message: flash.message,
            }),
        }
    }
}

/// One option in a `<select>`.
#[derive(Debug, Clone)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            selected,
        }
    }
}

/// Date format used across tables.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// CSS class for an order status badge.
#[must_use]
pub fn status_class(status: atelier_core::OrderStatus) -> String {
    format!("status-{status}")
}
