//! User management.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::User;
use atelier_core::{Role, UserId};
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::RequireAdminAuth;
use crate::models::Flash;
use crate::routes::{flash_outcome, redirect_with_flash, upstream_failure};
use crate::state::AppState;
use crate::views::{DATE_FORMAT, Shell};

/// Changes an admin may not make to their own account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelfChangeError {
    #[error("You cannot remove your own admin role.")]
    Demote,
    #[error("You cannot delete your own account.")]
    Delete,
}

/// Refuse role changes that would lock the acting admin out.
///
/// # Errors
///
/// Returns [`SelfChangeError::Demote`] when the admin targets themselves
/// with a non-admin role.
pub fn check_role_change(
    actor: UserId,
    target: UserId,
    role: Role,
) -> std::result::Result<(), SelfChangeError> {
    if actor == target && role != Role::Admin {
        return Err(SelfChangeError::Demote);
    }
    Ok(())
}

/// Refuse deleting the acting admin's own account.
///
/// # Errors
///
/// Returns [`SelfChangeError::Delete`] when `actor == target`.
pub fn check_delete(actor: UserId, target: UserId) -> std::result::Result<(), SelfChangeError> {
    if actor == target {
        return Err(SelfChangeError::Delete);
    }
    Ok(())
}

/// User row for the listing table.
#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
    /// The signed-in admin; role and delete controls are hidden.
    pub is_self: bool,
    pub joined: String,
}

impl UserRow {
    fn new(user: &User, actor: UserId) -> Self {
        Self {
            id: user.id.as_i32(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.to_string(),
            is_admin: user.is_admin(),
            is_self: user.id == actor,
            joined: user
                .created_at
                .map(|at| at.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
        }
    }
}

/// Users page template.
#[derive(Template, WebTemplate)]
#[template(path = "users.html")]
pub struct UsersTemplate {
    pub shell: Shell,
    pub users: Vec<UserRow>,
    pub admin_count: usize,
}

/// Role change form.
#[derive(Debug, Deserialize)]
pub struct RoleForm {
    pub role: String,
}

/// Users list handler.
#[instrument(skip(admin, state, session))]
pub async fn index(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
) -> Result<Response> {
    let users = match state.api().users(&admin.token()).await {
        Ok(users) => users,
        Err(e) => return upstream_failure(&session, e).await,
    };

    let mut rows: Vec<UserRow> = users.iter().map(|u| UserRow::new(u, admin.id)).collect();
    rows.sort_by_key(|r| r.id);
    let admin_count = rows.iter().filter(|r| r.is_admin).count();

    let template = UsersTemplate {
        shell: Shell::load(&session, &admin, "/users").await,
        users: rows,
        admin_count,
    };
    Ok(template.into_response())
}

/// Change a user's role.
#[instrument(skip(admin, state, session, form), fields(admin_id = %admin.id))]
pub async fn change_role(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Response> {
    let target = UserId::new(id);
    let Ok(role) = form.role.parse::<Role>() else {
        return Ok(redirect_with_flash(&session, Flash::error("Unknown role."), "/users").await);
    };
    if let Err(e) = check_role_change(admin.id, target, role) {
        warn!(user_id = %target, "Refused self-demotion");
        return Ok(redirect_with_flash(&session, Flash::error(e.to_string()), "/users").await);
    }

    let outcome = state
        .api()
        .update_user_role(target, role, &admin.token())
        .await
        .map(|user| {
            info!(user_id = %target, %role, "Role changed");
            format!("{} is now {role}.", user.name)
        });
    flash_outcome(&session, outcome, "/users").await
}

/// Delete a user.
#[instrument(skip(admin, state, session), fields(admin_id = %admin.id))]
pub async fn delete(
    RequireAdminAuth(admin): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<i32>,
) -> Result<Response> {
    let target = UserId::new(id);
    if let Err(e) = check_delete(admin.id, target) {
        warn!(user_id = %target, "Refused self-deletion");
        return Ok(redirect_with_flash(&session, Flash::error(e.to_string()), "/users").await);
    }

    let outcome = state
        .api()
        .delete_user(target, &admin.token())
        .await
        .map(|()| {
            info!(user_id = %target, "User deleted");
            format!("Deleted user #{target}.")
        });
    flash_outcome(&session, outcome, "/users").await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cannot_demote_self() {
        let me = UserId::new(1);
        assert_eq!(
            check_role_change(me, me, Role::Customer),
            Err(SelfChangeError::Demote)
        );
        assert!(check_role_change(me, me, Role::Admin).is_ok());
        assert!(check_role_change(me, UserId::new(2), Role::Customer).is_ok());
    }

    #[test]
    fn test_cannot_delete_self() {
        let me = UserId::new(1);
        assert_eq!(check_delete(me, me), Err(SelfChangeError::Delete));
        assert!(check_delete(me, UserId::new(2)).is_ok());
    }

    #[test]
    fn test_user_row_marks_self() {
        let user = User {
            id: UserId::new(4),
            name: "Ines".to_string(),
            email: "ines@example.com".to_string(),
            role: Role::Admin,
            created_at: None,
        };
        let row = UserRow::new(&user, UserId::new(4));
        assert!(row.is_self);
        assert!(row.is_admin);
        assert_eq!(row.role, "admin");
        assert!(row.joined.is_empty());
    }
}
