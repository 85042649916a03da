//! Authentication route handlers.
//!
//! Credentials are checked by the backend; on success the returned token and
//! profile are stored in the session.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::ApiError;
use atelier_core::Email;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user, take_return_to};
use crate::models::{CurrentUser, Flash};
use crate::routes::redirect_with_flash;
use crate::state::AppState;
use crate::views::Layout;

/// Shortest password accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// A registration that passed local checks.
pub struct ValidRegistration {
    pub name: String,
    pub email: Email,
    pub password: SecretString,
}

impl RegisterForm {
    /// Check the form before it reaches the backend.
    ///
    /// # Errors
    ///
    /// Returns a message for the visitor.
    pub fn validated(self) -> std::result::Result<ValidRegistration, String> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err("Please enter your name.".to_string());
        }
        let email = Email::parse(&self.email)
            .map_err(|e| format!("Please enter a valid email address ({e})."))?;
        if self.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters."
            ));
        }
        if self.password != self.password_confirm {
            return Err("Passwords do not match.".to_string());
        }
        Ok(ValidRegistration {
            name,
            email,
            password: SecretString::from(self.password),
        })
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub email: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Sign the user in and send them where they were headed.
async fn start_session(session: &Session, user: CurrentUser) -> Result<Response> {
    let destination = take_return_to(session).await;
    set_current_user(session, &user).await?;
    info!(user_id = %user.id, "User signed in");
    Ok(redirect_with_flash(
        session,
        Flash::success(format!("Welcome, {}!", user.first_name())),
        &destination,
    )
    .await)
}

/// Display login page.
pub async fn login_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    LoginTemplate {
        layout: Layout::load(&session, None).await,
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let password = SecretString::from(form.password);
    let typed = form.email.trim().to_string();

    let Ok(email) = Email::parse(&typed) else {
        return Ok(login_error(&session, typed, "Invalid email or password.".to_string()).await);
    };

    match state
        .api()
        .login(email.as_str(), password.expose_secret())
        .await
    {
        Ok(auth) => start_session(&session, CurrentUser::from(auth)).await,
        Err(ApiError::Unauthorized(_) | ApiError::NotFound(_)) => {
            Ok(login_error(&session, typed, "Invalid email or password.".to_string()).await)
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            Ok(login_error(&session, typed, e.user_message()).await)
        }
    }
}

/// Re-show the login form with the typed email.
async fn login_error(session: &Session, email: String, error: String) -> Response {
    LoginTemplate {
        layout: Layout::load(session, None).await,
        email,
        error: Some(error),
    }
    .into_response()
}

/// Display registration page.
pub async fn register_page(session: Session, OptionalAuth(user): OptionalAuth) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    RegisterTemplate {
        layout: Layout::load(&session, None).await,
        name: String::new(),
        email: String::new(),
        error: None,
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let (name, email) = (form.name.clone(), form.email.clone());

    let valid = match form.validated() {
        Ok(valid) => valid,
        Err(error) => return Ok(register_error(&session, name, email, error).await),
    };

    match state
        .api()
        .register(
            &valid.name,
            valid.email.as_str(),
            valid.password.expose_secret(),
        )
        .await
    {
        Ok(auth) => start_session(&session, CurrentUser::from(auth)).await,
        Err(e) => Ok(register_error(&session, name, email, e.user_message()).await),
    }
}

/// Re-show the registration form with what the visitor typed.
async fn register_error(session: &Session, name: String, email: String, error: String) -> Response {
    RegisterTemplate {
        layout: Layout::load(session, None).await,
        name,
        email,
        error: Some(error),
    }
    .into_response()
}

/// Handle logout. The cart and conversation end with the session.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    Ok(redirect_with_flash(&session, Flash::info("You have been signed out."), "/").await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, password: &str, confirm: &str) -> RegisterForm {
        RegisterForm {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            password_confirm: confirm.to_string(),
        }
    }

    #[test]
    fn test_register_validation_rules() {
        assert!(form("", "a@b.co", "longenough", "longenough").validated().is_err());
        assert!(form("Ada", "not-an-email", "longenough", "longenough").validated().is_err());
        assert!(form("Ada", "a@b.co", "short", "short").validated().is_err());
        assert!(form("Ada", "a@b.co", "longenough", "different").validated().is_err());
    }

    #[test]
    fn test_register_normalizes_email() {
        let valid = form(" Ada ", " Ada@Example.COM ", "longenough", "longenough")
            .validated()
            .unwrap();
        assert_eq!(valid.name, "Ada");
        assert_eq!(valid.email.as_str(), "ada@example.com");
    }
}
