//! Admin authentication.
//!
//! Admins sign in with their shop account. The backend checks the password;
//! only accounts with the admin role get a session here.

use askama::Template;
use askama_web::WebTemplate;
use atelier_client::ApiError;
use atelier_core::Email;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::filters;
use crate::middleware::{OptionalAdminAuth, clear_current_admin, set_current_admin, take_flash};
use crate::models::{CurrentAdmin, Flash};
use crate::routes::redirect_with_flash;
use crate::state::AppState;

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

/// Login form data. Not `Debug`: it carries the password.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

fn login_error(email: String, message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        LoginTemplate {
            email,
            error: Some(message.to_string()),
            notice: None,
        },
    )
        .into_response()
}

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalAdminAuth(admin): OptionalAdminAuth,
) -> Response {
    if admin.is_some() {
        return Redirect::to("/").into_response();
    }

    let flash = take_flash(&session).await;
    LoginTemplate {
        email: String::new(),
        error: flash.as_ref().filter(|f| f.is_error()).map(|f| f.message.clone()),
        notice: flash.filter(|f| !f.is_error()).map(|f| f.message),
    }
    .into_response()
}

/// Sign in against the backend.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let Ok(email) = Email::parse(&form.email) else {
        return Ok(login_error(form.email, "Enter a valid email address."));
    };

    match state
        .api()
        .login(email.as_str(), &form.password)
        .await
    {
        Ok(auth) => {
            let Some(admin) = CurrentAdmin::from_auth(auth) else {
                warn!(email = %email, "Non-admin account tried to sign in to admin");
                return Ok(login_error(
                    email.to_string(),
                    "This account does not have admin access.",
                ));
            };
            set_current_admin(&session, &admin).await?;
            info!(admin_id = %admin.id, "Admin signed in");
            Ok(Redirect::to("/").into_response())
        }
        Err(ApiError::Unauthorized(_) | ApiError::NotFound(_)) => Ok(login_error(
            email.to_string(),
            "Invalid email or password.",
        )),
        Err(ApiError::RateLimited(retry_after)) => Ok(login_error(
            email.to_string(),
            &format!("Too many attempts. Try again in {retry_after} seconds."),
        )),
        Err(e) => Err(e.into()),
    }
}

/// Sign out.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_admin(&session).await?;
    Ok(redirect_with_flash(&session, Flash::success("Signed out."), "/auth/login").await)
}
