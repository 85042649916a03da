//! Review submission.

use atelier_client::{ApiError, ReviewInput};
use atelier_core::ProductId;
use axum::{
    Form,
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::Flash;
use crate::routes::{redirect_with_flash, upstream_failure};
use crate::state::AppState;

/// Longest review body accepted.
const MAX_COMMENT_LEN: usize = 2_000;

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl ReviewForm {
    /// Validate and trim the form.
    ///
    /// # Errors
    ///
    /// Returns a message for the visitor.
    pub fn validated(self) -> std::result::Result<ReviewInput, &'static str> {
        if !(1..=5).contains(&self.rating) {
            return Err("Choose a rating from 1 to 5 stars.");
        }
        let comment = self.comment.trim().to_string();
        if comment.is_empty() {
            return Err("Tell us a little about the product.");
        }
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err("Reviews are limited to 2000 characters.");
        }
        Ok(ReviewInput {
            rating: self.rating,
            comment,
        })
    }
}

/// Post a review, then return to the product's review section.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let id = ProductId::new(id);
    let back = format!("/products/{id}#reviews");

    let input = match form.validated() {
        Ok(input) => input,
        Err(message) => {
            return Ok(redirect_with_flash(&session, Flash::error(message), &back).await);
        }
    };

    match state.api().create_review(id, &input, &user.token()).await {
        Ok(review) => {
            info!(review_id = %review.id, rating = review.rating, "Review posted");
            Ok(redirect_with_flash(&session, Flash::success("Thanks for your review!"), &back).await)
        }
        Err(e @ ApiError::Unauthorized(_)) => upstream_failure(&session, e).await,
        Err(e) => Ok(redirect_with_flash(&session, Flash::error(e.user_message()), &back).await),
    }
}
