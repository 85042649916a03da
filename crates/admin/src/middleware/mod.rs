//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers (no framing, no sniffing, same-origin scripts only)
//! 4. Session layer (in-memory, SameSite=Strict)
//! 5. `RequireAdminAuth` extractor on every page except login

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAdminAuth, RequireAdminAuth, clear_current_admin, set_current_admin};
pub use security_headers::security_headers;
pub use session::{create_session_layer, set_flash, take_flash};
