//! Session-held models for the storefront.
//!
//! Catalog, order and account records come from `atelier-core` and
//! `atelier-client`; this module only holds what lives in the visitor's
//! session.

pub mod session;

pub use session::{CurrentUser, Flash, FlashKind, keys as session_keys};
