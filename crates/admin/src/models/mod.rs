//! Admin session types.

pub mod session;

pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
