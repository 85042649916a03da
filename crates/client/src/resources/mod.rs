//! Per-resource endpoints, each an `impl ApiClient` block.

mod auth;
mod chat;
mod orders;
mod products;
mod recommend;
mod taxonomy;
mod users;

pub use recommend::{OUTFIT_CANDIDATES, SIMILAR_CANDIDATES};
