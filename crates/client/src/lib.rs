//! HTTP clients for the Atelier backend and recommendation service.
//!
//! # Architecture
//!
//! - One shared `reqwest` instance per upstream service ([`Transport`]),
//!   injecting the bearer token and normalizing failures into [`ApiError`]
//! - Idempotent reads are retried once on transport errors and 5xx responses
//! - Every read goes through a keyed [`QueryCache`] (moka); concurrent misses
//!   for the same key share one upstream request
//! - Mutations never hit the cache; they apply an [`Invalidation`] rule
//!   afterwards
//!
//! # Example
//!
//! ```rust,ignore
//! use atelier_client::{ApiClient, ClientConfig};
//!
//! let client = ApiClient::new(&ClientConfig::new(api_url, recommend_url))?;
//! let product = client.product(ProductId::new(42)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod cache;
mod client;
mod config;
mod error;
pub mod models;
mod resources;
mod transport;

pub use cache::{CacheKey, CacheValue, Invalidation, QueryCache};
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::ApiError;
pub use models::*;
pub use resources::{OUTFIT_CANDIDATES, SIMILAR_CANDIDATES};
pub use transport::{AccessToken, Transport};
