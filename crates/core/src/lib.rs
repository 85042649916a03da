//! Atelier Core - Shared domain types and client-side shop logic.
//!
//! This crate is used by every Atelier component:
//! - `storefront` - Public-facing shop
//! - `admin` - Internal administration console
//! - `cli` - Operator command-line tools
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no sessions. Records mirror what the backend returns; the only
//! state this crate owns is the shopping cart.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, money, emails, and statuses
//! - [`catalog`] - Products, variants, brands, categories, reviews
//! - [`cart`] - Cart line items keyed by product, size and color
//! - [`order`] - Orders and the checkout request built from a cart
//! - [`stats`] - Order statistics for the admin dashboard
//! - [`recommend`] - Recommendation panel assembly

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod recommend;
pub mod stats;
pub mod types;

pub use types::*;
