//! Folia Core - Shared types library.
//!
//! This crate provides the domain types shared by the Folia Delivery
//! components:
//! - `storefront` - Checkout service (gateway proxy, session flow)
//! - `integration-tests` - End-to-end flow tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! HTTP clients, no timers. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Customer/address data, charge request/result shapes,
//!   pending orders, payment status mapping and money conversion

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
