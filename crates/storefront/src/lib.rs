//! Folia Delivery checkout library.
//!
//! This crate provides the checkout service as a library, allowing it to
//! be tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod routes;
pub mod services;
pub mod state;
