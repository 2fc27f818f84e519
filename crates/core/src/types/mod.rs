//! Core types for the Folia Delivery checkout.
//!
//! This module provides the domain vocabulary of the payment session
//! lifecycle: who is paying, where the order goes, what the gateway is
//! asked for and what it answered, and what is still awaiting payment.

pub mod address;
pub mod customer;
pub mod money;
pub mod order;
pub mod status;

pub use address::AddressData;
pub use customer::{CustomerData, DocumentType};
pub use money::{MoneyError, to_minor_units};
pub use order::{CartItem, ChargeRequest, ChargeResult, PendingOrder};
pub use status::PaymentStatus;
