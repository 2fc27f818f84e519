//! External service clients.

pub mod viacep;
