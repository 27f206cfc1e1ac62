//! Service layer for user accounts and token authentication.
//! - Separates business rules from HTTP wiring and persistence.
//! - Reuses entity definitions in the `models` crate.
//! - Provides clear error types and documented interfaces.

pub mod auth;
#[cfg(test)]
pub mod test_support;
