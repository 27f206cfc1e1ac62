//! Auth module: credential store seam, wire representation, authenticator
//! and the account workflows composed from them.

pub mod authenticator;
pub mod domain;
pub mod errors;
pub mod password;
pub mod repo;
pub mod repository;
pub mod representation;
pub mod service;
pub mod validation;

pub use repo::seaorm::SeaOrmCredentialStore;
pub use repository::{memory, CredentialStore};
pub use service::AccountService;
