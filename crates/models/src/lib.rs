//! sea-orm entities for accounts, password credentials and auth tokens.

pub mod errors;
pub mod db;
pub mod user;
pub mod user_credentials;
pub mod auth_token;
