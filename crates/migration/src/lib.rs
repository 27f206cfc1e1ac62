//! Migrator registering the account schema in dependency order.
pub use sea_orm_migration::prelude::*;

mod m20220101_000012_create_user;
mod m20220101_000018_create_user_credentials;
mod m20220101_000020_create_auth_token;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20220101_000012_create_user::Migration),
            Box::new(m20220101_000018_create_user_credentials::Migration),
            Box::new(m20220101_000020_create_auth_token::Migration),
        ]
    }
}
