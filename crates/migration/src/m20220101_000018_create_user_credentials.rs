//! Create `user_credentials`: at most one password hash per user, in PHC
//! string form. Raw passwords are never written here.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut fk = ForeignKey::create()
            .name("fk_credentials_user_id")
            .from(Credentials::Table, Credentials::UserId)
            .to(User::Table, User::Id)
            .on_delete(ForeignKeyAction::Cascade)
            .to_owned();

        let table = Table::create()
            .table(Credentials::Table)
            .if_not_exists()
            .col(uuid(Credentials::Id).primary_key())
            .col(uuid_uniq(Credentials::UserId))
            // argon2id PHC strings are ~100 chars with default params
            .col(string_len(Credentials::PasswordHash, 255))
            .col(string_len(Credentials::PasswordAlgorithm, 64).default("argon2id"))
            .col(timestamp_with_time_zone(Credentials::CreatedAt).default(Expr::current_timestamp()))
            .col(timestamp_with_time_zone(Credentials::UpdatedAt).default(Expr::current_timestamp()))
            .foreign_key(&mut fk)
            .to_owned();

        manager.create_table(table).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Credentials::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Credentials {
    #[sea_orm(iden = "user_credentials")]
    Table,
    Id,
    UserId,
    PasswordHash,
    PasswordAlgorithm,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum User { Table, Id }
