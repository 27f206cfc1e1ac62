use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::debug;

use crate::auth::domain::{ProfileChanges, Token, User};
use crate::auth::errors::StoreError;
use crate::auth::password::{generate_token_key, PasswordHashing, PASSWORD_ALGORITHM};
use crate::auth::repository::CredentialStore;

fn to_user(u: models::user::Model) -> User {
    User { id: u.id, email: u.email, name: u.name, is_active: u.is_active }
}

fn db_err(e: sea_orm::DbErr) -> StoreError {
    StoreError::Repository(e.to_string())
}

pub struct SeaOrmCredentialStore {
    pub db: DatabaseConnection,
    hashing: PasswordHashing,
}

impl SeaOrmCredentialStore {
    pub fn new(db: DatabaseConnection, hashing: PasswordHashing) -> Self {
        Self { db, hashing }
    }

    /// Stored hash for `user`, for inspection in tests and tooling.
    pub async fn stored_hash(&self, user: &User) -> Result<Option<String>, StoreError> {
        let creds = models::user_credentials::find_by_user(&self.db, user.id).await?;
        Ok(creds.map(|c| c.password_hash))
    }
}

#[async_trait::async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn create_user(&self, email: &str, password: &str, name: &str) -> Result<User, StoreError> {
        let hash = self.hashing.hash(password)?;
        let txn = self.db.begin().await.map_err(db_err)?;
        let created = models::user::create(&txn, email, name).await?;
        models::user_credentials::upsert_password(&txn, created.id, hash, PASSWORD_ALGORITHM).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(to_user(created))
    }

    async fn get_user(&self, email: &str) -> Result<Option<User>, StoreError> {
        let found = models::user::find_by_email(&self.db, email).await?;
        Ok(found.map(to_user))
    }

    async fn verify_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
        let creds = models::user_credentials::find_by_user(&self.db, user.id).await?;
        Ok(match creds {
            Some(c) => self.hashing.verify(password, &c.password_hash),
            None => {
                self.hashing.verify_decoy(password);
                false
            }
        })
    }

    async fn set_password(&self, user: &User, password: &str) -> Result<(), StoreError> {
        let hash = self.hashing.hash(password)?;
        models::user_credentials::upsert_password(&self.db, user.id, hash, PASSWORD_ALGORITHM).await?;
        debug!(user_id = %user.id, "password_rehashed");
        Ok(())
    }

    async fn update_profile(&self, user: &User, changes: ProfileChanges) -> Result<User, StoreError> {
        let updated = models::user::update_profile(
            &self.db,
            user.id,
            changes.email.as_deref(),
            changes.name.as_deref(),
        )
        .await?;
        Ok(to_user(updated))
    }

    async fn issue_token(&self, user: &User) -> Result<Token, StoreError> {
        if let Some(existing) = models::auth_token::find_by_user(&self.db, user.id).await? {
            return Ok(Token { key: existing.key, user_id: existing.user_id });
        }
        match models::auth_token::create(&self.db, user.id, generate_token_key()).await {
            Ok(created) => Ok(Token { key: created.key, user_id: created.user_id }),
            // a concurrent request created it first
            Err(models::errors::ModelError::Conflict(_)) => {
                let existing = models::auth_token::find_by_user(&self.db, user.id)
                    .await?
                    .ok_or(StoreError::NotFound)?;
                Ok(Token { key: existing.key, user_id: existing.user_id })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn user_for_token(&self, key: &str) -> Result<Option<User>, StoreError> {
        let found = models::auth_token::find_user_by_key(&self.db, key).await?;
        Ok(found.map(to_user))
    }

    async fn verify_unknown(&self, password: &str) {
        self.hashing.verify_decoy(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;
    use sea_orm::EntityTrait;
    use uuid::Uuid;

    fn db_tests_enabled() -> bool {
        std::env::var("SKIP_DB_TESTS").is_err() && std::env::var("DATABASE_URL").is_ok()
    }

    #[tokio::test]
    async fn seaorm_store_round_trip() -> Result<(), anyhow::Error> {
        if !db_tests_enabled() { return Ok(()); }
        let store = SeaOrmCredentialStore::new(get_db().await?, PasswordHashing::insecure_fast());

        let email = format!("store_{}@example.com", Uuid::new_v4());
        let user = store.create_user(&email, "secret1", "Store").await?;
        let hash = store.stored_hash(&user).await?.unwrap();
        assert_ne!(hash, "secret1");
        assert!(store.verify_password(&user, "secret1").await?);

        let dup = store.create_user(&email, "secret1", "Store").await;
        assert!(matches!(dup, Err(StoreError::Conflict)));

        store.set_password(&user, "secret2").await?;
        assert!(store.verify_password(&user, "secret2").await?);
        assert!(!store.verify_password(&user, "secret1").await?);

        let renamed = store
            .update_profile(&user, ProfileChanges { email: None, name: Some("Renamed".into()) })
            .await?;
        assert_eq!(renamed.name, "Renamed");

        let t1 = store.issue_token(&user).await?;
        let t2 = store.issue_token(&user).await?;
        assert_eq!(t1, t2);
        assert_eq!(store.user_for_token(&t1.key).await?.unwrap().id, user.id);

        models::user::Entity::delete_by_id(user.id).exec(&store.db).await?;
        Ok(())
    }
}
