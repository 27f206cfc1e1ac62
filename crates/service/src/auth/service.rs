use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::authenticator::{parse_login, Authenticator};
use super::domain::{TokenRecord, User, UserRecord};
use super::errors::AccountError;
use super::repository::CredentialStore;
use super::representation::{self, Mode, UserRepresentation};

/// Account workflows independent of web framework
pub struct AccountService<S: CredentialStore + ?Sized = dyn CredentialStore> {
    store: Arc<S>,
    representation: UserRepresentation<S>,
    authenticator: Authenticator<S>,
}

impl<S: CredentialStore + ?Sized> Clone for AccountService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            representation: self.representation.clone(),
            authenticator: self.authenticator.clone(),
        }
    }
}

impl<S: CredentialStore + ?Sized> AccountService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            representation: UserRepresentation::new(Arc::clone(&store)),
            authenticator: Authenticator::new(Arc::clone(&store)),
            store,
        }
    }

    /// Validate and create an account, returning its public record.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AccountService, memory::InMemoryCredentialStore, password::PasswordHashing};
    /// use std::sync::Arc;
    /// let store = Arc::new(InMemoryCredentialStore::new(PasswordHashing::insecure_fast()));
    /// let svc = AccountService::new(store);
    /// let body = serde_json::json!({"email": "user@example.com", "password": "Secret", "name": "Test"});
    /// let record = tokio_test::block_on(svc.create_account(&body)).unwrap();
    /// assert_eq!(record.email, "user@example.com");
    /// ```
    pub async fn create_account(&self, body: &Value) -> Result<UserRecord, AccountError> {
        let fields = representation::deserialize(body, Mode::Create)?;
        let user = self.representation.create(fields).await?;
        Ok(representation::serialize(&user))
    }

    /// Authenticate `{email, password}` and return the user's token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AccountService, memory::InMemoryCredentialStore, password::PasswordHashing};
    /// use std::sync::Arc;
    /// let store = Arc::new(InMemoryCredentialStore::new(PasswordHashing::insecure_fast()));
    /// let svc = AccountService::new(store);
    /// let body = serde_json::json!({"email": "u@example.com", "password": "Passw0rd", "name": "N"});
    /// tokio_test::block_on(svc.create_account(&body)).unwrap();
    /// let token = tokio_test::block_on(svc.issue_token(&body)).unwrap();
    /// assert_eq!(token.token.len(), 40);
    /// ```
    pub async fn issue_token(&self, body: &Value) -> Result<TokenRecord, AccountError> {
        let input = parse_login(body)?;
        let identity = self.authenticator.authenticate(input).await?;
        let token = self.store.issue_token(&identity.user).await?;
        info!(user_id = %identity.user.id, "token_issued");
        Ok(TokenRecord { token: token.key })
    }

    /// Resolve a presented token to its user, if any.
    pub async fn resolve_token(&self, key: &str) -> Result<Option<User>, AccountError> {
        Ok(self.store.user_for_token(key).await?)
    }

    pub fn get_self(&self, current: &User) -> UserRecord {
        representation::serialize(current)
    }

    /// Update the caller's own account. `partial` selects PATCH semantics.
    #[instrument(skip(self, current, body), fields(user_id = %current.id))]
    pub async fn update_self(&self, current: &User, body: &Value, partial: bool) -> Result<UserRecord, AccountError> {
        let mode = if partial { Mode::Partial } else { Mode::Replace };
        let fields = representation::deserialize(body, mode)?;
        let updated = self.representation.update(current, fields).await?;
        Ok(representation::serialize(&updated))
    }
}
