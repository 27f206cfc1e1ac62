use async_trait::async_trait;

use super::domain::{ProfileChanges, Token, User};
use super::errors::StoreError;

/// Persistence and verification capabilities the account flows rely on.
///
/// Implementations own password hashing: the raw password handed to
/// `create_user` and `set_password` must never be persisted as-is.
/// Email uniqueness is enforced here, not by callers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new user with a freshly hashed password.
    async fn create_user(&self, email: &str, password: &str, name: &str) -> Result<User, StoreError>;
    async fn get_user(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn verify_password(&self, user: &User, password: &str) -> Result<bool, StoreError>;
    /// Re-hash and persist `password` for `user`.
    async fn set_password(&self, user: &User, password: &str) -> Result<(), StoreError>;
    /// Apply non-password changes; writes only when something differs.
    async fn update_profile(&self, user: &User, changes: ProfileChanges) -> Result<User, StoreError>;
    /// Return the user's token, creating it on first request.
    async fn issue_token(&self, user: &User) -> Result<Token, StoreError>;
    async fn user_for_token(&self, key: &str) -> Result<Option<User>, StoreError>;
    /// Burn one verification's worth of work for a lookup that found nobody.
    async fn verify_unknown(&self, password: &str);
}

/// In-memory store, used when no database is configured and in tests.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Mutex, MutexGuard};

    use tracing::debug;
    use uuid::Uuid;

    use crate::auth::password::{generate_token_key, PasswordHashing};

    #[derive(Debug, Clone)]
    struct StoredUser {
        user: User,
        password_hash: String,
    }

    #[derive(Default)]
    struct Inner {
        users: HashMap<Uuid, StoredUser>,
        by_email: HashMap<String, Uuid>,
        tokens: HashMap<String, Uuid>,         // key -> user_id
        token_by_user: HashMap<Uuid, String>,
    }

    #[derive(Default)]
    pub struct InMemoryCredentialStore {
        inner: Mutex<Inner>,
        hashing: PasswordHashing,
    }

    impl InMemoryCredentialStore {
        pub fn new(hashing: PasswordHashing) -> Self {
            Self { inner: Mutex::new(Inner::default()), hashing }
        }

        fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
            self.inner.lock().map_err(|_| StoreError::Repository("credential store lock poisoned".into()))
        }

        /// Stored hash for `email`, for inspection in tests and tooling.
        pub fn stored_hash(&self, email: &str) -> Option<String> {
            let inner = self.lock().ok()?;
            let id = inner.by_email.get(email)?;
            inner.users.get(id).map(|s| s.password_hash.clone())
        }

        /// Mark a user inactive; they can no longer authenticate.
        pub fn deactivate(&self, email: &str) -> Result<(), StoreError> {
            let mut inner = self.lock()?;
            let id = *inner.by_email.get(email).ok_or(StoreError::NotFound)?;
            let stored = inner.users.get_mut(&id).ok_or(StoreError::NotFound)?;
            stored.user.is_active = false;
            Ok(())
        }

        pub fn len(&self) -> usize {
            self.lock().map(|i| i.users.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl CredentialStore for InMemoryCredentialStore {
        async fn create_user(&self, email: &str, password: &str, name: &str) -> Result<User, StoreError> {
            let password_hash = self.hashing.hash(password)?;
            let mut inner = self.lock()?;
            if inner.by_email.contains_key(email) {
                return Err(StoreError::Conflict);
            }
            let user = User { id: Uuid::new_v4(), email: email.to_string(), name: name.to_string(), is_active: true };
            inner.by_email.insert(user.email.clone(), user.id);
            inner.users.insert(user.id, StoredUser { user: user.clone(), password_hash });
            Ok(user)
        }

        async fn get_user(&self, email: &str) -> Result<Option<User>, StoreError> {
            let inner = self.lock()?;
            Ok(inner.by_email.get(email).and_then(|id| inner.users.get(id)).map(|s| s.user.clone()))
        }

        async fn verify_password(&self, user: &User, password: &str) -> Result<bool, StoreError> {
            let stored = {
                let inner = self.lock()?;
                inner.users.get(&user.id).map(|s| s.password_hash.clone())
            };
            Ok(match stored {
                Some(hash) => self.hashing.verify(password, &hash),
                None => false,
            })
        }

        async fn set_password(&self, user: &User, password: &str) -> Result<(), StoreError> {
            let password_hash = self.hashing.hash(password)?;
            let mut inner = self.lock()?;
            let stored = inner.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
            stored.password_hash = password_hash;
            debug!(user_id = %user.id, "password_rehashed");
            Ok(())
        }

        async fn update_profile(&self, user: &User, changes: ProfileChanges) -> Result<User, StoreError> {
            let mut inner = self.lock()?;
            let current = inner.users.get(&user.id).ok_or(StoreError::NotFound)?.user.clone();
            let changes = changes.against(&current);
            if changes.is_empty() {
                return Ok(current);
            }
            if let Some(email) = &changes.email {
                if inner.by_email.contains_key(email) {
                    return Err(StoreError::Conflict);
                }
                inner.by_email.remove(&current.email);
                inner.by_email.insert(email.clone(), current.id);
            }
            let stored = inner.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
            if let Some(email) = changes.email { stored.user.email = email; }
            if let Some(name) = changes.name { stored.user.name = name; }
            Ok(stored.user.clone())
        }

        async fn issue_token(&self, user: &User) -> Result<Token, StoreError> {
            let mut inner = self.lock()?;
            if !inner.users.contains_key(&user.id) {
                return Err(StoreError::NotFound);
            }
            if let Some(key) = inner.token_by_user.get(&user.id) {
                return Ok(Token { key: key.clone(), user_id: user.id });
            }
            let mut key = generate_token_key();
            while inner.tokens.contains_key(&key) {
                key = generate_token_key();
            }
            inner.tokens.insert(key.clone(), user.id);
            inner.token_by_user.insert(user.id, key.clone());
            Ok(Token { key, user_id: user.id })
        }

        async fn user_for_token(&self, key: &str) -> Result<Option<User>, StoreError> {
            let inner = self.lock()?;
            Ok(inner.tokens.get(key).and_then(|id| inner.users.get(id)).map(|s| s.user.clone()))
        }

        async fn verify_unknown(&self, password: &str) {
            self.hashing.verify_decoy(password);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn store() -> InMemoryCredentialStore {
            InMemoryCredentialStore::new(PasswordHashing::insecure_fast())
        }

        #[tokio::test]
        async fn create_hashes_password_and_rejects_duplicates() {
            let store = store();
            let user = store.create_user("a@example.com", "secret1", "A").await.unwrap();
            let hash = store.stored_hash("a@example.com").unwrap();
            assert_ne!(hash, "secret1");
            assert!(store.verify_password(&user, "secret1").await.unwrap());
            assert!(!store.verify_password(&user, "secret2").await.unwrap());

            let dup = store.create_user("a@example.com", "other11", "B").await;
            assert!(matches!(dup, Err(StoreError::Conflict)));
            assert_eq!(store.len(), 1);
        }

        #[tokio::test]
        async fn set_password_rehashes() {
            let store = store();
            let user = store.create_user("a@example.com", "secret1", "A").await.unwrap();
            let before = store.stored_hash("a@example.com").unwrap();
            store.set_password(&user, "secret2").await.unwrap();
            let after = store.stored_hash("a@example.com").unwrap();
            assert_ne!(before, after);
            assert_ne!(after, "secret2");
            assert!(store.verify_password(&user, "secret2").await.unwrap());
            assert!(!store.verify_password(&user, "secret1").await.unwrap());
        }

        #[tokio::test]
        async fn update_profile_moves_email_index() {
            let store = store();
            let a = store.create_user("a@example.com", "secret1", "A").await.unwrap();
            store.create_user("b@example.com", "secret1", "B").await.unwrap();

            let taken = store
                .update_profile(&a, ProfileChanges { email: Some("b@example.com".into()), name: None })
                .await;
            assert!(matches!(taken, Err(StoreError::Conflict)));

            let moved = store
                .update_profile(&a, ProfileChanges { email: Some("c@example.com".into()), name: Some("C".into()) })
                .await
                .unwrap();
            assert_eq!(moved.email, "c@example.com");
            assert_eq!(moved.name, "C");
            assert!(store.get_user("a@example.com").await.unwrap().is_none());
            assert_eq!(store.get_user("c@example.com").await.unwrap().unwrap().id, a.id);
        }

        #[tokio::test]
        async fn unchanged_email_is_not_a_conflict() {
            let store = store();
            let a = store.create_user("a@example.com", "secret1", "A").await.unwrap();
            let same = store
                .update_profile(&a, ProfileChanges { email: Some("a@example.com".into()), name: Some("A2".into()) })
                .await
                .unwrap();
            assert_eq!(same.email, "a@example.com");
            assert_eq!(same.name, "A2");
        }

        #[tokio::test]
        async fn token_is_stable_per_user() {
            let store = store();
            let a = store.create_user("a@example.com", "secret1", "A").await.unwrap();
            let b = store.create_user("b@example.com", "secret1", "B").await.unwrap();
            let t1 = store.issue_token(&a).await.unwrap();
            let t2 = store.issue_token(&a).await.unwrap();
            let tb = store.issue_token(&b).await.unwrap();
            assert_eq!(t1, t2);
            assert_ne!(t1.key, tb.key);
            assert_eq!(store.user_for_token(&t1.key).await.unwrap().unwrap().id, a.id);
            assert!(store.user_for_token("nope").await.unwrap().is_none());
        }

        #[tokio::test]
        async fn deactivate_flags_user() {
            let store = store();
            store.create_user("a@example.com", "secret1", "A").await.unwrap();
            store.deactivate("a@example.com").unwrap();
            assert!(!store.get_user("a@example.com").await.unwrap().unwrap().is_active);
            assert!(matches!(store.deactivate("x@example.com"), Err(StoreError::NotFound)));
        }
    }
}
