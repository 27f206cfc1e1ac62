//! Wire (de)serialization of users and the create/update rules around them.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument};

use super::domain::{ProfileChanges, User, UserRecord};
use super::errors::{AccountError, FieldError, FieldErrors, StoreError};
use super::repository::CredentialStore;
use super::validation::{as_object, check_email, check_name, check_password, string_field};

/// How strictly required fields are enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Account creation: email, password and name are all required.
    Create,
    /// Full update (PUT): email and name required, password optional.
    Replace,
    /// Partial update (PATCH): every field optional.
    Partial,
}

impl Mode {
    fn requires(self, field: &str) -> bool {
        match self {
            Mode::Create => true,
            Mode::Replace => field != "password",
            Mode::Partial => false,
        }
    }
}

/// Fields that passed validation. `None` means the field was not supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedUser {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

impl ValidatedUser {
    fn profile_changes(&self) -> ProfileChanges {
        ProfileChanges { email: self.email.clone(), name: self.name.clone() }
    }
}

/// Render a user as `{email, name}`. The password never leaves the store.
pub fn serialize(user: &User) -> UserRecord {
    UserRecord { email: user.email.clone(), name: user.name.clone() }
}

type Check = fn(&str, &mut FieldErrors) -> Option<String>;

/// Validate an inbound `{email, password, name}` payload, collecting every
/// field error before failing.
pub fn deserialize(body: &Value, mode: Mode) -> Result<ValidatedUser, FieldErrors> {
    let obj = as_object(body)?;
    let mut errors = FieldErrors::new();

    let mut read = |field: &str, check: Check| -> Option<String> {
        match string_field(obj, field, &mut errors) {
            Some(raw) => check(&raw, &mut errors),
            None => {
                // absent, unless string_field already rejected the value
                if errors.get(field).is_none() && mode.requires(field) {
                    errors.add(field, FieldError::required());
                }
                None
            }
        }
    };
    let out = ValidatedUser {
        email: read("email", check_email),
        password: read("password", check_password),
        name: read("name", check_name),
    };

    errors.into_result().map(|()| out)
}

fn email_conflict(err: StoreError) -> AccountError {
    match err {
        StoreError::Conflict => FieldErrors::single("email", FieldError::email_taken()).into(),
        other => other.into(),
    }
}

/// Create/update operations over an injected credential store.
pub struct UserRepresentation<S: CredentialStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CredentialStore + ?Sized> Clone for UserRepresentation<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: CredentialStore + ?Sized> UserRepresentation<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Persist a new user. The store hashes the password.
    #[instrument(skip(self, fields), fields(email = ?fields.email))]
    pub async fn create(&self, fields: ValidatedUser) -> Result<User, AccountError> {
        let (email, password, name) = match (fields.email, fields.password, fields.name) {
            (Some(e), Some(p), Some(n)) => (e, p, n),
            (e, p, n) => {
                let mut missing = FieldErrors::new();
                for (field, absent) in [("email", e.is_none()), ("password", p.is_none()), ("name", n.is_none())] {
                    if absent {
                        missing.add(field, FieldError::required());
                    }
                }
                return Err(missing.into());
            }
        };

        let user = self.store.create_user(&email, &password, &name).await.map_err(email_conflict)?;
        info!(user_id = %user.id, email = %user.email, "user_created");
        Ok(user)
    }

    /// Apply `fields` to `user`. Non-password fields go through the generic
    /// profile update; a supplied password is re-hashed by the store. An
    /// absent password leaves the stored hash untouched.
    #[instrument(skip(self, user, fields), fields(user_id = %user.id, password_change = fields.password.is_some()))]
    pub async fn update(&self, user: &User, fields: ValidatedUser) -> Result<User, AccountError> {
        let changes = fields.profile_changes().against(user);
        let updated = if changes.is_empty() {
            user.clone()
        } else {
            let updated = self.store.update_profile(user, changes).await.map_err(email_conflict)?;
            debug!(user_id = %updated.id, "profile_fields_updated");
            updated
        };

        if let Some(password) = fields.password.as_deref().filter(|p| !p.is_empty()) {
            self.store.set_password(&updated, password).await?;
            info!(user_id = %updated.id, "password_changed");
        }
        Ok(updated)
    }
}
