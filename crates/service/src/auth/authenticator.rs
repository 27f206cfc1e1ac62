use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument};

use super::domain::{AuthenticatedIdentity, LoginInput};
use super::errors::{AccountError, FieldError, FieldErrors};
use super::repository::CredentialStore;
use super::validation::{as_object, string_field};

/// Parse `{email, password}`. The email is trimmed; the password is taken
/// exactly as sent so surrounding whitespace stays significant.
pub fn parse_login(body: &Value) -> Result<LoginInput, FieldErrors> {
    let obj = as_object(body)?;
    let mut errors = FieldErrors::new();

    let email = string_field(obj, "email", &mut errors).map(|e| e.trim().to_string());
    let password = string_field(obj, "password", &mut errors);

    for (field, value) in [("email", &email), ("password", &password)] {
        match value {
            Some(v) if v.is_empty() => errors.add(field, FieldError::blank()),
            None if errors.get(field).is_none() => errors.add(field, FieldError::required()),
            _ => {}
        }
    }

    match (email, password) {
        (Some(email), Some(password)) if errors.is_empty() => Ok(LoginInput { email, password }),
        _ => Err(errors),
    }
}

/// Checks an email/password pair against the credential store.
pub struct Authenticator<S: CredentialStore + ?Sized> {
    store: Arc<S>,
}

impl<S: CredentialStore + ?Sized> Clone for Authenticator<S> {
    fn clone(&self) -> Self {
        Self { store: Arc::clone(&self.store) }
    }
}

impl<S: CredentialStore + ?Sized> Authenticator<S> {
    pub fn new(store: Arc<S>) -> Self { Self { store } }

    /// Unknown email, inactive account and wrong password all yield the same
    /// `AccountError::Authentication`.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn authenticate(&self, input: LoginInput) -> Result<AuthenticatedIdentity, AccountError> {
        let Some(user) = self.store.get_user(&input.email).await? else {
            self.store.verify_unknown(&input.password).await;
            info!("authentication_failed");
            return Err(AccountError::Authentication);
        };

        let verified = self.store.verify_password(&user, &input.password).await?;
        if !verified || !user.is_active {
            info!(user_id = %user.id, "authentication_failed");
            return Err(AccountError::Authentication);
        }

        Ok(AuthenticatedIdentity { user, input })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::PasswordHashing;
    use crate::auth::repository::memory::InMemoryCredentialStore;
    use serde_json::json;

    async fn setup() -> (Arc<InMemoryCredentialStore>, Authenticator<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new(PasswordHashing::insecure_fast()));
        store.create_user("a@example.com", " secret ", "A").await.unwrap();
        let auth = Authenticator::new(Arc::clone(&store));
        (store, auth)
    }

    fn login(email: &str, password: &str) -> LoginInput {
        LoginInput { email: email.into(), password: password.into() }
    }

    #[test]
    fn parse_trims_email_but_not_password() {
        let input = parse_login(&json!({"email": "  a@example.com ", "password": "  pw  "})).unwrap();
        assert_eq!(input.email, "a@example.com");
        assert_eq!(input.password, "  pw  ");
    }

    #[test]
    fn parse_reports_missing_and_blank() {
        let errors = parse_login(&json!({"email": ""})).unwrap_err();
        assert!(errors.has("email", "blank"));
        assert!(errors.has("password", "required"));

        let errors = parse_login(&json!({"email": "   ", "password": null})).unwrap_err();
        assert!(errors.has("email", "blank"));
        assert!(errors.has("password", "null"));
    }

    #[tokio::test]
    async fn correct_credentials_yield_identity() {
        let (_store, auth) = setup().await;
        let identity = auth.authenticate(login("a@example.com", " secret ")).await.unwrap();
        assert_eq!(identity.user.email, "a@example.com");
        assert_eq!(identity.input.password, " secret ");
    }

    #[tokio::test]
    async fn trimmed_password_does_not_match() {
        let (_store, auth) = setup().await;
        let err = auth.authenticate(login("a@example.com", "secret")).await.unwrap_err();
        assert!(matches!(err, AccountError::Authentication));
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let (_store, auth) = setup().await;
        let wrong = auth.authenticate(login("a@example.com", "nope!")).await.unwrap_err();
        let unknown = auth.authenticate(login("b@example.com", " secret ")).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.code(), unknown.code());
    }

    #[tokio::test]
    async fn inactive_user_cannot_authenticate() {
        let (store, auth) = setup().await;
        store.deactivate("a@example.com").unwrap();
        let err = auth.authenticate(login("a@example.com", " secret ")).await.unwrap_err();
        assert!(matches!(err, AccountError::Authentication));
    }
}
