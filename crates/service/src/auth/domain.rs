use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain user (business view). Never carries the password or its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub is_active: bool,
}

/// Opaque credential bound 1:1 to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub key: String,
    pub user_id: Uuid,
}

/// Non-password profile changes; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.name.is_none()
    }

    /// Drop fields that already match `user`.
    pub fn against(self, user: &User) -> Self {
        Self {
            email: self.email.filter(|e| *e != user.email),
            name: self.name.filter(|n| *n != user.name),
        }
    }
}

/// Outbound wire record for a user: exactly `{email, name}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub name: String,
}

/// Outbound wire record for token issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
}

/// Login input for the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Result of a successful credential check: the user together with the
/// fields that were submitted, handed to token issuance.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user: User,
    pub input: LoginInput,
}
