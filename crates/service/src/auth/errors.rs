use std::collections::BTreeMap;

use serde::ser::{Serialize, SerializeMap, Serializer};
use thiserror::Error;

/// Key used for errors that do not belong to a single input field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

/// A single rejected rule on one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Machine-readable reason, e.g. `too_short`.
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn required() -> Self {
        Self::new("required", "This field is required.")
    }

    pub fn null() -> Self {
        Self::new("null", "This field may not be null.")
    }

    pub fn blank() -> Self {
        Self::new("blank", "This field may not be blank.")
    }

    pub fn not_a_string() -> Self {
        Self::new("invalid", "Not a valid string.")
    }

    pub fn invalid_email() -> Self {
        Self::new("invalid", "Enter a valid email address.")
    }

    pub fn too_short(min: usize) -> Self {
        Self::new("too_short", format!("Ensure this field has at least {min} characters."))
    }

    pub fn max_length(max: usize) -> Self {
        Self::new("max_length", format!("Ensure this field has no more than {max} characters."))
    }

    pub fn email_taken() -> Self {
        Self::new("unique", "user with this email already exists.")
    }
}

/// Field-keyed validation errors, serialized as `{field: [message, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<FieldError>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, error: FieldError) -> Self {
        let mut errors = Self::new();
        errors.add(field, error);
        errors
    }

    pub fn add(&mut self, field: &str, error: FieldError) {
        self.0.entry(field.to_string()).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[FieldError]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Whether `field` was rejected with reason `code`.
    pub fn has(&self, field: &str, code: &str) -> bool {
        self.get(field).is_some_and(|errs| errs.iter().any(|e| e.code == code))
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, errs) in &self.0 {
            for e in errs {
                if !first { f.write_str("; ")?; }
                write!(f, "{field}: {}", e.code)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, errs) in &self.0 {
            let messages: Vec<&str> = errs.iter().map(|e| e.message.as_str()).collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

/// Failures raised by a credential store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user already exists")]
    Conflict,
    #[error("user not found")]
    NotFound,
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("repository error: {0}")]
    Repository(String),
}

impl StoreError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            StoreError::Conflict => 1002,
            StoreError::NotFound => 1003,
            StoreError::Hash(_) => 1101,
            StoreError::Repository(_) => 1200,
        }
    }
}

impl From<models::errors::ModelError> for StoreError {
    fn from(err: models::errors::ModelError) -> Self {
        use models::errors::ModelError;
        match err {
            ModelError::Conflict(_) => StoreError::Conflict,
            ModelError::Validation(msg) | ModelError::Db(msg) => StoreError::Repository(msg),
        }
    }
}

/// Business errors for account workflows
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    /// Single failure path for credential checks; carries no detail on purpose.
    #[error("Unable to authenticate with provided credentials")]
    Authentication,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccountError {
    pub fn code(&self) -> u16 {
        match self {
            AccountError::Validation(_) => 1001,
            AccountError::Authentication => 1004,
            AccountError::Store(e) => e.code(),
        }
    }
}

impl From<FieldErrors> for AccountError {
    fn from(errors: FieldErrors) -> Self {
        AccountError::Validation(errors)
    }
}
