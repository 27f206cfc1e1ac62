//! Field extraction and validation for inbound JSON payloads.

use serde_json::{Map, Value};

use super::errors::{FieldError, FieldErrors, NON_FIELD_ERRORS};

pub const EMAIL_MAX_LENGTH: usize = 255;
pub const NAME_MAX_LENGTH: usize = 255;
pub const PASSWORD_MIN_LENGTH: usize = 5;
pub const PASSWORD_MAX_LENGTH: usize = 128;

/// Borrow the request body as a JSON object or report why it is not one.
pub fn as_object(body: &Value) -> Result<&Map<String, Value>, FieldErrors> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(FieldErrors::single(
            NON_FIELD_ERRORS,
            FieldError::new(
                "invalid",
                format!("Invalid data. Expected a dictionary, but got {}.", json_type_name(other)),
            ),
        )),
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Read a string field. Numbers are accepted and rendered as text; other
/// non-string values record an error. `None` with nothing recorded means the
/// key is absent.
pub fn string_field(
    obj: &Map<String, Value>,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match obj.get(field)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => {
            errors.add(field, FieldError::null());
            None
        }
        _ => {
            errors.add(field, FieldError::not_a_string());
            None
        }
    }
}

/// Character count as users perceive it for length limits.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Lowercase the domain part, keep the local part as typed.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

const LOCAL_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

fn valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || LOCAL_SPECIALS.contains(c))
}

fn valid_domain_label(label: &str) -> bool {
    !label.is_empty()
        && label.chars().count() <= 63
        && !label.starts_with('-')
        && !label.ends_with('-')
        && label.chars().all(|c| c.is_alphanumeric() || c == '-')
}

fn valid_domain(domain: &str) -> bool {
    if domain.eq_ignore_ascii_case("localhost") {
        return true;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || !labels.iter().all(|l| valid_domain_label(l)) {
        return false;
    }
    labels
        .last()
        .is_some_and(|tld| tld.chars().count() >= 2 && !tld.chars().all(|c| c.is_ascii_digit()))
}

/// Structural email check: dot-atom local part and a dotted hostname.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => valid_local_part(local) && valid_domain(domain),
        None => false,
    }
}

/// Validate a present email value; returns the normalized form.
pub fn check_email(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let email = raw.trim();
    if email.is_empty() {
        errors.add("email", FieldError::blank());
        return None;
    }
    let mut ok = true;
    if char_len(email) > EMAIL_MAX_LENGTH {
        errors.add("email", FieldError::max_length(EMAIL_MAX_LENGTH));
        ok = false;
    }
    if !is_valid_email(email) {
        errors.add("email", FieldError::invalid_email());
        ok = false;
    }
    ok.then(|| normalize_email(email))
}

pub fn check_name(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        errors.add("name", FieldError::blank());
        return None;
    }
    if char_len(name) > NAME_MAX_LENGTH {
        errors.add("name", FieldError::max_length(NAME_MAX_LENGTH));
        return None;
    }
    Some(name.to_string())
}

/// Passwords are never trimmed.
pub fn check_password(raw: &str, errors: &mut FieldErrors) -> Option<String> {
    if raw.is_empty() {
        errors.add("password", FieldError::blank());
        return None;
    }
    let len = char_len(raw);
    if len < PASSWORD_MIN_LENGTH {
        errors.add("password", FieldError::too_short(PASSWORD_MIN_LENGTH));
        return None;
    }
    if len > PASSWORD_MAX_LENGTH {
        errors.add("password", FieldError::max_length(PASSWORD_MAX_LENGTH));
        return None;
    }
    Some(raw.to_string())
}
