use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use service::auth::errors::{AccountError, FieldErrors, NON_FIELD_ERRORS};
use thiserror::Error;
use tracing::error;

/// Scheme advertised in `WWW-Authenticate` on 401 responses.
pub const AUTH_HEADER_SCHEME: &str = "Token";

/// Request-level failures and their wire shapes.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 `{field: [message, ...]}`
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    /// 400 `{non_field_errors: [...]}`
    #[error("Unable to authenticate with provided credentials")]
    Authentication,
    /// 401 `{detail}` with `WWW-Authenticate`
    #[error("{0}")]
    NotAuthenticated(&'static str),
    /// 400 `{detail}` for unparseable request bodies
    #[error("JSON parse error - {0}")]
    Parse(String),
    /// 500; the cause is logged, never returned
    #[error("internal error (code {code}): {message}")]
    Internal { code: u16, message: String },
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(errors) => ApiError::Validation(errors),
            AccountError::Authentication => ApiError::Authentication,
            other => ApiError::Internal { code: other.code(), message: other.to_string() },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(json!(errors))).into_response(),
            ApiError::Authentication => {
                let msg = ApiError::Authentication.to_string();
                (StatusCode::BAD_REQUEST, Json(json!({ NON_FIELD_ERRORS: [msg] }))).into_response()
            }
            ApiError::NotAuthenticated(detail) => {
                let mut resp = (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response();
                resp.headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(AUTH_HEADER_SCHEME));
                resp
            }
            parse @ ApiError::Parse(_) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": parse.to_string() }))).into_response()
            }
            ApiError::Internal { code, message } => {
                error!(code, error = %message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "detail": "Internal server error." })))
                    .into_response()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use service::auth::errors::{FieldError, StoreError};

    #[test]
    fn store_failures_become_internal() {
        let err: ApiError = AccountError::Store(StoreError::Repository("db down".into())).into();
        assert!(matches!(err, ApiError::Internal { code: 1200, .. }));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_per_variant() {
        let v = ApiError::Validation(FieldErrors::single("email", FieldError::required()));
        assert_eq!(v.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Authentication.into_response().status(), StatusCode::BAD_REQUEST);

        let resp = ApiError::NotAuthenticated("Invalid token.").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Token");
    }
}
