//! Token authentication for routes that act on the caller's own account.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use service::auth::domain::User;

use crate::errors::ApiError;
use crate::observability::TOKEN_REJECTIONS_TOTAL;
use crate::routes::account::ServerState;

pub const NOT_PROVIDED: &str = "Authentication credentials were not provided.";
pub const NO_CREDENTIALS: &str = "Invalid token header. No credentials provided.";
pub const CONTAINS_SPACES: &str = "Invalid token header. Token string should not contain spaces.";
pub const INVALID_CHARACTERS: &str = "Invalid token header. Token string should not contain invalid characters.";
pub const INVALID_TOKEN: &str = "Invalid token.";
pub const INACTIVE_USER: &str = "User inactive or deleted.";

const KEYWORDS: [&str; 2] = ["Token", "Bearer"];

/// Identity resolved from the presented token, inserted as a request extension.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Extract the token from `Authorization: <keyword> <token>`.
pub fn token_from_headers(headers: &HeaderMap) -> Result<String, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(ApiError::NotAuthenticated(NOT_PROVIDED));
    };
    let mut parts = value.as_bytes().split(|b| b.is_ascii_whitespace()).filter(|p| !p.is_empty());

    let keyword = parts.next().unwrap_or_default();
    if !KEYWORDS.iter().any(|k| k.as_bytes().eq_ignore_ascii_case(keyword)) {
        return Err(ApiError::NotAuthenticated(NOT_PROVIDED));
    }
    let token = parts.next().ok_or(ApiError::NotAuthenticated(NO_CREDENTIALS))?;
    if parts.next().is_some() {
        return Err(ApiError::NotAuthenticated(CONTAINS_SPACES));
    }
    std::str::from_utf8(token)
        .map(str::to_string)
        .map_err(|_| ApiError::NotAuthenticated(INVALID_CHARACTERS))
}

/// Resolve the bearer of the request or reject with 401.
pub async fn require_token(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path().to_string();
    let user = match authenticate(&state, req.headers()).await {
        Ok(user) => user,
        Err(e) => {
            TOKEN_REJECTIONS_TOTAL.inc();
            tracing::warn!(path = %path, error = %e, "token authentication rejected");
            return Err(e);
        }
    };
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

async fn authenticate(state: &ServerState, headers: &HeaderMap) -> Result<User, ApiError> {
    let key = token_from_headers(headers)?;
    let user = state
        .accounts
        .resolve_token(&key)
        .await?
        .ok_or(ApiError::NotAuthenticated(INVALID_TOKEN))?;
    if !user.is_active {
        return Err(ApiError::NotAuthenticated(INACTIVE_USER));
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static [u8]) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_bytes(value).unwrap());
        h
    }

    fn detail(res: Result<String, ApiError>) -> &'static str {
        match res {
            Err(ApiError::NotAuthenticated(d)) => d,
            other => panic!("expected 401, got {other:?}"),
        }
    }

    #[test]
    fn accepts_token_and_bearer_keywords() {
        assert_eq!(token_from_headers(&headers(b"Token abc")).unwrap(), "abc");
        assert_eq!(token_from_headers(&headers(b"bearer abc")).unwrap(), "abc");
        assert_eq!(token_from_headers(&headers(b"TOKEN   abc ")).unwrap(), "abc");
    }

    #[test]
    fn missing_or_foreign_scheme_is_not_provided() {
        assert_eq!(detail(token_from_headers(&HeaderMap::new())), NOT_PROVIDED);
        assert_eq!(detail(token_from_headers(&headers(b"Basic dXNlcjpwdw=="))), NOT_PROVIDED);
        assert_eq!(detail(token_from_headers(&headers(b""))), NOT_PROVIDED);
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(detail(token_from_headers(&headers(b"Token"))), NO_CREDENTIALS);
        assert_eq!(detail(token_from_headers(&headers(b"Token a b"))), CONTAINS_SPACES);
        assert_eq!(detail(token_from_headers(&headers(b"Token \xff\xfe"))), INVALID_CHARACTERS);
    }
}
