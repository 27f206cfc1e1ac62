use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value;
use tracing::info;

use service::auth::domain::{TokenRecord, User, UserRecord};
use service::auth::AccountService;

use crate::auth::CurrentUser;
use crate::errors::ApiError;
use crate::observability::{ACCOUNTS_CREATED_TOTAL, AUTH_FAILURES_TOTAL, PROFILE_UPDATES_TOTAL, TOKENS_ISSUED_TOTAL};

#[derive(Clone)]
pub struct ServerState {
    pub accounts: AccountService,
}

impl ServerState {
    pub fn new(accounts: AccountService) -> Self {
        Self { accounts }
    }
}

/// Decode a JSON request body. An empty body reads as `{}`.
pub fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Parse(e.to_string()))
}

#[utoipa::path(post, path = "/api/user/create/", tag = "user", request_body = crate::openapi::CreateUserRequest,
    responses((status = 201, description = "Created", body = crate::openapi::UserResponse), (status = 400, description = "Field errors")))]
pub async fn create_user(State(state): State<ServerState>, body: Bytes) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let body = parse_body(&body)?;
    let record = state.accounts.create_account(&body).await?;
    ACCOUNTS_CREATED_TOTAL.inc();
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(post, path = "/api/user/token/", tag = "user", request_body = crate::openapi::TokenRequest,
    responses((status = 200, description = "Token", body = crate::openapi::TokenResponse), (status = 400, description = "Field errors or bad credentials")))]
pub async fn create_token(State(state): State<ServerState>, body: Bytes) -> Result<Json<TokenRecord>, ApiError> {
    let body = parse_body(&body)?;
    match state.accounts.issue_token(&body).await {
        Ok(token) => {
            TOKENS_ISSUED_TOTAL.inc();
            Ok(Json(token))
        }
        Err(e) => {
            let err = ApiError::from(e);
            if matches!(err, ApiError::Authentication) {
                AUTH_FAILURES_TOTAL.inc();
            }
            Err(err)
        }
    }
}

#[utoipa::path(get, path = "/api/user/me/", tag = "user",
    responses((status = 200, description = "Current user", body = crate::openapi::UserResponse), (status = 401, description = "Unauthorized")))]
pub async fn get_me(State(state): State<ServerState>, Extension(current): Extension<CurrentUser>) -> Json<UserRecord> {
    Json(state.accounts.get_self(&current.0))
}

#[utoipa::path(put, path = "/api/user/me/", tag = "user", request_body = crate::openapi::ReplaceUserRequest,
    responses((status = 200, description = "Updated", body = crate::openapi::UserResponse), (status = 400, description = "Field errors"), (status = 401, description = "Unauthorized")))]
pub async fn put_me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    body: Bytes,
) -> Result<Json<UserRecord>, ApiError> {
    update_me(state, current.0, body, false).await
}

#[utoipa::path(patch, path = "/api/user/me/", tag = "user", request_body = crate::openapi::PatchUserRequest,
    responses((status = 200, description = "Updated", body = crate::openapi::UserResponse), (status = 400, description = "Field errors"), (status = 401, description = "Unauthorized")))]
pub async fn patch_me(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    body: Bytes,
) -> Result<Json<UserRecord>, ApiError> {
    update_me(state, current.0, body, true).await
}

async fn update_me(
    state: ServerState,
    user: User,
    body: Bytes,
    partial: bool,
) -> Result<Json<UserRecord>, ApiError> {
    let body = parse_body(&body)?;
    let record = state.accounts.update_self(&user, &body, partial).await?;
    PROFILE_UPDATES_TOTAL.inc();
    info!(user_id = %user.id, partial, "profile_updated");
    Ok(Json(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_an_empty_object() {
        assert_eq!(parse_body(&Bytes::new()).unwrap(), serde_json::json!({}));
        assert_eq!(parse_body(&Bytes::from_static(b" \n")).unwrap(), serde_json::json!({}));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        let err = parse_body(&Bytes::from_static(b"{\"email\":")).unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        assert!(err.to_string().starts_with("JSON parse error - "));
    }
}
