use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct CreateUserRequest {
    /// Unique, at most 255 characters
    pub email: String,
    /// 5 to 128 characters, not trimmed
    pub password: String,
    pub name: String,
}

#[derive(ToSchema)]
pub struct TokenRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct ReplaceUserRequest { pub email: String, pub name: String, pub password: Option<String> }

#[derive(ToSchema)]
pub struct PatchUserRequest { pub email: Option<String>, pub name: Option<String>, pub password: Option<String> }

#[derive(ToSchema)]
pub struct UserResponse { pub email: String, pub name: String }

#[derive(ToSchema)]
pub struct TokenResponse {
    /// 40 hex characters; send as `Authorization: Token <token>`
    pub token: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::account::create_user,
        crate::routes::account::create_token,
        crate::routes::account::get_me,
        crate::routes::account::put_me,
        crate::routes::account::patch_me,
    ),
    components(
        schemas(
            HealthResponse,
            CreateUserRequest,
            TokenRequest,
            ReplaceUserRequest,
            PatchUserRequest,
            UserResponse,
            TokenResponse,
        )
    ),
    tags(
        (name = "health"),
        (name = "user")
    )
)]
pub struct ApiDoc;
