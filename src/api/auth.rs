//! Login endpoints

use axum::{extract::State, Json};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        auth::{AdminLoginResponse, MemberLoginResponse},
        member::LoginRequest,
    },
    AppState,
};

/// Counter staff login with name and phone number
#[utoipa::path(
    post,
    path = "/admin/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AdminLoginResponse),
        (status = 401, description = "Unknown account or wrong phone", body = crate::error::ErrorResponse),
        (status = 403, description = "Account is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AdminLoginResponse>> {
    request.validate()?;
    let response = state.services.auth.admin_login(&request).await?;
    Ok(Json(response))
}

/// Member login with name and phone number
#[utoipa::path(
    post,
    path = "/member/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = MemberLoginResponse),
        (status = 401, description = "Unknown account or wrong phone", body = crate::error::ErrorResponse),
        (status = 403, description = "Account is not active", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<MemberLoginResponse>> {
    request.validate()?;
    let response = state.services.auth.member_login(&request).await?;
    Ok(Json(response))
}
