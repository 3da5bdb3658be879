//! Member management at the counter

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        member::{
            AdjustBalanceRequest, CreateMemberRequest, Member, MemberDetail, MemberLoanSummary,
            MemberSearchQuery, TopUpRequest, TopUpResponse,
            UpdateMemberStatusRequest,
        },
        pagination::PaginatedMembers,
    },
    AppState,
};

use super::AuthenticatedUser;

/// Register a new member
#[utoipa::path(
    post,
    path = "/admin/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMemberRequest,
    responses(
        (status = 201, description = "Member registered", body = Member),
        (status = 400, description = "Invalid input or no matching level", body = crate::error::ErrorResponse),
        (status = 409, description = "Name and phone already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<Member>)> {
    let admin_id = claims.require_admin()?;
    let member = state.services.members.create_member(admin_id, request).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

/// Search members by id or name
#[utoipa::path(
    get,
    path = "/admin/members/search",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberSearchQuery),
    responses(
        (status = 200, description = "Matching members", body = PaginatedMembers)
    )
)]
pub async fn search_members(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MemberSearchQuery>,
) -> AppResult<Json<PaginatedMembers>> {
    claims.require_admin()?;
    let members = state.services.members.search(&query).await?;
    Ok(Json(members))
}

/// Member with level and top-up history
#[utoipa::path(
    get,
    path = "/admin/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = MemberDetail),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i64>,
) -> AppResult<Json<MemberDetail>> {
    claims.require_admin()?;
    let detail = state.services.members.get_detail(member_id).await?;
    Ok(Json(detail))
}

/// Signed manual balance adjustment
#[utoipa::path(
    patch,
    path = "/admin/members/{id}/balance",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Member ID")),
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "Balance adjusted", body = Member),
        (status = 400, description = "Balance would become negative", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn adjust_balance(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i64>,
    Json(request): Json<AdjustBalanceRequest>,
) -> AppResult<Json<Member>> {
    claims.require_admin()?;
    let member = state.services.members.adjust_balance(member_id, request.amount).await?;
    Ok(Json(member))
}

#[utoipa::path(
    patch,
    path = "/admin/members/{id}/status",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Member ID")),
    request_body = UpdateMemberStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_status(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i64>,
    Json(request): Json<UpdateMemberStatusRequest>,
) -> AppResult<Json<Member>> {
    claims.require_admin()?;
    let member = state.services.members.update_status(member_id, request.status).await?;
    Ok(Json(member))
}

/// Credit the balance; a large enough top-up upgrades the level
#[utoipa::path(
    post,
    path = "/admin/members/{id}/top-up",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Member ID")),
    request_body = TopUpRequest,
    responses(
        (status = 200, description = "Balance credited", body = TopUpResponse),
        (status = 400, description = "Amount is not positive", body = crate::error::ErrorResponse),
        (status = 403, description = "Member is not active", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn top_up(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i64>,
    Json(request): Json<TopUpRequest>,
) -> AppResult<Json<TopUpResponse>> {
    let admin_id = claims.require_admin()?;
    let response = state
        .services
        .members
        .top_up(admin_id, member_id, request.amount)
        .await?;
    Ok(Json(response))
}

/// Loans of a member with item counts
#[utoipa::path(
    get,
    path = "/admin/members/{id}/loans",
    tag = "members",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Loans of the member", body = Vec<MemberLoanSummary>),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(member_id): Path<i64>,
) -> AppResult<Json<Vec<MemberLoanSummary>>> {
    claims.require_admin()?;
    let loans = state.services.members.loans(member_id).await?;
    Ok(Json(loans))
}
