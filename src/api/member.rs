//! Member self-service endpoints

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::{CopyRef, LoanItemView, RenewResult},
        member::MemberProfile,
    },
    services::loans::RenewActor,
    AppState,
};

use super::AuthenticatedUser;

/// Profile of the logged in member
#[utoipa::path(
    get,
    path = "/member/profile",
    tag = "member",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Member with level terms", body = MemberProfile),
        (status = 403, description = "Not a member token", body = crate::error::ErrorResponse)
    )
)]
pub async fn profile(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<MemberProfile>> {
    let member_id = claims.require_member()?;
    let profile = state.services.members.profile(member_id).await?;
    Ok(Json(profile))
}

/// Items the member still has at home
#[utoipa::path(
    get,
    path = "/member/loans/active",
    tag = "member",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Unreturned items", body = Vec<LoanItemView>)
    )
)]
pub async fn active_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanItemView>>> {
    let member_id = claims.require_member()?;
    let items = state.services.loans.member_active_items(member_id).await?;
    Ok(Json(items))
}

/// Returned items
#[utoipa::path(
    get,
    path = "/member/loans/history",
    tag = "member",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Returned items", body = Vec<LoanItemView>)
    )
)]
pub async fn loan_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanItemView>>> {
    let member_id = claims.require_member()?;
    let items = state.services.loans.member_history(member_id).await?;
    Ok(Json(items))
}

/// Renew one of the member's own items before it is overdue
#[utoipa::path(
    post,
    path = "/member/loans/{loan_id}/items/{book_id}/{serial}/renew",
    tag = "member",
    security(("bearer_auth" = [])),
    params(
        ("loan_id" = i64, Path, description = "Loan ID"),
        ("book_id" = i64, Path, description = "Book ID"),
        ("serial" = i32, Path, description = "Copy serial")
    ),
    responses(
        (status = 200, description = "Item renewed", body = RenewResult),
        (status = 400, description = "Overdue, returned, limit reached or balance too low", body = crate::error::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((loan_id, book_id, copies_serial)): Path<(i64, i64, i32)>,
) -> AppResult<Json<RenewResult>> {
    let member_id = claims.require_member()?;
    let result = state
        .services
        .loans
        .renew(
            RenewActor::Member(member_id),
            loan_id,
            CopyRef {
                book_id,
                copies_serial,
            },
        )
        .await?;
    Ok(Json(result))
}
