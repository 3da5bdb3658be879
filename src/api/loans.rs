//! Counter loan workflow endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::loan::{
        BatchReturnRequest, BatchReturnResponse, BorrowPreview, BorrowPreviewQuery,
        CheckoutRequest, CheckoutResult, CopyRef, FineCalculationRequest,
        FineCalculationResponse, LoanItemWithFees, LoanSearchQuery, OpenLoan, RenewResult,
        ReturnOptions, ReturnResult,
    },
    services::loans::RenewActor,
    AppState,
};

use super::AuthenticatedUser;

/// Price one copy for a member without lending it
#[utoipa::path(
    get,
    path = "/admin/borrow/preview",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(BorrowPreviewQuery),
    responses(
        (status = 200, description = "Expected rental fee and due date", body = BorrowPreview),
        (status = 400, description = "Copy not available", body = crate::error::ErrorResponse),
        (status = 403, description = "Member is not active", body = crate::error::ErrorResponse),
        (status = 404, description = "Member or copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_preview(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<BorrowPreviewQuery>,
) -> AppResult<Json<BorrowPreview>> {
    claims.require_admin()?;
    let preview = state.services.loans.preview(&query).await?;
    Ok(Json(preview))
}

/// Lend copies to a member
#[utoipa::path(
    post,
    path = "/admin/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Loan created", body = CheckoutResult),
        (status = 400, description = "Copy unavailable, too many books or balance too low", body = crate::error::ErrorResponse),
        (status = 403, description = "Member is not active", body = crate::error::ErrorResponse),
        (status = 404, description = "Member or copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn checkout(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<CheckoutResult>)> {
    let admin_id = claims.require_admin()?;
    let result = state.services.loans.checkout(admin_id, request).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Return one copy
#[utoipa::path(
    post,
    path = "/admin/loans/{loan_id}/items/{book_id}/{serial}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("loan_id" = i64, Path, description = "Loan ID"),
        ("book_id" = i64, Path, description = "Book ID"),
        ("serial" = i32, Path, description = "Copy serial")
    ),
    request_body = ReturnOptions,
    responses(
        (status = 200, description = "Copy returned", body = ReturnResult),
        (status = 400, description = "Already returned", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((loan_id, book_id, copies_serial)): Path<(i64, i64, i32)>,
    Json(options): Json<ReturnOptions>,
) -> AppResult<Json<ReturnResult>> {
    claims.require_admin()?;
    let copy = CopyRef {
        book_id,
        copies_serial,
    };
    let result = state.services.loans.return_item(loan_id, copy, options).await?;
    Ok(Json(result))
}

/// Return several copies; each one succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/admin/loans/batch-return",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = BatchReturnRequest,
    responses(
        (status = 200, description = "Per item outcome", body = BatchReturnResponse)
    )
)]
pub async fn batch_return(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<BatchReturnRequest>,
) -> AppResult<Json<BatchReturnResponse>> {
    claims.require_admin()?;
    let response = state.services.loans.batch_return(request).await?;
    Ok(Json(response))
}

/// Fine estimate, nothing is written
#[utoipa::path(
    post,
    path = "/admin/loans/calculate-fines",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = FineCalculationRequest,
    responses(
        (status = 200, description = "Fine breakdown per item", body = FineCalculationResponse)
    )
)]
pub async fn calculate_fines(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<FineCalculationRequest>,
) -> AppResult<Json<FineCalculationResponse>> {
    claims.require_admin()?;
    let response = state.services.loans.calculate_fines(request).await?;
    Ok(Json(response))
}

/// Renew an item at the counter
#[utoipa::path(
    post,
    path = "/admin/loans/{loan_id}/items/{book_id}/{serial}/renew",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("loan_id" = i64, Path, description = "Loan ID"),
        ("book_id" = i64, Path, description = "Book ID"),
        ("serial" = i32, Path, description = "Copy serial")
    ),
    responses(
        (status = 200, description = "Item renewed", body = RenewResult),
        (status = 400, description = "Returned, limit reached or balance too low", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn renew_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((loan_id, book_id, copies_serial)): Path<(i64, i64, i32)>,
) -> AppResult<Json<RenewResult>> {
    claims.require_admin()?;
    let copy = CopyRef {
        book_id,
        copies_serial,
    };
    let result = state.services.loans.renew(RenewActor::Admin, loan_id, copy).await?;
    Ok(Json(result))
}

/// Loans with unreturned items, by loan or by member
#[utoipa::path(
    get,
    path = "/admin/loans/search",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(LoanSearchQuery),
    responses(
        (status = 200, description = "Open loans", body = Vec<OpenLoan>),
        (status = 400, description = "Unknown search type", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<LoanSearchQuery>,
) -> AppResult<Json<Vec<OpenLoan>>> {
    claims.require_admin()?;
    let loans = state.services.loans.search_open_loans(&query).await?;
    Ok(Json(loans))
}

/// Every item of a loan with its additional fees
#[utoipa::path(
    get,
    path = "/admin/loans/{loan_id}/records",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("loan_id" = i64, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan items", body = Vec<LoanItemWithFees>),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn loan_records(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<i64>,
) -> AppResult<Json<Vec<LoanItemWithFees>>> {
    claims.require_admin()?;
    let records = state.services.loans.loan_records(loan_id).await?;
    Ok(Json(records))
}
