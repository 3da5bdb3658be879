//! API handlers for the book rental REST endpoints

pub mod auth;
pub mod books;
pub mod health;
pub mod loans;
pub mod member;
pub mod members;
pub mod openapi;
pub mod reservations;
pub mod search_history;
pub mod stats;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{delete, get, patch, post},
    Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    error::{AppError, ErrorCode},
    models::auth::Claims,
    AppState,
};

/// Extractor for an authenticated admin or member from the bearer token
pub struct AuthenticatedUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    AppError::Authentication(
                        ErrorCode::Unauthorized,
                        "Missing or malformed bearer token".to_string(),
                    )
                })?;

        let claims = Claims::from_token(bearer.token(), &state.config.auth.jwt_secret).map_err(|e| {
            AppError::Authentication(ErrorCode::Unauthorized, format!("Invalid token: {}", e))
        })?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Like [`AuthenticatedUser`] for public routes; a present but invalid token is still rejected
pub struct OptionalUser(pub Option<Claims>);

impl OptionalUser {
    /// Member id when the caller presented a member token
    pub fn member_id(&self) -> Option<i64> {
        self.0.as_ref().and_then(|claims| claims.require_member().ok())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(OptionalUser(None));
        }
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        Ok(OptionalUser(Some(claims)))
    }
}

/// All `/api/v1` routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/admin/login", post(auth::admin_login))
        .route("/member/login", post(auth::member_login))
        // Members (counter)
        .route("/admin/members", post(members::create_member))
        .route("/admin/members/search", get(members::search_members))
        .route("/admin/members/:id", get(members::get_member))
        .route("/admin/members/:id/balance", patch(members::adjust_balance))
        .route("/admin/members/:id/status", patch(members::update_status))
        .route("/admin/members/:id/top-up", post(members::top_up))
        .route("/admin/members/:id/loans", get(members::member_loans))
        // Member self-service
        .route("/member/profile", get(member::profile))
        .route("/member/loans/active", get(member::active_loans))
        .route("/member/loans/history", get(member::loan_history))
        .route(
            "/member/loans/:loan_id/items/:book_id/:serial/renew",
            post(member::renew),
        )
        .route("/member/reservations", get(reservations::my_reservations))
        .route("/member/reservations/:id", delete(reservations::cancel_reservation))
        // Catalogue
        .route("/books", get(books::search_books))
        .route("/books/:id", get(books::get_book))
        .route("/categories", get(books::list_categories))
        .route("/admin/books", get(books::list_inventory).post(books::create_book))
        .route("/admin/books/search", get(books::admin_search))
        .route(
            "/admin/books/:id",
            patch(books::update_book).delete(books::delete_book),
        )
        .route("/admin/books/:id/categories", post(books::set_book_categories))
        .route("/admin/books/:id/copies", post(books::add_copy))
        .route("/admin/books/:id/copies/:serial", patch(books::update_copy))
        .route("/admin/categories", post(books::create_category))
        .route("/admin/categories/:id", patch(books::rename_category))
        .route("/admin/fee-types", get(books::list_fee_types))
        // Loans (counter)
        .route("/admin/borrow/preview", get(loans::borrow_preview))
        .route("/admin/loans", post(loans::checkout))
        .route("/admin/loans/search", get(loans::search_loans))
        .route("/admin/loans/batch-return", post(loans::batch_return))
        .route("/admin/loans/calculate-fines", post(loans::calculate_fines))
        .route("/admin/loans/:loan_id/records", get(loans::loan_records))
        .route(
            "/admin/loans/:loan_id/items/:book_id/:serial/return",
            post(loans::return_item),
        )
        .route(
            "/admin/loans/:loan_id/items/:book_id/:serial/renew",
            post(loans::renew_item),
        )
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/admin/reservations", get(reservations::list_reservations))
        .route(
            "/admin/reservations/:id/fulfill",
            post(reservations::fulfill_reservation),
        )
        // Statistics
        .route("/stats/top-books", get(stats::top_books))
        .route("/stats/top-categories", get(stats::top_categories))
        // Search history
        .route("/search-history/member/history", get(search_history::member_history))
        .route("/search-history/admin/analytics", get(search_history::analytics))
        .with_state(state)
}
