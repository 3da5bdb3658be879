//! Business logic services

pub mod auth;
pub mod catalog;
pub mod loans;
pub mod members;
pub mod reservations;
pub mod search_history;
pub mod stats;

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult, ErrorCode},
    models::{enums::MemberStatus, member::MemberWithLevel},
    repository::{search_history::SearchHistoryStore, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub members: members::MembersService,
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub reservations: reservations::ReservationsService,
    pub stats: stats::StatsService,
    pub search_history: search_history::SearchHistoryService,
}

impl Services {
    /// Create all services with the given repository and search history store
    pub fn new(
        repository: Repository,
        search_store: Arc<dyn SearchHistoryStore>,
        config: &AppConfig,
    ) -> Self {
        let search_history =
            search_history::SearchHistoryService::new(search_store, config.search_history.clone());
        let loans = loans::LoansService::new(repository.clone(), config.rental.clone());

        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            members: members::MembersService::new(repository.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), search_history.clone()),
            reservations: reservations::ReservationsService::new(repository.clone(), loans.clone()),
            stats: stats::StatsService::new(repository),
            loans,
            search_history,
        }
    }
}

/// Members must be Active to borrow, reserve, renew or top up
pub(crate) fn ensure_active(member: &MemberWithLevel) -> AppResult<()> {
    if member.member.status == MemberStatus::Active {
        Ok(())
    } else {
        Err(AppError::Authorization(
            ErrorCode::MemberInactive,
            format!("Member account is {}", member.member.status),
        ))
    }
}

pub(crate) fn insufficient_balance(required: Decimal, balance: Decimal) -> AppError {
    AppError::business(
        ErrorCode::InsufficientBalance,
        format!("Balance {} does not cover {}", balance, required),
    )
}

/// Books already out (and held) plus the new ones must fit the level limit
pub(crate) fn ensure_within_book_limit(
    current: i64,
    requested: i64,
    max_book_allowed: i32,
) -> AppResult<()> {
    if current + requested > i64::from(max_book_allowed) {
        return Err(AppError::business(
            ErrorCode::MaxBookExceeded,
            format!(
                "Member holds {} book(s), asks for {} more and may hold at most {}",
                current, requested, max_book_allowed
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_limit_allows_exact_fit() {
        assert!(ensure_within_book_limit(2, 1, 3).is_ok());
        assert!(ensure_within_book_limit(0, 3, 3).is_ok());
    }

    #[test]
    fn test_book_limit_exceeded() {
        let err = ensure_within_book_limit(2, 2, 3).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(ErrorCode::MaxBookExceeded, _)
        ));
        assert_eq!(err.status_and_code().0, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_insufficient_balance_code() {
        let err = insufficient_balance(Decimal::from(200), Decimal::from(50));
        assert!(matches!(
            err,
            AppError::BusinessRule(ErrorCode::InsufficientBalance, _)
        ));
    }
}
