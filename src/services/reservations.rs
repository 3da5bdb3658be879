//! Reservation service

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        enums::{CopyStatus, ReservationStatus},
        loan::{CheckoutResult, CopyRef},
        reservation::{
            duplicate_ids, CreateReservationRequest, CreatedReservation, Reservation,
            ReservationDetail, ReservationListQuery, ReservedBook,
        },
    },
    pricing,
    repository::{books::book_not_found, Repository},
    services::{
        ensure_active, ensure_within_book_limit, insufficient_balance,
        loans::{ensure_distinct, LoansService},
    },
};

#[derive(Clone)]
pub struct ReservationsService {
    repository: Repository,
    loans: LoansService,
}

impl ReservationsService {
    pub fn new(repository: Repository, loans: LoansService) -> Self {
        Self { repository, loans }
    }

    /// Reserve books for a member, setting one available copy aside per book
    pub async fn create(
        &self,
        member_id: i64,
        request: CreateReservationRequest,
    ) -> AppResult<CreatedReservation> {
        request.validate()?;

        let duplicates = duplicate_ids(&request.book_ids);
        if !duplicates.is_empty() {
            return Err(AppError::business(
                ErrorCode::DuplicateBookIds,
                format!("Books requested more than once: {:?}", duplicates),
            ));
        }

        let mut tx = self.repository.pool.begin().await?;

        let member = self.repository.members.lock_with_level(&mut tx, member_id).await?;
        ensure_active(&member)?;

        let active_loans = self.repository.members.count_active_loans(&mut tx, member_id).await?;
        let reserved = self
            .repository
            .reservations
            .count_active_books(&mut tx, member_id)
            .await?;
        ensure_within_book_limit(
            active_loans + reserved,
            request.book_ids.len() as i64,
            member.max_book_allowed,
        )?;

        let books = self.repository.books.get_many(&mut tx, &request.book_ids).await?;
        let prices: HashMap<i64, Decimal> = books.iter().map(|b| (b.book_id, b.price)).collect();
        if let Some(missing) = request.book_ids.iter().find(|id| !prices.contains_key(id)) {
            return Err(book_not_found(*missing));
        }

        let min_factor = self.repository.copies.min_condition_factor(&mut tx).await?;
        let ordered_prices: Vec<Decimal> = request.book_ids.iter().map(|id| prices[id]).collect();
        let estimated_cost =
            pricing::reservation_estimate(&ordered_prices, min_factor, member.discount_rate);
        if estimated_cost > member.member.balance {
            return Err(insufficient_balance(estimated_cost, member.member.balance));
        }

        let already = self
            .repository
            .reservations
            .actively_reserved(&mut tx, member_id, &request.book_ids)
            .await?;
        if !already.is_empty() {
            return Err(AppError::Conflict(
                ErrorCode::DuplicateReservation,
                format!("Books already reserved: {:?}", already),
            ));
        }

        let reservation = self.repository.reservations.create(&mut tx, member_id).await?;

        let mut book_ids = request.book_ids.clone();
        book_ids.sort_unstable();
        for book_id in &book_ids {
            let copy = self
                .repository
                .copies
                .lock_available(&mut tx, *book_id)
                .await?
                .ok_or_else(|| no_available_copy(*book_id))?;

            self.repository
                .copies
                .set_status(&mut tx, copy.book_id, copy.copies_serial, CopyStatus::Reserved)
                .await?;
            self.repository
                .reservations
                .add_book(&mut tx, reservation.reservation_id, *book_id, Some(copy.copies_serial))
                .await?;
        }

        let books = self
            .repository
            .reservations
            .books(&mut tx, &[reservation.reservation_id])
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = reservation.reservation_id,
            member_id,
            books = books.len(),
            "Reservation created"
        );

        Ok(CreatedReservation {
            reservation,
            books,
            estimated_cost,
        })
    }

    /// Reservations of one member with their books
    pub async fn list_for_member(&self, member_id: i64) -> AppResult<Vec<ReservationDetail>> {
        let reservations = self.repository.reservations.list_for_member(member_id).await?;
        let rows = reservations.into_iter().map(|r| (r, None)).collect();
        self.attach_books(rows).await
    }

    /// Counter listing
    pub async fn search(&self, query: &ReservationListQuery) -> AppResult<Vec<ReservationDetail>> {
        let rows = self
            .repository
            .reservations
            .search(query)
            .await?
            .into_iter()
            .map(|row| (row.reservation, Some(row.member_name)))
            .collect();
        self.attach_books(rows).await
    }

    /// Member cancels one of their own active reservations
    pub async fn cancel(&self, member_id: i64, reservation_id: i64) -> AppResult<Reservation> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self
            .repository
            .reservations
            .lock(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| reservation_not_found(reservation_id))?;

        ensure_cancellable(&reservation, member_id)?;

        let released = self
            .repository
            .copies
            .release_reserved(&mut tx, reservation_id)
            .await?;
        let cancelled = self
            .repository
            .reservations
            .set_status(&mut tx, reservation_id, ReservationStatus::Cancelled, None)
            .await?;

        tx.commit().await?;

        tracing::info!(reservation_id, member_id, released, "Reservation cancelled");

        Ok(cancelled)
    }

    /// Lend the reserved books at the counter and close the reservation
    pub async fn fulfill(
        &self,
        admin_id: i64,
        reservation_id: i64,
        items: Option<Vec<CopyRef>>,
    ) -> AppResult<CheckoutResult> {
        let mut tx = self.repository.pool.begin().await?;

        let reservation = self
            .repository
            .reservations
            .lock(&mut tx, reservation_id)
            .await?
            .ok_or_else(|| reservation_not_found(reservation_id))?;
        if reservation.status != ReservationStatus::Active {
            return Err(AppError::business(
                ErrorCode::ReservationNotActive,
                format!("Reservation is {}", reservation.status),
            ));
        }

        let reserved = self
            .repository
            .reservations
            .books(&mut tx, &[reservation_id])
            .await?;
        let held: HashSet<CopyRef> = held_copies(&reserved).into_iter().collect();

        let items = items.unwrap_or_else(|| held_copies(&reserved));
        if items.is_empty() {
            return Err(AppError::BadRequest("No copies to lend for this reservation".to_string()));
        }
        ensure_distinct(&items)?;

        let reserved_books: HashSet<i64> = reserved.iter().map(|b| b.book_id).collect();
        if let Some(stray) = items.iter().find(|i| !reserved_books.contains(&i.book_id)) {
            return Err(AppError::business(
                ErrorCode::ReservationItemMismatch,
                format!("Book {} is not part of reservation {}", stray.book_id, reservation_id),
            ));
        }

        let result = self
            .loans
            .checkout_in(&mut tx, admin_id, reservation.member_id, &items, &held)
            .await?;

        // Held copies that were not picked up go back on the shelf
        let lent: HashSet<CopyRef> = items.iter().copied().collect();
        for copy in held.difference(&lent) {
            let current = self
                .repository
                .copies
                .lock(&mut tx, copy.book_id, copy.copies_serial)
                .await?;
            if current.is_some_and(|c| c.status == CopyStatus::Reserved) {
                self.repository
                    .copies
                    .set_status(&mut tx, copy.book_id, copy.copies_serial, CopyStatus::Available)
                    .await?;
            }
        }

        let today = self.repository.loans.current_date(&mut tx).await?;
        self.repository
            .reservations
            .set_status(&mut tx, reservation_id, ReservationStatus::Fulfilled, Some(today))
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id,
            loan_id = result.loan_id,
            admin_id,
            "Reservation fulfilled"
        );

        Ok(result)
    }

    async fn attach_books(
        &self,
        rows: Vec<(Reservation, Option<String>)>,
    ) -> AppResult<Vec<ReservationDetail>> {
        let ids: Vec<i64> = rows.iter().map(|(r, _)| r.reservation_id).collect();

        let mut books: HashMap<i64, Vec<ReservedBook>> = HashMap::new();
        for book in self.repository.reservations.list_books(&ids).await? {
            books.entry(book.reservation_id).or_default().push(book);
        }

        Ok(rows
            .into_iter()
            .map(|(reservation, member_name)| ReservationDetail {
                books: books.remove(&reservation.reservation_id).unwrap_or_default(),
                member_name,
                reservation,
            })
            .collect())
    }
}

/// Copies a reservation set aside
fn held_copies(books: &[ReservedBook]) -> Vec<CopyRef> {
    books
        .iter()
        .filter_map(|b| {
            b.copies_serial.map(|copies_serial| CopyRef {
                book_id: b.book_id,
                copies_serial,
            })
        })
        .collect()
}

/// Members may only cancel their own reservations that are still active
fn ensure_cancellable(reservation: &Reservation, member_id: i64) -> AppResult<()> {
    if reservation.member_id != member_id || reservation.status != ReservationStatus::Active {
        return Err(AppError::business(
            ErrorCode::CannotCancel,
            "Only your own active reservations can be cancelled",
        ));
    }
    Ok(())
}

fn no_available_copy(book_id: i64) -> AppError {
    AppError::business(
        ErrorCode::NoAvailableCopy,
        format!("No copy of book {} is available", book_id),
    )
}

fn reservation_not_found(reservation_id: i64) -> AppError {
    AppError::not_found(
        ErrorCode::ReservationNotFound,
        format!("Reservation with id {} not found", reservation_id),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reserved(book_id: i64, copies_serial: Option<i32>) -> ReservedBook {
        ReservedBook {
            reservation_id: 1,
            book_id,
            copies_serial,
            book_name: format!("Book {}", book_id),
            author: None,
        }
    }

    #[test]
    fn test_held_copies_skip_unassigned() {
        let copies = held_copies(&[reserved(4, Some(2)), reserved(5, None), reserved(6, Some(1))]);
        assert_eq!(
            copies,
            vec![
                CopyRef {
                    book_id: 4,
                    copies_serial: 2
                },
                CopyRef {
                    book_id: 6,
                    copies_serial: 1
                },
            ]
        );
    }

    fn reservation(member_id: i64, status: ReservationStatus) -> Reservation {
        Reservation {
            reservation_id: 9,
            member_id,
            reserve_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            pickup_date: None,
            status,
        }
    }

    #[test]
    fn test_cancel_own_active_reservation() {
        assert!(ensure_cancellable(&reservation(4, ReservationStatus::Active), 4).is_ok());
    }

    #[test]
    fn test_cannot_cancel_other_member_reservation() {
        let err = ensure_cancellable(&reservation(4, ReservationStatus::Active), 5).unwrap_err();
        assert!(matches!(
            err,
            AppError::BusinessRule(ErrorCode::CannotCancel, _)
        ));
    }

    #[test]
    fn test_cannot_cancel_closed_reservation() {
        for status in [ReservationStatus::Fulfilled, ReservationStatus::Cancelled] {
            let err = ensure_cancellable(&reservation(4, status), 4).unwrap_err();
            assert!(matches!(
                err,
                AppError::BusinessRule(ErrorCode::CannotCancel, _)
            ));
        }
    }

    #[test]
    fn test_no_available_copy_is_business_error() {
        let err = no_available_copy(12);
        assert_eq!(
            err.status_and_code(),
            (axum::http::StatusCode::BAD_REQUEST, ErrorCode::NoAvailableCopy)
        );
    }
}
