//! Physical copies and condition factors

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::BookCopy,
        enums::{BookCondition, CopyStatus},
    },
};

/// Values for a copy insert
#[derive(Debug, Clone)]
pub struct NewCopy {
    pub book_id: i64,
    pub copies_serial: i32,
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    pub book_condition: BookCondition,
    pub rental_price: Decimal,
}

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn get(&self, book_id: i64, copies_serial: i32) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 AND copies_serial = $2",
        )
        .bind(book_id)
        .bind(copies_serial)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| copy_not_found(book_id, copies_serial))
    }

    /// Copies of several books, optionally restricted to one status
    pub async fn list_for_books(
        &self,
        book_ids: &[i64],
        status: Option<CopyStatus>,
    ) -> AppResult<Vec<BookCopy>> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }

        let copies = sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT * FROM book_copies
            WHERE book_id = ANY($1) AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY book_id, copies_serial
            "#,
        )
        .bind(book_ids)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// Lock one copy row; `None` when it does not exist
    pub async fn lock(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
        copies_serial: i32,
    ) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 AND copies_serial = $2 FOR UPDATE",
        )
        .bind(book_id)
        .bind(copies_serial)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Lock the cheapest available copy of a book, skipping copies other
    /// transactions are holding
    pub async fn lock_available(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
    ) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            r#"
            SELECT * FROM book_copies
            WHERE book_id = $1 AND status = 'Available'
            ORDER BY rental_price, copies_serial
            LIMIT 1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(copy)
    }

    /// Next serial for a book; the caller holds the book row lock
    pub async fn next_serial(&self, conn: &mut PgConnection, book_id: i64) -> AppResult<i32> {
        let serial: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(copies_serial), 0) + 1 FROM book_copies WHERE book_id = $1",
        )
        .bind(book_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(serial)
    }

    pub async fn create(&self, conn: &mut PgConnection, copy: &NewCopy) -> AppResult<BookCopy> {
        let created = sqlx::query_as::<_, BookCopy>(
            r#"
            INSERT INTO book_copies
                (book_id, copies_serial, status, purchase_date, purchase_price, book_condition, rental_price)
            VALUES ($1, $2, 'Available', COALESCE($3, CURRENT_DATE), $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .bind(copy.purchase_date)
        .bind(copy.purchase_price)
        .bind(copy.book_condition)
        .bind(copy.rental_price)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
        copies_serial: i32,
        status: CopyStatus,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE book_copies SET status = $1 WHERE book_id = $2 AND copies_serial = $3",
        )
        .bind(status)
        .bind(book_id)
        .bind(copies_serial)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(copy_not_found(book_id, copies_serial));
        }

        Ok(())
    }

    /// Change condition, rental price and status in one statement
    pub async fn reprice(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
        copies_serial: i32,
        condition: BookCondition,
        rental_price: Decimal,
        status: CopyStatus,
    ) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>(
            r#"
            UPDATE book_copies
            SET book_condition = $1, rental_price = $2, status = $3
            WHERE book_id = $4 AND copies_serial = $5
            RETURNING *
            "#,
        )
        .bind(condition)
        .bind(rental_price)
        .bind(status)
        .bind(book_id)
        .bind(copies_serial)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| copy_not_found(book_id, copies_serial))
    }

    /// Release the copies a reservation was holding
    pub async fn release_reserved(
        &self,
        conn: &mut PgConnection,
        reservation_id: i64,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE book_copies bc SET status = 'Available'
            FROM reservation_record rr
            WHERE rr.reservation_id = $1
              AND rr.book_id = bc.book_id
              AND rr.copies_serial = bc.copies_serial
              AND bc.status = 'Reserved'
            "#,
        )
        .bind(reservation_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected())
    }

    /// Discount factor of a condition
    pub async fn condition_factor(
        &self,
        conn: &mut PgConnection,
        condition: BookCondition,
    ) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "SELECT discount_factor FROM condition_discount WHERE book_condition = $1",
        )
        .bind(condition)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| {
            AppError::business(
                ErrorCode::InvalidCondition,
                format!("No discount factor configured for condition {}", condition),
            )
        })
    }

    /// Cheapest condition factor, 1 when none are configured
    pub async fn min_condition_factor(&self, conn: &mut PgConnection) -> AppResult<Decimal> {
        let factor: Option<Decimal> =
            sqlx::query_scalar("SELECT MIN(discount_factor) FROM condition_discount")
                .fetch_one(&mut *conn)
                .await?;

        Ok(factor.unwrap_or(Decimal::ONE))
    }
}

pub(crate) fn copy_not_found(book_id: i64, copies_serial: i32) -> AppError {
    AppError::not_found(
        ErrorCode::CopyNotFound,
        format!("Copy {}/{} not found", book_id, copies_serial),
    )
}
