//! Reservations repository

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::ReservationStatus,
        reservation::{Reservation, ReservationListQuery, ReservationRow, ReservedBook},
    },
};

#[derive(Clone)]
pub struct ReservationsRepository {
    pool: Pool<Postgres>,
}

impl ReservationsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, conn: &mut PgConnection, member_id: i64) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            INSERT INTO reservation (member_id, reserve_date, status)
            VALUES ($1, CURRENT_DATE, 'Active')
            RETURNING *
            "#,
        )
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(reservation)
    }

    pub async fn add_book(
        &self,
        conn: &mut PgConnection,
        reservation_id: i64,
        book_id: i64,
        copies_serial: Option<i32>,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO reservation_record (reservation_id, book_id, copies_serial) VALUES ($1, $2, $3)",
        )
        .bind(reservation_id)
        .bind(book_id)
        .bind(copies_serial)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Lock a reservation row; `None` when it does not exist
    pub async fn lock(
        &self,
        conn: &mut PgConnection,
        reservation_id: i64,
    ) -> AppResult<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(
            "SELECT * FROM reservation WHERE reservation_id = $1 FOR UPDATE",
        )
        .bind(reservation_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(reservation)
    }

    pub async fn set_status(
        &self,
        conn: &mut PgConnection,
        reservation_id: i64,
        status: ReservationStatus,
        pickup_date: Option<NaiveDate>,
    ) -> AppResult<Reservation> {
        let reservation = sqlx::query_as::<_, Reservation>(
            r#"
            UPDATE reservation SET status = $1, pickup_date = COALESCE($2, pickup_date)
            WHERE reservation_id = $3
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(pickup_date)
        .bind(reservation_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(reservation)
    }

    /// Books of the given reservations, with the copies held for them
    pub async fn books(
        &self,
        conn: &mut PgConnection,
        reservation_ids: &[i64],
    ) -> AppResult<Vec<ReservedBook>> {
        if reservation_ids.is_empty() {
            return Ok(Vec::new());
        }

        let books = sqlx::query_as::<_, ReservedBook>(
            r#"
            SELECT rr.reservation_id, rr.book_id, rr.copies_serial, b.name AS book_name, b.author
            FROM reservation_record rr
            JOIN book b ON b.book_id = rr.book_id
            WHERE rr.reservation_id = ANY($1)
            ORDER BY rr.reservation_id, rr.book_id
            "#,
        )
        .bind(reservation_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(books)
    }

    /// Pool variant of [`books`](Self::books) for listings
    pub async fn list_books(&self, reservation_ids: &[i64]) -> AppResult<Vec<ReservedBook>> {
        let mut conn = self.pool.acquire().await?;
        self.books(&mut conn, reservation_ids).await
    }

    /// Books the member is holding through active reservations
    pub async fn count_active_books(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM reservation_record rr
            JOIN reservation r ON r.reservation_id = rr.reservation_id
            WHERE r.member_id = $1 AND r.status = 'Active'
            "#,
        )
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Which of `book_ids` the member already has actively reserved
    pub async fn actively_reserved(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        book_ids: &[i64],
    ) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT DISTINCT rr.book_id
            FROM reservation_record rr
            JOIN reservation r ON r.reservation_id = rr.reservation_id
            WHERE r.member_id = $1 AND r.status = 'Active' AND rr.book_id = ANY($2)
            ORDER BY rr.book_id
            "#,
        )
        .bind(member_id)
        .bind(book_ids)
        .fetch_all(&mut *conn)
        .await?;

        Ok(ids)
    }

    pub async fn list_for_member(&self, member_id: i64) -> AppResult<Vec<Reservation>> {
        let reservations = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT * FROM reservation
            WHERE member_id = $1
            ORDER BY reserve_date DESC, reservation_id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reservations)
    }

    /// Counter listing with optional filters
    pub async fn search(&self, query: &ReservationListQuery) -> AppResult<Vec<ReservationRow>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.status.is_some() {
            conditions.push(format!("r.status = ${}", idx));
            idx += 1;
        }
        if query.member_id.is_some() {
            conditions.push(format!("r.member_id = ${}", idx));
            idx += 1;
        }
        let book_pattern = query
            .book_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n));
        if book_pattern.is_some() {
            conditions.push(format!(
                r#"EXISTS (
                    SELECT 1 FROM reservation_record rr
                    JOIN book b ON b.book_id = rr.book_id
                    WHERE rr.reservation_id = r.reservation_id AND b.name ILIKE ${}
                )"#,
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT r.reservation_id, r.member_id, r.reserve_date, r.pickup_date, r.status,
                   m.name AS member_name
            FROM reservation r
            JOIN member m ON m.member_id = r.member_id
            {}
            ORDER BY r.reserve_date DESC, r.reservation_id DESC
            LIMIT 500
            "#,
            where_clause
        );

        let mut builder = sqlx::query_as::<_, ReservationRow>(&sql);
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }
        if let Some(member_id) = query.member_id {
            builder = builder.bind(member_id);
        }
        if let Some(ref pattern) = book_pattern {
            builder = builder.bind(pattern);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
