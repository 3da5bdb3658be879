//! Loans repository for database operations

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        enums::FeeKind,
        loan::{
            AddFee, BookLoan, CopyRef, FeeType, LoanItemView, LoanRecord, LoanSearchType,
            LockedLoanRecord, OpenLoan,
        },
    },
};

const LOAN_ITEM_COLUMNS: &str = r#"
    SELECT lr.loan_id, lr.book_id, lr.copies_serial,
           b.name AS book_name, b.author, b.publisher,
           bc.book_condition, bc.purchase_price,
           lr.date_out, lr.due_date, lr.return_date, lr.rental_fee, lr.renew_cnt,
           COALESCE((
               SELECT SUM(af.amount) FROM add_fee af
               WHERE af.loan_id = lr.loan_id
                 AND af.book_id = lr.book_id
                 AND af.copies_serial = lr.copies_serial
           ), 0) AS add_fee_total
"#;

const LOAN_ITEM_JOINS: &str = r#"
    FROM loan_record lr
    JOIN book_loan bl ON bl.loan_id = lr.loan_id
    JOIN book b ON b.book_id = lr.book_id
    JOIN book_copies bc ON bc.book_id = lr.book_id AND bc.copies_serial = lr.copies_serial
"#;

/// Unreturned item with the loan header it belongs to
#[derive(Debug, FromRow)]
struct OpenItemRow {
    #[sqlx(flatten)]
    item: LoanItemView,
    member_id: i64,
    member_name: String,
    loan_date: NaiveDate,
}

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Database date, so every rule in a transaction sees the same "today"
    pub async fn current_date(&self, conn: &mut PgConnection) -> AppResult<NaiveDate> {
        let today: NaiveDate = sqlx::query_scalar("SELECT CURRENT_DATE")
            .fetch_one(&mut *conn)
            .await?;

        Ok(today)
    }

    pub async fn fee_types(&self, conn: &mut PgConnection) -> AppResult<Vec<FeeType>> {
        let fee_types = sqlx::query_as::<_, FeeType>("SELECT * FROM fee_type ORDER BY type")
            .fetch_all(&mut *conn)
            .await?;

        Ok(fee_types)
    }

    pub async fn list_fee_types(&self) -> AppResult<Vec<FeeType>> {
        let mut conn = self.pool.acquire().await?;
        self.fee_types(&mut conn).await
    }

    /// Create the loan header
    pub async fn create_loan(
        &self,
        conn: &mut PgConnection,
        admin_id: i64,
        member_id: i64,
        final_price: Decimal,
    ) -> AppResult<BookLoan> {
        let loan = sqlx::query_as::<_, BookLoan>(
            r#"
            INSERT INTO book_loan (admin_id, member_id, final_price)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(admin_id)
        .bind(member_id)
        .bind(final_price)
        .fetch_one(&mut *conn)
        .await?;

        Ok(loan)
    }

    pub async fn create_record(
        &self,
        conn: &mut PgConnection,
        loan_id: i64,
        copy: CopyRef,
        due_date: NaiveDate,
        rental_fee: Decimal,
    ) -> AppResult<LoanRecord> {
        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            INSERT INTO loan_record (loan_id, book_id, copies_serial, date_out, due_date, rental_fee, renew_cnt)
            VALUES ($1, $2, $3, CURRENT_DATE, $4, $5, 0)
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .bind(due_date)
        .bind(rental_fee)
        .fetch_one(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Member a loan belongs to
    pub async fn member_of(&self, conn: &mut PgConnection, loan_id: i64) -> AppResult<Option<i64>> {
        let member_id: Option<i64> =
            sqlx::query_scalar("SELECT member_id FROM book_loan WHERE loan_id = $1")
                .bind(loan_id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(member_id)
    }

    /// Lock a loan item together with its copy
    pub async fn lock_record(
        &self,
        conn: &mut PgConnection,
        loan_id: i64,
        copy: CopyRef,
    ) -> AppResult<Option<LockedLoanRecord>> {
        let record = sqlx::query_as::<_, LockedLoanRecord>(
            r#"
            SELECT lr.loan_id, lr.book_id, lr.copies_serial, lr.date_out, lr.due_date,
                   lr.return_date, lr.rental_fee, lr.renew_cnt,
                   bl.member_id,
                   bc.book_condition AS original_condition,
                   bc.purchase_price,
                   b.price AS book_price,
                   CURRENT_DATE AS today
            FROM loan_record lr
            JOIN book_loan bl ON bl.loan_id = lr.loan_id
            JOIN book_copies bc ON bc.book_id = lr.book_id AND bc.copies_serial = lr.copies_serial
            JOIN book b ON b.book_id = lr.book_id
            WHERE lr.loan_id = $1 AND lr.book_id = $2 AND lr.copies_serial = $3
            FOR UPDATE OF lr, bc
            "#,
        )
        .bind(loan_id)
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(record)
    }

    pub async fn mark_returned(
        &self,
        conn: &mut PgConnection,
        loan_id: i64,
        copy: CopyRef,
        return_date: NaiveDate,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE loan_record SET return_date = $1
            WHERE loan_id = $2 AND book_id = $3 AND copies_serial = $4
            "#,
        )
        .bind(return_date)
        .bind(loan_id)
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Push the due date out and count the renewal
    pub async fn renew(
        &self,
        conn: &mut PgConnection,
        loan_id: i64,
        copy: CopyRef,
        extra_days: i32,
    ) -> AppResult<LoanRecord> {
        let record = sqlx::query_as::<_, LoanRecord>(
            r#"
            UPDATE loan_record
            SET due_date = due_date + $1::INTEGER, renew_cnt = renew_cnt + 1
            WHERE loan_id = $2 AND book_id = $3 AND copies_serial = $4
            RETURNING *
            "#,
        )
        .bind(extra_days)
        .bind(loan_id)
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .fetch_one(&mut *conn)
        .await?;

        Ok(record)
    }

    /// Record an additional fee on a loan item
    pub async fn add_fee(
        &self,
        conn: &mut PgConnection,
        loan_id: i64,
        copy: CopyRef,
        kind: FeeKind,
        amount: Decimal,
    ) -> AppResult<AddFee> {
        let fee = sqlx::query_as::<_, AddFee>(
            r#"
            INSERT INTO add_fee (loan_id, book_id, copies_serial, type, amount, date)
            VALUES ($1, $2, $3, $4, $5, CURRENT_DATE)
            RETURNING *
            "#,
        )
        .bind(loan_id)
        .bind(copy.book_id)
        .bind(copy.copies_serial)
        .bind(kind)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await?;

        Ok(fee)
    }

    pub async fn exists(&self, loan_id: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_loan WHERE loan_id = $1)")
                .bind(loan_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// Items of a member; open ones, or returned ones for the history
    pub async fn member_items(
        &self,
        member_id: i64,
        returned: bool,
    ) -> AppResult<Vec<LoanItemView>> {
        let filter = if returned {
            "lr.return_date IS NOT NULL ORDER BY lr.return_date DESC, lr.loan_id DESC"
        } else {
            "lr.return_date IS NULL ORDER BY lr.due_date, lr.loan_id"
        };
        let sql = format!(
            "{} {} WHERE bl.member_id = $1 AND {}",
            LOAN_ITEM_COLUMNS, LOAN_ITEM_JOINS, filter
        );

        let items = sqlx::query_as::<_, LoanItemView>(&sql)
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// All items of a loan
    pub async fn loan_items(&self, loan_id: i64) -> AppResult<Vec<LoanItemView>> {
        let items = sqlx::query_as::<_, LoanItemView>(&format!(
            "{} {} WHERE lr.loan_id = $1 ORDER BY lr.book_id, lr.copies_serial",
            LOAN_ITEM_COLUMNS, LOAN_ITEM_JOINS
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn loan_fees(&self, loan_id: i64) -> AppResult<Vec<AddFee>> {
        let fees = sqlx::query_as::<_, AddFee>(
            "SELECT * FROM add_fee WHERE loan_id = $1 ORDER BY add_fee_id",
        )
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(fees)
    }

    /// Loans with unreturned items, by loan or by member
    pub async fn open_loans(
        &self,
        search_type: LoanSearchType,
        id: i64,
    ) -> AppResult<Vec<OpenLoan>> {
        let column = match search_type {
            LoanSearchType::LoanId => "bl.loan_id",
            LoanSearchType::MemberId => "bl.member_id",
        };
        let sql = format!(
            r#"
            {},
                   bl.member_id, m.name AS member_name,
                   (bl.created_at AT TIME ZONE 'UTC')::DATE AS loan_date
            {}
            JOIN member m ON m.member_id = bl.member_id
            WHERE {} = $1 AND lr.return_date IS NULL
            ORDER BY bl.loan_id, lr.book_id, lr.copies_serial
            "#,
            LOAN_ITEM_COLUMNS.trim_end(),
            LOAN_ITEM_JOINS,
            column
        );

        let rows = sqlx::query_as::<_, OpenItemRow>(&sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        Ok(group_open_items(rows))
    }
}

fn group_open_items(rows: Vec<OpenItemRow>) -> Vec<OpenLoan> {
    let mut loans: BTreeMap<i64, OpenLoan> = BTreeMap::new();
    for row in rows {
        let loan = loans.entry(row.item.loan_id).or_insert_with(|| OpenLoan {
            loan_id: row.item.loan_id,
            member_id: row.member_id,
            member_name: row.member_name.clone(),
            loan_date: row.loan_date,
            max_due_date: row.item.due_date,
            records: Vec::new(),
        });
        loan.max_due_date = loan.max_due_date.max(row.item.due_date);
        loan.records.push(row.item);
    }
    loans.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::BookCondition;

    fn row(loan_id: i64, book_id: i64, due: NaiveDate) -> OpenItemRow {
        OpenItemRow {
            item: LoanItemView {
                loan_id,
                book_id,
                copies_serial: 1,
                book_name: format!("Book {}", book_id),
                author: None,
                publisher: None,
                book_condition: BookCondition::Good,
                purchase_price: Decimal::from(300),
                date_out: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                due_date: due,
                return_date: None,
                rental_fee: Decimal::from(30),
                renew_cnt: 0,
                add_fee_total: Decimal::ZERO,
            },
            member_id: 7,
            member_name: "Lin".into(),
            loan_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_group_open_items_by_loan() {
        let early = NaiveDate::from_ymd_opt(2024, 1, 8).unwrap();
        let late = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let loans = group_open_items(vec![row(2, 10, early), row(1, 11, early), row(2, 12, late)]);

        assert_eq!(loans.len(), 2);
        assert_eq!(loans[0].loan_id, 1);
        assert_eq!(loans[1].records.len(), 2);
        assert_eq!(loans[1].max_due_date, late);
    }
}
