//! Members repository for database operations

use rust_decimal::Decimal;
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        enums::MemberStatus,
        member::{
            CreateMemberRequest, Member, MemberLoanSummary, MemberSearchQuery, MemberWithLevel,
            MembershipLevel, TopUp,
        },
        pagination::PageParams,
    },
};

const MEMBER_WITH_LEVEL: &str = r#"
    SELECT m.member_id, m.name, m.level_id, m.admin_id, m.join_date, m.email, m.phone,
           m.balance, m.status,
           l.level_name, l.discount_rate, l.min_balance_required, l.max_book_allowed, l.hold_days
    FROM member m
    JOIN membership_level l ON l.level_id = m.level_id
"#;

#[derive(Clone)]
pub struct MembersRepository {
    pool: Pool<Postgres>,
}

impl MembersRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get member with level terms by ID
    pub async fn get_with_level(&self, member_id: i64) -> AppResult<MemberWithLevel> {
        let sql = format!("{} WHERE m.member_id = $1", MEMBER_WITH_LEVEL);
        sqlx::query_as::<_, MemberWithLevel>(&sql)
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| member_not_found(member_id))
    }

    /// Members with the given name, for login
    pub async fn find_by_name(&self, name: &str) -> AppResult<Vec<MemberWithLevel>> {
        let members = sqlx::query_as::<_, MemberWithLevel>(&format!(
            "{} WHERE m.name = $1 ORDER BY m.member_id",
            MEMBER_WITH_LEVEL
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Lock the member row for the rest of the transaction
    pub async fn lock_with_level(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
    ) -> AppResult<MemberWithLevel> {
        sqlx::query_as::<_, MemberWithLevel>(&format!(
            "{} WHERE m.member_id = $1 FOR UPDATE OF m",
            MEMBER_WITH_LEVEL
        ))
        .bind(member_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| member_not_found(member_id))
    }

    pub async fn exists_with_name_phone(
        &self,
        conn: &mut PgConnection,
        name: &str,
        phone: &str,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM member WHERE name = $1 AND phone = $2)",
        )
        .bind(name)
        .bind(phone)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// Highest level whose minimum balance is covered by `amount`
    pub async fn level_for_amount(
        &self,
        conn: &mut PgConnection,
        amount: Decimal,
    ) -> AppResult<Option<MembershipLevel>> {
        let level = sqlx::query_as::<_, MembershipLevel>(
            r#"
            SELECT * FROM membership_level
            WHERE min_balance_required <= $1
            ORDER BY min_balance_required DESC
            LIMIT 1
            "#,
        )
        .bind(amount)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(level)
    }

    /// Create a new member
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        admin_id: i64,
        level_id: i64,
        request: &CreateMemberRequest,
        balance: Decimal,
    ) -> AppResult<Member> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            INSERT INTO member (name, level_id, admin_id, join_date, email, phone, balance, status)
            VALUES ($1, $2, $3, CURRENT_DATE, $4, $5, $6, 'Active')
            RETURNING *
            "#,
        )
        .bind(request.name.trim())
        .bind(level_id)
        .bind(admin_id)
        .bind(request.email.as_deref())
        .bind(request.phone.trim())
        .bind(balance)
        .fetch_one(&mut *conn)
        .await?;

        Ok(member)
    }

    /// Search members with pagination
    pub async fn search(
        &self,
        query: &MemberSearchQuery,
        page: &PageParams,
    ) -> AppResult<(Vec<MemberWithLevel>, i64)> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.member_id.is_some() {
            conditions.push(format!("m.member_id = ${}", idx));
            idx += 1;
        }
        let name_pattern = query
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n));
        if name_pattern.is_some() {
            conditions.push(format!("m.name ILIKE ${}", idx));
            idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let count_query = format!("SELECT COUNT(*) FROM member m {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(id) = query.member_id {
            count_builder = count_builder.bind(id);
        }
        if let Some(ref pattern) = name_pattern {
            count_builder = count_builder.bind(pattern);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_query = format!(
            "{} {} ORDER BY m.member_id LIMIT ${} OFFSET ${}",
            MEMBER_WITH_LEVEL,
            where_clause,
            idx,
            idx + 1
        );
        let mut builder = sqlx::query_as::<_, MemberWithLevel>(&select_query);
        if let Some(id) = query.member_id {
            builder = builder.bind(id);
        }
        if let Some(ref pattern) = name_pattern {
            builder = builder.bind(pattern);
        }
        let members = builder
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((members, total))
    }

    /// Set member status
    pub async fn update_status(&self, member_id: i64, status: MemberStatus) -> AppResult<Member> {
        sqlx::query_as::<_, Member>(
            "UPDATE member SET status = $1 WHERE member_id = $2 RETURNING *",
        )
        .bind(status)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| member_not_found(member_id))
    }

    /// Add a signed amount, refusing to go below zero.
    ///
    /// Returns `None` when the member does not exist or the balance would go negative.
    pub async fn adjust_balance(
        &self,
        member_id: i64,
        amount: Decimal,
    ) -> AppResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            UPDATE member SET balance = balance + $1
            WHERE member_id = $2 AND balance + $1 >= 0
            RETURNING *
            "#,
        )
        .bind(amount)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Debit the balance if it covers `amount`; returns the new balance
    pub async fn debit(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        amount: Decimal,
    ) -> AppResult<Option<Decimal>> {
        let balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            UPDATE member SET balance = balance - $1
            WHERE member_id = $2 AND balance >= $1
            RETURNING balance
            "#,
        )
        .bind(amount)
        .bind(member_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(balance)
    }

    pub async fn credit(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        amount: Decimal,
    ) -> AppResult<Decimal> {
        sqlx::query_scalar::<_, Decimal>(
            "UPDATE member SET balance = balance + $1 WHERE member_id = $2 RETURNING balance",
        )
        .bind(amount)
        .bind(member_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| member_not_found(member_id))
    }

    pub async fn set_level(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        level_id: i64,
    ) -> AppResult<()> {
        sqlx::query("UPDATE member SET level_id = $1 WHERE member_id = $2")
            .bind(level_id)
            .bind(member_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// Record a top-up
    pub async fn insert_top_up(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
        admin_id: i64,
        amount: Decimal,
    ) -> AppResult<TopUp> {
        let top_up = sqlx::query_as::<_, TopUp>(
            r#"
            WITH inserted AS (
                INSERT INTO top_up (member_id, admin_id, amount)
                VALUES ($1, $2, $3)
                RETURNING *
            )
            SELECT i.top_up_id, i.member_id, i.admin_id, a.name AS admin_name,
                   i.amount, i.top_up_date
            FROM inserted i
            LEFT JOIN admin a ON a.admin_id = i.admin_id
            "#,
        )
        .bind(member_id)
        .bind(admin_id)
        .bind(amount)
        .fetch_one(&mut *conn)
        .await?;

        Ok(top_up)
    }

    pub async fn list_top_ups(&self, member_id: i64) -> AppResult<Vec<TopUp>> {
        let top_ups = sqlx::query_as::<_, TopUp>(
            r#"
            SELECT t.top_up_id, t.member_id, t.admin_id, a.name AS admin_name,
                   t.amount, t.top_up_date
            FROM top_up t
            LEFT JOIN admin a ON a.admin_id = t.admin_id
            WHERE t.member_id = $1
            ORDER BY t.top_up_date DESC, t.top_up_id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(top_ups)
    }

    /// Number of copies the member currently has out
    pub async fn count_active_loans(
        &self,
        conn: &mut PgConnection,
        member_id: i64,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loan_record lr
            JOIN book_loan bl ON bl.loan_id = lr.loan_id
            WHERE bl.member_id = $1 AND lr.return_date IS NULL
            "#,
        )
        .bind(member_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// Pool variant of [`count_active_loans`](Self::count_active_loans) for read-only views
    pub async fn active_loan_count(&self, member_id: i64) -> AppResult<i64> {
        let mut conn = self.pool.acquire().await?;
        self.count_active_loans(&mut conn, member_id).await
    }

    /// Loans of a member, newest first
    pub async fn list_loans(&self, member_id: i64) -> AppResult<Vec<MemberLoanSummary>> {
        let loans = sqlx::query_as::<_, MemberLoanSummary>(
            r#"
            SELECT bl.loan_id, bl.admin_id, bl.final_price, bl.created_at,
                   COUNT(lr.book_id) AS item_count,
                   COUNT(lr.book_id) FILTER (WHERE lr.return_date IS NULL) AS active_count
            FROM book_loan bl
            LEFT JOIN loan_record lr ON lr.loan_id = bl.loan_id
            WHERE bl.member_id = $1
            GROUP BY bl.loan_id
            ORDER BY bl.created_at DESC, bl.loan_id DESC
            "#,
        )
        .bind(member_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }
}

fn member_not_found(member_id: i64) -> AppError {
    AppError::NotFound(
        ErrorCode::MemberNotFound,
        format!("Member with id {} not found", member_id),
    )
}
