//! Search history store
//!
//! Searches are kept as small documents (query text, result ids, filters as
//! JSONB). The service only talks to the [`SearchHistoryStore`] trait so the
//! store can be swapped or mocked.

use async_trait::async_trait;
use sqlx::{types::Json, Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::search_history::{
        BookSearchCount, CategorySearchCount, DailySearchCount, FilterCombination, KeywordCount,
        NewSearch, PriceRangeCount, SearchAnalytics, SearchHistoryEntry,
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchHistoryStore: Send + Sync {
    /// Persist one search event
    async fn record(&self, search: NewSearch) -> AppResult<Uuid>;

    /// Most recent searches of a member, newest first
    async fn member_history(
        &self,
        member_id: i64,
        limit: i64,
    ) -> AppResult<Vec<SearchHistoryEntry>>;

    /// Aggregates over the last `days` days
    async fn analytics(&self, days: i32, limit: i64) -> AppResult<SearchAnalytics>;
}

/// [`SearchHistoryStore`] backed by the `search_history` table
#[derive(Clone)]
pub struct PgSearchHistoryStore {
    pool: Pool<Postgres>,
}

impl PgSearchHistoryStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

const IN_PERIOD: &str = "search_date >= NOW() - make_interval(days => $1)";

#[async_trait]
impl SearchHistoryStore for PgSearchHistoryStore {
    async fn record(&self, search: NewSearch) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO search_history (id, member_id, search_query, search_date, book_ids, filters)
            VALUES ($1, $2, $3, NOW(), $4, $5)
            "#,
        )
        .bind(id)
        .bind(search.member_id)
        .bind(&search.search_query)
        .bind(&search.book_ids)
        .bind(Json(&search.filters))
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    async fn member_history(
        &self,
        member_id: i64,
        limit: i64,
    ) -> AppResult<Vec<SearchHistoryEntry>> {
        let entries = sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            SELECT id, member_id, search_query, search_date, book_ids, filters
            FROM search_history
            WHERE member_id = $1
            ORDER BY search_date DESC
            LIMIT $2
            "#,
        )
        .bind(member_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn analytics(&self, days: i32, limit: i64) -> AppResult<SearchAnalytics> {
        let (total_searches, active_members): (i64, i64) = sqlx::query_as(&format!(
            "SELECT COUNT(*), COUNT(DISTINCT member_id) FROM search_history WHERE {}",
            IN_PERIOD
        ))
        .bind(days)
        .fetch_one(&self.pool)
        .await?;

        let top_keywords = sqlx::query_as::<_, KeywordCount>(&format!(
            r#"
            SELECT search_query AS keyword, COUNT(*) AS count, MAX(search_date) AS last_searched
            FROM search_history
            WHERE {} AND search_query <> ''
            GROUP BY search_query
            ORDER BY count DESC, last_searched DESC
            LIMIT $2
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let top_books = sqlx::query_as::<_, BookSearchCount>(&format!(
            r#"
            SELECT found.book_id, COUNT(*) AS count, MAX(sh.search_date) AS last_searched
            FROM search_history sh
            CROSS JOIN LATERAL unnest(sh.book_ids) AS found(book_id)
            WHERE sh.{}
            GROUP BY found.book_id
            ORDER BY count DESC, found.book_id
            LIMIT $2
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let search_trends = sqlx::query_as::<_, DailySearchCount>(&format!(
            r#"
            SELECT to_char(date_trunc('day', search_date AT TIME ZONE 'UTC'), 'YYYY-MM-DD') AS date,
                   COUNT(*) AS count
            FROM search_history
            WHERE {}
            GROUP BY 1
            ORDER BY 1
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        let top_filters = sqlx::query_as::<_, FilterCombination>(&format!(
            r#"
            SELECT (filters->>'category')::BIGINT AS category,
                   filters->>'author' AS author,
                   filters->>'publisher' AS publisher,
                   COUNT(*) AS count
            FROM search_history
            WHERE {}
              AND (filters->>'category' IS NOT NULL
                   OR filters->>'author' IS NOT NULL
                   OR filters->>'publisher' IS NOT NULL)
            GROUP BY 1, 2, 3
            ORDER BY count DESC
            LIMIT $2
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let top_categories = sqlx::query_as::<_, CategorySearchCount>(&format!(
            r#"
            SELECT (filters->>'category')::BIGINT AS category_id, COUNT(*) AS count
            FROM search_history
            WHERE {} AND filters->>'category' IS NOT NULL
            GROUP BY 1
            ORDER BY count DESC, category_id
            LIMIT 10
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        let price_ranges = sqlx::query_as::<_, PriceRangeCount>(&format!(
            r#"
            SELECT ranges.min_price::TEXT || '-' || ranges.max_price::TEXT AS price_range,
                   ranges.min_price, ranges.max_price, ranges.count
            FROM (
                SELECT COALESCE((filters->>'min_price')::NUMERIC, 0) AS min_price,
                       COALESCE((filters->>'max_price')::NUMERIC, 999999) AS max_price,
                       COUNT(*) AS count
                FROM search_history
                WHERE {}
                  AND (filters->>'min_price' IS NOT NULL OR filters->>'max_price' IS NOT NULL)
                GROUP BY 1, 2
            ) ranges
            ORDER BY ranges.count DESC
            LIMIT 10
            "#,
            IN_PERIOD
        ))
        .bind(days)
        .fetch_all(&self.pool)
        .await?;

        Ok(SearchAnalytics {
            period_days: days,
            total_searches,
            active_members,
            top_keywords,
            top_books,
            search_trends,
            top_filters,
            top_categories,
            price_ranges,
        })
    }
}
