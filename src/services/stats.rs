//! Statistics service

use crate::{
    api::stats::{TopBook, TopCategory},
    error::AppResult,
    repository::Repository,
};

const DEFAULT_LIMIT: i64 = 10;

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Most borrowed books, counted over every loan record
    pub async fn top_books(&self, limit: Option<i64>) -> AppResult<Vec<TopBook>> {
        let books = sqlx::query_as::<_, TopBook>(
            r#"
            SELECT lr.book_id, b.name, b.author, b.publisher, COUNT(*) AS borrow_count
            FROM loan_record lr
            JOIN book b ON b.book_id = lr.book_id
            GROUP BY lr.book_id, b.name, b.author, b.publisher
            ORDER BY borrow_count DESC, lr.book_id
            LIMIT $1
            "#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(books)
    }

    /// Most borrowed categories; a book in two categories counts for both
    pub async fn top_categories(&self, limit: Option<i64>) -> AppResult<Vec<TopCategory>> {
        let categories = sqlx::query_as::<_, TopCategory>(
            r#"
            SELECT c.category_id, c.name, COUNT(*) AS borrow_count
            FROM loan_record lr
            JOIN book_category bc ON bc.book_id = lr.book_id
            JOIN category c ON c.category_id = bc.category_id
            GROUP BY c.category_id, c.name
            ORDER BY borrow_count DESC, c.category_id
            LIMIT $1
            "#,
        )
        .bind(clamp_limit(limit))
        .fetch_all(&self.repository.pool)
        .await?;

        Ok(categories)
    }
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 10);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(25)), 25);
        assert_eq!(clamp_limit(Some(10_000)), 100);
    }
}
