//! Book, category and copy models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::enums::{BookCondition, CopyStatus};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub category_id: i64,
    pub name: String,
}

/// Category link used when loading categories for many books at once
#[derive(Debug, Clone, FromRow)]
pub struct BookCategoryRow {
    pub book_id: i64,
    pub category_id: i64,
    pub name: String,
}

/// Book title (catalogue entry)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub book_id: i64,
    pub sequence_name: Option<String>,
    pub name: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    /// List price the copy rental prices derive from
    pub price: Decimal,
}

/// Physical copy of a book
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookCopy {
    pub book_id: i64,
    pub copies_serial: i32,
    pub status: CopyStatus,
    pub purchase_date: NaiveDate,
    pub purchase_price: Decimal,
    pub book_condition: BookCondition,
    pub rental_price: Decimal,
}

/// Public catalogue search filters
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BookSearchQuery {
    /// Substring of the title
    pub keyword: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub category_id: Option<i64>,
    /// Only used for search history, not applied to the query
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Book row with copy statistics, as returned by the catalogue search query
#[derive(Debug, Clone, FromRow)]
pub struct BookSearchRow {
    #[sqlx(flatten)]
    pub book: Book,
    pub available_count: i64,
    pub min_rental_price: Option<Decimal>,
}

/// Catalogue search result
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookSearchResult {
    #[serde(flatten)]
    pub book: Book,
    pub categories: Vec<Category>,
    pub available_count: i64,
    /// Discount rate of the calling member, 1 for anonymous callers
    pub discount_rate: Decimal,
    /// Cheapest copy after the member discount, lent out or not
    pub estimated_min_rental_price: Option<Decimal>,
}

/// Copies of one book grouped by condition and rental price
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CopyGroup {
    pub book_condition: BookCondition,
    pub rental_price: Decimal,
    pub available_count: i64,
    pub total_count: i64,
    #[sqlx(default)]
    pub discounted_rental_price: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: Book,
    pub categories: Vec<Category>,
    pub discount_rate: Decimal,
    pub copies: Vec<CopyGroup>,
}

/// Book with copy counts for the counter listing
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookInventory {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub book: Book,
    pub total_copies: i64,
    pub available_count: i64,
    pub borrowed_count: i64,
    pub reserved_count: i64,
    pub lost_count: i64,
}

/// Book with all of its copies for the counter search
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookWithCopies {
    #[serde(flatten)]
    pub book: Book,
    pub categories: Vec<Category>,
    pub copies: Vec<BookCopy>,
}

/// Counter book search; at least one criterion is required
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminBookSearchQuery {
    pub book_id: Option<i64>,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    /// Only list copies in this state
    pub status: Option<CopyStatus>,
}

impl AdminBookSearchQuery {
    pub fn has_criteria(&self) -> bool {
        self.book_id.is_some()
            || self.name.as_deref().is_some_and(|n| !n.trim().is_empty())
            || self.category_id.is_some()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookRequest {
    pub sequence_name: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 255, message = "Author is required"))]
    pub author: String,
    pub publisher: Option<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    /// Number of Good copies to create (default: 1)
    #[validate(range(min = 1, max = 500, message = "copies_count must be between 1 and 500"))]
    pub copies_count: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreatedBook {
    pub book: Book,
    pub copies: Vec<BookCopy>,
}

/// Partial book update; absent fields are left untouched
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBookRequest {
    pub sequence_name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub price: Option<Decimal>,
}

impl UpdateBookRequest {
    pub fn is_empty(&self) -> bool {
        self.sequence_name.is_none()
            && self.name.is_none()
            && self.author.is_none()
            && self.publisher.is_none()
            && self.price.is_none()
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBookCategoriesRequest {
    pub category_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCopyRequest {
    /// Defaults to today
    pub purchase_date: Option<NaiveDate>,
    pub purchase_price: Decimal,
    /// Defaults to Good
    pub book_condition: Option<BookCondition>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCopyRequest {
    pub status: Option<CopyStatus>,
    /// Changing the condition reprices the copy
    pub book_condition: Option<BookCondition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_search_needs_a_criterion() {
        assert!(!AdminBookSearchQuery::default().has_criteria());

        let blank_name = AdminBookSearchQuery {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(!blank_name.has_criteria());

        let status_only = AdminBookSearchQuery {
            status: Some(CopyStatus::Lost),
            ..Default::default()
        };
        assert!(!status_only.has_criteria());

        let by_category = AdminBookSearchQuery {
            category_id: Some(3),
            ..Default::default()
        };
        assert!(by_category.has_criteria());
    }

    #[test]
    fn test_update_book_empty() {
        assert!(UpdateBookRequest::default().is_empty());
        let update = UpdateBookRequest {
            price: Some(Decimal::from(320)),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_create_book_copies_range() {
        let request = CreateBookRequest {
            sequence_name: None,
            name: "Dune".into(),
            author: "Frank Herbert".into(),
            publisher: None,
            price: Decimal::from(450),
            category_id: None,
            copies_count: Some(0),
        };
        assert!(request.validate().is_err());
    }
}
