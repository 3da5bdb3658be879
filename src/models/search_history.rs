//! Search history documents and analytics rows

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Filters a member applied alongside the free-text query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
}

/// New search event
#[derive(Debug, Clone, PartialEq)]
pub struct NewSearch {
    pub member_id: i64,
    pub search_query: String,
    pub book_ids: Vec<i64>,
    pub filters: SearchFilters,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct SearchHistoryEntry {
    pub id: Uuid,
    pub member_id: i64,
    pub search_query: String,
    pub search_date: DateTime<Utc>,
    pub book_ids: Vec<i64>,
    #[schema(value_type = SearchFilters)]
    pub filters: Json<SearchFilters>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Number of entries (default: 20)
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Look-back window in days (default: 30)
    pub days: Option<i32>,
    /// Rows per ranking (default: 20)
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: i64,
    pub last_searched: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BookSearchCount {
    pub book_id: i64,
    pub count: i64,
    pub last_searched: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct DailySearchCount {
    /// `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct FilterCombination {
    pub category: Option<i64>,
    pub author: Option<String>,
    pub publisher: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CategorySearchCount {
    pub category_id: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct PriceRangeCount {
    /// `min-max`, open ends filled with 0 and 999999
    pub price_range: String,
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchAnalytics {
    pub period_days: i32,
    pub total_searches: i64,
    pub active_members: i64,
    pub top_keywords: Vec<KeywordCount>,
    pub top_books: Vec<BookSearchCount>,
    pub search_trends: Vec<DailySearchCount>,
    pub top_filters: Vec<FilterCombination>,
    pub top_categories: Vec<CategorySearchCount>,
    pub price_ranges: Vec<PriceRangeCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_skip_empty_fields() {
        let filters = SearchFilters {
            author: Some("tolkien".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json, serde_json::json!({ "author": "tolkien" }));

        let empty = serde_json::to_value(SearchFilters::default()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn test_filters_accept_missing_fields() {
        let filters: SearchFilters = serde_json::from_str(r#"{"category": 4}"#).unwrap();
        assert_eq!(filters.category, Some(4));
        assert!(filters.author.is_none());
    }
}
