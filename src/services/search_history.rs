//! Search history service

use std::sync::Arc;

use unicode_normalization::UnicodeNormalization;

use crate::{
    config::SearchHistoryConfig,
    error::{AppError, AppResult},
    models::search_history::{NewSearch, SearchAnalytics, SearchHistoryEntry},
    repository::search_history::SearchHistoryStore,
};

#[derive(Clone)]
pub struct SearchHistoryService {
    store: Arc<dyn SearchHistoryStore>,
    config: SearchHistoryConfig,
}

impl SearchHistoryService {
    pub fn new(store: Arc<dyn SearchHistoryStore>, config: SearchHistoryConfig) -> Self {
        Self { store, config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Record a member search. Failures are logged and swallowed: a search
    /// must never fail because its history could not be written.
    pub async fn record(&self, mut search: NewSearch) {
        if !self.config.enabled {
            return;
        }

        search.search_query = normalize_query(&search.search_query);
        let member_id = search.member_id;

        if let Err(e) = self.store.record(search).await {
            tracing::warn!(member_id, "Failed to record search history: {}", e);
        }
    }

    pub async fn member_history(
        &self,
        member_id: i64,
        limit: Option<i64>,
    ) -> AppResult<Vec<SearchHistoryEntry>> {
        self.ensure_enabled()?;
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit);
        self.store.member_history(member_id, limit).await
    }

    pub async fn analytics(
        &self,
        days: Option<i32>,
        limit: Option<i64>,
    ) -> AppResult<SearchAnalytics> {
        self.ensure_enabled()?;
        let days = days.unwrap_or(self.config.analytics_days);
        if days < 1 {
            return Err(AppError::BadRequest("days must be at least 1".to_string()));
        }
        let days = days.min(365);
        let limit = limit
            .unwrap_or(self.config.default_limit)
            .clamp(1, self.config.max_limit);
        self.store.analytics(days, limit).await
    }

    fn ensure_enabled(&self) -> AppResult<()> {
        if self.config.enabled {
            Ok(())
        } else {
            Err(AppError::Unavailable("Search history is disabled".to_string()))
        }
    }
}

/// NFKC, trim, lowercase and collapse inner whitespace
pub fn normalize_query(query: &str) -> String {
    let normalized: String = query.nfkc().collect();
    normalized
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::search_history::SearchFilters,
        repository::search_history::MockSearchHistoryStore,
    };
    use mockall::predicate::eq;

    fn config(enabled: bool) -> SearchHistoryConfig {
        SearchHistoryConfig {
            enabled,
            ..Default::default()
        }
    }

    fn search(query: &str) -> NewSearch {
        NewSearch {
            member_id: 3,
            search_query: query.to_string(),
            book_ids: vec![1, 2],
            filters: SearchFilters::default(),
        }
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Harry   POTTER "), "harry potter");
        // Full-width letters fold to ASCII under NFKC
        assert_eq!(normalize_query("ＲＵＳＴ"), "rust");
        assert_eq!(normalize_query("\t\n"), "");
    }

    #[tokio::test]
    async fn test_record_normalizes_before_storing() {
        let mut store = MockSearchHistoryStore::new();
        store
            .expect_record()
            .withf(|s| s.search_query == "the hobbit" && s.member_id == 3)
            .times(1)
            .returning(|_| Ok(uuid::Uuid::nil()));

        let service = SearchHistoryService::new(Arc::new(store), config(true));
        service.record(search("  The   Hobbit")).await;
    }

    #[tokio::test]
    async fn test_record_swallows_store_errors() {
        let mut store = MockSearchHistoryStore::new();
        store
            .expect_record()
            .times(1)
            .returning(|_| Err(AppError::Unavailable("down".into())));

        let service = SearchHistoryService::new(Arc::new(store), config(true));
        service.record(search("dune")).await;
    }

    #[tokio::test]
    async fn test_disabled_skips_store() {
        let mut store = MockSearchHistoryStore::new();
        store.expect_record().never();
        store.expect_member_history().never();

        let service = SearchHistoryService::new(Arc::new(store), config(false));
        service.record(search("dune")).await;

        let err = service.member_history(3, None).await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_history_limit_is_clamped() {
        let mut store = MockSearchHistoryStore::new();
        store
            .expect_member_history()
            .with(eq(3), eq(100))
            .times(1)
            .returning(|_, _| Ok(vec![]));
        store
            .expect_member_history()
            .with(eq(3), eq(20))
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let service = SearchHistoryService::new(Arc::new(store), config(true));
        service.member_history(3, Some(5000)).await.unwrap();
        service.member_history(3, None).await.unwrap();
    }

    #[tokio::test]
    async fn test_analytics_defaults() {
        let mut store = MockSearchHistoryStore::new();
        store
            .expect_analytics()
            .with(eq(30), eq(20))
            .times(1)
            .returning(|days, _| {
                Ok(SearchAnalytics {
                    period_days: days,
                    total_searches: 0,
                    active_members: 0,
                    top_keywords: vec![],
                    top_books: vec![],
                    search_trends: vec![],
                    top_filters: vec![],
                    top_categories: vec![],
                    price_ranges: vec![],
                })
            });

        let service = SearchHistoryService::new(Arc::new(store), config(true));
        let analytics = service.analytics(None, None).await.unwrap();
        assert_eq!(analytics.period_days, 30);
    }

    #[tokio::test]
    async fn test_analytics_rejects_non_positive_days() {
        let mut store = MockSearchHistoryStore::new();
        store.expect_analytics().never();

        let service = SearchHistoryService::new(Arc::new(store), config(true));
        for days in [0, -7] {
            let err = service.analytics(Some(days), None).await.unwrap_err();
            assert!(matches!(err, AppError::BadRequest(_)));
        }
    }
}
