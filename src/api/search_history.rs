//! Search history endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::search_history::{AnalyticsQuery, HistoryQuery, SearchAnalytics, SearchHistoryEntry},
    AppState,
};

use super::AuthenticatedUser;

/// Recent catalogue searches of the logged in member, newest first
#[utoipa::path(
    get,
    path = "/search-history/member/history",
    tag = "search-history",
    security(("bearer_auth" = [])),
    params(HistoryQuery),
    responses(
        (status = 200, description = "Recorded searches", body = Vec<SearchHistoryEntry>),
        (status = 503, description = "Search history is disabled", body = crate::error::ErrorResponse)
    )
)]
pub async fn member_history(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<Vec<SearchHistoryEntry>>> {
    let member_id = claims.require_member()?;
    let entries = state
        .services
        .search_history
        .member_history(member_id, query.limit)
        .await?;
    Ok(Json(entries))
}

/// Search analytics over a window of days
#[utoipa::path(
    get,
    path = "/search-history/admin/analytics",
    tag = "search-history",
    security(("bearer_auth" = [])),
    params(AnalyticsQuery),
    responses(
        (status = 200, description = "Aggregated search behaviour", body = SearchAnalytics),
        (status = 400, description = "days below 1", body = crate::error::ErrorResponse),
        (status = 503, description = "Search history is disabled", body = crate::error::ErrorResponse)
    )
)]
pub async fn analytics(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<SearchAnalytics>> {
    claims.require_admin()?;
    let analytics = state
        .services
        .search_history
        .analytics(query.days, query.limit)
        .await?;
    Ok(Json(analytics))
}
