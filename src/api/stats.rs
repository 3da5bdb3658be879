//! Statistics endpoints

use axum::{extract::Query, extract::State, Json};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppResult, AppState};

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopBook {
    pub book_id: i64,
    pub name: String,
    pub author: Option<String>,
    pub publisher: Option<String>,
    /// Number of times a copy of the book was lent
    pub borrow_count: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopCategory {
    pub category_id: i64,
    pub name: String,
    pub borrow_count: i64,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopQuery {
    /// Number of rows (default: 10)
    pub limit: Option<i64>,
}

/// Most borrowed books
#[utoipa::path(
    get,
    path = "/stats/top-books",
    tag = "stats",
    params(TopQuery),
    responses(
        (status = 200, description = "Books by borrow count", body = Vec<TopBook>)
    )
)]
pub async fn top_books(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<TopBook>>> {
    let books = state.services.stats.top_books(query.limit).await?;
    Ok(Json(books))
}

/// Most borrowed categories
#[utoipa::path(
    get,
    path = "/stats/top-categories",
    tag = "stats",
    params(TopQuery),
    responses(
        (status = 200, description = "Categories by borrow count", body = Vec<TopCategory>)
    )
)]
pub async fn top_categories(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> AppResult<Json<Vec<TopCategory>>> {
    let categories = state.services.stats.top_categories(query.limit).await?;
    Ok(Json(categories))
}
