//! Catalogue endpoints: public book search and counter book management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        book::{
            AddCopyRequest, AdminBookSearchQuery, Book, BookCopy, BookDetail,
            BookSearchQuery, BookSearchResult, BookWithCopies, Category, CategoryRequest,
            CreateBookRequest, CreatedBook, SetBookCategoriesRequest, UpdateBookRequest,
            UpdateCopyRequest,
        },
        loan::FeeType,
        pagination::{PageParams, PaginatedInventory},
    },
    AppState,
};

use super::{AuthenticatedUser, OptionalUser};

/// Search the catalogue; a member token adds member pricing
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookSearchQuery),
    responses(
        (status = 200, description = "Matching books", body = Vec<BookSearchResult>),
        (status = 401, description = "Invalid token", body = crate::error::ErrorResponse)
    )
)]
pub async fn search_books(
    State(state): State<AppState>,
    caller: OptionalUser,
    Query(query): Query<BookSearchQuery>,
) -> AppResult<Json<Vec<BookSearchResult>>> {
    let books = state
        .services
        .catalog
        .search_books(&query, caller.member_id())
        .await?;
    Ok(Json(books))
}

/// Book with copies grouped by condition and price
#[utoipa::path(
    get,
    path = "/books/{id}",
    tag = "books",
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookDetail),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    caller: OptionalUser,
    Path(book_id): Path<i64>,
) -> AppResult<Json<BookDetail>> {
    let book = state
        .services
        .catalog
        .book_detail(book_id, caller.member_id())
        .await?;
    Ok(Json(book))
}

#[utoipa::path(
    get,
    path = "/categories",
    tag = "books",
    responses(
        (status = 200, description = "All categories", body = Vec<Category>)
    )
)]
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let categories = state.services.catalog.list_categories().await?;
    Ok(Json(categories))
}

/// Books with copy counts per status
#[utoipa::path(
    get,
    path = "/admin/books",
    tag = "books",
    security(("bearer_auth" = [])),
    params(PageParams),
    responses(
        (status = 200, description = "Inventory page", body = PaginatedInventory)
    )
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(page): Query<PageParams>,
) -> AppResult<Json<PaginatedInventory>> {
    claims.require_admin()?;
    let inventory = state.services.catalog.list_inventory(&page).await?;
    Ok(Json(inventory))
}

/// Add a book and its first copies
#[utoipa::path(
    post,
    path = "/admin/books",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book created", body = CreatedBook),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateBookRequest>,
) -> AppResult<(StatusCode, Json<CreatedBook>)> {
    claims.require_admin()?;
    let created = state.services.catalog.create_book(request).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Counter search over books and their copies
#[utoipa::path(
    get,
    path = "/admin/books/search",
    tag = "books",
    security(("bearer_auth" = [])),
    params(AdminBookSearchQuery),
    responses(
        (status = 200, description = "Books with copies", body = Vec<BookWithCopies>),
        (status = 400, description = "No search criterion", body = crate::error::ErrorResponse)
    )
)]
pub async fn admin_search(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<AdminBookSearchQuery>,
) -> AppResult<Json<Vec<BookWithCopies>>> {
    claims.require_admin()?;
    let books = state.services.catalog.admin_search(&query).await?;
    Ok(Json(books))
}

#[utoipa::path(
    patch,
    path = "/admin/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 400, description = "No fields to update", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
    Json(request): Json<UpdateBookRequest>,
) -> AppResult<Json<Book>> {
    claims.require_admin()?;
    let book = state.services.catalog.update_book(book_id, request).await?;
    Ok(Json(book))
}

#[utoipa::path(
    delete,
    path = "/admin/books/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book is still referenced by loans", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_admin()?;
    state.services.catalog.delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Replace the categories of a book
#[utoipa::path(
    post,
    path = "/admin/books/{id}/categories",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = SetBookCategoriesRequest,
    responses(
        (status = 200, description = "New categories of the book", body = Vec<Category>),
        (status = 404, description = "Book or category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn set_book_categories(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
    Json(request): Json<SetBookCategoriesRequest>,
) -> AppResult<Json<Vec<Category>>> {
    claims.require_admin()?;
    let categories = state
        .services
        .catalog
        .set_book_categories(book_id, request.category_ids)
        .await?;
    Ok(Json(categories))
}

/// Add a copy with the next serial
#[utoipa::path(
    post,
    path = "/admin/books/{id}/copies",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Book ID")),
    request_body = AddCopyRequest,
    responses(
        (status = 201, description = "Copy added", body = BookCopy),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn add_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(book_id): Path<i64>,
    Json(request): Json<AddCopyRequest>,
) -> AppResult<(StatusCode, Json<BookCopy>)> {
    claims.require_admin()?;
    let copy = state.services.catalog.add_copy(book_id, request).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// Change the status or condition of a copy
#[utoipa::path(
    patch,
    path = "/admin/books/{id}/copies/{serial}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(
        ("id" = i64, Path, description = "Book ID"),
        ("serial" = i32, Path, description = "Copy serial")
    ),
    request_body = UpdateCopyRequest,
    responses(
        (status = 200, description = "Copy updated", body = BookCopy),
        (status = 400, description = "No fields to update", body = crate::error::ErrorResponse),
        (status = 404, description = "Copy not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_copy(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path((book_id, copies_serial)): Path<(i64, i32)>,
    Json(request): Json<UpdateCopyRequest>,
) -> AppResult<Json<BookCopy>> {
    claims.require_admin()?;
    let copy = state
        .services
        .catalog
        .update_copy(book_id, copies_serial, request)
        .await?;
    Ok(Json(copy))
}

#[utoipa::path(
    post,
    path = "/admin/categories",
    tag = "books",
    security(("bearer_auth" = [])),
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Category already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    claims.require_admin()?;
    request.validate()?;
    let category = state.services.catalog.create_category(&request.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

#[utoipa::path(
    patch,
    path = "/admin/categories/{id}",
    tag = "books",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = Category),
        (status = 404, description = "Category not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn rename_category(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(category_id): Path<i64>,
    Json(request): Json<CategoryRequest>,
) -> AppResult<Json<Category>> {
    claims.require_admin()?;
    request.validate()?;
    let category = state
        .services
        .catalog
        .rename_category(category_id, &request.name)
        .await?;
    Ok(Json(category))
}

/// Fee kinds with their rates
#[utoipa::path(
    get,
    path = "/admin/fee-types",
    tag = "books",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Configured fee types", body = Vec<FeeType>)
    )
)]
pub async fn list_fee_types(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<FeeType>>> {
    claims.require_admin()?;
    let fee_types = state.services.catalog.list_fee_types().await?;
    Ok(Json(fee_types))
}
