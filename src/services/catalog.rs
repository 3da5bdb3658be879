//! Catalog service: books, categories and copies

use std::collections::HashMap;

use rust_decimal::Decimal;
use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::{
            AddCopyRequest, AdminBookSearchQuery, Book, BookCategoryRow, BookCopy, BookDetail,
            BookInventory, BookSearchQuery, BookSearchResult, BookWithCopies, Category,
            CreateBookRequest, CreatedBook, UpdateBookRequest, UpdateCopyRequest,
        },
        enums::{BookCondition, CopyStatus},
        loan::FeeType,
        pagination::{PageParams, Paginated},
        search_history::{NewSearch, SearchFilters},
    },
    pricing,
    repository::{copies::{copy_not_found, NewCopy}, Repository},
    services::search_history::SearchHistoryService,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    search_history: SearchHistoryService,
}

impl CatalogService {
    pub fn new(repository: Repository, search_history: SearchHistoryService) -> Self {
        Self {
            repository,
            search_history,
        }
    }

    /// Public search; a member caller gets member pricing and the search is recorded
    pub async fn search_books(
        &self,
        query: &BookSearchQuery,
        member_id: Option<i64>,
    ) -> AppResult<Vec<BookSearchResult>> {
        let discount_rate = self.discount_rate(member_id).await?;

        let rows = self.repository.books.search(query).await?;
        let book_ids: Vec<i64> = rows.iter().map(|r| r.book.book_id).collect();
        let mut categories =
            group_categories(self.repository.books.categories_for(&book_ids).await?);

        let results: Vec<BookSearchResult> = rows
            .into_iter()
            .map(|row| BookSearchResult {
                categories: categories.remove(&row.book.book_id).unwrap_or_default(),
                available_count: row.available_count,
                discount_rate,
                estimated_min_rental_price: row
                    .min_rental_price
                    .map(|price| pricing::rental_fee(price, discount_rate)),
                book: row.book,
            })
            .collect();

        if let Some(member_id) = member_id {
            self.search_history
                .record(NewSearch {
                    member_id,
                    search_query: query.keyword.clone().unwrap_or_default(),
                    book_ids,
                    filters: SearchFilters {
                        category: query.category_id,
                        author: query.author.clone().filter(|a| !a.trim().is_empty()),
                        publisher: query.publisher.clone().filter(|p| !p.trim().is_empty()),
                        min_price: query.min_price,
                        max_price: query.max_price,
                    },
                })
                .await;
        }

        Ok(results)
    }

    /// Book with categories and copies grouped by condition and price
    pub async fn book_detail(&self, book_id: i64, member_id: Option<i64>) -> AppResult<BookDetail> {
        let discount_rate = self.discount_rate(member_id).await?;
        let book = self.repository.books.get(book_id).await?;
        let categories = self
            .repository
            .books
            .categories_for(&[book_id])
            .await?
            .into_iter()
            .map(category_of)
            .collect();

        let mut copies = self.repository.books.copy_groups(book_id).await?;
        for group in &mut copies {
            group.discounted_rental_price = pricing::rental_fee(group.rental_price, discount_rate);
        }

        Ok(BookDetail {
            book,
            categories,
            discount_rate,
            copies,
        })
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.books.list_categories().await
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        self.repository.books.create_category(name.trim()).await
    }

    pub async fn rename_category(&self, category_id: i64, name: &str) -> AppResult<Category> {
        self.repository.books.rename_category(category_id, name.trim()).await
    }

    /// Replace the categories of a book
    pub async fn set_book_categories(
        &self,
        book_id: i64,
        category_ids: Vec<i64>,
    ) -> AppResult<Vec<Category>> {
        let mut ids = category_ids;
        ids.sort_unstable();
        ids.dedup();

        let mut tx = self.repository.pool.begin().await?;
        self.repository.books.lock(&mut tx, book_id).await?;

        let found = self.repository.books.count_categories(&mut tx, &ids).await?;
        if found != ids.len() as i64 {
            return Err(AppError::not_found(
                ErrorCode::CategoryNotFound,
                "One or more categories do not exist",
            ));
        }

        self.repository
            .books
            .replace_categories(&mut tx, book_id, &ids)
            .await?;
        tx.commit().await?;

        Ok(self
            .repository
            .books
            .categories_for(&[book_id])
            .await?
            .into_iter()
            .map(category_of)
            .collect())
    }

    /// Create a book, link its category and add Good copies priced from the list price
    pub async fn create_book(&self, request: CreateBookRequest) -> AppResult<CreatedBook> {
        request.validate()?;
        if request.price < Decimal::ZERO {
            return Err(AppError::BadRequest("price must not be negative".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;

        let book = self.repository.books.create(&mut tx, &request).await?;

        if let Some(category_id) = request.category_id {
            if self.repository.books.count_categories(&mut tx, &[category_id]).await? == 0 {
                return Err(AppError::not_found(
                    ErrorCode::CategoryNotFound,
                    format!("Category with id {} not found", category_id),
                ));
            }
            self.repository
                .books
                .link_category(&mut tx, book.book_id, category_id)
                .await?;
        }

        let factor = self
            .repository
            .copies
            .condition_factor(&mut tx, BookCondition::Good)
            .await?;
        let rental_price = pricing::rental_price(book.price, factor);

        let mut copies = Vec::new();
        for serial in 1..=request.copies_count.unwrap_or(1) {
            let copy = self
                .repository
                .copies
                .create(
                    &mut tx,
                    &NewCopy {
                        book_id: book.book_id,
                        copies_serial: serial,
                        purchase_date: None,
                        purchase_price: book.price,
                        book_condition: BookCondition::Good,
                        rental_price,
                    },
                )
                .await?;
            copies.push(copy);
        }

        tx.commit().await?;

        tracing::info!(book_id = book.book_id, copies = copies.len(), "Book created");

        Ok(CreatedBook { book, copies })
    }

    pub async fn update_book(&self, book_id: i64, request: UpdateBookRequest) -> AppResult<Book> {
        request.validate()?;
        if request.is_empty() {
            return Err(AppError::business(ErrorCode::NoFields, "No fields to update"));
        }
        self.repository.books.update(book_id, &request).await
    }

    pub async fn delete_book(&self, book_id: i64) -> AppResult<()> {
        self.repository.books.delete(book_id).await?;
        tracing::info!(book_id, "Book deleted");
        Ok(())
    }

    pub async fn list_inventory(&self, page: &PageParams) -> AppResult<Paginated<BookInventory>> {
        let (books, total) = self.repository.books.list_inventory(page).await?;
        Ok(Paginated::new(books, total, page))
    }

    /// Counter search returning every copy of the matching books
    pub async fn admin_search(
        &self,
        query: &AdminBookSearchQuery,
    ) -> AppResult<Vec<BookWithCopies>> {
        if !query.has_criteria() {
            return Err(AppError::BadRequest(
                "Provide at least one of book_id, name or category_id".to_string(),
            ));
        }

        let books = self.repository.books.admin_search(query).await?;
        let book_ids: Vec<i64> = books.iter().map(|b| b.book_id).collect();

        let mut categories =
            group_categories(self.repository.books.categories_for(&book_ids).await?);
        let mut copies: HashMap<i64, Vec<BookCopy>> = HashMap::new();
        for copy in self
            .repository
            .copies
            .list_for_books(&book_ids, query.status)
            .await?
        {
            copies.entry(copy.book_id).or_default().push(copy);
        }

        Ok(books
            .into_iter()
            .map(|book| BookWithCopies {
                categories: categories.remove(&book.book_id).unwrap_or_default(),
                copies: copies.remove(&book.book_id).unwrap_or_default(),
                book,
            })
            .collect())
    }

    /// Add one copy with the next serial
    pub async fn add_copy(&self, book_id: i64, request: AddCopyRequest) -> AppResult<BookCopy> {
        if request.purchase_price < Decimal::ZERO {
            return Err(AppError::BadRequest("purchase_price must not be negative".to_string()));
        }
        let condition = request.book_condition.unwrap_or(BookCondition::Good);

        let mut tx = self.repository.pool.begin().await?;

        let book = self.repository.books.lock(&mut tx, book_id).await?;
        let factor = self.repository.copies.condition_factor(&mut tx, condition).await?;
        let serial = self.repository.copies.next_serial(&mut tx, book_id).await?;

        let copy = self
            .repository
            .copies
            .create(
                &mut tx,
                &NewCopy {
                    book_id,
                    copies_serial: serial,
                    purchase_date: request.purchase_date,
                    purchase_price: request.purchase_price,
                    book_condition: condition,
                    rental_price: pricing::rental_price(book.price, factor),
                },
            )
            .await?;

        tx.commit().await?;

        tracing::info!(book_id, copies_serial = serial, "Copy added");

        Ok(copy)
    }

    /// Change status and/or condition of a copy; a new condition reprices it
    pub async fn update_copy(
        &self,
        book_id: i64,
        copies_serial: i32,
        request: UpdateCopyRequest,
    ) -> AppResult<BookCopy> {
        if request.status.is_none() && request.book_condition.is_none() {
            return Err(AppError::business(ErrorCode::NoFields, "No fields to update"));
        }

        let mut tx = self.repository.pool.begin().await?;

        let copy = self
            .repository
            .copies
            .lock(&mut tx, book_id, copies_serial)
            .await?
            .ok_or_else(|| copy_not_found(book_id, copies_serial))?;

        let (condition, rental_price) = match request.book_condition {
            Some(condition) => {
                let factor = self.repository.copies.condition_factor(&mut tx, condition).await?;
                let book = self.repository.books.lock(&mut tx, book_id).await?;
                (condition, pricing::rental_price(book.price, factor))
            }
            None => (copy.book_condition, copy.rental_price),
        };
        let status: CopyStatus = request.status.unwrap_or(copy.status);

        let updated = self
            .repository
            .copies
            .reprice(&mut tx, book_id, copies_serial, condition, rental_price, status)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    pub async fn list_fee_types(&self) -> AppResult<Vec<FeeType>> {
        self.repository.loans.list_fee_types().await
    }

    /// Discount rate for the caller, 1 for anonymous callers
    async fn discount_rate(&self, member_id: Option<i64>) -> AppResult<Decimal> {
        match member_id {
            Some(id) => Ok(self.repository.members.get_with_level(id).await?.discount_rate),
            None => Ok(Decimal::ONE),
        }
    }
}

fn category_of(row: BookCategoryRow) -> Category {
    Category {
        category_id: row.category_id,
        name: row.name,
    }
}

fn group_categories(rows: Vec<BookCategoryRow>) -> HashMap<i64, Vec<Category>> {
    let mut grouped: HashMap<i64, Vec<Category>> = HashMap::new();
    for row in rows {
        grouped.entry(row.book_id).or_default().push(category_of(row));
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_categories() {
        let rows = vec![
            BookCategoryRow {
                book_id: 1,
                category_id: 10,
                name: "Fantasy".into(),
            },
            BookCategoryRow {
                book_id: 2,
                category_id: 11,
                name: "History".into(),
            },
            BookCategoryRow {
                book_id: 1,
                category_id: 12,
                name: "Classics".into(),
            },
        ];

        let grouped = group_categories(rows);
        assert_eq!(grouped[&1].len(), 2);
        assert_eq!(grouped[&1][1].name, "Classics");
        assert_eq!(grouped[&2][0].category_id, 11);
        assert!(!grouped.contains_key(&3));
    }
}
