//! Books and categories repository

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::{
            AdminBookSearchQuery, Book, BookCategoryRow, BookInventory, BookSearchQuery,
            BookSearchRow, Category, CopyGroup, CreateBookRequest, UpdateBookRequest,
        },
        pagination::PageParams,
    },
};

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get(&self, book_id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM book WHERE book_id = $1")
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| book_not_found(book_id))
    }

    /// Lock a book row; serialises copy creation for the book
    pub async fn lock(&self, conn: &mut PgConnection, book_id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM book WHERE book_id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| book_not_found(book_id))
    }

    /// Books by id, in no particular order
    pub async fn get_many(
        &self,
        conn: &mut PgConnection,
        book_ids: &[i64],
    ) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM book WHERE book_id = ANY($1)")
            .bind(book_ids)
            .fetch_all(&mut *conn)
            .await?;

        Ok(books)
    }

    /// Public catalogue search with available copy statistics
    pub async fn search(&self, query: &BookSearchQuery) -> AppResult<Vec<BookSearchRow>> {
        let mut conditions = Vec::new();
        let mut patterns: Vec<String> = Vec::new();

        for (column, value) in [
            ("b.name", &query.keyword),
            ("b.author", &query.author),
            ("b.publisher", &query.publisher),
        ] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                patterns.push(format!("%{}%", value));
                conditions.push(format!("{} ILIKE ${}", column, patterns.len()));
            }
        }

        if query.category_id.is_some() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_category bcat WHERE bcat.book_id = b.book_id AND bcat.category_id = ${})",
                patterns.len() + 1
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            r#"
            SELECT b.book_id, b.sequence_name, b.name, b.author, b.publisher, b.price,
                   COUNT(bc.copies_serial) FILTER (WHERE bc.status = 'Available') AS available_count,
                   MIN(bc.rental_price) AS min_rental_price
            FROM book b
            LEFT JOIN book_copies bc ON bc.book_id = b.book_id
            {}
            GROUP BY b.book_id
            ORDER BY b.book_id
            "#,
            where_clause
        );

        let mut builder = sqlx::query_as::<_, BookSearchRow>(&sql);
        for pattern in &patterns {
            builder = builder.bind(pattern);
        }
        if let Some(category_id) = query.category_id {
            builder = builder.bind(category_id);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Counter search; copies are loaded separately
    pub async fn admin_search(&self, query: &AdminBookSearchQuery) -> AppResult<Vec<Book>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if query.book_id.is_some() {
            conditions.push(format!("b.book_id = ${}", idx));
            idx += 1;
        }
        let name_pattern = query
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n));
        if name_pattern.is_some() {
            conditions.push(format!("b.name ILIKE ${}", idx));
            idx += 1;
        }
        if query.category_id.is_some() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_category bcat WHERE bcat.book_id = b.book_id AND bcat.category_id = ${})",
                idx
            ));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!(
                "EXISTS (SELECT 1 FROM book_copies bc WHERE bc.book_id = b.book_id AND bc.status = ${})",
                idx
            ));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT b.* FROM book b {} ORDER BY b.book_id", where_clause);

        let mut builder = sqlx::query_as::<_, Book>(&sql);
        if let Some(book_id) = query.book_id {
            builder = builder.bind(book_id);
        }
        if let Some(ref pattern) = name_pattern {
            builder = builder.bind(pattern);
        }
        if let Some(category_id) = query.category_id {
            builder = builder.bind(category_id);
        }
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }

        let books = builder.fetch_all(&self.pool).await?;
        Ok(books)
    }

    /// Books with copy counts, paginated
    pub async fn list_inventory(&self, page: &PageParams) -> AppResult<(Vec<BookInventory>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM book")
            .fetch_one(&self.pool)
            .await?;

        let books = sqlx::query_as::<_, BookInventory>(
            r#"
            SELECT b.book_id, b.sequence_name, b.name, b.author, b.publisher, b.price,
                   COUNT(bc.copies_serial) AS total_copies,
                   COUNT(bc.copies_serial) FILTER (WHERE bc.status = 'Available') AS available_count,
                   COUNT(bc.copies_serial) FILTER (WHERE bc.status = 'Borrowed') AS borrowed_count,
                   COUNT(bc.copies_serial) FILTER (WHERE bc.status = 'Reserved') AS reserved_count,
                   COUNT(bc.copies_serial) FILTER (WHERE bc.status = 'Lost') AS lost_count
            FROM book b
            LEFT JOIN book_copies bc ON bc.book_id = b.book_id
            GROUP BY b.book_id
            ORDER BY b.book_id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok((books, total))
    }

    /// Copies of one book grouped by condition and price, lost copies excluded
    pub async fn copy_groups(&self, book_id: i64) -> AppResult<Vec<CopyGroup>> {
        let groups = sqlx::query_as::<_, CopyGroup>(
            r#"
            SELECT book_condition, rental_price,
                   COUNT(*) FILTER (WHERE status = 'Available') AS available_count,
                   COUNT(*) AS total_count
            FROM book_copies
            WHERE book_id = $1 AND status <> 'Lost'
            GROUP BY book_condition, rental_price
            ORDER BY book_condition, rental_price
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(groups)
    }

    /// Category links for a set of books
    pub async fn categories_for(&self, book_ids: &[i64]) -> AppResult<Vec<BookCategoryRow>> {
        if book_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookCategoryRow>(
            r#"
            SELECT bc.book_id, c.category_id, c.name
            FROM book_category bc
            JOIN category c ON c.category_id = bc.category_id
            WHERE bc.book_id = ANY($1)
            ORDER BY c.name
            "#,
        )
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Create a new book
    pub async fn create(
        &self,
        conn: &mut PgConnection,
        book: &CreateBookRequest,
    ) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO book (sequence_name, name, author, publisher, price)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&book.sequence_name)
        .bind(book.name.trim())
        .bind(book.author.trim())
        .bind(&book.publisher)
        .bind(book.price)
        .fetch_one(&mut *conn)
        .await?;

        Ok(created)
    }

    /// Update the provided fields of a book
    pub async fn update(&self, book_id: i64, book: &UpdateBookRequest) -> AppResult<Book> {
        let mut sets = Vec::new();
        let mut idx = 1;

        for (column, present) in [
            ("sequence_name", book.sequence_name.is_some()),
            ("name", book.name.is_some()),
            ("author", book.author.is_some()),
            ("publisher", book.publisher.is_some()),
            ("price", book.price.is_some()),
        ] {
            if present {
                sets.push(format!("{} = ${}", column, idx));
                idx += 1;
            }
        }

        if sets.is_empty() {
            return Err(AppError::business(ErrorCode::NoFields, "No fields to update"));
        }

        let sql = format!(
            "UPDATE book SET {} WHERE book_id = ${} RETURNING *",
            sets.join(", "),
            idx
        );

        let mut builder = sqlx::query_as::<_, Book>(&sql);
        if let Some(ref sequence_name) = book.sequence_name {
            builder = builder.bind(sequence_name);
        }
        if let Some(ref name) = book.name {
            builder = builder.bind(name.trim());
        }
        if let Some(ref author) = book.author {
            builder = builder.bind(author);
        }
        if let Some(ref publisher) = book.publisher {
            builder = builder.bind(publisher);
        }
        if let Some(price) = book.price {
            builder = builder.bind(price);
        }

        builder
            .bind(book_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| book_not_found(book_id))
    }

    /// Delete a book; copies and category links cascade
    pub async fn delete(&self, book_id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM book WHERE book_id = $1")
            .bind(book_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(book_not_found(book_id));
        }

        Ok(())
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM category ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(categories)
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO category (name) VALUES ($1) RETURNING *",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(category)
    }

    pub async fn rename_category(&self, category_id: i64, name: &str) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            "UPDATE category SET name = $1 WHERE category_id = $2 RETURNING *",
        )
        .bind(name)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::not_found(
                ErrorCode::CategoryNotFound,
                format!("Category with id {} not found", category_id),
            )
        })
    }

    /// How many of the given category ids exist
    pub async fn count_categories(
        &self,
        conn: &mut PgConnection,
        category_ids: &[i64],
    ) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM category WHERE category_id = ANY($1)")
                .bind(category_ids)
                .fetch_one(&mut *conn)
                .await?;

        Ok(count)
    }

    pub async fn link_category(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
        category_id: i64,
    ) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO book_category (book_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(book_id)
        .bind(category_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Replace the category set of a book
    pub async fn replace_categories(
        &self,
        conn: &mut PgConnection,
        book_id: i64,
        category_ids: &[i64],
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM book_category WHERE book_id = $1")
            .bind(book_id)
            .execute(&mut *conn)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO book_category (book_id, category_id)
            SELECT $1, unnest($2::BIGINT[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(category_ids)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

pub(crate) fn book_not_found(book_id: i64) -> AppError {
    AppError::not_found(
        ErrorCode::BookNotFound,
        format!("Book with id {} not found", book_id),
    )
}
