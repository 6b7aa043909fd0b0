//! Books repository for database operations

use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    inventory,
    models::book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
};

const BOOK_DETAILS_SELECT: &str = r#"
    SELECT b.id, b.title, b.author, b.isbn, b.publication_year, b.publisher,
           b.description, b.cover_image, b.quantity, b.available_quantity,
           b.category_id, c.name AS category_name,
           (b.available_quantity > 0) AS available,
           b.created_at, b.updated_at
    FROM books b
    JOIN categories c ON c.id = b.category_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List books with optional filters, newest first
    pub async fn list(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        let sql = format!(
            r#"{BOOK_DETAILS_SELECT}
            WHERE ($1::text IS NULL OR b.title ILIKE '%' || $1 || '%')
              AND ($2::text IS NULL OR b.author ILIKE '%' || $2 || '%')
              AND ($3::int IS NULL OR b.category_id = $3)
            ORDER BY b.created_at DESC
            "#,
        );
        let rows = sqlx::query_as::<_, BookDetails>(&sql)
            .bind(query.title.as_deref())
            .bind(query.author.as_deref())
            .bind(query.category_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Get a book with category enrichment by ID
    pub async fn get_details(&self, id: i32) -> AppResult<BookDetails> {
        let sql = format!("{BOOK_DETAILS_SELECT} WHERE b.id = $1");
        sqlx::query_as::<_, BookDetails>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Get a bare book row by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))
    }

    /// Create a new book; available copies start equal to the total
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let quantity = book.quantity.unwrap_or(1);
        let row = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, isbn, publication_year, publisher,
                               description, cover_image, quantity, available_quantity,
                               category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .bind(&book.publisher)
        .bind(&book.description)
        .bind(&book.cover_image)
        .bind(quantity)
        .bind(book.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    /// Apply a partial update. The row is locked for the whole
    /// read-merge-write sequence so a concurrent borrow cannot interleave
    /// with the availability recomputation.
    pub async fn update(&self, id: i32, update: &UpdateBook) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        // Absent fields keep their stored value; present nulls clear
        let title = update.title.as_deref().unwrap_or(&current.title);
        let author = update.author.as_deref().unwrap_or(&current.author);
        let isbn = update.isbn.clone().unwrap_or(current.isbn);
        let publication_year = update
            .publication_year
            .unwrap_or(current.publication_year);
        let publisher = update.publisher.clone().unwrap_or(current.publisher);
        let description = update.description.clone().unwrap_or(current.description);
        let cover_image = update.cover_image.clone().unwrap_or(current.cover_image);
        let category_id = update.category_id.unwrap_or(current.category_id);

        let quantity = update.quantity.unwrap_or(current.quantity);
        let available_quantity = match update.quantity {
            Some(new_quantity) => inventory::available_after_restock(
                current.quantity,
                current.available_quantity,
                new_quantity,
            ),
            None => current.available_quantity,
        };

        let updated = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author = $2, isbn = $3, publication_year = $4,
                publisher = $5, description = $6, cover_image = $7,
                quantity = $8, available_quantity = $9, category_id = $10,
                updated_at = NOW()
            WHERE id = $11
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(author)
        .bind(isbn)
        .bind(publication_year)
        .bind(publisher)
        .bind(description)
        .bind(cover_image)
        .bind(quantity)
        .bind(available_quantity)
        .bind(category_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Delete a book, refusing while any copy is out on loan
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT quantity, available_quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;

        let quantity: i32 = row.get("quantity");
        let available_quantity: i32 = row.get("available_quantity");

        if !inventory::can_delete_book(quantity, available_quantity) {
            return Err(AppError::Conflict(
                ErrorCode::BookHasActiveBorrowings,
                "Book cannot be deleted while it has active borrowings".to_string(),
            ));
        }

        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
