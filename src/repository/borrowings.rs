//! Borrowings repository for database operations
//!
//! Every compound sequence (availability check + decrement, double-return
//! check + mark, compensating delete) runs in one transaction with the
//! affected rows locked, so concurrent requests cannot oversell a book.

use chrono::Utc;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::{AppError, AppResult, ErrorCode},
    inventory,
    models::{
        book::BookSummary,
        borrowing::{Borrowing, BorrowingDetails, BorrowerInfo, BorrowingStatus, CreateBorrowing},
    },
};

#[derive(Clone)]
pub struct BorrowingsRepository {
    pool: Pool<Postgres>,
}

impl BorrowingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get borrowing by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Borrowing> {
        sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing {} not found", id)))
    }

    /// List all borrowings with book and borrower enrichment, newest first
    pub async fn list_all(&self) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT br.*, bk.title, bk.author, bk.cover_image
            FROM borrowings br
            JOIN books bk ON bk.id = br.book_id
            ORDER BY br.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_details(row, true)).collect()
    }

    /// List one student's borrowings, newest first; borrower fields omitted
    pub async fn list_by_student(&self, student_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        let rows = sqlx::query(
            r#"
            SELECT br.*, bk.title, bk.author, bk.cover_image
            FROM borrowings br
            JOIN books bk ON bk.id = br.book_id
            WHERE br.student_id = $1
            ORDER BY br.created_at DESC
            "#,
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(|row| row_to_details(row, false)).collect()
    }

    /// Create a borrowing, taking one copy off the shelf atomically
    pub async fn create(&self, borrowing: &CreateBorrowing) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query("SELECT available_quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(borrowing.book_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book {} not found", borrowing.book_id)))?;

        let available: i32 = book.get("available_quantity");
        if !inventory::can_borrow(available) {
            return Err(AppError::Validation(
                "Book is not available for borrowing".to_string(),
            ));
        }

        let now = Utc::now();
        let created = sqlx::query_as::<_, Borrowing>(
            r#"
            INSERT INTO borrowings (book_id, student_id, student_name, student_email,
                                    borrow_date, due_date, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(borrowing.book_id)
        .bind(borrowing.student_id)
        .bind(&borrowing.student_name)
        .bind(&borrowing.student_email)
        .bind(now)
        .bind(borrowing.due_date)
        .bind(BorrowingStatus::Borrowed)
        .bind(&borrowing.notes)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE books SET available_quantity = available_quantity - 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(borrowing.book_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Mark a borrowing returned and put the copy back on the shelf.
    /// A loan transitions to returned at most once.
    pub async fn return_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing {} not found", id)))?;

        if current.return_date.is_some() {
            return Err(AppError::Conflict(
                ErrorCode::AlreadyReturned,
                "Borrowing has already been returned".to_string(),
            ));
        }

        let now = Utc::now();
        let returned = sqlx::query_as::<_, Borrowing>(
            r#"
            UPDATE borrowings
            SET return_date = $1, status = $2, updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(now)
        .bind(BorrowingStatus::Returned)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        self.restore_copy(&mut tx, current.book_id).await?;

        tx.commit().await?;
        Ok(returned)
    }

    /// Delete a borrowing in any state; an outstanding loan puts its copy
    /// back on the shelf first
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Borrowing>("SELECT * FROM borrowings WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Borrowing {} not found", id)))?;

        if current.return_date.is_none() {
            self.restore_copy(&mut tx, current.book_id).await?;
        }

        sqlx::query("DELETE FROM borrowings WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Credit one copy back to a book inside the caller's transaction
    async fn restore_copy(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        book_id: i32,
    ) -> AppResult<()> {
        let book = sqlx::query("SELECT quantity, available_quantity FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id)
            .fetch_one(&mut **tx)
            .await?;

        let quantity: i32 = book.get("quantity");
        let available: i32 = book.get("available_quantity");
        let restored = inventory::available_after_return(quantity, available);

        sqlx::query("UPDATE books SET available_quantity = $1, updated_at = NOW() WHERE id = $2")
            .bind(restored)
            .bind(book_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

fn row_to_details(row: &sqlx::postgres::PgRow, with_student: bool) -> AppResult<BorrowingDetails> {
    let status: BorrowingStatus = row.try_get("status")?;
    let student = with_student.then(|| BorrowerInfo {
        id: row.get("student_id"),
        name: row.get("student_name"),
        email: row.get("student_email"),
    });

    Ok(BorrowingDetails {
        id: row.get("id"),
        book: BookSummary {
            id: row.get("book_id"),
            title: row.get("title"),
            author: row.get("author"),
            cover_image: row.get("cover_image"),
        },
        student,
        borrow_date: row.get("borrow_date"),
        due_date: row.get("due_date"),
        return_date: row.get("return_date"),
        status,
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
