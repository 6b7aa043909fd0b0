//! Borrowing lifecycle service

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::borrowing::{Borrowing, BorrowingDetails, CreateBorrowing},
    repository::Repository,
};

#[derive(Clone)]
pub struct BorrowingsService {
    repository: Repository,
}

impl BorrowingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List every borrowing (privileged scope)
    pub async fn list_all(&self) -> AppResult<Vec<BorrowingDetails>> {
        self.repository.borrowings.list_all().await
    }

    /// List one student's borrowings (self scope)
    pub async fn list_for_student(&self, student_id: i32) -> AppResult<Vec<BorrowingDetails>> {
        self.repository.borrowings.list_by_student(student_id).await
    }

    /// Loan a copy out
    pub async fn create(&self, borrowing: CreateBorrowing) -> AppResult<Borrowing> {
        borrowing
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let created = self.repository.borrowings.create(&borrowing).await?;
        tracing::info!(
            "Created borrowing {} (book {}, student {})",
            created.id,
            created.book_id,
            created.student_id
        );
        Ok(created)
    }

    /// Return a loaned copy
    pub async fn return_borrowing(&self, id: i32) -> AppResult<Borrowing> {
        let returned = self.repository.borrowings.return_borrowing(id).await?;
        tracing::info!("Returned borrowing {} (book {})", returned.id, returned.book_id);
        Ok(returned)
    }

    /// Delete a borrowing record in any state
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.borrowings.delete(id).await?;
        tracing::info!("Deleted borrowing {}", id);
        Ok(())
    }
}
