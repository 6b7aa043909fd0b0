//! Catalog management service: books and categories with referential checks

use validator::Validate;

use crate::{
    error::{AppError, AppResult, ErrorCode},
    models::{
        book::{Book, BookDetails, BookQuery, CreateBook, UpdateBook},
        category::{Category, CreateCategory, UpdateCategory},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// List books with optional filters
    pub async fn list_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        self.repository.books.list(query).await
    }

    /// Get a book with category enrichment
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository.books.get_details(id).await
    }

    /// Create a new book
    pub async fn create_book(&self, book: CreateBook) -> AppResult<Book> {
        book.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // The referenced category must exist; a dangling reference is a bad
        // request, matching the behavior clients already rely on.
        if !self.repository.categories.exists(book.category_id).await? {
            return Err(AppError::Validation(format!(
                "Category {} not found",
                book.category_id
            )));
        }

        let created = self.repository.books.create(&book).await?;
        tracing::info!("Created book {} ({})", created.id, created.title);
        Ok(created)
    }

    /// Apply a partial update to a book
    pub async fn update_book(&self, id: i32, update: UpdateBook) -> AppResult<Book> {
        update
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if let Some(category_id) = update.category_id {
            if !self.repository.categories.exists(category_id).await? {
                return Err(AppError::Validation(format!(
                    "Category {} not found",
                    category_id
                )));
            }
        }

        self.repository.books.update(id, &update).await
    }

    /// Delete a book (refused while copies are out on loan)
    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Deleted book {}", id);
        Ok(())
    }

    /// List all categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    /// Get category by ID
    pub async fn get_category(&self, id: i32) -> AppResult<Category> {
        self.repository.categories.get_by_id(id).await
    }

    /// Create a category with a unique name
    pub async fn create_category(&self, category: CreateCategory) -> AppResult<Category> {
        category
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        if self.repository.categories.name_exists(&category.name, None).await? {
            return Err(AppError::Conflict(
                ErrorCode::Duplicate,
                format!("A category named \"{}\" already exists", category.name),
            ));
        }

        self.repository.categories.create(&category.name).await
    }

    /// Rename a category, keeping names unique
    pub async fn update_category(&self, id: i32, category: UpdateCategory) -> AppResult<Category> {
        category
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.repository.categories.get_by_id(id).await?;

        if self
            .repository
            .categories
            .name_exists(&category.name, Some(id))
            .await?
        {
            return Err(AppError::Conflict(
                ErrorCode::Duplicate,
                format!("A category named \"{}\" already exists", category.name),
            ));
        }

        self.repository.categories.rename(id, &category.name).await
    }

    /// Delete a category (refused while books reference it)
    pub async fn delete_category(&self, id: i32) -> AppResult<()> {
        self.repository.categories.get_by_id(id).await?;

        let book_count = self.repository.categories.count_books(id).await?;
        if book_count > 0 {
            return Err(AppError::Conflict(
                ErrorCode::CategoryHasBooks,
                format!("Category cannot be deleted: {} book(s) reference it", book_count),
            ));
        }

        self.repository.categories.delete(id).await
    }
}
