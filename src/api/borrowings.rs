//! Borrowing lifecycle endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::{
        borrowing::{Borrowing, BorrowingDetails, BorrowingStatus, CreateBorrowing},
        user::Action,
    },
};

use super::{AppJson, AuthenticatedUser, MessageResponse};

/// Return confirmation body
#[derive(Serialize, ToSchema)]
pub struct ReturnResponse {
    /// Borrowing ID
    pub id: i32,
    /// When the copy came back
    pub return_date: Option<DateTime<Utc>>,
    /// Lifecycle state after the return
    pub status: BorrowingStatus,
}

/// List every borrowing (privileged)
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All borrowings", body = Vec<BorrowingDetails>),
        (status = 403, description = "Not authorized")
    )
)]
pub async fn list_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.authorize(Action::ViewAllBorrowings)?;

    let borrowings = state.services.borrowings.list_all().await?;
    Ok(Json(borrowings))
}

/// List the caller's own borrowings
#[utoipa::path(
    get,
    path = "/borrowings/student",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's borrowings", body = Vec<BorrowingDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_own_borrowings(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowingDetails>>> {
    claims.authorize(Action::ViewOwnBorrowings)?;

    let borrowings = state.services.borrowings.list_for_student(claims.id).await?;
    Ok(Json(borrowings))
}

/// Loan a copy out (privileged)
#[utoipa::path(
    post,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowing,
    responses(
        (status = 201, description = "Borrowing created", body = Borrowing),
        (status = 400, description = "Missing fields or book not available"),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn create_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(borrowing): AppJson<CreateBorrowing>,
) -> AppResult<(StatusCode, Json<Borrowing>)> {
    claims.authorize(Action::ManageBorrowings)?;

    let created = state.services.borrowings.create(borrowing).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Return a borrowed copy (privileged)
#[utoipa::path(
    put,
    path = "/borrowings/{id}/return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Copy returned", body = ReturnResponse),
        (status = 400, description = "Already returned"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn return_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<ReturnResponse>> {
    claims.authorize(Action::ManageBorrowings)?;

    let returned = state.services.borrowings.return_borrowing(id).await?;
    Ok(Json(ReturnResponse {
        id: returned.id,
        return_date: returned.return_date,
        status: returned.status,
    }))
}

/// Delete a borrowing record (privileged)
#[utoipa::path(
    delete,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Borrowing ID")
    ),
    responses(
        (status = 200, description = "Borrowing deleted", body = MessageResponse),
        (status = 403, description = "Not authorized"),
        (status = 404, description = "Borrowing not found")
    )
)]
pub async fn delete_borrowing(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<MessageResponse>> {
    claims.authorize(Action::ManageBorrowings)?;

    state.services.borrowings.delete(id).await?;
    Ok(Json(MessageResponse::new("Borrowing deleted successfully")))
}
