//! HTTP handlers for the catalog endpoints.
//!
//! Body and path extractors are taken as `Result` so that the admin gate runs
//! before either is inspected, and so that rejections leave through
//! [`AppError`] with the usual JSON envelope.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use axum_extra::extract::{Form, FormRejection};
use bookshelf_authz::Requester;
use bookshelf_http::error::AppError;

use super::models::{BookCreated, BookDetail, BookForm, BookId, BookSummary, MessageResponse};
use super::service::CatalogService;

type FormBody = Result<Form<BookForm>, FormRejection>;
type BookPath = Result<Path<BookId>, PathRejection>;

/// Routes relative to the module mount path (`/api`).
pub fn router(service: CatalogService) -> Router {
    Router::new()
        .route("/book", get(list_books))
        .route("/book/{id}", get(get_book))
        .route("/add_book", post(add_book))
        .route("/book/{id}/delete", delete(delete_book))
        .route("/book/{id}/update", put(update_book))
        .with_state(service)
}

fn book_id(path: BookPath) -> Result<BookId, AppError> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

fn book_form(body: FormBody) -> Result<BookForm, AppError> {
    body.map(|Form(form)| form)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

async fn list_books(
    State(catalog): State<CatalogService>,
) -> Result<Json<Vec<BookSummary>>, AppError> {
    Ok(Json(catalog.list_books().await?))
}

async fn get_book(
    State(catalog): State<CatalogService>,
    path: BookPath,
) -> Result<Json<BookDetail>, AppError> {
    Ok(Json(catalog.get_book(book_id(path)?).await?))
}

async fn add_book(
    State(catalog): State<CatalogService>,
    requester: Requester,
    body: FormBody,
) -> Result<(StatusCode, Json<BookCreated>), AppError> {
    catalog.authorize(&requester).await?;
    let form = book_form(body)?;

    let book_id = catalog.add_book(&requester, form).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookCreated {
            message: "Book added successfully",
            book_id,
        }),
    ))
}

async fn delete_book(
    State(catalog): State<CatalogService>,
    requester: Requester,
    path: BookPath,
) -> Result<Json<MessageResponse>, AppError> {
    catalog.authorize(&requester).await?;
    let id = book_id(path)?;

    catalog.delete_book(&requester, id).await?;
    Ok(Json(MessageResponse {
        message: "Book deleted successfully",
    }))
}

async fn update_book(
    State(catalog): State<CatalogService>,
    requester: Requester,
    path: BookPath,
    body: FormBody,
) -> Result<Json<MessageResponse>, AppError> {
    catalog.authorize(&requester).await?;
    let id = book_id(path)?;
    let form = book_form(body)?;

    catalog.update_book(&requester, id, form).await?;
    Ok(Json(MessageResponse {
        message: "Book updated successfully",
    }))
}
