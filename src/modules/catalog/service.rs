use std::sync::Arc;

use bookshelf_authz::{AdminGate, Requester};
use sqlx::SqlitePool;

use super::error::CatalogError;
use super::models::{BookDetail, BookForm, BookId, BookSummary};
use super::repository::BookRepository;

/// Read and write operations over books and their genre links.
///
/// Mutations consult the [`AdminGate`] first and validate input second; the
/// store is only touched once both pass.
#[derive(Clone)]
pub struct CatalogService {
    repo: BookRepository,
    gate: Arc<dyn AdminGate>,
}

impl CatalogService {
    pub fn new(pool: SqlitePool, gate: Arc<dyn AdminGate>) -> Self {
        Self {
            repo: BookRepository::new(pool),
            gate,
        }
    }

    /// Reviewed books ordered by descending average rating. Books without
    /// reviews are not listed.
    pub async fn list_books(&self) -> Result<Vec<BookSummary>, CatalogError> {
        Ok(self.repo.list_rated().await?)
    }

    pub async fn get_book(&self, id: BookId) -> Result<BookDetail, CatalogError> {
        self.repo
            .find_detail(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    pub async fn add_book(
        &self,
        requester: &Requester,
        form: BookForm,
    ) -> Result<BookId, CatalogError> {
        self.authorize(requester).await?;
        let input = form.validate()?;

        let id = self.repo.insert(&input).await?;
        tracing::info!(
            book_id = id,
            genres = input.genres.len(),
            "book added"
        );
        Ok(id)
    }

    /// Replace a book's fields and genre set. An unknown id is a no-op.
    pub async fn update_book(
        &self,
        requester: &Requester,
        id: BookId,
        form: BookForm,
    ) -> Result<(), CatalogError> {
        self.authorize(requester).await?;
        let input = form.validate()?;

        let updated = self.repo.update(id, &input).await?;
        if updated == 0 {
            tracing::info!(book_id = id, "update matched no book");
        } else {
            tracing::info!(book_id = id, genres = input.genres.len(), "book updated");
        }
        Ok(())
    }

    /// Delete a book and its genre links. An unknown id is a no-op.
    pub async fn delete_book(&self, requester: &Requester, id: BookId) -> Result<(), CatalogError> {
        self.authorize(requester).await?;

        let deleted = self.repo.delete(id).await?;
        tracing::info!(book_id = id, deleted, "book delete processed");
        Ok(())
    }

    /// Admin check on its own, for callers that must refuse a requester
    /// before reading anything else from the request.
    pub async fn authorize(&self, requester: &Requester) -> Result<(), CatalogError> {
        if self.gate.allows(requester).await {
            Ok(())
        } else {
            Err(CatalogError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::modules::catalog::test_support::{add_review, catalog_pool, ADMIN_TOKEN};
    use bookshelf_authz::StaticTokenGate;

    fn service(pool: &SqlitePool) -> CatalogService {
        CatalogService::new(pool.clone(), Arc::new(StaticTokenGate::new([ADMIN_TOKEN])))
    }

    fn admin() -> Requester {
        Requester::with_token(ADMIN_TOKEN)
    }

    async fn genre_rows(pool: &SqlitePool, id: BookId) -> Vec<String> {
        sqlx::query_scalar("SELECT genre FROM book_genre WHERE book = ?")
            .bind(id)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    async fn book_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_then_get_round_trips_genres() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("T", "A", ["sci-fi", "drama"]))
            .await
            .unwrap();

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "T");
        assert_eq!(detail.book.author, "A");
        let genres: HashSet<_> = detail.genres.iter().map(String::as_str).collect();
        assert_eq!(genres, HashSet::from(["sci-fi", "drama"]));
    }

    #[tokio::test]
    async fn unreviewed_book_is_fetchable_but_not_listed() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("Quiet", "Nobody", ["essay"]))
            .await
            .unwrap();

        assert!(catalog.list_books().await.unwrap().is_empty());

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.average_rating, None);
        assert_eq!(detail.genres, vec!["essay"]);
    }

    #[tokio::test]
    async fn list_orders_by_average_rating() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let low = catalog
            .add_book(&admin(), BookForm::new("Low", "A", Vec::<String>::new()))
            .await
            .unwrap();
        let high = catalog
            .add_book(&admin(), BookForm::new("High", "B", Vec::<String>::new()))
            .await
            .unwrap();
        let mid = catalog
            .add_book(&admin(), BookForm::new("Mid", "C", Vec::<String>::new()))
            .await
            .unwrap();
        catalog
            .add_book(&admin(), BookForm::new("Unrated", "D", Vec::<String>::new()))
            .await
            .unwrap();

        add_review(&pool, low, 1.0).await;
        add_review(&pool, low, 2.0).await;
        add_review(&pool, high, 5.0).await;
        add_review(&pool, high, 4.0).await;
        add_review(&pool, mid, 3.0).await;

        let books = catalog.list_books().await.unwrap();
        let ids: Vec<BookId> = books.iter().map(|b| b.book_id).collect();
        assert_eq!(ids, vec![high, mid, low]);
        assert_eq!(books[0].average_rating, Some(4.5));
        assert_eq!(books[2].average_rating, Some(1.5));
        assert!(books
            .windows(2)
            .all(|pair| pair[0].average_rating >= pair[1].average_rating));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        match catalog.get_book(999).await {
            Err(CatalogError::NotFound(999)) => {}
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_title_reports_title_first() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let err = catalog
            .add_book(&admin(), BookForm::new("", "Author", ["x"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Title is required");
        assert_eq!(book_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden_before_validation() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let err = catalog
            .add_book(&Requester::anonymous(), BookForm::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Forbidden));

        let id = catalog
            .add_book(&admin(), BookForm::new("Kept", "A", ["g"]))
            .await
            .unwrap();

        let intruder = Requester::with_token("guess");
        assert!(matches!(
            catalog
                .update_book(&intruder, id, BookForm::new("X", "Y", ["z"]))
                .await,
            Err(CatalogError::Forbidden)
        ));
        assert!(matches!(
            catalog.delete_book(&intruder, id).await,
            Err(CatalogError::Forbidden)
        ));

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "Kept");
        assert_eq!(detail.genres, vec!["g"]);
    }

    #[tokio::test]
    async fn update_replaces_genre_set() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("T", "A", ["old", "shared"]))
            .await
            .unwrap();
        catalog
            .update_book(&admin(), id, BookForm::new("T2", "A2", ["x"]))
            .await
            .unwrap();

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "T2");
        assert_eq!(detail.book.author, "A2");
        assert_eq!(detail.genres, vec!["x"]);
    }

    #[tokio::test]
    async fn update_validation_leaves_book_untouched() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("T", "A", ["keep"]))
            .await
            .unwrap();
        let err = catalog
            .update_book(&admin(), id, BookForm::new("T2", "", ["drop"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Author is required");

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "T");
        assert_eq!(detail.genres, vec!["keep"]);
    }

    #[tokio::test]
    async fn update_unknown_id_is_silent_noop() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        catalog
            .update_book(&admin(), 404, BookForm::new("Ghost", "Nobody", ["void"]))
            .await
            .unwrap();

        assert_eq!(book_count(&pool).await, 0);
        assert!(genre_rows(&pool, 404).await.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_book_and_genres() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("Gone", "Soon", ["a", "b"]))
            .await
            .unwrap();
        add_review(&pool, id, 4.0).await;

        catalog.delete_book(&admin(), id).await.unwrap();

        assert!(catalog.list_books().await.unwrap().is_empty());
        assert!(matches!(
            catalog.get_book(id).await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(genre_rows(&pool, id).await.is_empty());

        // Deleting again still succeeds
        catalog.delete_book(&admin(), id).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_genres_are_stored_per_occurrence() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("T", "A", ["drama", "drama", "sci-fi"]))
            .await
            .unwrap();
        assert_eq!(genre_rows(&pool, id).await.len(), 3);

        catalog
            .update_book(&admin(), id, BookForm::new("T", "A", ["x", "x"]))
            .await
            .unwrap();
        assert_eq!(genre_rows(&pool, id).await, vec!["x", "x"]);
    }

    #[tokio::test]
    async fn identical_title_and_author_get_distinct_ids() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let first = catalog
            .add_book(&admin(), BookForm::new("Twin", "Same", ["one"]))
            .await
            .unwrap();
        let second = catalog
            .add_book(&admin(), BookForm::new("Twin", "Same", ["two"]))
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(catalog.get_book(first).await.unwrap().genres, vec!["one"]);
        assert_eq!(catalog.get_book(second).await.unwrap().genres, vec!["two"]);
    }

    #[tokio::test]
    async fn store_failure_mid_write_commits_nothing() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        sqlx::query("DROP TABLE book_genre")
            .execute(&pool)
            .await
            .unwrap();

        let err = catalog
            .add_book(&admin(), BookForm::new("Half", "Written", ["g"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));
        assert_eq!(book_count(&pool).await, 0);
    }

    async fn fail_genre_writes(pool: &SqlitePool, event: &str) {
        sqlx::raw_sql(&format!(
            "CREATE TRIGGER genre_store_offline BEFORE {event} ON book_genre
             BEGIN SELECT RAISE(ABORT, 'genre store offline'); END;"
        ))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn failed_genre_insert_rolls_back_whole_update() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("Original", "Author", ["kept", "also"]))
            .await
            .unwrap();
        fail_genre_writes(&pool, "INSERT").await;

        let err = catalog
            .update_book(&admin(), id, BookForm::new("Changed", "Other", ["new"]))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));

        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "Original");
        assert_eq!(detail.book.author, "Author");
        assert_eq!(detail.genres, vec!["kept", "also"]);
    }

    #[tokio::test]
    async fn failed_genre_delete_keeps_book() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);

        let id = catalog
            .add_book(&admin(), BookForm::new("Stays", "Put", ["g"]))
            .await
            .unwrap();
        fail_genre_writes(&pool, "DELETE").await;

        let err = catalog.delete_book(&admin(), id).await.unwrap_err();
        assert!(matches!(err, CatalogError::Store(_)));

        assert_eq!(book_count(&pool).await, 1);
        let detail = catalog.get_book(id).await.unwrap();
        assert_eq!(detail.book.title, "Stays");
        assert_eq!(detail.genres, vec!["g"]);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_store_failure() {
        let pool = catalog_pool().await;
        let catalog = service(&pool);
        pool.close().await;

        assert!(matches!(
            catalog.list_books().await,
            Err(CatalogError::Store(_))
        ));
    }
}
