//! SQL access for books, their genre links, and review ratings.
//!
//! Every write runs in a single transaction; a dropped transaction rolls
//! back, so a failure part-way through never leaves a partial genre set.

use sqlx::{SqliteConnection, SqlitePool};

use super::models::{BookDetail, BookId, BookInput, BookSummary};

const LIST_RATED: &str = "SELECT books.bookID, books.title, books.author,
        AVG(reviews.rating) AS average_rating
    FROM books JOIN reviews ON books.bookID = reviews.book
    GROUP BY books.bookID
    ORDER BY average_rating DESC, books.bookID ASC";

const FIND_WITH_RATING: &str = "SELECT books.bookID, books.title, books.author,
        AVG(reviews.rating) AS average_rating
    FROM books LEFT JOIN reviews ON books.bookID = reviews.book
    WHERE books.bookID = ?
    GROUP BY books.bookID";

#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Books with at least one review, best rated first.
    pub async fn list_rated(&self) -> Result<Vec<BookSummary>, sqlx::Error> {
        sqlx::query_as::<_, BookSummary>(LIST_RATED)
            .fetch_all(&self.pool)
            .await
    }

    /// One book with its average rating and genres, whether or not it has
    /// reviews. Both reads share a transaction so the genre list matches the
    /// book row.
    pub async fn find_detail(&self, id: BookId) -> Result<Option<BookDetail>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(book) = sqlx::query_as::<_, BookSummary>(FIND_WITH_RATING)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        let genres = sqlx::query_scalar::<_, String>(
            "SELECT genre FROM book_genre WHERE book = ? ORDER BY rowid",
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(BookDetail { book, genres }))
    }

    /// Insert a book and its genres, returning the id assigned by the insert.
    pub async fn insert(&self, input: &BookInput) -> Result<BookId, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO books (title, author) VALUES (?, ?)")
            .bind(&input.title)
            .bind(&input.author)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        insert_genres(&mut tx, id, &input.genres).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Replace title, author, and the full genre set. Returns the number of
    /// book rows touched, which is zero for an unknown id.
    pub async fn update(&self, id: BookId, input: &BookInput) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE books SET title = ?, author = ? WHERE bookID = ?")
            .bind(&input.title)
            .bind(&input.author)
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM book_genre WHERE book = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        // Genre links must only reference existing books
        if updated > 0 {
            insert_genres(&mut tx, id, &input.genres).await?;
        }
        tx.commit().await?;

        Ok(updated)
    }

    /// Delete a book and its genre links together. Returns the number of
    /// book rows removed.
    pub async fn delete(&self, id: BookId) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM books WHERE bookID = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM book_genre WHERE book = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted)
    }
}

async fn insert_genres(
    conn: &mut SqliteConnection,
    id: BookId,
    genres: &[String],
) -> Result<(), sqlx::Error> {
    for genre in genres {
        sqlx::query("INSERT INTO book_genre (book, genre) VALUES (?, ?)")
            .bind(id)
            .bind(genre)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}
