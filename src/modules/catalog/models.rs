use serde::{Deserialize, Serialize};

use super::error::CatalogError;

/// Store-assigned book identifier.
pub type BookId = i64;

/// A book together with the mean rating of its reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookSummary {
    #[serde(rename = "bookID")]
    #[sqlx(rename = "bookID")]
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    /// `None` when the book has no reviews yet
    pub average_rating: Option<f64>,
}

/// Single-book view: the summary plus its genre list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDetail {
    #[serde(flatten)]
    pub book: BookSummary,
    pub genres: Vec<String>,
}

/// Form body accepted by the create and update endpoints.
///
/// Read from the raw key/value pairs so that no body shape is rejected by the
/// extractor: missing fields stay `None` for validation to report, the first
/// `title`/`author` wins, and `genres` and `genres[]` feed one list in order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct BookForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub genres: Vec<String>,
}

impl From<Vec<(String, String)>> for BookForm {
    fn from(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "title" if form.title.is_none() => form.title = Some(value),
                "author" if form.author.is_none() => form.author = Some(value),
                "genres" | "genres[]" => form.genres.push(value),
                _ => {}
            }
        }
        form
    }
}

impl BookForm {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        genres: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            genres: genres.into_iter().map(Into::into).collect(),
        }
    }

    /// Check required fields. Title is checked first and only the first
    /// failure is reported.
    pub fn validate(self) -> Result<BookInput, CatalogError> {
        let title = match self.title {
            Some(title) if !title.is_empty() => title,
            _ => return Err(CatalogError::Validation("Title is required".to_string())),
        };
        let author = match self.author {
            Some(author) if !author.is_empty() => author,
            _ => return Err(CatalogError::Validation("Author is required".to_string())),
        };

        Ok(BookInput {
            title,
            author,
            genres: self.genres,
        })
    }
}

/// Validated book fields, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookInput {
    pub title: String,
    pub author: String,
    /// Written as-is, duplicates included
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookCreated {
    pub message: &'static str,
    #[serde(rename = "bookID")]
    pub book_id: BookId,
}
