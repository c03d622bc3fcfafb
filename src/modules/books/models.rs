use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use url::Url;

use shelf_http::error::AppError;

/// Lifecycle state of a book record. Soft deletion is a one-way transition;
/// a deleted record is invisible to reads and rejects further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Deleted(OffsetDateTime),
}

impl Lifecycle {
    pub fn is_active(&self) -> bool {
        matches!(self, Lifecycle::Active)
    }

    pub fn is_deleted(&self) -> bool {
        !self.is_active()
    }

    pub fn deleted_at(&self) -> Option<OffsetDateTime> {
        match self {
            Lifecycle::Deleted(at) => Some(*at),
            Lifecycle::Active => None,
        }
    }

    pub fn from_deleted_at(deleted_at: Option<OffsetDateTime>) -> Self {
        match deleted_at {
            Some(at) => Lifecycle::Deleted(at),
            None => Lifecycle::Active,
        }
    }

    fn serialize_deleted_at<S: Serializer>(
        lifecycle: &Lifecycle,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match lifecycle {
            Lifecycle::Deleted(at) => at
                .format(&Rfc3339)
                .map_err(serde::ser::Error::custom)?
                .serialize(serializer),
            Lifecycle::Active => serializer.serialize_none(),
        }
    }
}

/// A book as stored and returned by the API.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub cover_url: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publication_year: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(
        rename = "deletedAt",
        skip_serializing_if = "Lifecycle::is_active",
        serialize_with = "Lifecycle::serialize_deleted_at"
    )]
    pub lifecycle: Lifecycle,
}

/// A freshly created book as handed to the store.
#[derive(Debug, Clone)]
pub struct NewBook {
    pub id: String,
    pub cover_url: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publication_year: String,
}

/// Request body for create and update. The update path accepts `coverUrl`
/// and `isbn` but does not write them; both are immutable after creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    pub cover_url: String,
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publication_year: String,
}

impl CreateBookRequest {
    /// Validate all field constraints, collecting one structured error per
    /// failing field.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut details = Vec::new();

        if Url::parse(&self.cover_url).is_err() {
            details.push(json!({
                "field": "coverUrl",
                "error": "must be a well-formed absolute URL"
            }));
        }

        if !is_valid_isbn(&self.isbn) {
            details.push(json!({
                "field": "isbn",
                "error": "must be a valid ISBN-10 or ISBN-13"
            }));
        }

        if self.title.is_empty() {
            details.push(json!({"field": "title", "error": "must not be empty"}));
        }

        if self.author.is_empty() {
            details.push(json!({"field": "author", "error": "must not be empty"}));
        }

        if !is_valid_publication_year(&self.publication_year) {
            details.push(json!({
                "field": "publicationYear",
                "error": "must be a 3-4 digit number"
            }));
        }

        if details.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(details, "book validation failed"))
        }
    }
}

/// Query parameters accepted by the list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBooksQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListBooksQuery {
    /// Page number, 1-based; unset or zero falls back to 1.
    pub fn page(&self) -> u32 {
        match self.page {
            Some(page) if page > 0 => page,
            _ => 1,
        }
    }

    /// Page size; unset or zero falls back to 5.
    pub fn page_size(&self) -> u32 {
        match self.page_size {
            Some(size) if size > 0 => size,
            _ => 5,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListBooksResponse {
    pub books: Vec<Book>,
    #[serde(rename = "totalPage")]
    pub total_page: i64,
}

#[derive(Debug, Serialize)]
pub struct GetBookResponse {
    pub book: Book,
}

/// ISBN-10 or ISBN-13 checksum validation; hyphens and spaces are ignored.
pub fn is_valid_isbn(raw: &str) -> bool {
    let cleaned: Vec<char> = raw.chars().filter(|c| *c != '-' && *c != ' ').collect();

    match cleaned.len() {
        10 => {
            let mut sum = 0u32;
            for (i, c) in cleaned.iter().enumerate() {
                let value = match c.to_digit(10) {
                    Some(d) => d,
                    // 'X' is only valid as the check digit.
                    None if i == 9 && (*c == 'X' || *c == 'x') => 10,
                    None => return false,
                };
                sum += value * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0u32;
            for (i, c) in cleaned.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += d * if i % 2 == 0 { 1 } else { 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

/// Publication year must be a 3-4 digit numeric string.
pub fn is_valid_publication_year(raw: &str) -> bool {
    (3..=4).contains(&raw.len()) && raw.chars().all(|c| c.is_ascii_digit())
}
