mod schema;

pub use schema::Database;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User account. Readers borrow books; writers publish them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user ID.
    pub id: String,
    /// Email address used for login.
    pub email: String,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
    /// Argon2 password hash.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// User role: "reader" or "writer".
    pub role: String,
    /// Preferred font size in points (readers, default 12).
    pub font_size: i64,
    /// Book currently open for reading, if any.
    pub current_book_id: Option<String>,
    /// Account creation timestamp.
    pub created_at: i64,
    /// Last login timestamp.
    pub last_login: Option<i64>,
}

impl User {
    /// Full display name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Authentication session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Session token.
    pub token: String,
    /// User ID.
    pub user_id: String,
    /// Expiration timestamp.
    pub expires_at: i64,
}

/// A published book. Content is immutable after publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    /// Unique book ID.
    pub id: String,
    /// ID of the writer who published it.
    pub writer_id: String,
    /// Book title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Raw text content; pages are computed from it on the fly.
    pub content: String,
    /// Publication timestamp.
    pub created_at: i64,
}

/// The borrowing relationship between one reader and one book.
///
/// Carries the reading cursor; page content itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderBook {
    /// Reader ID.
    pub reader_id: String,
    /// Book ID.
    pub book_id: String,
    /// Current page number, always >= 1.
    pub current_page: i64,
    /// When the book was added to the shelf.
    pub added_at: i64,
}

/// Timestamp helper.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Convert timestamp to DateTime.
pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_else(Utc::now)
}
