use crate::db::*;
use crate::error::{AppError, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Arc;

/// Database wrapper for thread-safe access.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Open in-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Internal(format!("Failed to open database: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users table (readers and writers)
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'reader',
                font_size INTEGER NOT NULL DEFAULT 12,
                current_book_id TEXT,
                created_at INTEGER NOT NULL,
                last_login INTEGER,
                FOREIGN KEY (current_book_id) REFERENCES books(id) ON DELETE SET NULL
            );

            -- Sessions table
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Books table
            CREATE TABLE IF NOT EXISTS books (
                id TEXT PRIMARY KEY,
                writer_id TEXT NOT NULL,
                title TEXT NOT NULL,
                description TEXT,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                FOREIGN KEY (writer_id) REFERENCES users(id) ON DELETE CASCADE
            );

            -- Reader/book associations (the shelf, with reading cursor)
            CREATE TABLE IF NOT EXISTS reader_books (
                reader_id TEXT NOT NULL,
                book_id TEXT NOT NULL,
                current_page INTEGER NOT NULL DEFAULT 1 CHECK (current_page >= 1),
                added_at INTEGER NOT NULL,
                PRIMARY KEY (reader_id, book_id),
                FOREIGN KEY (reader_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (book_id) REFERENCES books(id) ON DELETE CASCADE
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_users_current_book ON users(current_book_id);
            CREATE INDEX IF NOT EXISTS idx_books_writer ON books(writer_id);
            CREATE INDEX IF NOT EXISTS idx_reader_books_book ON reader_books(book_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);
            "#,
        )
        .map_err(|e| AppError::Internal(format!("Failed to initialize schema: {}", e)))?;

        Ok(())
    }

    // ========== USER OPERATIONS ==========

    /// Create a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO users (id, email, first_name, last_name, password_hash, role,
                                font_size, current_book_id, created_at, last_login)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                user.id,
                user.email,
                user.first_name,
                user.last_name,
                user.password_hash,
                user.role,
                user.font_size,
                user.current_book_id,
                user.created_at,
                user.last_login,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::Invalid(format!("Email '{}' is already registered", user.email))
            } else {
                AppError::Internal(format!("Failed to create user: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get user by email.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, first_name, last_name, password_hash, role,
                    font_size, current_book_id, created_at, last_login
             FROM users WHERE email = ?1",
            params![email],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// Get user by ID.
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, email, first_name, last_name, password_hash, role,
                    font_size, current_book_id, created_at, last_login
             FROM users WHERE id = ?1",
            params![id],
            Self::row_to_user,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get user: {}", e)))
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, email, first_name, last_name, password_hash, role,
                        font_size, current_book_id, created_at, last_login
                 FROM users ORDER BY email",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to list users: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect users: {}", e)))?;

        Ok(users)
    }

    /// Update user last login.
    pub fn update_user_last_login(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![now_timestamp(), user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to update last login: {}", e)))?;
        Ok(())
    }

    /// Update a reader's font-size preference.
    pub fn update_font_size(&self, user_id: &str, font_size: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "UPDATE users SET font_size = ?1 WHERE id = ?2",
                params![font_size, user_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to update font size: {}", e)))?;
        Ok(rows > 0)
    }

    /// Set or clear a reader's current book pointer.
    pub fn set_current_book(&self, user_id: &str, book_id: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE users SET current_book_id = ?1 WHERE id = ?2",
            params![book_id, user_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to set current book: {}", e)))?;
        Ok(())
    }

    /// Get the readers currently reading a book (their current book points at it).
    pub fn get_current_readers(&self, book_id: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, email, first_name, last_name, password_hash, role,
                        font_size, current_book_id, created_at, last_login
                 FROM users WHERE current_book_id = ?1 ORDER BY email",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map(params![book_id], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to get current readers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect readers: {}", e)))?;

        Ok(users)
    }

    /// Delete user by email.
    pub fn delete_user(&self, email: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute("DELETE FROM users WHERE email = ?1", params![email])
            .map_err(|e| AppError::Internal(format!("Failed to delete user: {}", e)))?;
        Ok(rows > 0)
    }

    /// Helper to convert a row to User.
    fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            password_hash: row.get(4)?,
            role: row.get(5)?,
            font_size: row.get(6)?,
            current_book_id: row.get(7)?,
            created_at: row.get(8)?,
            last_login: row.get(9)?,
        })
    }

    // ========== SESSION OPERATIONS ==========

    /// Create session.
    pub fn create_session(&self, session: &Session) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO sessions (token, user_id, expires_at)
             VALUES (?1, ?2, ?3)",
            params![session.token, session.user_id, session.expires_at],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create session: {}", e)))?;
        Ok(())
    }

    /// Get session by token.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT token, user_id, expires_at FROM sessions WHERE token = ?1",
            params![token],
            |row| {
                Ok(Session {
                    token: row.get(0)?,
                    user_id: row.get(1)?,
                    expires_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get session: {}", e)))
    }

    /// Delete session.
    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])
            .map_err(|e| AppError::Internal(format!("Failed to delete session: {}", e)))?;
        Ok(())
    }

    /// Cleanup expired sessions.
    pub fn cleanup_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM sessions WHERE expires_at < ?1",
                params![now_timestamp()],
            )
            .map_err(|e| AppError::Internal(format!("Failed to cleanup sessions: {}", e)))?;
        Ok(rows)
    }

    // ========== BOOK OPERATIONS ==========

    /// Publish a new book.
    pub fn create_book(&self, book: &Book) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO books (id, writer_id, title, description, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                book.id,
                book.writer_id,
                book.title,
                book.description,
                book.content,
                book.created_at,
            ],
        )
        .map_err(|e| AppError::Internal(format!("Failed to create book: {}", e)))?;
        Ok(())
    }

    /// Get book by ID.
    pub fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT id, writer_id, title, description, content, created_at
             FROM books WHERE id = ?1",
            params![id],
            Self::row_to_book,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get book: {}", e)))
    }

    /// List all books.
    pub fn list_books(&self) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, writer_id, title, description, content, created_at
                 FROM books ORDER BY title",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map([], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to list books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// List books published by a writer.
    pub fn get_writer_books(&self, writer_id: &str) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT id, writer_id, title, description, content, created_at
                 FROM books WHERE writer_id = ?1 ORDER BY title",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![writer_id], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to get writer books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Search books by title, content keyword and/or writer name.
    ///
    /// Empty criteria match everything.
    pub fn search_books(
        &self,
        title: Option<&str>,
        keyword: Option<&str>,
        writer_name: Option<&str>,
    ) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT b.id, b.writer_id, b.title, b.description, b.content, b.created_at
                 FROM books b
                 JOIN users w ON w.id = b.writer_id
                 WHERE (?1 IS NULL OR b.title LIKE '%' || ?1 || '%')
                   AND (?2 IS NULL OR b.content LIKE '%' || ?2 || '%')
                   AND (?3 IS NULL OR (w.first_name || ' ' || w.last_name) LIKE '%' || ?3 || '%')
                 ORDER BY b.title",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![title, keyword, writer_name], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to search books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Helper to convert a row to Book.
    fn row_to_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<Book> {
        Ok(Book {
            id: row.get(0)?,
            writer_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            content: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    // ========== READER/BOOK ASSOCIATIONS ==========

    /// Create a reader/book association with the cursor at page 1.
    pub fn create_association(&self, association: &ReaderBook) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO reader_books (reader_id, book_id, current_page, added_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                association.reader_id,
                association.book_id,
                association.current_page,
                association.added_at,
            ],
        )
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint") {
                AppError::AlreadyOwned(association.book_id.clone())
            } else {
                AppError::Internal(format!("Failed to create association: {}", e))
            }
        })?;
        Ok(())
    }

    /// Get the association between a reader and a book.
    pub fn get_association(&self, reader_id: &str, book_id: &str) -> Result<Option<ReaderBook>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT reader_id, book_id, current_page, added_at
             FROM reader_books WHERE reader_id = ?1 AND book_id = ?2",
            params![reader_id, book_id],
            Self::row_to_association,
        )
        .optional()
        .map_err(|e| AppError::Internal(format!("Failed to get association: {}", e)))
    }

    /// Persist the reading cursor for an association.
    pub fn set_current_page(&self, reader_id: &str, book_id: &str, page: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "UPDATE reader_books SET current_page = ?1 WHERE reader_id = ?2 AND book_id = ?3",
            params![page, reader_id, book_id],
        )
        .map_err(|e| AppError::Internal(format!("Failed to set current page: {}", e)))?;
        Ok(())
    }

    /// Delete an association.
    pub fn delete_association(&self, reader_id: &str, book_id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn
            .execute(
                "DELETE FROM reader_books WHERE reader_id = ?1 AND book_id = ?2",
                params![reader_id, book_id],
            )
            .map_err(|e| AppError::Internal(format!("Failed to delete association: {}", e)))?;
        Ok(rows > 0)
    }

    /// Get the books on a reader's shelf.
    pub fn get_reader_books(&self, reader_id: &str) -> Result<Vec<Book>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT b.id, b.writer_id, b.title, b.description, b.content, b.created_at
                 FROM books b
                 JOIN reader_books rb ON rb.book_id = b.id
                 WHERE rb.reader_id = ?1
                 ORDER BY rb.added_at",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let books = stmt
            .query_map(params![reader_id], Self::row_to_book)
            .map_err(|e| AppError::Internal(format!("Failed to get reader books: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect books: {}", e)))?;

        Ok(books)
    }

    /// Get the readers holding a book on their shelf.
    pub fn get_book_readers(&self, book_id: &str) -> Result<Vec<User>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT u.id, u.email, u.first_name, u.last_name, u.password_hash, u.role,
                        u.font_size, u.current_book_id, u.created_at, u.last_login
                 FROM users u
                 JOIN reader_books rb ON rb.reader_id = u.id
                 WHERE rb.book_id = ?1
                 ORDER BY u.email",
            )
            .map_err(|e| AppError::Internal(format!("Failed to prepare query: {}", e)))?;

        let users = stmt
            .query_map(params![book_id], Self::row_to_user)
            .map_err(|e| AppError::Internal(format!("Failed to get book readers: {}", e)))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Failed to collect readers: {}", e)))?;

        Ok(users)
    }

    /// Helper to convert a row to ReaderBook.
    fn row_to_association(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReaderBook> {
        Ok(ReaderBook {
            reader_id: row.get(0)?,
            book_id: row.get(1)?,
            current_page: row.get(2)?,
            added_at: row.get(3)?,
        })
    }
}
