//! Reading-session state machine.
//!
//! Tracks the per-(reader, book) cursor and the single current book per
//! reader, and navigates forward/backward with rollback when a computed
//! page would run past the end of the content.

use crate::db::{Book, Database, ReaderBook, User, now_timestamp};
use crate::error::{AppError, Result};
use crate::reading::page::{PageOutcome, PageView, max_page_count, slice_page};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Reading-session service.
///
/// Every operation runs under a per-reader lock so the read-modify-write
/// of the cursor and the current-book pointer swap are atomic for that
/// reader; distinct readers proceed concurrently.
pub struct ReadingService {
    db: Database,
    reader_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ReadingService {
    /// Create a new reading service.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            reader_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the lock guarding all operations for one reader.
    fn reader_lock(&self, reader_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.reader_locks.lock();
        locks
            .entry(reader_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn fetch_reader(&self, reader_id: &str) -> Result<User> {
        self.db
            .get_user_by_id(reader_id)?
            .ok_or_else(|| AppError::NotFound(format!("Reader not found: {}", reader_id)))
    }

    fn fetch_book(&self, book_id: &str) -> Result<Book> {
        self.db
            .get_book(book_id)?
            .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", book_id)))
    }

    fn fetch_association(&self, reader_id: &str, book_id: &str) -> Result<ReaderBook> {
        self.db
            .get_association(reader_id, book_id)?
            .ok_or_else(|| AppError::NotOwned(book_id.to_string()))
    }

    /// Add a book to a reader's shelf, with the cursor at page 1.
    pub fn add_book(&self, reader_id: &str, book_id: &str) -> Result<ReaderBook> {
        let lock = self.reader_lock(reader_id);
        let _guard = lock.lock();

        self.fetch_reader(reader_id)?;
        self.fetch_book(book_id)?;

        if self.db.get_association(reader_id, book_id)?.is_some() {
            return Err(AppError::AlreadyOwned(book_id.to_string()));
        }

        let association = ReaderBook {
            reader_id: reader_id.to_string(),
            book_id: book_id.to_string(),
            current_page: 1,
            added_at: now_timestamp(),
        };
        self.db.create_association(&association)?;

        tracing::debug!(reader = %reader_id, book = %book_id, "Book added to shelf");
        Ok(association)
    }

    /// Remove a book from a reader's shelf.
    ///
    /// If the book was the reader's current book, the current-book
    /// pointer is cleared as well.
    pub fn remove_book(&self, reader_id: &str, book_id: &str) -> Result<ReaderBook> {
        let lock = self.reader_lock(reader_id);
        let _guard = lock.lock();

        let reader = self.fetch_reader(reader_id)?;
        self.fetch_book(book_id)?;

        let association = self.fetch_association(reader_id, book_id)?;
        self.db.delete_association(reader_id, book_id)?;

        if reader.current_book_id.as_deref() == Some(book_id) {
            self.db.set_current_book(reader_id, None)?;
        }

        tracing::debug!(reader = %reader_id, book = %book_id, "Book removed from shelf");
        Ok(association)
    }

    /// Open a book for reading and return the page at the stored cursor.
    ///
    /// The reader must hold the book. If a different book was current it
    /// is detached and this one becomes the reader's current book.
    pub fn open_for_reading(&self, reader_id: &str, book_id: &str) -> Result<PageView> {
        let lock = self.reader_lock(reader_id);
        let _guard = lock.lock();

        let reader = self.fetch_reader(reader_id)?;
        let book = self.fetch_book(book_id)?;
        let association = self.fetch_association(reader_id, book_id)?;

        if reader.current_book_id.as_deref() != Some(book_id) {
            // The book-side current-readers view is the reverse lookup
            // of this pointer, so one update detaches and attaches both
            // sides together.
            self.db.set_current_book(reader_id, Some(book_id))?;
            tracing::debug!(reader = %reader_id, book = %book_id, "Current book switched");
        }

        let outcome = slice_page(&book.content, reader.font_size, association.current_page);
        if outcome.is_past_end() {
            tracing::debug!(
                reader = %reader_id,
                book = %book_id,
                page = association.current_page,
                "Stored cursor points past the end of the content"
            );
        }
        Ok(outcome.into_view())
    }

    /// Turn to the next page of the reader's current book.
    ///
    /// At the end of the book this is a no-op apart from returning the
    /// same content: the cursor is never advanced past the last
    /// reachable page.
    pub fn next_page(&self, reader_id: &str) -> Result<PageView> {
        let lock = self.reader_lock(reader_id);
        let _guard = lock.lock();

        let reader = self.fetch_reader(reader_id)?;
        let book_id = reader.current_book_id.ok_or(AppError::NoCurrentBook)?;
        let book = self.fetch_book(&book_id)?;
        let association = self.fetch_association(reader_id, &book_id)?;

        let current = association.current_page;
        let max_page = max_page_count(&book.content, reader.font_size);
        let tentative = if current >= max_page {
            current
        } else {
            current + 1
        };

        match slice_page(&book.content, reader.font_size, tentative) {
            PageOutcome::Ready(view) => {
                self.db.set_current_page(reader_id, &book_id, tentative)?;
                Ok(view)
            }
            PageOutcome::PastEnd(mut view) => {
                // Roll back: keep the stored cursor and report the page
                // the reader was on before the call.
                view.page = current;
                Ok(view)
            }
        }
    }

    /// Turn to the previous page of the reader's current book.
    ///
    /// The cursor never drops below page 1.
    pub fn previous_page(&self, reader_id: &str) -> Result<PageView> {
        let lock = self.reader_lock(reader_id);
        let _guard = lock.lock();

        let reader = self.fetch_reader(reader_id)?;
        let book_id = reader.current_book_id.ok_or(AppError::NoCurrentBook)?;
        let book = self.fetch_book(&book_id)?;
        let association = self.fetch_association(reader_id, &book_id)?;

        let current = association.current_page;
        let tentative = if current > 1 { current - 1 } else { current };

        match slice_page(&book.content, reader.font_size, tentative) {
            PageOutcome::Ready(view) => {
                self.db.set_current_page(reader_id, &book_id, tentative)?;
                Ok(view)
            }
            PageOutcome::PastEnd(mut view) => {
                // The page before the cursor is itself unreachable (the
                // budget may have shrunk since it was stored); keep the
                // stored cursor and report the position it still holds.
                view.page = tentative + 1;
                Ok(view)
            }
        }
    }
}
