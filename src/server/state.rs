//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::reading::ReadingService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Database connection.
    pub db: Database,
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Reading-session service.
    pub reading: Arc<ReadingService>,
}

impl AppState {
    /// Create new application state with database.
    pub fn new_with_db(config: Config, db: Database, auth: AuthService) -> Self {
        let reading = ReadingService::new(db.clone());
        Self {
            config: Arc::new(config),
            db,
            auth: Arc::new(auth),
            reading: Arc::new(reading),
        }
    }

    /// Get book count for the index page.
    pub fn book_count(&self) -> usize {
        self.db.list_books().map(|books| books.len()).unwrap_or(0)
    }
}
