//! readshelf-rs: a personal library server with page-by-page reading.
//!
//! This crate provides an HTTP API where "writers" publish plain-text
//! books and "readers" borrow them and read them page by page. Page
//! boundaries are computed on the fly from the raw content and the
//! reader's font-size preference; only the reading cursor is persisted.
//!
//! # Features
//!
//! - User accounts (reader and writer roles) with session tokens
//! - Writers publish books; readers borrow and return them
//! - Font-size-aware pagination aligned to line boundaries
//! - A single "currently open book" per reader
//! - Forward/backward navigation that never loses the cursor
//! - Book search by title, content keyword or writer name

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication and user management.
pub mod auth;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Pagination and reading sessions.
pub mod reading;
/// HTTP server.
pub mod server;

#[cfg(test)]
mod tests;

pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use reading::ReadingService;
pub use server::AppState;
