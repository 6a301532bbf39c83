//! HTTP request handlers.

use crate::db::{self, Book, ReaderBook, User};
use crate::error::{AppError, Result};
use crate::reading::PageView;
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Html,
};
use serde::{Deserialize, Serialize};

// ============================================================================
// WEB PAGES
// ============================================================================

/// Index page (simple HTML).
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let book_count = state.book_count();
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>
        body {{ font-family: system-ui, sans-serif; max-width: 600px; margin: 2rem auto; padding: 0 1rem; }}
        h1 {{ color: #333; }}
        a {{ color: #0066cc; }}
        .stats {{ background: #f5f5f5; padding: 1rem; border-radius: 8px; margin: 1rem 0; }}
        code {{ background: #e8e8e8; padding: 0.2rem 0.4rem; border-radius: 4px; }}
    </style>
</head>
<body>
    <h1>📚 {title}</h1>
    <div class="stats">
        <p><strong>{book_count}</strong> books in library</p>
    </div>
    <h2>API</h2>
    <ul>
        <li><code>POST /api/auth/register</code> — create an account</li>
        <li><code>GET /api/books</code> — browse books</li>
        <li><code>POST /api/reading/open/:id</code> — open a book</li>
    </ul>
</body>
</html>"#,
        title = state.config.server.title,
        book_count = book_count,
    );

    Html(html)
}

// ============================================================================
// AUTH API
// ============================================================================

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: String,
    first_name: String,
    last_name: String,
    password: String,
    /// Register as a writer instead of a reader.
    #[serde(default)]
    writer: bool,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user_id: String,
    email: String,
    role: String,
}

/// Auth register.
pub async fn auth_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<LoginResponse>> {
    let role = if req.writer { "writer" } else { "reader" };
    let _user = state.auth.register(
        &req.email,
        &req.first_name,
        &req.last_name,
        &req.password,
        role,
    )?;
    let (user, token) = state.auth.login(&req.email, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Auth login.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, token) = state.auth.login(&req.email, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        email: user.email,
        role: user.role,
    }))
}

/// Auth logout.
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = extract_token(&headers) {
        state.auth.logout(&token)?;
    }
    Ok(StatusCode::OK)
}

/// Get current user info.
pub async fn auth_me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<User>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(user))
}

/// Font-size update request.
#[derive(Debug, Deserialize)]
pub struct FontSizeRequest {
    font_size: i64,
}

/// Update the authenticated reader's font-size preference.
pub async fn auth_set_font_size(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<FontSizeRequest>,
) -> Result<Json<User>> {
    let user = get_authenticated_user(&state, &headers)?;

    if req.font_size < 1 {
        return Err(AppError::Invalid(
            "Font size must be a positive integer".to_string(),
        ));
    }

    state.db.update_font_size(&user.id, req.font_size)?;
    let updated = state
        .db
        .get_user_by_id(&user.id)?
        .ok_or_else(|| AppError::NotFound(format!("Reader not found: {}", user.id)))?;

    Ok(Json(updated))
}

// ============================================================================
// BOOK API
// ============================================================================

/// Book metadata without the content blob.
#[derive(Debug, Serialize)]
pub struct BookSummary {
    /// Book ID.
    pub id: String,
    /// Writer ID.
    pub writer_id: String,
    /// Book title.
    pub title: String,
    /// Short description.
    pub description: Option<String>,
    /// Content length in characters.
    pub length: usize,
    /// Publication timestamp.
    pub created_at: i64,
}

impl From<&Book> for BookSummary {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.clone(),
            writer_id: book.writer_id.clone(),
            title: book.title.clone(),
            description: book.description.clone(),
            length: book.content.chars().count(),
            created_at: book.created_at,
        }
    }
}

/// Publish request.
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    title: String,
    description: Option<String>,
    content: String,
}

/// List all books.
pub async fn books_list(State(state): State<AppState>) -> Result<Json<Vec<BookSummary>>> {
    let books = state.db.list_books()?;
    Ok(Json(books.iter().map(BookSummary::from).collect()))
}

/// Publish a new book (writers only).
pub async fn book_publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PublishRequest>,
) -> Result<Json<BookSummary>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_writer(&user)?;

    if req.title.trim().is_empty() {
        return Err(AppError::Invalid("Title must not be empty".to_string()));
    }
    if req.content.is_empty() {
        return Err(AppError::Invalid("Content must not be empty".to_string()));
    }

    let book = Book {
        id: uuid::Uuid::new_v4().to_string(),
        writer_id: user.id,
        title: req.title,
        description: req.description,
        content: req.content,
        created_at: db::now_timestamp(),
    };
    state.db.create_book(&book)?;

    tracing::info!(book = %book.id, title = %book.title, "Book published");
    Ok(Json(BookSummary::from(&book)))
}

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    title: Option<String>,
    keyword: Option<String>,
    writer: Option<String>,
}

/// Search books.
pub async fn books_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BookSummary>>> {
    let books = state.db.search_books(
        params.title.as_deref(),
        params.keyword.as_deref(),
        params.writer.as_deref(),
    )?;
    Ok(Json(books.iter().map(BookSummary::from).collect()))
}

/// Books of the authenticated user: published books for a writer, the
/// shelf for a reader.
pub async fn books_mine(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookSummary>>> {
    let user = get_authenticated_user(&state, &headers)?;

    let books = if user.role == "writer" {
        state.db.get_writer_books(&user.id)?
    } else {
        state.db.get_reader_books(&user.id)?
    };

    Ok(Json(books.iter().map(BookSummary::from).collect()))
}

/// Book metadata.
pub async fn book_metadata(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookSummary>> {
    let book = state
        .db
        .get_book(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    Ok(Json(BookSummary::from(&book)))
}

/// Readers holding a book on their shelf.
pub async fn book_readers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>> {
    ensure_book_exists(&state, &id)?;
    Ok(Json(state.db.get_book_readers(&id)?))
}

/// Readers currently reading a book.
pub async fn book_current_readers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<User>>> {
    ensure_book_exists(&state, &id)?;
    Ok(Json(state.db.get_current_readers(&id)?))
}

/// The writer who published a book.
pub async fn book_writer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>> {
    let book = state
        .db
        .get_book(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;

    let writer = state
        .db
        .get_user_by_id(&book.writer_id)?
        .ok_or_else(|| AppError::NotFound(format!("Writer not found: {}", book.writer_id)))?;

    Ok(Json(writer))
}

// ============================================================================
// READING API
// ============================================================================

/// The authenticated reader's shelf.
pub async fn shelf_list(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BookSummary>>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let books = state.db.get_reader_books(&user.id)?;
    Ok(Json(books.iter().map(BookSummary::from).collect()))
}

/// Add a book to the shelf.
pub async fn shelf_add(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<ReaderBook>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let association = state.reading.add_book(&user.id, &book_id)?;
    Ok(Json(association))
}

/// Remove a book from the shelf.
pub async fn shelf_remove(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<ReaderBook>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let association = state.reading.remove_book(&user.id, &book_id)?;
    Ok(Json(association))
}

/// Open a book and return the page at the stored cursor.
pub async fn reading_open(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<PageView>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let page = state.reading.open_for_reading(&user.id, &book_id)?;
    Ok(Json(page))
}

/// Turn to the next page of the current book.
pub async fn reading_next(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PageView>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let page = state.reading.next_page(&user.id)?;
    Ok(Json(page))
}

/// Turn to the previous page of the current book.
pub async fn reading_previous(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PageView>> {
    let user = get_authenticated_user(&state, &headers)?;
    require_reader(&user)?;

    let page = state.reading.previous_page(&user.id)?;
    Ok(Json(page))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get authenticated user from token.
fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<User> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    state
        .auth
        .validate_token(&token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}

/// Shelf and navigation operations are reader-only.
fn require_reader(user: &User) -> Result<()> {
    if user.role == "reader" {
        Ok(())
    } else {
        Err(AppError::Invalid(
            "Only readers can borrow and read books".to_string(),
        ))
    }
}

/// Publishing is writer-only.
fn require_writer(user: &User) -> Result<()> {
    if user.role == "writer" {
        Ok(())
    } else {
        Err(AppError::Invalid(
            "Only writers can publish books".to_string(),
        ))
    }
}

/// Return NotFound early when a book ID doesn't exist.
fn ensure_book_exists(state: &AppState, id: &str) -> Result<()> {
    state
        .db
        .get_book(id)?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))
}
