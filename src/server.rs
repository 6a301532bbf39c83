//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth_register))
        .route("/login", post(handlers::auth_login))
        .route("/logout", post(handlers::auth_logout))
        .route("/me", get(handlers::auth_me))
        .route("/me/font-size", put(handlers::auth_set_font_size));

    let book_routes = Router::new()
        .route("/", get(handlers::books_list).post(handlers::book_publish))
        .route("/search", get(handlers::books_search))
        .route("/mine", get(handlers::books_mine))
        .route("/{id}", get(handlers::book_metadata))
        .route("/{id}/readers", get(handlers::book_readers))
        .route(
            "/{id}/current-readers",
            get(handlers::book_current_readers),
        )
        .route("/{id}/writer", get(handlers::book_writer));

    let reading_routes = Router::new()
        .route("/shelf", get(handlers::shelf_list))
        .route(
            "/shelf/{book_id}",
            post(handlers::shelf_add).delete(handlers::shelf_remove),
        )
        .route("/open/{book_id}", post(handlers::reading_open))
        .route("/next", post(handlers::reading_next))
        .route("/previous", post(handlers::reading_previous));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api/auth", auth_routes)
        .nest("/api/books", book_routes)
        .nest("/api/reading", reading_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
