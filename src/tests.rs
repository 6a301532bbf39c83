//! Integration tests for database, auth, config and reading sessions.

use crate::auth::{AuthService, DEFAULT_FONT_SIZE};
use crate::config::Config;
use crate::db::{Book, Database, ReaderBook, Session, User, now_timestamp};
use crate::error::AppError;
use crate::reading::ReadingService;

fn test_db() -> Database {
    Database::open_memory().unwrap()
}

fn make_user(db: &Database, email: &str, role: &str) -> User {
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: email.to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role: role.to_string(),
        font_size: DEFAULT_FONT_SIZE,
        current_book_id: None,
        created_at: now_timestamp(),
        last_login: None,
    };
    db.create_user(&user).unwrap();
    user
}

fn make_book(db: &Database, writer_id: &str, title: &str, content: &str) -> Book {
    let book = Book {
        id: uuid::Uuid::new_v4().to_string(),
        writer_id: writer_id.to_string(),
        title: title.to_string(),
        description: None,
        content: content.to_string(),
        created_at: now_timestamp(),
    };
    db.create_book(&book).unwrap();
    book
}

/// A reader with one book on the shelf, ready for navigation tests.
fn reading_fixture(content: &str) -> (Database, ReadingService, User, Book) {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let reader = make_user(&db, "reader@example.com", "reader");
    let book = make_book(&db, &writer.id, "Test Book", content);

    let service = ReadingService::new(db.clone());
    service.add_book(&reader.id, &book.id).unwrap();

    (db, service, reader, book)
}

// ========== DATABASE ==========

#[test]
fn test_user_crud() {
    let db = test_db();
    let user = make_user(&db, "alice@example.com", "reader");

    let fetched = db.get_user_by_email("alice@example.com").unwrap().unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.font_size, 12);
    assert!(fetched.current_book_id.is_none());

    let by_id = db.get_user_by_id(&user.id).unwrap().unwrap();
    assert_eq!(by_id.email, "alice@example.com");

    assert!(db.delete_user("alice@example.com").unwrap());
    assert!(db.get_user_by_email("alice@example.com").unwrap().is_none());
    assert!(!db.delete_user("alice@example.com").unwrap());
}

#[test]
fn test_duplicate_email_rejected() {
    let db = test_db();
    make_user(&db, "alice@example.com", "reader");

    let duplicate = User {
        id: uuid::Uuid::new_v4().to_string(),
        email: "alice@example.com".to_string(),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: "hash".to_string(),
        role: "reader".to_string(),
        font_size: DEFAULT_FONT_SIZE,
        current_book_id: None,
        created_at: now_timestamp(),
        last_login: None,
    };

    assert!(matches!(
        db.create_user(&duplicate),
        Err(AppError::Invalid(_))
    ));
}

#[test]
fn test_update_font_size() {
    let db = test_db();
    let user = make_user(&db, "alice@example.com", "reader");

    assert!(db.update_font_size(&user.id, 24).unwrap());
    let updated = db.get_user_by_id(&user.id).unwrap().unwrap();
    assert_eq!(updated.font_size, 24);

    assert!(!db.update_font_size("no-such-user", 24).unwrap());
}

#[test]
fn test_session_lifecycle() {
    let db = test_db();
    let user = make_user(&db, "alice@example.com", "reader");

    let session = Session {
        token: "token-1".to_string(),
        user_id: user.id.clone(),
        expires_at: now_timestamp() + 3600,
    };
    db.create_session(&session).unwrap();

    let fetched = db.get_session("token-1").unwrap().unwrap();
    assert_eq!(fetched.user_id, user.id);

    let expired = Session {
        token: "token-2".to_string(),
        user_id: user.id.clone(),
        expires_at: now_timestamp() - 10,
    };
    db.create_session(&expired).unwrap();

    assert_eq!(db.cleanup_expired_sessions().unwrap(), 1);
    assert!(db.get_session("token-2").unwrap().is_none());
    assert!(db.get_session("token-1").unwrap().is_some());

    db.delete_session("token-1").unwrap();
    assert!(db.get_session("token-1").unwrap().is_none());
}

#[test]
fn test_book_queries() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let other = make_user(&db, "other@example.com", "writer");

    make_book(&db, &writer.id, "Rust for Readers", "systems programming");
    make_book(&db, &writer.id, "Cooking at Home", "recipes and techniques");
    make_book(&db, &other.id, "Gardening", "plants need water");

    assert_eq!(db.list_books().unwrap().len(), 3);
    assert_eq!(db.get_writer_books(&writer.id).unwrap().len(), 2);

    let by_title = db.search_books(Some("rust"), None, None).unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].title, "Rust for Readers");

    let by_keyword = db.search_books(None, Some("water"), None).unwrap();
    assert_eq!(by_keyword.len(), 1);
    assert_eq!(by_keyword[0].title, "Gardening");

    let by_writer = db.search_books(None, None, Some("Test User")).unwrap();
    assert_eq!(by_writer.len(), 3);

    let combined = db
        .search_books(Some("cooking"), Some("recipes"), None)
        .unwrap();
    assert_eq!(combined.len(), 1);

    let all = db.search_books(None, None, None).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_association_crud() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let reader = make_user(&db, "reader@example.com", "reader");
    let book = make_book(&db, &writer.id, "Test Book", "content");

    let association = ReaderBook {
        reader_id: reader.id.clone(),
        book_id: book.id.clone(),
        current_page: 1,
        added_at: now_timestamp(),
    };
    db.create_association(&association).unwrap();

    assert!(matches!(
        db.create_association(&association),
        Err(AppError::AlreadyOwned(_))
    ));

    db.set_current_page(&reader.id, &book.id, 5).unwrap();
    let fetched = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(fetched.current_page, 5);

    assert_eq!(db.get_reader_books(&reader.id).unwrap().len(), 1);
    assert_eq!(db.get_book_readers(&book.id).unwrap().len(), 1);

    assert!(db.delete_association(&reader.id, &book.id).unwrap());
    assert!(db.get_association(&reader.id, &book.id).unwrap().is_none());
    assert!(!db.delete_association(&reader.id, &book.id).unwrap());
}

#[test]
fn test_current_readers_reverse_lookup() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let alice = make_user(&db, "alice@example.com", "reader");
    let bob = make_user(&db, "bob@example.com", "reader");
    let book = make_book(&db, &writer.id, "Test Book", "content");

    db.set_current_book(&alice.id, Some(&book.id)).unwrap();
    db.set_current_book(&bob.id, Some(&book.id)).unwrap();

    let readers = db.get_current_readers(&book.id).unwrap();
    assert_eq!(readers.len(), 2);

    db.set_current_book(&bob.id, None).unwrap();
    let readers = db.get_current_readers(&book.id).unwrap();
    assert_eq!(readers.len(), 1);
    assert_eq!(readers[0].email, "alice@example.com");
}

// ========== AUTH ==========

#[test]
fn test_register_login_logout() {
    let db = test_db();
    let auth = AuthService::new(db.clone(), 30, true);

    let user = auth
        .register("alice@example.com", "Alice", "Smith", "secret", "reader")
        .unwrap();
    assert_eq!(user.role, "reader");
    assert_eq!(user.font_size, DEFAULT_FONT_SIZE);

    let (logged_in, token) = auth.login("alice@example.com", "secret").unwrap();
    assert_eq!(logged_in.id, user.id);

    let validated = auth.validate_token(&token).unwrap().unwrap();
    assert_eq!(validated.id, user.id);

    auth.logout(&token).unwrap();
    assert!(auth.validate_token(&token).unwrap().is_none());
}

#[test]
fn test_login_rejects_bad_credentials() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    auth.register("alice@example.com", "Alice", "Smith", "secret", "reader")
        .unwrap();

    assert!(matches!(
        auth.login("alice@example.com", "wrong"),
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        auth.login("nobody@example.com", "secret"),
        Err(AppError::Unauthorized(_))
    ));
}

#[test]
fn test_registration_disabled() {
    let db = test_db();
    let auth = AuthService::new(db, 30, false);

    assert!(matches!(
        auth.register("alice@example.com", "Alice", "Smith", "secret", "reader"),
        Err(AppError::Invalid(_))
    ));

    // CLI user creation bypasses the registration switch.
    assert!(
        auth.create_user("alice@example.com", "Alice", "Smith", "secret", "reader")
            .is_ok()
    );
}

#[test]
fn test_user_validation() {
    let db = test_db();
    let auth = AuthService::new(db, 30, true);

    assert!(auth.create_user("no-at-sign", "", "", "secret", "reader").is_err());
    assert!(auth.create_user("a@b.com", "", "", "abc", "reader").is_err());
    assert!(auth.create_user("a@b.com", "", "", "secret", "admin").is_err());
}

// ========== CONFIG ==========

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.server.title, "My Library");
    assert_eq!(config.auth.session_days, 30);
    assert!(config.auth.registration_enabled());
}

#[test]
fn test_config_parse_partial_toml() {
    let config: Config = toml::from_str(
        r#"
        [server]
        bind = "127.0.0.1:9090"

        [auth]
        registration = "disabled"
        "#,
    )
    .unwrap();

    assert_eq!(config.server.bind.port(), 9090);
    assert_eq!(config.server.title, "My Library");
    assert!(!config.auth.registration_enabled());
    assert_eq!(config.auth.session_days, 30);
}

#[test]
fn test_generated_default_config_parses() {
    let config: Config = toml::from_str(&Config::generate_default()).unwrap();
    assert_eq!(config.server.bind.port(), 8080);
}

// ========== READING SESSIONS ==========

#[test]
fn test_add_book_twice_keeps_cursor() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(3000));

    service.open_for_reading(&reader.id, &book.id).unwrap();
    service.next_page(&reader.id).unwrap();

    assert!(matches!(
        service.add_book(&reader.id, &book.id),
        Err(AppError::AlreadyOwned(_))
    ));

    // The failed add must not touch the stored cursor.
    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 2);
}

#[test]
fn test_open_requires_ownership() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let reader = make_user(&db, "reader@example.com", "reader");
    let book = make_book(&db, &writer.id, "Test Book", "content");

    let service = ReadingService::new(db);
    assert!(matches!(
        service.open_for_reading(&reader.id, &book.id),
        Err(AppError::NotOwned(_))
    ));
}

#[test]
fn test_navigation_requires_current_book() {
    let (_db, service, reader, _book) = reading_fixture("some content");

    // On the shelf but never opened.
    assert!(matches!(
        service.next_page(&reader.id),
        Err(AppError::NoCurrentBook)
    ));
    assert!(matches!(
        service.previous_page(&reader.id),
        Err(AppError::NoCurrentBook)
    ));
}

#[test]
fn test_open_starts_at_stored_cursor() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(3000));

    let view = service.open_for_reading(&reader.id, &book.id).unwrap();
    assert_eq!(view.page, 1);
    assert_eq!(view.body.len(), 1000);

    service.next_page(&reader.id).unwrap();

    // Reopening resumes where the reader left off.
    let view = service.open_for_reading(&reader.id, &book.id).unwrap();
    assert_eq!(view.page, 2);

    let user = db.get_user_by_id(&reader.id).unwrap().unwrap();
    assert_eq!(user.current_book_id.as_deref(), Some(book.id.as_str()));
}

#[test]
fn test_next_page_advances_and_persists() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(2500));

    service.open_for_reading(&reader.id, &book.id).unwrap();

    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 2);
    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);
    assert_eq!(view.body.len(), 500);

    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 3);
}

#[test]
fn test_next_page_stops_at_last_page() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(2500));

    service.open_for_reading(&reader.id, &book.id).unwrap();
    service.next_page(&reader.id).unwrap();
    service.next_page(&reader.id).unwrap();

    // Page 3 is the last page; turning again stays there.
    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);
    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);

    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 3);
}

#[test]
fn test_previous_page_floors_at_one() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(2500));

    service.open_for_reading(&reader.id, &book.id).unwrap();
    service.next_page(&reader.id).unwrap();

    let view = service.previous_page(&reader.id).unwrap();
    assert_eq!(view.page, 1);

    // Already on page 1; turning back stays there.
    let view = service.previous_page(&reader.id).unwrap();
    assert_eq!(view.page, 1);

    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 1);
}

#[test]
fn test_font_size_change_rolls_back_overrun() {
    // 900 chars: three pages at font 36 (budget 333), one at font 12.
    let (db, service, reader, book) = reading_fixture(&"a".repeat(900));

    db.update_font_size(&reader.id, 36).unwrap();
    service.open_for_reading(&reader.id, &book.id).unwrap();
    service.next_page(&reader.id).unwrap();
    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);

    // Back to the reference font: page 3 now starts past the end.
    db.update_font_size(&reader.id, 12).unwrap();

    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);
    assert_eq!(view.body.len(), 900);

    // Page 2 is also unreachable at the new budget, so the cursor holds.
    let view = service.previous_page(&reader.id).unwrap();
    assert_eq!(view.page, 3);

    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 3);
}

#[test]
fn test_opening_another_book_switches_current() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let reader = make_user(&db, "reader@example.com", "reader");
    let first = make_book(&db, &writer.id, "First", &"a".repeat(2000));
    let second = make_book(&db, &writer.id, "Second", &"b".repeat(2000));

    let service = ReadingService::new(db.clone());
    service.add_book(&reader.id, &first.id).unwrap();
    service.add_book(&reader.id, &second.id).unwrap();

    service.open_for_reading(&reader.id, &first.id).unwrap();
    service.next_page(&reader.id).unwrap();
    assert_eq!(db.get_current_readers(&first.id).unwrap().len(), 1);

    service.open_for_reading(&reader.id, &second.id).unwrap();
    assert!(db.get_current_readers(&first.id).unwrap().is_empty());
    assert_eq!(db.get_current_readers(&second.id).unwrap().len(), 1);

    // The first book kept its cursor for the next time it is opened.
    let view = service.open_for_reading(&reader.id, &first.id).unwrap();
    assert_eq!(view.page, 2);
}

#[test]
fn test_remove_book_clears_current_pointer() {
    let (db, service, reader, book) = reading_fixture(&"a".repeat(2000));

    service.open_for_reading(&reader.id, &book.id).unwrap();
    service.remove_book(&reader.id, &book.id).unwrap();

    let user = db.get_user_by_id(&reader.id).unwrap().unwrap();
    assert!(user.current_book_id.is_none());
    assert!(db.get_association(&reader.id, &book.id).unwrap().is_none());

    assert!(matches!(
        service.next_page(&reader.id),
        Err(AppError::NoCurrentBook)
    ));
    assert!(matches!(
        service.remove_book(&reader.id, &book.id),
        Err(AppError::NotOwned(_))
    ));
}

#[test]
fn test_remove_other_book_keeps_current_pointer() {
    let db = test_db();
    let writer = make_user(&db, "writer@example.com", "writer");
    let reader = make_user(&db, "reader@example.com", "reader");
    let first = make_book(&db, &writer.id, "First", &"a".repeat(2000));
    let second = make_book(&db, &writer.id, "Second", &"b".repeat(2000));

    let service = ReadingService::new(db.clone());
    service.add_book(&reader.id, &first.id).unwrap();
    service.add_book(&reader.id, &second.id).unwrap();
    service.open_for_reading(&reader.id, &first.id).unwrap();

    service.remove_book(&reader.id, &second.id).unwrap();

    let user = db.get_user_by_id(&reader.id).unwrap().unwrap();
    assert_eq!(user.current_book_id.as_deref(), Some(first.id.as_str()));
}

#[test]
fn test_short_book_reads_whole_content() {
    let (db, service, reader, book) = reading_fixture("a very short book\nwith two lines");

    let view = service.open_for_reading(&reader.id, &book.id).unwrap();
    assert_eq!(view.page, 1);
    assert_eq!(view.body, book.content);

    // Only one page; the cursor never moves.
    let view = service.next_page(&reader.id).unwrap();
    assert_eq!(view.page, 1);

    let association = db.get_association(&reader.id, &book.id).unwrap().unwrap();
    assert_eq!(association.current_page, 1);
}
