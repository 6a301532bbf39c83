//! Pagination and reading-position engine.
//!
//! Page boundaries are derived on the fly from raw book text and the
//! reader's font-size preference; only the per-(reader, book) cursor is
//! ever persisted. `page` holds the pure boundary math, `session` the
//! stateful navigation on top of it.

mod page;
mod session;

pub use page::{
    BASE_CHARS_PER_PAGE, PageOutcome, PageView, REFERENCE_FONT_SIZE, chars_per_page,
    max_page_count, slice_page,
};
pub use session::ReadingService;
