//! Page-boundary calculation.
//!
//! A page is a character range of the raw content, sized by a
//! font-adjusted budget and aligned to line boundaries so that no line
//! of the source text is split across two pages. Offsets are counted in
//! characters; newline search works on bytes since `\n` is ASCII.

use serde::Serialize;

/// Characters that fit on one page at the reference font size.
pub const BASE_CHARS_PER_PAGE: usize = 1000;

/// Font size at which the base budget applies.
pub const REFERENCE_FONT_SIZE: i64 = 12;

/// One computed page of a book.
#[derive(Debug, Clone, Serialize)]
pub struct PageView {
    /// Page number this view was computed for.
    pub page: i64,
    /// Effective character budget used for the computation.
    pub chars_per_page: usize,
    /// The text slice to display.
    pub body: String,
}

/// Result of a page computation.
///
/// Overrun is an expected, recoverable condition, not a fault: the
/// caller decides whether to keep or discard a tentative cursor change
/// based on which variant it gets back.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// The requested page exists within the content.
    Ready(PageView),
    /// The requested start offset lies past the end of a book shorter
    /// than one reference page; the entire content is returned instead.
    PastEnd(PageView),
}

impl PageOutcome {
    /// Whether the requested page was past the end of the content.
    pub fn is_past_end(&self) -> bool {
        matches!(self, PageOutcome::PastEnd(_))
    }

    /// Unwrap the computed view regardless of outcome.
    pub fn into_view(self) -> PageView {
        match self {
            PageOutcome::Ready(view) | PageOutcome::PastEnd(view) => view,
        }
    }
}

/// Character budget for one page at the given font size.
///
/// Larger fonts proportionally shrink the budget, smaller fonts grow it.
pub fn chars_per_page(font_size: i64) -> usize {
    let ratio = font_size as f64 / REFERENCE_FONT_SIZE as f64;
    (BASE_CHARS_PER_PAGE as f64 / ratio) as usize
}

/// Highest page number that still starts within the content.
pub fn max_page_count(content: &str, font_size: i64) -> i64 {
    let budget = chars_per_page(font_size);
    let total = content.chars().count();
    (total as f64 / budget as f64).ceil() as i64
}

/// Compute the page at `page_number` of `content` for a reader with the
/// given font size.
///
/// Page numbers start at 1. Pages other than page 1 never begin
/// mid-line, and a page ends at the last line boundary inside its
/// budget unless that would leave it empty.
pub fn slice_page(content: &str, font_size: i64, page_number: i64) -> PageOutcome {
    let budget = chars_per_page(font_size);
    let total_chars = content.chars().count();
    let start_chars = (page_number.max(1) - 1) as usize * budget;

    // A book shorter than one reference page only ever has page 1;
    // anything past it returns the whole content and signals overrun.
    if start_chars > total_chars && total_chars < BASE_CHARS_PER_PAGE {
        return PageOutcome::PastEnd(PageView {
            page: page_number,
            chars_per_page: total_chars,
            body: content.to_string(),
        });
    }

    let end_chars = (start_chars + budget).min(total_chars);

    let mut start = byte_offset(content, start_chars);
    let mut end = byte_offset(content, end_chars);

    // Move start just past the nearest newline at or before it, so the
    // page doesn't open mid-line. Page 1 always starts at offset 0.
    if start > 0
        && let Some(newline) = last_newline_at_or_before(content, start)
    {
        start = newline + 1;
    }

    // Pull end back to the nearest newline inside the budget, but only
    // if the page stays non-empty; very long lines keep the raw end so
    // navigation still makes forward progress.
    if end_chars < total_chars
        && let Some(newline) = last_newline_at_or_before(content, end)
        && newline > start
    {
        end = newline;
    }

    PageOutcome::Ready(PageView {
        page: page_number,
        chars_per_page: budget,
        body: content[start..end].to_string(),
    })
}

/// Byte offset of the character at `char_idx`, clamped to the end.
fn byte_offset(content: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    content
        .char_indices()
        .nth(char_idx)
        .map(|(offset, _)| offset)
        .unwrap_or(content.len())
}

/// Byte offset of the last newline at or before `byte_idx`.
fn last_newline_at_or_before(content: &str, byte_idx: usize) -> Option<usize> {
    let search_end = if content[byte_idx..].starts_with('\n') {
        byte_idx + 1
    } else {
        byte_idx
    };
    content[..search_end].rfind('\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_with_newlines() -> String {
        // 2500 characters with newlines at offsets 300, 900, 1450, 2100.
        let mut content: Vec<char> = std::iter::repeat_n('a', 2500).collect();
        for offset in [300, 900, 1450, 2100] {
            content[offset] = '\n';
        }
        content.into_iter().collect()
    }

    #[test]
    fn budget_scales_inversely_with_font_size() {
        assert_eq!(chars_per_page(12), 1000);
        assert_eq!(chars_per_page(24), 500);
        assert_eq!(chars_per_page(6), 2000);
        assert_eq!(chars_per_page(18), 666);
    }

    #[test]
    fn page_one_spans_full_budget_without_newlines() {
        let content = "x".repeat(3000);
        let view = slice_page(&content, 12, 1).into_view();
        assert_eq!(view.page, 1);
        assert_eq!(view.chars_per_page, 1000);
        assert_eq!(view.body.len(), 1000);
    }

    #[test]
    fn pages_align_to_newlines() {
        let content = content_with_newlines();

        let page1 = slice_page(&content, 12, 1).into_view();
        assert_eq!(page1.body, content[0..900]);

        let page2 = slice_page(&content, 12, 2).into_view();
        assert_eq!(page2.body, content[901..1450]);
    }

    #[test]
    fn larger_font_shrinks_the_page() {
        let content = content_with_newlines();
        let page1 = slice_page(&content, 24, 1).into_view();
        assert_eq!(page1.chars_per_page, 500);
        assert_eq!(page1.body, content[0..300]);
    }

    #[test]
    fn short_book_past_page_one_is_past_end() {
        let content = "short book\nwith two lines";
        let outcome = slice_page(content, 12, 2);
        assert!(outcome.is_past_end());

        let view = outcome.into_view();
        assert_eq!(view.body, content);
        assert_eq!(view.chars_per_page, content.chars().count());
    }

    #[test]
    fn long_book_far_page_returns_tail() {
        // 1200 chars, newline at 1100: page 5 starts past the end but
        // the book is longer than a reference page, so it is not the
        // short-book case.
        let mut content = "y".repeat(1200);
        content.replace_range(1100..1101, "\n");

        let outcome = slice_page(&content, 12, 5);
        assert!(!outcome.is_past_end());
        assert_eq!(outcome.into_view().body, content[1101..]);
    }

    #[test]
    fn long_line_keeps_unaligned_end() {
        // Single newline right after the start of page 2: aligning the
        // end would move it before the start, so the raw end is kept.
        let content = "z".repeat(5000);
        let view = slice_page(&content, 12, 2).into_view();
        assert_eq!(view.body.len(), 1000);
        assert_eq!(view.body, content[1000..2000]);
    }

    #[test]
    fn multibyte_content_slices_on_char_boundaries() {
        let content = "é".repeat(1500);
        let view = slice_page(&content, 12, 2).into_view();
        assert_eq!(view.body.chars().count(), 500);
    }

    #[test]
    fn max_page_count_rounds_up() {
        assert_eq!(max_page_count(&"a".repeat(2500), 12), 3);
        assert_eq!(max_page_count(&"a".repeat(1000), 12), 1);
        assert_eq!(max_page_count(&"a".repeat(1001), 12), 2);
        assert_eq!(max_page_count("", 12), 0);
    }
}
