//! Filesystem-safe path segment sanitization
//!
//! Mirrors write one directory per page, named after the page's display
//! title (`Main_Page/Introduction/index.html`). Titles arrive from the
//! rendering engine and may contain anything.

const MAX_SEGMENT_LEN: usize = 80;

/// Sanitize one display title into a path segment
///
/// Collapses whitespace runs to a single `_`, strips characters that are
/// unsafe on any target filesystem, and truncates on a char boundary.
/// Empty input falls back to `Untitled`.
#[must_use]
pub fn sanitize_segment(title: &str) -> String {
    let collapsed: String = title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let mut safe = sanitize_filename::sanitize(collapsed);

    if safe.len() > MAX_SEGMENT_LEN {
        let mut cut = MAX_SEGMENT_LEN;
        while !safe.is_char_boundary(cut) {
            cut -= 1;
        }
        safe.truncate(cut);
    }

    let trimmed = safe.trim_matches(['.', '_', ' ']).to_string();
    if trimmed.is_empty() {
        "Untitled".to_string()
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_to_underscores() {
        assert_eq!(sanitize_segment("Main  Page"), "Main_Page");
        assert_eq!(sanitize_segment("  Lab 1: Setup  "), "Lab_1_Setup");
    }

    #[test]
    fn strips_path_separators() {
        let seg = sanitize_segment("a/b\\c");
        assert!(!seg.contains('/'));
        assert!(!seg.contains('\\'));
    }

    #[test]
    fn empty_title_falls_back() {
        assert_eq!(sanitize_segment(""), "Untitled");
        assert_eq!(sanitize_segment("   "), "Untitled");
    }

    #[test]
    fn long_titles_truncate_on_char_boundary() {
        let long = "é".repeat(200);
        let seg = sanitize_segment(&long);
        assert!(seg.len() <= MAX_SEGMENT_LEN);
        assert!(!seg.is_empty());
    }
}
