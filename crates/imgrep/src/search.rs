//! Substring search over a cache snapshot.
//!
//! Search never touches the live cache: callers hand it a
//! [`CacheSnapshot`], so queries see a consistent point-in-time state no
//! matter what the background worker is doing.

use crate::store::CacheSnapshot;

/// Characters of matched text included in an excerpt before truncation.
pub const DEFAULT_EXCERPT_CHARS: usize = 200;

/// Appended to an excerpt when the stored text was longer than the excerpt.
pub const TRUNCATION_MARKER: &str = "...";

/// A single search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub filename: String,
    pub excerpt: String,
}

/// Case-insensitive substring search with the default excerpt length.
///
/// `Error`-status entries are skipped (their text is empty); an empty query
/// matches every `Ok` entry. Results come back ordered by filename, since
/// the snapshot iterates in key order - deterministic for a fixed snapshot.
pub fn search(query: &str, snapshot: &CacheSnapshot) -> Vec<SearchHit> {
    search_with_excerpt(query, snapshot, DEFAULT_EXCERPT_CHARS)
}

/// Same as [`search`] with a caller-chosen excerpt length.
pub fn search_with_excerpt(query: &str, snapshot: &CacheSnapshot, excerpt_chars: usize) -> Vec<SearchHit> {
    let needle = query.to_lowercase();

    snapshot
        .iter()
        .filter(|(_, entry)| entry.is_ok())
        .filter(|(_, entry)| needle.is_empty() || entry.text.to_lowercase().contains(&needle))
        .map(|(filename, entry)| SearchHit {
            filename: filename.clone(),
            excerpt: excerpt(&entry.text, excerpt_chars),
        })
        .collect()
}

/// First `max_chars` characters of `text`, on a character (not byte)
/// boundary, with the truncation marker appended when anything was cut.
fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CacheEntry;
    use std::collections::BTreeMap;

    fn snapshot_of(entries: &[(&str, CacheEntry)]) -> CacheSnapshot {
        entries
            .iter()
            .map(|(name, entry)| (name.to_string(), entry.clone()))
            .collect::<BTreeMap<_, _>>()
    }

    #[test]
    fn test_search_case_insensitive() {
        let snapshot = snapshot_of(&[("a.png", CacheEntry::ok("Invoice #123"))]);

        for query in ["invoice", "INVOICE", "Invoice", "iNvOiCe"] {
            let hits = search(query, &snapshot);
            assert_eq!(hits.len(), 1, "query {:?} should match", query);
            assert_eq!(hits[0].filename, "a.png");
            assert_eq!(hits[0].excerpt, "Invoice #123");
        }
    }

    #[test]
    fn test_search_no_match() {
        let snapshot = snapshot_of(&[("a.png", CacheEntry::ok("Invoice #123"))]);
        assert!(search("receipt", &snapshot).is_empty());
    }

    #[test]
    fn test_error_entries_excluded() {
        let snapshot = snapshot_of(&[
            ("good.png", CacheEntry::ok("hello")),
            ("bad.jpg", CacheEntry::error("decode failed")),
        ]);

        let hits = search("", &snapshot);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "good.png");
    }

    #[test]
    fn test_empty_query_matches_all_ok_entries() {
        let snapshot = snapshot_of(&[
            ("a.png", CacheEntry::ok("one")),
            ("b.png", CacheEntry::ok("two")),
            ("c.png", CacheEntry::error("nope")),
        ]);

        let hits = search("", &snapshot);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_results_ordered_by_filename() {
        let snapshot = snapshot_of(&[
            ("zebra.png", CacheEntry::ok("shared term")),
            ("alpha.png", CacheEntry::ok("shared term")),
            ("mid.png", CacheEntry::ok("shared term")),
        ]);

        let names: Vec<_> = search("shared", &snapshot).into_iter().map(|h| h.filename).collect();
        assert_eq!(names, vec!["alpha.png", "mid.png", "zebra.png"]);
    }

    #[test]
    fn test_excerpt_truncation() {
        let long_text = "x".repeat(DEFAULT_EXCERPT_CHARS + 50);
        let snapshot = snapshot_of(&[("long.png", CacheEntry::ok(long_text))]);

        let hits = search("x", &snapshot);
        assert_eq!(
            hits[0].excerpt,
            format!("{}{}", "x".repeat(DEFAULT_EXCERPT_CHARS), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_excerpt_exact_length_not_truncated() {
        let text = "y".repeat(DEFAULT_EXCERPT_CHARS);
        let snapshot = snapshot_of(&[("exact.png", CacheEntry::ok(text.clone()))]);

        let hits = search("y", &snapshot);
        assert_eq!(hits[0].excerpt, text);
    }

    #[test]
    fn test_excerpt_multibyte_boundary() {
        // 210 two-byte characters: truncation must land on a char boundary.
        let text = "é".repeat(210);
        let snapshot = snapshot_of(&[("utf8.png", CacheEntry::ok(text))]);

        let hits = search("é", &snapshot);
        assert_eq!(
            hits[0].excerpt,
            format!("{}{}", "é".repeat(DEFAULT_EXCERPT_CHARS), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_custom_excerpt_length() {
        let snapshot = snapshot_of(&[("a.png", CacheEntry::ok("abcdefghij"))]);

        let hits = search_with_excerpt("abc", &snapshot, 4);
        assert_eq!(hits[0].excerpt, "abcd...");
    }
}
