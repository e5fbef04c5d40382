//! Property-based tests with proptest.
//!
//! The reader's backtracking contract is relational: whatever was
//! scanned once must be scanned identically after a reset, and the
//! search helpers must agree with plain substring search on input
//! that uses no escapes. Pages are drawn from a small alphabet so
//! that limits actually occur in them.

mod common;

use common::{drain, reader};
use proptest::prelude::*;

// -- Leaf strategies --

/// Page text over a small alphabet rich in delimiter chars.
fn page() -> impl Strategy<Value = String> {
    "[ab %>=/'\"\\\\\n-]{0,48}"
}

/// Page text guaranteed to contain no backslash escapes.
fn page_without_escapes() -> impl Strategy<Value = String> {
    "[ab %>=\n-]{0,48}"
}

/// Search limit over the same alphabet.
fn limit() -> impl Strategy<Value = String> {
    "[ab%>-]{1,3}"
}

/// Quoted-attribute payload: any printable ASCII.
fn attribute_value() -> impl Strategy<Value = String> {
    "[ -~]{0,24}"
}

// -- Property tests --

proptest! {
    /// Whatever the tail looked like the first time, it looks the
    /// same after resetting to a mark.
    #[test]
    fn mark_reset_rereads_identical_tail(src in page(), k in 0usize..64) {
        let mut r = reader(&src);
        for _ in 0..k.min(src.chars().count()) {
            r.next_char();
        }
        let m = r.mark();
        let first = drain(&mut r);
        r.reset(&m);
        let second = drain(&mut r);
        prop_assert_eq!(first, second);
    }

    /// A failed match is invisible; a successful one consumes exactly
    /// the literal.
    #[test]
    fn matches_consumes_all_or_nothing(src in page(), lit in limit()) {
        let mut r = reader(&src);
        let before = r.mark();
        if r.matches(&lit) {
            let after = r.mark();
            prop_assert_eq!(r.get_text(&before, &after), lit);
        } else {
            prop_assert_eq!(r.mark(), before);
        }
    }

    /// skip_until finds exactly what substring search finds, leaves
    /// the mark at its start and the cursor just past it.
    #[test]
    fn skip_until_agrees_with_substring_search(src in page(), lit in limit()) {
        let mut r = reader(&src);
        match r.skip_until(&lit) {
            Some(m) => {
                let expected = src.find(lit.as_str());
                prop_assert_eq!(expected, Some(m.pos()));
                prop_assert_eq!(drain(&mut r), &src[m.pos() + lit.len()..]);
            }
            None => {
                prop_assert_eq!(src.find(lit.as_str()), None);
                prop_assert!(!r.has_more_input());
            }
        }
    }

    /// Without backslashes in the page, the escape-aware search and
    /// the plain one agree on single-char limits.
    #[test]
    fn escape_aware_search_agrees_when_unescaped(
        src in page_without_escapes(),
        ch in "[ab%>]",
    ) {
        let mut plain = reader(&src);
        let mut aware = reader(&src);
        let plain_pos = plain.skip_until(&ch).map(|m| m.pos());
        let aware_pos = aware.skip_until_ignore_esc(&ch).map(|m| m.pos());
        prop_assert_eq!(plain_pos, aware_pos);
    }

    /// get_text returns exactly the chars consumed between two marks
    /// and leaves the current position alone.
    #[test]
    fn get_text_matches_consumed_chars(src in page(), k1 in 0usize..48, k2 in 0usize..48) {
        let len = src.chars().count();
        let (k1, k2) = (k1.min(len), k2.min(len));
        let (k1, k2) = (k1.min(k2), k1.max(k2));

        let mut r = reader(&src);
        for _ in 0..k1 {
            r.next_char();
        }
        let start = r.mark();
        let mut expected = String::new();
        for _ in k1..k2 {
            expected.push(r.next_char().unwrap());
        }
        let stop = r.mark();

        prop_assert_eq!(r.get_text(&start, &stop), expected);
        prop_assert_eq!(r.mark(), stop);
    }

    /// An unquoted token never contains an unescapable delimiter.
    #[test]
    fn unquoted_token_excludes_delimiters(src in page()) {
        let mut r = reader(&src);
        let token = r.parse_token(false).unwrap();
        prop_assert!(
            token.chars().all(|c| c > ' ' && c != '=' && c != '/'),
            "token {token:?} leaked a delimiter"
        );
    }

    /// Escaping a value, quoting it, and parsing it back is lossless.
    #[test]
    fn quoted_token_roundtrips_escapes(value in attribute_value()) {
        let mut encoded = String::from('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                encoded.push('\\');
            }
            encoded.push(c);
        }
        encoded.push('"');

        let mut r = reader(&encoded);
        prop_assert_eq!(r.parse_token(true).unwrap(), value);
    }

    /// Line and column accounting is consistent with the text.
    #[test]
    fn line_column_accounting_is_consistent(src in page()) {
        let mut r = reader(&src);
        drain(&mut r);
        let end = r.mark();
        prop_assert_eq!(end.pos(), src.chars().count());
        prop_assert_eq!(end.line(), 1 + src.matches('\n').count());
        let last_line = src.rsplit('\n').next().unwrap_or("");
        prop_assert_eq!(end.column(), last_line.chars().count());
    }
}
