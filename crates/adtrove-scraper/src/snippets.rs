//! Merging of text snippets observed for the same creative across passes.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on snippets retained per creative.
pub const MAX_TEXT_SNIPPETS: usize = 20;

static WHITESPACE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapses whitespace runs to a single space and trims the ends. NUL
/// characters, which scraped DOM text occasionally carries, count as
/// whitespace.
///
/// Returns `None` for blank input.
#[must_use]
pub fn normalize_snippet(raw: &str) -> Option<String> {
    let without_nul = raw.replace('\0', " ");
    let collapsed = WHITESPACE_RUN_RE.replace_all(without_nul.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.into_owned())
    }
}

/// Returns `existing` followed by every normalized `incoming` snippet not
/// already present, stopping once the result holds `cap` entries.
///
/// `existing` is kept as-is and in order. Duplicates are detected on the
/// normalized form, so an incoming snippet matching an existing entry up to
/// whitespace is dropped, as are blank snippets.
#[must_use]
pub fn merge_snippets(existing: &[String], incoming: &[String], cap: usize) -> Vec<String> {
    let mut merged = existing.to_vec();
    merge_snippets_into(&mut merged, incoming, cap);
    merged
}

/// In-place form of [`merge_snippets`].
pub fn merge_snippets_into(target: &mut Vec<String>, incoming: &[String], cap: usize) {
    let mut seen: HashSet<String> = target
        .iter()
        .filter_map(|existing| normalize_snippet(existing.as_str()))
        .collect();

    for raw in incoming {
        if target.len() >= cap {
            break;
        }
        let Some(snippet) = normalize_snippet(raw) else {
            continue;
        };
        if seen.insert(snippet.clone()) {
            target.push(snippet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn appends_new_snippets_after_existing_in_order() {
        let merged = merge_snippets(&strings(&["a", "b"]), &strings(&["c", "a", "d"]), 10);
        assert_eq!(merged, strings(&["a", "b", "c", "d"]));
    }

    #[test]
    fn subset_merge_is_identity() {
        let existing = strings(&["Shop now", "Free shipping", "Sponsored"]);
        let merged = merge_snippets(&existing, &strings(&["Sponsored", "Shop now"]), 20);
        assert_eq!(merged, existing);
    }

    #[test]
    fn incoming_duplicates_are_collapsed() {
        let merged = merge_snippets(&[], &strings(&["x", "x", "y", "x"]), 20);
        assert_eq!(merged, strings(&["x", "y"]));
    }

    #[test]
    fn stops_at_cap() {
        let incoming: Vec<String> = (0..50).map(|i| format!("s{i}")).collect();
        let merged = merge_snippets(&strings(&["first"]), &incoming, MAX_TEXT_SNIPPETS);
        assert_eq!(merged.len(), MAX_TEXT_SNIPPETS);
        assert_eq!(merged[0], "first");
        assert_eq!(merged[1], "s0");
    }

    #[test]
    fn zero_cap_adds_nothing() {
        let merged = merge_snippets(&strings(&["a"]), &strings(&["b"]), 0);
        assert_eq!(merged, strings(&["a"]));
    }

    #[test]
    fn blank_snippets_are_dropped_and_whitespace_collapsed() {
        let merged = merge_snippets(
            &strings(&["Buy now"]),
            &strings(&["   ", "\n\t", "Buy   now", "  Limited\n offer "]),
            20,
        );
        assert_eq!(merged, strings(&["Buy now", "Limited offer"]));
    }

    #[test]
    fn normalize_snippet_returns_none_for_blank() {
        assert_eq!(normalize_snippet(" \n "), None);
        assert_eq!(normalize_snippet(" a\u{a0} b "), Some("a b".to_string()));
    }

    #[test]
    fn subset_merge_is_identity_when_existing_was_never_normalized() {
        let existing = strings(&["Buy  now", " Sale"]);
        let merged = merge_snippets(&existing, &strings(&["Buy  now", "Sale "]), 20);
        assert_eq!(merged, existing);
    }

    #[test]
    fn nul_characters_are_treated_as_whitespace() {
        assert_eq!(normalize_snippet("Shop\0now"), Some("Shop now".to_string()));
        assert_eq!(normalize_snippet("\0\0"), None);
        let merged = merge_snippets(&strings(&["Shop now"]), &strings(&["Shop\0now"]), 20);
        assert_eq!(merged, strings(&["Shop now"]));
    }

    #[test]
    fn in_place_variant_matches_pure_variant() {
        let existing = strings(&["a"]);
        let incoming = strings(&["b", "a", "c"]);
        let mut target = existing.clone();
        merge_snippets_into(&mut target, &incoming, 2);
        assert_eq!(target, merge_snippets(&existing, &incoming, 2));
        assert_eq!(target, strings(&["a", "b"]));
    }
}
