//! Extraction of a JSON object embedded inside a non-JSON host document.
//!
//! Trac ticket pages carry their field values in a JavaScript assignment
//! (`old_values = {...}`) inside the page markup. A regex cannot find the end
//! of that object because string values may themselves contain braces and
//! quotes, so the scan tracks brace depth with an explicit string/escape
//! state machine.

use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InString,
    Escaped,
}

/// Locate `marker` followed by an opening brace and parse the brace-balanced
/// object that starts there.
///
/// Returns an empty map when the marker is absent, no object follows it, the
/// object is unterminated, or the candidate text is not valid JSON. Callers
/// must treat every field sourced from the result as optional.
#[must_use]
pub fn extract_embedded_object(document: &str, marker: &str) -> Map<String, Value> {
    let Some(candidate) = locate_candidate(document, marker) else {
        return Map::new();
    };
    serde_json::from_str(candidate).unwrap_or_default()
}

/// Find the first occurrence of `marker` that is followed by `{`, and return
/// the balanced object text starting there. Whitespace and one assignment
/// `=` (when not already part of the marker) may separate the two.
fn locate_candidate<'a>(document: &'a str, marker: &str) -> Option<&'a str> {
    if marker.is_empty() {
        return None;
    }

    let mut search_from = 0;
    while let Some(found) = document[search_from..].find(marker) {
        let after = search_from + found + marker.len();
        let mut rest = document[after..].trim_start();
        if let Some(stripped) = rest.strip_prefix('=') {
            rest = stripped.trim_start();
        }
        let brace_at = after + (document[after..].len() - rest.len());
        if document[brace_at..].starts_with('{') {
            let object = &document[brace_at..];
            return object_end(object).map(|end| &object[..end]);
        }
        search_from = after;
    }
    None
}

/// Scan `text` (which starts at `{`) and return the exclusive byte index of
/// the brace that closes the object, honoring quoted strings and escapes.
fn object_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut state = ScanState::Outside;

    for (i, ch) in text.char_indices() {
        match state {
            ScanState::Outside => match ch {
                '{' => depth += 1,
                '}' => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(i + ch.len_utf8());
                    }
                }
                '"' => state = ScanState::InString,
                _ => {}
            },
            ScanState::InString => match ch {
                '\\' => state = ScanState::Escaped,
                '"' => state = ScanState::Outside,
                _ => {}
            },
            ScanState::Escaped => state = ScanState::InString,
        }
    }
    None
}
