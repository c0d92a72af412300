//! Shared plain-text transform for markup-bearing fragments.
//!
//! Every HTML fragment extracted anywhere in the crate goes through
//! [`strip_html`] so that canonical records never carry markup tags.

use once_cell::sync::Lazy;
use regex::Regex;

static BR_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid regex"));
static TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strip HTML tags and return plain text.
///
/// Line-break tags become newlines, all remaining tags are removed, runs of
/// three or more newlines collapse to two, and the result is trimmed. The
/// transform is idempotent: applying it to its own output is a no-op.
#[must_use]
pub fn strip_html(html: &str) -> String {
    let text = BR_TAGS.replace_all(html, "\n");
    let text = TAGS.replace_all(&text, "");
    EXCESS_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}
