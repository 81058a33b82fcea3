use std::sync::LazyLock;

use regex::Regex;

/// Longest message forwarded to a destination, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[allow(clippy::expect_used)]
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern compiles"));

/// Strip `<...>` tags, collapse whitespace and cap the length.
///
/// Returns `None` when nothing is left to send.
pub fn sanitize(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    let text = TAG.replace_all(raw, "");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let capped: String = collapsed.chars().take(MAX_CONTENT_CHARS).collect();
    // Cutting mid-sentence can leave a trailing space.
    let capped = capped.trim_end();

    (!capped.is_empty()).then(|| capped.to_string())
}
