/// Filesystem-safe filename sanitizing for attachment names.
///
/// Titles come back from search collaborators with arbitrary Unicode,
/// path separators, and header-hostile quotes. The attachment filename
/// keeps an allow-list of characters and nothing else.

/// Longest sanitized stem we will emit. Keeps Content-Disposition
/// headers well under proxy limits.
const MAX_STEM_LEN: usize = 120;

/// Fallback stem when sanitizing leaves nothing usable.
const FALLBACK_STEM: &str = "download";

/// Reduce a raw title to a filesystem-safe filename stem.
///
/// Keeps ASCII alphanumerics, `.`, `_`, `-`, and spaces; drops
/// everything else. Runs of whitespace collapse to a single space and
/// the result is trimmed. An empty result falls back to `download`.
pub fn sanitize_filename(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len().min(MAX_STEM_LEN));
    let mut last_was_space = true; // swallow leading whitespace

    for ch in raw.chars() {
        if out.len() >= MAX_STEM_LEN {
            break;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            out.push(ch);
            last_was_space = false;
        }
        // anything else is dropped
    }

    let trimmed = out.trim_matches([' ', '.']).to_string();
    if trimmed.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        trimmed
    }
}
