//! Filename and URL normalization helpers.

/// Replace characters that are invalid in Windows/Unix paths with `_`.
///
/// Only substitutes, never trims, so the result is a pure function of the input.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Lower-case the hex digits of every percent-encoded octet.
///
/// `%E2%80%99` and `%e2%80%99` name the same resource; storing one form keeps
/// URL comparisons stable across crawls.
pub fn canonical_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut chars = url.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '%' {
            for _ in 0..2 {
                match chars.peek() {
                    Some(h) if h.is_ascii_hexdigit() => {
                        out.push(h.to_ascii_lowercase());
                        chars.next();
                    }
                    _ => break,
                }
            }
        }
    }
    out
}

/// Join key for "is this episode already known": the fully lower-cased URL.
pub fn url_key(url: &str) -> String {
    canonical_url(url.trim()).to_lowercase()
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
