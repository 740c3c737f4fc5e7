//! Escaping for markup text, attribute values and file names.

/// Escape text content. Only `&`, `<` and `>` are replaced.
pub fn escape_text(text: &str) -> String {
    escape_markup(text, false)
}

/// Escape an attribute value. Quotes are replaced as well, so the result is
/// safe inside either quote style.
pub fn escape_attr(text: &str) -> String {
    escape_markup(text, true)
}

fn escape_markup(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '\'' if escape_quotes => result.push_str("&#39;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}

/// Map a display name to a name usable as a file name on every platform.
///
/// `<>:?*` are dropped, path separators and `|` become `-`, and `"` becomes
/// two single quotes.
pub fn escape_file_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '<' | '>' | ':' | '?' | '*' => {}
            '/' | '\\' | '|' => result.push('-'),
            '"' => result.push_str("''"),
            _ => result.push(ch),
        }
    }
    result
}
