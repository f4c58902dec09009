

/// Lowercased, trimmed form used for lexical containment checks.
#[inline]
pub fn normalize_query(s: &str) -> String {
    s.trim().to_lowercase()
}


/// Char-safe prefix of `s` for log lines, with `...` when cut.
#[inline]
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}
