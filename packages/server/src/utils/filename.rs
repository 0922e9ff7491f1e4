/// Longest sanitized filename kept in an object key.
const MAX_FILENAME_CHARS: usize = 120;

/// Make an uploaded filename safe for use inside an object key.
///
/// Every character outside `[A-Za-z0-9.-]` becomes `_`. Path components are
/// not stripped first, so `../a b.mp4` becomes `.._a_b.mp4`; the result is
/// always used behind a timestamp prefix and can never be a bare `..` segment.
pub fn sanitize_filename(filename: &str) -> String {
    let sanitized: String = filename
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        return "file".to_string();
    }

    // Keep the tail so the extension survives truncation.
    let count = sanitized.chars().count();
    if count > MAX_FILENAME_CHARS {
        sanitized.chars().skip(count - MAX_FILENAME_CHARS).collect()
    } else {
        sanitized
    }
}
