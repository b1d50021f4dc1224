//! Linux-safe file name sanitization.

const NAME_MAX: usize = 255;

/// Makes `name` safe as a single Linux path component.
///
/// Separators, NUL, and control characters become `_` (runs collapse to one);
/// leading and trailing dots, spaces, and underscores are trimmed; the result is
/// cut to 255 bytes on a char boundary. May return an empty string.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let bad = c == '/' || c == '\\' || c == '\0' || c.is_control();
        if bad {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c: char| c == '.' || c == '_' || c.is_whitespace());
    let mut end = trimmed.len().min(NAME_MAX);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    trimmed[..end].to_string()
}
