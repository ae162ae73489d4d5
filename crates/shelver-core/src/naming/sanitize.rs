//! Linux-safe path component sanitization.

const NAME_MAX: usize = 255;

/// Sanitizes one path component (a directory or file name).
///
/// - Replaces NUL, `/`, `\` and control characters with `_`
/// - Trims surrounding whitespace and dots (so `..` can never survive)
/// - Limits length to 255 bytes (Linux NAME_MAX)
/// - Returns `Unknown` when nothing is left
pub fn sanitize_component(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            if c == '\0' || c == '/' || c == '\\' || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        return "Unknown".to_string();
    }
    truncate_bytes(trimmed, NAME_MAX).to_string()
}

/// Longest prefix of `s` of at most `max` bytes ending on a char boundary.
pub(crate) fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut take = max;
    while take > 0 && !s.is_char_boundary(take) {
        take -= 1;
    }
    &s[..take]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_separators_and_control_chars() {
        assert_eq!(sanitize_component("AC/DC\\Live"), "AC_DC_Live");
        assert_eq!(sanitize_component("a\x00b\nc"), "a_b_c");
    }

    #[test]
    fn keeps_spaces_and_punctuation() {
        assert_eq!(sanitize_component("Dune: Messiah"), "Dune: Messiah");
    }

    #[test]
    fn trims_dots_and_whitespace() {
        assert_eq!(sanitize_component("  ..  Title ..  "), "Title");
        assert_eq!(sanitize_component(".."), "Unknown");
        assert_eq!(sanitize_component("   "), "Unknown");
    }

    #[test]
    fn limits_length_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_component(&long);
        assert!(out.len() <= NAME_MAX);
        assert!(out.chars().all(|c| c == 'é'));
    }
}
