//! Language token parsing and title inference.

use once_cell::sync::Lazy;
use regex::Regex;

/// Recognized tokens (lowercase) and their canonical language name.
const LANGUAGE_TOKENS: &[(&[&str], &str)] = &[
    (&["en", "eng", "english"], "English"),
    (&["es", "spa", "spanish", "espanol", "español"], "Spanish"),
    (&["de", "ger", "deu", "german", "deutsch"], "German"),
    (&["fr", "fre", "fra", "french", "francais", "français"], "French"),
    (&["it", "ita", "italian", "italiano"], "Italian"),
    (&["nl", "dut", "nld", "dutch"], "Dutch"),
    (&["pt", "por", "portuguese"], "Portuguese"),
    (&["ru", "rus", "russian"], "Russian"),
    (&["ja", "jpn", "japanese"], "Japanese"),
];

static BRACKETED_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\[\(\{]\s*([A-Za-z]{2,3})\s*[\]\)\}]").expect("bracketed language regex")
});
/// Upper-case two-letter code ending the title or following ` - `.
static SUFFIX_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[\s._]([A-Z]{2})\s*$)|(?:\s-\s+([A-Z]{2})\b)").expect("suffix language regex")
});

/// Two-letter codes that are also common English title words.
const AMBIGUOUS_SHORT_CODES: &[&str] = &["IT"];

/// Trim a label and drop placeholders: empty and "Unknown" become `None`.
pub fn normalize_token(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    if v.is_empty() || v.eq_ignore_ascii_case("unknown") {
        return None;
    }
    Some(v.to_string())
}

/// Map a language token (code or name, any case) to its canonical name.
pub fn parse_language_token(token: &str) -> Option<&'static str> {
    let lower = token.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }
    LANGUAGE_TOKENS
        .iter()
        .find(|(tokens, _)| tokens.contains(&lower.as_str()))
        .map(|(_, name)| *name)
}

/// Infer a language from release-title tags.
///
/// Recognizes bracketed codes (`[DE]`, `(eng)`), upper-case scene tags
/// anywhere in the title (`Book.GERMAN.2019`, `[ENG / M4B]`), and upper-case
/// two-letter suffixes (`Some Title EN`, `Title - NL`). Plain words in normal
/// case are never taken as language tags.
pub fn detect_language_in_title(title: &str) -> Option<&'static str> {
    for cap in BRACKETED_CODE.captures_iter(title) {
        if let Some(lang) = cap.get(1).and_then(|m| parse_language_token(m.as_str())) {
            return Some(lang);
        }
    }

    let scene_tag = title
        .split(|c: char| c.is_whitespace() || matches!(c, '.' | '_' | '-' | '[' | ']' | '(' | ')' | '/'))
        .filter(|t| t.chars().count() >= 3 && t.chars().all(|c| c.is_ascii_uppercase()))
        .find_map(parse_language_token);
    if scene_tag.is_some() {
        return scene_tag;
    }

    SUFFIX_CODE
        .captures_iter(title)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)))
        .map(|m| m.as_str())
        .filter(|code| !AMBIGUOUS_SHORT_CODES.contains(code))
        .find_map(parse_language_token)
}
