//! Field normalization and character filtering.
//!
//! All sanitizers are idempotent: applying one to its own output is a no-op.

use crate::submission::types::SubmissionForm;

/// Punctuation kept in names besides letters, digits and whitespace.
const NAME_PUNCTUATION: &[char] = &['.', '-', '\'', '"', '’'];

/// Symbols kept in phone numbers besides digits and whitespace.
const PHONE_SYMBOLS: &[char] = &['+', '-', '(', ')', '/'];

/// Sanitized but not yet validated fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sanitized {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl Sanitized {
    pub fn from_form(form: &SubmissionForm) -> Self {
        Self {
            name: sanitize_name(&form.name),
            email: normalize(&form.email),
            phone: sanitize_phone(&form.phone),
            message: normalize(&form.message),
        }
    }
}

/// Trim, unify line endings to `\n` and drop NUL bytes.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\0', "")
}

pub fn sanitize_name(raw: &str) -> String {
    let kept: String = normalize(raw)
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || NAME_PUNCTUATION.contains(c))
        .collect();
    collapse_whitespace(&kept)
}

pub fn sanitize_phone(raw: &str) -> String {
    let kept: String = normalize(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || c.is_whitespace() || PHONE_SYMBOLS.contains(c))
        .collect();
    collapse_whitespace(&kept)
}

/// Replace every whitespace run with one space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace CR, LF and NUL with spaces, for single-line contexts such as
/// headers and audit fields.
pub fn clean_line(s: &str) -> String {
    s.replace(['\r', '\n', '\0'], " ").trim().to_string()
}

/// Number of case-insensitive `http://` and `https://` occurrences.
pub fn count_links(message: &str) -> usize {
    let lower = message.to_ascii_lowercase();
    lower.matches("http://").count() + lower.matches("https://").count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  a\r\nb\rc\n\0d  "), "a\nb\nc\nd");
    }

    #[test]
    fn test_name_keeps_accents_and_apostrophes() {
        assert_eq!(sanitize_name("  Kovács   János "), "Kovács János");
        assert_eq!(sanitize_name("O’Brien-Smith Jr."), "O’Brien-Smith Jr.");
        assert_eq!(sanitize_name("D'Arcy \"Dee\""), "D'Arcy \"Dee\"");
    }

    #[test]
    fn test_name_strips_markup() {
        assert_eq!(sanitize_name("<script>alert(1)</script>Bob"), "scriptalert1scriptBob");
        assert_eq!(sanitize_name("Anna\r\nBcc: x@y.z"), "Anna Bcc xy.z");
    }

    #[test]
    fn test_phone() {
        assert_eq!(sanitize_phone(" +36 (30) 123-4567 ext."), "+36 (30) 123-4567");
        assert_eq!(sanitize_phone("06/1\t\t234 5678"), "06/1 234 5678");
        assert_eq!(sanitize_phone("call me"), "");
    }

    #[test]
    fn test_sanitizers_are_idempotent() {
        let inputs = [
            "  Kovács \t János  ",
            "a\r\n\r\nb <c> ’d’",
            "\0\0",
            "+36 (1) 234-5678 / 9",
            "Ünnepi   \n  Szalon  .-",
        ];
        for input in inputs {
            let name = sanitize_name(input);
            assert_eq!(sanitize_name(&name), name, "name: {input:?}");
            let phone = sanitize_phone(input);
            assert_eq!(sanitize_phone(&phone), phone, "phone: {input:?}");
        }
    }

    #[test]
    fn test_count_links() {
        assert_eq!(count_links("no links here"), 0);
        assert_eq!(count_links("HTTP://a HtTpS://b http://c"), 3);
        assert_eq!(count_links("https://https://"), 2);
        assert_eq!(count_links("ftp://x www.y.z"), 0);
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line(" Mozilla\r\nX-Injected: 1\0 "), "Mozilla  X-Injected: 1");
    }
}
