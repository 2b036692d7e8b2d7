//! Utility functions and helpers.

pub mod log;
pub mod retry;
pub mod wait;

/// Keep only ASCII digits, dropping separators and any other characters.
pub fn digits_only(text: &str) -> String {
    text.chars().filter(char::is_ascii_digit).collect()
}

/// Parse an integer out of element text such as `" 12 "` or `"1,204"`.
pub fn parse_page_number(text: &str) -> Option<u32> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("12/03/2024"), "12032024");
        assert_eq!(digits_only("2024-03-12 10:15"), "202403121015");
        assert_eq!(digits_only("n/a"), "");
    }

    #[test]
    fn test_parse_page_number() {
        assert_eq!(parse_page_number(" 12 "), Some(12));
        assert_eq!(parse_page_number("1,204"), Some(1204));
        assert_eq!(parse_page_number("Page"), None);
        assert_eq!(parse_page_number(""), None);
    }
}
