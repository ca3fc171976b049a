//! Small text scanners shared by the dialect parsers.

/// `true` if `s` is exactly four dot-separated decimal groups.
#[must_use]
pub fn is_dotted_quad(s: &str) -> bool {
    let mut groups = 0;
    for group in s.split('.') {
        if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        groups += 1;
    }
    groups == 4
}

/// First `d+.d+.d+.d+` run in `text`, scanning left to right.
pub(crate) fn find_dotted_quad(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            if let Some(end) = quad_end(bytes, i) {
                return Some(&text[i..end]);
            }
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
        } else {
            i += 1;
        }
    }
    None
}

fn quad_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut pos = start;
    for group in 0..4 {
        if group > 0 {
            if bytes.get(pos) != Some(&b'.') {
                return None;
            }
            pos += 1;
        }
        let digits = bytes[pos..].iter().take_while(|b| b.is_ascii_digit()).count();
        if digits == 0 {
            return None;
        }
        pos += digits;
    }
    Some(pos)
}

/// The text following the first occurrence of `keyword` that starts a word.
pub(crate) fn after_keyword<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let mut offset = 0;
    while let Some(found) = text[offset..].find(keyword) {
        let at = offset + found;
        let starts_word = text[..at]
            .chars()
            .next_back()
            .map_or(true, char::is_whitespace);
        if starts_word {
            return Some(&text[at + keyword.len()..]);
        }
        offset = at + keyword.len();
    }
    None
}

/// Leading ASCII digits of `text`, if any.
pub(crate) fn leading_digits(text: &str) -> Option<&str> {
    let len = text.bytes().take_while(u8::is_ascii_digit).count();
    (len > 0).then(|| &text[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_quad_detection() {
        assert!(is_dotted_quad("192.168.1.1"));
        assert!(!is_dotted_quad("192.168.1"));
        assert!(!is_dotted_quad("192.168.1.1.1"));
        assert!(!is_dotted_quad("192.168.1.x"));
        assert!(!is_dotted_quad(""));
    }

    #[test]
    fn find_dotted_quad_skips_dates_and_versions() {
        assert_eq!(find_dotted_quad("isc-dhcp-4.4.1 lease 10.0.0.7 {"), Some("10.0.0.7"));
        assert_eq!(find_dotted_quad("starts 2 2023/11/14 10:00:00;"), None);
        assert_eq!(find_dotted_quad("x1.2.3.4.5y"), Some("1.2.3.4"));
    }

    #[test]
    fn after_keyword_requires_word_start() {
        assert_eq!(after_keyword("friends 1; ends 2;", "ends "), Some("2;"));
        assert_eq!(after_keyword("friends 1;", "ends "), None);
        assert_eq!(after_keyword("ends 3;", "ends "), Some("3;"));
    }

    #[test]
    fn leading_digits_stops_at_first_non_digit() {
        assert_eq!(leading_digits("600;"), Some("600"));
        assert_eq!(leading_digits(";600"), None);
    }
}
