//! Conversion of human formatted phone numbers into dialable `tel:` URIs.

/// Builds the `tel:` href for a display phone number.
///
/// Extensions introduced by `ext` or `x` (any case) are appended after a
/// double comma, which mobile dialers treat as a pause before keying the
/// extension. An empty input yields an empty href.
pub fn phone_href(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    match find_extension_marker(raw) {
        Some(index) => format!(
            "tel:+1{},,{}",
            digits_only(&raw[..index]),
            digits_only(&raw[index..])
        ),
        None => format!("tel:+1{}", digits_only(raw)),
    }
}

/// Returns the byte offset of the first `ext` or `x` marker, compared
/// ASCII case-insensitively.
pub fn find_extension_marker(raw: &str) -> Option<usize> {
    raw.char_indices().map(|(index, _)| index).find(|&index| {
        let rest = &raw.as_bytes()[index..];
        match rest.first() {
            Some(b) if b.eq_ignore_ascii_case(&b'x') => true,
            _ => rest.len() >= 3 && rest[..3].eq_ignore_ascii_case(b"ext"),
        }
    })
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number_keeps_digits_in_order() {
        assert_eq!(phone_href("123-456-7890"), "tel:+11234567890");
        assert_eq!(phone_href("(877) 477-9677"), "tel:+18774779677");
    }

    #[test]
    fn ext_marker_splits_main_and_extension() {
        assert_eq!(phone_href("(877) 477-9677 ext. 116"), "tel:+18774779677,,116");
        assert_eq!(phone_href("877.477.9677 EXT 42"), "tel:+18774779677,,42");
    }

    #[test]
    fn x_marker_is_case_insensitive() {
        assert_eq!(phone_href("555-0100 x12"), "tel:+15550100,,12");
        assert_eq!(phone_href("555-0100X 7"), "tel:+15550100,,7");
        assert_eq!(phone_href("555-0100 x.  9"), "tel:+15550100,,9");
    }

    #[test]
    fn empty_input_yields_empty_href() {
        assert_eq!(phone_href(""), "");
    }

    #[test]
    fn first_marker_wins() {
        // "ext" starts before the "x" inside it.
        assert_eq!(find_extension_marker("12 ext 3"), Some(3));
        assert_eq!(find_extension_marker("1 x 2 ext 3"), Some(2));
        assert_eq!(find_extension_marker("123"), None);
    }

    #[test]
    fn marker_without_extension_digits_keeps_trailing_pause() {
        assert_eq!(phone_href("555-0100 ext"), "tel:+15550100,,");
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        assert_eq!(phone_href("☎ 555 0100"), "tel:+15550100");
        assert_eq!(phone_href("☎ 555 ×0100 x1"), "tel:+15550100,,1");
    }
}
