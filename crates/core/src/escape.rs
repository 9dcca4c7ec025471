use std::borrow::Cow;

/// Escapes the characters that are significant in HTML text and quoted
/// attribute values.
///
/// Returns the input unchanged (borrowed) when nothing needs escaping.
pub fn escape_html(input: &str) -> Cow<'_, str> {
    let Some(first) = input.find(needs_escape) else {
        return Cow::Borrowed(input);
    };

    let mut out = String::with_capacity(input.len() + 16);
    out.push_str(&input[..first]);
    for ch in input[first..].chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

fn needs_escape(ch: char) -> bool {
    matches!(ch, '&' | '<' | '>' | '"' | '\'')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_borrowed() {
        let escaped = escape_html("Sam Burkan");
        assert!(matches!(escaped, Cow::Borrowed("Sam Burkan")));
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<b class="x">Tom & Jerry's</b>"#),
            "&lt;b class=&quot;x&quot;&gt;Tom &amp; Jerry&#x27;s&lt;/b&gt;"
        );
    }

    #[test]
    fn keeps_prefix_and_multibyte_text() {
        assert_eq!(escape_html("Zoë <CEO>"), "Zoë &lt;CEO&gt;");
    }
}
