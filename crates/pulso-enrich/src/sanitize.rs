//! Text cleanup applied before a post is sent to the classifier.

use std::sync::LazyLock;

use regex::Regex;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http[s]?://(?:[a-zA-Z]|[0-9]|[$-_@.&+]|[!*\\(\\),]|(?:%[0-9a-fA-F][0-9a-fA-F]))+")
        .expect("valid regex")
});

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        r"\x{1F600}-\x{1F64F}", // emoticons
        r"\x{1F300}-\x{1F5FF}", // symbols & pictographs
        r"\x{1F680}-\x{1F6FF}", // transport & map
        r"\x{1F1E0}-\x{1F1FF}", // flags
        r"\x{2702}-\x{27B0}",
        r"\x{24C2}-\x{1F251}",
        "]+",
    ))
    .expect("valid regex")
});

/// Remove URLs and emoji, and turn each newline into a space.
///
/// Total over missing input: `None` (an absent cell, or a JSON value that is
/// not a string via [`serde_json::Value::as_str`]) comes back as `""`.
///
/// ```
/// assert_eq!(pulso_enrich::sanitize("check http://x.co now 😀\n"), "check  now  ");
/// assert_eq!(pulso_enrich::sanitize(None::<&str>), "");
/// ```
#[must_use]
pub fn sanitize<'a>(text: impl Into<Option<&'a str>>) -> String {
    let Some(text) = text.into() else {
        return String::new();
    };
    let text = URL_RE.replace_all(text, "");
    let text = EMOJI_RE.replace_all(&text, "");
    text.replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn strips_url_emoji_and_newline() {
        assert_eq!(sanitize("check http://x.co now 😀\n"), "check  now  ");
    }

    #[test]
    fn strips_https_with_path_and_query() {
        assert_eq!(
            sanitize("ver https://t.co/AbC123?x=1&y=%20 ya"),
            "ver  ya"
        );
    }

    #[test]
    fn keeps_spanish_accents() {
        assert_eq!(sanitize("Zury Ríos, ¿qué opinas?"), "Zury Ríos, ¿qué opinas?");
    }

    #[test]
    fn strips_flag_and_dingbat_ranges() {
        assert_eq!(sanitize("GT 🇬🇹 ✅ listo"), "GT   listo");
    }

    #[test]
    fn every_newline_becomes_a_space() {
        assert_eq!(sanitize("a\nb\n\nc"), "a b  c");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(sanitize("sin cambios"), "sin cambios");
    }

    #[test]
    fn non_text_input_becomes_empty() {
        assert_eq!(sanitize(None::<&str>), "");
        assert_eq!(sanitize(json!(null).as_str()), "");
        assert_eq!(sanitize(json!(3.5).as_str()), "");
        assert_eq!(sanitize(json!({"text": "x"}).as_str()), "");
    }

    #[test]
    fn text_value_is_sanitized() {
        assert_eq!(sanitize(json!("hola 😀").as_str()), "hola ");
    }
}
