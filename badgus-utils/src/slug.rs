use std::sync::LazyLock;

use regex::Regex;

/// Longest slug the schema accepts.
pub const MAX_SLUG_CHARS: usize = 50;

static DASH_SPACING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*").expect("dash spacing pattern is valid"));
static SPACE_OR_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s/]").expect("space pattern is valid"));
static NUMERIC_COLON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d):(\d)").expect("numeric colon pattern is valid"));
static DROPPED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[?,:!@#~`+=$%^&\\*()\[\]{}<>]").expect("dropped chars pattern is valid")
});

/// Build a URL slug that keeps non-ascii characters.
///
/// Browsers display non-ascii path segments as readable glyphs, so only the
/// characters that turn into unreadable escapes (`?`, `%`, ...) are dropped.
/// Whitespace and slashes become dashes, `10:30` becomes `10-30`, and double
/// quotes become single quotes. Case is preserved.
pub fn slugify(raw: &str) -> String {
    let txt = raw.trim();
    let txt = DASH_SPACING.replace_all(txt, "-");
    let txt = SPACE_OR_SLASH.replace_all(&txt, "-");
    let txt = NUMERIC_COLON.replace_all(&txt, "${1}-${2}");
    let txt = txt.replace('"', "'");
    let txt = DROPPED_CHARS.replace_all(&txt, "");

    let truncated: String = txt.chars().take(MAX_SLUG_CHARS).collect();
    truncated.trim_end_matches('-').to_owned()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{MAX_SLUG_CHARS, slugify};

    #[rstest]
    #[case("Alpha Team", "Alpha-Team")]
    #[case("  padded  ", "padded")]
    #[case("left - right", "left-right")]
    #[case("a/b c", "a-b-c")]
    #[case("meet at 10:30", "meet-at-10-30")]
    #[case("say \"hi\"", "say-'hi'")]
    #[case("what?! (really)", "what-really")]
    #[case("Équipe Café", "Équipe-Café")]
    fn slugify_cases(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(slugify(input), expected);
    }

    #[test]
    fn long_names_are_truncated_without_trailing_dash() {
        let name = format!("{} tail", "x".repeat(MAX_SLUG_CHARS - 1));
        let slug = slugify(&name);
        assert_eq!(slug.chars().count(), MAX_SLUG_CHARS - 1);
        assert!(!slug.ends_with('-'));
    }

    #[test]
    fn punctuation_only_yields_empty_slug() {
        assert_eq!(slugify("?!?"), "");
    }
}
