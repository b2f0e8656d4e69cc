/// Profile display name when set and non-blank, otherwise the username.
pub fn display_name<'a>(display_name: Option<&'a str>, username: &'a str) -> &'a str {
    display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username)
}

/// Shorten `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let keep = max_chars.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

/// Accept a post-login redirect target only when it stays on this site.
pub fn local_redirect_target(next: Option<&str>) -> Option<&str> {
    next.map(str::trim)
        .filter(|next| next.starts_with('/') && !next.starts_with("//") && !next.contains('\\'))
}

/// Percent-encode a query string value.
pub fn encode_query_component(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{display_name, encode_query_component, local_redirect_target, truncate_chars};

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(display_name(Some("Alice A."), "alice"), "Alice A.");
        assert_eq!(display_name(Some("   "), "alice"), "alice");
        assert_eq!(display_name(None, "alice"), "alice");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("ééééé", 3), "éé…");
    }

    #[test]
    fn only_local_paths_are_redirect_targets() {
        assert_eq!(local_redirect_target(Some("/teams/x")), Some("/teams/x"));
        assert_eq!(local_redirect_target(Some("//evil.example")), None);
        assert_eq!(local_redirect_target(Some("https://evil.example")), None);
        assert_eq!(local_redirect_target(Some("/\\evil")), None);
        assert_eq!(local_redirect_target(None), None);
    }

    #[test]
    fn query_components_are_percent_encoded() {
        assert_eq!(encode_query_component("/teams/new"), "%2Fteams%2Fnew");
        assert_eq!(encode_query_component("/a?b=c&d"), "%2Fa%3Fb%3Dc%26d");
        assert_eq!(encode_query_component("a-b_c.d~"), "a-b_c.d~");
        assert_eq!(encode_query_component("é"), "%C3%A9");
    }
}
