//! String utility functions for text processing

/// Case-insensitive ASCII prefix test
pub fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.is_char_boundary(prefix.len())
        && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Strip one layer of surrounding `ch` from both ends after trimming whitespace
pub fn trim_of(s: &str, ch: char) -> &str {
    let s = s.trim();
    let s = s.strip_prefix(ch).unwrap_or(s);
    s.strip_suffix(ch).unwrap_or(s)
}

/// Interprets common truthy spellings
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_of() {
        assert_eq!(trim_of(" \"quoted\" ", '"'), "quoted");
        assert_eq!(trim_of("'x", '\''), "x");
        assert_eq!(trim_of("plain", '"'), "plain");
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_starts_with_ignore_case() {
        assert!(starts_with_ignore_case("HOST-SUFFIX,a.com", "host-suffix"));
        assert!(!starts_with_ignore_case("ho", "host"));
    }
}
