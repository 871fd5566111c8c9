use serde::Deserialize;

/// A matcher-DSL rule paired with a replacement (rename) or glyph (emoji)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegexMatchConfig {
    #[serde(rename = "match")]
    pub _match: String,
    #[serde(default, alias = "emoji")]
    pub replace: String,
}

impl RegexMatchConfig {
    pub fn new(matcher: &str, replace: &str) -> Self {
        RegexMatchConfig {
            _match: matcher.to_string(),
            replace: replace.to_string(),
        }
    }

    /// Parses `match<delimiter>replace`, splitting at the last delimiter
    pub fn from_ini(line: &str, delimiter: char) -> Option<RegexMatchConfig> {
        let (matcher, replace) = line.rsplit_once(delimiter)?;
        if matcher.is_empty() {
            return None;
        }
        Some(RegexMatchConfig::new(matcher, replace))
    }
}

/// Collection of regex match configurations
pub type RegexMatchConfigs = Vec<RegexMatchConfig>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ini() {
        let r = RegexMatchConfig::from_ini("(?i)hong kong@HK", '@').unwrap();
        assert_eq!(r._match, "(?i)hong kong");
        assert_eq!(r.replace, "HK");

        let e = RegexMatchConfig::from_ini("!!GROUP=a,b!!HK,🇭🇰", ',').unwrap();
        assert_eq!(e._match, "!!GROUP=a,b!!HK");
        assert_eq!(e.replace, "🇭🇰");

        assert!(RegexMatchConfig::from_ini("no-delimiter", '@').is_none());
    }
}
