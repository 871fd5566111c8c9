use crate::models::Proxy;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref GROUPID_REGEX: Regex = Regex::new(r"^!!(?:GROUPID)=([\d\-+!,]*)(?:!!(.*))?$").unwrap();
    static ref GROUP_REGEX: Regex = Regex::new(r"^!!(?:GROUP)=(.+?)(?:!!(.*))?$").unwrap();
    static ref TYPE_REGEX: Regex = Regex::new(r"^!!(?:TYPE)=(.+?)(?:!!(.*))?$").unwrap();
    static ref PORT_REGEX: Regex = Regex::new(r"^!!(?:PORT)=(.*?)(?:!!(.*))?$").unwrap();
    static ref SERVER_REGEX: Regex = Regex::new(r"^!!(?:SERVER)=(.+?)(?:!!(.*))?$").unwrap();
}

/// Match a rule against a proxy node
///
/// # Arguments
/// * `rule` - The rule to match
/// * `real_rule` - Receives the trailing remark pattern left after the `!!KEY=VALUE` part
/// * `node` - The proxy node to match against
///
/// # Returns
/// * `true` if the key part matches, or the rule has no key part at all
/// * `false` otherwise
pub fn apply_matcher(rule: &str, real_rule: &mut String, node: &Proxy) -> bool {
    let (regex, target): (&Regex, Target) = if rule.starts_with("!!GROUP=") {
        (&GROUP_REGEX, Target::Text(&node.group))
    } else if rule.starts_with("!!GROUPID=") {
        (&GROUPID_REGEX, Target::Number(node.group_id))
    } else if rule.starts_with("!!TYPE=") {
        (&TYPE_REGEX, Target::Type(node.type_name()))
    } else if rule.starts_with("!!PORT=") {
        (&PORT_REGEX, Target::Number(node.port as i32))
    } else if rule.starts_with("!!SERVER=") {
        (&SERVER_REGEX, Target::Text(&node.hostname))
    } else {
        *real_rule = rule.to_string();
        return true;
    };

    let Some(captures) = regex.captures(rule) else {
        real_rule.clear();
        return false;
    };
    let pattern = captures.get(1).map_or("", |m| m.as_str());
    *real_rule = captures.get(2).map_or("", |m| m.as_str()).to_string();

    match target {
        Target::Text(text) => reg_find(text, pattern),
        Target::Number(n) => match_range(pattern, n),
        Target::Type(type_name) => {
            if type_name.is_empty() {
                return false;
            }
            reg_match(&type_name, pattern)
        }
    }
}

enum Target<'a> {
    Text(&'a str),
    Number(i32),
    Type(String),
}

/// Full membership test shared by filter, rename, emoji and group rendering.
///
/// The key part must match, and a non-empty trailing pattern must also be
/// found in the node's remark.
pub fn match_node(rule: &str, node: &Proxy) -> bool {
    let mut real_rule = String::new();
    if !apply_matcher(rule, &mut real_rule, node) {
        return false;
    }
    real_rule.is_empty() || reg_find(&node.remark, &real_rule)
}

/// Match a number against a range specification
///
/// Range specification can include:
/// * Single numbers: "1", "443"
/// * Inclusive spans: "8000-9000"
/// * Negation of the whole list: "!1-10"
/// * Several of the above: "1-10,20-30,50"
///
/// An empty specification matches every number. A span whose ends are not
/// both numbers matches nothing.
pub fn match_range(range: &str, target: i32) -> bool {
    let range = range.trim();
    if range.is_empty() {
        return true;
    }

    let mut negate = false;
    let mut matched = false;

    for range_part in range.split(',') {
        let mut part = range_part.trim();

        if let Some(rest) = part.strip_prefix('!') {
            negate = true;
            part = rest;
        }
        let part = part.trim_start_matches('+');

        if let Some((low, high)) = part.split_once('-') {
            let (Ok(lower), Ok(upper)) = (low.trim().parse::<i32>(), high.trim().parse::<i32>()) else {
                continue;
            };
            if target >= lower && target <= upper {
                matched = true;
                break;
            }
        } else if let Ok(exact) = part.parse::<i32>() {
            if target == exact {
                matched = true;
                break;
            }
        }
    }

    matched != negate
}

/// Case-insensitive search for `pattern` in `text`.
///
/// An empty pattern always matches. A pattern that is not a valid regex
/// falls back to a case-insensitive substring test.
pub fn reg_find(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }

    match Regex::new(&format!("(?i){}", pattern)) {
        Ok(re) => re.is_match(text),
        Err(_) => text.to_lowercase().contains(&pattern.to_lowercase()),
    }
}

/// Case-insensitive full match; alternations in `pattern` are grouped as a whole
pub fn reg_match(text: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }

    match Regex::new(&format!("(?i)^(?:{})$", pattern)) {
        Ok(re) => re.is_match(text),
        Err(_) => text.eq_ignore_ascii_case(pattern),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::proxy::{ProxyKind, ShadowsocksInfo};

    fn create_test_proxy() -> Proxy {
        let mut node = Proxy::new(
            ProxyKind::Shadowsocks(ShadowsocksInfo {
                method: "aes-256-gcm".to_string(),
                password: "password".to_string(),
                ..Default::default()
            }),
            "TestRemark",
            "example.com",
            8388,
        );
        node.group = "TestGroup".to_string();
        node.group_id = 2;
        node
    }

    #[test]
    fn test_match_range_simple() {
        assert!(match_range("5", 5));
        assert!(!match_range("5", 6));
    }

    #[test]
    fn test_match_range_lists_and_spans() {
        assert!(match_range("8000-9000,443", 8388));
        assert!(match_range("8000-9000,443", 443));
        assert!(!match_range("8000-9000,443", 80));
    }

    #[test]
    fn test_match_range_empty_matches_everything() {
        for x in [0, 1, 443, 65535, -3] {
            assert!(match_range("", x));
        }
    }

    #[test]
    fn test_match_range_with_negation() {
        assert!(!match_range("!5", 5));
        assert!(match_range("!5", 6));
        assert!(!match_range("!1-10", 5));
        assert!(match_range("!1-10", 11));
    }

    #[test]
    fn test_match_range_rejects_garbage_spans() {
        assert!(!match_range("abc-def", 5));
        assert!(!match_range("8000-", 65000));
        assert!(!match_range("-100", 5));
        assert!(!match_range("abc", 5));
        assert!(match_range("abc-def,5", 5));
        assert!(match_range("!abc-def", 5));
    }

    #[test]
    fn test_reg_find() {
        assert!(reg_find("This is a test", "TEST"));
        assert!(!reg_find("This is a test", "banana"));
        assert!(reg_find("This is a test", ""));
        // invalid regex degrades to substring
        assert!(reg_find("node (HK", "(HK"));
        assert!(!reg_find("node US", "(HK"));
    }

    #[test]
    fn test_reg_match_groups_alternation() {
        assert!(reg_match("ss", "SS|VMess"));
        assert!(reg_match("vmess", "SS|VMess"));
        assert!(!reg_match("ssr", "SS|VMess"));
    }

    #[test]
    fn test_apply_matcher_type_alternation() {
        let node = create_test_proxy();
        let mut real_rule = String::from("stale");
        assert!(apply_matcher("!!TYPE=SS|VMess", &mut real_rule, &node));
        assert_eq!(real_rule, "");
        assert!(!apply_matcher("!!TYPE=S", &mut real_rule, &node));
    }

    #[test]
    fn test_apply_matcher_group() {
        let node = create_test_proxy();
        let mut real_rule = String::new();

        assert!(apply_matcher("!!GROUP=TestGroup!!trailing", &mut real_rule, &node));
        assert_eq!(real_rule, "trailing");
        assert!(!apply_matcher("!!GROUP=OtherGroup", &mut real_rule, &node));
    }

    #[test]
    fn test_apply_matcher_groupid_and_port() {
        let node = create_test_proxy();
        let mut real_rule = String::new();
        assert!(apply_matcher("!!GROUPID=1-5", &mut real_rule, &node));
        assert!(!apply_matcher("!!GROUPID=3", &mut real_rule, &node));
        assert!(apply_matcher("!!PORT=8000-9000,443", &mut real_rule, &node));
        assert!(apply_matcher("!!PORT=", &mut real_rule, &node));
        assert!(!apply_matcher("!!PORT=443", &mut real_rule, &node));
    }

    #[test]
    fn test_apply_matcher_server() {
        let node = create_test_proxy();
        let mut real_rule = String::new();
        assert!(apply_matcher("!!SERVER=.*\\.com", &mut real_rule, &node));
        assert!(!apply_matcher("!!SERVER=google", &mut real_rule, &node));
    }

    #[test]
    fn test_match_node_requires_trailing_pattern() {
        let node = create_test_proxy();
        assert!(match_node("!!GROUP=Test!!Remark", &node));
        assert!(!match_node("!!GROUP=Test!!Other", &node));
        assert!(match_node("testremark", &node));
        assert!(!match_node("HK", &node));
    }
}
