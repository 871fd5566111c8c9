//! Ruleset normalization and per-target rule rendering.
//!
//! Fetched ruleset text is first normalized into Clash-style typed lines
//! (`TYPE,VALUE[,no-resolve]`), then bound to its policy group and
//! translated into each target's token grammar.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde_json::{json, Map, Value};

use crate::models::{RulesetBody, RulesetContent, RulesetType};
use crate::utils::string::starts_with_ignore_case;

lazy_static! {
    static ref PAYLOAD_ITEM: Regex = Regex::new(r#"^\s*-\s*['"]?(.*?)['"]?\s*$"#).unwrap();
}

const DEFAULT_REFRESH_INTERVAL: u32 = 86400;

/// Rule grammar of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFlavor {
    Clash,
    Surge,
    Loon,
    QuanX,
}

/// A ruleset that could not be fetched, rendered as a remote reference
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRuleset {
    /// Provider name, unique within one render
    pub name: String,
    pub group: String,
    pub location: String,
    pub kind: RulesetType,
    /// Refresh interval in seconds, 0 when unspecified
    pub interval: u32,
}

impl RemoteRuleset {
    /// Configured refresh interval, or one day
    pub fn refresh_interval(&self) -> u32 {
        if self.interval == 0 {
            DEFAULT_REFRESH_INTERVAL
        } else {
            self.interval
        }
    }
}

/// Rule lines for one target plus the references it could not inline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedRules {
    pub rules: Vec<String>,
    pub remote: Vec<RemoteRuleset>,
}

/// Derives a provider name from the last path segment of `location`
fn provider_name(location: &str, taken: &[RemoteRuleset]) -> String {
    let segment = location
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("");
    let stem = segment.split('?').next().unwrap_or("");
    let stem = stem.rsplit_once('.').map_or(stem, |(s, _)| s);
    let mut base: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if base.is_empty() {
        base = "ruleset".to_string();
    }
    let mut name = base.clone();
    let mut n = 1;
    while taken.iter().any(|r| r.name == name) {
        n += 1;
        name = format!("{}_{}", base, n);
    }
    name
}

/// Rewrites legacy type names to their canonical spelling
fn canonical_type(rule_type: &str) -> String {
    let upper = rule_type.trim().to_ascii_uppercase();
    match upper.as_str() {
        "HOST" => "DOMAIN".to_string(),
        "HOST-SUFFIX" => "DOMAIN-SUFFIX".to_string(),
        "HOST-KEYWORD" => "DOMAIN-KEYWORD".to_string(),
        "HOST-WILDCARD" => "DOMAIN-WILDCARD".to_string(),
        "IP6-CIDR" => "IP-CIDR6".to_string(),
        "DEST-PORT" => "DST-PORT".to_string(),
        "FINAL" => "MATCH".to_string(),
        _ => upper,
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Types a bare payload value as a domain or CIDR rule
fn type_payload_value(value: &str, kind: RulesetType) -> Option<String> {
    if value.is_empty() {
        return None;
    }
    if kind == RulesetType::ClashIpcidr || (value.contains('/') && kind != RulesetType::ClashDomain) {
        let rule_type = if value.contains(':') { "IP-CIDR6" } else { "IP-CIDR" };
        return Some(format!("{},{}", rule_type, value));
    }
    if let Some(suffix) = value.strip_prefix("+.").or_else(|| value.strip_prefix('.')) {
        return Some(format!("DOMAIN-SUFFIX,{}", suffix));
    }
    if let Some(keyword) = value.strip_suffix(".*") {
        return Some(format!("DOMAIN-KEYWORD,{}", keyword));
    }
    Some(format!("DOMAIN,{}", value))
}

/// Normalizes one already-typed line; QuanX lines lose their trailing policy
fn normalize_typed_line(line: &str, kind: RulesetType) -> Option<String> {
    let line = strip_comment(line);
    if line.is_empty() {
        return None;
    }
    let mut parts: Vec<String> = line.split(',').map(|p| p.trim().to_string()).collect();
    parts[0] = canonical_type(&parts[0]);
    if kind == RulesetType::QuanX && parts.len() >= 3 && !parts[parts.len() - 1].eq_ignore_ascii_case("no-resolve") {
        parts.pop();
    }
    if parts.len() < 2 && parts[0] != "MATCH" {
        return None;
    }
    Some(parts.join(","))
}

/// Normalizes a fetched ruleset document into typed rule lines without a policy.
///
/// Clash `payload:` documents are read item by item; anything else is taken
/// as one typed rule per line. Comments (`#`, `;`, `//`) are dropped.
pub fn normalize_ruleset(text: &str, kind: RulesetType) -> Vec<String> {
    let is_payload = text.lines().any(|l| l.trim_start().starts_with("payload:"));
    let mut rules = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') || line.starts_with("//") {
            continue;
        }
        if line.starts_with("payload:") {
            continue;
        }
        let normalized = if is_payload {
            let Some(item) = PAYLOAD_ITEM.captures(line).and_then(|c| c.get(1)) else {
                continue;
            };
            let item = strip_comment(item.as_str());
            if item.contains(',') {
                normalize_typed_line(item, kind)
            } else {
                type_payload_value(item, kind)
            }
        } else if kind == RulesetType::ClashDomain || kind == RulesetType::ClashIpcidr {
            type_payload_value(strip_comment(line), kind)
        } else {
            normalize_typed_line(line, kind)
        };
        if let Some(rule) = normalized {
            rules.push(rule);
        }
    }
    rules
}

/// Binds a typed rule to its policy, keeping a trailing `no-resolve` last
pub fn attach_group(rule: &str, group: &str) -> String {
    match rule.rsplit_once(',') {
        Some((head, tail)) if tail.trim().eq_ignore_ascii_case("no-resolve") => {
            format!("{},{},{}", head, group, tail.trim())
        }
        _ => format!("{},{}", rule, group),
    }
}

/// Translates a canonical rule with policy into the target grammar, `None`
/// when the target has no such rule type
pub fn convert_rule(rule: &str, flavor: RuleFlavor) -> Option<String> {
    let (rule_type, rest) = match rule.split_once(',') {
        Some((t, r)) => (canonical_type(t), r.to_string()),
        None => (canonical_type(rule), String::new()),
    };
    let logical = matches!(rule_type.as_str(), "AND" | "OR" | "NOT");

    let target_type = match flavor {
        RuleFlavor::Clash => match rule_type.as_str() {
            "DOMAIN" | "DOMAIN-SUFFIX" | "DOMAIN-KEYWORD" | "DOMAIN-REGEX" | "GEOSITE" | "GEOIP" | "IP-CIDR"
            | "IP-CIDR6" | "IP-ASN" | "SRC-IP-CIDR" | "SRC-PORT" | "DST-PORT" | "PROCESS-NAME" | "PROCESS-PATH"
            | "NETWORK" | "RULE-SET" | "MATCH" => rule_type.clone(),
            _ if logical => rule_type.clone(),
            _ => return None,
        },
        RuleFlavor::Surge | RuleFlavor::Loon => match rule_type.as_str() {
            "MATCH" => "FINAL".to_string(),
            "DST-PORT" => "DEST-PORT".to_string(),
            "SRC-IP-CIDR" => "SRC-IP".to_string(),
            "DOMAIN" | "DOMAIN-SUFFIX" | "DOMAIN-KEYWORD" | "GEOIP" | "IP-CIDR" | "IP-CIDR6" | "IP-ASN"
            | "USER-AGENT" | "URL-REGEX" | "RULE-SET" => rule_type.clone(),
            "PROCESS-NAME" | "DOMAIN-WILDCARD" if flavor == RuleFlavor::Surge => rule_type.clone(),
            _ if logical => rule_type.clone(),
            _ => return None,
        },
        RuleFlavor::QuanX => match rule_type.as_str() {
            "DOMAIN" => "HOST".to_string(),
            "DOMAIN-SUFFIX" => "HOST-SUFFIX".to_string(),
            "DOMAIN-KEYWORD" => "HOST-KEYWORD".to_string(),
            "DOMAIN-WILDCARD" => "HOST-WILDCARD".to_string(),
            "IP-CIDR6" => "IP6-CIDR".to_string(),
            "MATCH" => "FINAL".to_string(),
            "IP-CIDR" | "GEOIP" | "IP-ASN" | "USER-AGENT" => rule_type.clone(),
            _ => return None,
        },
    };

    let mut rest = rest;
    if flavor == RuleFlavor::QuanX {
        if let Some(stripped) = rest.strip_suffix(",no-resolve") {
            rest = stripped.to_string();
        }
    }
    if rest.is_empty() {
        Some(target_type)
    } else {
        Some(format!("{},{}", target_type, rest))
    }
}

/// Renders raw rules and rulesets into one ordered rule list for a target.
///
/// Raw rules come first, in their own order, followed by every ruleset.
/// An inline `[]FINAL` becomes `MATCH,<group>` in place and is the only
/// thing that suppresses the closing `MATCH,DIRECT` (`FINAL,DIRECT`).
pub fn ruleset_to_rules(raw_rules: &[String], rulesets: &[RulesetContent], flavor: RuleFlavor) -> RenderedRules {
    let mut rendered = RenderedRules::default();
    let mut canonical: Vec<String> = Vec::new();
    let mut has_final = false;

    for rule in raw_rules {
        let rule = strip_comment(rule);
        if !rule.is_empty() {
            canonical.push(rule.to_string());
        }
    }

    for ruleset in rulesets {
        match &ruleset.body {
            RulesetBody::Inline(rule) => {
                if starts_with_ignore_case(rule, "FINAL") || starts_with_ignore_case(rule, "MATCH") {
                    if !has_final {
                        canonical.push(format!("MATCH,{}", ruleset.group));
                        has_final = true;
                    }
                } else {
                    canonical.push(attach_group(rule, &ruleset.group));
                }
            }
            RulesetBody::Fetched { kind, text } => {
                canonical.extend(
                    normalize_ruleset(text, *kind)
                        .iter()
                        .map(|rule| attach_group(rule, &ruleset.group)),
                );
            }
            RulesetBody::Unavailable { location, kind, interval } => {
                let remote = RemoteRuleset {
                    name: provider_name(location, &rendered.remote),
                    group: ruleset.group.clone(),
                    location: location.clone(),
                    kind: *kind,
                    interval: *interval,
                };
                let reference = match flavor {
                    RuleFlavor::Clash => &remote.name,
                    _ => &remote.location,
                };
                canonical.push(format!("RULE-SET,{},{}", reference, ruleset.group));
                rendered.remote.push(remote);
            }
        }
    }

    if !has_final {
        canonical.push("MATCH,DIRECT".to_string());
    }
    for rule in canonical {
        match convert_rule(&rule, flavor) {
            Some(converted) => rendered.rules.push(converted),
            None => debug!("rule `{}` has no {:?} equivalent", rule, flavor),
        }
    }
    rendered
}

fn singbox_field(rule_type: &str) -> Option<&'static str> {
    Some(match rule_type {
        "DOMAIN" => "domain",
        "DOMAIN-SUFFIX" => "domain_suffix",
        "DOMAIN-KEYWORD" => "domain_keyword",
        "DOMAIN-REGEX" => "domain_regex",
        "IP-CIDR" | "IP-CIDR6" => "ip_cidr",
        "SRC-IP-CIDR" => "source_ip_cidr",
        "DST-PORT" => "port",
        "SRC-PORT" => "source_port",
        "PROCESS-NAME" => "process_name",
        "PROCESS-PATH" => "process_path",
        "RULE-SET" => "rule_set",
        _ => return None,
    })
}

/// sing-box route rules: one rule object per matched field and policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SingBoxRules {
    pub rules: Vec<Value>,
    pub remote: Vec<RemoteRuleset>,
    /// Policy of the closing rule, for `route.final`
    pub final_outbound: String,
}

pub fn ruleset_to_singbox(raw_rules: &[String], rulesets: &[RulesetContent]) -> SingBoxRules {
    let clash = ruleset_to_rules(raw_rules, rulesets, RuleFlavor::Clash);
    let mut out = SingBoxRules {
        remote: clash.remote,
        final_outbound: "DIRECT".to_string(),
        ..Default::default()
    };

    // (outbound, field) -> values, in first-seen order
    let mut buckets: Vec<((String, &'static str), Vec<Value>)> = Vec::new();
    for rule in &clash.rules {
        let parts: Vec<&str> = rule.split(',').map(str::trim).collect();
        // rules after the first MATCH are unreachable
        if parts[0] == "MATCH" {
            if let Some(group) = parts.get(1) {
                out.final_outbound = group.to_string();
            }
            break;
        }
        if parts.len() < 3 {
            continue;
        }
        let (rule_type, value, group) = (parts[0], parts[1], parts[2]);
        if rule_type == "GEOIP" && value.eq_ignore_ascii_case("private") {
            push_bucket(&mut buckets, group, "ip_is_private", Value::Bool(true));
            continue;
        }
        let Some(field) = singbox_field(rule_type) else {
            debug!("rule `{}` has no sing-box equivalent", rule);
            continue;
        };
        let value = match field {
            "port" | "source_port" => match value.parse::<u16>() {
                Ok(port) => json!(port),
                Err(_) => continue,
            },
            _ => json!(value),
        };
        push_bucket(&mut buckets, group, field, value);
    }

    for ((group, field), values) in buckets {
        let mut rule = Map::new();
        if field == "ip_is_private" {
            rule.insert(field.to_string(), Value::Bool(true));
        } else {
            rule.insert(field.to_string(), Value::Array(values));
        }
        rule.insert("outbound".to_string(), Value::String(group));
        out.rules.push(Value::Object(rule));
    }
    out
}

fn push_bucket(buckets: &mut Vec<((String, &'static str), Vec<Value>)>, group: &str, field: &'static str, value: Value) {
    match buckets.iter_mut().find(|((g, f), _)| g == group && *f == field) {
        Some((_, values)) => values.push(value),
        None => buckets.push(((group.to_string(), field), vec![value])),
    }
}
