//! Serde shapes shared by the YAML and TOML settings documents.
//!
//! Structured list items are lowered to the same textual lines the INI
//! form uses, so imports and parsing run through one path.

use serde::Deserialize;

fn default_true() -> bool {
    true
}

fn default_base_path() -> String {
    "base".to_string()
}

fn default_none() -> String {
    "NONE".to_string()
}

fn default_system() -> String {
    "SYSTEM".to_string()
}

fn default_local_port() -> u16 {
    1080
}

/// Rename or emoji rule
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegexMatchRuleItem {
    #[serde(rename = "match")]
    pub match_str: Option<String>,
    pub replace: Option<String>,
    pub emoji: Option<String>,
    pub script: Option<String>,
    pub import: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesetItem {
    pub import: Option<String>,
    pub group: String,
    pub ruleset: String,
    pub rule: String,
    pub interval: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProxyGroupItem {
    pub import: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub rule: Vec<String>,
    pub url: String,
    pub interval: Option<u32>,
    pub timeout: Option<u32>,
    pub tolerance: Option<u32>,
}

/// Lowering of a structured item to its textual line
pub trait ToIni {
    /// `None` when the item carries nothing usable
    fn to_ini(&self) -> Option<String>;
}

fn import_line(import: &Option<String>) -> Option<String> {
    import
        .as_deref()
        .filter(|i| !i.is_empty())
        .map(|i| format!("!!import:{}", i))
}

impl RegexMatchRuleItem {
    fn lower(&self, delimiter: char, value: &Option<String>) -> Option<String> {
        if let Some(script) = self.script.as_deref().filter(|s| !s.is_empty()) {
            return Some(format!("!!script:{}", script));
        }
        if let Some(import) = import_line(&self.import) {
            return Some(import);
        }
        match (&self.match_str, value) {
            (Some(m), Some(v)) if !m.is_empty() => Some(format!("{}{}{}", m, delimiter, v)),
            _ => None,
        }
    }

    /// `match@replace`
    pub fn to_rename_line(&self) -> Option<String> {
        self.lower('@', &self.replace)
    }

    /// `match,emoji`
    pub fn to_emoji_line(&self) -> Option<String> {
        self.lower(',', &self.emoji)
    }
}

impl ToIni for RulesetItem {
    fn to_ini(&self) -> Option<String> {
        if let Some(import) = import_line(&self.import) {
            return Some(import);
        }
        if self.group.is_empty() {
            return None;
        }
        if !self.ruleset.is_empty() {
            return Some(match self.interval {
                Some(interval) => format!("{},{},{}", self.group, self.ruleset, interval),
                None => format!("{},{}", self.group, self.ruleset),
            });
        }
        if !self.rule.is_empty() {
            return Some(format!("{},[]{}", self.group, self.rule));
        }
        None
    }
}

impl ToIni for ProxyGroupItem {
    fn to_ini(&self) -> Option<String> {
        if let Some(import) = import_line(&self.import) {
            return Some(import);
        }
        if self.name.is_empty() || self.group_type.is_empty() {
            return None;
        }
        let mut parts = vec![self.name.clone(), self.group_type.clone()];
        parts.extend(self.rule.iter().cloned());
        if !self.url.is_empty() {
            parts.push(self.url.clone());
            let mut tuning = self.interval.unwrap_or(0).to_string();
            if self.timeout.is_some() || self.tolerance.is_some() {
                tuning.push_str(&format!(",{}", self.timeout.unwrap_or(0)));
            }
            if let Some(tolerance) = self.tolerance {
                tuning.push_str(&format!(",{}", tolerance));
            }
            parts.push(tuning);
        }
        Some(parts.join("`"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommonSettings {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    pub clash_rule_base: String,
    pub surge_rule_base: String,
    pub loon_rule_base: String,
    pub quanx_rule_base: String,
    pub singbox_rule_base: String,
    pub exclude_remarks: Vec<String>,
    pub include_remarks: Vec<String>,
    #[serde(default = "default_none")]
    pub proxy_subscription: String,
    #[serde(default = "default_system")]
    pub proxy_ruleset: String,
}

impl Default for CommonSettings {
    fn default() -> Self {
        CommonSettings {
            base_path: default_base_path(),
            clash_rule_base: String::new(),
            surge_rule_base: String::new(),
            loon_rule_base: String::new(),
            quanx_rule_base: String::new(),
            singbox_rule_base: String::new(),
            exclude_remarks: Vec::new(),
            include_remarks: Vec::new(),
            proxy_subscription: default_none(),
            proxy_ruleset: default_system(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodePreferences {
    pub udp_flag: Option<bool>,
    pub tcp_fast_open_flag: Option<bool>,
    pub skip_cert_verify_flag: Option<bool>,
    pub tls13_flag: Option<bool>,
    pub sort_flag: bool,
    pub filter_deprecated_nodes: bool,
    #[serde(default = "default_true")]
    pub singbox_add_clash_modes: bool,
    pub rename_node: Vec<RegexMatchRuleItem>,
}

impl Default for NodePreferences {
    fn default() -> Self {
        NodePreferences {
            udp_flag: None,
            tcp_fast_open_flag: None,
            skip_cert_verify_flag: None,
            tls13_flag: None,
            sort_flag: false,
            filter_deprecated_nodes: false,
            singbox_add_clash_modes: true,
            rename_node: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmojiSettings {
    #[serde(default = "default_true")]
    pub add_emoji: bool,
    #[serde(default = "default_true")]
    pub remove_old_emoji: bool,
    pub emoji: Vec<RegexMatchRuleItem>,
}

impl Default for EmojiSettings {
    fn default() -> Self {
        EmojiSettings {
            add_emoji: true,
            remove_old_emoji: true,
            emoji: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SurgeExternalProxySettings {
    pub surge_ssr_path: String,
    pub resolve_hostname: bool,
    #[serde(default = "default_local_port")]
    pub local_port: u16,
}

impl Default for SurgeExternalProxySettings {
    fn default() -> Self {
        SurgeExternalProxySettings {
            surge_ssr_path: String::new(),
            resolve_hostname: false,
            local_port: default_local_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ruleset_item_lines() {
        let reference = RulesetItem {
            group: "Ads".to_string(),
            ruleset: "clash-domain:rules/ads.yaml".to_string(),
            interval: Some(86400),
            ..Default::default()
        };
        assert_eq!(reference.to_ini().as_deref(), Some("Ads,clash-domain:rules/ads.yaml,86400"));

        let inline = RulesetItem {
            group: "Proxy".to_string(),
            rule: "FINAL".to_string(),
            ..Default::default()
        };
        assert_eq!(inline.to_ini().as_deref(), Some("Proxy,[]FINAL"));

        let import = RulesetItem {
            import: Some("snippets/rulesets.txt".to_string()),
            ..Default::default()
        };
        assert_eq!(import.to_ini().as_deref(), Some("!!import:snippets/rulesets.txt"));
    }

    #[test]
    fn test_proxy_group_item_line() {
        let item = ProxyGroupItem {
            name: "Auto".to_string(),
            group_type: "url-test".to_string(),
            rule: vec![".*".to_string()],
            url: "http://www.gstatic.com/generate_204".to_string(),
            interval: Some(300),
            tolerance: Some(50),
            ..Default::default()
        };
        assert_eq!(
            item.to_ini().as_deref(),
            Some("Auto`url-test`.*`http://www.gstatic.com/generate_204`300,0,50")
        );
    }

    #[test]
    fn test_regex_rule_lines() {
        let rename = RegexMatchRuleItem {
            match_str: Some("\\(.*?\\)".to_string()),
            replace: Some("".to_string()),
            ..Default::default()
        };
        assert_eq!(rename.to_rename_line().as_deref(), Some("\\(.*?\\)@"));

        let script = RegexMatchRuleItem {
            script: Some("function rename(node) {}".to_string()),
            ..Default::default()
        };
        assert_eq!(script.to_emoji_line().as_deref(), Some("!!script:function rename(node) {}"));
    }
}
