use serde::Deserialize;

use super::deserializer::{
    CommonSettings, EmojiSettings, NodePreferences, ProxyGroupItem, RulesetItem, SurgeExternalProxySettings, ToIni,
};
use super::settings_struct::{SettingsDraft, SettingsError};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesetToggle {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RulesetToggle {
    fn default() -> Self {
        RulesetToggle { enabled: true }
    }
}

/// Settings document in TOML form; rulesets and groups are arrays of tables
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlSettings {
    pub common: CommonSettings,
    pub node_pref: NodePreferences,
    pub emojis: EmojiSettings,
    pub ruleset: RulesetToggle,
    pub rulesets: Vec<RulesetItem>,
    pub custom_groups: Vec<ProxyGroupItem>,
    pub surge_external_proxy: SurgeExternalProxySettings,
}

impl TomlSettings {
    pub fn parse(content: &str) -> Result<TomlSettings, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub(crate) fn into_draft(self) -> SettingsDraft {
        SettingsDraft {
            renames: self.node_pref.rename_node.iter().filter_map(|r| r.to_rename_line()).collect(),
            emojis: self.emojis.emoji.iter().filter_map(|r| r.to_emoji_line()).collect(),
            rulesets: self.rulesets.iter().filter_map(ToIni::to_ini).collect(),
            groups: self.custom_groups.iter().filter_map(ToIni::to_ini).collect(),
            add_emoji: self.emojis.add_emoji,
            remove_old_emoji: self.emojis.remove_old_emoji,
            enable_rulesets: self.ruleset.enabled,
            common: self.common,
            node_pref: self.node_pref,
            surge: self.surge_external_proxy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrays_of_tables() {
        let toml = r#"
[common]
exclude_remarks = ["(到期|剩余流量|时间|官网|产品)"]

[node_pref]
tcp_fast_open_flag = false
sort_flag = true

[[node_pref.rename_node]]
match = "中国"
replace = "CN"

[ruleset]
enabled = true

[[rulesets]]
group = "Ads"
ruleset = "rules/ads.list"

[[rulesets]]
group = "Proxy"
rule = "GEOIP,CN"

[[custom_groups]]
name = "Auto"
type = "fallback"
rule = ["!!GROUP=HK", "[]DIRECT"]
url = "http://www.gstatic.com/generate_204"
interval = 300
timeout = 5
"#;
        let draft = TomlSettings::parse(toml).unwrap().into_draft();
        assert_eq!(draft.common.exclude_remarks, vec!["(到期|剩余流量|时间|官网|产品)"]);
        assert_eq!(draft.node_pref.tcp_fast_open_flag, Some(false));
        assert!(draft.node_pref.sort_flag);
        assert_eq!(draft.renames, vec!["中国@CN"]);
        assert_eq!(draft.rulesets, vec!["Ads,rules/ads.list", "Proxy,[]GEOIP,CN"]);
        assert_eq!(
            draft.groups,
            vec!["Auto`fallback`!!GROUP=HK`[]DIRECT`http://www.gstatic.com/generate_204`300,5"]
        );
    }
}
