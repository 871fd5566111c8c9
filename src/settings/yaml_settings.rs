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
pub struct RulesetSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub rulesets: Vec<RulesetItem>,
}

impl Default for RulesetSettings {
    fn default() -> Self {
        RulesetSettings {
            enabled: true,
            rulesets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyGroupSettings {
    pub custom_proxy_group: Vec<ProxyGroupItem>,
}

/// Settings document in YAML form
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct YamlSettings {
    pub common: CommonSettings,
    pub node_pref: NodePreferences,
    pub emojis: EmojiSettings,
    pub rulesets: RulesetSettings,
    pub proxy_groups: ProxyGroupSettings,
    pub surge_external_proxy: SurgeExternalProxySettings,
}

impl YamlSettings {
    pub fn parse(content: &str) -> Result<YamlSettings, SettingsError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub(crate) fn into_draft(self) -> SettingsDraft {
        SettingsDraft {
            renames: self.node_pref.rename_node.iter().filter_map(|r| r.to_rename_line()).collect(),
            emojis: self.emojis.emoji.iter().filter_map(|r| r.to_emoji_line()).collect(),
            rulesets: self.rulesets.rulesets.iter().filter_map(ToIni::to_ini).collect(),
            groups: self.proxy_groups.custom_proxy_group.iter().filter_map(ToIni::to_ini).collect(),
            add_emoji: self.emojis.add_emoji,
            remove_old_emoji: self.emojis.remove_old_emoji,
            enable_rulesets: self.rulesets.enabled,
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
    fn test_sections_lower_to_lines() {
        let yaml = r#"
emojis:
  add_emoji: false
  emoji:
    - match: "(流量|时间|应急)"
      emoji: "🏳️‍🌈"
    - import: snippets/emoji.txt
rulesets:
  enabled: false
  rulesets:
    - group: Direct
      ruleset: rules/LocalAreaNetwork.list
surge_external_proxy:
  surge_ssr_path: /usr/local/bin/ssr-local
  resolve_hostname: true
"#;
        let draft = YamlSettings::parse(yaml).unwrap().into_draft();
        assert!(!draft.add_emoji);
        assert!(draft.remove_old_emoji);
        assert!(!draft.enable_rulesets);
        assert_eq!(draft.emojis, vec!["(流量|时间|应急),🏳️‍🌈", "!!import:snippets/emoji.txt"]);
        assert_eq!(draft.rulesets, vec!["Direct,rules/LocalAreaNetwork.list"]);
        assert_eq!(draft.surge.local_port, 1080);
        assert!(draft.surge.resolve_hostname);
        assert_eq!(draft.common.base_path, "base");
    }
}
