use super::deserializer::{CommonSettings, EmojiSettings, NodePreferences, SurgeExternalProxySettings};
use super::settings_struct::{SettingsDraft, SettingsError};
use crate::utils::ini_reader::{IniReader, IniSection};
use crate::utils::string::parse_bool;

/// Settings document in INI form; list entries repeat their key
#[derive(Debug, Clone, Default)]
pub struct IniSettings {
    reader: IniReader,
}

fn all(section: Option<&IniSection>, keys: &[&str]) -> Vec<String> {
    let Some(section) = section else {
        return Vec::new();
    };
    section
        .items
        .iter()
        .filter(|(k, v)| keys.contains(&k.as_str()) && !v.is_empty())
        .map(|(_, v)| v.clone())
        .collect()
}

fn string(section: Option<&IniSection>, key: &str, target: &mut String) {
    if let Some(value) = section.and_then(|s| s.get(key)) {
        *target = value.to_string();
    }
}

fn flag(section: Option<&IniSection>, key: &str) -> Option<bool> {
    section.and_then(|s| s.get(key)).and_then(parse_bool)
}

fn boolean(section: Option<&IniSection>, key: &str, target: &mut bool) {
    if let Some(value) = flag(section, key) {
        *target = value;
    }
}

impl IniSettings {
    pub fn parse(content: &str) -> Result<IniSettings, SettingsError> {
        Ok(IniSettings {
            reader: IniReader::parse(content)?,
        })
    }

    pub(crate) fn into_draft(self) -> SettingsDraft {
        let section = |name: &str| self.reader.section(name);

        let mut common = CommonSettings::default();
        let s = section("common");
        string(s, "base_path", &mut common.base_path);
        string(s, "clash_rule_base", &mut common.clash_rule_base);
        string(s, "surge_rule_base", &mut common.surge_rule_base);
        string(s, "loon_rule_base", &mut common.loon_rule_base);
        string(s, "quanx_rule_base", &mut common.quanx_rule_base);
        string(s, "singbox_rule_base", &mut common.singbox_rule_base);
        string(s, "proxy_subscription", &mut common.proxy_subscription);
        string(s, "proxy_ruleset", &mut common.proxy_ruleset);
        common.exclude_remarks = all(s, &["exclude_remarks"]);
        common.include_remarks = all(s, &["include_remarks"]);

        let mut node_pref = NodePreferences::default();
        let s = section("node_pref");
        node_pref.udp_flag = flag(s, "udp_flag");
        node_pref.tcp_fast_open_flag = flag(s, "tcp_fast_open_flag");
        node_pref.skip_cert_verify_flag = flag(s, "skip_cert_verify_flag");
        node_pref.tls13_flag = flag(s, "tls13_flag");
        boolean(s, "sort_flag", &mut node_pref.sort_flag);
        boolean(s, "filter_deprecated_nodes", &mut node_pref.filter_deprecated_nodes);
        boolean(s, "singbox_add_clash_modes", &mut node_pref.singbox_add_clash_modes);
        let renames = all(s, &["rename_node"]);

        let mut emoji = EmojiSettings::default();
        let s = section("emojis");
        boolean(s, "add_emoji", &mut emoji.add_emoji);
        boolean(s, "remove_old_emoji", &mut emoji.remove_old_emoji);
        let emojis = all(s, &["rule"]);

        let s = section("ruleset");
        let mut enable_rulesets = true;
        boolean(s, "enabled", &mut enable_rulesets);
        let rulesets = all(s, &["ruleset", "surge_ruleset"]);

        let groups = all(section("proxy_group"), &["custom_proxy_group"]);

        let mut surge = SurgeExternalProxySettings::default();
        let s = section("surge_external_proxy");
        string(s, "surge_ssr_path", &mut surge.surge_ssr_path);
        boolean(s, "resolve_hostname", &mut surge.resolve_hostname);
        if let Some(port) = s.and_then(|s| s.get("local_port")).and_then(|p| p.parse().ok()) {
            surge.local_port = port;
        }

        SettingsDraft {
            common,
            node_pref,
            add_emoji: emoji.add_emoji,
            remove_old_emoji: emoji.remove_old_emoji,
            enable_rulesets,
            renames,
            emojis,
            rulesets,
            groups,
            surge,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_keys_become_lists() {
        let ini = "[common]\nbase_path=conf\nexclude_remarks=(到期|剩余)\nexclude_remarks=官网\n\
                   [node_pref]\nudp_flag=true\nskip_cert_verify_flag=false\nrename_node=!!import:snippets/rename.txt\n\
                   [emojis]\nadd_emoji=false\nrule=(?i)香港|HK,🇭🇰\n\
                   [ruleset]\nruleset=Direct,rules/LocalAreaNetwork.list\nruleset=Proxy,[]FINAL\n\
                   [proxy_group]\ncustom_proxy_group=Proxy`select`.*\n\
                   [surge_external_proxy]\nsurge_ssr_path=/usr/bin/ssr-local\nlocal_port=1234\n";
        let draft = IniSettings::parse(ini).unwrap().into_draft();
        assert_eq!(draft.common.base_path, "conf");
        assert_eq!(draft.common.proxy_ruleset, "SYSTEM");
        assert_eq!(draft.common.exclude_remarks, vec!["(到期|剩余)", "官网"]);
        assert_eq!(draft.node_pref.udp_flag, Some(true));
        assert_eq!(draft.node_pref.skip_cert_verify_flag, Some(false));
        assert_eq!(draft.node_pref.tls13_flag, None);
        assert_eq!(draft.renames, vec!["!!import:snippets/rename.txt"]);
        assert!(!draft.add_emoji);
        assert_eq!(draft.emojis, vec!["(?i)香港|HK,🇭🇰"]);
        assert_eq!(draft.rulesets, vec!["Direct,rules/LocalAreaNetwork.list", "Proxy,[]FINAL"]);
        assert_eq!(draft.groups, vec!["Proxy`select`.*"]);
        assert_eq!(draft.surge.surge_ssr_path, "/usr/bin/ssr-local");
        assert_eq!(draft.surge.local_port, 1234);
    }
}
