use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use super::deserializer::{CommonSettings, NodePreferences, SurgeExternalProxySettings};
use super::import::{import_items, ImportContext, ImportKind};
use super::ini_settings::IniSettings;
use super::toml_settings::TomlSettings;
use super::yaml_settings::YamlSettings;
use crate::generator::Target;
use crate::models::{ExtraSettings, ProxyGroupConfig, RegexMatchConfig, RulesetConfig};
use crate::parser::{ParseSettings, TransformOptions};
use crate::rulesets::RulesetFetcher;
use crate::utils::file::read_file;
use crate::utils::http::parse_proxy;
use crate::utils::ini_reader::IniReaderError;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid TOML settings: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid INI settings: {0}")]
    Ini(#[from] IniReaderError),
    #[error("cannot import `{path}`: {reason}")]
    Import { path: String, reason: String },
    #[error("unknown settings format")]
    UnknownFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsFormat {
    Yaml,
    Toml,
    Ini,
}

impl SettingsFormat {
    pub fn from_path(path: &Path) -> Option<SettingsFormat> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(SettingsFormat::Yaml),
            "toml" => Some(SettingsFormat::Toml),
            "ini" | "conf" => Some(SettingsFormat::Ini),
            _ => None,
        }
    }

    /// Guesses the format of a document without a telling extension
    pub fn sniff(content: &str) -> Option<SettingsFormat> {
        let first = content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';'))?;
        if first.starts_with('[') {
            return Some(match toml::from_str::<toml::Value>(content) {
                Ok(_) => SettingsFormat::Toml,
                Err(_) => SettingsFormat::Ini,
            });
        }
        match serde_yaml::from_str::<serde_yaml::Value>(content) {
            Ok(serde_yaml::Value::Mapping(_)) => Some(SettingsFormat::Yaml),
            _ => None,
        }
    }
}

/// Settings sections with every list still in its textual form
#[derive(Debug, Clone)]
pub(crate) struct SettingsDraft {
    pub common: CommonSettings,
    pub node_pref: NodePreferences,
    pub add_emoji: bool,
    pub remove_old_emoji: bool,
    pub enable_rulesets: bool,
    pub renames: Vec<String>,
    pub emojis: Vec<String>,
    pub rulesets: Vec<String>,
    pub groups: Vec<String>,
    pub surge: SurgeExternalProxySettings,
}

impl SettingsDraft {
    /// Runs imports over every list and parses the resulting lines
    fn finish(self) -> Result<Settings, SettingsError> {
        let ctx = ImportContext::new(&self.common.base_path);
        let common = self.common;
        let node_pref = self.node_pref;

        let renames = import_items(self.renames, ImportKind::Renames, &ctx)?
            .iter()
            .filter_map(|line| RegexMatchConfig::from_ini(line, '@'))
            .collect();
        let emojis = import_items(self.emojis, ImportKind::Emojis, &ctx)?
            .iter()
            .filter_map(|line| RegexMatchConfig::from_ini(line, ','))
            .collect();
        let custom_rulesets = import_items(self.rulesets, ImportKind::Rulesets, &ctx)?
            .iter()
            .filter_map(|line| {
                let parsed = RulesetConfig::from_ini(line);
                if parsed.is_none() {
                    warn!("Ignoring invalid ruleset '{}'", line);
                }
                parsed
            })
            .collect();
        let custom_proxy_groups = import_items(self.groups, ImportKind::ProxyGroups, &ctx)?
            .iter()
            .filter_map(|line| {
                let parsed = ProxyGroupConfig::from_ini(line);
                if parsed.is_none() {
                    warn!("Ignoring invalid proxy group '{}'", line);
                }
                parsed
            })
            .collect();

        Ok(Settings {
            exclude_remarks: import_items(common.exclude_remarks, ImportKind::Remarks, &ctx)?,
            include_remarks: import_items(common.include_remarks, ImportKind::Remarks, &ctx)?,
            base_path: common.base_path,
            clash_base: common.clash_rule_base,
            surge_base: common.surge_rule_base,
            loon_base: common.loon_rule_base,
            quanx_base: common.quanx_rule_base,
            singbox_base: common.singbox_rule_base,
            proxy_subscription: common.proxy_subscription,
            proxy_ruleset: common.proxy_ruleset,
            udp_flag: node_pref.udp_flag,
            tfo_flag: node_pref.tcp_fast_open_flag,
            skip_cert_verify: node_pref.skip_cert_verify_flag,
            tls13_flag: node_pref.tls13_flag,
            enable_sort: node_pref.sort_flag,
            filter_deprecated: node_pref.filter_deprecated_nodes,
            singbox_add_clash_modes: node_pref.singbox_add_clash_modes,
            renames,
            add_emoji: self.add_emoji,
            remove_emoji: self.remove_old_emoji,
            emojis,
            enable_rule_gen: self.enable_rulesets,
            custom_rulesets,
            custom_proxy_groups,
            surge_ssr_path: self.surge.surge_ssr_path,
            surge_resolve_hostname: self.surge.resolve_hostname,
            surge_ssr_local_port: self.surge.local_port,
        })
    }
}

/// Settings structure to hold global configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_path: String,
    pub clash_base: String,
    pub surge_base: String,
    pub loon_base: String,
    pub quanx_base: String,
    pub singbox_base: String,
    pub exclude_remarks: Vec<String>,
    pub include_remarks: Vec<String>,
    /// `NONE`, `SYSTEM` or a proxy URL for subscription downloads
    pub proxy_subscription: String,
    /// Same, for ruleset downloads
    pub proxy_ruleset: String,

    pub udp_flag: Option<bool>,
    pub tfo_flag: Option<bool>,
    pub skip_cert_verify: Option<bool>,
    pub tls13_flag: Option<bool>,
    pub enable_sort: bool,
    pub filter_deprecated: bool,
    pub singbox_add_clash_modes: bool,
    pub renames: Vec<RegexMatchConfig>,

    pub add_emoji: bool,
    pub remove_emoji: bool,
    pub emojis: Vec<RegexMatchConfig>,

    pub enable_rule_gen: bool,
    pub custom_rulesets: Vec<RulesetConfig>,
    pub custom_proxy_groups: Vec<ProxyGroupConfig>,

    pub surge_ssr_path: String,
    pub surge_resolve_hostname: bool,
    pub surge_ssr_local_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        let common = CommonSettings::default();
        let surge = SurgeExternalProxySettings::default();
        Settings {
            base_path: common.base_path,
            clash_base: String::new(),
            surge_base: String::new(),
            loon_base: String::new(),
            quanx_base: String::new(),
            singbox_base: String::new(),
            exclude_remarks: Vec::new(),
            include_remarks: Vec::new(),
            proxy_subscription: common.proxy_subscription,
            proxy_ruleset: common.proxy_ruleset,
            udp_flag: None,
            tfo_flag: None,
            skip_cert_verify: None,
            tls13_flag: None,
            enable_sort: false,
            filter_deprecated: false,
            singbox_add_clash_modes: true,
            renames: Vec::new(),
            add_emoji: true,
            remove_emoji: true,
            emojis: Vec::new(),
            enable_rule_gen: true,
            custom_rulesets: Vec::new(),
            custom_proxy_groups: Vec::new(),
            surge_ssr_path: surge.surge_ssr_path,
            surge_resolve_hostname: surge.resolve_hostname,
            surge_ssr_local_port: surge.local_port,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML, TOML or INI file.
    ///
    /// The format follows the file extension, falling back to sniffing the
    /// content.
    pub fn load(path: impl AsRef<Path>) -> Result<Settings, SettingsError> {
        let path = path.as_ref();
        let content = read_file(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let format = SettingsFormat::from_path(path)
            .or_else(|| SettingsFormat::sniff(&content))
            .ok_or(SettingsError::UnknownFormat)?;
        info!("Loading {:?} settings from {}", format, path.display());
        Settings::from_content(&content, format)
    }

    pub fn from_content(content: &str, format: SettingsFormat) -> Result<Settings, SettingsError> {
        let draft = match format {
            SettingsFormat::Yaml => YamlSettings::parse(content)?.into_draft(),
            SettingsFormat::Toml => TomlSettings::parse(content)?.into_draft(),
            SettingsFormat::Ini => IniSettings::parse(content)?.into_draft(),
        };
        draft.finish()
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            include_remarks: self.include_remarks.clone(),
            exclude_remarks: self.exclude_remarks.clone(),
            rename_rules: self.renames.clone(),
            emoji_rules: self.emojis.clone(),
            add_emoji: self.add_emoji,
            remove_old_emoji: self.remove_emoji,
            sort: self.enable_sort,
        }
    }

    pub fn extra_settings(&self) -> ExtraSettings {
        ExtraSettings {
            enable_rule_generator: self.enable_rule_gen,
            udp: self.udp_flag,
            tfo: self.tfo_flag,
            skip_cert_verify: self.skip_cert_verify,
            tls13: self.tls13_flag,
            surge_ssr_path: self.surge_ssr_path.clone(),
            surge_ssr_local_port: self.surge_ssr_local_port,
            surge_resolve_hostname: self.surge_resolve_hostname,
            singbox_add_clash_mode: self.singbox_add_clash_modes,
            filter_deprecated: self.filter_deprecated,
            ..ExtraSettings::default()
        }
    }

    /// How sources are read: proxy, per-source filters and local file access
    pub fn parse_settings(&self) -> ParseSettings {
        ParseSettings {
            proxy: parse_proxy(&self.proxy_subscription),
            exclude_remarks: self.exclude_remarks.clone(),
            include_remarks: self.include_remarks.clone(),
            authorized: true,
            ..ParseSettings::default()
        }
    }

    pub fn ruleset_fetcher(&self) -> RulesetFetcher<'_> {
        RulesetFetcher {
            base_path: &self.base_path,
            proxy: parse_proxy(&self.proxy_ruleset),
            cache: None,
        }
    }

    /// Configured base document path for `target`; empty when none is set
    pub fn rule_base(&self, target: Target) -> &str {
        match target {
            Target::Clash => &self.clash_base,
            Target::Surge => &self.surge_base,
            Target::Loon => &self.loon_base,
            Target::QuanX => &self.quanx_base,
            Target::SingBox => &self.singbox_base,
            Target::Single(_) => "",
        }
    }

    /// Reads the base document for `target`, or an empty one when none is configured
    pub fn load_base(&self, target: Target) -> Result<String, SettingsError> {
        let location = self.rule_base(target);
        if location.is_empty() {
            return Ok(String::new());
        }
        let path = ImportContext::new(&self.base_path)
            .resolve(location)
            .ok_or_else(|| SettingsError::Io {
                path: location.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "base document not found"),
            })?;
        read_file(&path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}
