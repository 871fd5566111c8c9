use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_yaml::Value;

use super::deserializer::{ProxyGroupItem, RegexMatchRuleItem, RulesetItem, ToIni};
use super::settings_struct::SettingsError;
use crate::utils::file::{read_file, resolve_path};

const IMPORT_PREFIX: &str = "!!import:";
const SCRIPT_PREFIX: &str = "!!script:";
const MAX_IMPORT_DEPTH: usize = 8;

/// The list an import splices into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Rulesets,
    ProxyGroups,
    Renames,
    Emojis,
    Remarks,
}

impl ImportKind {
    /// Keys the list may live under in a structured document
    fn keys(&self) -> &'static [&'static str] {
        match self {
            ImportKind::Rulesets => &["rulesets", "ruleset"],
            ImportKind::ProxyGroups => &["custom_proxy_group", "custom_groups"],
            ImportKind::Renames => &["rename_node", "rename"],
            ImportKind::Emojis => &["emoji", "emojis"],
            ImportKind::Remarks => &["exclude_remarks", "include_remarks"],
        }
    }

    fn lower(&self, item: Value) -> Option<String> {
        if let Value::String(line) = item {
            return Some(line);
        }
        match self {
            ImportKind::Rulesets => serde_yaml::from_value::<RulesetItem>(item).ok()?.to_ini(),
            ImportKind::ProxyGroups => serde_yaml::from_value::<ProxyGroupItem>(item).ok()?.to_ini(),
            ImportKind::Renames => serde_yaml::from_value::<RegexMatchRuleItem>(item).ok()?.to_rename_line(),
            ImportKind::Emojis => serde_yaml::from_value::<RegexMatchRuleItem>(item).ok()?.to_emoji_line(),
            ImportKind::Remarks => None,
        }
    }
}

/// Where relative import paths are looked up
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub base_path: PathBuf,
}

impl ImportContext {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        ImportContext {
            base_path: base_path.into(),
        }
    }

    /// Resolves `path` as given, then under the working directory, then under `base_path`
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().unwrap_or_default();
        resolve_path(path, &[cwd.as_path(), self.base_path.as_path()])
    }
}

/// Finds the first sequence stored under one of `keys`, searching nested mappings
fn find_sequence(value: Value, keys: &[&str]) -> Option<Vec<Value>> {
    match value {
        Value::Sequence(items) => Some(items),
        Value::Mapping(map) => {
            for key in keys {
                if let Some(Value::Sequence(items)) = map.get(*key) {
                    return Some(items.clone());
                }
            }
            map.into_iter()
                .filter(|(_, v)| v.is_mapping())
                .find_map(|(_, v)| find_sequence(v, keys))
        }
        _ => None,
    }
}

fn structured_document(path: &Path, content: &str) -> Result<Option<Value>, SettingsError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    Ok(match ext.as_str() {
        "yaml" | "yml" => Some(serde_yaml::from_str(content)?),
        "toml" => {
            let doc: toml::Value = toml::from_str(content)?;
            Some(serde_yaml::to_value(doc)?)
        }
        _ => None,
    })
}

/// Lines of one imported file, lowered to the textual grammar of `kind`
fn read_import(path: &Path, kind: ImportKind) -> Result<Vec<String>, SettingsError> {
    let content = read_file(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;

    if let Some(doc) = structured_document(path, &content)? {
        let items = find_sequence(doc, kind.keys()).ok_or_else(|| SettingsError::Import {
            path: path.display().to_string(),
            reason: format!("no `{}` list found", kind.keys()[0]),
        })?;
        return Ok(items.into_iter().filter_map(|item| kind.lower(item)).collect());
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with(';') && !l.starts_with("//"))
        .map(str::to_string)
        .collect())
}

fn expand(items: Vec<String>, kind: ImportKind, ctx: &ImportContext, depth: usize) -> Result<Vec<String>, SettingsError> {
    let mut result = Vec::with_capacity(items.len());
    for item in items {
        if let Some(path) = item.strip_prefix(IMPORT_PREFIX) {
            let path = path.trim();
            if depth >= MAX_IMPORT_DEPTH {
                return Err(SettingsError::Import {
                    path: path.to_string(),
                    reason: "imports nested too deeply".to_string(),
                });
            }
            let resolved = ctx.resolve(path).ok_or_else(|| SettingsError::Import {
                path: path.to_string(),
                reason: "file not found".to_string(),
            })?;
            info!("Trying to import items from {}", resolved.display());
            let lines = read_import(&resolved, kind)?;
            result.extend(expand(lines, kind, ctx, depth + 1)?);
        } else if item.starts_with(SCRIPT_PREFIX) {
            debug!("Ignoring script entry");
        } else if !item.trim().is_empty() {
            result.push(item);
        }
    }
    Ok(result)
}

/// Splices every `!!import:<path>` entry and drops `!!script:` entries.
///
/// Imported YAML/TOML files contribute the structured items of the list
/// `kind` names; any other file contributes its non-comment lines.
pub fn import_items(items: Vec<String>, kind: ImportKind, ctx: &ImportContext) -> Result<Vec<String>, SettingsError> {
    let before = items.len();
    let result = expand(items, kind, ctx, 0)?;
    if result.len() != before {
        info!("Imported {} item(s)", result.len());
    }
    Ok(result)
}
