//! Transform pipeline over a decoded proxy collection.
//!
//! The steps run in a fixed order: filter, rename, emoji, sort. Each one is
//! a no-op when its rule list is empty, and only sorting reorders proxies.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::models::{Proxy, RegexMatchConfig};
use crate::utils::matcher::{apply_matcher, match_node};

lazy_static! {
    static ref EMOJI_REGEX: Regex = Regex::new(
        r"[\x{1F600}-\x{1F64F}\x{1F300}-\x{1F5FF}\x{1F680}-\x{1F6FF}\x{2600}-\x{26FF}\x{2700}-\x{27BF}\x{1F900}-\x{1F9FF}\x{1F1E0}-\x{1F1FF}]"
    )
    .unwrap();
}

/// Knobs for [`preprocess_nodes`]
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    pub include_remarks: Vec<String>,
    pub exclude_remarks: Vec<String>,
    pub rename_rules: Vec<RegexMatchConfig>,
    pub emoji_rules: Vec<RegexMatchConfig>,
    pub add_emoji: bool,
    pub remove_old_emoji: bool,
    pub sort: bool,
}

/// Whether a filter pattern hits the proxy.
///
/// `/expr/` is a regex over the remark, `!!KEY=...` goes through the matcher,
/// anything else is a literal substring of the remark.
pub fn filter_match(pattern: &str, node: &Proxy) -> bool {
    if pattern.is_empty() {
        return false;
    }
    if pattern.len() > 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        let expr = &pattern[1..pattern.len() - 1];
        return match Regex::new(expr) {
            Ok(re) => re.is_match(&node.remark),
            Err(_) => node.remark.contains(expr),
        };
    }
    if pattern.starts_with("!!") {
        return match_node(pattern, node);
    }
    node.remark.contains(pattern)
}

/// Returns `true` when the node is excluded, or include rules exist and none hit it
pub fn check_ignore(node: &Proxy, exclude_remarks: &[String], include_remarks: &[String]) -> bool {
    let excluded = exclude_remarks.iter().any(|p| filter_match(p, node));
    let included = include_remarks.iter().all(String::is_empty)
        || include_remarks.iter().any(|p| filter_match(p, node));
    excluded || !included
}

/// Drops excluded proxies, then those no include rule selects
pub fn filter_nodes(nodes: &mut Vec<Proxy>, exclude_remarks: &[String], include_remarks: &[String]) {
    if exclude_remarks.is_empty() && include_remarks.is_empty() {
        return;
    }
    nodes.retain(|node| {
        let keep = !check_ignore(node, exclude_remarks, include_remarks);
        if !keep {
            debug!("Node {} - {} has been ignored", node.group, node.remark);
        }
        keep
    });
}

/// Strips emoji glyphs and the whitespace they leave at the ends
pub fn remove_emoji(remark: &str) -> String {
    EMOJI_REGEX.replace_all(remark, "").trim().to_string()
}

/// Prefixes the glyph of the first rule matching the node
pub fn add_emoji(node: &Proxy, emoji_rules: &[RegexMatchConfig]) -> String {
    emoji_rules
        .iter()
        .filter(|rule| !rule._match.is_empty() && !rule.replace.is_empty())
        .find(|rule| match_node(&rule._match, node))
        .map(|rule| format!("{} {}", rule.replace, node.remark))
        .unwrap_or_else(|| node.remark.clone())
}

/// Applies the first rename rule whose matcher selects the node.
///
/// The rule's trailing pattern is replaced with the rule's replacement; an
/// empty result restores the original remark.
pub fn node_rename(node: &mut Proxy, rename_rules: &[RegexMatchConfig]) {
    let original = node.remark.clone();
    for rule in rename_rules {
        if rule._match.is_empty() {
            continue;
        }
        let mut real_rule = String::new();
        if !apply_matcher(&rule._match, &mut real_rule, node) || real_rule.is_empty() {
            continue;
        }
        let Ok(re) = Regex::new(&real_rule) else {
            continue;
        };
        if !re.is_match(&node.remark) {
            continue;
        }
        node.remark = re.replace_all(&node.remark, rule.replace.as_str()).into_owned();
        break;
    }
    if node.remark.is_empty() {
        node.remark = original;
    }
}

/// Runs filter, rename, emoji and sort in that order
pub fn preprocess_nodes(nodes: &mut Vec<Proxy>, opts: &TransformOptions) {
    filter_nodes(nodes, &opts.exclude_remarks, &opts.include_remarks);

    if !opts.rename_rules.is_empty() {
        for node in nodes.iter_mut() {
            node_rename(node, &opts.rename_rules);
        }
    }

    if opts.remove_old_emoji || (opts.add_emoji && !opts.emoji_rules.is_empty()) {
        for node in nodes.iter_mut() {
            if opts.remove_old_emoji {
                let stripped = remove_emoji(&node.remark);
                if !stripped.is_empty() {
                    node.remark = stripped;
                }
            }
            if opts.add_emoji {
                node.remark = add_emoji(node, &opts.emoji_rules);
            }
        }
    }

    if opts.sort {
        nodes.sort_by(|a, b| a.remark.cmp(&b.remark));
    }
}
