//! Group generation utilities
//!
//! This module resolves a proxy group's matcher rules into its member list.

use std::collections::HashSet;

use crate::models::{Proxy, ProxyGroupConfig};
use crate::utils::matcher::match_node;

/// Member substituted into a group no rule selected anything for
pub const FALLBACK_MEMBER: &str = "DIRECT";

/// Generates the member list of a group from its rules
///
/// # Arguments
///
/// * `rules` - Matcher rules in order; `[]NAME` adds `NAME` literally
/// * `nodelist` - Proxies the target actually rendered
///
/// # Returns
///
/// The union of every rule's selection, first-seen order, without
/// duplicates. An empty union becomes `["DIRECT"]`.
pub fn group_generate(rules: &[String], nodelist: &[Proxy]) -> Vec<String> {
    let mut members: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for rule in rules {
        if rule.is_empty() {
            continue;
        }
        if let Some(name) = rule.strip_prefix("[]") {
            if seen.insert(name.to_string()) {
                members.push(name.to_string());
            }
            continue;
        }
        for node in nodelist {
            if !seen.contains(&node.remark) && match_node(rule, node) {
                seen.insert(node.remark.clone());
                members.push(node.remark.clone());
            }
        }
    }

    if members.is_empty() {
        members.push(FALLBACK_MEMBER.to_string());
    }
    members
}

/// Members of `group`, see [`group_generate`]
pub fn group_members(group: &ProxyGroupConfig, nodelist: &[Proxy]) -> Vec<String> {
    group_generate(&group.proxies, nodelist)
}
