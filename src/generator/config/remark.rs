//! Remark preparation before rendering
//!
//! Every target addresses proxies by name, so names must be unique within
//! one output and free of the target's field separator.

use std::collections::HashSet;

use crate::models::Proxy;

/// Cleans one remark and makes it unique against `taken`.
///
/// With `proc_comma` set, commas become spaces. A remark already in use gets
/// ` 2`, ` 3`, ... appended. The returned name is recorded in `taken`.
pub fn process_remark(remark: &str, taken: &mut HashSet<String>, proc_comma: bool) -> String {
    let mut base = if proc_comma {
        remark.replace(',', " ").trim().to_string()
    } else {
        remark.trim().to_string()
    };
    if base.is_empty() {
        base = "proxy".to_string();
    }

    let mut name = base.clone();
    let mut n = 1;
    while taken.contains(&name) {
        n += 1;
        name = format!("{} {}", base, n);
    }
    taken.insert(name.clone());
    name
}

/// Clones the proxies with processed, unique remarks
pub fn unique_remarks(nodes: &[Proxy], proc_comma: bool) -> Vec<Proxy> {
    let mut taken = HashSet::new();
    nodes
        .iter()
        .map(|node| {
            let mut node = node.clone();
            node.remark = process_remark(&node.remark, &mut taken, proc_comma);
            node
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyKind, TrojanInfo};

    #[test]
    fn test_process_remark_dedup_and_comma() {
        let mut taken = HashSet::new();
        assert_eq!(process_remark("HK, 01", &mut taken, true), "HK  01");
        assert_eq!(process_remark("HK, 01", &mut taken, true), "HK  01 2");
        assert_eq!(process_remark("a,b", &mut taken, false), "a,b");
        assert_eq!(process_remark("  ", &mut taken, false), "proxy");
    }

    #[test]
    fn test_unique_remarks_keeps_order() {
        let node = Proxy::new(ProxyKind::Trojan(TrojanInfo::default()), "same", "a.com", 443);
        let nodes = unique_remarks(&[node.clone(), node.clone(), node], false);
        let names: Vec<_> = nodes.iter().map(|n| n.remark.as_str()).collect();
        assert_eq!(names, vec!["same", "same 2", "same 3"]);
    }
}
