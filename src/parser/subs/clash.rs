use log::{debug, warn};
use serde_json::Value;

use crate::models::{BalanceStrategy, Proxy, ProxyGroupConfig, ProxyGroupType, SubscriptionResult};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::explodes::{anytls, http, hysteria, snell, socks, ss, ssr, trojan, tuic, vless, vmess, wireguard};
use crate::parser::fields::{value_to_string, yaml_to_json, FieldMap};
use crate::parser::registry::Registry;

fn native_builder(proxy_type: &str) -> Option<fn(&FieldMap) -> ParseResult<Proxy>> {
    let builder: fn(&FieldMap) -> ParseResult<Proxy> = match proxy_type {
        "ss" | "shadowsocks" => ss::from_clash,
        "ssr" | "shadowsocksr" => ssr::from_clash,
        "vmess" => vmess::from_clash,
        "vless" => vless::from_clash,
        "trojan" => trojan::from_clash,
        "hysteria" | "hysteria2" => hysteria::from_clash,
        "tuic" => tuic::from_clash,
        "anytls" => anytls::from_clash,
        "http" => http::from_clash,
        "socks5" | "socks" => socks::from_clash,
        "snell" => snell::from_clash,
        "wireguard" => wireguard::from_clash,
        _ => return None,
    };
    Some(builder)
}

/// Decodes one entry of `proxies`, using the validator's option-map path
/// for types without a native builder
pub fn parse_clash_proxy(entry: &Value, registry: &Registry) -> ParseResult<Proxy> {
    let fields = FieldMap::from_value(entry).ok_or(ParseError::Malformed("clash proxy"))?;
    let proxy_type = fields.str("type").to_ascii_lowercase();
    if proxy_type.is_empty() {
        return Err(ParseError::MissingField("type".to_string()));
    }
    match native_builder(&proxy_type) {
        Some(build) => Ok(registry.validate(build(&fields)?).proxy),
        None => registry.from_options(fields.inner().clone()),
    }
}

/// Converts a `proxy-groups` entry. Explicit members become `[]name` rules;
/// a `filter` regex is kept as a remark rule.
pub fn parse_clash_group(entry: &Value) -> Option<ProxyGroupConfig> {
    let fields = FieldMap::from_value(entry)?;
    let name = fields.str("name");
    if name.is_empty() {
        return None;
    }
    let group_type = ProxyGroupType::from_str(&fields.str("type"))?;

    let mut group = ProxyGroupConfig::new(&name, group_type);
    group.proxies = fields.list("proxies").into_iter().map(|p| format!("[]{}", p)).collect();
    let filter = fields.str("filter");
    if !filter.is_empty() {
        group.proxies.push(filter);
    } else if fields.bool("include-all").unwrap_or(false) || fields.bool("include-all-proxies").unwrap_or(false) {
        group.proxies.push(".*".to_string());
    }

    let url = fields.str("url");
    if !url.is_empty() {
        group.url = url;
    }
    if fields.contains("interval") {
        group.interval = fields.u32("interval");
    }
    group.timeout = fields.u32("timeout");
    group.tolerance = fields.u32("tolerance");
    group.strategy = BalanceStrategy::from_str(&fields.str("strategy"));
    group.lazy = fields.bool("lazy");
    group.disable_udp = fields.bool("disable-udp");
    Some(group)
}

/// Decodes a Clash document: `proxies` (or legacy `Proxy`), `proxy-groups`
/// (or `Proxy Group`) and `rules` (or `Rule`)
pub fn explode_clash(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
    let root = yaml_to_json(&yaml)?;
    let section = |keys: &[&str]| -> Vec<Value> {
        keys.iter()
            .find_map(|k| root.get(*k).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default()
    };

    let mut result = SubscriptionResult::default();
    for entry in section(&["proxies", "Proxy"]) {
        match parse_clash_proxy(&entry, registry) {
            Ok(proxy) => result.proxies.push(proxy),
            Err(err) => {
                let name = entry.get("name").map(value_to_string).unwrap_or_default();
                warn!("skip clash proxy `{}`: {}", name, err);
            }
        }
    }
    for entry in section(&["proxy-groups", "Proxy Group"]) {
        match parse_clash_group(&entry) {
            Some(group) => result.groups.push(group),
            None => debug!("skip clash group {}", entry),
        }
    }
    result.raw_rules = section(&["rules", "Rule"])
        .iter()
        .map(value_to_string)
        .filter(|r| !r.is_empty())
        .collect();
    Ok(result)
}
