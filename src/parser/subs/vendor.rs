//! Vendor JSON containers: shadowsocks GUI configs, ShadowsocksR GUI and libev
//! configs, V2Ray client configs, SSAndroid exports, SSTap and Netch profiles.

use log::debug;
use serde_json::{json, Map, Value};

use crate::models::{Proxy, SubscriptionResult};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::explodes::{http, socks, ss, ssr, vmess};
use crate::parser::fields::{value_to_string, FieldMap};
use crate::parser::registry::Registry;

type Builder = fn(&FieldMap) -> ParseResult<Proxy>;

fn parse_object(content: &str) -> ParseResult<Map<String, Value>> {
    match serde_json::from_str::<Value>(content)? {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::Malformed("json document")),
    }
}

/// Runs `build` over every object in `items`, skipping the ones it rejects
fn collect<'a, I>(items: I, build: Builder, registry: &Registry, what: &str) -> Vec<Proxy>
where
    I: IntoIterator<Item = &'a Value>,
{
    items
        .into_iter()
        .filter_map(FieldMap::from_value)
        .filter_map(|fields| match build(&fields) {
            Ok(proxy) => Some(registry.validate(proxy).proxy),
            Err(err) => {
                debug!("skip {} entry: {}", what, err);
                None
            }
        })
        .collect()
}

/// shadowsocks-windows style `{"version": .., "configs": [..]}`
///
/// A top-level `remarks` becomes the group of every server.
pub fn explode_ss_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root = parse_object(content)?;
    let section = if root.contains_key("version") && root.contains_key("servers") {
        "servers"
    } else {
        "configs"
    };
    let list = root
        .get(section)
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField(section.to_string()))?;
    let group = root.get("remarks").map(value_to_string).unwrap_or_default();

    let proxies = collect(list, ss::from_json, registry, "ss-json")
        .into_iter()
        .map(|proxy| proxy.with_group(&group))
        .collect();
    Ok(SubscriptionResult::from_proxies(proxies))
}

/// ShadowsocksR GUI `configs` list, or a single libev-style config carrying
/// `local_address` and `local_port`
pub fn explode_ssr_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root = parse_object(content)?;
    if root.contains_key("local_address") && root.contains_key("local_port") {
        let fields = FieldMap::new(&root);
        let proxy = ssr::from_json(&fields)?;
        return Ok(SubscriptionResult::from_proxies(vec![registry.validate(proxy).proxy]));
    }
    let list = root
        .get("configs")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField("configs".to_string()))?;
    Ok(SubscriptionResult::from_proxies(collect(list, ssr::from_json, registry, "ssr-json")))
}

fn first<'a>(value: Option<&'a Value>) -> Option<&'a Value> {
    value.and_then(Value::as_array).and_then(|list| list.first())
}

/// V2Ray client config: only the first outbound's first vnext server and
/// first user are read
pub fn explode_v2ray_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root = parse_object(content)?;
    let outbound = first(root.get("outbounds")).ok_or_else(|| ParseError::MissingField("outbounds".to_string()))?;
    let server = first(outbound.pointer("/settings/vnext")).ok_or_else(|| ParseError::MissingField("vnext".to_string()))?;
    let user = first(server.get("users")).ok_or_else(|| ParseError::MissingField("users".to_string()))?;
    let text = |value: Option<&Value>| value.map(value_to_string).unwrap_or_default();

    let stream = outbound.get("streamSettings");
    let network = text(stream.and_then(|s| s.get("network")));
    let network = if network.is_empty() { "tcp".to_string() } else { network };
    let (mut host, mut path, mut header_type) = (String::new(), String::new(), String::new());
    match network.as_str() {
        "ws" => {
            path = text(stream.and_then(|s| s.pointer("/wsSettings/path")));
            host = text(stream.and_then(|s| s.pointer("/wsSettings/headers/Host")));
        }
        "grpc" => path = text(stream.and_then(|s| s.pointer("/grpcSettings/serviceName"))),
        "h2" | "http" => {
            path = text(stream.and_then(|s| s.pointer("/httpSettings/path")));
            host = text(first(stream.and_then(|s| s.pointer("/httpSettings/host"))));
        }
        "tcp" => {
            header_type = text(stream.and_then(|s| s.pointer("/tcpSettings/header/type")));
            if header_type == "http" {
                path = text(first(stream.and_then(|s| s.pointer("/tcpSettings/header/request/path"))));
                host = text(first(stream.and_then(|s| s.pointer("/tcpSettings/header/request/headers/Host"))));
            }
        }
        _ => {}
    }
    let tls = text(stream.and_then(|s| s.get("security"))) == "tls";
    let sni = if tls {
        text(stream.and_then(|s| s.pointer("/tlsSettings/serverName")))
    } else {
        String::new()
    };

    let security = if tls { "tls" } else { "" };
    let descriptor = json!({
        "v": "2",
        "add": text(server.get("address")),
        "port": text(server.get("port")),
        "id": text(user.get("id")),
        "aid": text(user.get("alterId")),
        "scy": text(user.get("security")),
        "net": network,
        "type": header_type,
        "host": host,
        "path": path,
        "tls": security,
        "sni": sni,
    });
    let fields = FieldMap::from_value(&descriptor).ok_or(ParseError::Malformed("v2ray"))?;
    let proxy = vmess::from_v2rayn_json(&fields)?;
    Ok(SubscriptionResult::from_proxies(vec![registry.validate(proxy).proxy]))
}

/// SSAndroid export: an array of profiles, or one profile object
pub fn explode_ssandroid_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root: Value = serde_json::from_str(content)?;
    let items: Vec<&Value> = match &root {
        Value::Array(list) => list.iter().collect(),
        Value::Object(_) => vec![&root],
        _ => return Err(ParseError::Malformed("ssandroid")),
    };
    Ok(SubscriptionResult::from_proxies(collect(items, ss::from_json, registry, "ssandroid")))
}

/// SSTap profile: `proxies` entries typed by `mode`
pub fn explode_sstap_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root = parse_object(content)?;
    let list = root
        .get("proxies")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField("proxies".to_string()))?;

    let mut proxies = Vec::new();
    for item in list {
        let Some(fields) = FieldMap::from_value(item) else {
            continue;
        };
        let build: Builder = match fields.str("mode").to_ascii_lowercase().as_str() {
            "ss" => ss::from_json,
            "ssr" => ssr::from_json,
            "socks5" => socks::from_json,
            "http" => http::from_json,
            other => {
                debug!("skip sstap entry of mode `{}`", other);
                continue;
            }
        };
        proxies.extend(collect([item], build, registry, "sstap"));
    }
    Ok(SubscriptionResult::from_proxies(proxies))
}

/// Netch profile: `Server` entries typed by `Type`, numeric or named
pub fn explode_netch_json(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let root = parse_object(content)?;
    let list = root
        .get("Server")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField("Server".to_string()))?;

    let mut proxies = Vec::new();
    for item in list {
        let Some(fields) = FieldMap::from_value(item) else {
            continue;
        };
        let build: Builder = match fields.str("Type").to_ascii_lowercase().as_str() {
            "1" | "ss" => ss::from_netch,
            "2" | "ssr" => ssr::from_netch,
            "3" | "vmess" => vmess::from_netch,
            "4" | "socks5" => socks::from_netch,
            other => {
                debug!("skip netch entry of type `{}`", other);
                continue;
            }
        };
        let group = fields.str("Group");
        proxies.extend(
            collect([item], build, registry, "netch")
                .into_iter()
                .map(|proxy| proxy.with_group(&group)),
        );
    }
    Ok(SubscriptionResult::from_proxies(proxies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyKind, ProxyType};
    use crate::parser::registry::default_registry;

    #[test]
    fn test_ss_json_group_from_remarks() {
        let doc = r#"{
            "version": "4.1.0", "remarks": "Home",
            "configs": [
                {"server": "1.2.3.4", "server_port": 8388, "method": "aes-256-gcm", "password": "p", "remarks": "A"},
                {"server": "", "server_port": 8388, "method": "aes-256-gcm", "password": "p"}
            ]
        }"#;
        let result = explode_ss_json(doc, default_registry()).unwrap();
        assert_eq!(result.proxies.len(), 1);
        assert_eq!(result.proxies[0].remark, "A");
        assert_eq!(result.proxies[0].group, "Home");
    }

    #[test]
    fn test_ssr_json_single_libev_config() {
        let doc = r#"{"server": "1.2.3.4", "server_port": 443, "local_address": "127.0.0.1", "local_port": 1080,
            "password": "p", "method": "aes-256-cfb", "protocol": "auth_aes128_md5", "obfs": "tls1.2_ticket_auth"}"#;
        let result = explode_ssr_json(doc, default_registry()).unwrap();
        assert_eq!(result.proxies[0].proxy_type, ProxyType::ShadowsocksR);
    }

    #[test]
    fn test_v2ray_first_vnext_only() {
        let doc = r#"{"outbounds": [{
            "protocol": "vmess",
            "settings": {"vnext": [
                {"address": "v.example.com", "port": 443, "users": [{"id": "uuid-1", "alterId": 0, "security": "auto"}, {"id": "uuid-2"}]},
                {"address": "other.example.com", "port": 443, "users": [{"id": "uuid-3"}]}
            ]},
            "streamSettings": {"network": "ws", "security": "tls",
                "wsSettings": {"path": "/ray", "headers": {"Host": "cdn.example.com"}},
                "tlsSettings": {"serverName": "v.example.com"}}
        }]}"#;
        let result = explode_v2ray_json(doc, default_registry()).unwrap();
        assert_eq!(result.proxies.len(), 1);
        let proxy = &result.proxies[0];
        assert_eq!(proxy.hostname, "v.example.com");
        match &proxy.kind {
            ProxyKind::VMess(info) => {
                assert_eq!(info.uuid, "uuid-1");
                assert_eq!(info.transport.network, "ws");
                assert_eq!(info.transport.path, "/ray");
                assert_eq!(info.transport.host, "cdn.example.com");
                assert!(info.tls);
                assert_eq!(info.sni, "v.example.com");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_sstap_modes() {
        let doc = r#"{"idInUse": "1", "proxies": [
            {"mode": "ss", "name": "s", "server": "1.1.1.1", "port": "8388", "method": "aes-128-gcm", "password": "p"},
            {"mode": "socks5", "name": "k", "server": "2.2.2.2", "port": "1080", "username": "u", "password": "p"},
            {"mode": "unknown", "name": "x", "server": "3.3.3.3", "port": "1"}
        ]}"#;
        let result = explode_sstap_json(doc, default_registry()).unwrap();
        let types: Vec<_> = result.proxies.iter().map(|p| p.proxy_type).collect();
        assert_eq!(types, vec![ProxyType::Shadowsocks, ProxyType::Socks5]);
    }

    #[test]
    fn test_netch_types() {
        let doc = r#"{"ModeFileNameType": 1, "Server": [
            {"Type": 4, "Remark": "sock", "Group": "Lab", "Hostname": "1.2.3.4", "Port": 1080},
            {"Type": "SS", "Remark": "ss", "Hostname": "1.2.3.5", "Port": 8388, "EncryptMethod": "aes-128-gcm", "Password": "p"}
        ]}"#;
        let result = explode_netch_json(doc, default_registry()).unwrap();
        assert_eq!(result.proxies.len(), 2);
        assert_eq!(result.proxies[0].group, "Lab");
        assert_eq!(result.proxies[1].proxy_type, ProxyType::Shadowsocks);
    }
}
