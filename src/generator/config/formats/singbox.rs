//! sing-box JSON encoder

use log::debug;
use serde_json::{json, Map, Value};

use crate::generator::config::group::group_members;
use crate::generator::config::ruleconvert::{ruleset_to_singbox, RemoteRuleset};
use crate::generator::config::subexport::{render_each, RenderError, RenderInput, RenderOutput, Target};
use crate::models::{ExtraSettings, Proxy, ProxyGroupConfig, ProxyGroupType, ProxyKind, ProxyType, TransportInfo};
use crate::parser::explodes::ss::plugin_opts_to_string;

fn put_str(map: &mut Map<String, Value>, key: &str, value: &str) {
    if !value.is_empty() {
        map.insert(key.to_string(), json!(value));
    }
}

fn put_list(map: &mut Map<String, Value>, key: &str, values: &[String]) {
    if !values.is_empty() {
        map.insert(key.to_string(), json!(values));
    }
}

/// Leading number of a bandwidth hint such as `100 Mbps`
fn mbps(value: &str) -> Option<u64> {
    let digits: String = value.trim().chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn tls(node: &Proxy, ext: &ExtraSettings, sni: &str, alpn: &[String]) -> Map<String, Value> {
    let mut tls = Map::new();
    tls.insert("enabled".to_string(), json!(true));
    put_str(&mut tls, "server_name", sni);
    put_list(&mut tls, "alpn", alpn);
    if let Some(insecure) = ExtraSettings::resolve(node.skip_cert_verify, ext.skip_cert_verify) {
        tls.insert("insecure".to_string(), json!(insecure));
    }
    tls
}

fn utls(tls: &mut Map<String, Value>, fingerprint: &str) {
    if !fingerprint.is_empty() {
        tls.insert("utls".to_string(), json!({ "enabled": true, "fingerprint": fingerprint }));
    }
}

fn transport(info: &TransportInfo) -> Result<Option<Value>, RenderError> {
    let mut map = Map::new();
    match info.network_or_tcp() {
        "tcp" if info.header_type != "http" => return Ok(None),
        "ws" | "httpupgrade" => {
            map.insert("type".to_string(), json!(info.network_or_tcp()));
            put_str(&mut map, "path", &info.path);
            if !info.host.is_empty() {
                if info.network_or_tcp() == "ws" {
                    map.insert("headers".to_string(), json!({ "Host": info.host }));
                } else {
                    map.insert("host".to_string(), json!(info.host));
                }
            }
        }
        "tcp" | "http" | "h2" => {
            map.insert("type".to_string(), json!("http"));
            if !info.host.is_empty() {
                map.insert("host".to_string(), json!([info.host]));
            }
            put_str(&mut map, "path", &info.path);
        }
        "grpc" => {
            map.insert("type".to_string(), json!("grpc"));
            put_str(&mut map, "service_name", &info.path);
        }
        "quic" => {
            map.insert("type".to_string(), json!("quic"));
        }
        other => return Err(RenderError::Invalid(format!("network {} has no sing-box equivalent", other))),
    }
    Ok(Some(Value::Object(map)))
}

fn put_transport(map: &mut Map<String, Value>, info: &TransportInfo) -> Result<(), RenderError> {
    if let Some(transport) = transport(info)? {
        map.insert("transport".to_string(), transport);
    }
    Ok(())
}

/// Renders one proxy as a sing-box outbound
pub fn proxy_to_outbound(node: &Proxy, ext: &ExtraSettings) -> Result<Value, RenderError> {
    let mut map = Map::new();
    let outbound_type = match &node.kind {
        ProxyKind::Shadowsocks(_) => "shadowsocks",
        ProxyKind::ShadowsocksR(_) => "shadowsocksr",
        ProxyKind::VMess(_) => "vmess",
        ProxyKind::Vless(_) => "vless",
        ProxyKind::Trojan(_) => "trojan",
        ProxyKind::Hysteria(_) if node.proxy_type == ProxyType::Hysteria2 => "hysteria2",
        ProxyKind::Hysteria(_) => "hysteria",
        ProxyKind::Tuic(_) => "tuic",
        ProxyKind::AnyTls(_) => "anytls",
        ProxyKind::Http(_) => "http",
        ProxyKind::Socks5(_) => "socks",
        ProxyKind::WireGuard(_) => "wireguard",
        _ => return Err(RenderError::unsupported(Target::SingBox, node)),
    };
    map.insert("type".to_string(), json!(outbound_type));
    map.insert("tag".to_string(), json!(node.remark));
    if !matches!(node.kind, ProxyKind::WireGuard(_)) {
        map.insert("server".to_string(), json!(node.hostname));
        map.insert("server_port".to_string(), json!(node.port));
    }

    match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            map.insert("method".to_string(), json!(info.method));
            map.insert("password".to_string(), json!(info.password));
            if !info.plugin.is_empty() {
                let plugin = match info.plugin.as_str() {
                    "simple-obfs" => "obfs-local",
                    other => other,
                };
                map.insert("plugin".to_string(), json!(plugin));
                map.insert("plugin_opts".to_string(), json!(plugin_opts_to_string(&info.plugin_opts)));
            }
        }
        ProxyKind::ShadowsocksR(info) => {
            map.insert("method".to_string(), json!(info.method));
            map.insert("password".to_string(), json!(info.password));
            map.insert("protocol".to_string(), json!(info.protocol));
            put_str(&mut map, "protocol_param", &info.protocol_param);
            map.insert("obfs".to_string(), json!(info.obfs));
            put_str(&mut map, "obfs_param", &info.obfs_param);
        }
        ProxyKind::VMess(info) => {
            map.insert("uuid".to_string(), json!(info.uuid));
            map.insert("alter_id".to_string(), json!(info.alter_id));
            let security = if info.cipher.is_empty() { "auto" } else { info.cipher.as_str() };
            map.insert("security".to_string(), json!(security));
            if info.tls {
                map.insert("tls".to_string(), Value::Object(tls(node, ext, &info.sni, &[])));
            }
            put_transport(&mut map, &info.transport)?;
        }
        ProxyKind::Vless(info) => {
            map.insert("uuid".to_string(), json!(info.uuid));
            put_str(&mut map, "flow", &info.flow);
            if info.tls || info.reality.is_some() {
                let mut tls = tls(node, ext, &info.sni, &[]);
                utls(&mut tls, &info.fingerprint);
                if let Some(reality) = &info.reality {
                    let mut r = Map::new();
                    r.insert("enabled".to_string(), json!(true));
                    r.insert("public_key".to_string(), json!(reality.public_key));
                    put_str(&mut r, "short_id", &reality.short_id);
                    tls.insert("reality".to_string(), Value::Object(r));
                }
                map.insert("tls".to_string(), Value::Object(tls));
            }
            put_transport(&mut map, &info.transport)?;
        }
        ProxyKind::Trojan(info) => {
            map.insert("password".to_string(), json!(info.password));
            map.insert("tls".to_string(), Value::Object(tls(node, ext, &info.sni, &[])));
            put_transport(&mut map, &info.transport)?;
        }
        ProxyKind::Hysteria(info) => {
            if node.proxy_type == ProxyType::Hysteria2 {
                map.insert("password".to_string(), json!(info.password));
                if !info.obfs.is_empty() {
                    map.insert(
                        "obfs".to_string(),
                        json!({ "type": info.obfs, "password": info.obfs_password }),
                    );
                }
            } else {
                put_str(&mut map, "auth_str", &info.password);
                put_str(&mut map, "obfs", &info.obfs);
            }
            if let Some(up) = mbps(&info.up) {
                map.insert("up_mbps".to_string(), json!(up));
            }
            if let Some(down) = mbps(&info.down) {
                map.insert("down_mbps".to_string(), json!(down));
            }
            map.insert("tls".to_string(), Value::Object(tls(node, ext, &info.sni, &info.alpn)));
        }
        ProxyKind::Tuic(info) => {
            map.insert("uuid".to_string(), json!(info.uuid));
            map.insert("password".to_string(), json!(info.password));
            put_str(&mut map, "congestion_control", &info.congestion_control);
            put_str(&mut map, "udp_relay_mode", &info.udp_relay_mode);
            map.insert("tls".to_string(), Value::Object(tls(node, ext, &info.sni, &info.alpn)));
        }
        ProxyKind::AnyTls(info) => {
            map.insert("password".to_string(), json!(info.password));
            if info.idle_session_check_interval > 0 {
                map.insert(
                    "idle_session_check_interval".to_string(),
                    json!(format!("{}s", info.idle_session_check_interval)),
                );
            }
            if info.idle_session_timeout > 0 {
                map.insert(
                    "idle_session_timeout".to_string(),
                    json!(format!("{}s", info.idle_session_timeout)),
                );
            }
            if info.min_idle_session > 0 {
                map.insert("min_idle_session".to_string(), json!(info.min_idle_session));
            }
            let mut tls = tls(node, ext, &info.sni, &info.alpn);
            utls(&mut tls, &info.fingerprint);
            map.insert("tls".to_string(), Value::Object(tls));
        }
        ProxyKind::Http(info) => {
            put_str(&mut map, "username", &info.username);
            put_str(&mut map, "password", &info.password);
            if info.tls {
                map.insert("tls".to_string(), Value::Object(tls(node, ext, "", &[])));
            }
        }
        ProxyKind::Socks5(info) => {
            map.insert("version".to_string(), json!("5"));
            put_str(&mut map, "username", &info.username);
            put_str(&mut map, "password", &info.password);
        }
        ProxyKind::WireGuard(info) => {
            let addresses: Vec<&str> = [info.self_ip.as_str(), info.self_ipv6.as_str()]
                .into_iter()
                .filter(|a| !a.is_empty())
                .collect();
            map.insert("local_address".to_string(), json!(addresses));
            map.insert("private_key".to_string(), json!(info.private_key));
            let allowed = if info.allowed_ips.is_empty() {
                vec!["0.0.0.0/0".to_string(), "::/0".to_string()]
            } else {
                info.allowed_ips.clone()
            };
            let mut peer = Map::new();
            peer.insert("server".to_string(), json!(node.hostname));
            peer.insert("server_port".to_string(), json!(node.port));
            peer.insert("public_key".to_string(), json!(info.public_key));
            put_str(&mut peer, "pre_shared_key", &info.preshared_key);
            peer.insert("allowed_ips".to_string(), json!(allowed));
            map.insert("peers".to_string(), json!([peer]));
            if info.mtu > 0 {
                map.insert("mtu".to_string(), json!(info.mtu));
            }
        }
        _ => {}
    }

    if ExtraSettings::resolve(node.udp, ext.udp) == Some(false) {
        map.insert("network".to_string(), json!("tcp"));
    }
    if let Some(tfo) = ExtraSettings::resolve(node.tfo, ext.tfo) {
        map.insert("tcp_fast_open".to_string(), json!(tfo));
    }
    Ok(Value::Object(map))
}

fn group_to_outbound(group: &ProxyGroupConfig, nodes: &[Proxy]) -> Value {
    let mut map = Map::new();
    let probing = match group.group_type {
        ProxyGroupType::Select => false,
        ProxyGroupType::URLTest | ProxyGroupType::Fallback => true,
        other => {
            debug!("Group '{}': {} has no sing-box equivalent, using selector", group.name, other.as_str());
            false
        }
    };
    map.insert("type".to_string(), json!(if probing { "urltest" } else { "selector" }));
    map.insert("tag".to_string(), json!(group.name));
    map.insert("outbounds".to_string(), json!(group_members(group, nodes)));
    if probing {
        put_str(&mut map, "url", &group.url);
        if group.interval > 0 {
            map.insert("interval".to_string(), json!(format!("{}s", group.interval)));
        }
        if group.tolerance > 0 {
            map.insert("tolerance".to_string(), json!(group.tolerance));
        }
    }
    Value::Object(map)
}

fn remote_rule_set(remote: &RemoteRuleset) -> Value {
    let mut rule_set = json!({
        "tag": remote.name,
        "type": "remote",
        "format": "source",
        "url": remote.location,
    });
    if remote.interval > 0 {
        rule_set["update_interval"] = json!(format!("{}s", remote.interval));
    }
    rule_set
}

/// Runs `f` on the object stored under `key`, replacing any non-object value
fn with_object<F>(map: &mut Map<String, Value>, key: &str, f: F)
where
    F: FnOnce(&mut Map<String, Value>),
{
    let entry = map.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(inner) = entry {
        f(inner);
    }
}

/// Renders a sing-box configuration merged into the JSON base document
pub fn proxy_to_singbox(input: &RenderInput, ext: &ExtraSettings) -> Result<RenderOutput, RenderError> {
    let mut root = if input.base.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(input.base) {
            Ok(Value::Object(map)) => map,
            Ok(Value::Null) => Map::new(),
            Ok(_) => return Err(RenderError::Invalid("sing-box base is not a JSON object".to_string())),
            Err(e) => return Err(RenderError::Invalid(format!("sing-box base: {}", e))),
        }
    };

    let rendered = render_each(input.proxies, Target::SingBox, |node| proxy_to_outbound(node, ext));

    let mut outbounds = vec![
        json!({ "type": "direct", "tag": "DIRECT" }),
        json!({ "type": "block", "tag": "REJECT" }),
    ];
    outbounds.extend(rendered.items);
    outbounds.extend(input.groups.iter().map(|g| group_to_outbound(g, &rendered.nodes)));
    root.insert("outbounds".to_string(), Value::Array(outbounds));

    if ext.enable_rule_generator {
        let rules = ruleset_to_singbox(input.raw_rules, input.rulesets);
        with_object(&mut root, "route", |route| {
            route.insert("rules".to_string(), Value::Array(rules.rules));
            route.insert("final".to_string(), json!(rules.final_outbound));
            if !rules.remote.is_empty() {
                route.insert(
                    "rule_set".to_string(),
                    Value::Array(rules.remote.iter().map(remote_rule_set).collect()),
                );
            }
        });
    }

    if ext.singbox_add_clash_mode {
        with_object(&mut root, "experimental", |experimental| {
            with_object(experimental, "clash_api", |clash_api| {
                clash_api.insert("default_mode".to_string(), json!("rule"));
            });
        });
    }

    let text = serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| RenderError::Invalid(e.to_string()))?;
    Ok(RenderOutput {
        text,
        skipped: rendered.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        RealityInfo, RulesetBody, RulesetContent, RulesetType, ShadowsocksInfo, SnellInfo, VlessInfo,
    };

    fn render_json(input: &RenderInput, ext: &ExtraSettings) -> (Value, usize) {
        let output = proxy_to_singbox(input, ext).unwrap();
        (serde_json::from_str(&output.text).unwrap(), output.skipped.len())
    }

    #[test]
    fn test_vless_reality_outbound() {
        let node = Proxy::new(
            ProxyKind::Vless(VlessInfo {
                uuid: "uuid-1".to_string(),
                flow: "xtls-rprx-vision".to_string(),
                tls: true,
                sni: "www.microsoft.com".to_string(),
                fingerprint: "chrome".to_string(),
                reality: Some(RealityInfo {
                    public_key: "pk".to_string(),
                    short_id: "ab".to_string(),
                }),
                ..Default::default()
            }),
            "R",
            "r.example.com",
            443,
        );
        let outbound = proxy_to_outbound(&node, &ExtraSettings::default()).unwrap();
        assert_eq!(outbound["type"], "vless");
        assert_eq!(outbound["flow"], "xtls-rprx-vision");
        assert_eq!(outbound["tls"]["server_name"], "www.microsoft.com");
        assert_eq!(outbound["tls"]["utls"]["fingerprint"], "chrome");
        assert_eq!(outbound["tls"]["reality"]["public_key"], "pk");
        assert!(outbound.get("transport").is_none());
    }

    #[test]
    fn test_full_config() {
        let mut ss = Proxy::new(
            ProxyKind::Shadowsocks(ShadowsocksInfo {
                method: "aes-256-gcm".to_string(),
                password: "pw".to_string(),
                ..Default::default()
            }),
            "SS",
            "s.example.com",
            8388,
        );
        ss.udp = Some(false);
        let snell = Proxy::new(ProxyKind::Snell(SnellInfo::default()), "Snell", "n.example.com", 443);
        let groups = vec![ProxyGroupConfig {
            proxies: vec![".*".to_string()],
            ..ProxyGroupConfig::new("Auto", ProxyGroupType::URLTest)
        }];
        let rulesets = vec![
            RulesetContent {
                group: "Auto".to_string(),
                body: RulesetBody::Inline("DOMAIN-SUFFIX,google.com".to_string()),
            },
            RulesetContent {
                group: "Auto".to_string(),
                body: RulesetBody::Unavailable {
                    location: "https://rules.example.com/geo.list".to_string(),
                    kind: RulesetType::Surge,
                    interval: 0,
                },
            },
        ];
        let (config, skipped) = render_json(
            &RenderInput {
                proxies: &[ss, snell],
                groups: &groups,
                raw_rules: &[],
                rulesets: &rulesets,
                base: r#"{"log": {"level": "info"}, "route": {"auto_detect_interface": true}}"#,
            },
            &ExtraSettings::default(),
        );

        assert_eq!(skipped, 1);
        assert_eq!(config["log"]["level"], "info");
        let outbounds = config["outbounds"].as_array().unwrap();
        assert_eq!(outbounds.len(), 4);
        assert_eq!(outbounds[0]["tag"], "DIRECT");
        assert_eq!(outbounds[1]["type"], "block");
        assert_eq!(outbounds[2]["network"], "tcp");
        assert_eq!(outbounds[3]["type"], "urltest");
        assert_eq!(outbounds[3]["outbounds"], json!(["SS"]));
        assert_eq!(outbounds[3]["interval"], "300s");

        assert_eq!(config["route"]["auto_detect_interface"], true);
        assert_eq!(config["route"]["final"], "DIRECT");
        assert_eq!(
            config["route"]["rules"],
            json!([
                { "domain_suffix": ["google.com"], "outbound": "Auto" },
                { "rule_set": ["geo"], "outbound": "Auto" },
            ])
        );
        assert_eq!(config["route"]["rule_set"][0]["url"], "https://rules.example.com/geo.list");
        assert_eq!(config["experimental"]["clash_api"]["default_mode"], "rule");
    }

    #[test]
    fn test_bad_base() {
        let input = RenderInput {
            proxies: &[],
            groups: &[],
            raw_rules: &[],
            rulesets: &[],
            base: "[1, 2]",
        };
        assert!(proxy_to_singbox(&input, &ExtraSettings::default()).is_err());
    }

    #[test]
    fn test_remote_rule_set_interval() {
        let mut remote = RemoteRuleset {
            name: "geo".to_string(),
            group: "Auto".to_string(),
            location: "https://rules.example.com/geo.list".to_string(),
            kind: RulesetType::Surge,
            interval: 0,
        };
        assert!(remote_rule_set(&remote).get("update_interval").is_none());
        remote.interval = 3600;
        assert_eq!(remote_rule_set(&remote)["update_interval"], "3600s");
    }
}
