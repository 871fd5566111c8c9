//! Clash YAML encoder
//!
//! Proxies, groups and rules are merged into the base document; keys of the
//! base that are not generated here stay where they are.

use log::debug;
use serde_yaml::{Mapping, Value};

use crate::generator::config::group::group_members;
use crate::generator::config::ruleconvert::{ruleset_to_rules, RemoteRuleset, RuleFlavor};
use crate::generator::config::subexport::{render_each, RenderError, RenderInput, RenderOutput, Target};
use crate::models::{
    ExtraSettings, Proxy, ProxyGroupConfig, ProxyGroupType, ProxyKind, ProxyType, ShadowsocksInfo, TransportInfo,
};

fn put(map: &mut Mapping, key: &str, value: impl Into<Value>) {
    map.insert(Value::from(key), value.into());
}

fn put_str(map: &mut Mapping, key: &str, value: &str) {
    if !value.is_empty() {
        put(map, key, value);
    }
}

fn put_list(map: &mut Mapping, key: &str, values: &[String]) {
    if !values.is_empty() {
        put(map, key, values.to_vec());
    }
}

fn put_flag(map: &mut Mapping, key: &str, node_flag: Option<bool>, global: Option<bool>) {
    if let Some(value) = ExtraSettings::resolve(node_flag, global) {
        put(map, key, value);
    }
}

fn ss_plugin(map: &mut Mapping, info: &ShadowsocksInfo) -> Result<(), RenderError> {
    let opt = |key: &str| info.plugin_opts.get(key).cloned().unwrap_or_default();
    match info.plugin.as_str() {
        "" => {}
        "obfs-local" | "simple-obfs" => {
            let mut opts = Mapping::new();
            put_str(&mut opts, "mode", &opt("obfs"));
            put_str(&mut opts, "host", &opt("obfs-host"));
            put(map, "plugin", "obfs");
            put(map, "plugin-opts", opts);
        }
        "v2ray-plugin" => {
            let mut opts = Mapping::new();
            put(&mut opts, "mode", "websocket");
            put_str(&mut opts, "host", &opt("host"));
            put_str(&mut opts, "path", &opt("path"));
            if info.plugin_opts.contains_key("tls") {
                put(&mut opts, "tls", true);
            }
            if info.plugin_opts.contains_key("mux") {
                put(&mut opts, "mux", true);
            }
            put(map, "plugin", "v2ray-plugin");
            put(map, "plugin-opts", opts);
        }
        other => {
            let mut opts = Mapping::new();
            for (key, value) in info.plugin_opts.iter() {
                put(&mut opts, key, value.as_str());
            }
            put(map, "plugin", other);
            if !opts.is_empty() {
                put(map, "plugin-opts", opts);
            }
        }
    }
    Ok(())
}

/// Writes `network` and its `*-opts` for vmess, vless and trojan
fn transport(map: &mut Mapping, transport: &TransportInfo) -> Result<(), RenderError> {
    let network = transport.network_or_tcp();
    let http_opts = |map: &mut Mapping| {
        let mut opts = Mapping::new();
        put(&mut opts, "method", "GET");
        let path = if transport.path.is_empty() { "/" } else { transport.path.as_str() };
        put(&mut opts, "path", vec![path.to_string()]);
        if !transport.host.is_empty() {
            let mut headers = Mapping::new();
            put(&mut headers, "Host", vec![transport.host.clone()]);
            put(&mut opts, "headers", headers);
        }
        put(map, "network", "http");
        put(map, "http-opts", opts);
    };
    match network {
        "tcp" if transport.header_type == "http" => http_opts(map),
        "tcp" => {}
        "http" => http_opts(map),
        "ws" | "httpupgrade" => {
            let mut opts = Mapping::new();
            put_str(&mut opts, "path", &transport.path);
            if !transport.host.is_empty() {
                let mut headers = Mapping::new();
                put(&mut headers, "Host", transport.host.as_str());
                put(&mut opts, "headers", headers);
            }
            if network == "httpupgrade" {
                put(&mut opts, "v2ray-http-upgrade", true);
            }
            put(map, "network", "ws");
            put(map, "ws-opts", opts);
        }
        "h2" => {
            let mut opts = Mapping::new();
            if !transport.host.is_empty() {
                put(&mut opts, "host", vec![transport.host.clone()]);
            }
            put_str(&mut opts, "path", &transport.path);
            put(map, "network", "h2");
            put(map, "h2-opts", opts);
        }
        "grpc" => {
            let mut opts = Mapping::new();
            put_str(&mut opts, "grpc-service-name", &transport.path);
            put(map, "network", "grpc");
            put(map, "grpc-opts", opts);
        }
        other => return Err(RenderError::Invalid(format!("network {} has no Clash equivalent", other))),
    }
    Ok(())
}

const SSR_CIPHERS: [&str; 11] = [
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
    "aes-128-ofb",
    "aes-192-ofb",
    "aes-256-ofb",
    "chacha20-ietf",
    "rc4-md5",
];
const SSR_PROTOCOLS: [&str; 5] = ["origin", "auth_sha1_v4", "auth_aes128_md5", "auth_aes128_sha1", "auth_chain_a"];
const SSR_OBFS: [&str; 4] = ["plain", "http_simple", "http_post", "tls1.2_ticket_auth"];

/// Rejects ciphers and SSR options current Clash cores no longer accept
fn check_deprecated(node: &Proxy) -> Result<(), RenderError> {
    match &node.kind {
        ProxyKind::Shadowsocks(info) if info.method == "chacha20" => {
            Err(RenderError::Invalid("cipher chacha20 is deprecated".to_string()))
        }
        ProxyKind::ShadowsocksR(info) => {
            if !SSR_CIPHERS.contains(&info.method.as_str()) {
                Err(RenderError::Invalid(format!("cipher {} is deprecated", info.method)))
            } else if !SSR_PROTOCOLS.contains(&info.protocol.as_str()) {
                Err(RenderError::Invalid(format!("protocol {} is deprecated", info.protocol)))
            } else if !SSR_OBFS.contains(&info.obfs.as_str()) {
                Err(RenderError::Invalid(format!("obfs {} is deprecated", info.obfs)))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

/// Renders one proxy as a Clash proxy mapping.
///
/// An attached option bag wins over the native payload; only its name is
/// replaced with the current remark.
pub fn proxy_to_clash_mapping(node: &Proxy, ext: &ExtraSettings) -> Result<Mapping, RenderError> {
    if let Some(bag) = &node.options {
        let value = serde_yaml::to_value(bag).map_err(|e| RenderError::Invalid(e.to_string()))?;
        let Value::Mapping(mut map) = value else {
            return Err(RenderError::Invalid("option bag is not a mapping".to_string()));
        };
        put(&mut map, "name", node.remark.as_str());
        return Ok(map);
    }

    if ext.filter_deprecated {
        check_deprecated(node)?;
    }

    let mut map = Mapping::new();
    put(&mut map, "name", node.remark.as_str());
    put(&mut map, "type", clash_type(node));
    put(&mut map, "server", node.hostname.as_str());
    put(&mut map, "port", node.port);

    match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            put(&mut map, "cipher", info.method.as_str());
            put(&mut map, "password", info.password.as_str());
            ss_plugin(&mut map, info)?;
        }
        ProxyKind::ShadowsocksR(info) => {
            put(&mut map, "cipher", info.method.as_str());
            put(&mut map, "password", info.password.as_str());
            put(&mut map, "protocol", info.protocol.as_str());
            put(&mut map, "protocol-param", info.protocol_param.as_str());
            put(&mut map, "obfs", info.obfs.as_str());
            put(&mut map, "obfs-param", info.obfs_param.as_str());
        }
        ProxyKind::VMess(info) => {
            put(&mut map, "uuid", info.uuid.as_str());
            put(&mut map, "alterId", info.alter_id);
            put(&mut map, "cipher", if info.cipher.is_empty() { "auto" } else { info.cipher.as_str() });
            if info.tls {
                put(&mut map, "tls", true);
            }
            put_str(&mut map, "servername", &info.sni);
            transport(&mut map, &info.transport)?;
        }
        ProxyKind::Vless(info) => {
            put(&mut map, "uuid", info.uuid.as_str());
            put_str(&mut map, "flow", &info.flow);
            if info.tls {
                put(&mut map, "tls", true);
            }
            put_str(&mut map, "servername", &info.sni);
            put_str(&mut map, "client-fingerprint", &info.fingerprint);
            if let Some(reality) = &info.reality {
                let mut opts = Mapping::new();
                put(&mut opts, "public-key", reality.public_key.as_str());
                put_str(&mut opts, "short-id", &reality.short_id);
                put(&mut map, "reality-opts", opts);
            }
            transport(&mut map, &info.transport)?;
        }
        ProxyKind::Trojan(info) => {
            put(&mut map, "password", info.password.as_str());
            put_str(&mut map, "sni", &info.sni);
            transport(&mut map, &info.transport)?;
        }
        ProxyKind::Hysteria(info) => {
            if node.proxy_type == ProxyType::Hysteria2 {
                put(&mut map, "password", info.password.as_str());
                put_str(&mut map, "obfs", &info.obfs);
                put_str(&mut map, "obfs-password", &info.obfs_password);
            } else {
                put_str(&mut map, "auth-str", &info.password);
                put_str(&mut map, "obfs", &info.obfs);
                if let Some(protocol) = info.params.get("protocol") {
                    put(&mut map, "protocol", protocol.as_str());
                }
            }
            put_str(&mut map, "up", &info.up);
            put_str(&mut map, "down", &info.down);
            put_str(&mut map, "sni", &info.sni);
            put_list(&mut map, "alpn", &info.alpn);
        }
        ProxyKind::Tuic(info) => {
            put(&mut map, "uuid", info.uuid.as_str());
            put_str(&mut map, "password", &info.password);
            put_str(&mut map, "sni", &info.sni);
            put_list(&mut map, "alpn", &info.alpn);
            put_str(&mut map, "congestion-controller", &info.congestion_control);
            put_str(&mut map, "udp-relay-mode", &info.udp_relay_mode);
        }
        ProxyKind::AnyTls(info) => {
            put(&mut map, "password", info.password.as_str());
            put_str(&mut map, "sni", &info.sni);
            put_list(&mut map, "alpn", &info.alpn);
            put_str(&mut map, "client-fingerprint", &info.fingerprint);
            if info.idle_session_check_interval > 0 {
                put(&mut map, "idle-session-check-interval", info.idle_session_check_interval);
            }
            if info.idle_session_timeout > 0 {
                put(&mut map, "idle-session-timeout", info.idle_session_timeout);
            }
            if info.min_idle_session > 0 {
                put(&mut map, "min-idle-session", info.min_idle_session);
            }
        }
        ProxyKind::Http(info) => {
            put_str(&mut map, "username", &info.username);
            put_str(&mut map, "password", &info.password);
            if info.tls {
                put(&mut map, "tls", true);
            }
        }
        ProxyKind::Socks5(info) => {
            put_str(&mut map, "username", &info.username);
            put_str(&mut map, "password", &info.password);
            if info.tls {
                put(&mut map, "tls", true);
            }
        }
        ProxyKind::Snell(info) => {
            put(&mut map, "psk", info.psk.as_str());
            if info.version > 0 {
                put(&mut map, "version", info.version);
            }
            if !info.obfs.is_empty() {
                let mut opts = Mapping::new();
                put(&mut opts, "mode", info.obfs.as_str());
                put_str(&mut opts, "host", &info.obfs_host);
                put(&mut map, "obfs-opts", opts);
            }
        }
        ProxyKind::WireGuard(info) => {
            put_str(&mut map, "ip", &info.self_ip);
            put_str(&mut map, "ipv6", &info.self_ipv6);
            put(&mut map, "private-key", info.private_key.as_str());
            put(&mut map, "public-key", info.public_key.as_str());
            put_str(&mut map, "pre-shared-key", &info.preshared_key);
            put_list(&mut map, "dns", &info.dns);
            if info.mtu > 0 {
                put(&mut map, "mtu", info.mtu);
            }
            put_list(&mut map, "allowed-ips", &info.allowed_ips);
            if info.keepalive > 0 {
                put(&mut map, "persistent-keepalive", info.keepalive);
            }
        }
        ProxyKind::Opaque { .. } => return Err(RenderError::unsupported(Target::Clash, node)),
    }

    put_flag(&mut map, "udp", node.udp, ext.udp);
    put_flag(&mut map, "tfo", node.tfo, ext.tfo);
    if has_tls(node) {
        put_flag(&mut map, "skip-cert-verify", node.skip_cert_verify, ext.skip_cert_verify);
    }
    Ok(map)
}

fn clash_type(node: &Proxy) -> &'static str {
    match node.proxy_type {
        ProxyType::Socks5 => "socks5",
        ProxyType::Http => "http",
        other => other.as_str(),
    }
}

fn has_tls(node: &Proxy) -> bool {
    match &node.kind {
        ProxyKind::VMess(info) => info.tls,
        ProxyKind::Vless(info) => info.tls,
        ProxyKind::Http(info) => info.tls,
        ProxyKind::Socks5(info) => info.tls,
        ProxyKind::Trojan(_) | ProxyKind::Hysteria(_) | ProxyKind::Tuic(_) | ProxyKind::AnyTls(_) => true,
        _ => false,
    }
}

fn group_to_mapping(group: &ProxyGroupConfig, nodes: &[Proxy]) -> Mapping {
    let mut map = Mapping::new();
    put(&mut map, "name", group.name.as_str());
    let group_type = match group.group_type {
        ProxyGroupType::SSID => {
            debug!("Group '{}': ssid has no Clash equivalent, using select", group.name);
            ProxyGroupType::Select
        }
        other => other,
    };
    put(&mut map, "type", group_type.as_str());
    if group_type.is_probing() {
        put_str(&mut map, "url", &group.url);
        if group.interval > 0 {
            put(&mut map, "interval", group.interval);
        }
        if group.tolerance > 0 {
            put(&mut map, "tolerance", group.tolerance);
        }
        if group.timeout > 0 {
            put(&mut map, "timeout", group.timeout);
        }
    }
    if let (ProxyGroupType::LoadBalance, Some(strategy)) = (group_type, group.strategy) {
        put(&mut map, "strategy", strategy.as_str());
    }
    if let Some(lazy) = group.lazy {
        put(&mut map, "lazy", lazy);
    }
    if let Some(disable_udp) = group.disable_udp {
        put(&mut map, "disable-udp", disable_udp);
    }
    put(&mut map, "proxies", group_members(group, nodes));
    map
}

fn rule_providers(remote: &[RemoteRuleset]) -> Mapping {
    let mut providers = Mapping::new();
    for ruleset in remote {
        let mut provider = Mapping::new();
        put(&mut provider, "type", "http");
        put(&mut provider, "behavior", ruleset.kind.clash_behavior());
        put(&mut provider, "url", ruleset.location.as_str());
        put(&mut provider, "path", format!("./providers/{}.yaml", ruleset.name));
        put(&mut provider, "interval", ruleset.refresh_interval());
        put(&mut providers, &ruleset.name, provider);
    }
    providers
}

/// Renders a Clash configuration.
///
/// Fails only when the base document is not a YAML mapping.
pub fn proxy_to_clash(input: &RenderInput, ext: &ExtraSettings) -> Result<RenderOutput, RenderError> {
    let mut doc = if input.base.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(input.base) {
            Ok(Value::Mapping(map)) => map,
            Ok(Value::Null) => Mapping::new(),
            Ok(_) => return Err(RenderError::Invalid("Clash base is not a mapping".to_string())),
            Err(err) => return Err(RenderError::Invalid(format!("Clash base: {}", err))),
        }
    };

    let rendered = render_each(input.proxies, Target::Clash, |node| proxy_to_clash_mapping(node, ext));
    let proxies: Vec<Value> = rendered.items.into_iter().map(Value::Mapping).collect();
    put(&mut doc, "proxies", proxies);

    if !input.groups.is_empty() {
        let groups: Vec<Value> = input
            .groups
            .iter()
            .map(|g| Value::Mapping(group_to_mapping(g, &rendered.nodes)))
            .collect();
        put(&mut doc, "proxy-groups", groups);
    }

    if ext.enable_rule_generator {
        let rules = ruleset_to_rules(input.raw_rules, input.rulesets, RuleFlavor::Clash);
        if !rules.remote.is_empty() {
            put(&mut doc, "rule-providers", rule_providers(&rules.remote));
        }
        put(&mut doc, "rules", rules.rules);
    }

    let text = serde_yaml::to_string(&Value::Mapping(doc)).map_err(|e| RenderError::Invalid(e.to_string()))?;
    Ok(RenderOutput {
        text,
        skipped: rendered.skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OptionsBag, RulesetBody, RulesetContent, ShadowsocksRInfo, VMessInfo, WireGuardInfo};

    fn input<'a>(proxies: &'a [Proxy], groups: &'a [ProxyGroupConfig], rulesets: &'a [RulesetContent]) -> RenderInput<'a> {
        RenderInput {
            proxies,
            groups,
            raw_rules: &[],
            rulesets,
            base: "mixed-port: 7890\nmode: rule\n",
        }
    }

    fn parse(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_filter_deprecated_ssr() {
        let node = Proxy::new(
            ProxyKind::ShadowsocksR(ShadowsocksRInfo {
                method: "aes-256-cfb".to_string(),
                password: "pw".to_string(),
                protocol: "auth_chain_b".to_string(),
                obfs: "plain".to_string(),
                ..Default::default()
            }),
            "R",
            "r.example.com",
            443,
        );
        assert!(proxy_to_clash_mapping(&node, &ExtraSettings::default()).is_ok());
        let ext = ExtraSettings {
            filter_deprecated: true,
            ..Default::default()
        };
        assert_eq!(
            proxy_to_clash_mapping(&node, &ext).unwrap_err().to_string(),
            "protocol auth_chain_b is deprecated"
        );
    }

    #[test]
    fn test_vmess_ws_mapping() {
        let mut node = Proxy::new(
            ProxyKind::VMess(VMessInfo {
                uuid: "id".to_string(),
                tls: true,
                transport: TransportInfo {
                    network: "ws".to_string(),
                    host: "cdn.example.com".to_string(),
                    path: "/ws".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            "V",
            "v.example.com",
            443,
        );
        node.skip_cert_verify = Some(true);
        let ext = ExtraSettings {
            udp: Some(true),
            ..Default::default()
        };
        let map = Value::Mapping(proxy_to_clash_mapping(&node, &ext).unwrap());
        assert_eq!(map["type"], Value::from("vmess"));
        assert_eq!(map["cipher"], Value::from("auto"));
        assert_eq!(map["network"], Value::from("ws"));
        assert_eq!(map["ws-opts"]["headers"]["Host"], Value::from("cdn.example.com"));
        assert_eq!(map["udp"], Value::from(true));
        assert_eq!(map["skip-cert-verify"], Value::from(true));
    }

    #[test]
    fn test_option_bag_preferred() {
        let mut node = Proxy::new(
            ProxyKind::Opaque {
                type_name: "mieru".to_string(),
            },
            "renamed",
            "m.example.com",
            2999,
        );
        let mut bag = OptionsBag::new();
        bag.insert("name".to_string(), "old".into());
        bag.insert("type".to_string(), "mieru".into());
        bag.insert("transport".to_string(), "TCP".into());
        node.options = Some(bag);
        let map = Value::Mapping(proxy_to_clash_mapping(&node, &ExtraSettings::default()).unwrap());
        assert_eq!(map["name"], Value::from("renamed"));
        assert_eq!(map["transport"], Value::from("TCP"));
    }

    #[test]
    fn test_config_groups_rules_and_providers() {
        let proxies = vec![
            Proxy::new(
                ProxyKind::ShadowsocksR(ShadowsocksRInfo {
                    method: "aes-256-cfb".to_string(),
                    password: "pw".to_string(),
                    protocol: "auth_aes128_md5".to_string(),
                    obfs: "tls1.2_ticket_auth".to_string(),
                    ..Default::default()
                }),
                "HK SSR",
                "a.example.com",
                443,
            ),
            Proxy::new(
                ProxyKind::Opaque {
                    type_name: "mieru".to_string(),
                },
                "Opaque",
                "b.example.com",
                1,
            ),
        ];
        let groups = vec![
            ProxyGroupConfig {
                proxies: vec![".*".to_string()],
                ..ProxyGroupConfig::new("Proxy", ProxyGroupType::Select)
            },
            ProxyGroupConfig {
                proxies: vec!["US".to_string()],
                ..ProxyGroupConfig::new("US", ProxyGroupType::URLTest)
            },
        ];
        let rulesets = vec![
            RulesetContent {
                group: "Proxy".to_string(),
                body: RulesetBody::Unavailable {
                    location: "http://127.0.0.1:9/ads.yaml".to_string(),
                    kind: crate::models::RulesetType::ClashDomain,
                    interval: 0,
                },
            },
            RulesetContent {
                group: "Proxy".to_string(),
                body: RulesetBody::Inline("GEOIP,CN".to_string()),
            },
        ];

        let output = proxy_to_clash(&input(&proxies, &groups, &rulesets), &ExtraSettings::default()).unwrap();
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].0, "Opaque");

        let doc = parse(&output.text);
        assert_eq!(doc["mixed-port"], Value::from(7890));
        assert_eq!(doc["proxies"][0]["type"], Value::from("ssr"));
        assert_eq!(doc["proxy-groups"][0]["proxies"], Value::from(vec!["HK SSR".to_string()]));
        assert_eq!(doc["proxy-groups"][1]["proxies"], Value::from(vec!["DIRECT".to_string()]));
        assert_eq!(doc["proxy-groups"][1]["interval"], Value::from(300));
        assert_eq!(doc["rule-providers"]["ads"]["behavior"], Value::from("domain"));
        assert_eq!(doc["rule-providers"]["ads"]["interval"], Value::from(86400));
        assert_eq!(
            doc["rules"],
            Value::from(vec![
                "RULE-SET,ads,Proxy".to_string(),
                "GEOIP,CN,Proxy".to_string(),
                "MATCH,DIRECT".to_string(),
            ])
        );
    }

    #[test]
    fn test_quic_transport_is_skipped() {
        let node = Proxy::new(
            ProxyKind::VMess(VMessInfo {
                transport: TransportInfo {
                    network: "quic".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
            "Q",
            "q.example.com",
            443,
        );
        let wg = Proxy::new(ProxyKind::WireGuard(WireGuardInfo::default()), "WG", "w.example.com", 51820);
        let output = proxy_to_clash(&input(&[node, wg], &[], &[]), &ExtraSettings::default()).unwrap();
        assert_eq!(output.skipped, vec![("Q".to_string(), "network quic has no Clash equivalent".to_string())]);
    }

    #[test]
    fn test_bad_base_is_an_error() {
        let mut input = input(&[], &[], &[]);
        input.base = "- a\n- b\n";
        assert!(proxy_to_clash(&input, &ExtraSettings::default()).is_err());
    }

    #[test]
    fn test_hysteria_v1_keeps_obfs() {
        let node = crate::parser::default_registry()
            .decode_link("hysteria://h.example.com:443?auth=pw&obfs=secret&upmbps=10&downmbps=50#H")
            .unwrap()
            .into_proxy();
        let map = proxy_to_clash_mapping(&node, &ExtraSettings::default()).unwrap();
        assert_eq!(map.get("type").and_then(Value::as_str), Some("hysteria"));
        assert_eq!(map.get("auth-str").and_then(Value::as_str), Some("pw"));
        assert_eq!(map.get("obfs").and_then(Value::as_str), Some("secret"));
        assert_eq!(map.get("up").and_then(Value::as_str), Some("10"));
    }
}
