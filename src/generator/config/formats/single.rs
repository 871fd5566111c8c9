//! Share-link encoders and the base64 single-link bundle.

use serde_json::json;

use crate::generator::config::subexport::{render_each, RenderError, RenderOutput, SingleKind, Target};
use crate::models::{
    ExtraSettings, Proxy, ProxyKind, ProxyType, ShadowsocksRInfo, TransportInfo,
};
use crate::parser::explodes::common::format_host;
use crate::parser::explodes::ss::plugin_opts_to_string;
use crate::utils::base64::{base64_encode, url_safe_base64_encode};
use crate::utils::url::{build_query, url_encode};

/// Stream ciphers ShadowsocksR clients accept for a plain Shadowsocks server
const SSR_CIPHERS: [&str; 21] = [
    "none",
    "table",
    "rc4",
    "rc4-md5",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
    "bf-cfb",
    "camellia-128-cfb",
    "camellia-192-cfb",
    "camellia-256-cfb",
    "cast5-cfb",
    "des-cfb",
    "idea-cfb",
    "rc2-cfb",
    "seed-cfb",
    "salsa20",
    "chacha20",
];

fn address(node: &Proxy) -> String {
    format!("{}:{}", format_host(&node.hostname), node.port)
}

fn with_remark(mut link: String, query: String, remark: &str) -> String {
    if !query.is_empty() {
        link.push('?');
        link.push_str(&query);
    }
    link.push('#');
    link.push_str(&url_encode(remark));
    link
}

fn insecure(node: &Proxy, ext: &ExtraSettings) -> String {
    match ExtraSettings::resolve(node.skip_cert_verify, ext.skip_cert_verify) {
        Some(true) => "1".to_string(),
        _ => String::new(),
    }
}

/// Query pairs describing a VLESS/Trojan transport
fn transport_query(transport: &TransportInfo) -> Vec<(&'static str, String)> {
    let network = transport.network_or_tcp();
    let mut pairs = vec![("type", network.to_string())];
    match network {
        "grpc" => pairs.push(("serviceName", transport.path.clone())),
        "quic" => {
            pairs.push(("quicSecurity", transport.host.clone()));
            pairs.push(("key", transport.path.clone()));
        }
        _ => {
            pairs.push(("host", transport.host.clone()));
            pairs.push(("path", transport.path.clone()));
        }
    }
    pairs.push(("headerType", transport.header_type.clone()));
    pairs
}

fn ssr_link(node: &Proxy, info: &ShadowsocksRInfo) -> String {
    let mut body = format!(
        "{}:{}:{}:{}:{}:{}",
        format_host(&node.hostname),
        node.port,
        info.protocol,
        info.method,
        info.obfs,
        url_safe_base64_encode(&info.password)
    );
    let params: Vec<String> = [
        ("obfsparam", &info.obfs_param),
        ("protoparam", &info.protocol_param),
        ("remarks", &node.remark),
        ("group", &node.group),
    ]
    .iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{}={}", k, url_safe_base64_encode(v)))
    .collect();
    body.push_str("/?");
    body.push_str(&params.join("&"));
    format!("ssr://{}", url_safe_base64_encode(&body))
}

/// Renders one proxy as its share-link.
///
/// The result decodes back to the same type, server, port and
/// protocol-defining fields.
pub fn proxy_to_link(node: &Proxy, ext: &ExtraSettings) -> Result<String, RenderError> {
    let link = match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            let userinfo = url_safe_base64_encode(&format!("{}:{}", info.method, info.password));
            let plugin = if info.plugin.is_empty() {
                String::new()
            } else if info.plugin_opts.is_empty() {
                info.plugin.clone()
            } else {
                format!("{};{}", info.plugin, plugin_opts_to_string(&info.plugin_opts))
            };
            let mut link = format!("ss://{}@{}", userinfo, address(node));
            if !plugin.is_empty() {
                link.push('/');
            }
            with_remark(link, build_query([("plugin", plugin)]), &node.remark)
        }
        ProxyKind::ShadowsocksR(info) => ssr_link(node, info),
        ProxyKind::VMess(info) => {
            let transport = &info.transport;
            let value = json!({
                "v": "2",
                "ps": node.remark,
                "add": node.hostname,
                "port": node.port.to_string(),
                "id": info.uuid,
                "aid": info.alter_id.to_string(),
                "scy": info.cipher,
                "net": transport.network_or_tcp(),
                "type": if transport.header_type.is_empty() { "none" } else { transport.header_type.as_str() },
                "host": transport.host,
                "path": transport.path,
                "tls": if info.tls { "tls" } else { "" },
                "sni": info.sni,
            });
            format!("vmess://{}", base64_encode(&value.to_string()))
        }
        ProxyKind::Vless(info) => {
            let security = match (&info.reality, info.tls) {
                (Some(_), _) => "reality",
                (None, true) => "tls",
                (None, false) => "none",
            };
            let mut pairs = vec![
                ("encryption", "none".to_string()),
                ("security", security.to_string()),
                ("flow", info.flow.clone()),
                ("sni", info.sni.clone()),
                ("fp", info.fingerprint.clone()),
            ];
            if let Some(reality) = &info.reality {
                pairs.push(("pbk", reality.public_key.clone()));
                pairs.push(("sid", reality.short_id.clone()));
            }
            pairs.extend(transport_query(&info.transport));
            pairs.push(("allowInsecure", insecure(node, ext)));
            let link = format!("vless://{}@{}", url_encode(&info.uuid), address(node));
            with_remark(link, build_query(pairs), &node.remark)
        }
        ProxyKind::Trojan(info) => {
            let mut pairs = vec![("sni", info.sni.clone())];
            if !info.transport.network.is_empty() && info.transport.network != "tcp" {
                pairs.extend(transport_query(&info.transport));
            }
            pairs.push(("allowInsecure", insecure(node, ext)));
            let link = format!("trojan://{}@{}", url_encode(&info.password), address(node));
            with_remark(link, build_query(pairs), &node.remark)
        }
        ProxyKind::Hysteria(info) => {
            let alpn = info.alpn.join(",");
            let mut pairs: Vec<(&str, String)>;
            let link = if node.proxy_type == ProxyType::Hysteria2 {
                pairs = vec![
                    ("obfs", info.obfs.clone()),
                    ("obfs-password", info.obfs_password.clone()),
                    ("sni", info.sni.clone()),
                    ("alpn", alpn),
                    ("up", info.up.clone()),
                    ("down", info.down.clone()),
                ];
                let auth = if info.password.is_empty() {
                    String::new()
                } else {
                    format!("{}@", url_encode(&info.password))
                };
                format!("hysteria2://{}{}", auth, address(node))
            } else {
                pairs = vec![
                    ("auth", info.password.clone()),
                    ("obfs", info.obfs.clone()),
                    ("obfsParam", info.obfs_password.clone()),
                    ("peer", info.sni.clone()),
                    ("alpn", alpn),
                    ("upmbps", info.up.clone()),
                    ("downmbps", info.down.clone()),
                ];
                format!("hysteria://{}", address(node))
            };
            pairs.push(("insecure", insecure(node, ext)));
            pairs.extend(info.params.iter().map(|(k, v)| (k.as_str(), v.clone())));
            with_remark(link, build_query(pairs), &node.remark)
        }
        ProxyKind::Tuic(info) => {
            let mut pairs = vec![
                ("sni", info.sni.clone()),
                ("alpn", info.alpn.join(",")),
                ("congestion_control", info.congestion_control.clone()),
                ("udp_relay_mode", info.udp_relay_mode.clone()),
                ("allow_insecure", insecure(node, ext)),
            ];
            pairs.extend(info.params.iter().map(|(k, v)| (k.as_str(), v.clone())));
            let auth = if info.password.is_empty() {
                url_encode(&info.uuid)
            } else {
                format!("{}:{}", url_encode(&info.uuid), url_encode(&info.password))
            };
            let link = format!("tuic://{}@{}", auth, address(node));
            with_remark(link, build_query(pairs), &node.remark)
        }
        ProxyKind::AnyTls(info) => {
            let number = |n: u32| if n == 0 { String::new() } else { n.to_string() };
            let pairs = vec![
                ("sni", info.sni.clone()),
                ("alpn", info.alpn.join(",")),
                ("hpkp", info.fingerprint.clone()),
                ("insecure", insecure(node, ext)),
                ("idle_session_check_interval", number(info.idle_session_check_interval)),
                ("idle_session_timeout", number(info.idle_session_timeout)),
                ("min_idle_session", number(info.min_idle_session)),
            ];
            let link = format!("anytls://{}@{}", url_encode(&info.password), address(node));
            with_remark(link, build_query(pairs), &node.remark)
        }
        ProxyKind::Http(info) => {
            let scheme = if info.tls { "https" } else { "http" };
            userinfo_link(scheme, &info.username, &info.password, node)
        }
        ProxyKind::Socks5(info) => userinfo_link("socks5", &info.username, &info.password, node),
        ProxyKind::Snell(info) => {
            let version = if info.version == 0 {
                String::new()
            } else {
                info.version.to_string()
            };
            let pairs = vec![
                ("psk", info.psk.clone()),
                ("obfs", info.obfs.clone()),
                ("obfs-host", info.obfs_host.clone()),
                ("version", version),
            ];
            with_remark(format!("snell://{}", address(node)), build_query(pairs), &node.remark)
        }
        ProxyKind::WireGuard(_) | ProxyKind::Opaque { .. } => {
            return Err(RenderError::unsupported(Target::Single(SingleKind::Mixed), node))
        }
    };
    Ok(link)
}

fn userinfo_link(scheme: &str, username: &str, password: &str, node: &Proxy) -> String {
    let auth = match (username.is_empty(), password.is_empty()) {
        (true, true) => String::new(),
        (false, true) => format!("{}@", url_encode(username)),
        _ => format!("{}:{}@", url_encode(username), url_encode(password)),
    };
    let mut link = format!("{}://{}{}", scheme, auth, address(node));
    link.push('#');
    link.push_str(&url_encode(&node.remark));
    link
}

/// Whether a proxy belongs to the bundle, and how to encode it there
fn link_for_kind(node: &Proxy, kind: SingleKind, ext: &ExtraSettings) -> Result<String, RenderError> {
    let target = Target::Single(kind);
    match (kind, &node.kind) {
        (SingleKind::Mixed, _) => proxy_to_link(node, ext),
        (SingleKind::Ss, ProxyKind::Shadowsocks(_)) => proxy_to_link(node, ext),
        (SingleKind::Ssr, ProxyKind::ShadowsocksR(_)) => proxy_to_link(node, ext),
        (SingleKind::Ssr, ProxyKind::Shadowsocks(info))
            if info.plugin.is_empty() && SSR_CIPHERS.contains(&info.method.as_str()) =>
        {
            let ssr = ShadowsocksRInfo {
                method: info.method.clone(),
                password: info.password.clone(),
                protocol: "origin".to_string(),
                obfs: "plain".to_string(),
                ..Default::default()
            };
            Ok(ssr_link(node, &ssr))
        }
        (SingleKind::V2Ray, ProxyKind::VMess(_) | ProxyKind::Vless(_)) => proxy_to_link(node, ext),
        (SingleKind::Trojan, ProxyKind::Trojan(_)) => proxy_to_link(node, ext),
        _ => Err(RenderError::unsupported(target, node)),
    }
}

/// Renders the proxies as newline-separated share-links wrapped in base64
pub fn proxy_to_single(proxies: &[Proxy], kind: SingleKind, ext: &ExtraSettings) -> RenderOutput {
    let rendered = render_each(proxies, Target::Single(kind), |node| link_for_kind(node, kind, ext));
    RenderOutput {
        text: base64_encode(&rendered.items.join("\n")),
        skipped: rendered.skipped,
    }
}
