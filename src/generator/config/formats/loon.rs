//! Loon profile encoder
//!
//! The profile layout and group grammar follow Surge; proxy lines use
//! Loon's positional form with quoted secrets.

use crate::generator::config::ruleconvert::{ruleset_to_rules, RuleFlavor};
use crate::generator::config::subexport::{
    flag_pair, render_each, strip_sections, write_section, RenderError, RenderInput, RenderOutput, Target,
};
use crate::generator::config::formats::surge::group_line;
use crate::models::{ExtraSettings, Proxy, ProxyKind, ProxyType, TransportInfo};

const SECTIONS: [&str; 3] = ["Proxy", "Proxy Group", "Rule"];

/// Icon attached to every generated group
pub const GROUP_ICON: &str = "https://raw.githubusercontent.com/Koolson/Qure/master/IconSet/Proxy.png";

fn quoted(value: &str) -> String {
    format!("\"{}\"", value)
}

fn transport(parts: &mut Vec<String>, transport: &TransportInfo) -> Result<(), RenderError> {
    match transport.network_or_tcp() {
        "tcp" => parts.push("transport=tcp".to_string()),
        network @ ("ws" | "http") => {
            parts.push(format!("transport={}", network));
            if !transport.path.is_empty() {
                parts.push(format!("path={}", transport.path));
            }
            if !transport.host.is_empty() {
                parts.push(format!("host={}", transport.host));
            }
        }
        other => return Err(RenderError::Invalid(format!("network {} is not supported by Loon", other))),
    }
    Ok(())
}

fn tls(parts: &mut Vec<String>, sni: &str, node: &Proxy, ext: &ExtraSettings) {
    parts.push("over-tls=true".to_string());
    if !sni.is_empty() {
        parts.push(format!("tls-name={}", sni));
    }
    parts.extend(flag_pair("skip-cert-verify", node.skip_cert_verify, ext.skip_cert_verify));
}

/// Renders one proxy as a Loon `[Proxy]` line
pub fn proxy_to_loon_line(node: &Proxy, ext: &ExtraSettings) -> Result<String, RenderError> {
    let endpoint = |kind: &str| vec![kind.to_string(), node.hostname.clone(), node.port.to_string()];
    let mut parts = match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            let mut parts = endpoint("Shadowsocks");
            parts.push(info.method.clone());
            parts.push(quoted(&info.password));
            match info.plugin.as_str() {
                "" => {}
                "obfs-local" | "simple-obfs" => {
                    if let Some(mode) = info.plugin_opts.get("obfs") {
                        parts.push(format!("obfs-name={}", mode));
                    }
                    if let Some(host) = info.plugin_opts.get("obfs-host") {
                        parts.push(format!("obfs-host={}", host));
                    }
                }
                other => return Err(RenderError::Invalid(format!("plugin {} is not supported by Loon", other))),
            }
            parts
        }
        ProxyKind::ShadowsocksR(info) => {
            let mut parts = endpoint("ShadowsocksR");
            parts.push(info.method.clone());
            parts.push(quoted(&info.password));
            parts.push(format!("protocol={}", info.protocol));
            parts.push(format!("protocol-param={}", info.protocol_param));
            parts.push(format!("obfs={}", info.obfs));
            parts.push(format!("obfs-param={}", info.obfs_param));
            parts
        }
        ProxyKind::VMess(info) => {
            let mut parts = endpoint("vmess");
            parts.push(if info.cipher.is_empty() { "auto".to_string() } else { info.cipher.clone() });
            parts.push(quoted(&info.uuid));
            transport(&mut parts, &info.transport)?;
            if info.tls {
                tls(&mut parts, &info.sni, node, ext);
            }
            parts.push(format!("alterId={}", info.alter_id));
            parts
        }
        ProxyKind::Vless(info) => {
            let mut parts = endpoint("VLESS");
            parts.push(quoted(&info.uuid));
            transport(&mut parts, &info.transport)?;
            if !info.flow.is_empty() {
                parts.push(format!("flow={}", info.flow));
            }
            if info.tls {
                tls(&mut parts, &info.sni, node, ext);
            }
            if let Some(reality) = &info.reality {
                parts.push(format!("public-key={}", reality.public_key));
                if !reality.short_id.is_empty() {
                    parts.push(format!("short-id={}", reality.short_id));
                }
            }
            parts
        }
        ProxyKind::Trojan(info) => {
            let mut parts = endpoint("trojan");
            parts.push(quoted(&info.password));
            if info.transport.network_or_tcp() != "tcp" {
                transport(&mut parts, &info.transport)?;
            }
            tls(&mut parts, &info.sni, node, ext);
            parts
        }
        ProxyKind::Hysteria(info) => {
            if node.proxy_type != ProxyType::Hysteria2 {
                return Err(RenderError::Invalid("hysteria v1 is not supported by Loon".to_string()));
            }
            let mut parts = endpoint("Hysteria2");
            parts.push(quoted(&info.password));
            if !info.sni.is_empty() {
                parts.push(format!("sni={}", info.sni));
            }
            if !info.down.is_empty() {
                parts.push(format!("download-bandwidth={}", info.down.trim_end_matches(" Mbps")));
            }
            parts.extend(flag_pair("skip-cert-verify", node.skip_cert_verify, ext.skip_cert_verify));
            parts
        }
        ProxyKind::Http(info) => {
            let mut parts = endpoint(if info.tls { "https" } else { "http" });
            if !info.username.is_empty() {
                parts.push(info.username.clone());
                parts.push(quoted(&info.password));
            }
            parts
        }
        ProxyKind::Socks5(info) => {
            let mut parts = endpoint("socks5");
            if !info.username.is_empty() {
                parts.push(info.username.clone());
                parts.push(quoted(&info.password));
            }
            if info.tls {
                tls(&mut parts, "", node, ext);
            }
            parts
        }
        ProxyKind::WireGuard(info) => {
            let mut parts = vec!["WireGuard".to_string()];
            if !info.self_ip.is_empty() {
                parts.push(format!("interface-ip={}", info.self_ip.split('/').next().unwrap_or_default()));
            }
            if !info.self_ipv6.is_empty() {
                parts.push(format!("interface-ipv6={}", info.self_ipv6.split('/').next().unwrap_or_default()));
            }
            parts.push(format!("private-key={}", info.private_key));
            if info.mtu > 0 {
                parts.push(format!("mtu={}", info.mtu));
            }
            if let Some(dns) = info.dns.first() {
                parts.push(format!("dns={}", dns));
            }
            if info.keepalive > 0 {
                parts.push(format!("keepalive={}", info.keepalive));
            }
            let allowed = if info.allowed_ips.is_empty() {
                "0.0.0.0/0,::/0".to_string()
            } else {
                info.allowed_ips.join(",")
            };
            let mut peer = format!(
                "public-key={},allowed-ips=\"{}\",endpoint={}:{}",
                info.public_key, allowed, node.hostname, node.port
            );
            if !info.preshared_key.is_empty() {
                peer.push_str(&format!(",preshared-key={}", info.preshared_key));
            }
            parts.push(format!("peers=[{{{}}}]", peer));
            parts
        }
        _ => return Err(RenderError::unsupported(Target::Loon, node)),
    };

    parts.extend(flag_pair("fast-open", node.tfo, ext.tfo));
    parts.extend(flag_pair("udp", node.udp, ext.udp));
    Ok(format!("{} = {}", node.remark, parts.join(",")))
}

/// Renders a Loon profile
pub fn proxy_to_loon(input: &RenderInput, ext: &ExtraSettings) -> RenderOutput {
    let rendered = render_each(input.proxies, Target::Loon, |node| proxy_to_loon_line(node, ext));

    let mut text = strip_sections(input.base, &SECTIONS);
    write_section(&mut text, "Proxy", &rendered.items);

    if !input.groups.is_empty() {
        let groups: Vec<String> = input
            .groups
            .iter()
            .map(|g| format!("{}, img-url={}", group_line(g, &rendered.nodes, Target::Loon), GROUP_ICON))
            .collect();
        write_section(&mut text, "Proxy Group", &groups);
    }

    if ext.enable_rule_generator {
        let rules = ruleset_to_rules(input.raw_rules, input.rulesets, RuleFlavor::Loon);
        write_section(&mut text, "Rule", &rules.rules);
    }

    RenderOutput {
        text,
        skipped: rendered.skipped,
    }
}
