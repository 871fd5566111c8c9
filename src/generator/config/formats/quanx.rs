//! Quantumult X profile encoder
//!
//! Servers go to `[server_local]`, groups to `[policy]`, rules to
//! `[filter_local]`, and rulesets that could not be fetched to
//! `[filter_remote]`.

use log::debug;

use crate::generator::config::formats::loon::GROUP_ICON;
use crate::generator::config::group::group_members;
use crate::generator::config::ruleconvert::{ruleset_to_rules, RemoteRuleset, RuleFlavor};
use crate::generator::config::subexport::{
    render_each, strip_sections, write_section, RenderError, RenderInput, RenderOutput, Target,
};
use crate::models::{ExtraSettings, Proxy, ProxyGroupConfig, ProxyGroupType, ProxyKind, TransportInfo};

const SECTIONS: [&str; 4] = ["server_local", "policy", "filter_local", "filter_remote"];

fn vmess_method(cipher: &str) -> &str {
    match cipher {
        "none" | "aes-128-gcm" | "chacha20-ietf-poly1305" => cipher,
        "chacha20-poly1305" => "chacha20-ietf-poly1305",
        _ => "aes-128-gcm",
    }
}

/// Pushes `key=value` for a tri-state flag resolved against the global default
fn push_flag(parts: &mut Vec<String>, key: &str, node_flag: Option<bool>, global: Option<bool>) {
    if let Some(value) = ExtraSettings::resolve(node_flag, global) {
        parts.push(format!("{}={}", key, value));
    }
}

fn tls_options(parts: &mut Vec<String>, sni: &str, node: &Proxy, ext: &ExtraSettings) {
    if !sni.is_empty() {
        parts.push(format!("tls-host={}", sni));
    }
    if let Some(skip) = ExtraSettings::resolve(node.skip_cert_verify, ext.skip_cert_verify) {
        parts.push(format!("tls-verification={}", !skip));
    }
    push_flag(parts, "tls13", node.tls13, ext.tls13);
}

/// `obfs=ws|wss|over-tls` plus the websocket host and uri
fn obfs(parts: &mut Vec<String>, transport: &TransportInfo, tls: bool) -> Result<(), RenderError> {
    match transport.network_or_tcp() {
        "tcp" => {
            if tls {
                parts.push("obfs=over-tls".to_string());
            }
        }
        "ws" => {
            parts.push(format!("obfs={}", if tls { "wss" } else { "ws" }));
            if !transport.host.is_empty() {
                parts.push(format!("obfs-host={}", transport.host));
            }
            if !transport.path.is_empty() {
                parts.push(format!("obfs-uri={}", transport.path));
            }
        }
        other => return Err(RenderError::Invalid(format!("network {} is not supported by Quantumult X", other))),
    }
    Ok(())
}

fn credentials(parts: &mut Vec<String>, username: &str, password: &str) {
    let or_none = |v: &str| if v.is_empty() { "none".to_string() } else { v.to_string() };
    parts.push(format!("username={}", or_none(username)));
    parts.push(format!("password={}", or_none(password)));
}

/// Renders one proxy as a `[server_local]` line
pub fn proxy_to_quanx_line(node: &Proxy, ext: &ExtraSettings) -> Result<String, RenderError> {
    let endpoint = |scheme: &str| format!("{}={}:{}", scheme, node.hostname, node.port);
    let mut parts: Vec<String> = Vec::new();
    match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            parts.push(endpoint("shadowsocks"));
            parts.push(format!("method={}", info.method));
            parts.push(format!("password={}", info.password));
            match info.plugin.as_str() {
                "" => {}
                "obfs-local" | "simple-obfs" => {
                    if let Some(mode) = info.plugin_opts.get("obfs") {
                        parts.push(format!("obfs={}", mode));
                    }
                    if let Some(host) = info.plugin_opts.get("obfs-host") {
                        parts.push(format!("obfs-host={}", host));
                    }
                }
                "v2ray-plugin" => {
                    let tls = info.plugin_opts.contains_key("tls");
                    parts.push(format!("obfs={}", if tls { "wss" } else { "ws" }));
                    if let Some(host) = info.plugin_opts.get("host") {
                        parts.push(format!("obfs-host={}", host));
                    }
                    if let Some(path) = info.plugin_opts.get("path") {
                        parts.push(format!("obfs-uri={}", path));
                    }
                }
                other => {
                    return Err(RenderError::Invalid(format!(
                        "plugin {} is not supported by Quantumult X",
                        other
                    )))
                }
            }
        }
        ProxyKind::ShadowsocksR(info) => {
            parts.push(endpoint("shadowsocks"));
            parts.push(format!("method={}", info.method));
            parts.push(format!("password={}", info.password));
            parts.push(format!("ssr-protocol={}", info.protocol));
            if !info.protocol_param.is_empty() {
                parts.push(format!("ssr-protocol-param={}", info.protocol_param));
            }
            parts.push(format!("obfs={}", info.obfs));
            if !info.obfs_param.is_empty() {
                parts.push(format!("obfs-host={}", info.obfs_param));
            }
        }
        ProxyKind::VMess(info) => {
            parts.push(endpoint("vmess"));
            parts.push(format!("method={}", vmess_method(&info.cipher)));
            parts.push(format!("password={}", info.uuid));
            obfs(&mut parts, &info.transport, info.tls)?;
            if info.tls {
                tls_options(&mut parts, &info.sni, node, ext);
            }
            if info.alter_id > 0 {
                parts.push("aead=false".to_string());
            }
        }
        ProxyKind::Trojan(info) => {
            parts.push(endpoint("trojan"));
            parts.push(format!("password={}", info.password));
            if info.transport.network_or_tcp() == "tcp" {
                parts.push("over-tls=true".to_string());
            } else {
                obfs(&mut parts, &info.transport, true)?;
            }
            tls_options(&mut parts, &info.sni, node, ext);
        }
        ProxyKind::Http(info) => {
            parts.push(endpoint("http"));
            credentials(&mut parts, &info.username, &info.password);
            if info.tls {
                parts.push("over-tls=true".to_string());
                tls_options(&mut parts, "", node, ext);
            }
        }
        ProxyKind::Socks5(info) => {
            parts.push(endpoint("socks5"));
            credentials(&mut parts, &info.username, &info.password);
            if info.tls {
                parts.push("over-tls=true".to_string());
                tls_options(&mut parts, "", node, ext);
            }
        }
        _ => return Err(RenderError::unsupported(Target::QuanX, node)),
    }

    push_flag(&mut parts, "fast-open", node.tfo, ext.tfo);
    push_flag(&mut parts, "udp-relay", node.udp, ext.udp);
    parts.push(format!("tag={}", node.remark));
    Ok(parts.join(", "))
}

/// Policy keywords are lowercase in Quantumult X
fn policy_name(name: &str) -> String {
    match name {
        "DIRECT" => "direct".to_string(),
        "REJECT" => "reject".to_string(),
        _ => name.to_string(),
    }
}

fn policy_line(group: &ProxyGroupConfig, nodes: &[Proxy]) -> String {
    let policy_type = match group.group_type {
        ProxyGroupType::Select => "static",
        ProxyGroupType::URLTest => "url-latency-benchmark",
        ProxyGroupType::Fallback => "available",
        ProxyGroupType::LoadBalance => "round-robin",
        other => {
            debug!("Group '{}': {} has no Quantumult X equivalent, using static", group.name, other.as_str());
            "static"
        }
    };
    let mut parts = vec![format!("{}={}", policy_type, group.name)];
    parts.extend(group_members(group, nodes).iter().map(|m| policy_name(m)));
    if group.group_type.is_probing() && !group.url.is_empty() {
        parts.push(format!("check-interval={}", group.interval));
        if group.tolerance > 0 {
            parts.push(format!("tolerance={}", group.tolerance));
        }
    }
    parts.push(format!("img-url={}", GROUP_ICON));
    parts.join(", ")
}

/// Lowercases the policy of a rendered rule
fn filter_line(rule: &str) -> String {
    match rule.rsplit_once(',') {
        Some((head, policy)) => format!("{},{}", head, policy_name(policy)),
        None => rule.to_string(),
    }
}

fn filter_remote_line(remote: &RemoteRuleset) -> String {
    let mut line = format!(
        "{}, tag={}, force-policy={}",
        remote.location,
        remote.name,
        policy_name(&remote.group)
    );
    if remote.interval > 0 {
        line.push_str(&format!(", update-interval={}", remote.interval));
    }
    line.push_str(", enabled=true");
    line
}

/// Renders a Quantumult X profile
pub fn proxy_to_quanx(input: &RenderInput, ext: &ExtraSettings) -> RenderOutput {
    let rendered = render_each(input.proxies, Target::QuanX, |node| proxy_to_quanx_line(node, ext));

    let mut text = strip_sections(input.base, &SECTIONS);
    write_section(&mut text, "server_local", &rendered.items);

    if !input.groups.is_empty() {
        let policies: Vec<String> = input.groups.iter().map(|g| policy_line(g, &rendered.nodes)).collect();
        write_section(&mut text, "policy", &policies);
    }

    if ext.enable_rule_generator {
        let rules = ruleset_to_rules(input.raw_rules, input.rulesets, RuleFlavor::QuanX);
        let filters: Vec<String> = rules.rules.iter().map(|r| filter_line(r)).collect();
        write_section(&mut text, "filter_local", &filters);
        if !rules.remote.is_empty() {
            let remotes: Vec<String> = rules.remote.iter().map(filter_remote_line).collect();
            write_section(&mut text, "filter_remote", &remotes);
        }
    }

    RenderOutput {
        text,
        skipped: rendered.skipped,
    }
}
