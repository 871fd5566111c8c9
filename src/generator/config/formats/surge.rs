//! Surge profile encoder

use std::net::ToSocketAddrs;

use log::{debug, warn};

use crate::generator::config::group::group_members;
use crate::generator::config::ruleconvert::{ruleset_to_rules, RuleFlavor};
use crate::generator::config::subexport::{
    flag_pair, render_each, strip_sections, write_section, RenderError, RenderInput, RenderOutput, Target,
};
use crate::models::{ExtraSettings, Proxy, ProxyGroupConfig, ProxyGroupType, ProxyKind, ProxyType, ShadowsocksRInfo};

/// Sections this encoder owns in the output
const SECTIONS: [&str; 3] = ["Proxy", "Proxy Group", "Rule"];

/// Address the external process traffic is exempted for
fn external_address(node: &Proxy, ext: &ExtraSettings) -> String {
    if !ext.surge_resolve_hostname || node.hostname.parse::<std::net::IpAddr>().is_ok() {
        return node.hostname.clone();
    }
    match (node.hostname.as_str(), node.port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(addr) => addr.ip().to_string(),
            None => node.hostname.clone(),
        },
        Err(err) => {
            warn!("Cannot resolve '{}' for Surge external proxy: {}", node.hostname, err);
            node.hostname.clone()
        }
    }
}

fn ssr_external(node: &Proxy, info: &ShadowsocksRInfo, ext: &ExtraSettings) -> Result<Vec<String>, RenderError> {
    if ext.surge_ssr_path.is_empty() {
        return Err(RenderError::Invalid(
            "ShadowsocksR needs an external binary path for Surge".to_string(),
        ));
    }
    let local_port = ext.surge_ssr_local_port.to_string();
    let port = node.port.to_string();
    let mut args: Vec<(&str, &str)> = vec![
        ("-l", &local_port),
        ("-s", &node.hostname),
        ("-p", &port),
        ("-m", &info.method),
        ("-k", &info.password),
        ("-o", &info.obfs),
        ("-O", &info.protocol),
    ];
    if !info.obfs_param.is_empty() {
        args.push(("-g", &info.obfs_param));
    }
    if !info.protocol_param.is_empty() {
        args.push(("-G", &info.protocol_param));
    }

    let mut parts = vec!["external".to_string(), format!("exec=\"{}\"", ext.surge_ssr_path)];
    for (flag, value) in args {
        parts.push(format!("args=\"{}\"", flag));
        parts.push(format!("args=\"{}\"", value));
    }
    parts.push(format!("local-port={}", local_port));
    parts.push(format!("addresses={}", external_address(node, ext)));
    Ok(parts)
}

fn tls_flags(parts: &mut Vec<String>, node: &Proxy, ext: &ExtraSettings) {
    parts.extend(flag_pair("skip-cert-verify", node.skip_cert_verify, ext.skip_cert_verify));
    parts.extend(flag_pair("tls13", node.tls13, ext.tls13));
}

/// Renders one proxy as a Surge `[Proxy]` line
pub fn proxy_to_surge_line(node: &Proxy, ext: &ExtraSettings) -> Result<String, RenderError> {
    let endpoint = |kind: &str| vec![kind.to_string(), node.hostname.clone(), node.port.to_string()];
    let mut parts = match &node.kind {
        ProxyKind::Shadowsocks(info) => {
            let mut parts = endpoint("ss");
            parts.push(format!("encrypt-method={}", info.method));
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
                other => return Err(RenderError::Invalid(format!("plugin {} is not supported by Surge", other))),
            }
            parts
        }
        ProxyKind::ShadowsocksR(info) => ssr_external(node, info, ext)?,
        ProxyKind::VMess(info) => {
            if ext.surge_ver < 4 {
                return Err(RenderError::Invalid(format!(
                    "vmess needs Surge 4 or later, target is Surge {}",
                    ext.surge_ver
                )));
            }
            let mut parts = endpoint("vmess");
            parts.push(format!("username={}", info.uuid));
            match info.transport.network_or_tcp() {
                "tcp" => {}
                "ws" => {
                    parts.push("ws=true".to_string());
                    if !info.transport.path.is_empty() {
                        parts.push(format!("ws-path={}", info.transport.path));
                    }
                    if !info.transport.host.is_empty() {
                        parts.push(format!("ws-headers=Host:{}", info.transport.host));
                    }
                }
                other => return Err(RenderError::Invalid(format!("network {} is not supported by Surge", other))),
            }
            if info.alter_id == 0 {
                parts.push("vmess-aead=true".to_string());
            }
            if info.tls {
                parts.push("tls=true".to_string());
                if !info.sni.is_empty() {
                    parts.push(format!("sni={}", info.sni));
                }
                tls_flags(&mut parts, node, ext);
            }
            parts
        }
        ProxyKind::Trojan(info) => {
            let mut parts = endpoint("trojan");
            parts.push(format!("password={}", info.password));
            match info.transport.network_or_tcp() {
                "tcp" => {}
                "ws" => {
                    parts.push("ws=true".to_string());
                    if !info.transport.path.is_empty() {
                        parts.push(format!("ws-path={}", info.transport.path));
                    }
                    if !info.transport.host.is_empty() {
                        parts.push(format!("ws-headers=Host:{}", info.transport.host));
                    }
                }
                other => return Err(RenderError::Invalid(format!("network {} is not supported by Surge", other))),
            }
            if !info.sni.is_empty() {
                parts.push(format!("sni={}", info.sni));
            }
            tls_flags(&mut parts, node, ext);
            parts
        }
        ProxyKind::Hysteria(info) => {
            if node.proxy_type != ProxyType::Hysteria2 {
                return Err(RenderError::Invalid("hysteria v1 is not supported by Surge".to_string()));
            }
            let mut parts = endpoint("hysteria2");
            parts.push(format!("password={}", info.password));
            if !info.sni.is_empty() {
                parts.push(format!("sni={}", info.sni));
            }
            if !info.down.is_empty() {
                parts.push(format!("download-bandwidth={}", info.down.trim_end_matches(" Mbps")));
            }
            tls_flags(&mut parts, node, ext);
            parts
        }
        ProxyKind::Http(info) => {
            let mut parts = endpoint(if info.tls { "https" } else { "http" });
            if !info.username.is_empty() {
                parts.push(format!("username={}", info.username));
            }
            if !info.password.is_empty() {
                parts.push(format!("password={}", info.password));
            }
            if info.tls {
                tls_flags(&mut parts, node, ext);
            }
            parts
        }
        ProxyKind::Socks5(info) => {
            let mut parts = endpoint(if info.tls { "socks5-tls" } else { "socks5" });
            if !info.username.is_empty() {
                parts.push(format!("username={}", info.username));
            }
            if !info.password.is_empty() {
                parts.push(format!("password={}", info.password));
            }
            if info.tls {
                tls_flags(&mut parts, node, ext);
            }
            parts
        }
        ProxyKind::Snell(info) => {
            let mut parts = endpoint("snell");
            parts.push(format!("psk={}", info.psk));
            if !info.obfs.is_empty() {
                parts.push(format!("obfs={}", info.obfs));
                if !info.obfs_host.is_empty() {
                    parts.push(format!("obfs-host={}", info.obfs_host));
                }
            }
            if info.version > 0 {
                parts.push(format!("version={}", info.version));
            }
            parts
        }
        _ => return Err(RenderError::unsupported(Target::Surge, node)),
    };

    if node.proxy_type != ProxyType::ShadowsocksR {
        parts.extend(flag_pair("udp-relay", node.udp, ext.udp));
        parts.extend(flag_pair("tfo", node.tfo, ext.tfo));
    }
    Ok(format!("{} = {}", node.remark, parts.join(", ")))
}

/// Renders a `[Proxy Group]` line; shared with Loon, whose grammar matches
pub(crate) fn group_line(group: &ProxyGroupConfig, nodes: &[Proxy], target: Target) -> String {
    let members = group_members(group, nodes);
    let mut parts: Vec<String> = Vec::new();
    match group.group_type {
        ProxyGroupType::SSID => {
            parts.push("ssid".to_string());
            parts.push(format!("default={}", members[0]));
            if let Some(cellular) = members.get(1) {
                parts.push(format!("cellular={}", cellular));
            }
        }
        ProxyGroupType::Relay => {
            debug!("Group '{}': relay has no {} equivalent, using select", group.name, target);
            parts.push("select".to_string());
            parts.extend(members);
        }
        group_type => {
            parts.push(group_type.as_str().to_string());
            parts.extend(members);
            if group_type.is_probing() {
                if !group.url.is_empty() {
                    parts.push(format!("url={}", group.url));
                }
                if group.interval > 0 {
                    parts.push(format!("interval={}", group.interval));
                }
                if group.tolerance > 0 {
                    parts.push(format!("tolerance={}", group.tolerance));
                }
                if group.timeout > 0 {
                    parts.push(format!("timeout={}", group.timeout));
                }
            }
        }
    }
    format!("{} = {}", group.name, parts.join(", "))
}

/// Renders a Surge profile: the base's own sections, then `[Proxy]`,
/// `[Proxy Group]` and `[Rule]`
pub fn proxy_to_surge(input: &RenderInput, ext: &ExtraSettings) -> RenderOutput {
    let rendered = render_each(input.proxies, Target::Surge, |node| proxy_to_surge_line(node, ext));

    let mut text = strip_sections(input.base, &SECTIONS);
    let mut proxies = vec!["DIRECT = direct".to_string()];
    proxies.extend(rendered.items);
    write_section(&mut text, "Proxy", &proxies);

    if !input.groups.is_empty() {
        let groups: Vec<String> = input
            .groups
            .iter()
            .map(|g| group_line(g, &rendered.nodes, Target::Surge))
            .collect();
        write_section(&mut text, "Proxy Group", &groups);
    }

    if ext.enable_rule_generator {
        let rules = ruleset_to_rules(input.raw_rules, input.rulesets, RuleFlavor::Surge);
        write_section(&mut text, "Rule", &rules.rules);
    }

    RenderOutput {
        text,
        skipped: rendered.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RulesetBody, RulesetContent, VMessInfo};
    use crate::parser::registry::default_registry;
    use crate::parser::subs::explode_conf_content;

    fn ssr() -> Proxy {
        Proxy::new(
            ProxyKind::ShadowsocksR(ShadowsocksRInfo {
                method: "aes-256-cfb".to_string(),
                password: "pw".to_string(),
                protocol: "auth_aes128_md5".to_string(),
                obfs: "http_simple".to_string(),
                ..Default::default()
            }),
            "SSR",
            "r.example.com",
            443,
        )
    }

    fn vmess() -> Proxy {
        Proxy::new(
            ProxyKind::VMess(VMessInfo {
                uuid: "uuid-1".to_string(),
                ..Default::default()
            }),
            "V",
            "v.example.com",
            443,
        )
    }

    #[test]
    fn test_ssr_needs_external_path() {
        let ext = ExtraSettings::default();
        assert!(proxy_to_surge_line(&ssr(), &ext).is_err());

        let ext = ExtraSettings {
            surge_ssr_path: "/usr/local/bin/ssr-local".to_string(),
            surge_ssr_local_port: 1099,
            ..Default::default()
        };
        let line = proxy_to_surge_line(&ssr(), &ext).unwrap();
        assert!(line.starts_with("SSR = external, exec=\"/usr/local/bin/ssr-local\", args=\"-l\", args=\"1099\""));
        assert!(line.ends_with("local-port=1099, addresses=r.example.com"));
    }

    #[test]
    fn test_vmess_needs_surge_4() {
        let ext = ExtraSettings {
            surge_ver: 3,
            ..Default::default()
        };
        let output = proxy_to_surge(
            &RenderInput {
                proxies: &[vmess()],
                groups: &[],
                raw_rules: &[],
                rulesets: &[],
                base: "",
            },
            &ext,
        );
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(
            proxy_to_surge_line(&vmess(), &ExtraSettings::default()).unwrap(),
            "V = vmess, v.example.com, 443, username=uuid-1, vmess-aead=true"
        );
    }

    #[test]
    fn test_profile_decodes_back() {
        let mut trojan = default_registry()
            .decode_link("trojan://secret@t.example.com:443?sni=t.example.com#HK, 01")
            .unwrap()
            .proxy;
        trojan.udp = Some(true);
        let groups = vec![ProxyGroupConfig {
            proxies: vec!["HK".to_string()],
            ..ProxyGroupConfig::new("Proxy", ProxyGroupType::Select)
        }];
        let rulesets = vec![RulesetContent {
            group: "Proxy".to_string(),
            body: RulesetBody::Inline("FINAL".to_string()),
        }];
        let output = proxy_to_surge(
            &RenderInput {
                proxies: &[trojan],
                groups: &groups,
                raw_rules: &[],
                rulesets: &rulesets,
                base: "[General]\nloglevel = notify\n[Proxy]\nstale = direct\n",
            },
            &ExtraSettings::default(),
        );
        assert!(output.text.starts_with("[General]\nloglevel = notify\n\n[Proxy]\nDIRECT = direct\n"));
        assert!(output.text.contains("HK  01 = trojan, t.example.com, 443, password=secret, sni=t.example.com, udp-relay=true"));
        assert!(output.text.contains("[Proxy Group]\nProxy = select, HK  01\n"));
        assert!(output.text.ends_with("[Rule]\nFINAL,Proxy\n"));
        assert!(!output.text.contains("stale"));

        let decoded = explode_conf_content(&output.text, default_registry()).unwrap();
        assert_eq!(decoded.proxies.len(), 1);
        assert_eq!(decoded.proxies[0].hostname, "t.example.com");
    }
}
