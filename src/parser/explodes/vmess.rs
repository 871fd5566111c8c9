use linked_hash_map::LinkedHashMap;

use super::common::{
    apply_clash_flags, apply_surge_flags, clash_endpoint, param, split_host_port, split_query,
    split_remark, strip_scheme,
};
use crate::models::{Proxy, ProxyKind, TransportInfo, VMessInfo};
use crate::parser::error::{require_server, ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::base64::try_base64_decode;

/// Parse a VMess link into a Proxy object
///
/// Handles the Base64 JSON form (v2rayN) and the `uuid@host:port?query`
/// form, either in plain text or itself Base64 encoded.
pub fn explode_vmess(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["vmess://"]).ok_or(ParseError::Malformed("vmess"))?;

    if content.contains('@') && !content.contains("://") {
        return explode_std_vmess(content);
    }

    let (payload, _) = split_remark(content);
    let decoded = try_base64_decode(payload).ok_or(ParseError::InvalidBase64)?;
    let decoded = decoded.trim();
    if decoded.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(decoded)?;
        let fields = FieldMap::from_value(&value).ok_or(ParseError::Malformed("vmess"))?;
        return from_v2rayn_json(&fields);
    }
    if decoded.contains('@') {
        return explode_std_vmess(decoded);
    }
    Err(ParseError::Malformed("vmess"))
}

/// `vmess1://uuid@host:port[/path]?network=&tls=#remark`
pub fn explode_vmess1(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["vmess1://"]).ok_or(ParseError::Malformed("vmess"))?;
    explode_std_vmess(content)
}

fn explode_std_vmess(content: &str) -> ParseResult<Proxy> {
    let (uuid, rest) = content.split_once('@').ok_or(ParseError::Malformed("vmess"))?;
    let (rest, mut remark) = split_remark(rest);
    let (address, params) = split_query(rest);

    // kitsunebi style links may carry the ws path after the port
    let search_from = address.find(']').unwrap_or(0);
    let (address, link_path) = match address[search_from..].find('/') {
        Some(idx) => address.split_at(search_from + idx),
        None => (address, ""),
    };
    let (server, port) = split_host_port(address)?;

    if remark.is_empty() {
        remark = param(&params, &["remark", "remarks"]);
    }
    let tls = matches!(param(&params, &["tls", "security"]).as_str(), "1" | "true" | "tls");
    let mut path = param(&params, &["path"]);
    if path.is_empty() && link_path.len() > 1 {
        path = link_path.to_string();
    }

    let info = VMessInfo {
        uuid: uuid.to_string(),
        alter_id: param(&params, &["aid", "alterId"]).parse().unwrap_or(0),
        cipher: param(&params, &["encryption", "cipher"]),
        transport: TransportInfo {
            network: or_tcp(param(&params, &["network", "type", "net"])),
            host: param(&params, &["host", "obfsParam"]),
            path,
            header_type: param(&params, &["headerType"]),
        },
        tls,
        sni: param(&params, &["sni", "peer"]),
    };
    Ok(Proxy::new(ProxyKind::VMess(info), &remark, &server, port))
}

/// Builds from the v2rayN JSON object.
///
/// Version 1 (or unversioned) objects pack `host;path` into `host`.
pub fn from_v2rayn_json(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("add"))?.to_string();
    let port = fields.port("port")?;
    let mut host = fields.str("host");
    let mut path = fields.str("path");

    if matches!(fields.str("v").as_str(), "" | "1") {
        if let Some((h, p)) = host.clone().split_once(';') {
            host = h.to_string();
            if path.is_empty() {
                path = p.to_string();
            }
        }
    }

    let info = VMessInfo {
        uuid: fields.str("id"),
        alter_id: fields.str("aid").parse().unwrap_or(0),
        cipher: fields.str("scy"),
        transport: TransportInfo {
            network: or_tcp(fields.str("net")),
            host,
            path,
            header_type: fields.str("type"),
        },
        tls: fields.str("tls") == "tls",
        sni: fields.str("sni"),
    };
    Ok(Proxy::new(ProxyKind::VMess(info), &fields.str("ps"), &server, port))
}

/// Reads the Clash transport options shared by vmess, vless and trojan
pub fn transport_from_clash(fields: &FieldMap) -> TransportInfo {
    let network = fields.str("network");
    let mut transport = TransportInfo {
        network: network.clone(),
        ..Default::default()
    };
    match network.as_str() {
        "ws" => {
            if let Some(opts) = fields.obj("ws-opts") {
                transport.path = opts.str("path");
                if let Some(headers) = opts.obj("headers") {
                    transport.host = headers.str("Host");
                }
            } else {
                transport.path = fields.str("ws-path");
                if let Some(headers) = fields.obj("ws-headers") {
                    transport.host = headers.str("Host");
                }
            }
        }
        "grpc" => {
            if let Some(opts) = fields.obj("grpc-opts") {
                transport.path = opts.str("grpc-service-name");
            }
        }
        "h2" => {
            if let Some(opts) = fields.obj("h2-opts") {
                transport.path = opts.str("path");
                transport.host = opts.list("host").into_iter().next().unwrap_or_default();
            }
        }
        "http" => {
            if let Some(opts) = fields.obj("http-opts") {
                transport.path = opts.list("path").into_iter().next().unwrap_or_default();
                if let Some(headers) = opts.obj("headers") {
                    transport.host = headers.list("Host").into_iter().next().unwrap_or_default();
                }
            }
            transport.header_type = "http".to_string();
        }
        _ => {}
    }
    transport
}

/// Builds from a Clash `type: vmess` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let info = VMessInfo {
        uuid: fields.str("uuid"),
        alter_id: fields.u32("alterId").min(u16::MAX as u32) as u16,
        cipher: fields.str("cipher"),
        transport: transport_from_clash(fields),
        tls: fields.bool("tls").unwrap_or(false),
        sni: fields.first(&["servername", "sni"]),
    };
    let mut proxy = Proxy::new(ProxyKind::VMess(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from a Surge `vmess` line
pub fn from_surge(remark: &str, line: &SurgeLine) -> ParseResult<Proxy> {
    let (server, port) = line.endpoint()?;
    let ws = line.flag("ws").unwrap_or(false);
    let ws_headers = parse_surge_headers(&line.arg("ws-headers"));
    let info = VMessInfo {
        uuid: line.arg("username"),
        alter_id: 0,
        cipher: "auto".to_string(),
        transport: TransportInfo {
            network: if ws { "ws".to_string() } else { "tcp".to_string() },
            host: ws_headers.get("host").cloned().unwrap_or_default(),
            path: line.arg("ws-path"),
            header_type: String::new(),
        },
        tls: line.flag("tls").unwrap_or(false),
        sni: line.arg("sni"),
    };
    let mut proxy = Proxy::new(ProxyKind::VMess(info), remark, &server, port);
    apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

/// Surge writes headers as `Host:a.com|User-Agent:x`; keys are lowercased
pub fn parse_surge_headers(value: &str) -> LinkedHashMap<String, String> {
    let mut out = LinkedHashMap::new();
    for pair in value.split('|') {
        if let Some((k, v)) = pair.split_once(':') {
            out.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
    }
    out
}

/// Builds from a Netch server entry of `Type` 3
pub fn from_netch(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("Hostname"))?.to_string();
    let port = fields.port("Port")?;
    let info = VMessInfo {
        uuid: fields.str("UserID"),
        alter_id: fields.str("AlterID").parse().unwrap_or(0),
        cipher: fields.str("EncryptMethod"),
        transport: TransportInfo {
            network: or_tcp(fields.str("TransferProtocol")),
            host: fields.str("Host"),
            path: fields.str("Path"),
            header_type: fields.str("FakeType"),
        },
        tls: fields.str("TLS") == "tls",
        sni: String::new(),
    };
    Ok(Proxy::new(ProxyKind::VMess(info), &fields.str("Remark"), &server, port))
}

fn or_tcp(network: String) -> String {
    if network.is_empty() {
        "tcp".to_string()
    } else {
        network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use crate::utils::base64::base64_encode;
    use serde_json::json;

    fn vmess_info(proxy: &Proxy) -> &VMessInfo {
        match &proxy.kind {
            ProxyKind::VMess(info) => info,
            other => panic!("expected vmess, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_json_v2() {
        let json = r#"{"v":"2","ps":"JP","add":"jp.example.com","port":"443","id":"a3482e88-686a-4a58-8126-99c9df64b7bf","aid":"0","net":"ws","host":"cdn.example.com","path":"/ray","tls":"tls","sni":"jp.example.com"}"#;
        let proxy = explode_vmess(&format!("vmess://{}", base64_encode(json))).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::VMess);
        assert_eq!(proxy.remark, "JP");
        assert_eq!(proxy.group, "V2RayProvider");
        let info = vmess_info(&proxy);
        assert_eq!(info.transport.network, "ws");
        assert_eq!(info.transport.host, "cdn.example.com");
        assert_eq!(info.transport.path, "/ray");
        assert!(info.tls);
    }

    #[test]
    fn test_explode_json_v1_splits_host_path() {
        let json = r#"{"v":"1","ps":"old","add":"a.com","port":443,"id":"u","aid":2,"net":"ws","host":"h.com;/p","tls":""}"#;
        let proxy = explode_vmess(&format!("vmess://{}", base64_encode(json))).unwrap();
        let info = vmess_info(&proxy);
        assert_eq!(info.transport.host, "h.com");
        assert_eq!(info.transport.path, "/p");
        assert_eq!(info.alter_id, 2);
        assert!(!info.tls);
    }

    #[test]
    fn test_explode_std_form() {
        let proxy = explode_vmess(
            "vmess://uuid-1@example.com:8443?network=ws&aid=0&tls=1&sni=s.com&path=%2Fws&host=h.com#Std",
        )
        .unwrap();
        assert_eq!(proxy.remark, "Std");
        assert_eq!(proxy.port, 8443);
        let info = vmess_info(&proxy);
        assert_eq!(info.uuid, "uuid-1");
        assert_eq!(info.transport.path, "/ws");
        assert_eq!(info.sni, "s.com");
        assert!(info.tls);
    }

    #[test]
    fn test_explode_vmess1() {
        let proxy = explode_vmess1("vmess1://uuid@a.com:443/ray?network=ws&tls=true#k").unwrap();
        let info = vmess_info(&proxy);
        assert_eq!(info.transport.path, "/ray");
        assert_eq!(proxy.remark, "k");
    }

    #[test]
    fn test_explode_bad_port() {
        let json = r#"{"ps":"x","add":"a.com","port":"0","id":"u"}"#;
        assert!(explode_vmess(&format!("vmess://{}", base64_encode(json))).is_err());
        assert!(explode_vmess("vmess://%%%").is_err());
    }

    #[test]
    fn test_from_clash_ws() {
        let value = json!({
            "name": "v", "type": "vmess", "server": "a.com", "port": 443, "uuid": "u",
            "alterId": 0, "cipher": "auto", "tls": true, "servername": "s.com",
            "network": "ws", "ws-opts": {"path": "/p", "headers": {"Host": "h.com"}}
        });
        let proxy = from_clash(&FieldMap::from_value(&value).unwrap()).unwrap();
        let info = vmess_info(&proxy);
        assert_eq!(info.transport.host, "h.com");
        assert_eq!(info.sni, "s.com");
    }

    #[test]
    fn test_from_surge() {
        let line = SurgeLine::parse("vmess, a.com, 443, username=u, ws=true, ws-path=/p, ws-headers=Host:h.com, tls=true").unwrap();
        let proxy = from_surge("s", &line).unwrap();
        let info = vmess_info(&proxy);
        assert_eq!(info.transport.network, "ws");
        assert_eq!(info.transport.host, "h.com");
        assert!(info.tls);
    }
}
