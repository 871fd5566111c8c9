use linked_hash_map::LinkedHashMap;

use super::common::{apply_clash_flags, clash_endpoint, split_host_port, split_query, split_userinfo};
use crate::models::{HysteriaInfo, Proxy, ProxyKind, ProxyType};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::string::{parse_bool, starts_with_ignore_case};
use crate::utils::url::url_decode;

fn take(params: &mut LinkedHashMap<String, String>, keys: &[&str]) -> String {
    let mut found = String::new();
    for key in keys {
        if let Some(value) = params.remove(*key) {
            if found.is_empty() {
                found = value;
            }
        }
    }
    found
}

/// Parse a Hysteria (`hysteria://`) or Hysteria2 (`hysteria2://`, `hy2://`) link.
///
/// Both versions share one payload; the proxy type tells them apart. Query
/// parameters that are not promoted to fields stay in `params`.
pub fn explode_hysteria(link: &str) -> ParseResult<Proxy> {
    let link = link.trim();
    let (proxy_type, content) = if starts_with_ignore_case(link, "hysteria2://") {
        (ProxyType::Hysteria2, &link["hysteria2://".len()..])
    } else if starts_with_ignore_case(link, "hy2://") {
        (ProxyType::Hysteria2, &link["hy2://".len()..])
    } else if starts_with_ignore_case(link, "hysteria://") {
        (ProxyType::Hysteria, &link["hysteria://".len()..])
    } else {
        return Err(ParseError::Malformed("hysteria"));
    };

    let (content, remark) = match content.rfind('#') {
        Some(idx) => (&content[..idx], url_decode(&content[idx + 1..])),
        None => (content, String::new()),
    };
    let (body, mut params) = split_query(content);
    let body = body.trim_end_matches('/');

    let insecure = take(&mut params, &["insecure"]);
    let (mut password, address) = match split_userinfo(body) {
        Some((userinfo, address)) => (url_decode(userinfo), address),
        None => (String::new(), body),
    };
    let (server, port) = split_host_port(address)?;
    let param_password = take(&mut params, &["password", "auth"]);
    if password.is_empty() {
        password = param_password;
    }

    let info = HysteriaInfo {
        password,
        obfs: take(&mut params, &["obfs"]),
        obfs_password: take(&mut params, &["obfs-password", "obfsParam"]),
        sni: take(&mut params, &["sni", "peer"]),
        alpn: take(&mut params, &["alpn"])
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        up: take(&mut params, &["upmbps", "up"]),
        down: take(&mut params, &["downmbps", "down"]),
        params,
    };
    let mut proxy = Proxy::new(ProxyKind::Hysteria(info), &remark, &server, port).with_type(proxy_type);
    proxy.skip_cert_verify = parse_bool(&insecure);
    Ok(proxy)
}

/// Builds from a Clash `type: hysteria` or `type: hysteria2` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let proxy_type = if fields.str("type").eq_ignore_ascii_case("hysteria2") {
        ProxyType::Hysteria2
    } else {
        ProxyType::Hysteria
    };

    let mut params = LinkedHashMap::new();
    for key in ["protocol", "ports", "hop-interval", "recv-window-conn", "recv-window", "fingerprint"] {
        let value = fields.str(key);
        if !value.is_empty() {
            params.insert(key.to_string(), value);
        }
    }

    let info = HysteriaInfo {
        password: fields.first(&["password", "auth-str", "auth_str", "auth"]),
        obfs: fields.str("obfs"),
        obfs_password: fields.str("obfs-password"),
        sni: fields.first(&["sni", "servername"]),
        alpn: fields.list("alpn"),
        up: fields.str("up"),
        down: fields.str("down"),
        params,
    };
    let mut proxy = Proxy::new(ProxyKind::Hysteria(info), &name, &server, port).with_type(proxy_type);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from a Surge `hysteria2` line
pub fn from_surge(remark: &str, line: &SurgeLine) -> ParseResult<Proxy> {
    let (server, port) = line.endpoint()?;
    let info = HysteriaInfo {
        password: line.arg("password"),
        sni: line.arg("sni"),
        down: line.arg("download-bandwidth"),
        obfs: line.arg("obfs"),
        obfs_password: line.arg("obfs-password"),
        ..Default::default()
    };
    let mut proxy = Proxy::new(ProxyKind::Hysteria(info), remark, &server, port)
        .with_type(ProxyType::Hysteria2);
    super::common::apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hy_info(proxy: &Proxy) -> &HysteriaInfo {
        match &proxy.kind {
            ProxyKind::Hysteria(info) => info,
            other => panic!("expected hysteria, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_hysteria2_and_alias() {
        let proxy = explode_hysteria(
            "hysteria2://pw@h.example.com:443/?sni=s.com&obfs=salamander&obfs-password=op&insecure=1#H2",
        )
        .unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Hysteria2);
        assert_eq!(proxy.group, "Hysteria2Provider");
        assert_eq!(proxy.skip_cert_verify, Some(true));
        let info = hy_info(&proxy);
        assert_eq!(info.password, "pw");
        assert_eq!(info.obfs, "salamander");
        assert_eq!(info.obfs_password, "op");
        assert!(info.params.is_empty());

        let alias = explode_hysteria("hy2://pw@h.example.com:443#H2").unwrap();
        assert_eq!(alias.proxy_type, ProxyType::Hysteria2);
    }

    #[test]
    fn test_explode_hysteria_v1_keeps_unknown_params() {
        let proxy = explode_hysteria(
            "hysteria://h.example.com:8443?protocol=udp&auth=secret&peer=s.com&upmbps=20&downmbps=100&alpn=h3",
        )
        .unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Hysteria);
        assert_eq!(proxy.remark, "h.example.com:8443");
        let info = hy_info(&proxy);
        assert_eq!(info.password, "secret");
        assert_eq!(info.sni, "s.com");
        assert_eq!(info.up, "20");
        assert_eq!(info.down, "100");
        assert_eq!(info.alpn, vec!["h3"]);
        assert_eq!(info.params.get("protocol").map(String::as_str), Some("udp"));
    }

    #[test]
    fn test_explode_bad_port() {
        assert!(explode_hysteria("hysteria2://pw@h.example.com:0").is_err());
        assert!(explode_hysteria("hysteria2://pw@h.example.com").is_err());
    }

    #[test]
    fn test_from_clash_v1() {
        let value = json!({
            "name": "h", "type": "hysteria", "server": "a.com", "port": 443,
            "auth-str": "token", "up": "30", "down": "200", "alpn": ["h3"]
        });
        let proxy = from_clash(&FieldMap::from_value(&value).unwrap()).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Hysteria);
        assert_eq!(hy_info(&proxy).password, "token");
    }
}
