use super::common::{
    apply_clash_flags, apply_surge_flags, clash_endpoint, list_param, param, split_host_port, split_query,
    split_remark, split_userinfo, strip_scheme,
};
use crate::models::{Proxy, ProxyKind, WireGuardInfo};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::ini_reader::IniSection;
use crate::utils::string::trim_of;
use crate::utils::url::url_decode;

/// Splits `address` lists such as `10.0.0.2/32,fd00::2/128` into the v4 and v6 entries
fn split_addresses(list: &[String]) -> (String, String) {
    let mut v4 = String::new();
    let mut v6 = String::new();
    for addr in list {
        let target = if addr.contains(':') { &mut v6 } else { &mut v4 };
        if target.is_empty() {
            *target = addr.clone();
        }
    }
    (v4, v6)
}

/// Parse a `wireguard://privatekey@host:port?publickey=&address=&mtu=` link
///
/// The private key may also be given as the `privateKey` parameter.
pub fn explode_wireguard(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["wireguard://", "wg://"]).ok_or(ParseError::Malformed("wireguard"))?;
    let (content, remark) = split_remark(content);
    let (body, params) = split_query(content);
    let (private_key, address) = match split_userinfo(body.trim_end_matches('/')) {
        Some((key, address)) => (url_decode(key), address),
        None => (param(&params, &["privateKey", "privatekey"]), body.trim_end_matches('/')),
    };
    let (server, port) = split_host_port(address)?;

    let public_key = param(&params, &["publickey", "publicKey"]);
    if private_key.is_empty() || public_key.is_empty() {
        return Err(ParseError::MissingField("private-key/public-key".to_string()));
    }

    let mut addresses = list_param(&params, "address");
    addresses.extend(list_param(&params, "selfIP"));
    addresses.extend(list_param(&params, "selfIPv6"));
    let (self_ip, self_ipv6) = split_addresses(&addresses);

    let info = WireGuardInfo {
        private_key,
        public_key,
        preshared_key: param(&params, &["presharedKey", "presharedkey", "psk"]),
        self_ip,
        self_ipv6,
        dns: list_param(&params, "dns"),
        mtu: param(&params, &["mtu"]).parse().unwrap_or(0),
        allowed_ips: list_param(&params, "allowedIPs"),
        keepalive: param(&params, &["keepAlive", "keepalive"]).parse().unwrap_or(0),
    };
    Ok(Proxy::new(ProxyKind::WireGuard(info), &remark, &server, port))
}

/// Builds from a Clash `type: wireguard` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let info = WireGuardInfo {
        private_key: fields.str("private-key"),
        public_key: fields.str("public-key"),
        preshared_key: fields.first(&["pre-shared-key", "preshared-key"]),
        self_ip: fields.str("ip"),
        self_ipv6: fields.str("ipv6"),
        dns: fields.list("dns"),
        mtu: fields.u32("mtu").try_into().unwrap_or(0),
        allowed_ips: fields.list("allowed-ips"),
        keepalive: fields.u32("persistent-keepalive").try_into().unwrap_or(0),
    };
    let mut proxy = Proxy::new(ProxyKind::WireGuard(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Splits a Surge peer tuple `(key = value, key = "a, b")` on commas outside quotes
fn parse_peer(value: &str) -> Vec<(String, String)> {
    let inner = value.trim().trim_start_matches('(').trim_end_matches(')');
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in inner.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ',' if !quoted => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    parts.push(current);

    parts
        .iter()
        .filter_map(|part| part.split_once('='))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), trim_of(v.trim(), '"').to_string()))
        .collect()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Builds from a Surge `wireguard, section-name = X` line and its `[WireGuard X]` section
///
/// The endpoint comes from the section's `peer` tuple.
pub fn from_surge(remark: &str, line: &SurgeLine, section: Option<&IniSection>) -> ParseResult<Proxy> {
    let section = section.ok_or_else(|| ParseError::MissingField("section-name".to_string()))?;
    let get = |key: &str| section.get(key).map(|v| trim_of(v.trim(), '"').to_string()).unwrap_or_default();

    let mut info = WireGuardInfo {
        private_key: get("private-key"),
        self_ip: get("self-ip"),
        self_ipv6: get("self-ip-v6"),
        dns: split_list(&get("dns-server")),
        mtu: get("mtu").parse().unwrap_or(0),
        ..Default::default()
    };

    let mut endpoint = String::new();
    for (key, value) in parse_peer(&get("peer")) {
        match key.as_str() {
            "public-key" => info.public_key = value,
            "preshared-key" => info.preshared_key = value,
            "allowed-ips" => info.allowed_ips = split_list(&value),
            "keepalive" => info.keepalive = value.parse().unwrap_or(0),
            "endpoint" => endpoint = value,
            _ => {}
        }
    }
    if info.public_key.is_empty() {
        info.public_key = get("peer-public-key");
    }
    if info.private_key.is_empty() || info.public_key.is_empty() {
        return Err(ParseError::MissingField("private-key/public-key".to_string()));
    }

    let (server, port) = split_host_port(&endpoint)?;
    let mut proxy = Proxy::new(ProxyKind::WireGuard(info), remark, &server, port);
    apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use crate::utils::ini_reader::IniReader;
    use serde_json::json;

    fn wg_info(proxy: &Proxy) -> &WireGuardInfo {
        match &proxy.kind {
            ProxyKind::WireGuard(info) => info,
            other => panic!("expected wireguard, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_wireguard_link() {
        let proxy = explode_wireguard(
            "wireguard://cHJpdg%3D%3D@162.159.192.1:2408?publickey=cHVi&address=172.16.0.2/32,2606:4700::2/128&mtu=1280#WARP",
        )
        .unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::WireGuard);
        assert_eq!(proxy.remark, "WARP");
        let info = wg_info(&proxy);
        assert_eq!(info.private_key, "cHJpdg==");
        assert_eq!(info.public_key, "cHVi");
        assert_eq!(info.self_ip, "172.16.0.2/32");
        assert_eq!(info.self_ipv6, "2606:4700::2/128");
        assert_eq!(info.mtu, 1280);
    }

    #[test]
    fn test_from_clash() {
        let value = json!({
            "name": "wg", "type": "wireguard", "server": "a.com", "port": 51820,
            "ip": "10.0.0.2", "private-key": "priv", "public-key": "pub",
            "dns": ["1.1.1.1"], "mtu": 1420, "udp": true
        });
        let proxy = from_clash(&FieldMap::from_value(&value).unwrap()).unwrap();
        assert_eq!(proxy.udp, Some(true));
        let info = wg_info(&proxy);
        assert_eq!(info.self_ip, "10.0.0.2");
        assert_eq!(info.dns, vec!["1.1.1.1"]);
        assert_eq!(info.mtu, 1420);
    }

    #[test]
    fn test_from_surge_section() {
        let ini = IniReader::parse(
            "[WireGuard home]\n\
             private-key = priv\n\
             self-ip = 10.0.0.2\n\
             dns-server = 1.1.1.1, 8.8.8.8\n\
             peer = (public-key = pub, allowed-ips = \"0.0.0.0/0, ::/0\", endpoint = wg.example.com:51820, keepalive = 25)\n",
        )
        .unwrap();
        let line = SurgeLine::parse("wireguard, section-name = home").unwrap();
        let proxy = from_surge("WG", &line, ini.section("WireGuard home")).unwrap();
        assert_eq!(proxy.hostname, "wg.example.com");
        assert_eq!(proxy.port, 51820);
        let info = wg_info(&proxy);
        assert_eq!(info.public_key, "pub");
        assert_eq!(info.allowed_ips, vec!["0.0.0.0/0", "::/0"]);
        assert_eq!(info.dns, vec!["1.1.1.1", "8.8.8.8"]);
        assert_eq!(info.keepalive, 25);
    }

    #[test]
    fn test_from_surge_missing_section() {
        let line = SurgeLine::parse("wireguard, section-name = nowhere").unwrap();
        assert!(from_surge("WG", &line, None).is_err());
    }
}
