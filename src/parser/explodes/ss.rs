use linked_hash_map::LinkedHashMap;

use super::common::{
    apply_clash_flags, apply_surge_flags, clash_endpoint, split_host_port, split_query,
    split_remark, split_userinfo, strip_scheme,
};
use crate::models::{Proxy, ProxyKind, ShadowsocksInfo};
use crate::parser::error::{parse_port, require_server, ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::base64::{try_base64_decode, url_safe_base64_decode};
use crate::utils::url::url_decode;

/// Parse a Shadowsocks link into a Proxy object
///
/// Accepts both SIP002 (`ss://base64(method:pass)@host:port`) and the legacy
/// form where the whole `method:pass@host:port` is Base64 encoded.
pub fn explode_ss(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["ss://"]).ok_or(ParseError::Malformed("ss"))?;
    let content = content.replacen("/?", "?", 1);

    let (content, remark) = split_remark(&content);
    let (content, params) = split_query(content);
    let content = content.trim_end_matches('/');

    let (plugin, plugin_opts) = match params.get("plugin") {
        Some(value) => split_plugin(&url_decode(value)),
        None => (String::new(), LinkedHashMap::new()),
    };
    let group = params
        .get("group")
        .filter(|g| !g.is_empty())
        .map(|g| url_safe_base64_decode(g))
        .unwrap_or_default();

    let (method, password, server, port) = match split_userinfo(content) {
        Some((userinfo, address)) => {
            let (method, password) = decode_method_password(userinfo)?;
            let (server, port) = split_host_port(address)?;
            (method, password, server, port)
        }
        None => {
            let decoded = try_base64_decode(content).ok_or(ParseError::InvalidBase64)?;
            let (userinfo, address) = split_userinfo(&decoded).ok_or(ParseError::Malformed("ss"))?;
            let (method, password) = userinfo
                .split_once(':')
                .ok_or(ParseError::Malformed("ss"))?;
            let (server, port) = split_host_port(address)?;
            (method.to_string(), password.to_string(), server, port)
        }
    };

    let info = ShadowsocksInfo {
        method,
        password,
        plugin,
        plugin_opts,
    };
    Ok(Proxy::new(ProxyKind::Shadowsocks(info), &remark, &server, port).with_group(&group))
}

/// SIP002 userinfo is Base64 for stream ciphers and may be percent-encoded plain text for AEAD-2022
fn decode_method_password(userinfo: &str) -> ParseResult<(String, String)> {
    let plain = url_decode(userinfo);
    let decoded = match plain.split_once(':') {
        Some(_) => plain,
        None => try_base64_decode(userinfo).ok_or(ParseError::InvalidBase64)?,
    };
    let (method, password) = decoded.split_once(':').ok_or(ParseError::Malformed("ss"))?;
    if method.is_empty() {
        return Err(ParseError::MissingField("method".to_string()));
    }
    Ok((method.to_string(), password.to_string()))
}

/// Splits a `plugin;key=value;flag` string into the plugin name and its options
pub fn split_plugin(value: &str) -> (String, LinkedHashMap<String, String>) {
    match value.split_once(';') {
        Some((name, opts)) => (name.trim().to_string(), parse_plugin_opts(opts)),
        None => (value.trim().to_string(), LinkedHashMap::new()),
    }
}

/// Parses `key=value;flag` plugin options; a bare key means `true`
pub fn parse_plugin_opts(opts: &str) -> LinkedHashMap<String, String> {
    let mut out = LinkedHashMap::new();
    for part in opts.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('=') {
            Some((k, v)) => out.insert(k.trim().to_string(), v.trim().to_string()),
            None => out.insert(part.to_string(), "true".to_string()),
        };
    }
    out
}

/// Inverse of [`parse_plugin_opts`]
pub fn plugin_opts_to_string(opts: &LinkedHashMap<String, String>) -> String {
    opts.iter()
        .map(|(k, v)| {
            if v == "true" {
                k.clone()
            } else {
                format!("{}={}", k, v)
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Builds from a Clash `type: ss` entry.
///
/// Clash spells simple-obfs as `plugin: obfs` with `mode`/`host` options;
/// those are mapped back to the SIP003 names.
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let mut plugin = fields.str("plugin");
    let clash_opts = fields.string_map("plugin-opts");
    let mut plugin_opts = LinkedHashMap::new();

    match plugin.as_str() {
        "obfs" => {
            plugin = "obfs-local".to_string();
            if let Some(mode) = clash_opts.get("mode") {
                plugin_opts.insert("obfs".to_string(), mode.clone());
            }
            if let Some(host) = clash_opts.get("host") {
                plugin_opts.insert("obfs-host".to_string(), host.clone());
            }
        }
        "v2ray-plugin" => {
            for key in ["mode", "host", "path"] {
                if let Some(v) = clash_opts.get(key).filter(|v| !v.is_empty()) {
                    plugin_opts.insert(key.to_string(), v.clone());
                }
            }
            if clash_opts.get("tls").map(String::as_str) == Some("true") {
                plugin_opts.insert("tls".to_string(), "true".to_string());
            }
            if clash_opts.get("mux").map(String::as_str) == Some("true") {
                plugin_opts.insert("mux".to_string(), "true".to_string());
            }
        }
        _ => plugin_opts = clash_opts,
    }

    let info = ShadowsocksInfo {
        method: fields.str("cipher"),
        password: fields.str("password"),
        plugin,
        plugin_opts,
    };
    let mut proxy = Proxy::new(ProxyKind::Shadowsocks(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from a Surge `ss` (Surge 3+) or `custom` (Surge 2) line
pub fn from_surge(remark: &str, line: &SurgeLine) -> ParseResult<Proxy> {
    let (server, port) = line.endpoint()?;
    let mut method = line.arg("encrypt-method");
    let mut password = line.arg("password");
    if line.kind == "custom" {
        if method.is_empty() {
            method = line.positional(2);
        }
        if password.is_empty() {
            password = line.positional(3);
        }
    }

    let mut info = ShadowsocksInfo {
        method,
        password,
        ..Default::default()
    };
    let obfs = line.arg("obfs");
    if !obfs.is_empty() {
        info.plugin = "obfs-local".to_string();
        info.plugin_opts.insert("obfs".to_string(), obfs);
        let host = line.arg("obfs-host");
        if !host.is_empty() {
            info.plugin_opts.insert("obfs-host".to_string(), host);
        }
    }

    let mut proxy = Proxy::new(ProxyKind::Shadowsocks(info), remark, &server, port);
    apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

/// Builds from a vendor JSON object (shadowsocks-libev, SSAndroid, SSTap, SSD).
///
/// Key spellings differ between vendors; the first present one wins.
pub fn from_json(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("server"))?.to_string();
    let port = parse_port(&fields.first(&["server_port", "port"]))?;
    let plugin_opts = fields.first(&["plugin_opts", "plugin_options"]);

    let info = ShadowsocksInfo {
        method: fields.first(&["method", "encryption", "cipher"]),
        password: fields.str("password"),
        plugin: fields.str("plugin"),
        plugin_opts: parse_plugin_opts(&plugin_opts),
    };
    let remark = fields.first(&["remarks", "name"]);
    let group = fields.first(&["group", "airport"]);
    Ok(Proxy::new(ProxyKind::Shadowsocks(info), &remark, &server, port).with_group(&group))
}

/// Builds from a Netch server entry of `Type` 1
pub fn from_netch(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("Hostname"))?.to_string();
    let port = fields.port("Port")?;
    let info = ShadowsocksInfo {
        method: fields.str("EncryptMethod"),
        password: fields.str("Password"),
        plugin: fields.str("Plugin"),
        plugin_opts: parse_plugin_opts(&fields.str("PluginOption")),
    };
    Ok(Proxy::new(ProxyKind::Shadowsocks(info), &fields.str("Remark"), &server, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use serde_json::json;

    fn ss_info(proxy: &Proxy) -> &ShadowsocksInfo {
        match &proxy.kind {
            ProxyKind::Shadowsocks(info) => info,
            other => panic!("expected shadowsocks, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_sip002() {
        let proxy = explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#Test").unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Shadowsocks);
        assert_eq!(proxy.hostname, "example.com");
        assert_eq!(proxy.port, 8388);
        assert_eq!(proxy.remark, "Test");
        assert_eq!(proxy.group, "SSProvider");
        let info = ss_info(&proxy);
        assert_eq!(info.method, "aes-256-gcm");
        assert_eq!(info.password, "password");
    }

    #[test]
    fn test_explode_legacy() {
        // base64("aes-128-gcm:pass@1.2.3.4:443")
        let proxy = explode_ss("ss://YWVzLTEyOC1nY206cGFzc0AxLjIuMy40OjQ0Mw==#Legacy").unwrap();
        assert_eq!(proxy.hostname, "1.2.3.4");
        assert_eq!(proxy.port, 443);
        assert_eq!(ss_info(&proxy).method, "aes-128-gcm");
    }

    #[test]
    fn test_explode_ipv6_and_plugin() {
        let link = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@[2001:db8::1]:8388/?plugin=obfs-local%3Bobfs%3Dhttp%3Bobfs-host%3Dbing.com#v6";
        let proxy = explode_ss(link).unwrap();
        assert_eq!(proxy.hostname, "2001:db8::1");
        let info = ss_info(&proxy);
        assert_eq!(info.plugin, "obfs-local");
        assert_eq!(info.plugin_opts.get("obfs").map(String::as_str), Some("http"));
        assert_eq!(info.plugin_opts.get("obfs-host").map(String::as_str), Some("bing.com"));
    }

    #[test]
    fn test_explode_rejects_bad_input() {
        assert!(explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:0").is_err());
        assert!(explode_ss("ss://not base64 at all").is_err());
        assert!(explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com").is_err());
    }

    #[test]
    fn test_remark_defaults_to_address() {
        let proxy = explode_ss("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388").unwrap();
        assert_eq!(proxy.remark, "example.com:8388");
    }

    #[test]
    fn test_plugin_opts_roundtrip_flags() {
        let opts = parse_plugin_opts("mode=websocket;host=a.com;tls");
        assert_eq!(opts.get("tls").map(String::as_str), Some("true"));
        assert_eq!(plugin_opts_to_string(&opts), "mode=websocket;host=a.com;tls");
    }

    #[test]
    fn test_from_clash_maps_obfs() {
        let value = json!({
            "name": "hk", "type": "ss", "server": "hk.example.com", "port": 443,
            "cipher": "chacha20-ietf-poly1305", "password": "pw", "udp": true,
            "plugin": "obfs", "plugin-opts": {"mode": "tls", "host": "bing.com"}
        });
        let proxy = from_clash(&FieldMap::from_value(&value).unwrap()).unwrap();
        assert_eq!(proxy.remark, "hk");
        assert_eq!(proxy.udp, Some(true));
        let info = ss_info(&proxy);
        assert_eq!(info.plugin, "obfs-local");
        assert_eq!(info.plugin_opts.get("obfs").map(String::as_str), Some("tls"));
    }

    #[test]
    fn test_from_surge() {
        let line = SurgeLine::parse("ss, 1.2.3.4, 8388, encrypt-method=aes-128-gcm, password=pw, obfs=http, obfs-host=a.com, udp-relay=true").unwrap();
        let proxy = from_surge("node", &line).unwrap();
        assert_eq!(proxy.remark, "node");
        assert_eq!(proxy.udp, Some(true));
        assert_eq!(ss_info(&proxy).plugin, "obfs-local");
    }

    #[test]
    fn test_from_json_vendor_keys() {
        let value = json!({"server": "a.com", "server_port": 8388, "method": "aes-256-gcm", "password": "pw", "remarks": "r"});
        let proxy = from_json(&FieldMap::from_value(&value).unwrap()).unwrap();
        assert_eq!(proxy.port, 8388);
        assert_eq!(proxy.remark, "r");

        let value = json!({"server": "b.com", "port": "443", "encryption": "rc4-md5", "password": "pw", "airport": "Air"});
        let proxy = from_json(&FieldMap::from_value(&value).unwrap()).unwrap();
        assert_eq!(proxy.group, "Air");
        assert_eq!(ss_info(&proxy).method, "rc4-md5");
    }
}
