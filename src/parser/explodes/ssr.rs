use lazy_static::lazy_static;
use regex::Regex;

use super::common::{apply_clash_flags, clash_endpoint, strip_scheme};
use crate::models::{Proxy, ProxyKind, ShadowsocksInfo, ShadowsocksRInfo};
use crate::parser::error::{parse_port, require_server, ParseError, ParseResult};
use crate::parser::fields::FieldMap;
use crate::utils::base64::{try_base64_decode, url_safe_base64_decode};
use crate::utils::url::parse_query;

lazy_static! {
    static ref SSR_BODY_REGEX: Regex =
        Regex::new(r"^(\S+):(\d+?):(\S+?):(\S+?):(\S+?):(\S+)$").unwrap();
}

/// Ciphers plain Shadowsocks understands; an SSR descriptor using one of
/// these with no protocol or obfs is really a Shadowsocks server.
pub const SS_CIPHERS: [&str; 14] = [
    "rc4-md5",
    "aes-128-gcm",
    "aes-192-gcm",
    "aes-256-gcm",
    "aes-128-cfb",
    "aes-192-cfb",
    "aes-256-cfb",
    "aes-128-ctr",
    "aes-192-ctr",
    "aes-256-ctr",
    "chacha20-ietf-poly1305",
    "xchacha20-ietf-poly1305",
    "2022-blake3-aes-128-gcm",
    "2022-blake3-aes-256-gcm",
];

/// Parse a ShadowsocksR link into a Proxy object
///
/// Descriptors without protocol and obfs that use a plain Shadowsocks cipher
/// come back as Shadowsocks proxies.
pub fn explode_ssr(link: &str) -> ParseResult<Proxy> {
    let payload = strip_scheme(link.trim(), &["ssr://"]).ok_or(ParseError::Malformed("ssr"))?;
    let decoded = try_base64_decode(payload).ok_or(ParseError::InvalidBase64)?;
    let decoded = decoded.trim();

    let (body, query) = match decoded.split_once("/?") {
        Some((body, query)) => (body, query),
        None => (decoded.trim_end_matches('/'), ""),
    };
    let params = parse_query(query);
    let param = |key: &str| {
        params
            .get(key)
            .map(|v| url_safe_base64_decode(v))
            .unwrap_or_default()
    };

    let caps = SSR_BODY_REGEX
        .captures(body)
        .ok_or(ParseError::Malformed("ssr"))?;
    let server = require_server(caps[1].trim_start_matches('[').trim_end_matches(']'))?.to_string();
    let port = parse_port(&caps[2])?;
    let password = try_base64_decode(&caps[6]).ok_or(ParseError::InvalidBase64)?;

    let info = ShadowsocksRInfo {
        method: caps[4].to_string(),
        password,
        protocol: caps[3].to_string(),
        protocol_param: param("protoparam"),
        obfs: caps[5].to_string(),
        obfs_param: param("obfsparam"),
    };
    Ok(build(info, &param("remarks"), &server, port, &param("group")))
}

/// Whether the descriptor can be expressed as plain Shadowsocks
pub fn is_plain_ss(info: &ShadowsocksRInfo) -> bool {
    matches!(info.protocol.as_str(), "" | "origin")
        && matches!(info.obfs.as_str(), "" | "plain")
        && SS_CIPHERS.contains(&info.method.as_str())
}

/// Creates the proxy, downgrading to Shadowsocks when [`is_plain_ss`] holds
pub fn build(info: ShadowsocksRInfo, remark: &str, server: &str, port: u16, group: &str) -> Proxy {
    let kind = if is_plain_ss(&info) {
        ProxyKind::Shadowsocks(ShadowsocksInfo {
            method: info.method,
            password: info.password,
            ..Default::default()
        })
    } else {
        ProxyKind::ShadowsocksR(info)
    };
    Proxy::new(kind, remark, server, port).with_group(group)
}

/// Builds from a Clash `type: ssr` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let info = ShadowsocksRInfo {
        method: fields.str("cipher"),
        password: fields.str("password"),
        protocol: fields.str("protocol"),
        protocol_param: fields.first(&["protocol-param", "protocolparam"]),
        obfs: fields.str("obfs"),
        obfs_param: fields.first(&["obfs-param", "obfsparam"]),
    };
    let mut proxy = build(info, &name, &server, port, "");
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from an SSR client JSON entry or an SSTap `ssr` entry
pub fn from_json(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("server"))?.to_string();
    let port = parse_port(&fields.first(&["server_port", "port"]))?;
    let info = ShadowsocksRInfo {
        method: fields.str("method"),
        password: fields.str("password"),
        protocol: fields.str("protocol"),
        protocol_param: fields.first(&["protocolparam", "protocol_param"]),
        obfs: fields.str("obfs"),
        obfs_param: fields.first(&["obfsparam", "obfs_param"]),
    };
    let remark = fields.first(&["remarks", "name"]);
    Ok(build(info, &remark, &server, port, &fields.str("group")))
}

/// Builds from a Netch server entry of `Type` 2
pub fn from_netch(fields: &FieldMap) -> ParseResult<Proxy> {
    let server = require_server(&fields.str("Hostname"))?.to_string();
    let port = fields.port("Port")?;
    let info = ShadowsocksRInfo {
        method: fields.str("EncryptMethod"),
        password: fields.str("Password"),
        protocol: fields.str("Protocol"),
        protocol_param: fields.str("ProtocolParam"),
        obfs: fields.str("OBFS"),
        obfs_param: fields.str("OBFSParam"),
    };
    Ok(build(info, &fields.str("Remark"), &server, port, ""))
}
