use lazy_static::lazy_static;
use linked_hash_map::LinkedHashMap;
use regex::Regex;

use super::common::{apply_clash_flags, clash_endpoint, flag, param, split_query, strip_scheme};
use super::vmess::transport_from_clash;
use crate::models::{Proxy, ProxyKind, RealityInfo, TransportInfo, VlessInfo};
use crate::parser::error::{parse_port, require_server, ParseError, ParseResult};
use crate::parser::fields::FieldMap;
use crate::utils::url::url_decode;

lazy_static! {
    static ref VLESS_BODY_REGEX: Regex = Regex::new(r"^(.*?)@(.*):(.*)$").unwrap();
}

/// Maps the query keys of a share link onto transport fields for the given network
pub fn transport_from_query(network: &str, params: &LinkedHashMap<String, String>) -> TransportInfo {
    let mut transport = TransportInfo {
        network: network.to_string(),
        header_type: param(params, &["headerType"]),
        ..Default::default()
    };
    match network {
        "ws" | "http" | "h2" | "httpupgrade" => {
            transport.path = param(params, &["path"]);
            transport.host = param(params, &["host"]);
        }
        "grpc" => {
            transport.path = param(params, &["serviceName", "path"]);
        }
        "quic" => {
            transport.host = param(params, &["quicSecurity"]);
            transport.path = param(params, &["key"]);
        }
        _ => {
            if transport.header_type == "http" {
                transport.host = param(params, &["host"]);
                transport.path = param(params, &["path"]);
            }
        }
    }
    transport
}

/// `allowInsecure` and the older `insecure` both mean skip-cert-verify
pub fn insecure_flag(params: &LinkedHashMap<String, String>) -> Option<bool> {
    flag(params, &["allowInsecure", "insecure"])
}

/// Parse a VLESS link into a Proxy object
pub fn explode_vless(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["vless://"]).ok_or(ParseError::Malformed("vless"))?;

    let (content, remark) = match content.rfind('#') {
        Some(idx) => (&content[..idx], url_decode(&content[idx + 1..])),
        None => (content, String::new()),
    };
    let (body, params) = split_query(content);
    let body = body.trim_end_matches('/');

    let caps = VLESS_BODY_REGEX
        .captures(body)
        .ok_or(ParseError::Malformed("vless"))?;
    let server = require_server(caps[2].trim_start_matches('[').trim_end_matches(']'))?.to_string();
    let port = parse_port(&caps[3])?;

    let mut network = param(&params, &["type"]);
    if network.is_empty() {
        network = "tcp".to_string();
    }
    let security = param(&params, &["security"]);
    let reality = if security == "reality" {
        Some(RealityInfo {
            public_key: param(&params, &["pbk"]),
            short_id: param(&params, &["sid"]),
        })
    } else {
        None
    };

    let info = VlessInfo {
        uuid: url_decode(&caps[1]),
        flow: param(&params, &["flow"]),
        transport: transport_from_query(&network, &params),
        tls: security == "tls" || security == "reality",
        sni: param(&params, &["sni", "peer"]),
        fingerprint: param(&params, &["fp"]),
        reality,
    };
    let mut proxy = Proxy::new(ProxyKind::Vless(info), &remark, &server, port)
        .with_group(&param(&params, &["group"]));
    proxy.skip_cert_verify = insecure_flag(&params);
    Ok(proxy)
}

/// Builds from a Clash `type: vless` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let reality = fields.obj("reality-opts").map(|opts| RealityInfo {
        public_key: opts.str("public-key"),
        short_id: opts.str("short-id"),
    });
    let info = VlessInfo {
        uuid: fields.str("uuid"),
        flow: fields.str("flow"),
        transport: transport_from_clash(fields),
        tls: fields.bool("tls").unwrap_or(false) || reality.is_some(),
        sni: fields.first(&["servername", "sni"]),
        fingerprint: fields.str("client-fingerprint"),
        reality,
    };
    let mut proxy = Proxy::new(ProxyKind::Vless(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}
