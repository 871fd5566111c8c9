use super::common::{apply_clash_flags, clash_endpoint, flag, list_param, param, split_query, strip_scheme};
use crate::models::{AnyTlsInfo, Proxy, ProxyKind};
use crate::parser::error::{parse_port, require_server, ParseError, ParseResult};
use crate::parser::fields::FieldMap;
use crate::utils::url::url_decode;

/// Parse an AnyTLS link: `anytls://password@host:port?peer=&alpn=&hpkp=&idle_session_*=`
pub fn explode_anytls(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["anytls://"]).ok_or(ParseError::Malformed("anytls"))?;
    let (content, remark) = match content.rfind('#') {
        Some(idx) => (&content[..idx], url_decode(&content[idx + 1..])),
        None => (content, String::new()),
    };
    let (body, params) = split_query(content);
    let body = body.trim_end_matches('/');

    let (password, address) = match body.split_once('@') {
        Some((password, address)) => (url_decode(password), address),
        None => (param(&params, &["password"]), body),
    };
    let (server, port) = address.rsplit_once(':').ok_or(ParseError::Malformed("anytls"))?;
    let server = require_server(server.trim_start_matches('[').trim_end_matches(']'))?;
    let port = parse_port(port)?;

    let number = |key: &str| param(&params, &[key]).parse::<u32>().unwrap_or(0);
    let info = AnyTlsInfo {
        password,
        sni: param(&params, &["peer", "sni"]),
        alpn: list_param(&params, "alpn"),
        fingerprint: param(&params, &["hpkp"]),
        idle_session_check_interval: number("idle_session_check_interval"),
        idle_session_timeout: number("idle_session_timeout"),
        min_idle_session: number("min_idle_session"),
    };
    let mut proxy = Proxy::new(ProxyKind::AnyTls(info), &remark, server, port);
    proxy.tfo = flag(&params, &["tfo"]);
    proxy.skip_cert_verify = flag(&params, &["insecure"]);
    Ok(proxy)
}

/// Builds from a Clash `type: anytls` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let info = AnyTlsInfo {
        password: fields.str("password"),
        sni: fields.str("sni"),
        alpn: fields.list("alpn"),
        fingerprint: fields.str("client-fingerprint"),
        idle_session_check_interval: fields.u32("idle-session-check-interval"),
        idle_session_timeout: fields.u32("idle-session-timeout"),
        min_idle_session: fields.u32("min-idle-session"),
    };
    let mut proxy = Proxy::new(ProxyKind::AnyTls(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}
