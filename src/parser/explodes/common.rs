//! Pieces shared by every share-link decoder.

use linked_hash_map::LinkedHashMap;

use crate::models::Proxy;
use crate::parser::error::{parse_port, require_server, ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::string::{parse_bool, starts_with_ignore_case};
use crate::utils::url::{parse_query, url_decode};

/// Strips the first matching scheme (case-insensitive) and returns the rest
pub fn strip_scheme<'a>(link: &'a str, schemes: &[&str]) -> Option<&'a str> {
    schemes
        .iter()
        .find(|s| starts_with_ignore_case(link, s))
        .map(|s| &link[s.len()..])
}

/// Splits the `#fragment` off and percent-decodes it as the remark
pub fn split_remark(s: &str) -> (&str, String) {
    match s.split_once('#') {
        Some((body, remark)) => (body, url_decode(remark)),
        None => (s, String::new()),
    }
}

/// Splits `?query` off into an ordered parameter map
pub fn split_query(s: &str) -> (&str, LinkedHashMap<String, String>) {
    match s.split_once('?') {
        Some((body, query)) => (body, parse_query(query)),
        None => (s, LinkedHashMap::new()),
    }
}

/// Splits `host:port`, accepting a bracketed IPv6 host.
///
/// Brackets are removed from the returned host.
pub fn split_host_port(s: &str) -> ParseResult<(String, u16)> {
    let s = s.trim().trim_end_matches('/');
    let (host, port) = if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or(ParseError::Malformed("address"))?;
        let port = tail.strip_prefix(':').ok_or(ParseError::Malformed("address"))?;
        (host, port)
    } else {
        s.rsplit_once(':').ok_or(ParseError::Malformed("address"))?
    };
    let host = require_server(host)?;
    Ok((host.to_string(), parse_port(port)?))
}

/// Splits `userinfo@host:port` at the last `@`
pub fn split_userinfo(s: &str) -> Option<(&str, &str)> {
    s.rsplit_once('@')
}

/// First non-empty parameter among `keys`
pub fn param(params: &LinkedHashMap<String, String>, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| params.get(*k))
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// Boolean parameter, `None` when absent or unparseable
pub fn flag(params: &LinkedHashMap<String, String>, keys: &[&str]) -> Option<bool> {
    keys.iter()
        .filter_map(|k| params.get(*k))
        .find_map(|v| parse_bool(v))
}

/// Comma-separated list parameter
pub fn list_param(params: &LinkedHashMap<String, String>, key: &str) -> Vec<String> {
    params
        .get(key)
        .map(|v| {
            v.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Brackets an IPv6 literal so it can be written as `host:port`
pub fn format_host(host: &str) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    }
}

/// Copies the tri-state flags a Clash entry may carry onto the proxy
pub fn apply_clash_flags(proxy: &mut Proxy, fields: &FieldMap) {
    proxy.udp = fields.bool("udp");
    proxy.tfo = fields.bool("tfo");
    proxy.skip_cert_verify = fields.bool("skip-cert-verify");
    proxy.tls13 = fields.bool("tls13");
}

/// Copies `udp-relay`, `tfo` and `skip-cert-verify` from a Surge line
pub fn apply_surge_flags(proxy: &mut Proxy, line: &SurgeLine) {
    proxy.udp = line.flag("udp-relay");
    proxy.tfo = line.flag("tfo");
    proxy.skip_cert_verify = line.flag("skip-cert-verify");
    proxy.tls13 = line.flag("tls13");
}

/// Clash entries name their proxy with `name`; the default is `server:port`
pub fn clash_endpoint(fields: &FieldMap) -> ParseResult<(String, u16, String)> {
    let server = require_server(&fields.str("server"))?.to_string();
    let port = fields.port("port")?;
    Ok((server, port, fields.str("name")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("example.com:443").unwrap(), ("example.com".to_string(), 443));
        assert_eq!(split_host_port("[::1]:8388").unwrap(), ("::1".to_string(), 8388));
        assert!(split_host_port("example.com").is_err());
        assert!(split_host_port(":443").is_err());
        assert!(split_host_port("example.com:0").is_err());
    }

    #[test]
    fn test_split_remark_and_query() {
        let (body, remark) = split_remark("a@b:1?x=1#My%20Node");
        assert_eq!(body, "a@b:1?x=1");
        assert_eq!(remark, "My Node");
        let (body, params) = split_query(body);
        assert_eq!(body, "a@b:1");
        assert_eq!(params.get("x").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_strip_scheme_case_insensitive() {
        assert_eq!(strip_scheme("SS://abc", &["ss://"]), Some("abc"));
        assert_eq!(strip_scheme("ssr://abc", &["ss://"]), None);
    }

    #[test]
    fn test_format_host() {
        assert_eq!(format_host("::1"), "[::1]");
        assert_eq!(format_host("a.com"), "a.com");
    }
}
