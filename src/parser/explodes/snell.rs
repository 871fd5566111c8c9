use super::common::{apply_clash_flags, apply_surge_flags, clash_endpoint, param, split_host_port, split_query, split_remark, strip_scheme};
use crate::models::{Proxy, ProxyKind, SnellInfo};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};

fn parse_version(value: &str) -> u8 {
    value.trim().parse().unwrap_or(0)
}

/// Parse a `snell://host:port?psk=&obfs=&obfs-host=&version=#remark` link
pub fn explode_snell(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["snell://"]).ok_or(ParseError::Malformed("snell"))?;
    let (content, remark) = split_remark(content);
    let (address, params) = split_query(content);
    let (server, port) = split_host_port(address)?;

    let psk = param(&params, &["psk"]);
    if psk.is_empty() {
        return Err(ParseError::MissingField("psk".to_string()));
    }
    let info = SnellInfo {
        psk,
        obfs: param(&params, &["obfs"]),
        obfs_host: param(&params, &["obfs-host"]),
        version: parse_version(&param(&params, &["version"])),
    };
    Ok(Proxy::new(ProxyKind::Snell(info), &remark, &server, port))
}

/// Builds from a Clash `type: snell` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let (obfs, obfs_host) = fields
        .obj("obfs-opts")
        .map(|opts| (opts.str("mode"), opts.str("host")))
        .unwrap_or_default();
    let info = SnellInfo {
        psk: fields.str("psk"),
        obfs,
        obfs_host,
        version: parse_version(&fields.str("version")),
    };
    let mut proxy = Proxy::new(ProxyKind::Snell(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from a Surge `snell` line
pub fn from_surge(remark: &str, line: &SurgeLine) -> ParseResult<Proxy> {
    let (server, port) = line.endpoint()?;
    let info = SnellInfo {
        psk: line.arg("psk"),
        obfs: line.arg("obfs"),
        obfs_host: line.arg("obfs-host"),
        version: parse_version(&line.arg("version")),
    };
    let mut proxy = Proxy::new(ProxyKind::Snell(info), remark, &server, port);
    apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use serde_json::json;

    fn snell_info(proxy: &Proxy) -> &SnellInfo {
        match &proxy.kind {
            ProxyKind::Snell(info) => info,
            other => panic!("expected snell, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_snell() {
        let proxy = explode_snell("snell://1.2.3.4:6333?psk=key&obfs=tls&obfs-host=bing.com&version=3#Home%20Snell").unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Snell);
        assert_eq!(proxy.remark, "Home Snell");
        assert_eq!(proxy.group, "SnellProvider");
        let info = snell_info(&proxy);
        assert_eq!(info.psk, "key");
        assert_eq!(info.obfs, "tls");
        assert_eq!(info.obfs_host, "bing.com");
        assert_eq!(info.version, 3);
    }

    #[test]
    fn test_explode_snell_requires_psk() {
        assert!(explode_snell("snell://1.2.3.4:6333").is_err());
    }

    #[test]
    fn test_from_clash_obfs_opts() {
        let value = json!({
            "name": "s", "type": "snell", "server": "a.com", "port": 443, "psk": "k",
            "version": 2, "obfs-opts": {"mode": "http", "host": "b.com"}
        });
        let proxy = from_clash(&FieldMap::from_value(&value).unwrap()).unwrap();
        let info = snell_info(&proxy);
        assert_eq!(info.obfs, "http");
        assert_eq!(info.obfs_host, "b.com");
        assert_eq!(info.version, 2);
    }

    #[test]
    fn test_from_surge() {
        let line = SurgeLine::parse("snell, a.com, 443, psk=k, obfs=http, version=4, tfo=true").unwrap();
        let proxy = from_surge("S", &line).unwrap();
        assert_eq!(proxy.tfo, Some(true));
        assert_eq!(snell_info(&proxy).version, 4);
    }
}
