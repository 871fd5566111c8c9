use super::common::{
    apply_clash_flags, apply_surge_flags, clash_endpoint, flag, param, split_host_port,
    split_query, split_remark, split_userinfo, strip_scheme,
};
use super::vless::{insecure_flag, transport_from_query};
use super::vmess::{parse_surge_headers, transport_from_clash};
use crate::models::{Proxy, ProxyKind, TransportInfo, TrojanInfo};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::fields::{FieldMap, SurgeLine};
use crate::utils::url::url_decode;

/// Parse a Trojan link into a Proxy object
///
/// TLS is implied. `ws=1&wspath=` is the older spelling of `type=ws&path=`.
pub fn explode_trojan(link: &str) -> ParseResult<Proxy> {
    let content = strip_scheme(link.trim(), &["trojan://"]).ok_or(ParseError::Malformed("trojan"))?;
    let (content, remark) = split_remark(content);
    let (body, params) = split_query(content);

    let (password, address) = split_userinfo(body).ok_or(ParseError::Malformed("trojan"))?;
    let (server, port) = split_host_port(address)?;
    let password = url_decode(password);
    if password.is_empty() {
        return Err(ParseError::MissingField("password".to_string()));
    }

    let transport = if param(&params, &["ws"]) == "1" {
        TransportInfo {
            network: "ws".to_string(),
            path: param(&params, &["wspath"]),
            ..Default::default()
        }
    } else {
        match param(&params, &["type"]).as_str() {
            "" | "tcp" => TransportInfo::default(),
            network => transport_from_query(network, &params),
        }
    };

    let info = TrojanInfo {
        password,
        transport,
        sni: param(&params, &["sni", "peer"]),
    };
    let mut proxy = Proxy::new(ProxyKind::Trojan(info), &remark, &server, port)
        .with_group(&param(&params, &["group"]));
    proxy.skip_cert_verify = insecure_flag(&params);
    proxy.tfo = flag(&params, &["tfo"]);
    Ok(proxy)
}

/// Builds from a Clash `type: trojan` entry
pub fn from_clash(fields: &FieldMap) -> ParseResult<Proxy> {
    let (server, port, name) = clash_endpoint(fields)?;
    let info = TrojanInfo {
        password: fields.str("password"),
        transport: transport_from_clash(fields),
        sni: fields.first(&["sni", "servername"]),
    };
    let mut proxy = Proxy::new(ProxyKind::Trojan(info), &name, &server, port);
    apply_clash_flags(&mut proxy, fields);
    Ok(proxy)
}

/// Builds from a Surge `trojan` line
pub fn from_surge(remark: &str, line: &SurgeLine) -> ParseResult<Proxy> {
    let (server, port) = line.endpoint()?;
    let mut transport = TransportInfo::default();
    if line.flag("ws").unwrap_or(false) {
        transport.network = "ws".to_string();
        transport.path = line.arg("ws-path");
        transport.host = parse_surge_headers(&line.arg("ws-headers"))
            .get("host")
            .cloned()
            .unwrap_or_default();
    }
    let info = TrojanInfo {
        password: line.arg("password"),
        transport,
        sni: line.arg("sni"),
    };
    let mut proxy = Proxy::new(ProxyKind::Trojan(info), remark, &server, port);
    apply_surge_flags(&mut proxy, line);
    Ok(proxy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;

    fn trojan_info(proxy: &Proxy) -> &TrojanInfo {
        match &proxy.kind {
            ProxyKind::Trojan(info) => info,
            other => panic!("expected trojan, got {:?}", other),
        }
    }

    #[test]
    fn test_explode_basic() {
        let proxy = explode_trojan("trojan://secret@t.example.com:443?sni=s.com&allowInsecure=1#Tro").unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Trojan);
        assert_eq!(proxy.remark, "Tro");
        assert_eq!(proxy.group, "TrojanProvider");
        assert_eq!(proxy.skip_cert_verify, Some(true));
        let info = trojan_info(&proxy);
        assert_eq!(info.password, "secret");
        assert_eq!(info.sni, "s.com");
    }

    #[test]
    fn test_explode_legacy_ws_and_grpc() {
        let proxy = explode_trojan("trojan://p@a.com:443?ws=1&wspath=%2Fold").unwrap();
        let info = trojan_info(&proxy);
        assert_eq!(info.transport.network, "ws");
        assert_eq!(info.transport.path, "/old");

        let proxy = explode_trojan("trojan://p@a.com:443?type=grpc&serviceName=svc&peer=p.com").unwrap();
        let info = trojan_info(&proxy);
        assert_eq!(info.transport.path, "svc");
        assert_eq!(info.sni, "p.com");
    }

    #[test]
    fn test_insecure_alias() {
        let proxy = explode_trojan("trojan://p@a.com:443?insecure=true").unwrap();
        assert_eq!(proxy.skip_cert_verify, Some(true));
    }

    #[test]
    fn test_explode_rejects_missing_password() {
        assert!(explode_trojan("trojan://@a.com:443").is_err());
        assert!(explode_trojan("trojan://a.com:443").is_err());
    }

    #[test]
    fn test_from_surge() {
        let line = SurgeLine::parse("trojan, a.com, 443, password=pw, sni=s.com, skip-cert-verify=true").unwrap();
        let proxy = from_surge("t", &line).unwrap();
        assert_eq!(proxy.skip_cert_verify, Some(true));
        assert_eq!(trojan_info(&proxy).password, "pw");
    }
}
