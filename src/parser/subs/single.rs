use log::debug;

use crate::models::SubscriptionResult;
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::registry::Registry;
use crate::utils::base64::try_base64_decode;

/// Decodes a list of share-links, optionally wrapped in one base64 layer.
///
/// Empty lines and `#` comments are ignored. A line no decoder accepts is
/// logged and skipped; the batch fails only when nothing decodes.
pub fn explode_sub(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let content = content.trim();
    let decoded = try_base64_decode(content).unwrap_or_else(|| content.to_string());

    let mut proxies = Vec::new();
    for line in decoded.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match registry.decode_link(line) {
            Ok(validated) => proxies.push(validated.proxy),
            Err(err) => debug!("skip line `{}`: {}", line, err),
        }
    }

    if proxies.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(SubscriptionResult::from_proxies(proxies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;
    use crate::parser::registry::default_registry;
    use crate::utils::base64::base64_encode;

    const LINKS: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@a.example.com:8388#A\n\
        # comment\n\
        \n\
        trojan://secret@b.example.com:443?sni=b.example.com#B\r\n\
        hy2://pw@c.example.com:443#C\n";

    #[test]
    fn test_plain_and_base64_bodies_agree() {
        let plain = explode_sub(LINKS, default_registry()).unwrap();
        let wrapped = explode_sub(&base64_encode(LINKS), default_registry()).unwrap();
        assert_eq!(plain, wrapped);
        let types: Vec<_> = plain.proxies.iter().map(|p| p.proxy_type).collect();
        assert_eq!(types, vec![ProxyType::Shadowsocks, ProxyType::Trojan, ProxyType::Hysteria2]);
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let body = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@a.example.com:8388#A\n\
            ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@b.example.com:8388#B\n\
            ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@c.example.com:8388#C\n\
            ss://%%%not-a-link\n";
        let result = explode_sub(body, default_registry()).unwrap();
        assert_eq!(result.proxies.len(), 3);
    }

    #[test]
    fn test_nothing_decodes() {
        assert_eq!(explode_sub("hello world", default_registry()), Err(ParseError::Empty));
    }
}
