use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::models::{Proxy, SubscriptionResult};
use crate::parser::error::{ParseError, ParseResult};
use crate::parser::explodes::{http, hysteria, snell, socks, ss, trojan, vmess, wireguard};
use crate::parser::fields::SurgeLine;
use crate::parser::registry::Registry;
use crate::utils::base64::try_base64_decode;
use crate::utils::ini_reader::IniReader;

lazy_static! {
    static ref SURGE_PROXY_LINE: Regex = Regex::new(
        r"(?mi)^[^=\n\[]+?=\s*(custom|ss|ssr|vmess|http|https|trojan|snell|socks5|socks5-tls|hysteria2|wireguard)\s*,"
    )
    .unwrap();
}

/// Surge text, possibly wrapped in base64
fn surge_text(content: &str) -> Option<String> {
    if SURGE_PROXY_LINE.is_match(content) {
        return Some(content.to_string());
    }
    try_base64_decode(content).filter(|decoded| SURGE_PROXY_LINE.is_match(decoded))
}

/// Whether the document holds Surge-style `name = type, ...` proxy lines
pub fn is_surge(content: &str) -> bool {
    surge_text(content).is_some()
}

/// Decodes the `[Proxy]` section of a Surge profile.
///
/// A bare list of proxy lines is accepted as if it sat under `[Proxy]`.
/// Built-in policies are skipped; `wireguard` lines read their
/// `[WireGuard <section-name>]` section.
pub fn explode_surge(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let text = surge_text(content).ok_or(ParseError::Malformed("surge"))?;
    let text = if text.contains("[Proxy]") {
        match text.find('[') {
            Some(idx) => text[idx..].to_string(),
            None => text,
        }
    } else {
        format!("[Proxy]\n{}", text)
    };
    let ini = IniReader::parse(&text).map_err(|_| ParseError::Malformed("surge"))?;
    let section = ini.section("Proxy").ok_or_else(|| ParseError::MissingField("[Proxy]".to_string()))?;

    let mut proxies = Vec::new();
    for (remark, value) in &section.items {
        if remark.is_empty() {
            continue;
        }
        let line = match SurgeLine::parse(value) {
            Ok(line) => line,
            Err(err) => {
                debug!("skip surge proxy `{}`: {}", remark, err);
                continue;
            }
        };
        let built: ParseResult<Proxy> = match line.kind.as_str() {
            "direct" | "reject" | "reject-tinygif" | "reject-drop" | "reject-no-drop" => continue,
            "custom" | "ss" => ss::from_surge(remark, &line),
            "socks5" | "socks5-tls" => socks::from_surge(remark, &line),
            "vmess" => vmess::from_surge(remark, &line),
            "http" | "https" => http::from_surge(remark, &line),
            "trojan" => trojan::from_surge(remark, &line),
            "snell" => snell::from_surge(remark, &line),
            "hysteria2" => hysteria::from_surge(remark, &line),
            "wireguard" => {
                let name = line.arg("section-name");
                wireguard::from_surge(remark, &line, ini.section(&format!("WireGuard {}", name)))
            }
            other => Err(ParseError::UnsupportedScheme(other.to_string())),
        };
        match built {
            Ok(proxy) => proxies.push(registry.validate(proxy).proxy),
            Err(err) => debug!("skip surge proxy `{}`: {}", remark, err),
        }
    }
    Ok(SubscriptionResult::from_proxies(proxies))
}
