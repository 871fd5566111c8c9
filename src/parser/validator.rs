//! Optional correctness check run after a native decode, and the decoder of
//! last resort for schemes no native decoder claims.
//!
//! A rejection never fails decoding: the caller keeps the unvalidated proxy
//! and gets the issue alongside it in [`Validated`].

use log::debug;
use serde_json::Value;
use thiserror::Error;

use crate::models::{OptionsBag, Proxy, ProxyKind, ProxyType};
use crate::parser::fields::{value_to_string, yaml_to_json};
use crate::utils::base64::try_base64_decode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationIssue {
    pub reason: String,
}

impl ValidationIssue {
    pub fn new(reason: impl Into<String>) -> Self {
        ValidationIssue { reason: reason.into() }
    }
}

/// Best-effort decode result: the proxy plus why validation rejected it, if it did
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub proxy: Proxy,
    pub issue: Option<ValidationIssue>,
}

impl Validated {
    pub fn is_validated(&self) -> bool {
        self.issue.is_none()
    }

    pub fn into_proxy(self) -> Proxy {
        self.proxy
    }
}

pub trait Validator: Send + Sync {
    /// Checks a natively decoded proxy. `Ok(Some(bag))` attaches normalized
    /// options that the Clash encoder prefers over the native payload.
    fn validate(&self, proxy: &Proxy) -> Result<Option<OptionsBag>, ValidationIssue>;

    /// Builds a proxy from a Clash-style option map (`type`, `server`, `port`, `name`, ...)
    fn from_options(&self, options: OptionsBag) -> Result<Proxy, ValidationIssue>;

    /// Decodes `scheme://payload` where the payload is a base64 or raw YAML/JSON
    /// option map. `None` when the line has no scheme at all.
    fn decode_fallback(&self, line: &str) -> Option<Result<Proxy, ValidationIssue>> {
        let (scheme, payload) = line.trim().split_once("://")?;
        if scheme.is_empty() {
            return None;
        }
        let text = try_base64_decode(payload).unwrap_or_else(|| payload.to_string());
        let parsed = serde_yaml::from_str::<serde_yaml::Value>(&text)
            .map_err(|e| ValidationIssue::new(format!("{}:// payload is not YAML: {}", scheme, e)))
            .and_then(|yaml| yaml_to_json(&yaml).map_err(|e| ValidationIssue::new(e.to_string())));
        let mut options = match parsed {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Some(Err(ValidationIssue::new(format!("{}:// payload is not a map", scheme)))),
            Err(issue) => return Some(Err(issue)),
        };
        options
            .entry("type")
            .or_insert_with(|| Value::String(scheme.to_ascii_lowercase()));
        Some(self.from_options(options))
    }
}

/// Structural checks only: endpoint present and the protocol's defining
/// credential non-empty. Credentials are never checked for meaning.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinValidator;

fn require(value: &str, field: &str) -> Result<(), ValidationIssue> {
    if value.is_empty() {
        Err(ValidationIssue::new(format!("missing {}", field)))
    } else {
        Ok(())
    }
}

impl Validator for BuiltinValidator {
    fn validate(&self, proxy: &Proxy) -> Result<Option<OptionsBag>, ValidationIssue> {
        if proxy.hostname.is_empty() || proxy.port == 0 {
            return Err(ValidationIssue::new("missing endpoint"));
        }
        match &proxy.kind {
            ProxyKind::Shadowsocks(info) => require(&info.method, "cipher").and(require(&info.password, "password")),
            ProxyKind::ShadowsocksR(info) => require(&info.method, "cipher").and(require(&info.protocol, "protocol")),
            ProxyKind::VMess(info) => require(&info.uuid, "uuid"),
            ProxyKind::Vless(info) => require(&info.uuid, "uuid"),
            ProxyKind::Trojan(info) => require(&info.password, "password"),
            ProxyKind::Tuic(info) => require(&info.uuid, "uuid"),
            ProxyKind::AnyTls(info) => require(&info.password, "password"),
            ProxyKind::Snell(info) => require(&info.psk, "psk"),
            ProxyKind::WireGuard(info) => {
                require(&info.private_key, "private-key").and(require(&info.public_key, "public-key"))
            }
            _ => Ok(()),
        }?;
        Ok(None)
    }

    fn from_options(&self, options: OptionsBag) -> Result<Proxy, ValidationIssue> {
        let get = |key: &str| options.get(key).map(value_to_string).unwrap_or_default();
        let type_name = get("type");
        let server = get("server");
        if type_name.is_empty() {
            return Err(ValidationIssue::new("missing type"));
        }
        if server.is_empty() {
            return Err(ValidationIssue::new("missing server"));
        }
        let port = match get("port").parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(ValidationIssue::new(format!("invalid port `{}`", get("port")))),
        };

        let known = ProxyType::from_tag(&type_name);
        let mut proxy = Proxy::new(
            ProxyKind::Opaque {
                type_name: type_name.clone(),
            },
            &get("name"),
            &server,
            port,
        );
        if known != ProxyType::Unknown {
            proxy = proxy.with_type(known);
        }
        proxy.udp = options.get("udp").and_then(Value::as_bool);
        proxy.tfo = options.get("tfo").and_then(Value::as_bool);
        proxy.skip_cert_verify = options.get("skip-cert-verify").and_then(Value::as_bool);
        debug!("accepted {} proxy `{}` through option map", type_name, proxy.remark);
        proxy.options = Some(options);
        Ok(proxy)
    }
}
