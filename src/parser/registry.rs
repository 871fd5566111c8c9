//! Share-link dispatch by scheme prefix.
//!
//! The built-in table is static; [`Registry::register`] puts extra decoders in
//! front of it. A registry is built once and shared by reference.

use std::sync::Arc;

use log::debug;
use once_cell::sync::Lazy;

use super::error::{ParseError, ParseResult};
use super::explodes::{anytls, http, hysteria, snell, socks, ss, ssr, trojan, tuic, vless, vmess, wireguard};
use super::validator::{BuiltinValidator, Validated, Validator};
use crate::models::{OptionsBag, Proxy};
use crate::utils::string::starts_with_ignore_case;

pub type LinkDecoder = fn(&str) -> ParseResult<Proxy>;

/// Longer prefixes sharing a stem come first
const BUILTIN_DECODERS: &[(&str, LinkDecoder)] = &[
    ("vmess1://", vmess::explode_vmess1),
    ("vmess://", vmess::explode_vmess),
    ("ssr://", ssr::explode_ssr),
    ("ss://", ss::explode_ss),
    ("vless://", vless::explode_vless),
    ("trojan://", trojan::explode_trojan),
    ("hysteria2://", hysteria::explode_hysteria),
    ("hy2://", hysteria::explode_hysteria),
    ("hysteria://", hysteria::explode_hysteria),
    ("tuic://", tuic::explode_tuic),
    ("anytls://", anytls::explode_anytls),
    ("snell://", snell::explode_snell),
    ("wireguard://", wireguard::explode_wireguard),
    ("wg://", wireguard::explode_wireguard),
    ("tg://socks", socks::explode_socks_telegram),
    ("https://t.me/socks", socks::explode_socks_telegram),
    ("tg://http", http::explode_http_telegram),
    ("https://t.me/http", http::explode_http_telegram),
    ("socks5://", socks::explode_socks),
    ("socks://", socks::explode_socks),
    ("https://", http::explode_http),
    ("http://", http::explode_http),
];

static BUILTIN: Lazy<Registry> = Lazy::new(Registry::default);

/// The process-wide default: built-in decoders plus [`BuiltinValidator`]
pub fn default_registry() -> &'static Registry {
    &BUILTIN
}

#[derive(Clone)]
pub struct Registry {
    extra: Vec<(String, LinkDecoder)>,
    builtin: bool,
    validator: Option<Arc<dyn Validator>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("extra", &self.extra.iter().map(|(p, _)| p).collect::<Vec<_>>())
            .field("builtin", &self.builtin)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

impl Registry {
    /// A registry with no decoders and no validator
    pub fn empty() -> Self {
        Registry {
            extra: Vec::new(),
            builtin: false,
            validator: None,
        }
    }

    /// The built-in decoder table without a validator
    pub fn builtin() -> Self {
        Registry {
            builtin: true,
            ..Registry::empty()
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Adds a decoder ahead of every existing entry
    pub fn register(&mut self, prefix: &str, decoder: LinkDecoder) {
        self.extra.insert(0, (prefix.to_string(), decoder));
    }

    pub fn validator(&self) -> Option<&dyn Validator> {
        self.validator.as_deref()
    }

    /// Finds the decoder claiming `link` by its prefix
    pub fn decoder_for(&self, link: &str) -> Option<LinkDecoder> {
        let custom = self
            .extra
            .iter()
            .find(|(prefix, _)| starts_with_ignore_case(link, prefix))
            .map(|(_, decoder)| *decoder);
        if custom.is_some() || !self.builtin {
            return custom;
        }
        BUILTIN_DECODERS
            .iter()
            .find(|(prefix, _)| starts_with_ignore_case(link, prefix))
            .map(|(_, decoder)| *decoder)
    }

    /// Decodes one share-link.
    ///
    /// A native decoder is tried first; when it is missing or fails, the
    /// validator's option-map fallback gets a chance. The native error wins
    /// when both fail.
    pub fn decode_link(&self, link: &str) -> ParseResult<Validated> {
        let link = link.trim();
        let native = match self.decoder_for(link) {
            Some(decoder) => decoder(link),
            None => Err(ParseError::UnsupportedScheme(link.chars().take(32).collect())),
        };
        match native {
            Ok(proxy) => Ok(self.validate(proxy)),
            Err(err) => match self.validator.as_ref().and_then(|v| v.decode_fallback(link)) {
                Some(Ok(proxy)) => Ok(Validated { proxy, issue: None }),
                Some(Err(issue)) => {
                    debug!("fallback rejected line: {}", issue);
                    Err(err)
                }
                None => Err(err),
            },
        }
    }

    /// Runs the validator over a natively decoded proxy, attaching its option bag
    pub fn validate(&self, mut proxy: Proxy) -> Validated {
        let Some(validator) = self.validator.as_ref() else {
            return Validated { proxy, issue: None };
        };
        match validator.validate(&proxy) {
            Ok(bag) => {
                if bag.is_some() {
                    proxy.options = bag;
                }
                Validated { proxy, issue: None }
            }
            Err(issue) => {
                debug!("validator rejected `{}`: {}", proxy.remark, issue);
                Validated {
                    proxy,
                    issue: Some(issue),
                }
            }
        }
    }

    /// Builds a proxy from a Clash option map whose `type` has no native builder
    pub fn from_options(&self, options: OptionsBag) -> ParseResult<Proxy> {
        let validator = self
            .validator
            .as_ref()
            .ok_or_else(|| ParseError::UnsupportedScheme(options.get("type").map(|t| t.to_string()).unwrap_or_default()))?;
        validator
            .from_options(options)
            .map_err(|issue| ParseError::MissingField(issue.reason))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::builtin().with_validator(Arc::new(BuiltinValidator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProxyKind, ProxyType, Socks5Info, TrojanInfo};

    fn fixed(_: &str) -> ParseResult<Proxy> {
        Ok(Proxy::new(ProxyKind::Socks5(Socks5Info::default()), "custom", "c.example.com", 1))
    }

    #[test]
    fn test_prefix_dispatch_prefers_specific_entries() {
        let registry = default_registry();
        let tg = registry
            .decode_link("https://t.me/socks?server=1.2.3.4&port=1080")
            .unwrap()
            .proxy;
        assert_eq!(tg.proxy_type, ProxyType::Socks5);

        let https = registry.decode_link("https://u:p@h.example.com:8443").unwrap().proxy;
        assert_eq!(https.proxy_type, ProxyType::Http);

        let hy2 = registry.decode_link("HY2://pw@h.example.com:443").unwrap().proxy;
        assert_eq!(hy2.proxy_type, ProxyType::Hysteria2);
    }

    #[test]
    fn test_register_takes_precedence() {
        let mut registry = Registry::builtin();
        registry.register("ss://", fixed);
        let proxy = registry.decode_link("ss://anything").unwrap().proxy;
        assert_eq!(proxy.remark, "custom");
    }

    #[test]
    fn test_unvalidated_proxy_is_kept() {
        let proxy = Proxy::new(ProxyKind::Trojan(TrojanInfo::default()), "t", "a.com", 443);
        let validated = default_registry().validate(proxy.clone());
        assert!(!validated.is_validated());
        assert_eq!(validated.proxy, proxy);
    }

    #[test]
    fn test_unknown_scheme_falls_back_or_fails() {
        let registry = default_registry();
        let opaque = registry
            .decode_link("juicity://{name: j, server: j.example.com, port: 443}")
            .unwrap()
            .proxy;
        assert_eq!(opaque.type_name(), "juicity");
        assert!(opaque.options.is_some());

        assert!(Registry::builtin().decode_link("juicity://{server: j.example.com, port: 443}").is_err());
        assert!(registry.decode_link("not a link").is_err());
    }
}
