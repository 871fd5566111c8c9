//! Proxy model definitions
//!
//! A [`Proxy`] carries the fields every protocol shares plus a [`ProxyKind`]
//! payload with the protocol-specific part. Encoders dispatch on the payload
//! and check [`Capabilities`] before rendering.

use bitflags::bitflags;
use linked_hash_map::LinkedHashMap;
use serde_json::{Map, Value};

/// Opaque option bag attached by a validator
pub type OptionsBag = Map<String, Value>;

/// Represents the protocol tag of a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    Shadowsocks,
    ShadowsocksR,
    VMess,
    Vless,
    Trojan,
    Hysteria,
    Hysteria2,
    Tuic,
    AnyTls,
    Http,
    Socks5,
    Snell,
    WireGuard,
    Unknown,
}

impl ProxyType {
    /// Lowercase protocol tag, as used by share-link schemes and the `!!TYPE=` matcher
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyType::Shadowsocks => "ss",
            ProxyType::ShadowsocksR => "ssr",
            ProxyType::VMess => "vmess",
            ProxyType::Vless => "vless",
            ProxyType::Trojan => "trojan",
            ProxyType::Hysteria => "hysteria",
            ProxyType::Hysteria2 => "hysteria2",
            ProxyType::Tuic => "tuic",
            ProxyType::AnyTls => "anytls",
            ProxyType::Http => "http",
            ProxyType::Socks5 => "socks5",
            ProxyType::Snell => "snell",
            ProxyType::WireGuard => "wireguard",
            ProxyType::Unknown => "",
        }
    }

    /// Source group assigned when a decoder finds none in its input
    pub fn default_group(&self) -> &'static str {
        match self {
            ProxyType::Shadowsocks => "SSProvider",
            ProxyType::ShadowsocksR => "SSRProvider",
            ProxyType::VMess => "V2RayProvider",
            ProxyType::Vless => "VLESSProvider",
            ProxyType::Trojan => "TrojanProvider",
            ProxyType::Hysteria => "HysteriaProvider",
            ProxyType::Hysteria2 => "Hysteria2Provider",
            ProxyType::Tuic => "TUICProvider",
            ProxyType::AnyTls => "AnyTLSProvider",
            ProxyType::Http => "HTTPProvider",
            ProxyType::Socks5 => "SocksProvider",
            ProxyType::Snell => "SnellProvider",
            ProxyType::WireGuard => "WireGuardProvider",
            ProxyType::Unknown => "",
        }
    }

    /// Parses a protocol tag as written in Clash `type:` fields
    pub fn from_tag(tag: &str) -> ProxyType {
        match tag.trim().to_ascii_lowercase().as_str() {
            "ss" | "shadowsocks" => ProxyType::Shadowsocks,
            "ssr" | "shadowsocksr" => ProxyType::ShadowsocksR,
            "vmess" => ProxyType::VMess,
            "vless" => ProxyType::Vless,
            "trojan" => ProxyType::Trojan,
            "hysteria" => ProxyType::Hysteria,
            "hysteria2" | "hy2" => ProxyType::Hysteria2,
            "tuic" => ProxyType::Tuic,
            "anytls" => ProxyType::AnyTls,
            "http" | "https" => ProxyType::Http,
            "socks5" | "socks" | "socks5-tls" => ProxyType::Socks5,
            "snell" => ProxyType::Snell,
            "wireguard" | "wg" => ProxyType::WireGuard,
            _ => ProxyType::Unknown,
        }
    }
}

bitflags! {
    /// Targets a proxy variant knows how to render itself into.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        const SHARE_LINK = 1;
        const CLASH = 1 << 1;
        const SURGE = 1 << 2;
        const LOON = 1 << 3;
        const QUANX = 1 << 4;
        const SINGBOX = 1 << 5;
    }
}

/// Transport settings shared by VMess, VLESS and Trojan.
///
/// `host` and `path` are interpreted per network: for `grpc` the path is the
/// service name, for `quic` the host is the quic security and the path the key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportInfo {
    pub network: String,
    pub host: String,
    pub path: String,
    /// Header obfuscation type, `none` or `http` for tcp
    pub header_type: String,
}

impl TransportInfo {
    pub fn network_or_tcp(&self) -> &str {
        if self.network.is_empty() {
            "tcp"
        } else {
            &self.network
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowsocksInfo {
    pub method: String,
    pub password: String,
    pub plugin: String,
    pub plugin_opts: LinkedHashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShadowsocksRInfo {
    pub method: String,
    pub password: String,
    pub protocol: String,
    pub protocol_param: String,
    pub obfs: String,
    pub obfs_param: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VMessInfo {
    pub uuid: String,
    pub alter_id: u16,
    pub cipher: String,
    pub transport: TransportInfo,
    pub tls: bool,
    pub sni: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealityInfo {
    pub public_key: String,
    pub short_id: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VlessInfo {
    pub uuid: String,
    pub flow: String,
    pub transport: TransportInfo,
    pub tls: bool,
    pub sni: String,
    pub fingerprint: String,
    pub reality: Option<RealityInfo>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrojanInfo {
    pub password: String,
    pub transport: TransportInfo,
    pub sni: String,
}

/// Hysteria v1 and v2 share this payload; the proxy type tells them apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HysteriaInfo {
    /// v2 password, or v1 auth string
    pub password: String,
    pub obfs: String,
    pub obfs_password: String,
    pub sni: String,
    pub alpn: Vec<String>,
    /// Bandwidth hints in Mbps as written in the source
    pub up: String,
    pub down: String,
    /// Query parameters not promoted to fields above
    pub params: LinkedHashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TuicInfo {
    pub uuid: String,
    pub password: String,
    pub sni: String,
    pub alpn: Vec<String>,
    pub congestion_control: String,
    pub udp_relay_mode: String,
    pub params: LinkedHashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnyTlsInfo {
    pub password: String,
    pub sni: String,
    pub alpn: Vec<String>,
    pub fingerprint: String,
    pub idle_session_check_interval: u32,
    pub idle_session_timeout: u32,
    pub min_idle_session: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpInfo {
    pub username: String,
    pub password: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Socks5Info {
    pub username: String,
    pub password: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnellInfo {
    pub psk: String,
    pub obfs: String,
    pub obfs_host: String,
    pub version: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireGuardInfo {
    pub private_key: String,
    pub public_key: String,
    pub preshared_key: String,
    pub self_ip: String,
    pub self_ipv6: String,
    pub dns: Vec<String>,
    pub mtu: u16,
    pub allowed_ips: Vec<String>,
    pub keepalive: u16,
}

/// Protocol-specific payload. One case per protocol family.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyKind {
    Shadowsocks(ShadowsocksInfo),
    ShadowsocksR(ShadowsocksRInfo),
    VMess(VMessInfo),
    Vless(VlessInfo),
    Trojan(TrojanInfo),
    Hysteria(HysteriaInfo),
    Tuic(TuicInfo),
    AnyTls(AnyTlsInfo),
    Http(HttpInfo),
    Socks5(Socks5Info),
    Snell(SnellInfo),
    WireGuard(WireGuardInfo),
    /// A protocol without a native payload; only the validator's option bag describes it
    Opaque { type_name: String },
}

impl ProxyKind {
    /// Proxy type implied by the payload. Hysteria defaults to v1.
    pub fn default_type(&self) -> ProxyType {
        match self {
            ProxyKind::Shadowsocks(_) => ProxyType::Shadowsocks,
            ProxyKind::ShadowsocksR(_) => ProxyType::ShadowsocksR,
            ProxyKind::VMess(_) => ProxyType::VMess,
            ProxyKind::Vless(_) => ProxyType::Vless,
            ProxyKind::Trojan(_) => ProxyType::Trojan,
            ProxyKind::Hysteria(_) => ProxyType::Hysteria,
            ProxyKind::Tuic(_) => ProxyType::Tuic,
            ProxyKind::AnyTls(_) => ProxyType::AnyTls,
            ProxyKind::Http(_) => ProxyType::Http,
            ProxyKind::Socks5(_) => ProxyType::Socks5,
            ProxyKind::Snell(_) => ProxyType::Snell,
            ProxyKind::WireGuard(_) => ProxyType::WireGuard,
            ProxyKind::Opaque { .. } => ProxyType::Unknown,
        }
    }

    /// Static renderer table. Encoders may still refuse a specific
    /// combination at render time (e.g. VMess for Surge 3).
    pub fn capabilities(&self) -> Capabilities {
        use Capabilities as C;
        match self {
            ProxyKind::Shadowsocks(_)
            | ProxyKind::ShadowsocksR(_)
            | ProxyKind::VMess(_)
            | ProxyKind::Trojan(_)
            | ProxyKind::Http(_)
            | ProxyKind::Socks5(_) => C::all(),
            ProxyKind::Vless(_) => C::SHARE_LINK | C::CLASH | C::LOON | C::SINGBOX,
            ProxyKind::Hysteria(_) => C::SHARE_LINK | C::CLASH | C::SURGE | C::LOON | C::SINGBOX,
            ProxyKind::Tuic(_) | ProxyKind::AnyTls(_) => C::SHARE_LINK | C::CLASH | C::SINGBOX,
            ProxyKind::Snell(_) => C::SHARE_LINK | C::CLASH | C::SURGE,
            ProxyKind::WireGuard(_) => C::CLASH | C::LOON | C::SINGBOX,
            ProxyKind::Opaque { .. } => C::empty(),
        }
    }
}

/// Represents a proxy configuration.
///
/// Invariant for decoded instances: `hostname` is non-empty and `port` is
/// in `1..=65535`.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    pub proxy_type: ProxyType,
    pub remark: String,
    pub hostname: String,
    pub port: u16,
    /// Subscription-source label, not a client proxy group
    pub group: String,
    /// Ordinal of the originating source
    pub group_id: i32,

    pub udp: Option<bool>,
    pub tfo: Option<bool>,
    pub skip_cert_verify: Option<bool>,
    pub tls13: Option<bool>,

    pub kind: ProxyKind,
    /// Upstream-normalized options from the validator, preferred when rendering Clash
    pub options: Option<OptionsBag>,
}

impl Proxy {
    /// Creates a proxy with the type implied by `kind` and its default group.
    /// An empty remark becomes `server:port`.
    pub fn new(kind: ProxyKind, remark: &str, hostname: &str, port: u16) -> Self {
        let proxy_type = kind.default_type();
        let remark = if remark.is_empty() {
            format!("{}:{}", hostname, port)
        } else {
            remark.to_string()
        };
        Proxy {
            proxy_type,
            remark,
            hostname: hostname.to_string(),
            port,
            group: proxy_type.default_group().to_string(),
            group_id: 0,
            udp: None,
            tfo: None,
            skip_cert_verify: None,
            tls13: None,
            kind,
            options: None,
        }
    }

    /// Overrides the proxy type, used where one payload serves two protocols
    pub fn with_type(mut self, proxy_type: ProxyType) -> Self {
        if self.group == self.proxy_type.default_group() {
            self.group = proxy_type.default_group().to_string();
        }
        self.proxy_type = proxy_type;
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        if !group.is_empty() {
            self.group = group.to_string();
        }
        self
    }

    /// Protocol tag used by matchers; opaque proxies report their bag's `type`
    pub fn type_name(&self) -> String {
        match &self.kind {
            ProxyKind::Opaque { type_name } => type_name.to_ascii_lowercase(),
            _ => self.proxy_type.as_str().to_string(),
        }
    }

    /// Capabilities of the payload, widened to Clash when an option bag is attached
    pub fn capabilities(&self) -> Capabilities {
        let caps = self.kind.capabilities();
        if self.options.is_some() {
            caps | Capabilities::CLASH
        } else {
            caps
        }
    }

    pub fn supports(&self, cap: Capabilities) -> bool {
        self.capabilities().contains(cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fills_remark_and_group() {
        let p = Proxy::new(
            ProxyKind::Trojan(TrojanInfo::default()),
            "",
            "example.com",
            443,
        );
        assert_eq!(p.remark, "example.com:443");
        assert_eq!(p.group, "TrojanProvider");
        assert_eq!(p.type_name(), "trojan");
    }

    #[test]
    fn test_with_type_moves_default_group() {
        let p = Proxy::new(ProxyKind::Hysteria(HysteriaInfo::default()), "h", "a.com", 443)
            .with_type(ProxyType::Hysteria2);
        assert_eq!(p.proxy_type, ProxyType::Hysteria2);
        assert_eq!(p.group, "Hysteria2Provider");

        let p = Proxy::new(ProxyKind::Hysteria(HysteriaInfo::default()), "h", "a.com", 443)
            .with_group("Airport")
            .with_type(ProxyType::Hysteria2);
        assert_eq!(p.group, "Airport");
    }

    #[test]
    fn test_opaque_capabilities_come_from_bag() {
        let mut p = Proxy::new(
            ProxyKind::Opaque {
                type_name: "Mieru".to_string(),
            },
            "m",
            "a.com",
            1,
        );
        assert!(!p.supports(Capabilities::CLASH));
        p.options = Some(OptionsBag::new());
        assert!(p.supports(Capabilities::CLASH));
        assert!(!p.supports(Capabilities::SURGE));
        assert_eq!(p.type_name(), "mieru");
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(ProxyType::from_tag("SS"), ProxyType::Shadowsocks);
        assert_eq!(ProxyType::from_tag("hy2"), ProxyType::Hysteria2);
        assert_eq!(ProxyType::from_tag("mieru"), ProxyType::Unknown);
    }
}
