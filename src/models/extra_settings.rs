/// Options every target encoder receives
#[derive(Debug, Clone)]
pub struct ExtraSettings {
    /// Whether to render ruleset rules at all
    pub enable_rule_generator: bool,
    /// UDP support flag
    pub udp: Option<bool>,
    /// TCP Fast Open support flag
    pub tfo: Option<bool>,
    /// Skip certificate verification flag
    pub skip_cert_verify: Option<bool>,
    /// TLS 1.3 support flag
    pub tls13: Option<bool>,
    /// Surge major version being targeted
    pub surge_ver: i32,
    /// Path to the local ShadowsocksR binary Surge launches as an external proxy
    pub surge_ssr_path: String,
    /// Local port the external ShadowsocksR process listens on
    pub surge_ssr_local_port: u16,
    /// Resolve the server name for the external proxy's `addresses=`
    pub surge_resolve_hostname: bool,
    /// Set `experimental.clash_api.default_mode` in sing-box output
    pub singbox_add_clash_mode: bool,
    /// Leave out Clash proxies using ciphers or SSR options Clash dropped
    pub filter_deprecated: bool,
}

impl Default for ExtraSettings {
    fn default() -> Self {
        ExtraSettings {
            enable_rule_generator: true,
            udp: None,
            tfo: None,
            skip_cert_verify: None,
            tls13: None,
            surge_ver: 4,
            surge_ssr_path: String::new(),
            surge_ssr_local_port: 1080,
            surge_resolve_hostname: false,
            singbox_add_clash_mode: true,
            filter_deprecated: false,
        }
    }
}

impl ExtraSettings {
    /// Resolves a per-proxy tri-state against the global default
    pub fn resolve(node_flag: Option<bool>, global: Option<bool>) -> Option<bool> {
        node_flag.or(global)
    }
}
