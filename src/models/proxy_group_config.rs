/// Type of proxy group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyGroupType {
    Select,
    URLTest,
    Fallback,
    LoadBalance,
    Relay,
    SSID,
    Smart,
}

impl ProxyGroupType {
    /// Get string representation of the proxy group type
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyGroupType::Select => "select",
            ProxyGroupType::URLTest => "url-test",
            ProxyGroupType::LoadBalance => "load-balance",
            ProxyGroupType::Fallback => "fallback",
            ProxyGroupType::Relay => "relay",
            ProxyGroupType::SSID => "ssid",
            ProxyGroupType::Smart => "smart",
        }
    }

    pub fn from_str(s: &str) -> Option<ProxyGroupType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "select" => Some(ProxyGroupType::Select),
            "url-test" => Some(ProxyGroupType::URLTest),
            "fallback" => Some(ProxyGroupType::Fallback),
            "load-balance" => Some(ProxyGroupType::LoadBalance),
            "relay" => Some(ProxyGroupType::Relay),
            "ssid" => Some(ProxyGroupType::SSID),
            "smart" => Some(ProxyGroupType::Smart),
            _ => None,
        }
    }

    /// Whether the group health-checks its members and so carries url/interval tuning
    pub fn is_probing(&self) -> bool {
        matches!(
            self,
            ProxyGroupType::URLTest
                | ProxyGroupType::Fallback
                | ProxyGroupType::LoadBalance
                | ProxyGroupType::Smart
        )
    }
}

/// Load balancing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStrategy {
    ConsistentHashing,
    RoundRobin,
}

impl BalanceStrategy {
    /// Get string representation of the balance strategy
    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceStrategy::ConsistentHashing => "consistent-hashing",
            BalanceStrategy::RoundRobin => "round-robin",
        }
    }

    pub fn from_str(s: &str) -> Option<BalanceStrategy> {
        match s.trim() {
            "consistent-hashing" => Some(BalanceStrategy::ConsistentHashing),
            "round-robin" => Some(BalanceStrategy::RoundRobin),
            _ => None,
        }
    }
}

pub const DEFAULT_TEST_URL: &str = "http://www.gstatic.com/generate_204";
pub const DEFAULT_TEST_INTERVAL: u32 = 300;

/// Configuration for a client-side proxy group
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyGroupConfig {
    /// Name of the proxy group
    pub name: String,
    /// Type of the proxy group
    pub group_type: ProxyGroupType,
    /// Matcher rules selecting members, in order
    pub proxies: Vec<String>,
    /// URL for testing
    pub url: String,
    /// Interval in seconds between tests
    pub interval: u32,
    /// Timeout in seconds for tests
    pub timeout: u32,
    /// Tolerance value for tests
    pub tolerance: u32,
    /// Strategy for load balancing
    pub strategy: Option<BalanceStrategy>,
    /// Whether to use lazy loading
    pub lazy: Option<bool>,
    /// Whether to disable UDP support
    pub disable_udp: Option<bool>,
}

impl Default for ProxyGroupConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            group_type: ProxyGroupType::Select,
            proxies: Vec::new(),
            url: String::new(),
            interval: 0,
            timeout: 0,
            tolerance: 0,
            strategy: None,
            lazy: None,
            disable_udp: None,
        }
    }
}

impl ProxyGroupConfig {
    /// Create a new proxy group config
    pub fn new(name: &str, group_type: ProxyGroupType) -> Self {
        let mut group = Self {
            name: name.to_string(),
            group_type,
            ..Default::default()
        };
        if group_type.is_probing() {
            group.url = DEFAULT_TEST_URL.to_string();
            group.interval = DEFAULT_TEST_INTERVAL;
        }
        group
    }

    /// Get string representation of the group type
    pub fn type_str(&self) -> &'static str {
        self.group_type.as_str()
    }

    /// Parses the backtick form `name`type`rule`...[`url`interval[,timeout][,tolerance]]`.
    ///
    /// Returns `None` when the line has no name or an unknown type, or when a
    /// probing group lacks its url and interval fields.
    pub fn from_ini(line: &str) -> Option<ProxyGroupConfig> {
        let parts: Vec<&str> = line.split('`').collect();
        if parts.len() < 3 || parts[0].trim().is_empty() {
            return None;
        }
        let group_type = ProxyGroupType::from_str(parts[1])?;
        let mut group = ProxyGroupConfig::new(parts[0].trim(), group_type);

        let rules_end = if group_type.is_probing() {
            if parts.len() < 5 {
                return None;
            }
            group.url = parts[parts.len() - 2].trim().to_string();
            let mut tuning = parts[parts.len() - 1].split(',').map(str::trim);
            group.interval = tuning
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TEST_INTERVAL);
            group.timeout = tuning.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            group.tolerance = tuning.next().and_then(|s| s.parse().ok()).unwrap_or(0);
            parts.len() - 2
        } else {
            parts.len()
        };

        group.proxies = parts[2..rules_end]
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Some(group)
    }
}

/// A collection of proxy group configurations
pub type ProxyGroupConfigs = Vec<ProxyGroupConfig>;
