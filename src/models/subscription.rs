use super::{Proxy, ProxyGroupConfig};

/// Everything one decode produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionResult {
    pub proxies: Vec<Proxy>,
    pub groups: Vec<ProxyGroupConfig>,
    pub raw_rules: Vec<String>,
}

impl SubscriptionResult {
    pub fn from_proxies(proxies: Vec<Proxy>) -> Self {
        SubscriptionResult {
            proxies,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty() && self.groups.is_empty() && self.raw_rules.is_empty()
    }

    /// Appends another source's result, keeping source order
    pub fn extend(&mut self, other: SubscriptionResult) {
        self.proxies.extend(other.proxies);
        self.groups.extend(other.groups);
        self.raw_rules.extend(other.raw_rules);
    }
}
