use std::sync::Arc;

use crate::parser::registry::{default_registry, Registry};
use crate::utils::http::{FetchCache, ProxyConfig};

/// Controls how [`add_nodes`](super::subparser::add_nodes) reads a source
#[derive(Clone)]
pub struct ParseSettings {
    /// Upstream proxy used for subscription downloads
    pub proxy: ProxyConfig,

    /// Remark patterns dropped from every source
    pub exclude_remarks: Vec<String>,

    /// Remark patterns a proxy must hit to be kept, when non-empty
    pub include_remarks: Vec<String>,

    /// Whether local file paths may be read as sources
    pub authorized: bool,

    /// Consulted before and after every subscription fetch
    pub cache: Option<Arc<dyn FetchCache>>,

    pub registry: Registry,
}

impl Default for ParseSettings {
    fn default() -> Self {
        ParseSettings {
            proxy: ProxyConfig::default(),
            exclude_remarks: Vec::new(),
            include_remarks: Vec::new(),
            authorized: false,
            cache: None,
            registry: default_registry().clone(),
        }
    }
}

impl std::fmt::Debug for ParseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseSettings")
            .field("proxy", &self.proxy)
            .field("exclude_remarks", &self.exclude_remarks)
            .field("include_remarks", &self.include_remarks)
            .field("authorized", &self.authorized)
            .field("cache", &self.cache.is_some())
            .field("registry", &self.registry)
            .finish()
    }
}
