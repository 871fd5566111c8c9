use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, Proxy, StatusCode};
use thiserror::Error;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT: u64 = 15;

/// User agent sent with every fetch
pub const USER_AGENT: &str = "subcodec";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    #[error("HTTP error {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("failed to create runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    pub proxy: Option<String>,
}

/// Interprets a proxy setting: `NONE`, `SYSTEM` or an explicit proxy URL.
pub fn parse_proxy(proxy_str: &str) -> ProxyConfig {
    match proxy_str {
        "" | "NONE" => ProxyConfig { proxy: None },
        "SYSTEM" => ProxyConfig {
            proxy: system_proxy(),
        },
        other => ProxyConfig {
            proxy: Some(other.to_string()),
        },
    }
}

fn system_proxy() -> Option<String> {
    ["https_proxy", "HTTPS_PROXY", "http_proxy", "HTTP_PROXY", "all_proxy", "ALL_PROXY"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

/// Cache collaborator consulted around every fetch.
///
/// `fresh` answers before the network is touched; `stale` is only asked after
/// a fetch failed, and only when the implementation allows stale reads.
pub trait FetchCache: Send + Sync {
    fn fresh(&self, url: &str) -> Option<String>;
    fn stale(&self, url: &str) -> Option<String>;
    fn store(&self, url: &str, content: &str);
}

/// Makes an HTTP GET request to the specified URL
///
/// # Arguments
/// * `url` - The URL to request
/// * `proxy_config` - Upstream proxy to use, if any
///
/// # Returns
/// * `Ok(String)` - The response body
/// * `Err(FetchError)` - When the request failed or returned a non-200 status
pub async fn web_get_async(url: &str, proxy_config: &ProxyConfig) -> Result<String, FetchError> {
    let mut client_builder = Client::builder()
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT))
        .user_agent(USER_AGENT);

    if let Some(proxy) = proxy_config.proxy.as_deref().filter(|p| !p.is_empty()) {
        let proxy = Proxy::all(proxy).map_err(|e| FetchError::Client(e.to_string()))?;
        client_builder = client_builder.proxy(proxy);
    }

    let client = client_builder
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if response.status() != StatusCode::OK {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }

    response.text().await.map_err(|e| FetchError::Request {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Blocking wrapper around [`web_get_async`] driven by a current-thread runtime
pub fn web_get(url: &str, proxy_config: &ProxyConfig) -> Result<String, FetchError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(web_get_async(url, proxy_config))
}

/// Fetches a URL, consulting the cache first and falling back to a stale entry on failure.
pub fn fetch_with_cache(
    url: &str,
    proxy_config: &ProxyConfig,
    cache: Option<&dyn FetchCache>,
) -> Result<String, FetchError> {
    if let Some(content) = cache.and_then(|c| c.fresh(url)) {
        debug!("Cache hit for {}", url);
        return Ok(content);
    }
    match web_get(url, proxy_config) {
        Ok(content) => {
            if let Some(cache) = cache {
                cache.store(url, &content);
            }
            Ok(content)
        }
        Err(err) => match cache.and_then(|c| c.stale(url)) {
            Some(content) => {
                warn!("Fetch of {} failed ({}), using stale cached copy", url, err);
                Ok(content)
            }
            None => Err(err),
        },
    }
}
