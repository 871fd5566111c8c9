//! Subscription container decoders.
//!
//! [`detect_format`] checks the document for fixed content signatures in a
//! fixed priority order; [`explode_conf_content`] decodes it with the matching
//! container decoder. Every container yields a [`SubscriptionResult`].

pub mod clash;
pub mod single;
pub mod ssd;
pub mod surge;
pub mod vendor;

use log::debug;

use super::error::{ParseError, ParseResult};
use super::registry::Registry;
use crate::models::SubscriptionResult;

/// Container formats, in detection order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFormat {
    SsJson,
    SsrJson,
    V2RayJson,
    SsAndroidJson,
    SsTapJson,
    NetchJson,
    Ssd,
    Clash,
    Surge,
    Single,
}

impl SubFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubFormat::SsJson => "ss-json",
            SubFormat::SsrJson => "ssr-json",
            SubFormat::V2RayJson => "v2ray-json",
            SubFormat::SsAndroidJson => "ssandroid-json",
            SubFormat::SsTapJson => "sstap-json",
            SubFormat::NetchJson => "netch-json",
            SubFormat::Ssd => "ssd",
            SubFormat::Clash => "clash",
            SubFormat::Surge => "surge",
            SubFormat::Single => "single",
        }
    }
}

/// Classifies a subscription body by content signature
pub fn detect_format(content: &str) -> SubFormat {
    let has = |needle: &str| content.contains(needle);

    if has("\"version\"") {
        SubFormat::SsJson
    } else if has("\"serverSubscribes\"") || (has("\"local_address\"") && has("\"local_port\"")) {
        SubFormat::SsrJson
    } else if has("\"uiItem\"") || has("\"vnext\"") {
        SubFormat::V2RayJson
    } else if has("\"proxy_apps\"") || (has("\"server\"") && has("\"server_port\"") && has("\"method\"")) {
        SubFormat::SsAndroidJson
    } else if has("\"idInUse\"") {
        SubFormat::SsTapJson
    } else if has("\"ModeFileNameType\"") {
        SubFormat::NetchJson
    } else if content.trim_start().starts_with("ssd://") {
        SubFormat::Ssd
    } else if has("proxies:") || has("Proxy:") {
        SubFormat::Clash
    } else if surge::is_surge(content) {
        SubFormat::Surge
    } else {
        SubFormat::Single
    }
}

/// Decodes a whole subscription document.
///
/// Fails with [`ParseError::Empty`] when the container yields no proxy.
pub fn explode_conf_content(content: &str, registry: &Registry) -> ParseResult<SubscriptionResult> {
    let content = content.trim_start_matches('\u{feff}').trim();
    if content.is_empty() {
        return Err(ParseError::Empty);
    }

    let format = detect_format(content);
    debug!("subscription detected as {}", format.as_str());
    let result = match format {
        SubFormat::SsJson => vendor::explode_ss_json(content, registry)?,
        SubFormat::SsrJson => vendor::explode_ssr_json(content, registry)?,
        SubFormat::V2RayJson => vendor::explode_v2ray_json(content, registry)?,
        SubFormat::SsAndroidJson => vendor::explode_ssandroid_json(content, registry)?,
        SubFormat::SsTapJson => vendor::explode_sstap_json(content, registry)?,
        SubFormat::NetchJson => vendor::explode_netch_json(content, registry)?,
        SubFormat::Ssd => ssd::explode_ssd(content, registry)?,
        SubFormat::Clash => clash::explode_clash(content, registry)?,
        SubFormat::Surge => surge::explode_surge(content, registry)?,
        SubFormat::Single => single::explode_sub(content, registry)?,
    };

    if result.proxies.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(result)
}
