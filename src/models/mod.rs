//! Core data models
//!
//! The canonical proxy model every decoder produces and every encoder
//! consumes, plus the group, ruleset and option types around it.
//!
//! ```rust
//! use subcodec::models::{Proxy, ProxyKind, ProxyType, TrojanInfo};
//!
//! let proxy = Proxy::new(
//!     ProxyKind::Trojan(TrojanInfo {
//!         password: "secret".to_string(),
//!         ..Default::default()
//!     }),
//!     "",
//!     "example.com",
//!     443,
//! );
//! assert_eq!(proxy.proxy_type, ProxyType::Trojan);
//! assert_eq!(proxy.remark, "example.com:443");
//! ```

pub mod extra_settings;
pub mod proxy;
pub mod proxy_group_config;
pub mod regex_match_config;
pub mod ruleset;
pub mod subscription;

pub use extra_settings::ExtraSettings;
pub use proxy::*;
pub use proxy_group_config::{
    BalanceStrategy, ProxyGroupConfig, ProxyGroupConfigs, ProxyGroupType,
};
pub use regex_match_config::{RegexMatchConfig, RegexMatchConfigs};
pub use ruleset::{RuleSource, RulesetBody, RulesetConfig, RulesetContent, RulesetType};
pub use subscription::SubscriptionResult;
