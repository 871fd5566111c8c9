use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::models::{RuleSource, RulesetBody, RulesetConfig, RulesetContent};
use crate::utils::file::{read_file, resolve_path};
use crate::utils::http::{fetch_with_cache, FetchCache, FetchError, ProxyConfig};
use crate::utils::url::is_link;

#[derive(Debug, Error)]
pub enum RulesetError {
    #[error("ruleset not found: {0}")]
    NotFound(String),
    #[error("failed to read ruleset `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Where ruleset files are looked up and how remote ones are fetched
#[derive(Clone, Default)]
pub struct RulesetFetcher<'a> {
    pub base_path: &'a str,
    pub proxy: ProxyConfig,
    pub cache: Option<&'a dyn FetchCache>,
}

impl RulesetFetcher<'_> {
    /// Fetch ruleset content from a file or URL.
    ///
    /// Files are searched as given, then under `base_path`, then under
    /// `base_path/rules`. Anything not found locally that looks like an
    /// http(s) link is downloaded.
    pub fn fetch(&self, location: &str) -> Result<String, RulesetError> {
        let base = Path::new(self.base_path);
        let rules = base.join("rules");
        if let Some(path) = resolve_path(location, &[base, rules.as_path()]) {
            return read_file(&path).map_err(|source| RulesetError::Io {
                path: path.display().to_string(),
                source,
            });
        }
        if is_link(location) {
            return Ok(fetch_with_cache(location, &self.proxy, self.cache)?);
        }
        Err(RulesetError::NotFound(location.to_string()))
    }
}

/// Resolves every configured ruleset into renderable content.
///
/// Inline rules pass through. A reference that cannot be fetched becomes
/// [`RulesetBody::Unavailable`] so the encoder can still emit a remote
/// reference for it.
pub fn refresh_rulesets(ruleset_list: &[RulesetConfig], fetcher: &RulesetFetcher) -> Vec<RulesetContent> {
    ruleset_list
        .iter()
        .map(|ruleset| {
            let body = match &ruleset.source {
                RuleSource::Inline(rule) => {
                    info!("Adding rule '{}' with group '{}'", rule, ruleset.group);
                    RulesetBody::Inline(rule.clone())
                }
                RuleSource::Reference { location, kind, interval } => {
                    info!("Updating ruleset url '{}' with group '{}'", location, ruleset.group);
                    match fetcher.fetch(location) {
                        Ok(text) => RulesetBody::Fetched { kind: *kind, text },
                        Err(err) => {
                            warn!("Ruleset '{}' unavailable, keeping a remote reference: {}", location, err);
                            RulesetBody::Unavailable {
                                location: location.clone(),
                                kind: *kind,
                                interval: *interval,
                            }
                        }
                    }
                }
            };
            RulesetContent {
                group: ruleset.group.clone(),
                body,
            }
        })
        .collect()
}
