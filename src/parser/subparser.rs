use log::{info, warn};
use thiserror::Error;

use crate::models::SubscriptionResult;
use crate::parser::error::ParseError;
use crate::parser::node_manip::filter_nodes;
use crate::parser::parse_settings::ParseSettings;
use crate::parser::subs::explode_conf_content;
use crate::parser::types::ConfType;
use crate::utils::file::{file_exists, read_file};
use crate::utils::http::{fetch_with_cache, FetchError};
use crate::utils::url::{get_url_arg, is_link, url_decode};

/// Why a source contributed nothing
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("cannot download subscription data: {0}")]
    Fetch(#[from] FetchError),
    #[error("cannot read `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("not authorized to read local file `{0}`")]
    NotAuthorized(String),
    #[error("invalid source `{link}`: {source}")]
    Parse {
        link: String,
        #[source]
        source: ParseError,
    },
}

/// Splits `tag:<name>,<rest>` into the forced group and the remaining link
fn split_tag(link: &str) -> (String, &str) {
    if let Some(rest) = link.strip_prefix("tag:") {
        if let Some((name, link)) = rest.split_once(',') {
            return (name.trim().to_string(), link.trim());
        }
    }
    (String::new(), link)
}

fn classify(link: &str) -> ConfType {
    if link.starts_with("tg://") || link.starts_with("https://t.me/") {
        ConfType::Link
    } else if is_link(link) || link.starts_with("surge:///install-config") {
        ConfType::Sub
    } else if file_exists(link) {
        ConfType::Local
    } else {
        ConfType::Link
    }
}

/// Reads one source: a share-link, a subscription URL or a local file.
///
/// `nullnode` yields an empty result. A `tag:<name>,` prefix forces the
/// source group of every proxy read. Every proxy is stamped with `group_id`
/// after the settings' exclude/include filter ran.
pub fn add_nodes(
    link: &str,
    group_id: i32,
    parse_settings: &ParseSettings,
) -> Result<SubscriptionResult, SourceError> {
    let cleaned = link.trim().replace('"', "");
    let (custom_group, link) = split_tag(&cleaned);

    if link == "nullnode" {
        return Ok(SubscriptionResult::default());
    }

    let registry = &parse_settings.registry;
    let parse_err = |source: ParseError| SourceError::Parse {
        link: link.to_string(),
        source,
    };

    let mut result = match classify(link) {
        ConfType::Sub => {
            let url = if link.starts_with("surge:///install-config") {
                let query = link.split_once('?').map_or("", |(_, q)| q);
                url_decode(&get_url_arg(query, "url"))
            } else {
                link.to_string()
            };
            info!("Downloading subscription data from {}", url);
            let content = fetch_with_cache(&url, &parse_settings.proxy, parse_settings.cache.as_deref())?;
            explode_conf_content(&content, registry).map_err(parse_err)?
        }
        ConfType::Local => {
            if !parse_settings.authorized {
                return Err(SourceError::NotAuthorized(link.to_string()));
            }
            let content = read_file(link).map_err(|source| SourceError::Io {
                path: link.to_string(),
                source,
            })?;
            explode_conf_content(&content, registry).map_err(parse_err)?
        }
        ConfType::Link => {
            let validated = registry.decode_link(link).map_err(parse_err)?;
            SubscriptionResult::from_proxies(vec![validated.proxy])
        }
    };

    filter_nodes(
        &mut result.proxies,
        &parse_settings.exclude_remarks,
        &parse_settings.include_remarks,
    );
    for node in &mut result.proxies {
        node.group_id = group_id;
        if !custom_group.is_empty() {
            node.group = custom_group.clone();
        }
    }
    Ok(result)
}

/// Reads every source in order, numbering them from zero.
///
/// A failing source is logged and contributes nothing; the others still count.
pub fn add_all_nodes(links: &[String], parse_settings: &ParseSettings) -> SubscriptionResult {
    let mut all = SubscriptionResult::default();
    for (idx, link) in links.iter().enumerate() {
        match add_nodes(link, idx as i32, parse_settings) {
            Ok(result) => {
                info!("Source {} contributed {} proxies", idx, result.proxies.len());
                all.extend(result);
            }
            Err(err) => warn!("Skipping source {}: {}", idx, err),
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProxyType;

    const SS_LINK: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#Test";

    #[test]
    fn test_nullnode_is_empty() {
        let result = add_nodes("nullnode", 3, &ParseSettings::default()).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_tag_forces_group_and_id() {
        let link = format!("tag:Airport,{}", SS_LINK);
        let result = add_nodes(&link, 2, &ParseSettings::default()).unwrap();
        let proxy = &result.proxies[0];
        assert_eq!(proxy.proxy_type, ProxyType::Shadowsocks);
        assert_eq!(proxy.group, "Airport");
        assert_eq!(proxy.group_id, 2);
    }

    #[test]
    fn test_local_file_needs_authorization() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub.txt");
        std::fs::write(&path, format!("{}\ntrojan://pw@t.example.com:443#T\n", SS_LINK)).unwrap();
        let path = path.to_string_lossy().to_string();

        let denied = add_nodes(&path, 0, &ParseSettings::default());
        assert!(matches!(denied, Err(SourceError::NotAuthorized(_))));

        let settings = ParseSettings {
            authorized: true,
            exclude_remarks: vec!["T".to_string()],
            include_remarks: vec![],
            ..Default::default()
        };
        // "Test" contains "T" as well, so both are excluded
        assert!(add_nodes(&path, 0, &settings).unwrap().proxies.is_empty());

        let settings = ParseSettings {
            authorized: true,
            include_remarks: vec!["/^T$/".to_string()],
            ..Default::default()
        };
        let result = add_nodes(&path, 1, &settings).unwrap();
        assert_eq!(result.proxies.len(), 1);
        assert_eq!(result.proxies[0].proxy_type, ProxyType::Trojan);
    }

    #[test]
    fn test_failed_source_contributes_nothing() {
        let links = vec![
            "http://127.0.0.1:9/unreachable".to_string(),
            SS_LINK.to_string(),
            "nonsense".to_string(),
        ];
        let all = add_all_nodes(&links, &ParseSettings::default());
        assert_eq!(all.proxies.len(), 1);
        assert_eq!(all.proxies[0].group_id, 1);
    }
}
