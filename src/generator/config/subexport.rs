//! Target dispatch and the plumbing every encoder shares.
//!
//! Each encoder renders the proxies it can, records the rest as skipped
//! `(remark, reason)` pairs, computes group membership from the rendered
//! proxies only, and renders rules for its grammar.

use std::fmt;

use log::{debug, info};
use thiserror::Error;

use super::formats::{clash, loon, quanx, singbox, single, surge};
use super::remark::unique_remarks;
use crate::models::{Capabilities, ExtraSettings, Proxy, ProxyGroupConfig, RulesetContent};

/// Which share-links a single-link bundle carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleKind {
    Ss,
    Ssr,
    V2Ray,
    Trojan,
    Mixed,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Clash,
    Surge,
    Loon,
    QuanX,
    SingBox,
    Single(SingleKind),
}

impl Target {
    pub fn from_str(s: &str) -> Option<Target> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "clash" | "clashr" => Target::Clash,
            "surge" => Target::Surge,
            "loon" => Target::Loon,
            "quanx" | "quantumultx" => Target::QuanX,
            "singbox" | "sing-box" => Target::SingBox,
            "ss" | "sip002" => Target::Single(SingleKind::Ss),
            "ssr" => Target::Single(SingleKind::Ssr),
            "v2ray" | "vmess" => Target::Single(SingleKind::V2Ray),
            "trojan" => Target::Single(SingleKind::Trojan),
            "mixed" => Target::Single(SingleKind::Mixed),
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Clash => "clash",
            Target::Surge => "surge",
            Target::Loon => "loon",
            Target::QuanX => "quanx",
            Target::SingBox => "singbox",
            Target::Single(SingleKind::Ss) => "ss",
            Target::Single(SingleKind::Ssr) => "ssr",
            Target::Single(SingleKind::V2Ray) => "v2ray",
            Target::Single(SingleKind::Trojan) => "trojan",
            Target::Single(SingleKind::Mixed) => "mixed",
        }
    }

    /// Capability a proxy needs to appear in this target
    pub fn capability(&self) -> Capabilities {
        match self {
            Target::Clash => Capabilities::CLASH,
            Target::Surge => Capabilities::SURGE,
            Target::Loon => Capabilities::LOON,
            Target::QuanX => Capabilities::QUANX,
            Target::SingBox => Capabilities::SINGBOX,
            Target::Single(_) => Capabilities::SHARE_LINK,
        }
    }

    /// INI-style targets use commas as field separators
    fn proc_comma(&self) -> bool {
        matches!(self, Target::Surge | Target::Loon | Target::QuanX)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RenderError {
    #[error("{proxy_type} is not supported by {target}")]
    Unsupported { target: &'static str, proxy_type: String },
    #[error("{0}")]
    Invalid(String),
}

impl RenderError {
    pub(crate) fn unsupported(target: Target, node: &Proxy) -> Self {
        RenderError::Unsupported {
            target: target.as_str(),
            proxy_type: node.type_name(),
        }
    }
}

/// Everything an encoder reads
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub proxies: &'a [Proxy],
    pub groups: &'a [ProxyGroupConfig],
    pub raw_rules: &'a [String],
    pub rulesets: &'a [RulesetContent],
    /// Base document the generated sections are merged into
    pub base: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderOutput {
    pub text: String,
    /// `(remark, reason)` of every proxy left out
    pub skipped: Vec<(String, String)>,
}

/// Proxies an encoder managed to render, next to their rendered form
pub(crate) struct Rendered<T> {
    pub nodes: Vec<Proxy>,
    pub items: Vec<T>,
    pub skipped: Vec<(String, String)>,
}

/// Prepares remarks, checks capabilities and renders every proxy with `f`.
///
/// Proxies lacking the target capability, or for which `f` fails, are
/// skipped and logged.
pub(crate) fn render_each<T, F>(proxies: &[Proxy], target: Target, mut f: F) -> Rendered<T>
where
    F: FnMut(&Proxy) -> Result<T, RenderError>,
{
    let mut rendered = Rendered {
        nodes: Vec::new(),
        items: Vec::new(),
        skipped: Vec::new(),
    };
    for node in unique_remarks(proxies, target.proc_comma()) {
        let result = if node.supports(target.capability()) {
            f(&node)
        } else {
            Err(RenderError::unsupported(target, &node))
        };
        match result {
            Ok(item) => {
                rendered.items.push(item);
                rendered.nodes.push(node);
            }
            Err(err) => {
                debug!("Skipping proxy '{}' for {}: {}", node.remark, target, err);
                rendered.skipped.push((node.remark.clone(), err.to_string()));
            }
        }
    }
    rendered
}

/// Resolves a per-proxy flag against the global default, rendered as `key=value`
pub(crate) fn flag_pair(key: &str, node_flag: Option<bool>, global: Option<bool>) -> Option<String> {
    ExtraSettings::resolve(node_flag, global).map(|v| format!("{}={}", key, v))
}

/// Drops the named `[section]`s from an INI base document, keeping everything else verbatim
pub(crate) fn strip_sections(base: &str, names: &[&str]) -> String {
    let mut out = String::new();
    let mut dropping = false;
    for line in base.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            if let Some(end) = trimmed.find(']') {
                let name = trimmed[1..end].trim();
                dropping = names.iter().any(|n| n.eq_ignore_ascii_case(name));
            }
        }
        if !dropping {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Appends `[name]` and its lines
pub(crate) fn write_section(out: &mut String, name: &str, lines: &[String]) {
    if !out.is_empty() && !out.ends_with("\n\n") {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push('[');
    out.push_str(name);
    out.push_str("]\n");
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
}

/// Renders the proxies, groups and rules for `target`
pub fn render(target: Target, input: &RenderInput, ext: &ExtraSettings) -> Result<RenderOutput, RenderError> {
    info!("Rendering {} proxies for {}", input.proxies.len(), target);
    let output = match target {
        Target::Clash => clash::proxy_to_clash(input, ext)?,
        Target::Surge => surge::proxy_to_surge(input, ext),
        Target::Loon => loon::proxy_to_loon(input, ext),
        Target::QuanX => quanx::proxy_to_quanx(input, ext),
        Target::SingBox => singbox::proxy_to_singbox(input, ext)?,
        Target::Single(kind) => single::proxy_to_single(input.proxies, kind, ext),
    };
    if !output.skipped.is_empty() {
        info!("{} proxies could not be rendered for {}", output.skipped.len(), target);
    }
    Ok(output)
}
