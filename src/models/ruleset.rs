/// Grammar of a fetched ruleset document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesetType {
    /// Already-typed lines such as `DOMAIN-SUFFIX,example.com`
    Surge,
    QuanX,
    /// Clash rule-provider payloads
    ClashDomain,
    ClashIpcidr,
    ClashClassical,
}

impl RulesetType {
    const PREFIXES: [(&'static str, RulesetType); 5] = [
        ("clash-domain:", RulesetType::ClashDomain),
        ("clash-ipcidr:", RulesetType::ClashIpcidr),
        ("clash-classic:", RulesetType::ClashClassical),
        ("quanx:", RulesetType::QuanX),
        ("surge:", RulesetType::Surge),
    ];

    /// Splits an optional `type:` prefix off a ruleset location
    pub fn split_prefix(location: &str) -> (RulesetType, &str) {
        for (prefix, kind) in Self::PREFIXES {
            if let Some(rest) = location.strip_prefix(prefix) {
                return (kind, rest);
            }
        }
        (RulesetType::Surge, location)
    }

    /// Clash rule-provider behavior name
    pub fn clash_behavior(&self) -> &'static str {
        match self {
            RulesetType::ClashDomain => "domain",
            RulesetType::ClashIpcidr => "ipcidr",
            _ => "classical",
        }
    }
}

/// Where a ruleset's rules come from
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSource {
    /// Literal rule written after `[]`, e.g. `FINAL` or `GEOIP,CN`
    Inline(String),
    /// A file path or URL to fetch
    Reference {
        location: String,
        kind: RulesetType,
        /// Refresh interval in seconds, 0 when unspecified
        interval: u32,
    },
}

/// A ruleset bound to its destination policy
#[derive(Debug, Clone, PartialEq)]
pub struct RulesetConfig {
    pub group: String,
    pub source: RuleSource,
}

impl RulesetConfig {
    pub fn inline(group: &str, rule: &str) -> Self {
        RulesetConfig {
            group: group.to_string(),
            source: RuleSource::Inline(rule.to_string()),
        }
    }

    /// Parses `group,[]RULE` or `group,[type:]location[,interval]`
    pub fn from_ini(line: &str) -> Option<RulesetConfig> {
        let (group, rest) = line.split_once(',')?;
        let group = group.trim();
        let rest = rest.trim();
        if group.is_empty() || rest.is_empty() {
            return None;
        }

        if let Some(rule) = rest.strip_prefix("[]") {
            return Some(RulesetConfig::inline(group, rule.trim()));
        }

        let (location, interval) = match rest.rsplit_once(',') {
            Some((loc, tail)) if tail.trim().parse::<u32>().is_ok() => {
                (loc.trim(), tail.trim().parse().unwrap_or(0))
            }
            _ => (rest, 0),
        };
        let (kind, location) = RulesetType::split_prefix(location);
        Some(RulesetConfig {
            group: group.to_string(),
            source: RuleSource::Reference {
                location: location.to_string(),
                kind,
                interval,
            },
        })
    }
}

/// A ruleset after the fetch step, ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct RulesetContent {
    pub group: String,
    pub body: RulesetBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RulesetBody {
    Inline(String),
    Fetched { kind: RulesetType, text: String },
    /// Fetch failed; rendered as an opaque remote reference
    Unavailable {
        location: String,
        kind: RulesetType,
        /// Refresh interval in seconds, 0 when unspecified
        interval: u32,
    },
}
