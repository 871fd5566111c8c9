pub mod ruleset;

pub use ruleset::{refresh_rulesets, RulesetError, RulesetFetcher};
