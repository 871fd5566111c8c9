pub mod config;

// Re-export the render entry points
pub use config::group::group_generate;
pub use config::remark::process_remark;
pub use config::ruleconvert::{ruleset_to_rules, ruleset_to_singbox, RuleFlavor};
pub use config::subexport::{render, RenderError, RenderInput, RenderOutput, SingleKind, Target};

// Re-export format converters
pub use config::formats::{
    proxy_to_clash, proxy_to_link, proxy_to_loon, proxy_to_outbound, proxy_to_quanx, proxy_to_single,
    proxy_to_singbox, proxy_to_surge,
};
