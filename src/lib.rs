pub mod generator;
pub mod models;
pub mod parser;
pub mod rulesets;
pub mod settings;
pub mod utils;

// Re-export the main proxy types for easier access
pub use models::{Proxy, ProxyKind, ProxyType};

// Re-export the pipeline entry points
pub use generator::{render, RenderError, RenderInput, RenderOutput, Target};
pub use parser::{add_all_nodes, preprocess_nodes, ParseSettings, TransformOptions};
pub use rulesets::{refresh_rulesets, RulesetFetcher};
pub use settings::{Settings, SettingsError};
