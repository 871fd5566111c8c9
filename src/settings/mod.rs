//! Settings loading
//!
//! One settings document, in YAML, TOML or INI form, configures sources,
//! the transform pipeline, rulesets, groups and encoder flags.

pub mod deserializer;
pub mod import;
pub mod ini_settings;
pub mod settings_struct;
pub mod toml_settings;
pub mod yaml_settings;

pub use import::{import_items, ImportContext, ImportKind};
pub use settings_struct::{Settings, SettingsError, SettingsFormat};
