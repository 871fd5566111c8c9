pub mod base64;
pub mod file;
pub mod http;
pub mod ini_reader;
pub mod matcher;
pub mod string;
pub mod url;

// Re-export common utilities
pub use ini_reader::IniReader;
pub use matcher::{apply_matcher, match_node, match_range, reg_find, reg_match};
