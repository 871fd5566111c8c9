pub mod error;
pub mod explodes;
pub mod fields;
pub mod node_manip;
pub mod parse_settings;
pub mod registry;
pub mod subparser;
pub mod subs;
pub mod types;
pub mod validator;

// Re-export the decoding entry points
pub use error::{ParseError, ParseResult};
pub use node_manip::{preprocess_nodes, TransformOptions};
pub use parse_settings::ParseSettings;
pub use registry::{default_registry, LinkDecoder, Registry};
pub use subparser::{add_all_nodes, add_nodes, SourceError};
pub use subs::{detect_format, explode_conf_content, SubFormat};
pub use types::ConfType;
pub use validator::{BuiltinValidator, Validated, ValidationIssue, Validator};
