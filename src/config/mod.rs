pub mod applicator;
pub mod schema;

pub use applicator::{apply_rule_set, check_rule_set, ApplyError, Preview};
pub use schema::{
    load_from_path, load_from_str, ConfigError, Metadata, PatchSet, RuleDefinition,
    RuleSetParseError, ValidationError, ValidationIssue,
};
