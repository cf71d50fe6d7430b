//! Training config: YAML parsing, typed shape, and semantic validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{parse_training, parse_training_str};
pub use types::TrainingConfig;
pub use validator::validate_training;
