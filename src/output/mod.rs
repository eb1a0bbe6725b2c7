pub mod json;
pub mod writer;

pub use json::{to_json_string, OutputEncoding};
pub use writer::{OutputDecision, OutputWriter, WriteResult, MAX_NESTING};
