pub mod template;

pub use template::{apply_language, apply_version, Language, PathTemplate};
