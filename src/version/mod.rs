pub mod resolver;

pub use resolver::{VersionIdentifier, VersionResolver};
