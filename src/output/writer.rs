use crate::config::OutputConfig;
use crate::error::{LocresError, Result};
use crate::output::json::{to_json_string, OutputEncoding};
use crate::pipeline::Confirm;
use crate::tree::LocalizationTree;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Deepest key tree the JSON serializer is asked to handle. Serialization
/// recurses once per level and runs on a blocking worker with a small stack.
pub const MAX_NESTING: usize = 512;

/// How a write attempt treated the target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputDecision {
    Create,
    OverwriteConfirmed,
    OverwriteDenied,
}

impl OutputDecision {
    pub fn wrote_file(&self) -> bool {
        !matches!(self, OutputDecision::OverwriteDenied)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub path: PathBuf,
    pub decision: OutputDecision,
    pub bytes_written: u64,
}

pub struct OutputWriter {
    encoding: OutputEncoding,
    ascii: bool,
}

impl OutputWriter {
    pub fn new(encoding: OutputEncoding) -> Self {
        Self {
            encoding,
            ascii: false,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Result<Self> {
        Ok(Self::new(OutputEncoding::from_label(&config.encoding)?).with_ascii(config.ascii))
    }

    pub fn with_ascii(mut self, ascii: bool) -> Self {
        self.ascii = ascii;
        self
    }

    /// Persist `tree` at `path`.
    ///
    /// A missing target is created exclusively. An existing target is replaced
    /// when `force_overwrite` is set or `confirm` answers yes; otherwise nothing
    /// is written and the result carries [`OutputDecision::OverwriteDenied`].
    pub fn write(
        &self,
        path: &Path,
        tree: &LocalizationTree,
        force_overwrite: bool,
        confirm: &mut dyn Confirm,
    ) -> Result<WriteResult> {
        let depth = tree.depth();
        if depth > MAX_NESTING {
            return Err(LocresError::Serialization {
                message: format!(
                    "key tree is nested {} levels deep, at most {} can be written",
                    depth, MAX_NESTING
                ),
            });
        }

        let decision = if path.exists() {
            let prompt = format!(
                "[WARN] Target '{}' already exists,\n       Overwrite it? (y/n) ",
                path.display()
            );
            if force_overwrite || confirm.confirm(&prompt) {
                OutputDecision::OverwriteConfirmed
            } else {
                OutputDecision::OverwriteDenied
            }
        } else {
            OutputDecision::Create
        };

        if decision == OutputDecision::OverwriteDenied {
            return Ok(WriteResult {
                path: path.to_path_buf(),
                decision,
                bytes_written: 0,
            });
        }

        let text = to_json_string(tree, self.ascii)?;
        let bytes = self.encoding.encode(text)?;
        self.commit(path, &bytes, decision)?;

        Ok(WriteResult {
            path: path.to_path_buf(),
            decision,
            bytes_written: bytes.len() as u64,
        })
    }

    /// Write the whole payload to a sibling temporary file and move it into place.
    fn commit(&self, path: &Path, bytes: &[u8], decision: OutputDecision) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut staged = NamedTempFile::new_in(&parent)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;

        let persisted = match decision {
            OutputDecision::Create => staged.persist_noclobber(path),
            _ => staged.persist(path),
        };

        persisted.map(|_| ()).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                LocresError::FileAlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                LocresError::Io(e.error)
            }
        })
    }
}
