use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocresError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid setting '{setting}': {reason}")]
    InvalidSetting { setting: String, reason: String },

    #[error("Invalid language: {language}")]
    InvalidLanguage { language: String },

    #[error("Build version marker not found in {source_name}")]
    VersionNotFound { source_name: String },

    #[error("Malformed version data: found {found} tokens, need {required}")]
    MalformedVersionData { found: usize, required: usize },

    #[error("Failed to launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unpacked archive artifact missing: {}", path.display())]
    UnpackArtifactMissing { path: PathBuf },

    #[error("Archive conversion failed: {message}")]
    ConversionFailed { path: PathBuf, message: String },

    #[error("Exported table missing: {}", path.display())]
    TableArtifactMissing { path: PathBuf },

    #[error("Malformed localization table: {message}")]
    TableFormat { message: String },

    #[error("Output file already exists: {}", path.display())]
    FileAlreadyExists { path: PathBuf },

    #[error("Cannot encode output as {encoding}: {message}")]
    Encoding { encoding: String, message: String },

    #[error("JSON serialization failed: {message}")]
    Serialization { message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for LocresError {
    fn user_message(&self) -> String {
        match self {
            LocresError::InvalidSetting { setting, reason } => {
                format!("Setting '{}' is invalid: {}", setting, reason)
            }
            LocresError::VersionNotFound { source_name } => {
                format!("Could not find the build version in {}", source_name)
            }
            LocresError::MalformedVersionData { found, required } => format!(
                "Build version data is incomplete ({} of {} fields present)",
                found, required
            ),
            LocresError::UnpackArtifactMissing { path } => format!(
                "The unpack tool did not produce {}",
                path.display()
            ),
            LocresError::ConversionFailed { path, message } => {
                format!("{} ({})", message, path.display())
            }
            LocresError::TableArtifactMissing { path } => format!(
                "The table export tool did not produce {}",
                path.display()
            ),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            LocresError::Config { .. } => Some(
                "Run with --generate-config to create a template, then fill in the tool and game paths.".to_string()
            ),
            LocresError::InvalidSetting { .. } => Some(
                "Fix the setting in your configuration file and run again.".to_string()
            ),
            LocresError::InvalidLanguage { .. } => Some(
                "Use a culture code such as en-US, es-MX or ja-JP.".to_string()
            ),
            LocresError::VersionNotFound { .. } | LocresError::MalformedVersionData { .. } => Some(
                "Check paths.game_path and layout.executable, or remove {game_version} from the output path.".to_string()
            ),
            LocresError::UnpackArtifactMissing { .. } | LocresError::ConversionFailed { .. } => Some(
                "Verify the decryption key in tools.aes_path and the unpack scripts in tools.ut4_path / tools.ut4_old_path.".to_string()
            ),
            LocresError::TableArtifactMissing { .. } => Some(
                "Verify tools.ul_path points at a working locres export tool.".to_string()
            ),
            LocresError::TableFormat { .. } => Some(
                "Adjust table.key_columns / table.value_columns to match the exported header.".to_string()
            ),
            LocresError::FileAlreadyExists { .. } => Some(
                "Another process created the output file during this run. Run again with --force to replace it.".to_string()
            ),
            LocresError::Encoding { .. } => Some(
                "Pick an encoding that covers every character, or pass --ascii to escape non-ASCII text.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<csv::Error> for LocresError {
    fn from(error: csv::Error) -> Self {
        LocresError::TableFormat {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for LocresError {
    fn from(error: serde_json::Error) -> Self {
        LocresError::Serialization {
            message: error.to_string(),
        }
    }
}

impl From<toml::de::Error> for LocresError {
    fn from(error: toml::de::Error) -> Self {
        LocresError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LocresError>;
