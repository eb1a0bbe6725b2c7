use crate::error::LocresError;
use crate::version::VersionIdentifier;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const PAK_LANGUAGE: &str = "{pak_language}";
pub const FOLDER_LANGUAGE: &str = "{folder_language}";
pub const GAME_VERSION: &str = "{game_version}";

/// A culture code in the two spellings the game uses: `en_US` in archive
/// names and `en-US` in localization folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    pak: String,
    folder: String,
}

impl Language {
    pub fn pak(&self) -> &str {
        &self.pak
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }
}

impl Default for Language {
    fn default() -> Self {
        Self {
            pak: "en_US".to_string(),
            folder: "en-US".to_string(),
        }
    }
}

impl FromStr for Language {
    type Err = LocresError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let valid = !trimmed.is_empty()
            && trimmed.len() <= 32
            && trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            && !trimmed.starts_with(['-', '_'])
            && !trimmed.ends_with(['-', '_']);

        if !valid {
            return Err(LocresError::InvalidLanguage {
                language: s.to_string(),
            });
        }

        Ok(Self {
            pak: trimmed.replace('-', "_"),
            folder: trimmed.replace('_', "-"),
        })
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.folder)
    }
}

/// Replace every `{pak_language}` and `{folder_language}` token in `path`.
pub fn apply_language(path: &str, pak_language: &str, folder_language: &str) -> String {
    path.replace(PAK_LANGUAGE, pak_language)
        .replace(FOLDER_LANGUAGE, folder_language)
}

/// Replace every `{game_version}` token in `path` with `branch-version`.
pub fn apply_version(path: &str, version: &VersionIdentifier) -> String {
    path.replace(GAME_VERSION, &version.to_string())
}

/// An output path that may still carry placeholder tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate(String);

impl PathTemplate {
    pub fn new<S: Into<String>>(template: S) -> Self {
        Self(template.into())
    }

    pub fn with_language(self, language: &Language) -> Self {
        Self(apply_language(&self.0, language.pak(), language.folder()))
    }

    pub fn with_version(self, version: &VersionIdentifier) -> Self {
        Self(apply_version(&self.0, version))
    }

    /// Whether resolving this template requires scanning the game executable.
    pub fn needs_version(&self) -> bool {
        self.0.contains(GAME_VERSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_path(self) -> PathBuf {
        PathBuf::from(self.0)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
