use crate::error::{LocresError, Result};
use crate::output::OutputEncoding;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["locres_config.toml", ".locres_config.toml"];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    pub tools: ToolsConfig,
    pub paths: PathsConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub version: VersionConfig,
    #[serde(default)]
    pub table: TableConfig,
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// External programs and the key file they consume.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    pub quickbms_path: PathBuf,
    pub ut4_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ut4_old_path: Option<PathBuf>,
    pub ul_path: PathBuf,
    pub aes_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    pub game_path: PathBuf,
    pub working_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_archive_path")]
    pub archive_path: String,
}

/// Locations inside the game install and the scratch directory. Relative paths
/// may carry `{pak_language}` and `{folder_language}` placeholders.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub archive: String,
    pub executable: String,
    pub locres: String,
    /// Where the fallback unpack script leaves the resource, relative to the
    /// working directory. It is moved to `locres` after a fallback run.
    pub legacy_locres: String,
    pub table: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VersionConfig {
    pub marker: String,
    pub window_bytes: usize,
    pub branch_token: usize,
    pub version_token: usize,
    pub build_token: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TableConfig {
    pub key_columns: Vec<String>,
    pub value_columns: Vec<String>,
}

/// Rewrites applied to raw keys before they are split into path segments.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeysConfig {
    pub rewrites: Vec<KeyRewriteRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyRewriteRule {
    pub find: String,
    pub replace: String,
    #[serde(default)]
    pub regex: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub encoding: String,
    pub ascii: bool,
    pub keep_intermediate: bool,
}

fn default_output_path() -> String {
    "{folder_language}.json".to_string()
}

fn default_archive_path() -> String {
    "archive/{game_version}/{folder_language}.json".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            game_path: PathBuf::new(),
            working_path: PathBuf::new(),
            output_path: default_output_path(),
            archive_path: default_archive_path(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            archive: "live/ShooterGame/Content/Paks/{pak_language}_Text-WindowsClient.pak"
                .to_string(),
            executable: "live/ShooterGame/Binaries/Win64/VALORANT-Win64-Shipping.exe".to_string(),
            locres: "ShooterGame/Content/Localization/Game/{folder_language}/Game.locres"
                .to_string(),
            legacy_locres: "Game.locres".to_string(),
            table: "ShooterGame/Content/Localization/Game/{folder_language}/Game.csv".to_string(),
        }
    }
}

impl Default for VersionConfig {
    fn default() -> Self {
        Self {
            marker: "++Ares-Core+".to_string(),
            window_bytes: 96,
            branch_token: 0,
            version_token: 1,
            build_token: 3,
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            key_columns: vec!["key".to_string()],
            value_columns: vec!["source".to_string(), "value".to_string()],
        }
    }
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            // The agent name contains the key separator
            rewrites: vec![KeyRewriteRule {
                find: "KAY/O".to_string(),
                replace: "KAYO".to_string(),
                regex: false,
            }],
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            ascii: false,
            keep_intermediate: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LocresError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| LocresError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|e| LocresError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        config.normalize_paths()?;
        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in &DEFAULT_CONFIG_PATHS {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Err(LocresError::Config {
                    message: format!(
                        "No configuration file found (looked for {})",
                        DEFAULT_CONFIG_PATHS.join(", ")
                    ),
                })
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref output_path) = cli_args.output_path {
            self.paths.output_path = output_path.clone();
        }

        if let Some(ascii) = cli_args.ascii {
            self.output.ascii = ascii;
        }
    }

    /// Make every configured path absolute relative to the current directory.
    pub fn normalize_paths(&mut self) -> Result<()> {
        let tools = &mut self.tools;
        for path in [
            &mut tools.quickbms_path,
            &mut tools.ut4_path,
            &mut tools.ul_path,
            &mut tools.aes_path,
            &mut self.paths.game_path,
            &mut self.paths.working_path,
        ] {
            absolutize(path)?;
        }

        if let Some(ref mut old) = tools.ut4_old_path {
            absolutize(old)?;
        }

        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| LocresError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        // Never clobber a configuration the operator already filled in
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| LocresError::Config {
                message: format!("Failed to create config file {}: {}", path.display(), e),
            })?;
        file.write_all(content.as_bytes())?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        require_file("tools.quickbms_path", &self.tools.quickbms_path)?;
        require_file("tools.ut4_path", &self.tools.ut4_path)?;
        if let Some(ref old) = self.tools.ut4_old_path {
            require_file("tools.ut4_old_path", old)?;
        }
        require_file("tools.ul_path", &self.tools.ul_path)?;
        require_file("tools.aes_path", &self.tools.aes_path)?;
        if std::fs::metadata(&self.tools.aes_path)?.len() == 0 {
            return Err(invalid("tools.aes_path", "file is empty"));
        }

        require_dir("paths.game_path", &self.paths.game_path)?;
        require_dir("paths.working_path", &self.paths.working_path)?;
        require_text("paths.output_path", &self.paths.output_path)?;
        require_text("paths.archive_path", &self.paths.archive_path)?;

        require_text("layout.archive", &self.layout.archive)?;
        require_text("layout.executable", &self.layout.executable)?;
        require_text("layout.locres", &self.layout.locres)?;
        require_text("layout.legacy_locres", &self.layout.legacy_locres)?;
        require_text("layout.table", &self.layout.table)?;

        require_text("version.marker", &self.version.marker)?;
        if self.version.window_bytes == 0 {
            return Err(invalid("version.window_bytes", "must be greater than 0"));
        }

        if self.table.key_columns.iter().all(|c| c.trim().is_empty()) {
            return Err(invalid("table.key_columns", "empty"));
        }
        if self.table.value_columns.iter().all(|c| c.trim().is_empty()) {
            return Err(invalid("table.value_columns", "empty"));
        }

        for (index, rule) in self.keys.rewrites.iter().enumerate() {
            let setting = format!("keys.rewrites[{}]", index);
            require_text(&setting, &rule.find)?;
            if rule.regex {
                regex::Regex::new(&rule.find)
                    .map_err(|e| invalid(&setting, &format!("invalid pattern: {}", e)))?;
            }
        }

        OutputEncoding::from_label(&self.output.encoding)
            .map_err(|e| invalid("output.encoding", &e.to_string()))?;

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn absolutize(path: &mut PathBuf) -> Result<()> {
    if !path.as_os_str().is_empty() && !path.is_absolute() {
        *path = std::path::absolute(&*path)?;
    }
    Ok(())
}

fn invalid(setting: &str, reason: &str) -> LocresError {
    LocresError::InvalidSetting {
        setting: setting.to_string(),
        reason: reason.to_string(),
    }
}

fn require_text(setting: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(setting, "empty"));
    }
    Ok(())
}

fn require_file(setting: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid(setting, "empty"));
    }
    if !path.exists() {
        return Err(invalid(
            setting,
            &format!("file not found: {}", path.display()),
        ));
    }
    if !path.is_file() {
        return Err(invalid(setting, &format!("not a file: {}", path.display())));
    }
    Ok(())
}

fn require_dir(setting: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(invalid(setting, "empty"));
    }
    if !path.exists() {
        return Err(invalid(
            setting,
            &format!("directory not found: {}", path.display()),
        ));
    }
    if !path.is_dir() {
        return Err(invalid(
            setting,
            &format!("not a directory: {}", path.display()),
        ));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub output_path: Option<String>,
    pub ascii: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_path(mut self, output_path: Option<String>) -> Self {
        self.output_path = output_path;
        self
    }

    pub fn with_ascii(mut self, ascii: Option<bool>) -> Self {
        self.ascii = ascii;
        self
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A configuration whose tool and game paths all exist inside `root`.
    pub(crate) fn valid_config(root: &Path) -> Config {
        let tools_dir = root.join("tools");
        let game_dir = root.join("game");
        let work_dir = root.join("work");
        fs::create_dir_all(&tools_dir).unwrap();
        fs::create_dir_all(&game_dir).unwrap();
        fs::create_dir_all(&work_dir).unwrap();

        for name in ["quickbms", "unreal_tournament_4.bms", "ut4_old.bms", "UnrealLocres"] {
            fs::write(tools_dir.join(name), b"tool").unwrap();
        }
        fs::write(tools_dir.join("aes.txt"), b"0xDEADBEEF").unwrap();

        let mut config = Config::default();
        config.tools = ToolsConfig {
            quickbms_path: tools_dir.join("quickbms"),
            ut4_path: tools_dir.join("unreal_tournament_4.bms"),
            ut4_old_path: Some(tools_dir.join("ut4_old.bms")),
            ul_path: tools_dir.join("UnrealLocres"),
            aes_path: tools_dir.join("aes.txt"),
        };
        config.paths.game_path = game_dir;
        config.paths.working_path = work_dir;
        config.paths.output_path = root
            .join("out/{folder_language}.json")
            .to_string_lossy()
            .to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version.marker, "++Ares-Core+");
        assert_eq!(config.version.window_bytes, 96);
        assert_eq!(config.table.key_columns, vec!["key"]);
        assert_eq!(config.output.encoding, "utf-8");
        assert!(!config.output.ascii);
    }

    #[test]
    fn test_config_validation() {
        let temp_dir = TempDir::new().unwrap();
        let config = valid_config(temp_dir.path());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_names_missing_tool() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.tools.ul_path = temp_dir.path().join("missing");

        match config.validate().unwrap_err() {
            LocresError::InvalidSetting { setting, reason } => {
                assert_eq!(setting, "tools.ul_path");
                assert!(reason.starts_with("file not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_file_as_directory() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.paths.working_path = config.tools.aes_path.clone();

        match config.validate().unwrap_err() {
            LocresError::InvalidSetting { setting, reason } => {
                assert_eq!(setting, "paths.working_path");
                assert!(reason.starts_with("not a directory"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_empty_values() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.tools.quickbms_path = PathBuf::new();

        match config.validate().unwrap_err() {
            LocresError::InvalidSetting { setting, reason } => {
                assert_eq!(setting, "tools.quickbms_path");
                assert_eq!(reason, "empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let mut config = valid_config(temp_dir.path());
        fs::write(&config.tools.aes_path, b"").unwrap();
        assert!(matches!(
            config.validate(),
            Err(LocresError::InvalidSetting { ref setting, .. }) if setting == "tools.aes_path"
        ));

        config = valid_config(temp_dir.path());
        config.paths.output_path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_rewrite_pattern() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.keys.rewrites = vec![KeyRewriteRule {
            find: "([unclosed".to_string(),
            replace: String::new(),
            regex: true,
        }];

        match config.validate().unwrap_err() {
            LocresError::InvalidSetting { setting, .. } => {
                assert_eq!(setting, "keys.rewrites[0]");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_unknown_encoding() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = valid_config(temp_dir.path());
        config.output.encoding = "klingon".to_string();
        assert!(matches!(
            config.validate(),
            Err(LocresError::InvalidSetting { ref setting, .. }) if setting == "output.encoding"
        ));
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = TempDir::new().unwrap();
        let config = valid_config(temp_dir.path());
        let path = temp_dir.path().join("locres_config.toml");

        config.save_to_file(&path).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.tools.ul_path, config.tools.ul_path);
        assert_eq!(loaded.paths.output_path, config.paths.output_path);
        assert!(loaded.validate().is_ok());

        // A second save must not overwrite the first
        assert!(config.save_to_file(&path).is_err());
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("partial.toml");
        fs::write(
            &path,
            r#"
[tools]
quickbms_path = "/opt/quickbms"
ut4_path = "/opt/ut4.bms"
ul_path = "/opt/UnrealLocres"
aes_path = "/opt/aes.txt"

[paths]
game_path = "/games/valorant"
working_path = "/tmp/work"
output_path = "{folder_language}-{game_version}.json"

[[keys.rewrites]]
find = "Valorant"
replace = "VALORANT"
"#,
        )
        .unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert!(config.tools.ut4_old_path.is_none());
        assert_eq!(config.version.build_token, 3);
        // A [keys] section replaces the built-in rules
        assert_eq!(config.keys.rewrites.len(), 1);
        assert_eq!(config.keys.rewrites[0].find, "Valorant");
        assert!(!config.keys.rewrites[0].regex);
        assert_eq!(
            config.paths.archive_path,
            "archive/{game_version}/{folder_language}.json"
        );
    }

    #[test]
    fn test_missing_keys_section_keeps_agent_name_rule() {
        let config: Config = toml::from_str(
            r#"
[tools]
quickbms_path = "/opt/quickbms"
ut4_path = "/opt/ut4.bms"
ul_path = "/opt/UnrealLocres"
aes_path = "/opt/aes.txt"

[paths]
game_path = "/games/valorant"
working_path = "/tmp/work"
"#,
        )
        .unwrap();

        assert_eq!(config.keys.rewrites, KeysConfig::default().rewrites);
        assert_eq!(config.keys.rewrites[0].find, "KAY/O");
        assert_eq!(config.layout.legacy_locres, "Game.locres");
    }

    #[test]
    fn test_empty_rewrite_list_disables_rules() {
        let config: KeysConfig = toml::from_str("rewrites = []").unwrap();
        assert!(config.rewrites.is_empty());
    }

    #[test]
    fn test_relative_paths_are_absolutized() {
        let mut config = Config::default();
        config.tools.ul_path = PathBuf::from("tools/UnrealLocres");
        config.normalize_paths().unwrap();
        assert!(config.tools.ul_path.is_absolute());
        assert!(config.tools.quickbms_path.as_os_str().is_empty());
    }

    #[test]
    fn test_missing_config_file() {
        let result = Config::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(LocresError::Config { .. })));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = Config::default();
        let overrides = CliOverrides::new()
            .with_output_path(Some("custom/{folder_language}.json".to_string()))
            .with_ascii(Some(true));

        config.merge_with_cli_args(&overrides);

        assert_eq!(config.paths.output_path, "custom/{folder_language}.json");
        assert!(config.output.ascii);
    }

    #[test]
    fn test_sample_config_generation() {
        let sample = Config::create_sample_config();
        assert!(!sample.is_empty());
        assert!(sample.contains("[tools]"));
        assert!(sample.contains("[paths]"));
        assert!(sample.contains("[version]"));
        assert!(sample.contains("KAY/O"));
        assert!(sample.contains("legacy_locres"));
    }
}
