use crate::config::{CliOverrides, Config, DEFAULT_CONFIG_PATHS};
use crate::error::Result;
use crate::paths::Language;
use crate::pipeline::ExportRequest;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "locres-exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Export VALORANT localization tables to nested JSON")]
#[command(
    long_about = "Unpacks the localized text archive of a game install, exports its string table \
                  and writes it as a nested JSON document keyed by the slash-separated string keys."
)]
#[command(before_help = "🌐 locres-exporter - Localization Export Tool")]
#[command(after_help = "EXAMPLES:\n  \
    locres-exporter\n  \
    locres-exporter --language ja-JP --sort\n  \
    locres-exporter -l es_MX -o exports/{folder_language}.json --force\n  \
    locres-exporter --archive --config my-config.toml\n  \
    locres-exporter --generate-config")]
pub struct Cli {
    /// Target language (en-US or en_US style)
    #[arg(short, long, default_value = "en-US", value_parser = parse_language)]
    pub language: Language,

    /// Output path template (overrides paths.output_path)
    #[arg(
        short,
        long,
        help = "Output path; may contain {pak_language}, {folder_language} and {game_version}"
    )]
    pub output: Option<String>,

    /// Overwrite existing output without asking
    #[arg(short, long)]
    pub force: bool,

    /// Sort keys naturally one level below the top-level groups
    #[arg(short, long)]
    pub sort: bool,

    /// Also write a copy to paths.archive_path
    #[arg(short, long)]
    pub archive: bool,

    /// Escape every non-ASCII character in the JSON output
    #[arg(long)]
    pub ascii: bool,

    /// Configuration file path
    #[arg(short, long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for results
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be done without executing)
    #[arg(long, help = "Show the resolved export plan without running any tool")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_output_path(self.output.clone())
            .with_ascii(self.ascii.then_some(true))
    }

    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            language: self.language.clone(),
            force_overwrite: self.force,
            sort_keys: self.sort,
            archive: self.archive,
        }
    }

    /// Where `--generate-config` writes its template.
    pub fn config_target(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]))
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(&self.output_format)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

pub fn parse_language(s: &str) -> std::result::Result<Language, String> {
    s.parse::<Language>().map_err(|_| {
        format!(
            "'{}' is not a culture code; expected something like en-US or en_US",
            s
        )
    })
}
