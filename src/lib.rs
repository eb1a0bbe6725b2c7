pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod tree;
pub mod ui;
pub mod version;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config};
pub use error::{LocresError, Result, UserFriendlyError};

// Core functionality re-exports
pub use output::{OutputDecision, OutputEncoding, OutputWriter, WriteResult};
pub use paths::{apply_language, apply_version, Language, PathTemplate};
pub use pipeline::{
    ArtifactPaths, Confirm, ConsoleConfirm, ExportReport, ExportRequest, ExtractionPipeline,
    PipelineEvent, PipelineState, SystemToolRunner, ToolRunner,
};
pub use tree::{natural_cmp, sort_children, KeyTreeBuilder, LocNode, LocalizationTree};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressManager};
pub use version::{VersionIdentifier, VersionResolver};

use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::task;

/// Main library interface: one configured exporter per process.
pub struct LocresExporter {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl LocresExporter {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        // Spinners would interleave with JSON lines on stdout
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// Create an instance for testing (no signal handler registration)
    #[cfg(test)]
    pub fn new_for_test(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(output_mode, verbose, quiet),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_mode(),
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Run one export with the real external tools and console confirmation.
    pub async fn export(&self, request: ExportRequest) -> Result<ExportReport> {
        self.shutdown.check_shutdown()?;
        self.output_formatter.start_operation(&format!(
            "Exporting {} localization",
            request.language
        ));

        let start = Instant::now();
        let spinner = self.progress_manager.create_spinner("Preparing export");
        let runner = SystemToolRunner::new(self.shutdown.clone());
        let formatter = self.output_formatter.clone();
        let observer_spinner = spinner.clone();

        let mut pipeline = ExtractionPipeline::new(self.config.clone(), runner, self.shutdown.clone())
            .with_observer(move |event| match event {
                PipelineEvent::State(state) => {
                    observer_spinner.set_message(state.to_string());
                    observer_spinner.suspend(|| formatter.debug(&format!("Stage: {}", state)));
                }
                PipelineEvent::Warning(message) => {
                    observer_spinner.suspend(|| formatter.warning(message))
                }
                PipelineEvent::Detail(message) => {
                    observer_spinner.suspend(|| formatter.info(message))
                }
            });
        let mut confirm = ConsoleConfirm::new().with_spinner(spinner.clone());

        let result = task::spawn_blocking(move || pipeline.run(&request, &mut confirm))
            .await
            .map_err(|e| LocresError::Config {
                message: format!("Export task failed: {}", e),
            })?;

        match result {
            Ok(report) => {
                ui::progress::finish_progress_with_summary(
                    &spinner,
                    "Export finished",
                    start.elapsed(),
                );
                Ok(report)
            }
            Err(e) => {
                spinner.abandon_with_message("Export failed");
                Err(e)
            }
        }
    }

    /// The paths a run would touch, without running anything.
    pub fn plan(&self, request: &ExportRequest) -> ExportPlan {
        let language = &request.language;
        let output = PathTemplate::new(self.config.paths.output_path.as_str()).with_language(language);
        let archive = request
            .archive
            .then(|| PathTemplate::new(self.config.paths.archive_path.as_str()).with_language(language));

        ExportPlan {
            artifacts: ArtifactPaths::resolve(&self.config, language),
            needs_version: output.needs_version()
                || archive.as_ref().map_or(false, PathTemplate::needs_version),
            output,
            archive,
        }
    }

    /// Write the template configuration, refusing to replace an existing file.
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let output_path = output_path.as_ref();
        if output_path.exists() {
            return Err(LocresError::FileAlreadyExists {
                path: output_path.to_path_buf(),
            });
        }
        Config::default().save_to_file(output_path)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn progress_manager(&self) -> &ProgressManager {
        &self.progress_manager
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &LocresError) {
        self.progress_manager.clear();
        self.output_formatter.print_user_friendly_error(error);
    }
}

/// Resolved paths for `--dry-run`. Templates may still hold `{game_version}`.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    pub artifacts: ArtifactPaths,
    pub output: PathTemplate,
    pub archive: Option<PathTemplate>,
    pub needs_version: bool,
}

impl ExportPlan {
    pub fn intermediate_files(&self) -> [&PathBuf; 2] {
        [&self.artifacts.locres, &self.artifacts.table]
    }
}

/// Get version information
pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
