use crate::config::Config;
use crate::error::{LocresError, Result};
use crate::output::{OutputWriter, WriteResult};
use crate::paths::{Language, PathTemplate};
use crate::pipeline::tools::{ToolInvocation, ToolRunner};
use crate::pipeline::Confirm;
use crate::tree::{sort_children, KeyRewriter, KeyTreeBuilder, LocalizationTree, TableReader};
use crate::ui::GracefulShutdown;
use crate::version::{VersionIdentifier, VersionResolver};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Unpacking,
    Converting,
    Building,
    Resolving,
    Writing,
    Done,
    Error,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            PipelineState::Idle => "Idle",
            PipelineState::Unpacking => "Unpacking localization archive",
            PipelineState::Converting => "Exporting string table",
            PipelineState::Building => "Building key tree",
            PipelineState::Resolving => "Resolving output paths",
            PipelineState::Writing => "Writing JSON",
            PipelineState::Done => "Done",
            PipelineState::Error => "Failed",
        };
        f.write_str(text)
    }
}

/// Notifications emitted while a run progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    State(PipelineState),
    Warning(String),
    Detail(String),
}

/// What one run should produce.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub language: Language,
    pub force_overwrite: bool,
    pub sort_keys: bool,
    pub archive: bool,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub language: String,
    pub output: WriteResult,
    pub archive: Option<WriteResult>,
    pub version: Option<String>,
    pub rows: usize,
    pub leaves: usize,
    pub used_fallback: bool,
    pub duration: Duration,
}

impl ExportReport {
    /// Whether at least one file was written.
    pub fn wrote_any(&self) -> bool {
        self.output.decision.wrote_file()
            || self
                .archive
                .as_ref()
                .map_or(false, |archive| archive.decision.wrote_file())
    }
}

/// Paths derived from the configuration for one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub archive: PathBuf,
    pub executable: PathBuf,
    pub locres: PathBuf,
    pub legacy_locres: PathBuf,
    pub table: PathBuf,
}

impl ArtifactPaths {
    pub fn resolve(config: &Config, language: &Language) -> Self {
        let layout = &config.layout;
        let game = &config.paths.game_path;
        let work = &config.paths.working_path;
        let localized = |template: &str| {
            PathTemplate::new(template)
                .with_language(language)
                .into_path()
        };

        Self {
            archive: game.join(localized(&layout.archive)),
            executable: game.join(localized(&layout.executable)),
            locres: work.join(localized(&layout.locres)),
            legacy_locres: work.join(localized(&layout.legacy_locres)),
            table: work.join(localized(&layout.table)),
        }
    }
}

type Observer = Box<dyn FnMut(&PipelineEvent) + Send>;

/// Runs unpack, table export, tree construction, path resolution and the
/// final write, strictly in that order.
///
/// The executable is scanned for its build version only when an output
/// template actually contains `{game_version}`, and at most once per run.
pub struct ExtractionPipeline<R: ToolRunner> {
    config: Config,
    runner: R,
    shutdown: GracefulShutdown,
    state: PipelineState,
    observer: Option<Observer>,
}

impl<R: ToolRunner> ExtractionPipeline<R> {
    pub fn new(config: Config, runner: R, shutdown: GracefulShutdown) -> Self {
        Self {
            config,
            runner,
            shutdown,
            state: PipelineState::Idle,
            observer: None,
        }
    }

    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(&PipelineEvent) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn run(&mut self, request: &ExportRequest, confirm: &mut dyn Confirm) -> Result<ExportReport> {
        self.state = PipelineState::Idle;
        match self.execute(request, confirm) {
            Ok(report) => {
                self.transition(PipelineState::Done);
                Ok(report)
            }
            Err(e) => {
                self.transition(PipelineState::Error);
                Err(e)
            }
        }
    }

    fn execute(&mut self, request: &ExportRequest, confirm: &mut dyn Confirm) -> Result<ExportReport> {
        let start = Instant::now();
        let artifacts = ArtifactPaths::resolve(&self.config, &request.language);

        self.transition(PipelineState::Unpacking);
        let used_fallback = self.unpack(&artifacts)?;

        self.transition(PipelineState::Converting);
        self.convert(&artifacts)?;

        self.transition(PipelineState::Building);
        let (mut tree, rows) = self.build(&artifacts.table)?;
        self.detail(format!("Read {} rows into {} entries", rows, tree.leaf_count()));

        self.transition(PipelineState::Resolving);
        let mut version: Option<VersionIdentifier> = None;
        let output_path =
            self.resolve_path(&self.config.paths.output_path, request, &artifacts, &mut version)?;
        let archive_path = if request.archive {
            Some(self.resolve_path(
                &self.config.paths.archive_path,
                request,
                &artifacts,
                &mut version,
            )?)
        } else {
            None
        };

        if request.sort_keys {
            sort_children(&mut tree);
        }

        self.transition(PipelineState::Writing);
        let writer = OutputWriter::from_config(&self.config.output)?;
        let output = writer.write(&output_path, &tree, request.force_overwrite, confirm)?;
        let archive = match archive_path {
            Some(path) => Some(writer.write(&path, &tree, request.force_overwrite, confirm)?),
            None => None,
        };

        if !self.config.output.keep_intermediate {
            self.remove_intermediates(&artifacts);
        }

        Ok(ExportReport {
            language: request.language.to_string(),
            leaves: tree.leaf_count(),
            output,
            archive,
            version: version.map(|v| v.to_string()),
            rows,
            used_fallback,
            duration: start.elapsed(),
        })
    }

    /// Returns whether the fallback script had to be used.
    fn unpack(&mut self, artifacts: &ArtifactPaths) -> Result<bool> {
        let key = fs::read(&self.config.tools.aes_path)?;
        let tools = &self.config.tools;
        let primary = ToolInvocation::unpack(
            &tools.quickbms_path,
            &tools.ut4_path,
            &artifacts.archive,
            &self.config.paths.working_path,
            key.clone(),
        );
        let fallback = tools.ut4_old_path.as_ref().map(|script| {
            ToolInvocation::unpack(
                &tools.quickbms_path,
                script,
                &artifacts.archive,
                &self.config.paths.working_path,
                key,
            )
        });

        self.invoke(&primary)?;
        if artifacts.locres.is_file() {
            return Ok(false);
        }

        let Some(fallback) = fallback else {
            return Err(LocresError::UnpackArtifactMissing {
                path: artifacts.locres.clone(),
            });
        };

        self.warning(format!(
            "{} was not produced, retrying with the fallback unpack script",
            artifacts.locres.display()
        ));
        self.invoke(&fallback)?;
        self.adopt_legacy_locres(artifacts)?;

        if artifacts.locres.is_file() {
            Ok(true)
        } else {
            Err(LocresError::ConversionFailed {
                path: artifacts.locres.clone(),
                message: "Both unpack scripts ran without extracting the localization resource"
                    .to_string(),
            })
        }
    }

    /// The fallback script writes the resource at the working directory root
    /// instead of the localized folder.
    fn adopt_legacy_locres(&mut self, artifacts: &ArtifactPaths) -> Result<()> {
        if artifacts.locres.is_file() || !artifacts.legacy_locres.is_file() {
            return Ok(());
        }

        if let Some(parent) = artifacts.locres.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&artifacts.legacy_locres, &artifacts.locres)?;
        self.detail(format!(
            "Moved {} to {}",
            artifacts.legacy_locres.display(),
            artifacts.locres.display()
        ));
        Ok(())
    }

    fn convert(&mut self, artifacts: &ArtifactPaths) -> Result<()> {
        let invocation =
            ToolInvocation::export_table(&self.config.tools.ul_path, &artifacts.locres, &artifacts.table);
        self.invoke(&invocation)?;

        if !artifacts.table.is_file() {
            return Err(LocresError::TableArtifactMissing {
                path: artifacts.table.clone(),
            });
        }
        Ok(())
    }

    fn build(&self, table: &Path) -> Result<(LocalizationTree, usize)> {
        let mut builder = KeyTreeBuilder::new(KeyRewriter::new(&self.config.keys.rewrites)?);
        let reader = TableReader::new(&self.config.table);
        let rows = self
            .shutdown
            .with_shutdown_check(|| reader.read_path(table, |row| builder.push_row(row)))?;
        Ok((builder.finish(), rows))
    }

    fn resolve_path(
        &self,
        template: &str,
        request: &ExportRequest,
        artifacts: &ArtifactPaths,
        version: &mut Option<VersionIdentifier>,
    ) -> Result<PathBuf> {
        let template = PathTemplate::new(template).with_language(&request.language);
        if !template.needs_version() {
            return Ok(template.into_path());
        }

        let resolved = match version.take() {
            Some(resolved) => resolved,
            None => VersionResolver::new(&self.config.version).resolve_file(&artifacts.executable)?,
        };
        let path = template.with_version(&resolved).into_path();
        *version = Some(resolved);
        Ok(path)
    }

    fn invoke(&mut self, invocation: &ToolInvocation) -> Result<()> {
        self.detail(format!("Running {}", invocation));
        let exit = self.runner.run(invocation)?;
        self.shutdown.check_shutdown()?;

        if !exit.is_success() {
            let status = exit
                .code
                .map_or_else(|| "a signal".to_string(), |code| format!("status {}", code));
            self.warning(format!("The {} tool exited with {}", invocation.label, status));
        }
        Ok(())
    }

    fn remove_intermediates(&mut self, artifacts: &ArtifactPaths) {
        for path in [&artifacts.locres, &artifacts.table] {
            if let Err(e) = fs::remove_file(path) {
                self.warning(format!("Could not remove {}: {}", path.display(), e));
            }
        }
    }

    fn transition(&mut self, state: PipelineState) {
        self.state = state;
        self.emit(PipelineEvent::State(state));
    }

    fn warning(&mut self, message: String) {
        self.emit(PipelineEvent::Warning(message));
    }

    fn detail(&mut self, message: String) {
        self.emit(PipelineEvent::Detail(message));
    }

    fn emit(&mut self, event: PipelineEvent) {
        if let Some(ref mut observer) = self.observer {
            observer(&event);
        }
    }
}
