use crate::error::{LocresError, Result};
use crate::ui::GracefulShutdown;
use std::ffi::OsString;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One external process call: program, arguments and optional stdin payload.
#[derive(Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub label: &'static str,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdin: Option<Vec<u8>>,
}

impl ToolInvocation {
    /// `<quickbms> <script> <archive> <output_dir>`, with the decryption key on stdin.
    pub fn unpack(tool: &Path, script: &Path, archive: &Path, output_dir: &Path, key: Vec<u8>) -> Self {
        Self {
            label: "unpack",
            program: tool.to_path_buf(),
            args: vec![
                script.as_os_str().to_owned(),
                archive.as_os_str().to_owned(),
                output_dir.as_os_str().to_owned(),
            ],
            stdin: Some(key),
        }
    }

    /// `<exporter> export <locres> -o <csv>`
    pub fn export_table(tool: &Path, locres: &Path, table: &Path) -> Self {
        Self {
            label: "table export",
            program: tool.to_path_buf(),
            args: vec![
                OsString::from("export"),
                locres.as_os_str().to_owned(),
                OsString::from("-o"),
                table.as_os_str().to_owned(),
            ],
            stdin: None,
        }
    }
}

// Keeps the key bytes out of logs
impl fmt::Debug for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolInvocation")
            .field("label", &self.label)
            .field("program", &self.program)
            .field("args", &self.args)
            .field("stdin", &self.stdin.as_ref().map(|bytes| bytes.len()))
            .finish()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a tool process ended. `code` is `None` when it was killed by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    pub code: Option<i32>,
}

impl ToolExit {
    pub fn is_success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external tool to completion.
pub trait ToolRunner {
    fn run(&mut self, invocation: &ToolInvocation) -> Result<ToolExit>;
}

/// Spawns real processes with their output discarded.
///
/// The wait polls the shutdown flag so that an interrupt kills and reaps the
/// child instead of leaving it orphaned.
pub struct SystemToolRunner {
    shutdown: GracefulShutdown,
}

impl SystemToolRunner {
    pub fn new(shutdown: GracefulShutdown) -> Self {
        Self { shutdown }
    }
}

impl ToolRunner for SystemToolRunner {
    fn run(&mut self, invocation: &ToolInvocation) -> Result<ToolExit> {
        self.shutdown.check_shutdown()?;

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LocresError::ToolLaunch {
                tool: invocation.program.display().to_string(),
                source,
            })?;

        if let (Some(payload), Some(mut stdin)) = (invocation.stdin.as_ref(), child.stdin.take()) {
            // A tool that exits without reading its input is not an error here
            match stdin.write_all(payload) {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(e.into());
                }
                _ => {}
            }
        }

        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(ToolExit {
                    code: status.code(),
                });
            }

            if !self.shutdown.is_running() {
                let _ = child.kill();
                let _ = child.wait();
                return Err(LocresError::Cancelled);
            }

            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unpack_arguments() {
        let invocation = ToolInvocation::unpack(
            Path::new("/tools/quickbms"),
            Path::new("/tools/ut4.bms"),
            Path::new("/game/en_US_Text.pak"),
            Path::new("/work"),
            b"0xKEY".to_vec(),
        );

        assert_eq!(invocation.program, PathBuf::from("/tools/quickbms"));
        assert_eq!(
            invocation.args,
            vec![
                OsString::from("/tools/ut4.bms"),
                OsString::from("/game/en_US_Text.pak"),
                OsString::from("/work"),
            ]
        );
        assert_eq!(invocation.stdin.as_deref(), Some(&b"0xKEY"[..]));
        assert!(!format!("{:?}", invocation).contains("0xKEY"));
    }

    #[test]
    fn test_export_arguments() {
        let invocation = ToolInvocation::export_table(
            Path::new("/tools/UnrealLocres"),
            Path::new("/work/Game.locres"),
            Path::new("/work/Game.csv"),
        );

        assert_eq!(
            invocation.to_string(),
            "/tools/UnrealLocres export /work/Game.locres -o /work/Game.csv"
        );
        assert!(invocation.stdin.is_none());
    }

    #[test]
    fn test_missing_program_is_a_launch_error() {
        let mut runner = SystemToolRunner::new(GracefulShutdown::new_for_test());
        let invocation = ToolInvocation::export_table(
            Path::new("/nonexistent/locres-tool"),
            Path::new("a.locres"),
            Path::new("a.csv"),
        );

        assert!(matches!(
            runner.run(&invocation),
            Err(LocresError::ToolLaunch { .. })
        ));
    }

    #[test]
    fn test_cancelled_before_launch() {
        let shutdown = GracefulShutdown::new_for_test();
        shutdown.request_shutdown();
        let mut runner = SystemToolRunner::new(shutdown);
        let invocation = ToolInvocation::export_table(
            Path::new("/nonexistent/locres-tool"),
            Path::new("a.locres"),
            Path::new("a.csv"),
        );

        assert!(matches!(runner.run(&invocation), Err(LocresError::Cancelled)));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_process_and_feeds_stdin() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let captured = temp_dir.path().join("captured");
        let invocation = ToolInvocation {
            label: "shell",
            program: PathBuf::from("/bin/sh"),
            args: vec![
                OsString::from("-c"),
                OsString::from(format!("cat > '{}'; exit 3", captured.display())),
            ],
            stdin: Some(b"secret".to_vec()),
        };

        let mut runner = SystemToolRunner::new(GracefulShutdown::new_for_test());
        let exit = runner.run(&invocation).unwrap();

        assert_eq!(exit.code, Some(3));
        assert!(!exit.is_success());
        assert_eq!(std::fs::read(&captured).unwrap(), b"secret");
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_kills_running_tool() {
        let shutdown = GracefulShutdown::new_for_test();
        let mut runner = SystemToolRunner::new(shutdown.clone());
        let invocation = ToolInvocation {
            label: "sleep",
            program: PathBuf::from("/bin/sh"),
            args: vec![OsString::from("-c"), OsString::from("sleep 30")],
            stdin: None,
        };

        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            shutdown.request_shutdown();
        });

        let started = std::time::Instant::now();
        let result = runner.run(&invocation);
        trigger.join().unwrap();

        assert!(matches!(result, Err(LocresError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
