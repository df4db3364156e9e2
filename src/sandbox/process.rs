//! Subprocess execution
//!
//! Runs code as a one-shot child of the host interpreter. Used for JavaScript
//! always and for Python whenever the container path is unavailable. There is
//! no memory/CPU ceiling on this path; the timeout is the only bound.

use async_trait::async_trait;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::InterpreterConfig;
use crate::error::{Error, Result};
use crate::sandbox::executor::{BatchRunner, ExecutionResult, Language};

/// How long to wait for pipes to drain after a timeout kill
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Interpreter invocation for a language: binary plus leading arguments
pub fn interpreter_command(interpreters: &InterpreterConfig, language: Language) -> (String, Vec<String>) {
    match language {
        Language::Python => (interpreters.python.clone(), vec!["-u".to_string()]),
        Language::JavaScript => (interpreters.node.clone(), Vec::new()),
    }
}

/// Human-readable message for an interpreter that could not be found
pub fn launch_failure_message(language: Language, binary: &str) -> String {
    match language {
        Language::JavaScript => {
            "Node.js is not installed. Please install Node.js to run JavaScript code.".to_string()
        }
        Language::Python => format!(
            "Python interpreter not found ({}). Please install Python 3 to run Python code.",
            binary
        ),
    }
}

/// Map a spawn error to the engine error taxonomy
pub fn spawn_error(language: Language, binary: &str, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::LaunchFailure {
            language,
            message: launch_failure_message(language, binary),
        }
    } else {
        Error::Io(err)
    }
}

/// Write `code` to a uniquely named file in `dir` with the language's extension.
///
/// The returned path deletes the file when closed or dropped.
pub fn write_source_file(dir: &Path, code: &str, language: Language) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("exec-")
        .suffix(language.extension())
        .tempfile_in(dir)?;
    file.write_all(code.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}

/// Delete a source file, logging instead of failing
pub fn remove_source_file(path: TempPath) {
    let location = path.to_path_buf();
    match path.close() {
        Ok(()) => debug!("Removed source file {}", location.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove source file {}: {}", location.display(), e),
    }
}

/// Exit code as the OS reports it; signal deaths map to the negated signal number
pub fn exit_code_of(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(-signal);
        }
    }
    None
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Pipe read ended with error: {}", e);
        }
    }
    buf
}

/// Subprocess batch runner
pub struct ProcessRunner {
    interpreters: InterpreterConfig,
    scratch_dir: PathBuf,
}

impl ProcessRunner {
    /// Create a new subprocess runner
    pub fn new(interpreters: InterpreterConfig, scratch_dir: PathBuf) -> Self {
        ProcessRunner {
            interpreters,
            scratch_dir,
        }
    }

    async fn run_source(
        &self,
        source: &Path,
        timeout: Duration,
        language: Language,
    ) -> Result<ExecutionResult> {
        let (binary, args) = interpreter_command(&self.interpreters, language);

        let mut command = Command::new(&binary);
        command
            .args(&args)
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| spawn_error(language, &binary, e))?;

        debug!("Spawned {} batch run (pid {:?})", language, child.id());

        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                let stdout = stdout_task.await.unwrap_or_default();
                let stderr = stderr_task.await.unwrap_or_default();

                let stdout = String::from_utf8_lossy(&stdout).into_owned();
                let stderr = String::from_utf8_lossy(&stderr).into_owned();
                let exit_code = exit_code_of(status).unwrap_or(0);

                let mut output = stdout;
                output.push_str(&stderr);

                let error = if exit_code != 0 { Some(stderr) } else { None };
                Ok(ExecutionResult::completed(exit_code, output, error))
            }
            Ok(Err(e)) => Err(Error::Io(e)),
            Err(_) => {
                warn!("{} batch run timed out after {:?}", language, timeout);
                if let Err(e) = child.kill().await {
                    debug!("Kill after timeout failed: {}", e);
                }

                // Drain the pipes; what arrived before the kill is discarded
                let drain = async {
                    let _ = stdout_task.await;
                    let _ = stderr_task.await;
                };
                if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
                    debug!("Pipes still open after kill, abandoning drain");
                }

                Ok(ExecutionResult::timeout())
            }
        }
    }
}

#[async_trait]
impl BatchRunner for ProcessRunner {
    fn name(&self) -> &str {
        "subprocess"
    }

    fn supports_language(&self, language: Language) -> bool {
        matches!(language, Language::Python | Language::JavaScript)
    }

    async fn run(&self, code: &str, timeout: Duration, language: Language) -> Result<ExecutionResult> {
        let source = match write_source_file(&self.scratch_dir, code, language) {
            Ok(path) => path,
            Err(e) => return Ok(ExecutionResult::failure(e.to_string())),
        };

        let result = self.run_source(&source, timeout, language).await;
        remove_source_file(source);

        Ok(result.unwrap_or_else(|e| ExecutionResult::failure(e.to_string())))
    }
}
