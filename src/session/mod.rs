//! Interactive sessions
//!
//! A session is one live run of user code that can read caller-supplied input
//! while it executes. The [`SessionManager`] owns the table of live sessions;
//! nothing else mutates it. Per run it spawns the interpreter with piped
//! stdio, starts a [`reader`] per output pipe and a [`governor`], and tears
//! the session down exactly once, whichever of natural exit, `stop` or
//! timeout ends it.

pub mod events;
pub mod governor;
pub mod reader;
pub mod readiness;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{DuplicatePolicy, InterpreterConfig, SessionConfig};
use crate::error::{Error, Result};
use crate::sandbox::process::{
    exit_code_of, interpreter_command, remove_source_file, spawn_error, write_source_file,
};
use crate::sandbox::Language;

pub use events::{SessionEvent, SessionEvents};
pub use governor::TimeoutGovernor;
pub use reader::{ReaderEvent, ReaderSettings, Utf8Decoder};
pub use readiness::{NeverPending, ReadinessProbe};

/// Exit code reported when a run never started
pub const NOT_STARTED: i32 = -1;

/// Shared state of one run, seen by the waiter, readers, governor and `stop`
#[derive(Debug, Default)]
pub struct RunControl {
    kill: Notify,
    kill_requested: AtomicBool,
    exited: AtomicBool,
    stopped: AtomicBool,
}

impl RunControl {
    /// Ask the waiter to force-kill the process; idempotent
    pub fn kill(&self) {
        if !self.kill_requested.swap(true, Ordering::SeqCst) {
            self.kill.notify_one();
        }
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::SeqCst)
    }

    async fn killed(&self) {
        self.kill.notified().await
    }

    pub fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Explicit stop: silence further callbacks and kill if still running
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if !self.has_exited() {
            self.kill();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Registry entry for a live session
struct SessionEntry {
    /// Distinguishes this run from a later one reusing the id
    run_id: Uuid,
    language: Language,
    source: TempPath,
    timeout: Duration,
    created_at: DateTime<Utc>,
    /// Lines queued for the session's stdin writer
    input: mpsc::UnboundedSender<String>,
    control: Arc<RunControl>,
}

impl SessionEntry {
    /// Kill if needed and delete the source file; consumes the entry so it runs once
    fn teardown(self) {
        self.control.stop();
        remove_source_file(self.source);
    }
}

/// Snapshot of a live session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub language: Language,
    pub temp_path: PathBuf,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub created_at: DateTime<Utc>,
}

type SessionTable = HashMap<String, SessionEntry>;

/// Owner of the live-session table.
///
/// The table lock is only held for synchronous bookkeeping, never across an
/// `.await`, so cleanup can also run from `Drop`.
pub struct SessionManager {
    sessions: Mutex<SessionTable>,
    interpreters: InterpreterConfig,
    settings: SessionConfig,
}

impl SessionManager {
    /// Create a manager with an empty session table
    pub fn new(interpreters: InterpreterConfig, settings: SessionConfig) -> Self {
        SessionManager {
            sessions: Mutex::new(HashMap::new()),
            interpreters,
            settings,
        }
    }

    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reader_settings(&self) -> ReaderSettings {
        ReaderSettings {
            poll_interval: self.settings.poll_interval(),
            max_chunk_bytes: self.settings.max_chunk_bytes,
            exit_check_polls: self.settings.exit_check_polls,
        }
    }

    /// Run `code` as a live session and resolve with its exit code.
    ///
    /// Output streams to `events.on_output` as it is produced. Unless the
    /// session is stopped, `events.on_done` fires exactly once, after the last
    /// output. Failures to launch are reported through the same callbacks and
    /// resolve to [`NOT_STARTED`].
    ///
    /// Dropping the returned future kills the process and removes the session.
    pub async fn start(
        &self,
        session_id: &str,
        code: &str,
        timeout: Duration,
        language: Language,
        events: Arc<dyn SessionEvents>,
    ) -> i32 {
        let Launched {
            run_id,
            mut child,
            stdout,
            stderr,
            control,
        } = match self.launch(session_id, code, timeout, language) {
            Ok(launched) => launched,
            Err(e) => {
                warn!("Session {} did not start: {}", session_id, e);
                let mut message = e.to_string();
                message.push('\n');
                events.on_output(message, true).await;
                events.on_done(NOT_STARTED).await;
                return NOT_STARTED;
            }
        };

        let registration = Registration {
            manager: self,
            session_id,
            run_id,
        };

        info!("Session {} started ({}, timeout {:?})", session_id, language, timeout);

        let settings = self.reader_settings();
        let (stdout_tx, stdout_rx) = mpsc::channel(reader::CHANNEL_DEPTH);
        let (stderr_tx, stderr_rx) = mpsc::channel(reader::CHANNEL_DEPTH);
        spawn_worker(format!("{}-stdout", session_id), stdout, settings.max_chunk_bytes, stdout_tx);
        spawn_worker(format!("{}-stderr", session_id), stderr, settings.max_chunk_bytes, stderr_tx);

        let governor = TimeoutGovernor::spawn(timeout, control.clone(), events.clone());

        let waiter = async {
            let status = tokio::select! {
                status = child.wait() => status,
                _ = control.killed() => {
                    if let Err(e) = child.start_kill() {
                        debug!("Kill of session {} failed: {}", session_id, e);
                    }
                    child.wait().await
                }
            };
            control.mark_exited();
            status
        };

        let (status, (), ()) = tokio::join!(
            waiter,
            reader::forward_stream(stdout_rx, false, events.as_ref(), &control, settings),
            reader::forward_stream(stderr_rx, true, events.as_ref(), &control, settings),
        );

        governor.cancel().await;
        drop(registration);

        let exit_code = match status {
            Ok(status) => exit_code_of(status).unwrap_or(0),
            Err(e) => {
                warn!("Waiting on session {} failed: {}", session_id, e);
                NOT_STARTED
            }
        };

        if control.is_stopped() {
            info!("Session {} stopped (exit code {})", session_id, exit_code);
        } else {
            info!("Session {} finished with exit code {}", session_id, exit_code);
            events.on_done(exit_code).await;
        }

        exit_code
    }

    /// Write the source, spawn the interpreter and register the session
    fn launch(
        &self,
        session_id: &str,
        code: &str,
        timeout: Duration,
        language: Language,
    ) -> Result<Launched> {
        let mut sessions = self.table();

        if sessions.contains_key(session_id) {
            match self.settings.on_duplicate {
                DuplicatePolicy::Reject => return Err(Error::SessionBusy(session_id.to_string())),
                DuplicatePolicy::Replace => {
                    if let Some(previous) = sessions.remove(session_id) {
                        info!("Replacing running session {}", session_id);
                        previous.teardown();
                    }
                }
            }
        }

        let source = write_source_file(&self.settings.scratch_dir, code, language)?;
        let (binary, args) = interpreter_command(&self.interpreters, language);

        let mut command = Command::new(&binary);
        command
            .args(&args)
            .arg(&*source)
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                remove_source_file(source);
                return Err(spawn_error(language, &binary, e));
            }
        };

        let pipes = child
            .stdout
            .take()
            .zip(child.stderr.take())
            .ok_or_else(|| Error::Internal("child output pipes missing".to_string()))
            .and_then(|(stdout, stderr)| Ok((stdout_file(stdout)?, stderr_file(stderr)?)));

        let (stdout, stderr) = match pipes {
            Ok(pipes) => pipes,
            Err(e) => {
                let _ = child.start_kill();
                remove_source_file(source);
                return Err(e);
            }
        };

        let (input, input_rx) = mpsc::unbounded_channel();
        if let Some(stdin) = child.stdin.take() {
            tokio::spawn(write_input(session_id.to_string(), stdin, input_rx));
        }

        let run_id = Uuid::new_v4();
        let control = Arc::new(RunControl::default());

        sessions.insert(
            session_id.to_string(),
            SessionEntry {
                run_id,
                language,
                source,
                timeout,
                created_at: Utc::now(),
                input,
                control: control.clone(),
            },
        );

        Ok(Launched {
            run_id,
            child,
            stdout,
            stderr,
            control,
        })
    }

    /// Remove the session if it is still this run's entry, then clean up
    fn deregister(&self, session_id: &str, run_id: Uuid) {
        let entry = {
            let mut sessions = self.table();
            match sessions.get(session_id) {
                Some(entry) if entry.run_id == run_id => sessions.remove(session_id),
                _ => None,
            }
        };

        if let Some(entry) = entry {
            remove_source_file(entry.source);
        }
    }

    /// Queue `text` plus a newline for the session's stdin.
    ///
    /// Returns immediately. The line is written and flushed by the session's
    /// writer task, so a program that is not reading never blocks the caller.
    /// Returns false if the session is unknown, finished, or its input closed.
    pub async fn send_input(&self, session_id: &str, text: &str) -> bool {
        let sessions = self.table();
        let Some(entry) = sessions.get(session_id).filter(|e| !e.control.has_exited()) else {
            debug!("Input for unknown or finished session {}", session_id);
            return false;
        };

        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        entry.input.send(line).is_ok()
    }

    /// Kill the session if running and clean it up.
    ///
    /// Does not call `on_done`; the caller reports the stop itself.
    pub async fn stop(&self, session_id: &str) {
        let entry = self.table().remove(session_id);

        match entry {
            Some(entry) => {
                info!("Stopping session {}", session_id);
                entry.teardown();
            }
            None => debug!("Stop for unknown session {}", session_id),
        }
    }

    /// Stop every live session
    pub async fn stop_all(&self) {
        let entries: Vec<SessionEntry> = self.table().drain().map(|(_, e)| e).collect();
        for entry in entries {
            entry.teardown();
        }
    }

    /// Snapshot of one live session
    pub async fn session_info(&self, session_id: &str) -> Option<SessionInfo> {
        self.table()
            .get(session_id)
            .map(|entry| session_info(session_id, entry))
    }

    /// Snapshots of all live sessions
    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.table()
            .iter()
            .map(|(id, entry)| session_info(id, entry))
            .collect()
    }

    pub async fn is_active(&self, session_id: &str) -> bool {
        self.table().contains_key(session_id)
    }
}

/// Removes a run's table entry and source file when dropped, including when
/// the `start` future is cancelled mid-run
struct Registration<'a> {
    manager: &'a SessionManager,
    session_id: &'a str,
    run_id: Uuid,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.manager.deregister(self.session_id, self.run_id);
    }
}

fn session_info(id: &str, entry: &SessionEntry) -> SessionInfo {
    SessionInfo {
        id: id.to_string(),
        language: entry.language,
        temp_path: entry.source.to_path_buf(),
        timeout: entry.timeout,
        created_at: entry.created_at,
    }
}

/// Feed queued lines to the child's stdin until the session ends or the pipe closes
async fn write_input(session_id: String, mut stdin: ChildStdin, mut lines: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        let written = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.flush().await
        };
        if let Err(e) = written.await {
            debug!("Input pipe of session {} closed: {}", session_id, e);
            break;
        }
    }
}

/// A spawned, registered run
struct Launched {
    run_id: Uuid,
    child: tokio::process::Child,
    stdout: File,
    stderr: File,
    control: Arc<RunControl>,
}

fn spawn_worker(name: String, pipe: File, max_chunk: usize, tx: mpsc::Sender<ReaderEvent>) {
    let probe = readiness::probe_for(&pipe);
    if let Err(e) = reader::spawn_pipe_worker(name.clone(), pipe, probe, max_chunk, tx) {
        // The dropped sender ends the consumer, which then waits on process exit
        warn!("Failed to start pipe worker {}: {}", name, e);
    }
}

#[cfg(unix)]
fn stdout_file(pipe: ChildStdout) -> Result<File> {
    Ok(File::from(pipe.into_owned_fd()?))
}

#[cfg(unix)]
fn stderr_file(pipe: ChildStderr) -> Result<File> {
    Ok(File::from(pipe.into_owned_fd()?))
}

#[cfg(windows)]
fn stdout_file(pipe: ChildStdout) -> Result<File> {
    Ok(File::from(pipe.into_owned_handle()?))
}

#[cfg(windows)]
fn stderr_file(pipe: ChildStderr) -> Result<File> {
    Ok(File::from(pipe.into_owned_handle()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn manager(dir: &std::path::Path) -> Arc<SessionManager> {
        let settings = SessionConfig {
            scratch_dir: dir.to_path_buf(),
            ..SessionConfig::default()
        };
        Arc::new(SessionManager::new(InterpreterConfig::default(), settings))
    }

    /// Wait for the next output event, failing the test after `within`
    async fn next_output(rx: &mut UnboundedReceiver<SessionEvent>, within: Duration) -> (String, bool) {
        match tokio::time::timeout(within, rx.recv()).await {
            Ok(Some(SessionEvent::Output { text, is_error })) => (text, is_error),
            other => panic!("expected output event, got {:?}", other),
        }
    }

    fn spawn_session(
        manager: &Arc<SessionManager>,
        id: &str,
        code: &str,
        timeout: Duration,
    ) -> (tokio::task::JoinHandle<i32>, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = manager.clone();
        let id = id.to_string();
        let code = code.to_string();
        let handle = tokio::spawn(async move {
            manager.start(&id, &code, timeout, Language::Python, Arc::new(tx)).await
        });
        (handle, rx)
    }

    fn split_events(events: &[SessionEvent]) -> (String, Vec<i32>) {
        let mut text = String::new();
        let mut done = Vec::new();
        for event in events {
            match event {
                SessionEvent::Output { text: t, .. } => text.push_str(t),
                SessionEvent::Done { exit_code } => done.push(*exit_code),
            }
        }
        (text, done)
    }

    async fn collect_all(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_prompt_without_newline_then_input() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "s1",
            "print(\"name: \", end=\"\"); x=input(); print(x)",
            Duration::from_secs(10),
        );

        // Prompt arrives before any input is sent
        let (prompt, is_error) = next_output(&mut rx, Duration::from_secs(5)).await;
        assert_eq!(prompt, "name: ");
        assert!(!is_error);

        assert!(manager.send_input("s1", "Ada").await);

        let exit_code = handle.await.unwrap();
        assert_eq!(exit_code, 0);

        let events = collect_all(&mut rx).await;
        let (rest, done) = split_events(&events);
        assert_eq!(format!("{}{}", prompt, rest), "name: Ada\n");
        assert_eq!(done, vec![0]);
        assert!(matches!(events.last(), Some(SessionEvent::Done { .. })));
        assert!(!manager.is_active("s1").await);
    }

    #[tokio::test]
    async fn test_source_file_removed_after_natural_exit() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "s2",
            "print('ready')\ninput()",
            Duration::from_secs(10),
        );

        next_output(&mut rx, Duration::from_secs(5)).await;
        let info = manager.session_info("s2").await.unwrap();
        assert_eq!(info.language, Language::Python);
        assert!(info.temp_path.exists());
        assert_eq!(info.temp_path.extension().unwrap(), "py");

        assert!(manager.send_input("s2", "").await);
        assert_eq!(handle.await.unwrap(), 0);
        assert!(!info.temp_path.exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_and_reports() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let started = std::time::Instant::now();
        let (handle, mut rx) = spawn_session(
            &manager,
            "s3",
            "import time; time.sleep(100)",
            Duration::from_secs(1),
        );

        let exit_code = handle.await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_ne!(exit_code, 0);

        let events = collect_all(&mut rx).await;
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::Output { text, is_error: true } if text.contains("timed out")
        )));
        assert_eq!(split_events(&events).1.len(), 1);
        assert!(matches!(events.last(), Some(SessionEvent::Done { .. })));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_stop_kills_without_done() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "s4",
            "print('waiting')\ninput()",
            Duration::from_secs(30),
        );

        next_output(&mut rx, Duration::from_secs(5)).await;
        let path = manager.session_info("s4").await.unwrap().temp_path;

        manager.stop("s4").await;
        assert!(!path.exists());
        assert!(!manager.is_active("s4").await);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        let events = collect_all(&mut rx).await;
        assert!(split_events(&events).1.is_empty());

        // Stopping again is a no-op
        manager.stop("s4").await;
    }

    #[tokio::test]
    async fn test_send_input_to_unknown_session() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        assert!(!manager.send_input("nobody", "hello").await);
    }

    #[tokio::test]
    async fn test_send_input_after_finish() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, _rx) = spawn_session(&manager, "s5", "print('done')", Duration::from_secs(10));
        assert_eq!(handle.await.unwrap(), 0);
        assert!(!manager.send_input("s5", "late").await);
    }

    #[tokio::test]
    async fn test_duplicate_start_rejected() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (first, mut first_rx) = spawn_session(
            &manager,
            "dup",
            "print('first')\ninput()",
            Duration::from_secs(30),
        );
        next_output(&mut first_rx, Duration::from_secs(5)).await;

        let (second, mut second_rx) = spawn_session(&manager, "dup", "print('second')", Duration::from_secs(5));
        assert_eq!(second.await.unwrap(), NOT_STARTED);
        let events = collect_all(&mut second_rx).await;
        let (text, done) = split_events(&events);
        assert!(text.contains("already running"));
        assert_eq!(done, vec![NOT_STARTED]);

        // The first run is untouched
        assert!(manager.send_input("dup", "go").await);
        assert_eq!(first.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_start_replaces_when_configured() {
        let dir = tempdir().unwrap();
        let settings = SessionConfig {
            scratch_dir: dir.path().to_path_buf(),
            on_duplicate: DuplicatePolicy::Replace,
            ..SessionConfig::default()
        };
        let manager = Arc::new(SessionManager::new(InterpreterConfig::default(), settings));

        let (first, mut first_rx) = spawn_session(
            &manager,
            "dup",
            "print('first')\ninput()",
            Duration::from_secs(30),
        );
        next_output(&mut first_rx, Duration::from_secs(5)).await;

        let (second, mut second_rx) = spawn_session(&manager, "dup", "print('second')", Duration::from_secs(10));
        assert_eq!(second.await.unwrap(), 0);
        let (text, done) = split_events(&collect_all(&mut second_rx).await);
        assert_eq!(text, "second\n");
        assert_eq!(done, vec![0]);

        tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .unwrap()
            .unwrap();
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_stderr_flagged_as_error() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "s6",
            "import sys\nsys.stderr.write('bad\\n')\nsys.exit(3)",
            Duration::from_secs(10),
        );

        assert_eq!(handle.await.unwrap(), 3);
        let events = collect_all(&mut rx).await;
        let stderr: String = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Output { text, is_error: true } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(stderr, "bad\n");
        assert_eq!(events.last(), Some(&SessionEvent::Done { exit_code: 3 }));
    }

    #[tokio::test]
    async fn test_cancelled_start_cleans_up() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "gone",
            "print('x')\ninput()",
            Duration::from_secs(30),
        );

        next_output(&mut rx, Duration::from_secs(5)).await;
        assert!(manager.is_active("gone").await);

        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        assert!(!manager.is_active("gone").await);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

        // The id is free again
        let (again, _rx) = spawn_session(&manager, "gone", "print(1)", Duration::from_secs(10));
        assert_eq!(again.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_send_input_does_not_wait_for_reader() {
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (handle, mut rx) = spawn_session(
            &manager,
            "deaf",
            "import time\nprint('sleeping')\ntime.sleep(30)",
            Duration::from_secs(30),
        );
        next_output(&mut rx, Duration::from_secs(5)).await;

        // Far more than a pipe buffer holds, and the program never reads it
        let payload = "x".repeat(1 << 20);
        let started = std::time::Instant::now();
        assert!(manager.send_input("deaf", &payload).await);
        assert!(manager.send_input("deaf", "more").await);
        assert!(started.elapsed() < Duration::from_millis(200));

        manager.stop("deaf").await;
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_javascript_readline_round_trip() {
        if which::which("node").is_err() {
            return;
        }
        let dir = tempdir().unwrap();
        let manager = manager(dir.path());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let runner = manager.clone();
        let code = "const rl = require('readline').createInterface({ input: process.stdin });\n\
                    process.stdout.write('name: ');\n\
                    rl.on('line', (line) => { console.log('hi ' + line); rl.close(); });\n";
        let handle = tokio::spawn(async move {
            runner
                .start("js1", code, Duration::from_secs(10), Language::JavaScript, Arc::new(tx))
                .await
        });

        let mut seen = String::new();
        while seen != "name: " {
            let (text, is_error) = next_output(&mut rx, Duration::from_secs(5)).await;
            assert!(!is_error, "unexpected stderr: {}", text);
            seen.push_str(&text);
        }
        assert!(manager.send_input("js1", "Ada").await);

        assert_eq!(handle.await.unwrap(), 0);
        let (rest, done) = split_events(&collect_all(&mut rx).await);
        assert_eq!(format!("{}{}", seen, rest), "name: hi Ada\n");
        assert_eq!(done, vec![0]);
    }

    #[tokio::test]
    async fn test_missing_interpreter_reports_launch_failure() {
        let dir = tempdir().unwrap();
        let interpreters = InterpreterConfig {
            python: "no-such-python-xyz".to_string(),
            ..InterpreterConfig::default()
        };
        let settings = SessionConfig {
            scratch_dir: dir.path().to_path_buf(),
            ..SessionConfig::default()
        };
        let manager = SessionManager::new(interpreters, settings);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let exit_code = manager
            .start("s7", "print(1)", Duration::from_secs(5), Language::Python, Arc::new(tx))
            .await;

        assert_eq!(exit_code, NOT_STARTED);
        let (text, done) = split_events(&collect_all(&mut rx).await);
        assert!(text.contains("Python interpreter not found"));
        assert_eq!(done, vec![NOT_STARTED]);
        assert!(!manager.is_active("s7").await);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
