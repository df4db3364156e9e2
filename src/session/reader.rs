//! Pipe stream reader
//!
//! A dedicated thread performs the blocking reads on one pipe and pushes
//! chunks into a bounded channel. A consumer task on the async runtime polls
//! that channel with a short timeout, decodes the bytes and hands them to the
//! session callbacks.
//!
//! The worker reads one byte at a time and flushes its chunk when it sees a
//! newline, when the chunk reaches the size cap, or when the readiness probe
//! reports nothing further to read. That last rule is what gets prompts such
//! as `name: ` (no trailing newline) to the caller before the program blocks
//! on input.

use std::io::{ErrorKind, Read};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::events::SessionEvents;
use super::readiness::ReadinessProbe;
use super::RunControl;

/// Depth of the per-pipe chunk queue
pub const CHANNEL_DEPTH: usize = 64;

/// Message from a pipe worker to its consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// Bytes in production order
    Chunk(Vec<u8>),
    /// The pipe reached end-of-stream; nothing follows
    Eof,
}

/// Consumer tuning
#[derive(Debug, Clone, Copy)]
pub struct ReaderSettings {
    /// Bounded wait on the queue per poll
    pub poll_interval: Duration,
    /// Flush threshold for the worker
    pub max_chunk_bytes: usize,
    /// Empty polls in a row before checking whether the process exited
    pub exit_check_polls: u32,
}

/// Read `reader` to end-of-stream, emitting chunks as described in the module docs.
///
/// `emit` returns false once the receiving side is gone, which stops the loop.
pub fn pump<R, P, F>(mut reader: R, mut probe: P, max_chunk: usize, mut emit: F)
where
    R: Read,
    P: ReadinessProbe,
    F: FnMut(ReaderEvent) -> bool,
{
    let max_chunk = max_chunk.max(1);
    let mut chunk = Vec::with_capacity(max_chunk);
    let mut byte = [0u8; 1];

    loop {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                chunk.push(byte[0]);
                let flush = byte[0] == b'\n' || chunk.len() >= max_chunk || !probe.has_pending();
                if flush && !emit(ReaderEvent::Chunk(std::mem::take(&mut chunk))) {
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Pipe read failed: {}", e);
                break;
            }
        }
    }

    if !chunk.is_empty() && !emit(ReaderEvent::Chunk(chunk)) {
        return;
    }
    emit(ReaderEvent::Eof);
}

/// Start the blocking worker for one pipe on its own thread
pub fn spawn_pipe_worker<R, P>(
    name: String,
    reader: R,
    probe: P,
    max_chunk: usize,
    tx: mpsc::Sender<ReaderEvent>,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    R: Read + Send + 'static,
    P: ReadinessProbe,
{
    std::thread::Builder::new().name(name).spawn(move || {
        pump(reader, probe, max_chunk, |event| tx.blocking_send(event).is_ok());
    })
}

/// Incremental UTF-8 decoder.
///
/// Multi-byte characters split across chunks are held back until complete;
/// invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Decode as much of the buffered input as forms complete characters
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    out.push_str(text);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// Flush whatever is left at end-of-stream
    pub fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}

async fn deliver(text: String, is_error: bool, events: &dyn SessionEvents, control: &RunControl) {
    if text.is_empty() || control.is_stopped() {
        return;
    }
    events.on_output(text, is_error).await;
}

/// Forward one pipe's chunks to `events` until end-of-stream.
///
/// If the sentinel never arrives (a grandchild keeping the pipe open), the
/// consumer ends once the process has exited and the queue is drained.
pub async fn forward_stream(
    mut rx: mpsc::Receiver<ReaderEvent>,
    is_error: bool,
    events: &dyn SessionEvents,
    control: &RunControl,
    settings: ReaderSettings,
) {
    let mut decoder = Utf8Decoder::default();
    let mut idle_polls = 0u32;

    loop {
        match tokio::time::timeout(settings.poll_interval, rx.recv()).await {
            Ok(Some(ReaderEvent::Chunk(bytes))) => {
                idle_polls = 0;
                deliver(decoder.decode(&bytes), is_error, events, control).await;
            }
            Ok(Some(ReaderEvent::Eof)) | Ok(None) => break,
            Err(_) => {
                idle_polls = idle_polls.saturating_add(1);
                if idle_polls >= settings.exit_check_polls && control.has_exited() {
                    while let Ok(event) = rx.try_recv() {
                        if let ReaderEvent::Chunk(bytes) = event {
                            deliver(decoder.decode(&bytes), is_error, events, control).await;
                        }
                    }
                    warn!("Process exited without closing its pipe, detaching reader");
                    break;
                }
            }
        }
    }

    deliver(decoder.finish(), is_error, events, control).await;
}
