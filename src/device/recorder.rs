//! Records the WDA MJPEG stream to a file on a background thread.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

pub const BOUNDARY: &[u8] = b"--BoundaryString";
const HEADER_END: &[u8] = b"\r\n\r\n";
const JPEG_START: &[u8] = &[0xFF, 0xD8];
const CHUNK_SIZE: usize = 1024;
/// A part that grows past this without a closing boundary is discarded.
const MAX_BUFFERED: usize = 8 * 1024 * 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// How often the recorder re-checks its stop flag while the stream is silent.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Splits a multipart MJPEG byte stream into JPEG frames.
#[derive(Debug, Default)]
pub struct MjpegSplitter {
    buffer: Vec<u8>,
    /// Bytes of the open part already searched for the closing boundary.
    scanned: usize,
}

impl MjpegSplitter {
    /// Feeds bytes from the stream and returns every frame they completed.
    ///
    /// A part is complete once the next boundary has arrived. Parts whose
    /// payload is not a JPEG are dropped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if !self.buffer.starts_with(BOUNDARY) {
                match find(&self.buffer, BOUNDARY) {
                    Some(first) => {
                        self.buffer.drain(..first);
                        self.scanned = 0;
                    }
                    None => {
                        self.keep_tail();
                        break;
                    }
                }
            }

            let from = self.scanned.saturating_sub(BOUNDARY.len() - 1).max(BOUNDARY.len());
            let Some(len) = find(&self.buffer[from..], BOUNDARY) else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > MAX_BUFFERED {
                    warn!("Dropping {} bytes of MJPEG data without a boundary", self.buffer.len());
                    self.keep_tail();
                }
                break;
            };
            let next = from + len;

            let part = &self.buffer[BOUNDARY.len()..next];
            if let Some(header_end) = find(part, HEADER_END) {
                let mut payload = &part[header_end + HEADER_END.len()..];
                while let Some(stripped) = payload.strip_suffix(b"\r\n") {
                    payload = stripped;
                }
                if payload.starts_with(JPEG_START) {
                    frames.push(payload.to_vec());
                }
            }
            self.buffer.drain(..next);
            self.scanned = 0;
        }

        frames
    }

    /// Keeps only the bytes that could still begin a boundary.
    fn keep_tail(&mut self) {
        let keep = BOUNDARY.len() - 1;
        let drop = self.buffer.len().saturating_sub(keep);
        self.buffer.drain(..drop);
        self.scanned = 0;
    }

    #[cfg(test)]
    fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Connects to `url` and forwards the body in chunks on a detached thread.
///
/// Reads on a stalled stream never return, so they are kept off the
/// recording thread. The reader exits on the first send after the
/// receiver is gone.
fn spawn_reader(url: String) -> Result<Receiver<Result<Vec<u8>>>> {
    let (tx, rx) = mpsc::sync_channel(64);

    std::thread::Builder::new()
        .name("mjpeg-reader".into())
        .spawn(move || {
            let mut response = match open_stream(&url) {
                Ok(response) => response,
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            };
            let mut chunk = [0u8; CHUNK_SIZE];
            loop {
                let message = match response.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(read) => Ok(chunk[..read].to_vec()),
                    Err(e) => Err(anyhow!(e).context("Failed to read MJPEG stream")),
                };
                let failed = message.is_err();
                if tx.send(message).is_err() || failed {
                    break;
                }
            }
        })?;

    Ok(rx)
}

fn open_stream(url: &str) -> Result<reqwest::blocking::Response> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(None)
        .build()?;
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to connect to MJPEG stream at {}", url))?;
    if !response.status().is_success() {
        return Err(anyhow!("MJPEG stream returned HTTP {}", response.status()));
    }
    Ok(response)
}

fn record_stream(url: &str, output: &Path, recording: &AtomicBool) -> Result<u64> {
    let chunks = spawn_reader(url.to_string())?;

    let file = File::create(output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let mut writer = BufWriter::new(file);
    let mut splitter = MjpegSplitter::default();
    let mut frames = 0u64;

    while recording.load(Ordering::SeqCst) {
        let bytes = match chunks.recv_timeout(POLL_INTERVAL) {
            Ok(bytes) => bytes?,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("MJPEG stream ended");
                break;
            }
        };
        for frame in splitter.push(&bytes) {
            writer.write_all(&frame)?;
            frames += 1;
        }
    }

    writer.flush()?;
    Ok(frames)
}

/// Screen recorder driven by an explicit start/stop flag.
pub struct ScreenRecorder {
    url: String,
    recording: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ScreenRecorder {
    pub fn new(url: String) -> Self {
        Self { url, recording: Arc::new(AtomicBool::new(false)), thread: None }
    }

    pub fn is_recording(&self) -> bool {
        self.thread.is_some()
    }

    /// Starts writing the stream to `output`.
    pub fn start(&mut self, output: PathBuf) -> Result<()> {
        if self.thread.is_some() {
            return Err(anyhow!("Recording already in progress"));
        }

        self.recording.store(true, Ordering::SeqCst);
        let recording = Arc::clone(&self.recording);
        let url = self.url.clone();

        let handle = std::thread::Builder::new()
            .name("screen-recorder".into())
            .spawn(move || match record_stream(&url, &output, &recording) {
                Ok(frames) => info!("Saved {} video frames to {}", frames, output.display()),
                Err(e) => warn!("Screen recording failed: {:#}", e),
            })?;
        self.thread = Some(handle);
        Ok(())
    }

    /// Stops recording and returns once the file is flushed.
    pub fn stop(&mut self) {
        self.recording.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("Screen recorder thread panicked");
            }
        }
    }
}

impl Drop for ScreenRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
