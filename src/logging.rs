//! Console logging plus a per-game `game.log`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::Local;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// `[HH:MM:SS.mmm]` in local time.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "[{}]", Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Log file of the game being played, swapped at game start and end.
///
/// Events logged while no game is open are only printed to the console.
#[derive(Clone, Default)]
pub struct SessionLog {
    file: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl SessionLog {
    /// Directs session output to `path`, appending.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if let Ok(mut guard) = self.file.lock() {
            *guard = Some(BufWriter::new(file));
        }
        Ok(())
    }

    /// Flushes and stops writing to the current file.
    pub fn close(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(mut file) = guard.take() {
                let _ = file.flush();
            }
        }
    }
}

pub struct SessionWriter {
    file: Arc<Mutex<Option<BufWriter<File>>>>,
}

impl Write for SessionWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(file) => file.write(buf),
                None => Ok(buf.len()),
            },
            Err(_) => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.lock() {
            Ok(mut guard) => match guard.as_mut() {
                Some(file) => file.flush(),
                None => Ok(()),
            },
            Err(_) => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for SessionLog {
    type Writer = SessionWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SessionWriter { file: Arc::clone(&self.file) }
    }
}

/// Installs the global subscriber and returns the session log handle.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logging() -> anyhow::Result<SessionLog> {
    let session = SessionLog::default();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console = tracing_subscriber::fmt::layer()
        .with_timer(LocalTimer)
        .with_target(false)
        .with_writer(io::stdout);
    let game_log = tracing_subscriber::fmt::layer()
        .with_timer(LocalTimer)
        .with_target(false)
        .with_ansi(false)
        .with_writer(session.clone());

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(game_log)
        .try_init()?;

    Ok(session)
}
