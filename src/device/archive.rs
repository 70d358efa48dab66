//! Background writer for frame screenshots.
//!
//! The play loop hands PNG bytes to a channel; a worker thread writes them
//! under the game's `screenshots/` directory so disk I/O never delays a frame.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::JoinHandle;

use tracing::{debug, warn};

/// A screenshot waiting to be written.
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    /// File name inside the screenshots directory
    pub name: String,
    pub png: Vec<u8>,
}

/// Runs the writer loop until every sender is dropped.
///
/// Write failures are logged and skipped; archiving never stops the game.
pub fn run_archive_worker(receiver: Receiver<ArchiveItem>, dir: PathBuf) {
    debug!("Archive worker started: {}", dir.display());

    while let Ok(item) = receiver.recv() {
        let path = dir.join(&item.name);
        if let Err(e) = std::fs::write(&path, &item.png) {
            warn!("Archive worker: failed to write {}: {}", path.display(), e);
        }
    }

    debug!("Archive worker: channel closed, exiting");
}

/// Handle to the archive worker of one game.
pub struct FrameArchive {
    sender: Option<Sender<ArchiveItem>>,
    handle: Option<JoinHandle<()>>,
}

impl FrameArchive {
    /// Creates `dir` and starts the writer thread.
    pub fn start(dir: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (sender, receiver) = channel();
        let dir = dir.to_path_buf();
        let handle = std::thread::Builder::new()
            .name("frame-archive".into())
            .spawn(move || run_archive_worker(receiver, dir))?;
        Ok(Self { sender: Some(sender), handle: Some(handle) })
    }

    /// Queues `<frame><suffix>.png`.
    pub fn save(&self, frame: u64, suffix: &str, png: &[u8]) {
        let Some(sender) = &self.sender else {
            return;
        };
        let item = ArchiveItem { name: format!("{}{}.png", frame, suffix), png: png.to_vec() };
        if sender.send(item).is_err() {
            warn!("Archive worker is gone, frame {} not saved", frame);
        }
    }

    /// Closes the queue and waits until everything queued is on disk.
    pub fn finish(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Archive worker panicked");
            }
        }
    }
}

impl Drop for FrameArchive {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_archive_writes_named_files() {
        let dir = tempdir().unwrap();
        let shots = dir.path().join("screenshots");

        let mut archive = FrameArchive::start(&shots).unwrap();
        archive.save(1, "", b"first");
        archive.save(7, "-pick", b"pick");
        archive.finish();

        assert_eq!(std::fs::read(shots.join("1.png")).unwrap(), b"first");
        assert_eq!(std::fs::read(shots.join("7-pick.png")).unwrap(), b"pick");
    }

    #[test]
    fn test_worker_exits_when_channel_closes() {
        let dir = tempdir().unwrap();
        let (sender, receiver) = channel::<ArchiveItem>();
        let path = dir.path().to_path_buf();
        let handle = std::thread::spawn(move || run_archive_worker(receiver, path));

        drop(sender);
        handle.join().expect("worker thread panicked");
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let dir = tempdir().unwrap();
        let (sender, receiver) = channel();
        let missing = dir.path().join("does-not-exist");
        let handle = std::thread::spawn(move || run_archive_worker(receiver, missing));

        sender.send(ArchiveItem { name: "1.png".into(), png: vec![1] }).unwrap();
        drop(sender);
        handle.join().expect("worker thread panicked");
    }

    #[test]
    fn test_save_after_finish_is_ignored() {
        let dir = tempdir().unwrap();
        let mut archive = FrameArchive::start(dir.path()).unwrap();
        archive.finish();
        archive.save(2, "", b"late");

        assert!(!dir.path().join("2.png").exists());
    }
}
