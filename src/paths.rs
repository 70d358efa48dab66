use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Local};

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Resolves a relative path against the executable directory.
pub fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        get_exe_dir().join(path)
    }
}

/// Returns the default config path: `<exe_dir>/config.json`
pub fn default_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the asset directory of a variant: `<exe_dir>/assets/<variant>/`
pub fn default_assets_dir(variant: &str) -> PathBuf {
    get_exe_dir().join("assets").join(variant)
}

/// Returns the default output root: `<exe_dir>/games/`
pub fn default_games_dir() -> PathBuf {
    get_exe_dir().join("games")
}

/// Per-game output directory, named after the game's start time.
pub fn game_dir(root: &Path, started: DateTime<Local>) -> PathBuf {
    root.join(started.format("%Y%m%d_%H%M%S").to_string())
}

/// Files written for one game.
#[derive(Clone, Debug)]
pub struct GamePaths {
    pub dir: PathBuf,
    pub log: PathBuf,
    pub screenshots: PathBuf,
    pub video: PathBuf,
}

impl GamePaths {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            log: dir.join("game.log"),
            screenshots: dir.join("screenshots"),
            video: dir.join("video.mjpeg"),
            dir,
        }
    }

    /// Creates the game directory and its screenshot folder.
    pub fn ensure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.screenshots)
    }
}
