//! The bot's main loop as a state machine.
//!
//! A game goes WaitingForGame -> ReadingBoard -> Playing -> GameOver and
//! back to WaitingForGame until the requested number of games is played.
//! Each call to [`Bot::step`] does one unit of work, usually one frame.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{error, info, warn};

use crate::assets::AssetSet;
use crate::device::{capture, Device, FrameArchive, ScreenRecorder};
use crate::error::{BotError, Result};
use crate::game::{Boost, BoostPolicy, FrameContext, GameSession};
use crate::layout::VariantLayout;
use crate::logging::SessionLog;
use crate::ocr::DigitRecognizer;
use crate::paths::{game_dir, GamePaths};
use crate::pool::WorkerPool;
use crate::recognition::{board_is_ready, is_game_over, read_board, read_called_number, read_slots};
use crate::vision::{to_gray, top_strip};

/// Failed frames in a row before the bot gives up.
const MAX_CONSECUTIVE_ERRORS: u32 = 20;

#[derive(Debug, Clone, PartialEq)]
pub enum BotState {
    /// Polling for the game start screen
    WaitingForGame,
    /// Recognizing the card; `attempt` is 1-based
    ReadingBoard { attempt: u32 },
    Playing,
    GameOver,
    /// Requested number of games played
    Finished,
    Error(String),
}

impl fmt::Display for BotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotState::WaitingForGame => write!(f, "Waiting for game"),
            BotState::ReadingBoard { attempt } => write!(f, "Reading board (attempt {})", attempt),
            BotState::Playing => write!(f, "Playing"),
            BotState::GameOver => write!(f, "Game over"),
            BotState::Finished => write!(f, "Finished"),
            BotState::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Run options resolved from the command line and config file.
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Stop after this many games; play forever when unset
    pub games: Option<u32>,
    /// Root of the per-game directories
    pub output: PathBuf,
    pub archive_screenshots: bool,
    pub max_board_attempts: u32,
    pub final_recording_delay: Duration,
    pub poll_interval: Duration,
}

/// Output of the game in progress.
struct ActiveGame<B: Boost> {
    paths: GamePaths,
    archive: Option<FrameArchive>,
    session: Option<GameSession<B>>,
}

pub struct Bot<B: Boost, D: Device> {
    pub state: BotState,
    device: D,
    ocr: Box<dyn DigitRecognizer>,
    pool: WorkerPool,
    layout: VariantLayout,
    assets: AssetSet<B>,
    options: RunOptions,
    session_log: SessionLog,
    recorder: Option<ScreenRecorder>,
    game: Option<ActiveGame<B>>,
    games_played: u32,
    frame: u64,
    consecutive_errors: u32,
}

impl<B: Boost, D: Device> Bot<B, D> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        device: D,
        ocr: Box<dyn DigitRecognizer>,
        pool: WorkerPool,
        layout: VariantLayout,
        assets: AssetSet<B>,
        options: RunOptions,
        session_log: SessionLog,
        recorder: Option<ScreenRecorder>,
    ) -> Self {
        Self {
            state: BotState::WaitingForGame,
            device,
            ocr,
            pool,
            layout,
            assets,
            options,
            session_log,
            recorder,
            game: None,
            games_played: 0,
            frame: 0,
            consecutive_errors: 0,
        }
    }

    /// Steps until the bot finishes or fails, then releases the game output.
    pub fn run(&mut self) -> anyhow::Result<()> {
        info!("Starting {} bot", self.layout.name);
        while self.step() {}
        self.end_game();

        match &self.state {
            BotState::Error(msg) => Err(anyhow::anyhow!("{}", msg)),
            _ => {
                info!("Done: {} games played", self.games_played);
                Ok(())
            }
        }
    }

    /// Advances the state machine by one step.
    ///
    /// Returns `true` while there is more to do. Frame errors are logged and
    /// retried; an unsupported boost configuration or too many failures in a
    /// row move to [`BotState::Error`].
    pub fn step(&mut self) -> bool {
        let result = match self.state.clone() {
            BotState::WaitingForGame => self.wait_for_game(),
            BotState::ReadingBoard { attempt } => self.read_card(attempt),
            BotState::Playing => self.play_frame(),
            BotState::GameOver => {
                self.finish_game();
                Ok(())
            }
            BotState::Finished | BotState::Error(_) => return false,
        };

        match result {
            Ok(()) => self.consecutive_errors = 0,
            Err(e @ BotError::Unsupported { .. }) => {
                error!(frame = self.frame, "{}", e);
                self.state = BotState::Error(e.to_string());
            }
            Err(e) => {
                self.consecutive_errors += 1;
                warn!(frame = self.frame, "{} failed: {}", self.state, e);
                if self.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                    error!("Giving up after {} failed steps in a row", self.consecutive_errors);
                    self.state = BotState::Error(e.to_string());
                }
            }
        }

        !matches!(self.state, BotState::Finished | BotState::Error(_))
    }

    fn idle(&self) {
        if !self.options.poll_interval.is_zero() {
            std::thread::sleep(self.options.poll_interval);
        }
    }

    fn wait_for_game(&mut self) -> Result<()> {
        let (_, image) = capture(&mut self.device)?;
        if !board_is_ready(&image, &self.layout, &self.assets.game_start) {
            self.idle();
            return Ok(());
        }

        self.start_game();
        self.state = BotState::ReadingBoard { attempt: 1 };
        Ok(())
    }

    /// Opens the game's directory, log, screenshot archive and recording.
    fn start_game(&mut self) {
        let paths = GamePaths::new(game_dir(&self.options.output, Local::now()));
        if let Err(e) = paths.ensure() {
            warn!("Failed to create {}: {}", paths.dir.display(), e);
        }
        if let Err(e) = self.session_log.open(&paths.log) {
            warn!("Failed to open {}: {}", paths.log.display(), e);
        }
        info!("Game {} starting, output in {}", self.games_played + 1, paths.dir.display());

        let archive = if self.options.archive_screenshots {
            match FrameArchive::start(&paths.screenshots) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    warn!("Screenshots will not be archived: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if let Some(recorder) = self.recorder.as_mut() {
            if let Err(e) = recorder.start(paths.video.clone()) {
                warn!("Failed to start recording: {}", e);
            }
        }

        self.frame = 0;
        self.game = Some(ActiveGame { paths, archive, session: None });
    }

    fn read_card(&mut self, attempt: u32) -> Result<()> {
        let (_, image) = capture(&mut self.device)?;
        let gray = to_gray(&image);

        match read_board(&gray, &self.layout.cells, self.ocr.as_ref(), &self.pool) {
            Ok((card, mapping)) => {
                let session = GameSession::new(card, mapping, self.layout.slots.len(), Instant::now());
                info!("Card:\n{}", session.card);
                if let Some(game) = self.game.as_mut() {
                    game.session = Some(session);
                }
                self.state = BotState::Playing;
                Ok(())
            }
            Err(BotError::InvalidCard { found, detail }) => {
                warn!("Board read {}/{}: {} labels, {}", attempt, self.options.max_board_attempts, found, detail);
                if attempt >= self.options.max_board_attempts {
                    error!("Could not read the card, abandoning this game");
                    self.end_game();
                    self.state = BotState::WaitingForGame;
                } else {
                    self.state = BotState::ReadingBoard { attempt: attempt + 1 };
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn play_frame(&mut self) -> Result<()> {
        let Some(game) = self.game.as_mut() else {
            self.state = BotState::WaitingForGame;
            return Ok(());
        };
        let Some(session) = game.session.as_mut() else {
            self.state = BotState::ReadingBoard { attempt: 1 };
            return Ok(());
        };

        self.frame += 1;
        let (png, image) = capture(&mut self.device)?;
        if let Some(archive) = game.archive.as_ref() {
            archive.save(self.frame, "", &png);
        }

        let gray = to_gray(&image);
        let strip = top_strip(&gray, self.layout.called.strip_divisor);
        let slots = read_slots(&image, &self.layout, &self.assets.boosts, &self.pool);
        let called = read_called_number(
            &strip,
            &self.layout.called,
            &self.assets.templates,
            session.layout_shifted,
            self.ocr.as_ref(),
        )?;

        let mut ctx = FrameContext {
            device: &mut self.device,
            ocr: self.ocr.as_ref(),
            pool: &self.pool,
            layout: &self.layout,
            archive: game.archive.as_ref(),
            frame: self.frame,
            now: Instant::now(),
        };
        let actions = BoostPolicy::new(session, &mut ctx).play(&called, slots)?;
        for action in &actions {
            info!(frame = self.frame, number = %called, action = %action, "{}", action);
        }

        if is_game_over(&image, &self.layout, &self.assets.game_over) {
            info!(frame = self.frame, "Game over detected");
            self.state = BotState::GameOver;
        } else {
            self.idle();
        }
        Ok(())
    }

    fn finish_game(&mut self) {
        let delay = self.options.final_recording_delay;
        if self.recorder.as_ref().is_some_and(ScreenRecorder::is_recording) && !delay.is_zero() {
            info!("Recording the final screen for {}s", delay.as_secs());
            std::thread::sleep(delay);
        }

        if let Some(session) = self.game.as_ref().and_then(|g| g.session.as_ref()) {
            info!(
                "Game {} over after {} frames in {:.0}s\n{}",
                self.games_played + 1,
                self.frame,
                session.started_at.elapsed().as_secs_f32(),
                session.engine.grid()
            );
        }
        self.end_game();
        self.games_played += 1;

        self.state = match self.options.games {
            Some(games) if self.games_played >= games => BotState::Finished,
            _ => BotState::WaitingForGame,
        };
    }

    /// Stops the recording, drains the archive and closes the game log.
    fn end_game(&mut self) {
        if let Some(recorder) = self.recorder.as_mut() {
            if recorder.is_recording() {
                recorder.stop();
            }
        }
        if let Some(mut game) = self.game.take() {
            if let Some(archive) = game.archive.as_mut() {
                archive.finish();
            }
            info!("Game output saved to {}", game.paths.dir.display());
        }
        self.session_log.close();
    }
}
