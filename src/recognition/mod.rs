//! Turns screenshots into card labels, called numbers and boost slots.

pub mod board;
pub mod called;
pub mod picks;
pub mod screen;

pub use board::read_board;
pub use called::read_called_number;
pub use picks::{read_pick_options, PickOption};
pub use screen::{board_is_ready, is_game_over, read_slots};
