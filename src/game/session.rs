use std::time::Instant;

use super::boost::{Boost, BoostSlots};
use super::card::{BoardMapping, Card};
use super::engine::BingoEngine;

/// Mutable state of one game, from the ready screen to game over.
pub struct GameSession<B: Boost> {
    pub card: Card,
    pub mapping: BoardMapping,
    pub engine: BingoEngine,
    pub slots: BoostSlots<B>,
    pub started_at: Instant,
    /// The reuse gate for multipliers counts from here; starts at game start.
    pub last_multiplier_at: Instant,
    /// Set once a pick boost has moved the called-ball layout.
    pub layout_shifted: bool,
    /// Last number read from the called ball, to log each call once.
    pub last_called: Option<String>,
}

impl<B: Boost> GameSession<B> {
    pub fn new(card: Card, mapping: BoardMapping, slot_count: usize, started_at: Instant) -> Self {
        Self {
            card,
            mapping,
            engine: BingoEngine::new(),
            slots: BoostSlots::empty(slot_count),
            started_at,
            last_multiplier_at: started_at,
            layout_shifted: false,
            last_called: None,
        }
    }

    /// Card numbers of the undaubed spots, best first.
    pub fn most_needed_numbers(&self) -> Vec<String> {
        self.engine
            .most_needed_spots()
            .into_iter()
            .filter_map(|spot| self.mapping.number_at(spot).map(str::to_string))
            .collect()
    }
}
