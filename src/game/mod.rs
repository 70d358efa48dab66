//! Game state and decisions: card, daub grid, boosts and per-frame policy.

pub mod boost;
pub mod card;
pub mod engine;
pub mod policy;
pub mod session;

pub use boost::{Boost, CashBoost, KingBoost};
pub use policy::{BoostPolicy, FrameContext};
pub use session::GameSession;
