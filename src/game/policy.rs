//! Per-frame decisions: daubing the called number and spending boosts.
//!
//! A frame runs in a fixed order, each step seeing the grid and slots left
//! by the previous one: called-number daub (with multiplier gating and bingo
//! claim), jump boosts, the pick boost, then extra time.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::boost::{Boost, BoostRole, BoostSlots};
use super::engine::DaubOutcome;
use super::session::GameSession;
use crate::device::{Device, FrameArchive};
use crate::error::{BotError, Result};
use crate::layout::{PickLayout, VariantLayout};
use crate::ocr::DigitRecognizer;
use crate::pool::WorkerPool;
use crate::recognition::picks::choose;
use crate::recognition::{read_pick_options, PickOption};
use crate::vision::to_gray;

/// Most bubbles a pick boost ever offers.
const MAX_PICK_CANDIDATES: usize = 4;

/// Everything a frame's decisions act through.
pub struct FrameContext<'a> {
    pub device: &'a mut dyn Device,
    pub ocr: &'a dyn DigitRecognizer,
    pub pool: &'a WorkerPool,
    pub layout: &'a VariantLayout,
    pub archive: Option<&'a FrameArchive>,
    pub frame: u64,
    pub now: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaubSource {
    Called,
    Jump,
    Pick,
}

impl fmt::Display for DaubSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaubSource::Called => write!(f, "called"),
            DaubSource::Jump => write!(f, "jump"),
            DaubSource::Pick => write!(f, "pick"),
        }
    }
}

/// Something done on the device during a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Daub { number: String, source: DaubSource },
    Multiplier { slot: usize },
    ClaimBingo,
    Jump { slot: usize, number: String },
    PickBoost { slot: usize, candidates: usize },
    PickMissed { offered: Vec<String> },
    ExtraTime { slot: usize },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Daub { number, source } => write!(f, "daub {} ({})", number, source),
            Action::Multiplier { slot } => write!(f, "multiplier P{}", slot + 1),
            Action::ClaimBingo => write!(f, "claim bingo"),
            Action::Jump { slot, number } => write!(f, "jump P{} -> {}", slot + 1, number),
            Action::PickBoost { slot, candidates } => {
                write!(f, "pick P{} ({} bubbles)", slot + 1, candidates)
            }
            Action::PickMissed { offered } => write!(f, "pick missed [{}]", offered.join(", ")),
            Action::ExtraTime { slot } => write!(f, "extra time P{}", slot + 1),
        }
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}

/// Boost decisions for one frame of one game.
pub struct BoostPolicy<'f, 'a, B: Boost> {
    session: &'f mut GameSession<B>,
    ctx: &'f mut FrameContext<'a>,
    actions: Vec<Action>,
    /// At most one multiplier is spent per frame.
    multiplier_spent: bool,
}

impl<'f, 'a, B: Boost> BoostPolicy<'f, 'a, B> {
    pub fn new(session: &'f mut GameSession<B>, ctx: &'f mut FrameContext<'a>) -> Self {
        Self { session, ctx, actions: Vec::new(), multiplier_spent: false }
    }

    /// Runs every step of the frame and returns what was done.
    pub fn play(mut self, called: &str, slots: BoostSlots<B>) -> Result<Vec<Action>> {
        self.session.slots = slots;
        self.daub_called(called)?;
        self.jump_pass()?;
        self.pick_pass()?;
        self.extra_time()?;
        Ok(self.actions)
    }

    /// Taps a boost slot and empties it.
    fn tap_slot(&mut self, index: usize) -> Result<Option<B>> {
        let Some(point) = self.ctx.layout.slot_tap(index) else {
            return Ok(None);
        };
        let boost = self.session.slots.take(index);
        let label = match boost {
            Some(boost) => format!("P{} {}", index + 1, boost),
            None => format!("P{}", index + 1),
        };
        self.ctx.device.tap(point, &label)?;
        Ok(boost)
    }

    fn multiplier_allowed(&self, is_bingo: bool) -> bool {
        let rule = &self.ctx.layout.multiplier;
        let now = self.ctx.now;

        if let Some(interval) = rule.reuse_interval {
            let since = now.saturating_duration_since(self.session.last_multiplier_at).as_secs();
            if since <= interval.as_secs() {
                debug!("Multiplier used {}s ago, waiting", since);
                return false;
            }
        }

        let end_game = now.saturating_duration_since(self.session.started_at) >= rule.end_game_after;
        let single = self.session.slots.count(BoostRole::Multiplier) == 1;
        // A lone multiplier waits for a bingo unless it blocks a slot
        !(rule.hold_single_for_bingo
            && !end_game
            && single
            && !is_bingo
            && !self.session.slots.is_full())
    }

    fn spend_multiplier(&mut self, is_bingo: bool) -> Result<()> {
        if self.multiplier_spent {
            return Ok(());
        }
        let Some(slot) = self.session.slots.first(BoostRole::Multiplier) else {
            return Ok(());
        };
        if !self.multiplier_allowed(is_bingo) {
            return Ok(());
        }

        self.tap_slot(slot)?;
        self.session.last_multiplier_at = self.ctx.now;
        self.multiplier_spent = true;
        self.actions.push(Action::Multiplier { slot });
        pause(self.ctx.layout.timing.after_multiplier);
        Ok(())
    }

    fn claim_bingo(&mut self) -> Result<()> {
        if !self.session.engine.check_bingo() {
            return Ok(());
        }
        self.spend_multiplier(true)?;
        self.ctx.device.tap(self.ctx.layout.claim_win, "BINGO")?;
        self.session.engine.perform_bingo();
        self.actions.push(Action::ClaimBingo);
        info!(frame = self.ctx.frame, "BINGO");
        Ok(())
    }

    /// Daubs `number` if it is on the card and still needed.
    fn daub(&mut self, number: &str, source: DaubSource) -> Result<bool> {
        let (Some(spot), Some(tap)) = (self.session.mapping.spot(number), self.session.mapping.tap(number))
        else {
            debug!("NUM = {} - not on card", number);
            return Ok(false);
        };

        let bingo = match self.session.engine.daub(spot) {
            DaubOutcome::AlreadyMarked => {
                debug!("NUM = {} - already daubed", number);
                return Ok(false);
            }
            DaubOutcome::Daubed { bingo } => bingo,
        };

        info!(frame = self.ctx.frame, number, %source, "NUM = {} - daubed", number);
        if source == DaubSource::Called || self.ctx.layout.multiplier.with_boost_daubs {
            self.spend_multiplier(bingo)?;
        }
        self.ctx.device.tap(tap, number)?;
        self.actions.push(Action::Daub { number: number.to_string(), source });
        self.claim_bingo()?;
        Ok(true)
    }

    fn daub_called(&mut self, called: &str) -> Result<()> {
        if called.is_empty() {
            return Ok(());
        }
        if self.session.last_called.as_deref() != Some(called) {
            info!(frame = self.ctx.frame, number = called, "NUM = {}", called);
            self.session.last_called = Some(called.to_string());
        }
        self.daub(called, DaubSource::Called)?;
        Ok(())
    }

    /// Spends every jump boost on the best spot, re-ranking after each daub.
    fn jump_pass(&mut self) -> Result<()> {
        let settle = self.ctx.layout.timing.jump_settle;

        while let Some(slot) = self.session.slots.first(BoostRole::Jump) {
            let Some(number) = self.session.most_needed_numbers().into_iter().next() else {
                break;
            };
            let boost = self.tap_slot(slot)?;
            if let Some(boost) = boost {
                info!(frame = self.ctx.frame, "{} -> {}", boost, number);
            }
            self.actions.push(Action::Jump { slot, number: number.clone() });
            pause(settle);
            self.daub(&number, DaubSource::Jump)?;
            pause(settle);
        }
        Ok(())
    }

    fn read_picks(&mut self, layout: &PickLayout) -> Result<Vec<PickOption>> {
        let png = self.ctx.device.screenshot_png()?;
        if let Some(archive) = self.ctx.archive {
            archive.save(self.ctx.frame, "-pick", &png);
        }
        let gray = to_gray(&image::load_from_memory(&png)?);
        read_pick_options(&gray, &self.ctx.layout.picks, layout, self.ctx.ocr, self.ctx.pool)
    }

    /// Spends a pick boost and taps the best offered number.
    ///
    /// An unsupported bubble count fails before anything is tapped. Errors
    /// while reading the bubbles are logged and end the step.
    fn pick_pass(&mut self) -> Result<()> {
        let Some(slot) = self.session.slots.first(BoostRole::Pick) else {
            return Ok(());
        };
        let needed = self.session.most_needed_numbers();
        if needed.is_empty() {
            debug!("Pick boost available but nothing is needed");
            return Ok(());
        }

        let layout = self.ctx.layout;
        let candidates = needed.len().min(MAX_PICK_CANDIDATES);
        let pick_layout = layout
            .picks
            .for_candidates(candidates)
            .ok_or(BotError::Unsupported { variant: layout.name, candidates })?;

        self.tap_slot(slot)?;
        self.actions.push(Action::PickBoost { slot, candidates });
        if let Some(limit) = layout.multiplier.before_pick_when_needed_at_most {
            // The multiplier cannot be reached once the bubbles are up
            if needed.len() <= limit {
                self.spend_multiplier(true)?;
            }
        }
        pause(layout.timing.pick_settle);

        let options = match self.read_picks(pick_layout) {
            Ok(options) => options,
            Err(e) => {
                warn!(frame = self.ctx.frame, "Pick boost: could not read bubbles: {}", e);
                return Ok(());
            }
        };

        let ranked: Vec<&str> = needed.iter().map(String::as_str).collect();
        let Some(chosen) = choose(&ranked, &options).cloned() else {
            let offered: Vec<String> = options.into_iter().map(|o| o.label).collect();
            info!(frame = self.ctx.frame, "Pick boost: no needed number in {:?}", offered);
            self.actions.push(Action::PickMissed { offered });
            return Ok(());
        };

        self.ctx.device.tap(chosen.tap, &format!("pick {}", chosen.label))?;
        pause(layout.timing.after_pick_tap);
        self.daub(&chosen.label, DaubSource::Pick)?;
        if layout.called.shifted.is_some() {
            self.session.layout_shifted = true;
        }
        Ok(())
    }

    fn extra_time(&mut self) -> Result<()> {
        for slot in self.session.slots.all(BoostRole::ExtraTime) {
            self.tap_slot(slot)?;
            self.actions.push(Action::ExtraTime { slot });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::testing::FakeDevice;
    use crate::game::boost::{CashBoost, KingBoost};
    use crate::game::card::{build_card, CellReading};
    use crate::game::engine::{BingoEngine, DaubGrid, FREE_SPACE};
    use crate::layout::VariantTiming;
    use crate::ocr::testing::{FixedRecognizer, InkWidthRecognizer};
    use image::{DynamicImage, GrayImage, Luma};

    const BOARD: [[u32; 5]; 5] = [
        [7, 22, 34, 48, 64],
        [1, 16, 40, 55, 70],
        [13, 30, 0, 51, 61],
        [9, 17, 42, 46, 75],
        [4, 28, 38, 53, 66],
    ];

    fn instant_layout(mut layout: VariantLayout) -> VariantLayout {
        layout.timing = VariantTiming {
            pick_settle: Duration::ZERO,
            after_pick_tap: Duration::ZERO,
            jump_settle: Duration::ZERO,
            after_multiplier: Duration::ZERO,
        };
        layout
    }

    fn session<B: Boost>(layout: &VariantLayout, start: Instant) -> GameSession<B> {
        let mut readings = Vec::new();
        for row in 0..5 {
            for col in 0..5 {
                if (row, col) != FREE_SPACE {
                    readings.push(CellReading {
                        spot: (row, col),
                        label: BOARD[row][col].to_string(),
                        tap: layout.cells.grid.cell_tap(row, col),
                    });
                }
            }
        }
        let (card, mapping) = build_card(&readings).unwrap();
        GameSession::new(card, mapping, layout.slots.len(), start)
    }

    struct Harness {
        device: FakeDevice,
        pool: WorkerPool,
        layout: VariantLayout,
        start: Instant,
    }

    impl Harness {
        fn new(layout: VariantLayout) -> Self {
            Self {
                device: FakeDevice::default(),
                pool: WorkerPool::new(Some(2)).unwrap(),
                layout: instant_layout(layout),
                start: Instant::now(),
            }
        }

        fn play<B: Boost>(
            &mut self,
            session: &mut GameSession<B>,
            ocr: &dyn DigitRecognizer,
            secs: u64,
            called: &str,
            slots: Vec<Option<B>>,
        ) -> Result<Vec<Action>> {
            let mut ctx = FrameContext {
                device: &mut self.device,
                ocr,
                pool: &self.pool,
                layout: &self.layout,
                archive: None,
                frame: 1,
                now: self.start + Duration::from_secs(secs),
            };
            BoostPolicy::new(session, &mut ctx).play(called, BoostSlots::new(slots))
        }
    }

    const OCR: FixedRecognizer = FixedRecognizer("");

    #[test]
    fn test_called_number_is_daubed_once() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);

        let actions = h.play(&mut s, &OCR, 1, "7", vec![None, None]).unwrap();
        assert_eq!(actions, vec![Action::Daub { number: "7".into(), source: DaubSource::Called }]);
        assert_eq!(h.device.taps[0].0, h.layout.cells.grid.cell_tap(0, 0));

        let again = h.play(&mut s, &OCR, 2, "7", vec![None, None]).unwrap();
        assert!(again.is_empty());
        assert_eq!(h.device.taps.len(), 1);
    }

    #[test]
    fn test_number_not_on_card_is_ignored() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);

        let actions = h.play(&mut s, &OCR, 1, "8", vec![None, None]).unwrap();
        assert!(actions.is_empty());
        assert!(h.device.taps.is_empty());
    }

    #[test]
    fn test_completed_line_claims_bingo() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);
        let mut states = [[0u8; 5]; 5];
        states[0] = [1, 1, 1, 1, 0];
        states[2][2] = 1;
        s.engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        h.play(&mut s, &OCR, 1, "64", vec![None, None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["64", "BINGO"]);
        assert_eq!(h.device.taps[1].0, h.layout.claim_win);
        assert!(!s.engine.check_bingo());
    }

    #[test]
    fn test_single_multiplier_is_held_without_bingo() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);

        h.play(&mut s, &OCR, 20, "7", vec![None, Some(KingBoost::Triple), None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["7"]);
    }

    #[test]
    fn test_single_multiplier_is_spent_on_bingo() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        let mut states = [[0u8; 5]; 5];
        states[0] = [0, 1, 1, 1, 1];
        states[2][2] = 1;
        s.engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        let actions =
            h.play(&mut s, &OCR, 20, "7", vec![None, Some(KingBoost::Triple), None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P2 3X", "7", "BINGO"]);
        assert_eq!(actions[0], Action::Multiplier { slot: 1 });
        assert_eq!(s.last_multiplier_at, h.start + Duration::from_secs(20));
    }

    #[test]
    fn test_multiplier_reuse_gate() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        let slots = vec![Some(KingBoost::Triple), Some(KingBoost::Triple), None];

        // Seven whole seconds after game start is still too soon
        h.play(&mut s, &OCR, 7, "7", slots.clone()).unwrap();
        assert_eq!(h.device.tap_labels(), vec!["7"]);

        h.play(&mut s, &OCR, 8, "22", slots).unwrap();
        assert_eq!(h.device.tap_labels(), vec!["7", "P1 3X", "22"]);
    }

    #[test]
    fn test_multiplier_spent_in_end_game() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);

        h.play(&mut s, &OCR, 85, "7", vec![Some(KingBoost::Triple), None, None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 3X", "7"]);
    }

    #[test]
    fn test_full_slots_release_single_multiplier() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        let slots = vec![
            Some(KingBoost::Triple),
            Some(KingBoost::ExtraTime),
            Some(KingBoost::ExtraTime),
        ];

        h.play(&mut s, &OCR, 30, "7", slots).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 3X", "7", "P2 TIME", "P3 TIME"]);
    }

    #[test]
    fn test_cash_spends_multiplier_on_any_daub() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);

        h.play(&mut s, &OCR, 0, "7", vec![Some(CashBoost::Double), None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 2X", "7"]);
    }

    #[test]
    fn test_one_multiplier_per_frame_on_bingo() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);
        let mut states = [[0u8; 5]; 5];
        states[0] = [0, 1, 1, 1, 1];
        states[2][2] = 1;
        s.engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        let actions =
            h.play(&mut s, &OCR, 1, "7", vec![Some(CashBoost::Double), Some(CashBoost::Double)]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 2X", "7", "BINGO"]);
        assert_eq!(actions.iter().filter(|a| matches!(a, Action::Multiplier { .. })).count(), 1);
        assert_eq!(s.slots.get(1), Some(CashBoost::Double));
    }

    #[test]
    fn test_jump_takes_top_ranked_spot() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        let mut states = [[0u8; 5]; 5];
        for i in 0..4 {
            states[i][i] = 1;
        }
        s.engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        let actions = h.play(&mut s, &OCR, 3, "", vec![None, None, Some(KingBoost::Crown)]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P3 CROWN", "66", "BINGO"]);
        assert_eq!(actions[0], Action::Jump { slot: 2, number: "66".into() });
    }

    #[test]
    fn test_two_jumps_rerank_between_daubs() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);

        h.play(&mut s, &OCR, 3, "", vec![Some(CashBoost::Star), Some(CashBoost::Star)]).unwrap();

        // (0,0) first; after it the far corner leads on its diagonal
        assert_eq!(h.device.tap_labels(), vec!["P1 STAR", "7", "P2 STAR", "66"]);
    }

    #[test]
    fn test_unsupported_pick_fails_before_tapping() {
        let mut h = Harness::new(VariantLayout::cash());
        let mut s = session::<CashBoost>(&h.layout, h.start);
        let mut states = [[2u8; 5]; 5];
        states[0][1] = 0;
        states[1][3] = 0;
        states[3][2] = 0;
        s.engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        let result = h.play(&mut s, &OCR, 3, "", vec![None, Some(CashBoost::PickA)]);

        assert!(matches!(
            result,
            Err(BotError::Unsupported { variant: "cash", candidates: 3 })
        ));
        assert!(h.device.taps.is_empty());
    }

    fn bubble_screen(layout: &VariantLayout, labels: &[u32]) -> DynamicImage {
        let picks = &layout.picks;
        let bubbles = &picks.for_candidates(labels.len()).unwrap().bubbles;
        let mut img = GrayImage::from_pixel(1668, 2224, Luma([255]));
        for (&(x, y), &label) in bubbles.iter().zip(labels) {
            let x0 = x + picks.bubble_size / 2 - label / 2;
            let y0 = y + picks.bubble_size / 2 - 30;
            for yy in y0..y0 + 60 {
                for xx in x0..x0 + label {
                    img.put_pixel(xx, yy, Luma([0]));
                }
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn test_pick_taps_best_offered_number() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        let screen = bubble_screen(&h.layout, &[22, 66, 34, 48]);
        h.device.push_screen(&screen);
        let ocr = InkWidthRecognizer { threshold: 128 };

        let actions = h.play(&mut s, &ocr, 3, "", vec![Some(KingBoost::Star), None, None]).unwrap();

        // Corners rank first; 66 is the only corner offered
        assert_eq!(h.device.tap_labels(), vec!["P1 STAR", "pick 66", "66"]);
        assert_eq!(h.device.taps[1].0, h.layout.picks.tap(1050, 810));
        assert_eq!(actions[0], Action::PickBoost { slot: 0, candidates: 4 });
        assert!(s.layout_shifted);
    }

    #[test]
    fn test_pick_without_match_is_logged() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);
        h.device.push_screen(&bubble_screen(&h.layout, &[2, 3, 5, 6]));
        let ocr = InkWidthRecognizer { threshold: 128 };

        let actions = h.play(&mut s, &ocr, 3, "", vec![Some(KingBoost::Star), None, None]).unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 STAR"]);
        assert!(matches!(&actions[1], Action::PickMissed { offered } if offered.len() == 4));
        assert!(!s.layout_shifted);
    }

    #[test]
    fn test_pick_read_failure_is_recoverable() {
        let mut h = Harness::new(VariantLayout::king());
        let mut s = session::<KingBoost>(&h.layout, h.start);

        // No screenshot queued, so reading the bubbles fails
        let actions = h
            .play(&mut s, &OCR, 3, "", vec![Some(KingBoost::Star), None, Some(KingBoost::ExtraTime)])
            .unwrap();

        assert_eq!(h.device.tap_labels(), vec!["P1 STAR", "P3 TIME"]);
        assert_eq!(actions.last(), Some(&Action::ExtraTime { slot: 2 }));
    }

    #[test]
    fn test_action_display() {
        assert_eq!(
            Action::Daub { number: "7".into(), source: DaubSource::Pick }.to_string(),
            "daub 7 (pick)"
        );
        assert_eq!(Action::Jump { slot: 0, number: "64".into() }.to_string(), "jump P1 -> 64");
        assert_eq!(Action::PickMissed { offered: vec!["1".into(), "2".into()] }.to_string(), "pick missed [1, 2]");
    }
}
