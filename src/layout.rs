//! Screen geometry for the supported game variants.
//!
//! All positions are device pixels of a full-resolution screenshot. Taps are
//! issued in points, which are half a device pixel on the target tablets.

use std::fmt;
use std::time::Duration;

/// A rectangle in device pixels, shrunk on every side by `buffer` when cropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub buffer: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32, buffer: u32) -> Self {
        Self { x, y, width, height, buffer }
    }

    pub const fn square(x: u32, y: u32, size: u32, buffer: u32) -> Self {
        Self::new(x, y, size, size, buffer)
    }
}

/// A tap target in points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TapPoint {
    pub x: f64,
    pub y: f64,
}

impl TapPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TapPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Padding {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Padding {
    pub const fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self { left, top, right, bottom }
    }

    pub const fn uniform(value: u32) -> Self {
        Self::new(value, value, value, value)
    }
}

/// Solid frame added around a prepared glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Border {
    pub padding: Padding,
    pub fill: u8,
}

/// How the ink bounding box is used to re-frame a glyph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InkCrop {
    /// Keep the full height, trim columns to the ink with a small margin.
    Horizontal { threshold: u8, left: u32, right: u32 },
    /// Cut the ink box out and paste it onto a white canvas with padding.
    Boxed { threshold: u8, padding: Padding },
}

/// Preparation applied to a cropped region before OCR, in field order.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Normalize {
    /// Pixels brighter than this become white, the rest black.
    pub binarize: Option<u8>,
    pub ink: Option<InkCrop>,
    pub binarize_after: Option<u8>,
    pub rotate_clockwise_degrees: Option<f32>,
    pub border: Option<Border>,
}

#[derive(Clone, Debug)]
pub struct GridGeometry {
    pub origin_x: u32,
    pub origin_y: u32,
    pub cell_size: u32,
    pub buffer_top_row: u32,
    pub buffer: u32,
}

impl GridGeometry {
    /// Crop region of the cell at `(row, col)`.
    pub fn cell_region(&self, row: usize, col: usize) -> Region {
        let buffer = if row == 0 { self.buffer_top_row } else { self.buffer };
        Region::square(
            self.origin_x + col as u32 * self.cell_size,
            self.origin_y + row as u32 * self.cell_size,
            self.cell_size,
            buffer,
        )
    }

    /// Tap point at the center of the cell at `(row, col)`.
    pub fn cell_tap(&self, row: usize, col: usize) -> TapPoint {
        let half = self.cell_size as f64 / 2.0;
        let x = (self.origin_x as f64 + col as f64 * self.cell_size as f64 + half).trunc();
        let y = (self.origin_y as f64 + row as f64 * self.cell_size as f64 + half).trunc();
        TapPoint::new(x / 2.0, y / 2.0)
    }
}

#[derive(Clone, Debug)]
pub struct CellLayout {
    pub grid: GridGeometry,
    pub normalize: Normalize,
    /// Label substituted when OCR returns nothing for a cell in this column.
    pub empty_fallback: Option<(usize, &'static str)>,
}

/// A grayscale pixel that must be at least `min_luma` when a ball is shown.
#[derive(Clone, Copy, Debug)]
pub struct PixelProbe {
    pub name: &'static str,
    pub x: u32,
    pub y: u32,
    pub min_luma: u8,
}

/// A region that, when it matches the named template, means "no ball".
#[derive(Clone, Copy, Debug)]
pub struct TemplateProbe {
    pub asset: &'static str,
    pub region: Region,
    pub max_distance: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct BallCrop {
    pub region: Region,
    pub normalize: Normalize,
}

/// Layout used once the board has shifted after a pick boost.
#[derive(Clone, Copy, Debug)]
pub struct ShiftedBall {
    pub blank: TemplateProbe,
    pub ball: BallCrop,
}

#[derive(Clone, Debug)]
pub struct CalledBallLayout {
    /// Height of the top strip is the screenshot height divided by this.
    pub strip_divisor: u32,
    pub probes: Vec<PixelProbe>,
    pub blank_templates: Vec<TemplateProbe>,
    pub ball: BallCrop,
    pub shifted: Option<ShiftedBall>,
}

#[derive(Clone, Debug)]
pub struct PickLayout {
    pub candidates: usize,
    pub bubbles: Vec<(u32, u32)>,
}

#[derive(Clone, Debug)]
pub struct PickLayouts {
    pub bubble_size: u32,
    pub buffer: u32,
    /// Added to the halved bubble origin, in points, to get its tap target.
    pub tap_offset: f64,
    pub normalize: Normalize,
    pub layouts: Vec<PickLayout>,
}

impl PickLayouts {
    pub fn for_candidates(&self, candidates: usize) -> Option<&PickLayout> {
        self.layouts.iter().find(|l| l.candidates == candidates)
    }

    pub fn region(&self, x: u32, y: u32) -> Region {
        Region::square(x, y, self.bubble_size, self.buffer)
    }

    pub fn tap(&self, x: u32, y: u32) -> TapPoint {
        TapPoint::new(x as f64 / 2.0 + self.tap_offset, y as f64 / 2.0 + self.tap_offset)
    }
}

/// When a score multiplier may be spent.
#[derive(Clone, Debug)]
pub struct MultiplierRule {
    /// Minimum whole seconds between two multipliers.
    pub reuse_interval: Option<Duration>,
    /// Keep a lone multiplier for a bingo unless every slot is occupied.
    pub hold_single_for_bingo: bool,
    /// After this long into the round the hold rule no longer applies.
    pub end_game_after: Duration,
    /// Spend a multiplier right after activating a pick boost if at most
    /// this many spots are still needed.
    pub before_pick_when_needed_at_most: Option<usize>,
    /// Also consider a multiplier for daubs made through jump and pick boosts.
    pub with_boost_daubs: bool,
}

#[derive(Clone, Debug)]
pub struct VariantTiming {
    pub pick_settle: Duration,
    pub after_pick_tap: Duration,
    pub jump_settle: Duration,
    pub after_multiplier: Duration,
}

#[derive(Clone, Debug)]
pub struct VariantLayout {
    pub name: &'static str,
    pub bundle_id: &'static str,
    pub cells: CellLayout,
    pub slots: Vec<Region>,
    pub claim_win: TapPoint,
    pub called: CalledBallLayout,
    pub picks: PickLayouts,
    pub multiplier: MultiplierRule,
    pub start_banner: Region,
    pub start_max_distance: u64,
    pub game_over_banner: Region,
    pub timing: VariantTiming,
}

impl VariantLayout {
    /// Tap point of a boost slot: a quarter of the slot into its top-left corner.
    pub fn slot_tap(&self, index: usize) -> Option<TapPoint> {
        self.slots.get(index).map(|r| {
            let quarter = r.width as f64 / 4.0;
            TapPoint::new(r.x as f64 / 2.0 + quarter, r.y as f64 / 2.0 + quarter)
        })
    }

    pub fn king() -> Self {
        const SLOT_X: u32 = 255;
        const SLOT_Y: u32 = 1850;
        const SLOT_SIZE: u32 = 170;
        const SLOT_STEP: u32 = 187;
        const BUBBLE: u32 = 225;

        Self {
            name: "king",
            bundle_id: "com.bingo.king.game.ios",
            cells: CellLayout {
                grid: GridGeometry {
                    origin_x: 270,
                    origin_y: 665,
                    cell_size: 225,
                    buffer_top_row: 48,
                    buffer: 55,
                },
                normalize: Normalize {
                    ink: Some(InkCrop::Horizontal { threshold: 200, left: 3, right: 4 }),
                    ..Normalize::default()
                },
                // B9 renders too thin for tesseract
                empty_fallback: Some((0, "9")),
            },
            slots: (0..3)
                .map(|k| Region::square(SLOT_X + k * SLOT_STEP, SLOT_Y, SLOT_SIZE, 48))
                .collect(),
            claim_win: TapPoint::new(1150.0 / 2.0, 1950.0 / 2.0),
            called: CalledBallLayout {
                strip_divisor: 3,
                probes: Vec::new(),
                blank_templates: vec![
                    TemplateProbe {
                        asset: "health_bar_missing_proof",
                        region: Region::new(0, 325, 315, 200, 0),
                        max_distance: 10,
                    },
                    TemplateProbe {
                        asset: "new_bg_segment",
                        region: Region::new(310, 450, 160, 200, 55),
                        max_distance: 10,
                    },
                ],
                ball: BallCrop {
                    region: Region::new(320, 320, 150, 155, 0),
                    normalize: Normalize {
                        ink: Some(InkCrop::Boxed {
                            threshold: 28,
                            padding: Padding::new(50, 25, 50, 10),
                        }),
                        border: Some(Border { padding: Padding::new(10, 30, 10, 25), fill: 0 }),
                        ..Normalize::default()
                    },
                },
                shifted: Some(ShiftedBall {
                    blank: TemplateProbe {
                        asset: "post_star_bg_segment",
                        region: Region::new(310, 500, 160, 100, 0),
                        max_distance: 10,
                    },
                    ball: BallCrop {
                        region: Region::new(300, 300, 175, 165, 0),
                        normalize: Normalize {
                            ink: Some(InkCrop::Boxed {
                                threshold: 28,
                                padding: Padding::new(15, 30, 15, 15),
                            }),
                            binarize_after: Some(30),
                            rotate_clockwise_degrees: Some(4.0),
                            border: Some(Border { padding: Padding::uniform(5), fill: 0 }),
                            ..Normalize::default()
                        },
                    },
                }),
            },
            picks: PickLayouts {
                bubble_size: BUBBLE,
                buffer: 20,
                tap_offset: BUBBLE as f64 / 2.0,
                normalize: Normalize::default(),
                layouts: vec![
                    PickLayout { candidates: 1, bubbles: vec![(710, 1150)] },
                    PickLayout { candidates: 2, bubbles: vec![(715, 1320)] },
                    PickLayout {
                        candidates: 3,
                        bubbles: vec![(710, 770), (330, 1320), (1050, 1320)],
                    },
                    PickLayout {
                        candidates: 4,
                        bubbles: vec![(380, 810), (1050, 810), (375, 1330), (1050, 1330)],
                    },
                ],
            },
            multiplier: MultiplierRule {
                reuse_interval: Some(Duration::from_secs(7)),
                hold_single_for_bingo: true,
                end_game_after: Duration::from_secs(80),
                before_pick_when_needed_at_most: Some(12),
                with_boost_daubs: false,
            },
            start_banner: Region::new(200, 500, 1300, 250, 55),
            start_max_distance: 315_000,
            game_over_banner: Region::new(580, 300, 550, 250, 55),
            timing: VariantTiming {
                pick_settle: Duration::from_millis(300),
                after_pick_tap: Duration::from_millis(400),
                jump_settle: Duration::ZERO,
                after_multiplier: Duration::from_millis(100),
            },
        }
    }

    pub fn cash() -> Self {
        const SLOT_SIZE: u32 = 180;

        Self {
            name: "cash",
            bundle_id: "com.papaya.bingocash",
            cells: CellLayout {
                grid: GridGeometry {
                    origin_x: 230,
                    origin_y: 615,
                    cell_size: 240,
                    buffer_top_row: 25,
                    buffer: 25,
                },
                normalize: Normalize {
                    binarize: Some(100),
                    ink: Some(InkCrop::Boxed { threshold: 40, padding: Padding::uniform(25) }),
                    border: Some(Border { padding: Padding::uniform(8), fill: 0 }),
                    ..Normalize::default()
                },
                empty_fallback: None,
            },
            slots: vec![
                Region::square(670, 1830, SLOT_SIZE, 48),
                Region::square(820, 1830, SLOT_SIZE, 48),
            ],
            claim_win: TapPoint::new(1220.0 / 2.0, 1930.0 / 2.0),
            called: CalledBallLayout {
                strip_divisor: 5,
                probes: vec![
                    PixelProbe { name: "health bar", x: 1380, y: 440, min_luma: 150 },
                    PixelProbe { name: "ball edge", x: 1280, y: 300, min_luma: 200 },
                ],
                blank_templates: Vec::new(),
                ball: BallCrop {
                    region: Region::new(1200, 260, 150, 160, 15),
                    normalize: Normalize {
                        binarize: Some(100),
                        ink: Some(InkCrop::Boxed { threshold: 40, padding: Padding::uniform(25) }),
                        border: Some(Border { padding: Padding::uniform(8), fill: 0 }),
                        ..Normalize::default()
                    },
                },
                shifted: None,
            },
            picks: PickLayouts {
                bubble_size: 210,
                buffer: 0,
                // Bubbles are centered on a card-cell sized target
                tap_offset: 120.0,
                normalize: Normalize {
                    binarize: Some(60),
                    ink: Some(InkCrop::Boxed {
                        threshold: 100,
                        padding: Padding::new(30, 15, 30, 15),
                    }),
                    ..Normalize::default()
                },
                layouts: vec![
                    PickLayout { candidates: 2, bubbles: vec![(445, 860), (1030, 860)] },
                    PickLayout {
                        candidates: 4,
                        bubbles: vec![(445, 860), (1030, 860), (445, 1390), (1030, 1390)],
                    },
                ],
            },
            multiplier: MultiplierRule {
                reuse_interval: None,
                hold_single_for_bingo: false,
                end_game_after: Duration::from_secs(80),
                before_pick_when_needed_at_most: None,
                with_boost_daubs: true,
            },
            start_banner: Region::new(200, 500, 1300, 100, 0),
            start_max_distance: 315_000,
            game_over_banner: Region::new(540, 450, 625, 100, 0),
            timing: VariantTiming {
                pick_settle: Duration::from_millis(500),
                after_pick_tap: Duration::from_millis(300),
                jump_settle: Duration::from_millis(300),
                after_multiplier: Duration::ZERO,
            },
        }
    }
}
