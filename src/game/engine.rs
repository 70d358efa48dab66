//! Daub tracking, win-line detection and next-spot ranking.

use std::fmt;
use std::sync::OnceLock;

pub const GRID: usize = 5;

/// `(row, col)` on the card.
pub type Spot = (usize, usize);

/// The pre-marked center cell.
pub const FREE_SPACE: Spot = (2, 2);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum CellState {
    #[default]
    Undaubed = 0,
    /// Marked, not yet part of a claimed bingo.
    Daubed = 1,
    /// Part of a claimed bingo; never triggers another.
    Confirmed = 2,
}

impl CellState {
    pub fn value(self) -> u32 {
        self as u32
    }

    #[cfg(test)]
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            0 => Some(CellState::Undaubed),
            1 => Some(CellState::Daubed),
            2 => Some(CellState::Confirmed),
            _ => None,
        }
    }
}

/// Every line that wins the round, in evaluation order: diagonals, the
/// four corners, rows, then columns.
pub fn bingo_lines() -> &'static [Vec<Spot>] {
    static LINES: OnceLock<Vec<Vec<Spot>>> = OnceLock::new();
    LINES.get_or_init(|| {
        let mut lines = Vec::with_capacity(2 + 1 + GRID * 2);
        lines.push((0..GRID).map(|i| (i, i)).collect());
        lines.push((0..GRID).map(|i| (i, GRID - 1 - i)).collect());
        lines.push(vec![(0, 0), (0, GRID - 1), (GRID - 1, 0), (GRID - 1, GRID - 1)]);
        for row in 0..GRID {
            lines.push((0..GRID).map(|col| (row, col)).collect());
        }
        for col in 0..GRID {
            lines.push((0..GRID).map(|row| (row, col)).collect());
        }
        lines
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DaubGrid {
    cells: [[CellState; GRID]; GRID],
}

impl Default for DaubGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl DaubGrid {
    /// A fresh card: everything undaubed except the free space.
    pub fn new() -> Self {
        let mut cells = [[CellState::Undaubed; GRID]; GRID];
        cells[FREE_SPACE.0][FREE_SPACE.1] = CellState::Daubed;
        Self { cells }
    }

    #[cfg(test)]
    /// Builds a grid from raw state values; anything above 2 counts as confirmed.
    pub fn from_states(states: [[u8; GRID]; GRID]) -> Self {
        let mut cells = [[CellState::Undaubed; GRID]; GRID];
        for (row, values) in states.iter().enumerate() {
            for (col, value) in values.iter().enumerate() {
                cells[row][col] = CellState::from_value(*value).unwrap_or(CellState::Confirmed);
            }
        }
        Self { cells }
    }

    pub fn get(&self, (row, col): Spot) -> CellState {
        self.cells[row][col]
    }

    fn set(&mut self, (row, col): Spot, state: CellState) {
        self.cells[row][col] = state;
    }

    fn line_sum(&self, line: &[Spot]) -> u32 {
        line.iter().map(|&spot| self.get(spot).value()).sum()
    }

    fn line_wins(&self, line: &[Spot]) -> bool {
        line.iter().all(|&s| self.get(s) != CellState::Undaubed)
            && line.iter().any(|&s| self.get(s) == CellState::Daubed)
    }

    /// True when some line is fully marked with at least one fresh daub.
    pub fn check_bingo(&self) -> bool {
        bingo_lines().iter().any(|line| self.line_wins(line))
    }

    pub fn undaubed(&self) -> impl Iterator<Item = Spot> + '_ {
        (0..GRID)
            .flat_map(|row| (0..GRID).map(move |col| (row, col)))
            .filter(|&spot| self.get(spot) == CellState::Undaubed)
    }
}

impl fmt::Display for DaubGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.cells.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let values: Vec<String> = row.iter().map(|c| c.value().to_string()).collect();
            write!(f, "{}", values.join(" "))?;
        }
        Ok(())
    }
}

/// Ranking score of a spot in hundredths of a point.
///
/// A spot completing `k` lines scores `k + 0.5`; otherwise it scores the
/// best progress of its lines plus `0.01` per line it sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u32);

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DaubOutcome {
    /// The spot was already marked; nothing changed.
    AlreadyMarked,
    Daubed { bingo: bool },
}

/// Owns the daub grid of one game.
#[derive(Clone, Debug, Default)]
pub struct BingoEngine {
    grid: DaubGrid,
}

impl BingoEngine {
    pub fn new() -> Self {
        Self { grid: DaubGrid::new() }
    }

    #[cfg(test)]
    pub fn with_grid(grid: DaubGrid) -> Self {
        Self { grid }
    }

    pub fn grid(&self) -> &DaubGrid {
        &self.grid
    }

    pub fn check_bingo(&self) -> bool {
        self.grid.check_bingo()
    }

    pub fn potential_impact(&self, spot: Spot) -> Priority {
        let lines: Vec<&Vec<Spot>> = bingo_lines().iter().filter(|l| l.contains(&spot)).collect();
        let near_complete = (GRID - 1) as u32;

        let in_progress = lines
            .iter()
            .filter(|line| self.grid.line_sum(line) == near_complete)
            .count() as u32;
        if in_progress > 0 {
            return Priority(in_progress * 100 + 50);
        }

        let progress = lines.iter().map(|line| self.grid.line_sum(line)).max().unwrap_or(0);
        Priority(progress * 100 + lines.len() as u32)
    }

    /// Undaubed spots, best first. Equal priorities keep row-major order.
    pub fn most_needed_spots(&self) -> Vec<Spot> {
        let mut ranked: Vec<(Spot, Priority)> = self
            .grid
            .undaubed()
            .map(|spot| (spot, self.potential_impact(spot)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().map(|(spot, _)| spot).collect()
    }

    /// Marks a spot. Idempotent: a marked spot stays as it is.
    pub fn daub(&mut self, spot: Spot) -> DaubOutcome {
        if self.grid.get(spot) != CellState::Undaubed {
            return DaubOutcome::AlreadyMarked;
        }
        self.grid.set(spot, CellState::Daubed);
        DaubOutcome::Daubed { bingo: self.grid.check_bingo() }
    }

    /// On a bingo, confirms every fresh daub on the board and returns true.
    pub fn perform_bingo(&mut self) -> bool {
        if !self.grid.check_bingo() {
            return false;
        }
        for row in 0..GRID {
            for col in 0..GRID {
                if self.grid.get((row, col)) == CellState::Daubed {
                    self.grid.set((row, col), CellState::Confirmed);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_wins_naive(states: &[[u8; 5]; 5], line: &[Spot]) -> bool {
        line.iter().all(|&(r, c)| states[r][c] > 0) && line.iter().any(|&(r, c)| states[r][c] == 1)
    }

    #[test]
    fn test_line_families() {
        let lines = bingo_lines();
        assert_eq!(lines.len(), 13);
        assert_eq!(lines[2].len(), 4);
        assert!(lines.iter().filter(|l| l.len() == 5).count() == 12);
    }

    #[test]
    fn test_new_grid_has_free_space() {
        let grid = DaubGrid::new();
        assert_eq!(grid.get(FREE_SPACE), CellState::Daubed);
        assert_eq!(grid.undaubed().count(), 24);
        assert!(!grid.check_bingo());
    }

    #[test]
    fn test_check_bingo_matches_line_rule() {
        // Deterministic sweep over varied grids
        let mut seed: u32 = 12345;
        for _ in 0..500 {
            let mut states = [[0u8; 5]; 5];
            for row in states.iter_mut() {
                for cell in row.iter_mut() {
                    seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
                    // Bias toward marked cells so wins occur
                    *cell = match (seed >> 16) % 10 {
                        0..=1 => 0,
                        2..=5 => 1,
                        _ => 2,
                    };
                }
            }
            let expected = bingo_lines().iter().any(|l| line_wins_naive(&states, l));
            assert_eq!(DaubGrid::from_states(states).check_bingo(), expected, "{:?}", states);
        }
    }

    #[test]
    fn test_confirmed_line_does_not_retrigger() {
        let mut states = [[0u8; 5]; 5];
        states[0] = [2, 2, 2, 2, 2];
        assert!(!DaubGrid::from_states(states).check_bingo());

        states[0][4] = 1;
        assert!(DaubGrid::from_states(states).check_bingo());
    }

    #[test]
    fn test_four_corners_win() {
        let mut states = [[0u8; 5]; 5];
        states[0][0] = 1;
        states[0][4] = 2;
        states[4][0] = 1;
        states[4][4] = 1;
        assert!(DaubGrid::from_states(states).check_bingo());
    }

    #[test]
    fn test_daub_is_idempotent() {
        let mut once = BingoEngine::new();
        once.daub((1, 3));

        let mut twice = BingoEngine::new();
        twice.daub((1, 3));
        assert_eq!(twice.daub((1, 3)), DaubOutcome::AlreadyMarked);

        assert_eq!(once.grid(), twice.grid());
    }

    #[test]
    fn test_daub_reports_bingo() {
        let mut engine = BingoEngine::new();
        for col in 0..4 {
            assert_eq!(engine.daub((0, col)), DaubOutcome::Daubed { bingo: false });
        }
        assert_eq!(engine.daub((0, 4)), DaubOutcome::Daubed { bingo: true });
    }

    #[test]
    fn test_perform_bingo_promotes_every_fresh_daub() {
        let mut states = [[0u8; 5]; 5];
        states[1] = [1, 1, 1, 1, 1];
        states[3][3] = 1;
        states[4][0] = 2;
        let mut engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        assert!(engine.perform_bingo());

        let mut expected = states;
        expected[1] = [2, 2, 2, 2, 2];
        expected[3][3] = 2;
        assert_eq!(engine.grid(), &DaubGrid::from_states(expected));
        assert!(!engine.check_bingo());
    }

    #[test]
    fn test_perform_bingo_without_bingo_is_noop() {
        let mut states = [[0u8; 5]; 5];
        states[1] = [1, 1, 1, 1, 0];
        let mut engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        assert!(!engine.perform_bingo());
        assert_eq!(engine.grid(), &DaubGrid::from_states(states));
    }

    #[test]
    fn test_diagonal_in_progress_ranks_first() {
        let mut states = [[0u8; 5]; 5];
        states[0][0] = 1;
        states[1][1] = 1;
        states[2][2] = 1;
        states[3][3] = 1;
        let engine = BingoEngine::with_grid(DaubGrid::from_states(states));

        let ranked = engine.most_needed_spots();
        assert_eq!(ranked[0], (4, 4));
        assert_eq!(engine.potential_impact((4, 4)), Priority(150));
        assert!(engine.potential_impact(ranked[1]) < Priority(150));
    }

    #[test]
    fn test_corner_outranks_edge() {
        let engine = BingoEngine::with_grid(DaubGrid::from_states([[0; 5]; 5]));

        // Row, column, diagonal and four corners versus row and column
        assert_eq!(engine.potential_impact((0, 0)), Priority(4));
        assert_eq!(engine.potential_impact((0, 1)), Priority(2));
        assert!(engine.potential_impact((0, 0)) > engine.potential_impact((0, 1)));
    }

    #[test]
    fn test_most_needed_order_is_stable() {
        let engine = BingoEngine::new();
        let first = engine.most_needed_spots();
        let second = engine.most_needed_spots();
        assert_eq!(first, second);
        assert_eq!(first.len(), 24);

        // Corners on a diagonal through the free space tie; row-major order decides.
        let corners: Vec<Spot> = first
            .iter()
            .copied()
            .filter(|s| [(0, 0), (0, 4), (4, 0), (4, 4)].contains(s))
            .collect();
        assert_eq!(corners, vec![(0, 0), (0, 4), (4, 0), (4, 4)]);
        assert!(first[..4].iter().all(|s| corners.contains(s)));
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority(150).to_string(), "1.50");
        assert_eq!(Priority(104).to_string(), "1.04");
    }
}
