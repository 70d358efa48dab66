use std::collections::{HashMap, HashSet};
use std::fmt;

use super::engine::{Spot, FREE_SPACE, GRID};
use crate::error::{BotError, Result};
use crate::layout::TapPoint;

/// Labels on a card run from 1 to 75.
const MAX_LABEL: u32 = 75;
const NUMBERED_CELLS: usize = GRID * GRID - 1;

/// One recognized card cell.
#[derive(Clone, Debug, PartialEq)]
pub struct CellReading {
    pub spot: Spot,
    pub label: String,
    pub tap: TapPoint,
}

/// The fixed label arrangement of one game's card.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    labels: [[String; GRID]; GRID],
}

impl Card {
    #[cfg(test)]
    pub fn label(&self, (row, col): Spot) -> &str {
        &self.labels[row][col]
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.labels.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", row.join("\t"))?;
        }
        Ok(())
    }
}

/// Number lookups built from the same recognition pass as the [`Card`].
#[derive(Clone, Debug, Default)]
pub struct BoardMapping {
    taps: HashMap<String, TapPoint>,
    spots: HashMap<String, Spot>,
    numbers: HashMap<Spot, String>,
}

impl BoardMapping {
    pub fn tap(&self, number: &str) -> Option<TapPoint> {
        self.taps.get(number).copied()
    }

    pub fn spot(&self, number: &str) -> Option<Spot> {
        self.spots.get(number).copied()
    }

    pub fn number_at(&self, spot: Spot) -> Option<&str> {
        self.numbers.get(&spot).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }
}

fn is_card_label(label: &str) -> bool {
    label.parse::<u32>().is_ok_and(|n| (1..=MAX_LABEL).contains(&n))
}

/// Validates a recognition pass and builds the card with its lookups.
///
/// Fails with [`BotError::InvalidCard`] unless the 24 numbered cells carry
/// 24 distinct labels in `1..=75`. A reading for the free space is ignored.
pub fn build_card(readings: &[CellReading]) -> Result<(Card, BoardMapping)> {
    let mut labels: [[String; GRID]; GRID] = Default::default();
    labels[FREE_SPACE.0][FREE_SPACE.1] = "*".to_string();

    let mut mapping = BoardMapping::default();
    let mut seen = HashSet::new();
    let mut problems = Vec::new();

    for reading in readings.iter().filter(|r| r.spot != FREE_SPACE) {
        let (row, col) = reading.spot;
        if row >= GRID || col >= GRID {
            problems.push(format!("({}, {}) is off the card", row, col));
            continue;
        }
        labels[row][col] = reading.label.clone();

        if !is_card_label(&reading.label) {
            problems.push(format!("({}, {}) read {:?}", row, col, reading.label));
            continue;
        }
        if !seen.insert(reading.label.clone()) {
            problems.push(format!("({}, {}) repeats {}", row, col, reading.label));
            continue;
        }
        mapping.taps.insert(reading.label.clone(), reading.tap);
        mapping.spots.insert(reading.label.clone(), reading.spot);
        mapping.numbers.insert(reading.spot, reading.label.clone());
    }

    if mapping.len() != NUMBERED_CELLS {
        if problems.is_empty() {
            problems.push("cells missing".to_string());
        }
        return Err(BotError::InvalidCard {
            found: mapping.len(),
            detail: problems.join(", "),
        });
    }

    Ok((Card { labels }, mapping))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOARD: [[u32; 5]; 5] = [
        [7, 22, 34, 48, 64],
        [1, 16, 40, 55, 70],
        [13, 30, 0, 51, 61],
        [9, 17, 42, 46, 75],
        [4, 28, 38, 53, 66],
    ];

    fn readings() -> Vec<CellReading> {
        let mut out = Vec::new();
        for row in 0..5 {
            for col in 0..5 {
                if (row, col) == FREE_SPACE {
                    continue;
                }
                out.push(CellReading {
                    spot: (row, col),
                    label: BOARD[row][col].to_string(),
                    tap: TapPoint::new(col as f64 * 10.0, row as f64 * 10.0),
                });
            }
        }
        out
    }

    #[test]
    fn test_build_card_mappings_are_inverse() {
        let (card, mapping) = build_card(&readings()).unwrap();

        assert_eq!(mapping.len(), 24);
        for row in 0..5 {
            for col in 0..5 {
                if (row, col) == FREE_SPACE {
                    assert_eq!(mapping.number_at((row, col)), None);
                    continue;
                }
                let number = mapping.number_at((row, col)).unwrap();
                assert_eq!(mapping.spot(number), Some((row, col)));
                assert_eq!(card.label((row, col)), number);
            }
        }
        assert_eq!(mapping.tap("64"), Some(TapPoint::new(40.0, 0.0)));
    }

    #[test]
    fn test_card_display() {
        let (card, _) = build_card(&readings()).unwrap();
        let text = card.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "7\t22\t34\t48\t64");
        assert_eq!(lines[2], "13\t30\t*\t51\t61");
    }

    #[test]
    fn test_empty_label_is_invalid() {
        let mut cells = readings();
        cells[3].label = String::new();

        match build_card(&cells) {
            Err(BotError::InvalidCard { found, .. }) => assert_eq!(found, 23),
            other => panic!("expected InvalidCard, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_duplicate_label_is_invalid() {
        let mut cells = readings();
        cells[1].label = cells[0].label.clone();

        assert!(matches!(build_card(&cells), Err(BotError::InvalidCard { found: 23, .. })));
    }

    #[test]
    fn test_out_of_range_label_is_invalid() {
        let mut cells = readings();
        cells[0].label = "99".to_string();

        assert!(matches!(build_card(&cells), Err(BotError::InvalidCard { .. })));
    }

    #[test]
    fn test_missing_cells_are_invalid() {
        let cells = readings();
        assert!(matches!(build_card(&cells[..20]), Err(BotError::InvalidCard { found: 20, .. })));
    }
}
