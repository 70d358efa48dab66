use image::GrayImage;
use tracing::debug;

use crate::error::Result;
use crate::game::card::{build_card, BoardMapping, Card, CellReading};
use crate::game::engine::{Spot, FREE_SPACE, GRID};
use crate::layout::CellLayout;
use crate::ocr::{recognize_or_empty, DigitRecognizer};
use crate::pool::WorkerPool;
use crate::vision::extract;

fn read_cell(
    gray: &GrayImage,
    cells: &CellLayout,
    ocr: &dyn DigitRecognizer,
    (row, col): Spot,
) -> Result<CellReading> {
    let region = cells.grid.cell_region(row, col);
    let prepared = extract(gray, &region, &cells.normalize);
    let mut label = recognize_or_empty(ocr, &prepared)?;

    if label.is_empty() {
        if let Some((fallback_col, fallback)) = cells.empty_fallback {
            if col == fallback_col {
                debug!("Cell ({}, {}) unreadable, using {}", row, col, fallback);
                label = fallback.to_string();
            }
        }
    }

    Ok(CellReading { spot: (row, col), label, tap: cells.grid.cell_tap(row, col) })
}

/// OCRs the 24 numbered cells in parallel.
///
/// Readings come back in row-major order regardless of which cell
/// finished first.
pub fn read_cells(
    gray: &GrayImage,
    cells: &CellLayout,
    ocr: &dyn DigitRecognizer,
    pool: &WorkerPool,
) -> Result<Vec<CellReading>> {
    let spots: Vec<Spot> = (0..GRID)
        .flat_map(|row| (0..GRID).map(move |col| (row, col)))
        .filter(|&spot| spot != FREE_SPACE)
        .collect();

    pool.map(&spots, |&spot| read_cell(gray, cells, ocr, spot))
        .into_iter()
        .collect()
}

/// Recognizes the card and validates it.
pub fn read_board(
    gray: &GrayImage,
    cells: &CellLayout,
    ocr: &dyn DigitRecognizer,
    pool: &WorkerPool,
) -> Result<(Card, BoardMapping)> {
    let readings = read_cells(gray, cells, ocr, pool)?;
    build_card(&readings)
}
