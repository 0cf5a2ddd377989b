use std::collections::BTreeSet;

use crate::brightness::BrightnessGrid;
use crate::error::{CompareError, Result};
use crate::grid::BlockCoord;

/// Absolute brightness difference per block, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffGrid {
    columns: u32,
    rows: u32,
    diffs: Vec<f64>,
}

impl DiffGrid {
    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn get(&self, coord: BlockCoord) -> Option<f64> {
        if coord.col >= self.columns || coord.row >= self.rows {
            return None;
        }
        self.diffs
            .get((coord.row * self.columns + coord.col) as usize)
            .copied()
    }

    pub fn row(&self, row: u32) -> &[f64] {
        let start = (row * self.columns) as usize;
        let end = start + self.columns as usize;
        self.diffs.get(start..end).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockCoord, f64)> + '_ {
        let columns = self.columns;
        self.diffs
            .iter()
            .enumerate()
            .map(move |(i, &d)| (BlockCoord::new(i as u32 % columns, i as u32 / columns), d))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub is_match: bool,
    pub mismatched: BTreeSet<BlockCoord>,
    pub diffs: DiffGrid,
}

impl Classification {
    pub fn is_mismatch(&self, coord: BlockCoord) -> bool {
        self.mismatched.contains(&coord)
    }
}

/// A block mismatches when its difference is strictly greater than
/// `threshold`; one mismatching block fails the whole comparison.
pub fn classify(
    first: &BrightnessGrid,
    second: &BrightnessGrid,
    threshold: f64,
) -> Result<Classification> {
    if (first.columns(), first.rows()) != (second.columns(), second.rows()) {
        return Err(CompareError::DimensionMismatch {
            first: (first.columns(), first.rows()),
            second: (second.columns(), second.rows()),
        });
    }

    let diffs: Vec<f64> = first
        .values()
        .iter()
        .zip(second.values())
        .map(|(a, b)| (a - b).abs())
        .collect();
    let diffs = DiffGrid {
        columns: first.columns(),
        rows: first.rows(),
        diffs,
    };

    let mismatched: BTreeSet<BlockCoord> = diffs
        .iter()
        .filter(|(_, diff)| *diff > threshold)
        .map(|(coord, _)| coord)
        .collect();

    Ok(Classification {
        is_match: mismatched.is_empty(),
        mismatched,
        diffs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::{estimate, TrueMean};
    use crate::grid::partition;
    use image::{GrayImage, Luma};

    fn brightness(gray: &GrayImage, columns: u32, rows: u32) -> BrightnessGrid {
        let (w, h) = gray.dimensions();
        let grid = partition(w, h, columns, rows).unwrap();
        estimate(gray, &grid, &TrueMean, 1).unwrap()
    }

    #[test]
    fn identical_grids_match() {
        let gray = GrayImage::from_pixel(30, 30, Luma([90]));
        let a = brightness(&gray, 3, 3);
        let result = classify(&a, &a.clone(), 0.0).unwrap();
        assert!(result.is_match);
        assert!(result.mismatched.is_empty());
        assert!(result.diffs.iter().all(|(_, d)| d == 0.0));
    }

    #[test]
    fn one_bright_block_is_flagged_alone() {
        let a = GrayImage::from_pixel(30, 30, Luma([20]));
        let mut b = a.clone();
        for y in 10..20 {
            for x in 20..30 {
                b.put_pixel(x, y, Luma([200]));
            }
        }

        let result = classify(&brightness(&a, 3, 3), &brightness(&b, 3, 3), 10.0).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.mismatched.len(), 1);
        assert!(result.is_mismatch(BlockCoord::new(2, 1)));
        assert_eq!(result.diffs.get(BlockCoord::new(2, 1)), Some(180.0));
    }

    #[test]
    fn threshold_is_exclusive() {
        let a = brightness(&GrayImage::from_pixel(20, 20, Luma([10])), 2, 2);
        let b = brightness(&GrayImage::from_pixel(20, 20, Luma([20])), 2, 2);
        assert!(classify(&a, &b, 10.0).unwrap().is_match);
        assert!(!classify(&a, &b, 9.5).unwrap().is_match);
    }

    #[test]
    fn differently_shaped_grids_are_rejected() {
        let gray = GrayImage::from_pixel(30, 30, Luma([0]));
        let err = classify(&brightness(&gray, 3, 3), &brightness(&gray, 2, 3), 1.0).unwrap_err();
        assert!(matches!(err, CompareError::DimensionMismatch { .. }));
    }

    #[test]
    fn rows_slice_in_grid_order() {
        let a = GrayImage::from_pixel(20, 20, Luma([0]));
        let mut b = a.clone();
        b.put_pixel(10, 10, Luma([81]));
        let result = classify(&brightness(&a, 2, 2), &brightness(&b, 2, 2), 100.0).unwrap();
        assert_eq!(result.diffs.row(0), &[0.0, 0.0]);
        assert_eq!(result.diffs.row(1), &[0.0, 1.0]);
        assert!(result.diffs.row(2).is_empty());
    }
}
