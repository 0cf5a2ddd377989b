use image::GrayImage;
use log::debug;

use crate::error::{CompareError, Result};
use crate::grid::{Block, BlockCoord, Grid};

/// Turns a block's raw intensity sum into a brightness value.
pub trait NormalizationStrategy {
    /// Resolved once per grid so a bad factor fails before sampling starts.
    fn denominator(&self, grid: &Grid, factor: u32) -> Result<u64>;

    fn normalize(&self, sum: u64, denominator: u64) -> f64;
}

/// Historical formula: each nominal block dimension is floor-divided by the
/// normalization factor before multiplying, and the sum is integer-divided
/// by that product. The result is not a mean; it only lines up with
/// brightness values recorded by earlier runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorPerAxis;

impl NormalizationStrategy for FloorPerAxis {
    fn denominator(&self, grid: &Grid, factor: u32) -> Result<u64> {
        if factor == 0 {
            return Err(CompareError::invalid("normalization factor must be positive"));
        }
        let denominator =
            (grid.block_width() / factor) as u64 * (grid.block_height() / factor) as u64;
        if denominator == 0 {
            return Err(CompareError::invalid(format!(
                "normalization factor {} exceeds the {}x{} block size",
                factor,
                grid.block_width(),
                grid.block_height()
            )));
        }
        Ok(denominator)
    }

    fn normalize(&self, sum: u64, denominator: u64) -> f64 {
        (sum / denominator) as f64
    }
}

/// Arithmetic mean over the sampled pixels. The factor only has to fit
/// the block; it plays no part in the value.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrueMean;

impl NormalizationStrategy for TrueMean {
    fn denominator(&self, grid: &Grid, _factor: u32) -> Result<u64> {
        Ok((grid.block_width() - 1) as u64 * (grid.block_height() - 1) as u64)
    }

    fn normalize(&self, sum: u64, denominator: u64) -> f64 {
        sum as f64 / denominator as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    TrueMean,
    FloorPerAxis,
}

impl NormalizationStrategy for Normalization {
    fn denominator(&self, grid: &Grid, factor: u32) -> Result<u64> {
        match self {
            Normalization::TrueMean => TrueMean.denominator(grid, factor),
            Normalization::FloorPerAxis => FloorPerAxis.denominator(grid, factor),
        }
    }

    fn normalize(&self, sum: u64, denominator: u64) -> f64 {
        match self {
            Normalization::TrueMean => TrueMean.normalize(sum, denominator),
            Normalization::FloorPerAxis => FloorPerAxis.normalize(sum, denominator),
        }
    }
}

impl std::str::FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(|c: char| c == '-' || c == '_', "").as_str() {
            "truemean" | "mean" => Ok(Normalization::TrueMean),
            "floorperaxis" | "legacy" => Ok(Normalization::FloorPerAxis),
            other => Err(format!("unknown normalization `{}`", other)),
        }
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Normalization::TrueMean => f.write_str("true-mean"),
            Normalization::FloorPerAxis => f.write_str("floor-per-axis"),
        }
    }
}

/// The factor has to fit inside a block whatever normalization is in use.
pub fn check_factor(grid: &Grid, factor: u32) -> Result<()> {
    if factor == 0 {
        return Err(CompareError::invalid("normalization factor must be positive"));
    }
    if factor > grid.block_width() || factor > grid.block_height() {
        return Err(CompareError::invalid(format!(
            "normalization factor {} exceeds the {}x{} block size",
            factor,
            grid.block_width(),
            grid.block_height()
        )));
    }
    Ok(())
}

/// Sum of every sample inside the block's sampling rectangle.
pub fn block_sum(gray: &GrayImage, block: &Block) -> u64 {
    let rect = block.sample_rect();
    let mut total = 0u64;
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            total += gray.get_pixel(x, y).0[0] as u64;
        }
    }
    total
}

/// Brightness per block, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessGrid {
    columns: u32,
    rows: u32,
    values: Vec<f64>,
}

impl BrightnessGrid {
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
        self.values
            .get((coord.row * self.columns + coord.col) as usize)
            .copied()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Estimates every block of `grid` over `gray`.
///
/// `gray` must cover the grid; callers check image dimensions first.
pub fn estimate<N: NormalizationStrategy + ?Sized>(
    gray: &GrayImage,
    grid: &Grid,
    normalization: &N,
    factor: u32,
) -> Result<BrightnessGrid> {
    let (w, h) = gray.dimensions();
    if grid.columns() * grid.block_width() > w || grid.rows() * grid.block_height() > h {
        return Err(CompareError::DimensionMismatch {
            first: (grid.columns() * grid.block_width(), grid.rows() * grid.block_height()),
            second: (w, h),
        });
    }

    check_factor(grid, factor)?;
    let denominator = normalization.denominator(grid, factor)?;
    debug!(
        "estimating {} blocks of {}x{} (denominator {})",
        grid.len(),
        grid.block_width(),
        grid.block_height(),
        denominator
    );

    let values = grid
        .blocks()
        .map(|block| normalization.normalize(block_sum(gray, &block), denominator))
        .collect();

    Ok(BrightnessGrid {
        columns: grid.columns(),
        rows: grid.rows(),
        values,
    })
}
