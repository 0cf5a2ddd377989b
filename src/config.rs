use std::env;
use std::str::FromStr;

use dotenvy::dotenv;
use image::Rgb;
use log::warn;

use crate::brightness::Normalization;
use crate::error::{CompareError, Result};
use crate::imgproc::Grayscale;
use crate::overlay::MARKER_RED;
use crate::report::DebugLevel;

pub const DEFAULT_GRID: u32 = 10;
pub const DEFAULT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_FACTOR: u32 = 10;

pub const ENV_COLUMNS: &str = "BLOCKDIFF_COLUMNS";
pub const ENV_ROWS: &str = "BLOCKDIFF_ROWS";
pub const ENV_THRESHOLD: &str = "BLOCKDIFF_THRESHOLD";
pub const ENV_FACTOR: &str = "BLOCKDIFF_FACTOR";
pub const ENV_GRAYSCALE: &str = "BLOCKDIFF_GRAYSCALE";
pub const ENV_NORMALIZATION: &str = "BLOCKDIFF_NORMALIZATION";
pub const ENV_DEBUG: &str = "BLOCKDIFF_DEBUG";

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonConfig {
    pub grid_columns: u32,
    pub grid_rows: u32,
    pub diff_threshold: f64,
    pub normalization_factor: u32,
    pub grayscale: Grayscale,
    pub normalization: Normalization,
    pub debug: DebugLevel,
    /// Keep the per-block diff grid in the result.
    pub record_diffs: bool,
    pub marker: Rgb<u8>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            grid_columns: DEFAULT_GRID,
            grid_rows: DEFAULT_GRID,
            diff_threshold: DEFAULT_THRESHOLD,
            normalization_factor: DEFAULT_FACTOR,
            grayscale: Grayscale::TrueLuminance,
            normalization: Normalization::TrueMean,
            debug: DebugLevel::Off,
            record_diffs: false,
            marker: MARKER_RED,
        }
    }
}

impl ComparisonConfig {
    /// Disabled-style grayscale and the floor-per-axis formula. Reproduces
    /// brightness values and verdicts of the historical comparator.
    pub fn legacy() -> Self {
        Self {
            grayscale: Grayscale::DisabledStyle,
            normalization: Normalization::FloorPerAxis,
            ..Self::default()
        }
    }

    pub fn with_grid(mut self, columns: u32, rows: u32) -> Self {
        self.grid_columns = columns;
        self.grid_rows = rows;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.diff_threshold = threshold;
        self
    }

    pub fn with_factor(mut self, factor: u32) -> Self {
        self.normalization_factor = factor;
        self
    }

    pub fn with_grayscale(mut self, grayscale: Grayscale) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_debug(mut self, debug: DebugLevel) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_recorded_diffs(mut self, record: bool) -> Self {
        self.record_diffs = record;
        self
    }

    pub fn with_marker(mut self, marker: Rgb<u8>) -> Self {
        self.marker = marker;
        self
    }

    /// Checks everything that doesn't depend on image size. Geometry checks
    /// happen when the grid is laid over an actual image.
    pub fn validate(&self) -> Result<()> {
        if self.grid_columns == 0 || self.grid_rows == 0 {
            return Err(CompareError::invalid(format!(
                "grid must be at least 1x1, got {}x{}",
                self.grid_columns, self.grid_rows
            )));
        }
        if !self.diff_threshold.is_finite() || self.diff_threshold < 0.0 {
            return Err(CompareError::invalid(format!(
                "diff threshold must be a finite non-negative number, got {}",
                self.diff_threshold
            )));
        }
        if self.normalization_factor == 0 {
            return Err(CompareError::invalid("normalization factor must be positive"));
        }
        Ok(())
    }

    /// Overlays `BLOCKDIFF_*` variables from the environment (and `.env`, if
    /// present) on top of `self`.
    pub fn merge_env(mut self) -> Result<Self> {
        dotenv().ok();

        if let Some(columns) = env_value(ENV_COLUMNS)? {
            self.grid_columns = columns;
        }
        if let Some(rows) = env_value(ENV_ROWS)? {
            self.grid_rows = rows;
        }
        if let Some(threshold) = env_value(ENV_THRESHOLD)? {
            self.diff_threshold = threshold;
        }
        if let Some(factor) = env_value(ENV_FACTOR)? {
            self.normalization_factor = factor;
        }
        if let Some(grayscale) = env_value(ENV_GRAYSCALE)? {
            self.grayscale = grayscale;
        }
        if let Some(normalization) = env_value(ENV_NORMALIZATION)? {
            self.normalization = normalization;
        }
        if let Some(debug) = env_value(ENV_DEBUG)? {
            self.debug = debug;
        }
        Ok(self)
    }

    pub fn from_env() -> Result<Self> {
        Self::default().merge_env()
    }
}

fn env_value<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CompareError::invalid(format!("{}={}: {}", key, raw, e))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            warn!("Ignoring non-unicode value of {}", key);
            Ok(None)
        }
    }
}
