use std::collections::BTreeSet;
use std::path::PathBuf;

use image::{DynamicImage, GrayImage, RgbImage};
use log::{debug, info};
use serde_json::{json, Value};

use crate::brightness;
use crate::classify::{classify, DiffGrid};
use crate::config::ComparisonConfig;
use crate::error::{CompareError, IoFailure, Result};
use crate::grid::{partition, BlockCoord, Grid};
use crate::imgproc::GrayscaleStrategy;
use crate::io::{Loader, Presenter};
use crate::overlay;
use crate::report::{self, DebugLevel, DebugSink, LogSink};

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub is_match: bool,
    /// Second image with mismatched blocks outlined.
    pub overlay: RgbImage,
    pub mismatched: BTreeSet<BlockCoord>,
    /// Present when the configuration asks for it.
    pub diffs: Option<DiffGrid>,
    pub grid: Grid,
}

impl ComparisonResult {
    pub fn to_json(&self) -> Value {
        let mismatched: Vec<Value> = self
            .mismatched
            .iter()
            .map(|c| json!({ "col": c.col, "row": c.row }))
            .collect();
        let diffs = self.diffs.as_ref().map(|diffs| {
            (0..diffs.rows())
                .map(|row| diffs.row(row).to_vec())
                .collect::<Vec<_>>()
        });

        json!({
            "match": self.is_match,
            "grid": {
                "columns": self.grid.columns(),
                "rows": self.grid.rows(),
                "block_width": self.grid.block_width(),
                "block_height": self.grid.block_height(),
            },
            "mismatched": mismatched,
            "diffs": diffs,
        })
    }
}

/// Runs the block comparison with a validated configuration.
#[derive(Debug, Clone)]
pub struct Comparator {
    config: ComparisonConfig,
}

impl Comparator {
    pub fn new(config: ComparisonConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn compare(&self, first: &RgbImage, second: &RgbImage) -> Result<ComparisonResult> {
        self.compare_with_sink(first, second, &mut LogSink)
    }

    pub fn compare_with_sink(
        &self,
        first: &RgbImage,
        second: &RgbImage,
        sink: &mut dyn DebugSink,
    ) -> Result<ComparisonResult> {
        check_dimensions(first.dimensions(), second.dimensions())?;

        debug!("Converting to grayscale ({})", self.config.grayscale);
        let gray_first = self.config.grayscale.convert(first);
        let gray_second = self.config.grayscale.convert(second);
        self.run(&gray_first, &gray_second, second, sink)
    }

    /// Compares two single-channel images as-is, skipping the grayscale
    /// pass. The overlay is drawn on `second` expanded to RGB.
    pub fn compare_luma(&self, first: &GrayImage, second: &GrayImage) -> Result<ComparisonResult> {
        self.compare_luma_with_sink(first, second, &mut LogSink)
    }

    pub fn compare_luma_with_sink(
        &self,
        first: &GrayImage,
        second: &GrayImage,
        sink: &mut dyn DebugSink,
    ) -> Result<ComparisonResult> {
        check_dimensions(first.dimensions(), second.dimensions())?;

        let base = DynamicImage::ImageLuma8(second.clone()).to_rgb8();
        self.run(first, second, &base, sink)
    }

    fn run(
        &self,
        gray_first: &GrayImage,
        gray_second: &GrayImage,
        overlay_base: &RgbImage,
        sink: &mut dyn DebugSink,
    ) -> Result<ComparisonResult> {
        let config = &self.config;
        let (width, height) = gray_first.dimensions();
        let grid = partition(width, height, config.grid_columns, config.grid_rows)?;
        debug!(
            "{}x{} grid of {}x{} blocks over {}x{}",
            grid.columns(),
            grid.rows(),
            grid.block_width(),
            grid.block_height(),
            width,
            height
        );

        let factor = config.normalization_factor;
        let first = brightness::estimate(gray_first, &grid, &config.normalization, factor)?;
        let second = brightness::estimate(gray_second, &grid, &config.normalization, factor)?;

        let classification = classify(&first, &second, config.diff_threshold)?;
        if config.debug != DebugLevel::Off {
            report::emit(config.debug, &classification, sink);
        }

        let overlay = overlay::render(overlay_base, &grid, &classification.mismatched, config.marker);

        info!(
            "Comparison {}: {} of {} blocks differ by more than {}",
            if classification.is_match { "matched" } else { "failed" },
            classification.mismatched.len(),
            grid.len(),
            config.diff_threshold
        );

        Ok(ComparisonResult {
            is_match: classification.is_match,
            overlay,
            mismatched: classification.mismatched,
            diffs: config.record_diffs.then_some(classification.diffs),
            grid,
        })
    }
}

/// One-shot comparison with a fresh [`Comparator`].
pub fn compare(
    first: &RgbImage,
    second: &RgbImage,
    config: &ComparisonConfig,
) -> Result<ComparisonResult> {
    Comparator::new(config.clone())?.compare(first, second)
}

fn check_dimensions(first: (u32, u32), second: (u32, u32)) -> Result<()> {
    if first != second {
        return Err(CompareError::DimensionMismatch { first, second });
    }
    Ok(())
}

/// Anything that can be turned into an RGB image for comparison.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Resolved and decoded by a [`Loader`].
    Path(PathBuf),
    Decoded(DynamicImage),
    /// Tightly packed 8-bit RGB.
    Raw {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
}

impl From<DynamicImage> for ImageSource {
    fn from(img: DynamicImage) -> Self {
        ImageSource::Decoded(img)
    }
}

impl From<RgbImage> for ImageSource {
    fn from(img: RgbImage) -> Self {
        ImageSource::Decoded(DynamicImage::ImageRgb8(img))
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::Path(path)
    }
}

impl From<&str> for ImageSource {
    fn from(path: &str) -> Self {
        ImageSource::Path(PathBuf::from(path))
    }
}

impl ImageSource {
    fn into_rgb(self, loader: &dyn Loader) -> Result<RgbImage> {
        match self {
            ImageSource::Path(path) => Ok(loader.load(&path)?.to_rgb8()),
            ImageSource::Decoded(img) => Ok(img.to_rgb8()),
            ImageSource::Raw {
                width,
                height,
                pixels,
            } => {
                let len = pixels.len();
                RgbImage::from_raw(width, height, pixels)
                    .ok_or(CompareError::Io(IoFailure::RawBuffer { width, height, len }))
            }
        }
    }
}

/// Canonical comparison input: two RGB images of equal size and a
/// validated configuration.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub first: RgbImage,
    pub second: RgbImage,
    pub config: ComparisonConfig,
}

impl Prepared {
    pub fn compare(&self) -> Result<ComparisonResult> {
        compare(&self.first, &self.second, &self.config)
    }

    pub fn compare_with_sink(&self, sink: &mut dyn DebugSink) -> Result<ComparisonResult> {
        Comparator::new(self.config.clone())?.compare_with_sink(&self.first, &self.second, sink)
    }

    /// Compares, then hands the overlay to `presenter` under `name`.
    pub fn compare_and_present(
        &self,
        sink: &mut dyn DebugSink,
        presenter: &dyn Presenter,
        name: &str,
    ) -> Result<(ComparisonResult, Option<PathBuf>)> {
        let result = self.compare_with_sink(sink)?;
        let written = presenter.present(&result.overlay, name)?;
        Ok((result, written))
    }
}

/// Normalizes both sources and validates everything that can be checked
/// before partitioning: configuration, matching dimensions, and that the
/// grid and normalization factor fit the image.
pub fn prepare(
    first: impl Into<ImageSource>,
    second: impl Into<ImageSource>,
    config: ComparisonConfig,
    loader: &dyn Loader,
) -> Result<Prepared> {
    config.validate()?;
    let first = first.into().into_rgb(loader)?;
    let second = second.into().into_rgb(loader)?;
    check_dimensions(first.dimensions(), second.dimensions())?;

    let (width, height) = first.dimensions();
    let grid = partition(width, height, config.grid_columns, config.grid_rows)?;
    brightness::check_factor(&grid, config.normalization_factor)?;
    brightness::NormalizationStrategy::denominator(
        &config.normalization,
        &grid,
        config.normalization_factor,
    )?;

    Ok(Prepared {
        first,
        second,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brightness::Normalization;
    use image::{Luma, Rgb};
    use std::path::Path;

    struct NoFiles;

    impl Loader for NoFiles {
        fn load(&self, name: &Path) -> std::result::Result<DynamicImage, IoFailure> {
            Err(IoFailure::Decode {
                path: name.to_path_buf(),
                source: image::ImageError::IoError(std::io::ErrorKind::NotFound.into()),
            })
        }
    }

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 3) as u8, (y * 2) as u8, ((x + y) % 256) as u8]))
    }

    #[test]
    fn self_comparison_matches_under_both_presets() {
        let img = gradient(200, 120);
        for config in [ComparisonConfig::default(), ComparisonConfig::legacy()] {
            let result = compare(&img, &img.clone(), &config).unwrap();
            assert!(result.is_match);
            assert!(result.mismatched.is_empty());
            assert_eq!(result.overlay, img);
        }
    }

    #[test]
    fn dimension_mismatch_is_reported_before_partitioning() {
        let err = compare(&gradient(80, 60), &gradient(80, 61), &ComparisonConfig::default())
            .unwrap_err();
        match err {
            CompareError::DimensionMismatch { first, second } => {
                assert_eq!(first, (80, 60));
                assert_eq!(second, (80, 61));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn comparator_rejects_invalid_config_up_front() {
        let err = Comparator::new(ComparisonConfig::default().with_grid(0, 3)).unwrap_err();
        assert!(matches!(err, CompareError::InvalidConfiguration(_)));
    }

    #[test]
    fn luma_parity_example() {
        let gray = GrayImage::from_pixel(100, 100, Luma([50]));
        let mut changed = gray.clone();
        changed.put_pixel(0, 0, Luma([61]));

        let config = ComparisonConfig::legacy()
            .with_threshold(10.0)
            .with_recorded_diffs(true);
        let comparator = Comparator::new(config).unwrap();

        let same = comparator.compare_luma(&gray, &gray).unwrap();
        assert!(same.is_match);

        let result = comparator.compare_luma(&gray, &changed).unwrap();
        assert!(!result.is_match);
        assert_eq!(result.mismatched, BTreeSet::from([BlockCoord::new(0, 0)]));
        assert_eq!(result.diffs.unwrap().get(BlockCoord::new(0, 0)), Some(11.0));
    }

    #[test]
    fn diffs_only_when_recorded() {
        let img = gradient(40, 40);
        let config = ComparisonConfig::default().with_grid(4, 4);
        assert!(compare(&img, &img, &config).unwrap().diffs.is_none());
        let diffs = compare(&img, &img, &config.with_recorded_diffs(true))
            .unwrap()
            .diffs
            .unwrap();
        assert_eq!((diffs.columns(), diffs.rows()), (4, 4));
    }

    #[test]
    fn debug_lines_go_to_the_sink() {
        let img = gradient(30, 30);
        let comparator =
            Comparator::new(ComparisonConfig::default().with_grid(3, 3).with_debug(DebugLevel::Symbolic))
                .unwrap();
        let mut sink: Vec<String> = Vec::new();
        comparator.compare_with_sink(&img, &img, &mut sink).unwrap();
        assert_eq!(sink, vec!["|   |"; 3]);
    }

    #[test]
    fn prepare_accepts_raw_and_decoded_sources() {
        let img = gradient(20, 20);
        let raw = ImageSource::Raw {
            width: 20,
            height: 20,
            pixels: img.as_raw().clone(),
        };
        let prepared = prepare(
            raw,
            img.clone(),
            ComparisonConfig::default().with_grid(2, 2),
            &NoFiles,
        )
        .unwrap();
        assert_eq!(prepared.first, prepared.second);
        assert!(prepared.compare().unwrap().is_match);
    }

    #[test]
    fn prepare_rejects_short_raw_buffer() {
        let raw = ImageSource::Raw {
            width: 4,
            height: 4,
            pixels: vec![0; 10],
        };
        let err = prepare(raw, gradient(4, 4), ComparisonConfig::default(), &NoFiles).unwrap_err();
        assert!(matches!(err, CompareError::Io(IoFailure::RawBuffer { len: 10, .. })));
    }

    #[test]
    fn prepare_forwards_loader_failures() {
        let err = prepare("a.jpg", "b.jpg", ComparisonConfig::default(), &NoFiles).unwrap_err();
        assert!(matches!(err, CompareError::Io(IoFailure::Decode { .. })));
    }

    #[test]
    fn prepare_rejects_factor_larger_than_block() {
        let config = ComparisonConfig::default()
            .with_normalization(Normalization::FloorPerAxis)
            .with_factor(11);
        let err = prepare(gradient(100, 100), gradient(100, 100), config, &NoFiles).unwrap_err();
        assert!(matches!(err, CompareError::InvalidConfiguration(_)));

        let config = ComparisonConfig::default().with_factor(500);
        let err = prepare(gradient(100, 100), gradient(100, 100), config, &NoFiles).unwrap_err();
        assert!(matches!(err, CompareError::InvalidConfiguration(_)));
    }

    struct Recorder(std::cell::RefCell<Vec<(String, (u32, u32))>>);

    impl Presenter for Recorder {
        fn present(
            &self,
            overlay: &RgbImage,
            name: &str,
        ) -> std::result::Result<Option<PathBuf>, IoFailure> {
            self.0
                .borrow_mut()
                .push((name.to_string(), overlay.dimensions()));
            Ok(None)
        }
    }

    #[test]
    fn prepared_hands_overlay_to_presenter() {
        let img = gradient(20, 20);
        let prepared = prepare(
            img.clone(),
            img,
            ComparisonConfig::default().with_grid(2, 2),
            &NoFiles,
        )
        .unwrap();
        let presenter = Recorder(Default::default());
        let mut sink: Vec<String> = Vec::new();

        let (result, written) = prepared
            .compare_and_present(&mut sink, &presenter, "a&b")
            .unwrap();
        assert!(result.is_match);
        assert!(written.is_none());
        assert_eq!(presenter.0.into_inner(), vec![("a&b".to_string(), (20, 20))]);
    }

    #[test]
    fn json_report_lists_mismatches() {
        let a = RgbImage::from_pixel(20, 20, Rgb([0, 0, 0]));
        let mut b = a.clone();
        for y in 10..20 {
            for x in 0..10 {
                b.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        let result = compare(&a, &b, &ComparisonConfig::default().with_grid(2, 2)).unwrap();
        let report = result.to_json();
        assert_eq!(report["match"], json!(false));
        assert_eq!(report["mismatched"], json!([{ "col": 0, "row": 1 }]));
        assert_eq!(report["grid"]["block_width"], json!(10));
        assert_eq!(report["diffs"], Value::Null);
    }
}
