//! Coarse block-based image comparison.
//!
//! Both images are converted to grayscale, laid over a fixed grid, and the
//! brightness of every block is compared. Blocks whose brightness differs by
//! more than a threshold are outlined on a copy of the second image.

pub mod brightness;
pub mod classify;
pub mod compare;
pub mod config;
pub mod error;
pub mod grid;
pub mod imgproc;
pub mod io;
pub mod overlay;
pub mod report;

pub use brightness::{Normalization, NormalizationStrategy};
pub use compare::{compare, prepare, Comparator, ComparisonResult, ImageSource, Prepared};
pub use config::ComparisonConfig;
pub use error::{CompareError, IoFailure};
pub use grid::{BlockCoord, Grid};
pub use imgproc::{Grayscale, GrayscaleStrategy};
pub use io::{FsLoader, FsPresenter, Loader, Presenter};
pub use report::{DebugLevel, DebugSink};
