//! File system and viewer collaborators.
//!
//! Nothing in the comparison pipeline touches paths or processes; it goes
//! through [`Loader`] and [`Presenter`] instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::thread::{self, JoinHandle};

use image::{DynamicImage, RgbImage};
use log::{info, warn};

use crate::error::IoFailure;

pub const SAMPLES_DIR: &str = "samples";
pub const RESULTS_DIR: &str = "results";
pub const RESULT_EXTENSION: &str = "jpg";

const VIEWERS: [&str; 3] = ["xdg-open", "open", "explorer"];

pub trait Loader {
    fn load(&self, name: &Path) -> Result<DynamicImage, IoFailure>;
}

pub trait Presenter {
    /// Persists and/or shows the overlay. Returns where it was written, if
    /// anywhere.
    fn present(&self, overlay: &RgbImage, name: &str) -> Result<Option<PathBuf>, IoFailure>;
}

/// Reads images from disk. Relative names that don't exist as given resolve
/// against `samples_dir` when that is set.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    samples_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_samples_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            samples_dir: Some(dir.into()),
        }
    }

    pub fn resolve(&self, name: &Path) -> PathBuf {
        match &self.samples_dir {
            Some(dir) if name.is_relative() && !name.exists() => dir.join(name),
            _ => name.to_path_buf(),
        }
    }
}

impl Loader for FsLoader {
    fn load(&self, name: &Path) -> Result<DynamicImage, IoFailure> {
        let path = self.resolve(name);
        info!("Loading `{}`", path.display());
        image::open(&path).map_err(|source| IoFailure::Decode { path, source })
    }
}

/// Writes overlays as `<results_dir>/<name>.jpg` and optionally hands them
/// to the platform viewer.
#[derive(Debug, Clone)]
pub struct FsPresenter {
    results_dir: PathBuf,
    open_viewer: bool,
}

impl FsPresenter {
    pub fn new(results_dir: impl Into<PathBuf>) -> Self {
        Self {
            results_dir: results_dir.into(),
            open_viewer: false,
        }
    }

    pub fn open_viewer(mut self, open: bool) -> Self {
        self.open_viewer = open;
        self
    }

    pub fn result_path(&self, name: &str) -> PathBuf {
        self.results_dir.join(format!("{}.{}", name, RESULT_EXTENSION))
    }

    pub fn save(&self, overlay: &RgbImage, name: &str) -> Result<PathBuf, IoFailure> {
        fs::create_dir_all(&self.results_dir).map_err(|source| IoFailure::ResultsDir {
            path: self.results_dir.clone(),
            source,
        })?;

        let path = self.result_path(name);
        overlay
            .save(&path)
            .map_err(|source| IoFailure::Encode {
                path: path.clone(),
                source,
            })?;
        info!("Overlay saved to `{}`", path.display());
        Ok(path)
    }
}

impl Presenter for FsPresenter {
    fn present(&self, overlay: &RgbImage, name: &str) -> Result<Option<PathBuf>, IoFailure> {
        let path = self.save(overlay, name)?;
        if self.open_viewer {
            launch_viewer(&path)?;
        }
        Ok(Some(path))
    }
}

/// Opens `path` with the first platform opener found in PATH. Doesn't wait
/// for the viewer to exit; the child is reaped in the background.
pub fn launch_viewer(path: &Path) -> Result<(), IoFailure> {
    let viewer = VIEWERS
        .iter()
        .find_map(|name| which::which(name).ok())
        .ok_or_else(|| {
            warn!("None of {:?} found in PATH", VIEWERS);
            IoFailure::NoViewer
        })?;

    info!("Opening `{}` with {}", path.display(), viewer.display());
    let mut command = Command::new(&viewer);
    command.arg(path);
    spawn_reaped(&mut command, path).map(|_| ())
}

/// Spawns `command` and waits on it from a separate thread, so repeated
/// launches don't leave zombies behind.
fn spawn_reaped(
    command: &mut Command,
    path: &Path,
) -> Result<JoinHandle<Option<ExitStatus>>, IoFailure> {
    let mut child = command.spawn().map_err(|source| IoFailure::Viewer {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(thread::spawn(move || match child.wait() {
        Ok(status) => Some(status),
        Err(e) => {
            warn!("Couldn't wait on viewer process: {}", e);
            None
        }
    }))
}

/// `a.jpg` + `b.png` -> `a&b`. Everything from the first `.` of each file
/// name is dropped.
pub fn result_name(first: &Path, second: &Path) -> String {
    format!("{}&{}", sample_stem(first), sample_stem(second))
}

fn sample_stem(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name.split('.').next().unwrap_or_default().to_string()
}
