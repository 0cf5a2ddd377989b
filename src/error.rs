use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, CompareError>;

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error(
        "dimension mismatch: first is {}x{}, second is {}x{}",
        .first.0, .first.1, .second.0, .second.1
    )]
    DimensionMismatch { first: (u32, u32), second: (u32, u32) },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error(transparent)]
    Io(#[from] IoFailure),
}

impl CompareError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        CompareError::InvalidConfiguration(msg.into())
    }
}

/// Failures owned by the loader/presenter layer. The comparison core only
/// forwards these.
#[derive(Debug, thiserror::Error)]
pub enum IoFailure {
    #[error("couldn't decode `{path}`: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("couldn't encode `{path}`: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("raw buffer of {len} bytes doesn't hold a {width}x{height} RGB image")]
    RawBuffer { width: u32, height: u32, len: usize },

    #[error("couldn't create results directory `{path}`: {source}")]
    ResultsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no image viewer found in PATH")]
    NoViewer,

    #[error("couldn't launch viewer for `{path}`: {source}")]
    Viewer {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
