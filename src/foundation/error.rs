use std::path::{Path, PathBuf};

pub type PosterResult<T> = Result<T, PosterError>;

#[derive(thiserror::Error, Debug)]
pub enum PosterError {
    /// Caller-supplied value rejected before any rendering work begins.
    #[error("config error: {0}")]
    Config(String),

    #[error("No color found with ID {0}")]
    Lookup(i64),

    #[error("rasterization error: {0}")]
    Rasterization(String),

    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PosterError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn rasterization(msg: impl Into<String>) -> Self {
        Self::Rasterization(msg.into())
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// `true` for errors caused by the request itself rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Lookup(_))
    }
}
