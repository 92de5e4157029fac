// ============================================================================
// Error Handling
// ============================================================================

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrintError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Rendering surface failure: {0}")]
    RenderingSurfaceFailure(String),
    #[error("Failed to load records: {0}")]
    SourceError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PrintError {
    /// Whether this error ends the whole batch. Only a bad record can be
    /// skipped while the run continues.
    pub fn aborts_batch(&self) -> bool {
        !matches!(self, PrintError::InvalidRecord(_))
    }
}

/// Errors reported by a rendering surface implementation.
#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("surface is already closed")]
    Closed,
    #[error("no page has been started")]
    NoPage,
    #[error("PDF error: {0}")]
    Pdf(String),
    #[error("failed to load {0}")]
    Resource(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SurfaceError> for PrintError {
    fn from(err: SurfaceError) -> Self {
        PrintError::RenderingSurfaceFailure(err.to_string())
    }
}
