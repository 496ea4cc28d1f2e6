use thiserror::Error;

/// The five wire-level error categories from `spec.md` §7. Every failure
/// surfaced to a client collapses into one of these; the server never
/// sends a stack trace or an internal path beyond what the command itself
/// referenced.
#[derive(Debug, Error)]
pub enum VtsError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("no source loaded")]
    NotLoaded,

    #[error("{0}")]
    InternalError(String),
}

impl VtsError {
    /// Wire code, per `spec.md` §7.
    pub fn code(&self) -> u16 {
        match self {
            VtsError::UnknownCommand(_) => 400,
            VtsError::InvalidArgument(_) => 401,
            VtsError::FileNotFound(_) => 404,
            VtsError::NotLoaded => 501,
            VtsError::InternalError(_) => 500,
        }
    }
}

/// Any failure we did not anticipate (ffmpeg internals, I/O surprises)
/// collapses to `InternalError` rather than leaking a cause chain to the
/// client. The original error is still logged at `debug` by the caller.
impl From<anyhow::Error> for VtsError {
    fn from(e: anyhow::Error) -> Self {
        VtsError::InternalError(e.to_string())
    }
}

impl From<vts_colorspace::ConvertError> for VtsError {
    fn from(e: vts_colorspace::ConvertError) -> Self {
        VtsError::InternalError(e.to_string())
    }
}
