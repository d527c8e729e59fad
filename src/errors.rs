use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishErrorKind {
    Disposed,
    NoCaptureDevice,
    Construction,
    Sender,
    AlreadyExists,
    Unsupported,
    Capture,
    Close,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("track is disposed")]
    Disposed,
    #[error("No capture device available: {0}")]
    NoCaptureDevice(String),
    #[error("Track construction error: {0}")]
    Construction(String),
    #[error("Sender error: {0}")]
    Sender(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    #[error("Capture error: {0}")]
    Capture(String),
    #[error("Close error: {0}")]
    Close(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PublishError {
    pub fn kind(&self) -> PublishErrorKind {
        match self {
            PublishError::Disposed => PublishErrorKind::Disposed,
            PublishError::NoCaptureDevice(_) => PublishErrorKind::NoCaptureDevice,
            PublishError::Construction(_) => PublishErrorKind::Construction,
            PublishError::Sender(_) => PublishErrorKind::Sender,
            PublishError::AlreadyExists(_) => PublishErrorKind::AlreadyExists,
            PublishError::Unsupported(_) => PublishErrorKind::Unsupported,
            PublishError::Capture(_) => PublishErrorKind::Capture,
            PublishError::Close(_) => PublishErrorKind::Close,
            PublishError::Config(_) => PublishErrorKind::Config,
        }
    }

    /// Construction failures leave the track without a usable pipeline.
    pub fn is_construction_failure(&self) -> bool {
        matches!(
            self.kind(),
            PublishErrorKind::NoCaptureDevice | PublishErrorKind::Construction
        )
    }
}
