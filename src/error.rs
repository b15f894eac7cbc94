use thiserror::Error;

/// Everything that can stop an analysis, from a missing form field to a
/// failed remote call. All variants are shown to the user; none is fatal.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Please upload an image.")]
    MissingImage,

    #[error("Please enter your {provider} API key.")]
    MissingCredential { provider: String },

    #[error("An analysis is already running. Please wait for it to finish.")]
    Busy,

    #[error("Provider configuration is incomplete: {reason}")]
    InvalidProvider { reason: String },

    #[error("Unsupported image '{file_name}': only png, jpg and jpeg files are accepted.")]
    UnsupportedImage { file_name: String },

    #[error("Image data could not be read: {0}")]
    InvalidImageData(String),

    #[error("An error occurred: {0:#}")]
    RemoteRequest(#[source] anyhow::Error),
}

impl AnalysisError {
    /// Preconditions only warn; the form stays usable and nothing was sent.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            AnalysisError::MissingImage
                | AnalysisError::MissingCredential { .. }
                | AnalysisError::Busy
        )
    }
}

pub type Result<T, E = AnalysisError> = std::result::Result<T, E>;
