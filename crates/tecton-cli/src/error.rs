use tecton_core::{ClientError, TectonError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Tecton(#[from] TectonError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ClientError> for CliError {
    fn from(error: ClientError) -> Self {
        Self::Tecton(TectonError::Client(error))
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Tecton(TectonError::Client(_)) => 2,
            Self::Tecton(TectonError::Server(_)) => 3,
            Self::Tecton(TectonError::Response(_)) => 4,
            Self::Tecton(TectonError::Transport(_)) => 5,
            Self::Tecton(TectonError::Serialization(_)) | Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }

    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Tecton(error) => error.code(),
            Self::Serialization(_) => "cli.serialization",
            Self::Io(_) => "cli.io",
        }
    }
}
