//! Error types for the recomendar CLI.

use std::path::PathBuf;
use std::process::ExitCode;

use recomendar::RecomendarError;
use thiserror::Error;

/// Result type alias for CLI operations
pub(crate) type Result<T> = std::result::Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug)]
pub(crate) enum CliError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Ensemble configuration could not be read
    #[error("Invalid config {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error raised by the library
    #[error(transparent)]
    Recomendar(#[from] RecomendarError),
}

impl CliError {
    /// Get exit code for this error
    pub(crate) fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    fn code(&self) -> u8 {
        match self {
            Self::FileNotFound(_) => 3,
            Self::InvalidConfig { .. } | Self::Recomendar(RecomendarError::Parse { .. }) => 4,
            Self::Recomendar(RecomendarError::InvalidHyperparameter { .. }) => 5,
            Self::Io(_) | Self::Recomendar(RecomendarError::Io(_)) => 7,
            Self::Recomendar(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::FileNotFound(PathBuf::from("x")).code(), 3);
        let parse = CliError::from(RecomendarError::Parse {
            line: 2,
            message: "bad".into(),
        });
        assert_eq!(parse.code(), 4);
        let io = CliError::from(std::io::Error::other("disk"));
        assert_eq!(io.code(), 7);
        let other = CliError::from(RecomendarError::UnknownPlaylist {
            playlist: 9,
            n_playlists: 3,
        });
        assert_eq!(other.code(), 1);
    }

    #[test]
    fn test_display_includes_path() {
        let err = CliError::InvalidConfig {
            path: PathBuf::from("cfg.json"),
            message: "expected value".into(),
        };
        assert_eq!(err.to_string(), "Invalid config cfg.json: expected value");
    }
}
