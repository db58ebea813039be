//! Error types for mesh conversion

use std::fmt::Display;
use std::path::{Path, PathBuf};

use crate::format::FormatKind;

/// Errors reported by the router, codecs and manifest loader.
///
/// All of them are terminal: nothing is retried and a partially written
/// output file is left as-is.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// `--input` or `--output` was not supplied
    #[error("missing required argument --{0} (see --help)")]
    MissingArgument(&'static str),

    /// Path matches none of the known formats
    #[error("no eligible codec for {} (use .ply, .vtk, .vtp, .obj or .stl)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Codec failed to read the file
    #[error("failed to read {format} mesh {}: {reason}", .path.display())]
    Decode {
        path: PathBuf,
        format: FormatKind,
        reason: String,
    },

    /// Codec failed to write the file
    #[error("failed to write {format} mesh {}: {reason}", .path.display())]
    Encode {
        path: PathBuf,
        format: FormatKind,
        reason: String,
    },

    /// Batch manifest could not be read or parsed
    #[error("invalid manifest {}: {reason}", .path.display())]
    Manifest { path: PathBuf, reason: String },
}

impl ConvertError {
    pub(crate) fn unsupported(path: &Path) -> Self {
        Self::UnsupportedFormat {
            path: path.to_path_buf(),
        }
    }

    pub(crate) fn decode(path: &Path, format: FormatKind, reason: impl Display) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn encode(path: &Path, format: FormatKind, reason: impl Display) -> Self {
        Self::Encode {
            path: path.to_path_buf(),
            format,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn manifest(path: &Path, reason: impl Display) -> Self {
        Self::Manifest {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
