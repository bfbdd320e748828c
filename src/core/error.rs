//! Error types for the SUBLEQ machine.
//!
//! The failure surface is small: an image can fail to load, and the two
//! byte streams can fail during execution. Loader errors carry the
//! position of the offending value so a broken image can be fixed by
//! hand.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result alias used throughout the crate.
pub type VmResult<T> = Result<T, VmError>;

/// Everything that can go wrong outside the guest program itself.
#[derive(Debug)]
pub enum VmError {
    /// The image file could not be opened or read.
    ImageRead { path: PathBuf, source: io::Error },
    /// A token in the image is not a signed decimal integer.
    ImageToken { position: usize, token: String },
    /// An image value does not fit in a signed 16-bit cell.
    ImageRange { position: usize, value: i64 },
    /// The profiler report file could not be written.
    ReportWrite { path: PathBuf, source: io::Error },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::ImageRead { path, source } => {
                write!(f, "failed to read image '{}': {}", path.display(), source)
            }
            VmError::ImageToken { position, token } => {
                write!(f, "invalid value '{}' at position {}", token, position)
            }
            VmError::ImageRange { position, value } => {
                write!(
                    f,
                    "value {} at position {} exceeds 16-bit signed limit",
                    value, position
                )
            }
            VmError::ReportWrite { path, source } => {
                write!(f, "failed to write '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for VmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmError::ImageRead { source, .. } | VmError::ReportWrite { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}
