//! Error enum
use std::fmt;

use crate::record::RecordError;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Unparseable line starting at byte `offset`.
    MalformedRecord {
        offset: u64,
        reason: RecordError,
        line: String,
    },
    /// Group `key` reappears at byte `offset` after its group was closed.
    UnsortedInput { offset: u64, key: String },
    EmptyGroup(String),
    ZeroMass { key: String, mass: f64 },
    Config(String),
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl Error {
    /// Position of the error in the input file, if any.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::MalformedRecord { offset, .. } | Self::UnsortedInput { offset, .. } => {
                Some(*offset)
            }
            _ => None,
        }
    }

    pub(crate) fn malformed(offset: u64, reason: RecordError, line: &[u8]) -> Self {
        let line = String::from_utf8_lossy(line)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        Self::MalformedRecord {
            offset,
            reason,
            line,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::MalformedRecord {
                offset,
                reason,
                line,
            } => write!(
                f,
                "malformed record at byte {}: {} (line: {:?})",
                offset, reason, line
            ),
            Self::UnsortedInput { offset, key } => write!(
                f,
                "input is not sorted by target phrase: group {:?} reappears at byte {}",
                key, offset
            ),
            Self::EmptyGroup(key) => write!(f, "group {:?} has no entries", key),
            Self::ZeroMass { key, mass } => {
                write!(f, "group {:?} has an invalid probability mass ({})", key, mass)
            }
            Self::Config(msg) => write!(f, "invalid configuration: {}", msg),
            Self::ThreadPool(e) => write!(f, "could not build worker pool: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::ThreadPool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(e: tempfile::PersistError) -> Error {
        Error::Io(e.error)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(e: rayon::ThreadPoolBuildError) -> Error {
        Error::ThreadPool(e)
    }
}
