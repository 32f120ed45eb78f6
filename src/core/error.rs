//! Error types for splitfetch
//!
//! Every failure carries the pipeline stage it belongs to, and range-level failures carry
//! the index of the byte window that could not be fetched or merged.

use std::fmt;

use reqwest::StatusCode;

/// Pipeline stages, in the order a run walks through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Probing,
    Planning,
    Fetching,
    Assembling,
    Cleaning,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Probing => "probing",
            Stage::Planning => "planning",
            Stage::Fetching => "fetching",
            Stage::Assembling => "assembling",
            Stage::Cleaning => "cleaning",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Why a single range transfer failed
#[derive(Debug)]
pub enum FetchCause {
    /// The request could not be sent or the response headers never arrived
    Transport(reqwest::Error),

    /// The server answered with something other than 206 Partial Content
    Status(StatusCode),

    /// The response body stream broke off mid-transfer
    Body(std::io::Error),

    /// Writing the temporary part file failed
    Io(std::io::Error),

    /// The server sent a different number of bytes than the range asked for
    LengthMismatch { expected: u64, actual: u64 },
}

impl FetchCause {
    /// Whether retrying the same request could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchCause::Transport(_) | FetchCause::Body(_) => true,
            FetchCause::Status(status) => status.is_server_error(),
            FetchCause::Io(_) | FetchCause::LengthMismatch { .. } => false,
        }
    }
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Transport(err) => write!(f, "request failed: {err}"),
            FetchCause::Status(status) => {
                write!(f, "expected 206 Partial Content, server answered {status}")
            }
            FetchCause::Body(err) => write!(f, "response body interrupted: {err}"),
            FetchCause::Io(err) => write!(f, "could not write part file: {err}"),
            FetchCause::LengthMismatch { expected, actual } => {
                write!(f, "expected {expected} bytes, received {actual}")
            }
        }
    }
}

impl std::error::Error for FetchCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchCause::Transport(err) => Some(err),
            FetchCause::Body(err) | FetchCause::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchCause {
    fn from(err: reqwest::Error) -> Self {
        FetchCause::Transport(err)
    }
}

impl From<std::io::Error> for FetchCause {
    fn from(err: std::io::Error) -> Self {
        FetchCause::Io(err)
    }
}

/// Why merging part files into the output failed
#[derive(Debug)]
pub enum AssemblyCause {
    Io(std::io::Error),

    /// A part file held fewer or more bytes than its fetch reported
    Incomplete { expected: u64, actual: u64 },
}

impl fmt::Display for AssemblyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyCause::Io(err) => write!(f, "{err}"),
            AssemblyCause::Incomplete { expected, actual } => {
                write!(f, "copied {actual} of {expected} bytes")
            }
        }
    }
}

impl std::error::Error for AssemblyCause {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AssemblyCause::Io(err) => Some(err),
            AssemblyCause::Incomplete { .. } => None,
        }
    }
}

impl From<std::io::Error> for AssemblyCause {
    fn from(err: std::io::Error) -> Self {
        AssemblyCause::Io(err)
    }
}

/// Main error type for splitfetch operations
#[derive(Debug)]
pub enum Error {
    /// Invalid configuration or parameters
    InvalidInput(String),

    /// File I/O error outside of the fetch and assembly stages
    IoError(std::io::Error),

    /// The resource size could not be determined
    SizeUnavailable { url: String, reason: String },

    /// One range could not be transferred
    RangeFetchFailed { index: usize, cause: FetchCause },

    /// Merging the parts failed; `index` is `None` when finalizing the output failed
    AssemblyFailed {
        index: Option<usize>,
        cause: AssemblyCause,
    },
}

impl Error {
    /// The stage the run was in when this error occurred
    pub fn stage(&self) -> Stage {
        match self {
            Error::InvalidInput(_) | Error::IoError(_) => Stage::Idle,
            Error::SizeUnavailable { .. } => Stage::Probing,
            Error::RangeFetchFailed { .. } => Stage::Fetching,
            Error::AssemblyFailed { .. } => Stage::Assembling,
        }
    }

    /// Index of the range responsible for the failure, if any
    pub fn range_index(&self) -> Option<usize> {
        match self {
            Error::RangeFetchFailed { index, .. } => Some(*index),
            Error::AssemblyFailed { index, .. } => *index,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => {
                write!(f, "Invalid input: {msg}")
            }
            Error::IoError(err) => {
                write!(f, "I/O error: {err}")
            }
            Error::SizeUnavailable { url, reason } => {
                write!(f, "Could not determine size of {url}: {reason}")
            }
            Error::RangeFetchFailed { index, cause } => {
                write!(f, "Range {index} failed: {cause}")
            }
            Error::AssemblyFailed {
                index: Some(index),
                cause,
            } => {
                write!(f, "Assembly failed at range {index}: {cause}")
            }
            Error::AssemblyFailed { index: None, cause } => {
                write!(f, "Assembly failed while finalizing output: {cause}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::RangeFetchFailed { cause, .. } => Some(cause),
            Error::AssemblyFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

/// Convenience result type for splitfetch operations
pub type Result<T> = std::result::Result<T, Error>;
