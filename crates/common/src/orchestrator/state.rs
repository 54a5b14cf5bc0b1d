use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Classify, ErrorKind};
use crate::store::FileMetadata;

/// How long a success banner stays up before the view returns to idle
pub const SUCCESS_BANNER: Duration = Duration::from_secs(3);
/// How long a cancellation banner stays up
pub const CANCELLED_BANNER: Duration = Duration::from_secs(4);

pub const PRECONDITIONS_MESSAGE: &str = "Please connect your wallet and select a file first!";
pub const CONNECT_FIRST_MESSAGE: &str = "Please connect your wallet first!";
pub const BUSY_MESSAGE: &str = "Another transfer is already in progress";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStep {
    AwaitingLedger,
    AwaitingStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStep {
    AwaitingLedger,
    AwaitingGateway,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: ErrorKind,
    /// Underlying error text, kept for diagnostics
    pub message: String,
}

impl Failure {
    pub fn from_error<E: Classify + fmt::Display>(err: &E) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// Short text for the banner
    pub fn headline(&self) -> &'static str {
        self.kind.default_message()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.headline(), self.message)
    }
}

/// Whole-value state of the transfer view
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    FileSelected {
        name: String,
        size: u64,
    },
    Uploading(UploadStep),
    Downloading {
        cid: String,
        step: DownloadStep,
    },
    /// Auto-clears after [`SUCCESS_BANNER`]
    Success(String),
    /// Persists until dismissed or replaced
    Failed(Failure),
    /// Auto-clears after [`CANCELLED_BANNER`]
    Cancelled,
}

impl State {
    /// A transfer is in flight; the blocking indicator is shown
    pub fn is_busy(&self) -> bool {
        matches!(self, State::Uploading(_) | State::Downloading { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Success(_) | State::Failed(_) | State::Cancelled)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "idle"),
            State::FileSelected { name, size } => write!(f, "selected {} ({} bytes)", name, size),
            State::Uploading(UploadStep::AwaitingLedger) => {
                write!(f, "uploading: waiting for ledger confirmation")
            }
            State::Uploading(UploadStep::AwaitingStore) => {
                write!(f, "uploading: sending to content store")
            }
            State::Downloading { cid, step } => match step {
                DownloadStep::AwaitingLedger => {
                    write!(f, "downloading {}: waiting for ledger confirmation", cid)
                }
                DownloadStep::AwaitingGateway => write!(f, "downloading {}: fetching", cid),
            },
            State::Success(message) => write!(f, "{}", message),
            State::Failed(failure) => write!(f, "{}", failure),
            State::Cancelled => write!(f, "{}", ErrorKind::UserRejected.default_message()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Preconditions not met; nothing was attempted
    Rejected(&'static str),
    Stored(FileMetadata),
    Cancelled,
    Failed(Failure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Rejected(&'static str),
    Fetched { cid: String, bytes: Bytes },
    Cancelled,
    Failed(Failure),
}
