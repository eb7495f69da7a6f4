use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShareStateError>;

#[derive(Error, Debug)]
pub enum ShareStateError {
    #[error("Lock conflict on {path}: offset={offset} length={length} pid={pid}")]
    LockConflict {
        path: String,
        offset: u64,
        length: u64,
        pid: u32,
    },

    #[error("Range not locked on {path}: offset={offset} length={length} pid={pid}")]
    NotLocked {
        path: String,
        offset: u64,
        length: u64,
        pid: u32,
    },

    #[error("Range locked by another process on {path}: offset={offset} length={length} pid={pid}")]
    RangeLocked {
        path: String,
        offset: u64,
        length: u64,
        pid: u32,
    },

    #[error("Sharing violation: {0}")]
    SharingViolation(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Scenario check failed: {0}")]
    ScenarioFailed(String),

    #[error("IO error: {0}")]
    Io(std::io::Error),
}

impl ShareStateError {
    /// The status code a protocol handler returns for this error.
    pub fn status(&self) -> NtStatus {
        match self {
            ShareStateError::LockConflict { .. } => NtStatus::LockNotGranted,
            ShareStateError::NotLocked { .. } => NtStatus::RangeNotLocked,
            ShareStateError::RangeLocked { .. } => NtStatus::LockConflict,
            ShareStateError::SharingViolation(_) => NtStatus::SharingViolation,
            ShareStateError::FileNotFound(_) => NtStatus::ObjectNameNotFound,
            ShareStateError::FileExists(_) => NtStatus::ObjectNameCollision,
            ShareStateError::Transaction(_)
            | ShareStateError::Config(_)
            | ShareStateError::ScenarioFailed(_)
            | ShareStateError::Io(_) => NtStatus::InternalError,
        }
    }
}

impl From<std::io::Error> for ShareStateError {
    fn from(err: std::io::Error) -> Self {
        ShareStateError::Io(err)
    }
}

/// NT status codes returned to clients by the request handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NtStatus {
    Success = 0x0000_0000,
    ObjectNameNotFound = 0xC000_0034,
    ObjectNameCollision = 0xC000_0035,
    SharingViolation = 0xC000_0043,
    LockConflict = 0xC000_0054,
    LockNotGranted = 0xC000_0055,
    RangeNotLocked = 0xC000_007E,
    InternalError = 0xC000_00E5,
}

impl NtStatus {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn is_success(self) -> bool {
        self == NtStatus::Success
    }
}

impl std::fmt::Display for NtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} (0x{:08X})", self, self.code())
    }
}
