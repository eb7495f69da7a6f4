pub mod file_state;
pub mod lock_list;
pub mod path;
pub mod reaper;
pub mod table;
pub mod types;

pub use file_state::FileState;
pub use lock_list::{FileLock, LockKind, LockList};
pub use path::normalize_path;
pub use reaper::{FileStateReaper, ReaperState, DEFAULT_SWEEP_INTERVAL};
pub use table::FileStateTable;
pub use types::{
    AccessMode, Expiry, FileStatus, NodeRef, OpenParams, SharedAccess,
    DEFAULT_FILE_STATE_TIMEOUT, DEFAULT_RENAME_STATE_TIMEOUT,
};
