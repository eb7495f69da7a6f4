pub mod config;
pub mod error;
pub mod session;
pub mod state;

pub use config::get_config_path;
pub use config::load_config;
pub use config::load_config_from;
pub use config::save_config;
pub use config::Config;
pub use config::FileStateConfig;
pub use config::ShareConfig;

pub use error::{NtStatus, Result, ShareStateError};

pub use session::{LocalTransactionService, OpenFile, SrvSession, Transaction, TransactionService};

pub use state::{
    normalize_path, AccessMode, FileLock, FileState, FileStateReaper, FileStateTable, FileStatus,
    LockKind, OpenParams, SharedAccess,
};
