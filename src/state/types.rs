use bitflags::bitflags;
use std::time::{Duration, Instant};

/// Default lifetime of a file state that nobody references.
pub const DEFAULT_FILE_STATE_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Lifetime of the placeholder left behind at a renamed-away path.
pub const DEFAULT_RENAME_STATE_TIMEOUT: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    NotExist,
    FileExists,
    FolderExists,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::NotExist => "not-exist",
            FileStatus::FileExists => "file",
            FileStatus::FolderExists => "folder",
            FileStatus::Renamed => "renamed",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Sharing mode granted to later openers by the first opener of a file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SharedAccess: u8 {
        const READ = 0x1;
        const WRITE = 0x2;
        const DELETE = 0x4;
    }
}

impl SharedAccess {
    pub const NONE: SharedAccess = SharedAccess::empty();
    pub const READWRITE: SharedAccess = SharedAccess::READ.union(SharedAccess::WRITE);
}

impl Default for SharedAccess {
    fn default() -> Self {
        SharedAccess::READWRITE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl AccessMode {
    pub fn is_read_only(self) -> bool {
        self == AccessMode::ReadOnly
    }

    pub fn is_write_only(self) -> bool {
        self == AccessMode::WriteOnly
    }
}

/// Parameters of an open request as seen by the sharing check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenParams {
    pub access: AccessMode,
    pub shared_access: SharedAccess,
    pub pid: u32,
    pub is_directory: bool,
    pub create: bool,
}

impl OpenParams {
    pub fn new(access: AccessMode, shared_access: SharedAccess, pid: u32) -> Self {
        OpenParams {
            access,
            shared_access,
            pid,
            is_directory: false,
            create: false,
        }
    }

    pub fn read_write(pid: u32) -> Self {
        Self::new(AccessMode::ReadWrite, SharedAccess::READWRITE, pid)
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn with_directory(mut self, is_directory: bool) -> Self {
        self.is_directory = is_directory;
        self
    }
}

/// Opaque identifier of the repository node backing a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef(pub String);

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(Instant),
}

impl Expiry {
    pub fn after(timeout: Duration) -> Self {
        Expiry::At(Instant::now() + timeout)
    }

    pub fn has_passed(&self, now: Instant) -> bool {
        match self {
            Expiry::Never => false,
            Expiry::At(at) => now > *at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readwrite_is_read_and_write() {
        assert!(SharedAccess::READWRITE.contains(SharedAccess::READ));
        assert!(SharedAccess::READWRITE.contains(SharedAccess::WRITE));
        assert!(!SharedAccess::READWRITE.contains(SharedAccess::DELETE));
        assert!(SharedAccess::NONE.is_empty());
    }

    #[test]
    fn test_never_expiry_never_passes() {
        let far_future = Instant::now() + Duration::from_secs(3600 * 24);
        assert!(!Expiry::Never.has_passed(far_future));
    }

    #[test]
    fn test_expiry_passes_strictly_after_deadline() {
        let at = Instant::now();
        let expiry = Expiry::At(at);
        assert!(!expiry.has_passed(at));
        assert!(expiry.has_passed(at + Duration::from_millis(1)));
    }
}
