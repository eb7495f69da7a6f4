use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, ShareStateError};
use crate::state::lock_list::{FileLock, LockList};
use crate::state::path::split_path;
use crate::state::types::{Expiry, FileStatus, NodeRef, OpenParams, SharedAccess};

/// Cached state of one path within a share.
///
/// Tracks existence, the number of client opens, the sharing mode fixed by
/// the first opener, and the byte-range locks held on the file. All mutation
/// goes through the methods below; the fields are guarded by two mutexes,
/// one for the open/status data and one for the lock list. When both are
/// needed the data mutex is always taken first.
#[derive(Debug)]
pub struct FileState {
    file_id: u32,
    inner: Mutex<StateInner>,
    /// Allocated on the first lock request, never released afterwards
    locks: Mutex<Option<LockList>>,
}

#[derive(Debug)]
struct StateInner {
    path: String,
    status: FileStatus,
    open_count: u32,
    shared_access: SharedAccess,
    node_ref: Option<NodeRef>,
    expiry: Expiry,
    rename_target: Option<Arc<FileState>>,
    file_size: Option<u64>,
    delete_on_close: bool,
}

impl FileState {
    /// Create a state for an already normalized path.
    ///
    /// A `timeout` of `None` creates a state that never expires.
    pub fn new(path: impl Into<String>, status: FileStatus, timeout: Option<Duration>) -> Self {
        let path = path.into();
        let file_id = fxhash::hash32(&path.to_uppercase());
        FileState {
            file_id,
            inner: Mutex::new(StateInner {
                path,
                status,
                open_count: 0,
                shared_access: SharedAccess::READWRITE,
                node_ref: None,
                expiry: timeout.map_or(Expiry::Never, Expiry::after),
                rename_target: None,
                file_size: None,
                delete_on_close: false,
            }),
            locks: Mutex::new(None),
        }
    }

    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    pub fn path(&self) -> String {
        self.inner.lock().path.clone()
    }

    /// The final path component, in the case the client used.
    pub fn file_name(&self) -> String {
        let inner = self.inner.lock();
        split_path(&inner.path).1.to_string()
    }

    pub(crate) fn set_path(&self, path: String) {
        self.inner.lock().path = path;
    }

    pub fn file_status(&self) -> FileStatus {
        self.inner.lock().status
    }

    /// Set the existence status. Leaving the renamed status drops the forwarding link.
    pub fn set_file_status(&self, status: FileStatus) {
        let mut inner = self.inner.lock();
        if status != FileStatus::Renamed {
            inner.rename_target = None;
        }
        inner.status = status;
    }

    pub fn exists(&self) -> bool {
        matches!(
            self.file_status(),
            FileStatus::FileExists | FileStatus::FolderExists
        )
    }

    pub fn is_directory(&self) -> bool {
        self.file_status() == FileStatus::FolderExists
    }

    pub fn open_count(&self) -> u32 {
        self.inner.lock().open_count
    }

    pub fn increment_open_count(&self) -> u32 {
        let mut inner = self.inner.lock();
        inner.open_count += 1;
        inner.open_count
    }

    /// Decrement the open count. An underflow is logged and the count stays at zero.
    pub fn decrement_open_count(&self) -> u32 {
        let mut inner = self.inner.lock();
        if inner.open_count == 0 {
            tracing::error!("Open count underflow on {}", inner.path);
            return 0;
        }
        inner.open_count -= 1;
        inner.open_count
    }

    pub fn shared_access(&self) -> SharedAccess {
        self.inner.lock().shared_access
    }

    /// Set the sharing mode. Ignored while the file has opens.
    pub fn set_shared_access(&self, shared_access: SharedAccess) {
        let mut inner = self.inner.lock();
        if inner.open_count == 0 {
            inner.shared_access = shared_access;
        } else {
            tracing::debug!(
                "Ignoring sharing mode change on {} with {} open(s)",
                inner.path,
                inner.open_count
            );
        }
    }

    /// Check whether an open request is compatible with the existing opens.
    pub fn allows_open(&self, params: &OpenParams) -> bool {
        Self::allows_open_locked(&self.inner.lock(), params)
    }

    fn allows_open_locked(inner: &StateInner, params: &OpenParams) -> bool {
        if inner.open_count == 0 {
            return true;
        }
        let current = inner.shared_access;
        if current == SharedAccess::READWRITE && params.shared_access == SharedAccess::READWRITE {
            return true;
        }
        if current.contains(SharedAccess::READ) && params.access.is_read_only() {
            return true;
        }
        current.contains(SharedAccess::WRITE) && params.access.is_write_only()
    }

    /// Run the sharing check and count the open in one critical section.
    ///
    /// The first opener fixes the sharing mode. Returns the new open count,
    /// or `None` if the request is refused.
    pub(crate) fn try_open(&self, params: &OpenParams) -> Option<u32> {
        let mut inner = self.inner.lock();
        if !Self::allows_open_locked(&inner, params) {
            return None;
        }
        if inner.open_count == 0 {
            inner.shared_access = params.shared_access;
        }
        inner.open_count += 1;
        Some(inner.open_count)
    }

    pub fn node_ref(&self) -> Option<NodeRef> {
        self.inner.lock().node_ref.clone()
    }

    pub fn set_node_ref(&self, node_ref: Option<NodeRef>) {
        self.inner.lock().node_ref = node_ref;
    }

    pub fn file_size(&self) -> Option<u64> {
        self.inner.lock().file_size
    }

    pub fn set_file_size(&self, size: Option<u64>) {
        self.inner.lock().file_size = size;
    }

    pub fn delete_on_close(&self) -> bool {
        self.inner.lock().delete_on_close
    }

    pub fn set_delete_on_close(&self, delete: bool) {
        self.inner.lock().delete_on_close = delete;
    }

    pub fn expiry(&self) -> Expiry {
        self.inner.lock().expiry
    }

    /// Push the expiry out to `timeout` from now.
    pub fn update_expiry(&self, timeout: Duration) {
        self.inner.lock().expiry = Expiry::after(timeout);
    }

    pub fn set_expiry(&self, expiry: Expiry) {
        self.inner.lock().expiry = expiry;
    }

    pub fn set_no_expiry(&self) {
        self.set_expiry(Expiry::Never);
    }

    pub fn has_expired(&self, now: Instant) -> bool {
        self.inner.lock().expiry.has_passed(now)
    }

    /// Mark this path as renamed away, forwarding to the state now holding the file.
    pub fn set_rename_state(&self, target: Arc<FileState>) {
        let mut inner = self.inner.lock();
        inner.status = FileStatus::Renamed;
        inner.rename_target = Some(target);
    }

    pub fn rename_target(&self) -> Option<Arc<FileState>> {
        self.inner.lock().rename_target.clone()
    }

    pub fn add_lock(&self, lock: FileLock) -> Result<()> {
        let added = self
            .locks
            .lock()
            .get_or_insert_with(LockList::new)
            .add_lock(lock);
        if added {
            return Ok(());
        }
        // The lock list guard is released before path() takes the data mutex
        Err(ShareStateError::LockConflict {
            path: self.path(),
            offset: lock.offset,
            length: lock.length,
            pid: lock.pid,
        })
    }

    pub fn remove_lock(&self, lock: &FileLock) -> Result<FileLock> {
        let removed = self
            .locks
            .lock()
            .as_mut()
            .and_then(|list| list.remove_lock(lock));
        removed.ok_or_else(|| ShareStateError::NotLocked {
                path: self.path(),
                offset: lock.offset,
                length: lock.length,
                pid: lock.pid,
            })
    }

    /// Release every lock held by `pid`, typically when it closes the file.
    pub fn remove_locks_for_pid(&self, pid: u32) -> usize {
        self.locks
            .lock()
            .as_mut()
            .map_or(0, |list| list.remove_all_for_pid(pid))
    }

    pub fn has_lock_list(&self) -> bool {
        self.locks.lock().is_some()
    }

    pub fn has_active_locks(&self) -> bool {
        self.locks.lock().as_ref().is_some_and(LockList::has_locks)
    }

    pub fn number_of_locks(&self) -> usize {
        self.locks
            .lock()
            .as_ref()
            .map_or(0, LockList::number_of_locks)
    }

    pub fn locks(&self) -> Vec<FileLock> {
        self.locks
            .lock()
            .as_ref()
            .map(|list| list.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn can_read_file(&self, offset: u64, length: u64, pid: u32) -> bool {
        self.locks
            .lock()
            .as_ref()
            .is_none_or(|list| list.can_read(offset, length, pid))
    }

    pub fn can_write_file(&self, offset: u64, length: u64, pid: u32) -> bool {
        self.locks
            .lock()
            .as_ref()
            .is_none_or(|list| list.can_write(offset, length, pid))
    }

    /// True when the state may be evicted: expired, no opens, no locks.
    pub(crate) fn is_reapable(&self, now: Instant) -> bool {
        let inner = self.inner.lock();
        if inner.open_count > 0 || !inner.expiry.has_passed(now) {
            return false;
        }
        !self.has_active_locks()
    }
}

impl std::fmt::Display for FileState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (path, status, open_count, shared_access, target) = {
            let inner = self.inner.lock();
            (
                inner.path.clone(),
                inner.status,
                inner.open_count,
                inner.shared_access,
                inner.rename_target.clone(),
            )
        };
        write!(
            f,
            "[{} id={} status={} opens={} share={:?} locks={}",
            path,
            self.file_id,
            status,
            open_count,
            shared_access,
            self.number_of_locks()
        )?;
        if let Some(target) = target {
            write!(f, " -> {}", target.path())?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::AccessMode;

    fn test_state() -> FileState {
        FileState::new("\\A\\b.txt", FileStatus::FileExists, None)
    }

    #[test]
    fn test_open_count_never_negative() {
        let state = test_state();
        assert_eq!(state.decrement_open_count(), 0);
        assert_eq!(state.increment_open_count(), 1);
        assert_eq!(state.decrement_open_count(), 0);
        assert_eq!(state.decrement_open_count(), 0);
    }

    #[test]
    fn test_first_opener_fixes_sharing_mode() {
        let state = test_state();
        let first = OpenParams::new(AccessMode::ReadOnly, SharedAccess::READ, 1);
        assert_eq!(state.try_open(&first), Some(1));
        assert_eq!(state.shared_access(), SharedAccess::READ);

        state.set_shared_access(SharedAccess::READWRITE);
        assert_eq!(state.shared_access(), SharedAccess::READ);

        let writer = OpenParams::new(AccessMode::ReadWrite, SharedAccess::READWRITE, 2);
        assert_eq!(state.try_open(&writer), None);
        assert_eq!(state.open_count(), 1);

        let reader = OpenParams::new(AccessMode::ReadOnly, SharedAccess::READ, 3);
        assert_eq!(state.try_open(&reader), Some(2));
    }

    #[test]
    fn test_lock_list_allocated_lazily_and_kept() {
        let state = test_state();
        assert!(!state.has_lock_list());
        assert!(state.can_read_file(0, 10, 1));

        state.add_lock(FileLock::new(0, 10, 1)).unwrap();
        assert!(state.has_lock_list());

        state.remove_lock(&FileLock::new(0, 10, 1)).unwrap();
        assert!(state.has_lock_list());
        assert!(!state.has_active_locks());
    }

    #[test]
    fn test_remove_lock_without_list_is_not_locked() {
        let state = test_state();
        let err = state.remove_lock(&FileLock::new(0, 10, 1)).unwrap_err();
        assert!(matches!(err, ShareStateError::NotLocked { .. }));
    }

    #[test]
    fn test_locked_state_is_not_reapable() {
        let state = FileState::new("\\A\\b.txt", FileStatus::FileExists, Some(Duration::ZERO));
        let later = Instant::now() + Duration::from_millis(10);
        state.add_lock(FileLock::new(0, 10, 1)).unwrap();
        assert!(!state.is_reapable(later));

        state.remove_locks_for_pid(1);
        assert!(state.is_reapable(later));
    }

    #[test]
    fn test_leaving_renamed_status_drops_link() {
        let target = Arc::new(test_state());
        let old = FileState::new("\\A\\old.txt", FileStatus::FileExists, None);
        old.set_rename_state(Arc::clone(&target));
        assert_eq!(old.file_status(), FileStatus::Renamed);
        assert!(old.rename_target().is_some());

        old.set_file_status(FileStatus::FileExists);
        assert!(old.rename_target().is_none());
    }

    #[test]
    fn test_file_id_ignores_case() {
        let a = FileState::new("\\A\\b.txt", FileStatus::FileExists, None);
        let b = FileState::new("\\A\\B.TXT", FileStatus::FileExists, None);
        assert_eq!(a.file_id(), b.file_id());
        assert_eq!(a.file_name(), "b.txt");
    }
}
