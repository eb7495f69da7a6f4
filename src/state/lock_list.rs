#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockKind {
    #[default]
    Exclusive,
    Shared,
}

/// A byte-range lock over `[offset, offset + length)` owned by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLock {
    pub offset: u64,
    pub length: u64,
    pub pid: u32,
    pub kind: LockKind,
}

impl FileLock {
    pub fn new(offset: u64, length: u64, pid: u32) -> Self {
        FileLock {
            offset,
            length,
            pid,
            kind: LockKind::Exclusive,
        }
    }

    pub fn shared(offset: u64, length: u64, pid: u32) -> Self {
        FileLock {
            kind: LockKind::Shared,
            ..Self::new(offset, length, pid)
        }
    }

    /// End offset (exclusive), clamped at `u64::MAX`.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.length)
    }

    pub fn is_shared(&self) -> bool {
        self.kind == LockKind::Shared
    }

    /// Zero-length ranges never overlap anything. Ranges running past the end
    /// of the offset space are clamped to the last byte, so a lock at
    /// `u64::MAX` still covers that byte.
    pub fn overlaps(&self, offset: u64, length: u64) -> bool {
        if self.length == 0 || length == 0 {
            return false;
        }
        let last = offset.saturating_add(length - 1);
        let self_last = self.offset.saturating_add(self.length - 1);
        self.offset <= last && offset <= self_last
    }

    pub fn conflicts_with(&self, other: &FileLock) -> bool {
        if self.pid == other.pid {
            return false;
        }
        if !self.overlaps(other.offset, other.length) {
            return false;
        }
        !(self.is_shared() && other.is_shared())
    }

    /// Exact match used when unlocking: kind is not part of the identity.
    fn matches(&self, other: &FileLock) -> bool {
        self.offset == other.offset && self.length == other.length && self.pid == other.pid
    }
}

/// The byte-range locks held on one file.
#[derive(Debug, Default)]
pub struct LockList {
    locks: Vec<FileLock>,
}

impl LockList {
    pub fn new() -> Self {
        LockList { locks: Vec::new() }
    }

    /// Returns the first existing lock that prevents `lock` from being granted.
    pub fn find_conflict(&self, lock: &FileLock) -> Option<&FileLock> {
        self.locks.iter().find(|existing| existing.conflicts_with(lock))
    }

    pub fn allows_lock(&self, lock: &FileLock) -> bool {
        self.find_conflict(lock).is_none()
    }

    /// Add a lock. Returns false, leaving the list untouched, on conflict.
    pub fn add_lock(&mut self, lock: FileLock) -> bool {
        if !self.allows_lock(&lock) {
            return false;
        }
        self.locks.push(lock);
        true
    }

    /// Remove the lock matching offset, length and owner exactly.
    pub fn remove_lock(&mut self, lock: &FileLock) -> Option<FileLock> {
        let idx = self.locks.iter().position(|existing| existing.matches(lock))?;
        Some(self.locks.remove(idx))
    }

    /// Drop every lock owned by `pid`, returning how many were released.
    pub fn remove_all_for_pid(&mut self, pid: u32) -> usize {
        let before = self.locks.len();
        self.locks.retain(|lock| lock.pid != pid);
        before - self.locks.len()
    }

    pub fn can_read(&self, offset: u64, length: u64, pid: u32) -> bool {
        !self.locks.iter().any(|lock| {
            lock.pid != pid && !lock.is_shared() && lock.overlaps(offset, length)
        })
    }

    pub fn can_write(&self, offset: u64, length: u64, pid: u32) -> bool {
        !self
            .locks
            .iter()
            .any(|lock| lock.pid != pid && lock.overlaps(offset, length))
    }

    pub fn number_of_locks(&self) -> usize {
        self.locks.len()
    }

    pub fn has_locks(&self) -> bool {
        !self.locks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileLock> {
        self.locks.iter()
    }
}
