use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fxhash::FxBuildHasher;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Result, ShareStateError};
use crate::state::file_state::FileState;
use crate::state::path::normalize_path;
use crate::state::types::{
    FileStatus, OpenParams, DEFAULT_FILE_STATE_TIMEOUT, DEFAULT_RENAME_STATE_TIMEOUT,
};

type StateMap = DashMap<String, Arc<FileState>, FxBuildHasher>;

/// The file states of one share, keyed by normalized path.
///
/// Opens and the expiry sweep both go through the map's shard locks, so an
/// open that finds a state always holds a reference before the sweep can
/// look at it again.
#[derive(Debug)]
pub struct FileStateTable {
    name: String,
    states: StateMap,
    default_timeout: Duration,
    rename_timeout: Duration,
    #[cfg(test)]
    fail_sweep: std::sync::atomic::AtomicBool,
}

impl FileStateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_timeouts(name, DEFAULT_FILE_STATE_TIMEOUT, DEFAULT_RENAME_STATE_TIMEOUT)
    }

    pub fn with_timeouts(
        name: impl Into<String>,
        default_timeout: Duration,
        rename_timeout: Duration,
    ) -> Self {
        FileStateTable {
            name: name.into(),
            states: DashMap::with_hasher(FxBuildHasher::default()),
            default_timeout,
            rename_timeout,
            #[cfg(test)]
            fail_sweep: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn rename_timeout(&self) -> Duration {
        self.rename_timeout
    }

    fn new_state(&self, key: &str, is_dir: bool) -> Arc<FileState> {
        let status = if is_dir {
            FileStatus::FolderExists
        } else {
            FileStatus::FileExists
        };
        tracing::debug!("Creating file state for {} in {}", key, self.name);
        Arc::new(FileState::new(key, status, Some(self.default_timeout)))
    }

    /// Look up the state for `path`, optionally creating it.
    pub fn find_file_state(
        &self,
        path: &str,
        create: bool,
        is_dir: bool,
    ) -> Option<Arc<FileState>> {
        let key = normalize_path(path);
        if let Some(state) = self.states.get(&key) {
            return Some(Arc::clone(state.value()));
        }
        if !create {
            return None;
        }
        let entry = self
            .states
            .entry(key.clone())
            .or_insert_with(|| self.new_state(&key, is_dir));
        Some(Arc::clone(entry.value()))
    }

    /// Find or create the state for `path` and count an open against it.
    ///
    /// The sharing check and the increment happen while the entry is held,
    /// which keeps the sweep from evicting the state in between.
    pub fn open_file_state(&self, path: &str, params: &OpenParams) -> Result<Arc<FileState>> {
        let key = normalize_path(path);
        let entry = self
            .states
            .entry(key.clone())
            .or_insert_with(|| self.new_state(&key, params.is_directory));
        let state = Arc::clone(entry.value());

        match state.try_open(params) {
            Some(count) => {
                state.update_expiry(self.default_timeout);
                tracing::debug!("Opened {} (opens={})", key, count);
                Ok(state)
            }
            None => {
                tracing::debug!(
                    "Sharing violation on {}: held {:?}, requested {:?}/{:?}",
                    key,
                    state.shared_access(),
                    params.access,
                    params.shared_access
                );
                Err(ShareStateError::SharingViolation(key))
            }
        }
    }

    /// Count a close against `state` and restart its expiry timer.
    pub fn close_file_state(&self, state: &FileState) -> u32 {
        let count = state.decrement_open_count();
        state.update_expiry(self.default_timeout);
        count
    }

    /// Drop the state for `path`, used when the file is deleted.
    pub fn remove_file_state(&self, path: &str) -> Option<Arc<FileState>> {
        let key = normalize_path(path);
        let removed = self.states.remove(&key).map(|(_, state)| state);
        if removed.is_some() {
            tracing::debug!("Removed file state for {} from {}", key, self.name);
        }
        removed
    }

    /// Delete the state for `path` unless a session still holds it.
    ///
    /// The open and lock checks run under the entry's shard lock, so an open
    /// racing the delete either lands first and refuses it, or finds no
    /// state and creates a fresh one. Returns `None` when no state exists.
    pub fn remove_file_state_if_idle(&self, path: &str) -> Result<Option<Arc<FileState>>> {
        self.remove_idle(&normalize_path(path), None)
    }

    /// Delete-on-close removal of `state` after its last close.
    pub(crate) fn remove_closed_file_state(
        &self,
        state: &Arc<FileState>,
    ) -> Result<Option<Arc<FileState>>> {
        self.remove_idle(&state.path(), Some(state))
    }

    fn remove_idle(
        &self,
        key: &str,
        expected: Option<&Arc<FileState>>,
    ) -> Result<Option<Arc<FileState>>> {
        let Entry::Occupied(occupied) = self.states.entry(key.to_string()) else {
            return Ok(None);
        };

        let state = occupied.get();
        if expected.is_some_and(|expected| !Arc::ptr_eq(expected, state)) {
            return Ok(None);
        }
        if !state.exists() {
            return Err(ShareStateError::FileNotFound(key.to_string()));
        }
        if state.open_count() > 0 || state.has_active_locks() {
            return Err(ShareStateError::SharingViolation(key.to_string()));
        }

        state.set_file_status(FileStatus::NotExist);
        let (_, removed) = occupied.remove_entry();
        tracing::debug!("Deleted file state for {} from {}", key, self.name);
        Ok(Some(removed))
    }

    /// Move the state at `old_path` to `new_path`.
    ///
    /// The live state keeps its opens and locks under the new key; the old
    /// key gets a renamed placeholder forwarding to it, which expires after
    /// the rename timeout. Each key is checked and updated under its own
    /// entry guard, and the two guards are never held together.
    pub fn rename_file_state(
        &self,
        old_path: &str,
        new_path: &str,
        is_dir: bool,
    ) -> Result<Arc<FileState>> {
        let old_key = normalize_path(old_path);
        let new_key = normalize_path(new_path);
        let status = if is_dir {
            FileStatus::FolderExists
        } else {
            FileStatus::FileExists
        };

        let state = match self.states.get(&old_key) {
            Some(entry) if entry.exists() => Arc::clone(entry.value()),
            _ => return Err(ShareStateError::FileNotFound(old_key)),
        };

        if old_key == new_key {
            state.set_file_status(status);
            state.update_expiry(self.default_timeout);
            return Ok(state);
        }

        match self.states.entry(new_key.clone()) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get();
                if existing.exists() || existing.open_count() > 0 {
                    return Err(ShareStateError::FileExists(new_key));
                }
                state.set_path(new_key.clone());
                state.set_file_status(status);
                occupied.insert(Arc::clone(&state));
            }
            Entry::Vacant(vacant) => {
                state.set_path(new_key.clone());
                state.set_file_status(status);
                vacant.insert(Arc::clone(&state));
            }
        }
        state.update_expiry(self.default_timeout);

        if let Entry::Occupied(mut occupied) = self.states.entry(old_key.clone()) {
            if Arc::ptr_eq(occupied.get(), &state) {
                let placeholder = Arc::new(FileState::new(
                    old_key.clone(),
                    FileStatus::Renamed,
                    Some(self.rename_timeout),
                ));
                placeholder.set_rename_state(Arc::clone(&state));
                occupied.insert(placeholder);
            }
        }

        tracing::debug!("Renamed file state {} -> {} in {}", old_key, new_key, self.name);
        Ok(state)
    }

    pub fn remove_expired_file_states(&self) -> usize {
        self.remove_expired_file_states_at(Instant::now())
    }

    /// Evict states that expired before `now` and have no opens or locks.
    pub fn remove_expired_file_states_at(&self, now: Instant) -> usize {
        self.check_sweep_fault();
        let mut removed = 0;
        self.states.retain(|path, state| {
            if state.is_reapable(now) {
                tracing::debug!("Expired file state {}", path);
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Drop every state, used when the share is unmounted.
    pub fn remove_all_file_states(&self) -> usize {
        let count = self.states.len();
        self.states.clear();
        tracing::debug!("Cleared {} file states from {}", count, self.name);
        count
    }

    pub fn number_of_states(&self) -> usize {
        self.states.len()
    }

    /// Number of states currently held open by at least one session.
    pub fn number_of_open_states(&self) -> usize {
        self.states
            .iter()
            .filter(|entry| entry.value().open_count() > 0)
            .count()
    }

    #[cfg(test)]
    pub(crate) fn fail_sweeps(&self) {
        self.fail_sweep.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    #[cfg(test)]
    fn check_sweep_fault(&self) {
        if self.fail_sweep.load(std::sync::atomic::Ordering::SeqCst) {
            panic!("injected sweep failure in {}", self.name);
        }
    }

    #[cfg(not(test))]
    fn check_sweep_fault(&self) {}

    pub fn dump_states(&self) {
        tracing::debug!("File state table {} ({} entries)", self.name, self.states.len());
        for entry in self.states.iter() {
            tracing::debug!("  {} = {}", entry.key(), entry.value());
        }
    }
}
