use std::sync::Arc;

use crate::error::{Result, ShareStateError};
use crate::session::srv_session::SrvSession;
use crate::state::{AccessMode, FileLock, FileState, FileStateTable, FileStatus, LockKind, OpenParams};

/// A file opened by a session.
/// Not `Clone`: closing consumes the handle, so a file cannot be closed twice.
#[derive(Debug)]
pub struct OpenFile {
    state: Arc<FileState>,
    access: AccessMode,
    pid: u32,
}

impl OpenFile {
    pub fn state(&self) -> &Arc<FileState> {
        &self.state
    }

    /// Current path of the file, following renames made while it was open.
    pub fn path(&self) -> String {
        self.state.path()
    }

    pub fn file_id(&self) -> u32 {
        self.state.file_id()
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl SrvSession {
    /// Open (or with `params.create`, create) a file in a share.
    pub fn open_file(
        &mut self,
        table: &FileStateTable,
        path: &str,
        params: OpenParams,
    ) -> Result<OpenFile> {
        let read_only = params.access.is_read_only() && !params.create;
        self.begin_transaction(read_only)?;

        if let Some(existing) = table.find_file_state(path, false, params.is_directory) {
            if !existing.exists() {
                if !params.create {
                    return Err(ShareStateError::FileNotFound(existing.path()));
                }
                existing.set_file_status(if params.is_directory {
                    FileStatus::FolderExists
                } else {
                    FileStatus::FileExists
                });
            }
        }

        let state = table.open_file_state(path, &params)?;
        tracing::debug!(
            "Session {} opened {} ({:?}, opens={})",
            self.session_id(),
            state.path(),
            params.access,
            state.open_count()
        );

        Ok(OpenFile {
            state,
            access: params.access,
            pid: params.pid,
        })
    }

    /// Close a file, releasing the locks its process still holds.
    ///
    /// Returns the remaining open count. The last close of a file marked
    /// delete-on-close removes its state.
    pub fn close_file(&mut self, table: &FileStateTable, file: OpenFile) -> Result<u32> {
        let released = file.state.remove_locks_for_pid(file.pid);
        if released > 0 {
            tracing::debug!(
                "Released {} lock(s) held by pid {} on {}",
                released,
                file.pid,
                file.path()
            );
        }

        let remaining = table.close_file_state(&file.state);
        if remaining == 0 && file.state.delete_on_close() {
            self.begin_transaction(false)?;
            match table.remove_closed_file_state(&file.state) {
                Ok(_) => {}
                // Reopened after our close; the last close of that open deletes it
                Err(ShareStateError::SharingViolation(path)) => {
                    tracing::debug!("Delete on close of {} deferred, file reopened", path);
                }
                Err(ShareStateError::FileNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(remaining)
    }

    pub fn lock_file(
        &mut self,
        file: &OpenFile,
        offset: u64,
        length: u64,
        kind: LockKind,
    ) -> Result<()> {
        self.begin_transaction(true)?;
        file.state.add_lock(FileLock {
            offset,
            length,
            pid: file.pid,
            kind,
        })
    }

    pub fn unlock_file(&mut self, file: &OpenFile, offset: u64, length: u64) -> Result<()> {
        self.begin_transaction(true)?;
        file.state
            .remove_lock(&FileLock::new(offset, length, file.pid))
            .map(|_| ())
    }

    /// Veto a read that overlaps another process's exclusive lock.
    pub fn check_read(&self, file: &OpenFile, offset: u64, length: u64) -> Result<()> {
        if file.state.can_read_file(offset, length, file.pid) {
            return Ok(());
        }
        Err(ShareStateError::RangeLocked {
            path: file.path(),
            offset,
            length,
            pid: file.pid,
        })
    }

    /// Veto a write that overlaps any lock held by another process.
    pub fn check_write(&self, file: &OpenFile, offset: u64, length: u64) -> Result<()> {
        if file.state.can_write_file(offset, length, file.pid) {
            return Ok(());
        }
        Err(ShareStateError::RangeLocked {
            path: file.path(),
            offset,
            length,
            pid: file.pid,
        })
    }

    pub fn rename_file(
        &mut self,
        table: &FileStateTable,
        from: &str,
        to: &str,
    ) -> Result<Arc<FileState>> {
        self.begin_transaction(true)?;
        let is_dir = table
            .find_file_state(from, false, false)
            .is_some_and(|state| state.is_directory());

        self.begin_transaction(false)?;
        table.rename_file_state(from, to, is_dir)
    }

    /// Delete a file. Refused while any session has it open or locked.
    pub fn delete_file(&mut self, table: &FileStateTable, path: &str) -> Result<()> {
        self.begin_transaction(false)?;
        if let Some(state) = table.remove_file_state_if_idle(path)? {
            tracing::debug!("Session {} deleted {}", self.session_id(), state.path());
        }
        Ok(())
    }
}
