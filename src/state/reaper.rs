use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{Result, ShareStateError};
use crate::state::table::FileStateTable;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(15_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaperState {
    Running,
    Stopped,
}

struct ReaperShared {
    tables: DashMap<String, Arc<FileStateTable>>,
    state: Mutex<ReaperState>,
    wakeup: Condvar,
    interval: Duration,
}

impl ReaperShared {
    fn is_shutting_down(&self) -> bool {
        *self.state.lock() == ReaperState::Stopped
    }

    /// Sweep every registered table once, returning the total evicted.
    fn sweep(&self) -> usize {
        // Snapshot so shares can register and unregister while we sweep
        let tables: Vec<(String, Arc<FileStateTable>)> = self
            .tables
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();

        let mut total = 0;
        for (name, table) in tables {
            match catch_unwind(AssertUnwindSafe(|| table.remove_expired_file_states())) {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::debug!(
                        "Expired {} file states from {} ({} remaining)",
                        removed,
                        name,
                        table.number_of_states()
                    );
                    total += removed;
                }
                Err(_) if self.is_shutting_down() => {}
                Err(_) => {
                    tracing::warn!("File state sweep of {} failed", name);
                }
            }
        }
        total
    }
}

/// Background sweeper that evicts expired, unreferenced file states from
/// every registered share.
pub struct FileStateReaper {
    shared: Arc<ReaperShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl FileStateReaper {
    /// Start a reaper sweeping at the default interval.
    pub fn new() -> Result<Self> {
        Self::with_interval(DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_interval(interval: Duration) -> Result<Self> {
        let shared = Arc::new(ReaperShared {
            tables: DashMap::new(),
            state: Mutex::new(ReaperState::Running),
            wakeup: Condvar::new(),
            interval,
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("FileStateReaper".to_string())
            .spawn(move || run(worker_shared))
            .map_err(ShareStateError::Io)?;

        tracing::info!("File state reaper started, interval={}ms", interval.as_millis());

        Ok(FileStateReaper {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    pub fn add_state_table(&self, name: impl Into<String>, table: Arc<FileStateTable>) {
        let name = name.into();
        tracing::debug!("Registered file state table {}", name);
        self.shared.tables.insert(name, table);
    }

    pub fn remove_state_table(&self, name: &str) -> Option<Arc<FileStateTable>> {
        let removed = self.shared.tables.remove(name).map(|(_, table)| table);
        if removed.is_some() {
            tracing::debug!("Unregistered file state table {}", name);
        }
        removed
    }

    pub fn number_of_tables(&self) -> usize {
        self.shared.tables.len()
    }

    /// Run one sweep on the calling thread.
    pub fn sweep_now(&self) -> usize {
        self.shared.sweep()
    }

    pub fn state(&self) -> ReaperState {
        *self.shared.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == ReaperState::Running
    }

    /// Stop the reaper, waking the worker out of its sleep and waiting for it to exit.
    pub fn shutdown_request(&self) {
        {
            let mut state = self.shared.state.lock();
            if *state == ReaperState::Stopped {
                return;
            }
            *state = ReaperState::Stopped;
        }
        self.shared.wakeup.notify_all();

        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                tracing::warn!("File state reaper thread panicked");
            }
        }
        tracing::info!("File state reaper stopped");
    }
}

impl Drop for FileStateReaper {
    fn drop(&mut self) {
        self.shutdown_request();
    }
}

fn run(shared: Arc<ReaperShared>) {
    loop {
        {
            let mut state = shared.state.lock();
            shared.wakeup.wait_while_for(
                &mut state,
                |state| *state == ReaperState::Running,
                shared.interval,
            );
            if *state == ReaperState::Stopped {
                break;
            }
        }

        let removed = shared.sweep();
        if removed > 0 {
            tracing::info!("File state reaper expired {} states", removed);
        }
    }
    tracing::debug!("File state reaper thread exiting");
}
