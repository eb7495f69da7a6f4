use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Result, ShareStateError};

/// A unit of work against the backing repository.
pub trait Transaction: Send {
    fn is_read_only(&self) -> bool;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Starts transactions on behalf of client sessions.
pub trait TransactionService: Send + Sync {
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction>>;
}

#[derive(Debug, Default)]
pub struct TransactionStats {
    pub begun: AtomicU64,
    pub committed: AtomicU64,
    pub rolled_back: AtomicU64,
}

/// In-process transaction service that only keeps counts.
#[derive(Debug, Default)]
pub struct LocalTransactionService {
    stats: Arc<TransactionStats>,
    unavailable: AtomicBool,
}

impl LocalTransactionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &TransactionStats {
        &self.stats
    }

    /// Make subsequent `begin` calls fail, simulating a repository outage.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

impl TransactionService for LocalTransactionService {
    fn begin(&self, read_only: bool) -> Result<Box<dyn Transaction>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(ShareStateError::Transaction(
                "Repository unavailable".to_string(),
            ));
        }
        let id = self.stats.begun.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("Begin transaction {} (read_only={})", id, read_only);
        Ok(Box::new(LocalTransaction {
            id,
            read_only,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct LocalTransaction {
    id: u64,
    read_only: bool,
    stats: Arc<TransactionStats>,
}

impl Transaction for LocalTransaction {
    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn commit(self: Box<Self>) -> Result<()> {
        tracing::trace!("Commit transaction {}", self.id);
        self.stats.committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        tracing::trace!("Rollback transaction {}", self.id);
        self.stats.rolled_back.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
