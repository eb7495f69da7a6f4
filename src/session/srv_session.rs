use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::Result;
use crate::session::transaction::{Transaction, TransactionService};

/// A client session and the repository transaction bound to it.
///
/// At most one transaction is active at a time. Request handlers call
/// `begin_transaction` before touching the repository and the request loop
/// ends the transaction once the response is built.
pub struct SrvSession {
    session_id: u32,
    client_name: String,
    started_at: DateTime<Utc>,
    service: Arc<dyn TransactionService>,
    transaction: Option<Box<dyn Transaction>>,
    conversions: u32,
}

impl SrvSession {
    pub fn new(
        session_id: u32,
        client_name: impl Into<String>,
        service: Arc<dyn TransactionService>,
    ) -> Self {
        SrvSession {
            session_id,
            client_name: client_name.into(),
            started_at: Utc::now(),
            service,
            transaction: None,
            conversions: 0,
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Process id used for locks taken by this session.
    pub fn pid(&self) -> u32 {
        self.session_id
    }

    /// Make sure a transaction of the requested mode is active.
    ///
    /// An active write transaction satisfies any request, an active read-only
    /// one satisfies read-only requests. A read-only transaction is committed
    /// and replaced when a write is requested. Returns true if a new
    /// transaction was started.
    pub fn begin_transaction(&mut self, read_only: bool) -> Result<bool> {
        match self.transaction.take() {
            Some(tx) if read_only || !tx.is_read_only() => {
                self.transaction = Some(tx);
                return Ok(false);
            }
            Some(tx) => {
                tx.commit()?;
                self.conversions += 1;
                tracing::debug!(
                    "Session {} converted read-only transaction to write",
                    self.session_id
                );
            }
            None => {}
        }

        self.transaction = Some(self.service.begin(read_only)?);
        Ok(true)
    }

    /// Hand the active transaction to the caller, leaving the session without one.
    pub fn take_transaction(&mut self) -> Option<Box<dyn Transaction>> {
        self.transaction.take()
    }

    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn has_write_transaction(&self) -> bool {
        self.transaction
            .as_ref()
            .is_some_and(|tx| !tx.is_read_only())
    }

    /// Commit the active transaction, if any.
    pub fn end_transaction(&mut self) -> Result<()> {
        match self.transaction.take() {
            Some(tx) => tx.commit(),
            None => Ok(()),
        }
    }

    /// Roll back the active transaction, if any.
    pub fn rollback_transaction(&mut self) -> Result<()> {
        match self.transaction.take() {
            Some(tx) => tx.rollback(),
            None => Ok(()),
        }
    }

    /// Number of read-only transactions that had to be replaced by write ones.
    pub fn transaction_conversions(&self) -> u32 {
        self.conversions
    }
}

impl Drop for SrvSession {
    fn drop(&mut self) {
        if let Err(e) = self.rollback_transaction() {
            tracing::warn!(
                "Failed to roll back transaction for session {}: {}",
                self.session_id,
                e
            );
        }
    }
}

impl std::fmt::Debug for SrvSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrvSession")
            .field("session_id", &self.session_id)
            .field("client_name", &self.client_name)
            .field("started_at", &self.started_at)
            .field("has_transaction", &self.has_transaction())
            .field("conversions", &self.conversions)
            .finish()
    }
}
