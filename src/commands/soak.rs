use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cli::{validate_share_name, validate_soak_args};
use crate::config::load_config;
use crate::error::{NtStatus, Result, ShareStateError};
use crate::session::{LocalTransactionService, SrvSession, TransactionService};
use crate::state::{AccessMode, FileStateReaper, FileStateTable, LockKind, OpenParams, SharedAccess};

const LOCK_SLOTS: u64 = 16;
const LOCK_LENGTH: u64 = 64;

#[derive(Debug, Default)]
struct SoakStats {
    opens: AtomicU64,
    sharing_violations: AtomicU64,
    locks: AtomicU64,
    lock_conflicts: AtomicU64,
    write_vetoes: AtomicU64,
    closes: AtomicU64,
    errors: AtomicU64,
}

impl SoakStats {
    fn record(&self, status: NtStatus) {
        let counter = match status {
            NtStatus::SharingViolation => &self.sharing_violations,
            NtStatus::LockNotGranted => &self.lock_conflicts,
            NtStatus::LockConflict => &self.write_vetoes,
            _ => &self.errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Run concurrent sessions against one share while the reaper sweeps it.
pub async fn run_soak(
    share: &str,
    sessions: u32,
    seconds: u64,
    paths: u32,
    json: bool,
) -> Result<()> {
    validate_share_name(share)?;
    validate_soak_args(sessions, seconds, paths)?;

    let config = load_config()?;
    let table = config.build_table(share);
    let reaper = FileStateReaper::with_interval(config.file_state.sweep_interval())?;
    reaper.add_state_table(share, Arc::clone(&table));

    let service = Arc::new(LocalTransactionService::new());
    let stats = Arc::new(SoakStats::default());
    let stop = Arc::new(AtomicBool::new(false));

    if !json {
        println!(
            "Running {} session(s) against '{}' for {}s over {} path(s)",
            sessions, share, seconds, paths
        );
    }

    let mut workers = Vec::new();
    for session_id in 1..=sessions {
        let table = Arc::clone(&table);
        let service: Arc<dyn TransactionService> = service.clone();
        let stats = Arc::clone(&stats);
        let stop = Arc::clone(&stop);
        workers.push(tokio::task::spawn_blocking(move || {
            let mut session = SrvSession::new(session_id, format!("soak-{}", session_id), service);
            session_loop(&mut session, &table, paths, &stats, &stop)
        }));
    }

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::select! {
        _ = deadline => {}
        result = tokio::signal::ctrl_c() => {
            result.map_err(|e| ShareStateError::Config(format!("Failed to wait for Ctrl+C: {}", e)))?;
            eprintln!("\nInterrupted, stopping sessions");
        }
    }
    stop.store(true, Ordering::SeqCst);

    for worker in workers {
        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Soak session failed: {}", e);
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!("Soak session task panicked: {}", e);
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    let swept = reaper.sweep_now();
    reaper.shutdown_request();

    let tx = service.stats();
    if json {
        let report = serde_json::json!({
            "share": share,
            "opens": stats.opens.load(Ordering::Relaxed),
            "sharing_violations": stats.sharing_violations.load(Ordering::Relaxed),
            "locks_granted": stats.locks.load(Ordering::Relaxed),
            "lock_conflicts": stats.lock_conflicts.load(Ordering::Relaxed),
            "write_vetoes": stats.write_vetoes.load(Ordering::Relaxed),
            "closes": stats.closes.load(Ordering::Relaxed),
            "errors": stats.errors.load(Ordering::Relaxed),
            "transactions_begun": tx.begun.load(Ordering::Relaxed),
            "transactions_committed": tx.committed.load(Ordering::Relaxed),
            "states_remaining": table.number_of_states(),
            "states_swept": swept,
            "states_open": table.number_of_open_states(),
        });
        let output = serde_json::to_string_pretty(&report)
            .map_err(|e| ShareStateError::Config(format!("Failed to serialize results: {}", e)))?;
        println!("{}", output);
    } else {
        println!("Results:");
        println!("  opens:              {}", stats.opens.load(Ordering::Relaxed));
        println!("  sharing violations: {}", stats.sharing_violations.load(Ordering::Relaxed));
        println!("  locks granted:      {}", stats.locks.load(Ordering::Relaxed));
        println!("  lock conflicts:     {}", stats.lock_conflicts.load(Ordering::Relaxed));
        println!("  write vetoes:       {}", stats.write_vetoes.load(Ordering::Relaxed));
        println!("  closes:             {}", stats.closes.load(Ordering::Relaxed));
        println!("  errors:             {}", stats.errors.load(Ordering::Relaxed));
        println!(
            "  transactions:       {} begun, {} committed",
            tx.begun.load(Ordering::Relaxed),
            tx.committed.load(Ordering::Relaxed)
        );
        println!("  states remaining:   {} ({} swept at end)", table.number_of_states(), swept);
        println!("  states still open:  {}", table.number_of_open_states());
    }

    if table.number_of_open_states() > 0 {
        return Err(ShareStateError::Config(
            "Open counts did not return to zero after all sessions closed".to_string(),
        ));
    }
    Ok(())
}

fn session_loop(
    session: &mut SrvSession,
    table: &FileStateTable,
    paths: u32,
    stats: &SoakStats,
    stop: &AtomicBool,
) -> Result<()> {
    let mut iteration: u64 = 0;
    let started = Instant::now();

    while !stop.load(Ordering::Relaxed) {
        iteration += 1;
        let seed = iteration.wrapping_mul(2_654_435_761) ^ u64::from(session.session_id());
        let path = format!("\\soak\\dir{}\\file{}.dat", seed % 4, seed % u64::from(paths));

        // Every tenth open asks for exclusive access to provoke sharing violations
        let params = if seed % 10 == 0 {
            OpenParams::new(AccessMode::ReadWrite, SharedAccess::NONE, session.pid())
        } else {
            OpenParams::read_write(session.pid())
        }
        .with_create(true);

        let file = match session.open_file(table, &path, params) {
            Ok(file) => {
                stats.opens.fetch_add(1, Ordering::Relaxed);
                file
            }
            Err(e) => {
                stats.record(e.status());
                session.end_transaction()?;
                continue;
            }
        };

        let offset = (seed % LOCK_SLOTS) * LOCK_LENGTH;
        match session.lock_file(&file, offset, LOCK_LENGTH, LockKind::Exclusive) {
            Ok(()) => {
                stats.locks.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = session.check_write(&file, offset, LOCK_LENGTH) {
                    stats.record(e.status());
                }
                session.unlock_file(&file, offset, LOCK_LENGTH)?;
            }
            Err(e) => {
                stats.record(e.status());
                if let Err(e) = session.check_write(&file, offset, LOCK_LENGTH) {
                    stats.record(e.status());
                }
            }
        }

        session.close_file(table, file)?;
        stats.closes.fetch_add(1, Ordering::Relaxed);
        session.end_transaction()?;
    }

    tracing::debug!(
        "Session {} finished {} iterations in {:?} ({} conversions)",
        session.session_id(),
        iteration,
        started.elapsed(),
        session.transaction_conversions()
    );
    Ok(())
}
