use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cli::validate_share_name;
use crate::config::load_config;
use crate::error::{Result, ShareStateError};
use crate::session::{LocalTransactionService, SrvSession, TransactionService};
use crate::state::{LockKind, OpenParams};

const SCENARIO_PATH: &str = "/a/b.txt";

fn step(description: &str, outcome: impl std::fmt::Display) {
    println!("  {:<48} {}", description, outcome);
}

fn ensure(condition: bool, what: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(ShareStateError::ScenarioFailed(what.to_string()))
    }
}

/// Two sessions open the same file, contend for a byte range, close, and
/// the expired state is swept.
pub fn run_simulation(share: &str) -> Result<()> {
    validate_share_name(share)?;
    let config = load_config()?;
    let table = config.build_table(share);
    let service: Arc<dyn TransactionService> = Arc::new(LocalTransactionService::new());

    let mut first = SrvSession::new(1, "client-1", Arc::clone(&service));
    let mut second = SrvSession::new(2, "client-2", Arc::clone(&service));

    println!("Share '{}', path {}", share, SCENARIO_PATH);

    let file1 = first.open_file(
        &table,
        SCENARIO_PATH,
        OpenParams::read_write(first.pid()).with_create(true),
    )?;
    step("session 1 opens READWRITE", format!("opens={}", file1.state().open_count()));
    first.end_transaction()?;

    let file2 = second.open_file(&table, SCENARIO_PATH, OpenParams::read_write(second.pid()))?;
    step("session 2 opens READWRITE", format!("opens={}", file2.state().open_count()));
    ensure(file2.state().open_count() == 2, "second open should be counted")?;
    second.end_transaction()?;

    first.lock_file(&file1, 0, 100, LockKind::Exclusive)?;
    step("session 1 locks [0,100)", "granted");
    first.end_transaction()?;

    match second.lock_file(&file2, 50, 100, LockKind::Exclusive) {
        Ok(()) => return ensure(false, "overlapping lock should conflict"),
        Err(e) => step("session 2 locks [50,150)", e.status()),
    }
    second.end_transaction()?;
    ensure(
        file2.state().number_of_locks() == 1 && file2.state().open_count() == 2,
        "failed lock must leave state unchanged",
    )?;

    let remaining = first.close_file(&table, file1)?;
    step("session 1 closes", format!("opens={}", remaining));
    first.end_transaction()?;

    let remaining = second.close_file(&table, file2)?;
    step("session 2 closes", format!("opens={}", remaining));
    second.end_transaction()?;

    let after_expiry = Instant::now() + table.default_timeout() + Duration::from_millis(1);
    let removed = table.remove_expired_file_states_at(after_expiry);
    step("sweep after expiry", format!("removed={}", removed));
    ensure(
        removed == 1 && table.number_of_states() == 0,
        "expired state should be swept",
    )?;

    println!("Scenario completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NtStatus;

    #[test]
    fn test_failed_check_is_reported_as_scenario_failure() {
        assert!(ensure(true, "holds").is_ok());

        let err = ensure(false, "overlapping lock should conflict").unwrap_err();
        assert!(matches!(err, ShareStateError::ScenarioFailed(_)));
        assert_eq!(
            err.to_string(),
            "Scenario check failed: overlapping lock should conflict"
        );
        assert_eq!(err.status(), NtStatus::InternalError);
    }
}
