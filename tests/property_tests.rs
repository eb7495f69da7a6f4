use proptest::prelude::*;
use std::sync::Arc;

use sharestate::{normalize_path, FileLock, FileState, FileStateTable, FileStatus, OpenParams};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_open_count_never_negative(ops in prop::collection::vec(any::<bool>(), 0..200)) {
        let state = FileState::new("\\p.txt", FileStatus::FileExists, None);
        let mut expected: u32 = 0;
        for increment in ops {
            if increment {
                expected += 1;
                prop_assert_eq!(state.increment_open_count(), expected);
            } else {
                expected = expected.saturating_sub(1);
                prop_assert_eq!(state.decrement_open_count(), expected);
            }
        }
        prop_assert_eq!(state.open_count(), expected);
    }

    #[test]
    fn test_balanced_opens_return_to_zero(n in 0u32..100) {
        let state = FileState::new("\\p.txt", FileStatus::FileExists, None);
        for _ in 0..n {
            state.increment_open_count();
        }
        for _ in 0..n {
            state.decrement_open_count();
        }
        prop_assert_eq!(state.open_count(), 0);
    }

    #[test]
    fn test_normalization_preserves_name_case(
        dirs in prop::collection::vec("[a-zA-Z0-9]{1,8}", 1..4),
        name in "[a-zA-Z0-9]{1,8}\\.[a-zA-Z]{1,3}",
    ) {
        let path = format!("\\{}\\{}", dirs.join("\\"), name);
        let normalized = normalize_path(&path);

        let expected_dir = format!("\\{}", dirs.join("\\")).to_uppercase();
        prop_assert_eq!(normalized.clone(), format!("{}\\{}", expected_dir, name));
        prop_assert_eq!(normalize_path(&normalized), normalized);
    }

    #[test]
    fn test_find_is_stable_across_directory_case(
        dir in "[a-z]{1,8}",
        name in "[a-zA-Z]{1,8}",
    ) {
        let table = FileStateTable::new("prop");
        let lower = table.find_file_state(&format!("\\{}\\{}", dir, name), true, false).unwrap();
        let upper = table
            .find_file_state(&format!("\\{}\\{}", dir.to_uppercase(), name), true, false)
            .unwrap();
        prop_assert!(Arc::ptr_eq(&lower, &upper));
    }

    #[test]
    fn test_failed_lock_leaves_list_unchanged(
        offset in 0u64..1000,
        length in 1u64..1000,
        other_offset in 0u64..2000,
        other_length in 1u64..1000,
    ) {
        let state = FileState::new("\\p.txt", FileStatus::FileExists, None);
        let held = FileLock::new(offset, length, 1);
        state.add_lock(held).unwrap();

        let other = FileLock::new(other_offset, other_length, 2);
        let overlaps = other_offset < offset + length && offset < other_offset + other_length;
        let result = state.add_lock(other);

        prop_assert_eq!(result.is_err(), overlaps);
        if overlaps {
            prop_assert_eq!(state.locks(), vec![held]);
        }
    }

    #[test]
    fn test_open_then_sweep_never_evicts(n in 1u32..20) {
        let table = FileStateTable::with_timeouts(
            "prop",
            std::time::Duration::ZERO,
            std::time::Duration::ZERO,
        );
        let mut held = Vec::new();
        for pid in 0..n {
            held.push(table.open_file_state("\\hot.txt", &OpenParams::read_write(pid)).unwrap());
        }
        let later = std::time::Instant::now() + std::time::Duration::from_secs(1);
        prop_assert_eq!(table.remove_expired_file_states_at(later), 0);

        for state in &held {
            table.close_file_state(state);
        }
        prop_assert_eq!(table.remove_expired_file_states_at(later), 1);
    }
}
