//! Integration tests for meemo-core
//!
//! These tests drive whole sessions against a mock target process, from the
//! initial region catalog through search, write, and reset.

use std::io::Cursor;

use meemo_core::process::{MockProcess, MockProcessBuilder};
use meemo_core::{
    Error, RegionCatalog, ScalarType, ScalarValue, Session, SessionConfig, StepOutcome,
    TransferErrorKind,
};

fn start(process: MockProcess, config: &SessionConfig) -> Session<MockProcess> {
    let catalog = RegionCatalog::parse(Cursor::new(process.maps_listing()), 2048).unwrap();
    Session::with_memory(process, catalog, config).unwrap()
}

fn two_regions_with_42() -> MockProcess {
    MockProcessBuilder::new()
        .region(0x1000, 16)
        .region(0x2000, 16)
        .write_u32(0x1004, 42)
        .write_u32(0x2008, 42)
        .build()
}

mod narrowing_tests {
    use super::*;

    #[test]
    fn test_find_value_in_two_regions() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());

        assert_eq!(session.search(ScalarValue::U32(42)).unwrap(), 2);

        let listing = session.describe(20);
        assert!(listing.contains("Base: 0x1004 Len: 4"));
        assert!(listing.contains("Base: 0x2008 Len: 4"));
    }

    #[test]
    fn test_repeated_search_narrows_to_changed_value() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        // The target changes one of the two values between searches.
        session.memory().poke_u32(0x1004, 43);

        assert_eq!(session.search(ScalarValue::U32(43)).unwrap(), 1);
        assert_eq!(session.describe(20), "[0] = Base: 0x1004 Len: 4");
        assert_eq!(session.generation(), 2);
    }

    #[test]
    fn test_miss_keeps_previous_generation() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        let outcome = session.step(ScalarValue::U32(1000)).unwrap();

        assert_eq!(outcome, StepOutcome::RolledBack { generation: 1 });
        assert_eq!(session.candidate_count(), 2);

        // Searching again for the first value still works from generation 1.
        assert_eq!(session.search(ScalarValue::U32(42)).unwrap(), 2);
    }

    #[test]
    fn test_miss_on_first_search_keeps_regions() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());

        assert_eq!(session.search(ScalarValue::U32(7)).unwrap(), 0);
        assert_eq!(session.generation(), 0);
        assert_eq!(
            session.describe(20),
            "[0] = Base: 0x1000 Len: 16\n[1] = Base: 0x2000 Len: 16"
        );
    }

    #[test]
    fn test_overlapping_matches() {
        let mut session = start(
            MockProcessBuilder::new()
                .region(0x1000, 8)
                .write_bytes(0x1000, &[1, 1, 1, 1, 1, 1, 1, 1])
                .build(),
            &SessionConfig::default(),
        );

        // Every 4-byte window of eight 0x01 bytes is 0x01010101.
        assert_eq!(session.search(ScalarValue::U32(0x0101_0101)).unwrap(), 5);
    }

    #[test]
    fn test_signed_values() {
        let config = SessionConfig::builder().scalar_type(ScalarType::I32).build();
        let mut session = start(
            MockProcessBuilder::new()
                .region(0x1000, 16)
                .write_i32(0x100C, -5)
                .build(),
            &config,
        );

        let value = session.parse_value("-5").unwrap();
        assert_eq!(session.search(value).unwrap(), 1);
        assert_eq!(session.describe(20), "[0] = Base: 0x100c Len: 4");
    }

    #[test]
    fn test_many_candidates_are_read_in_batches() {
        // 1025 zero words: the second generation has 1025 candidates.
        let mut session = start(
            MockProcessBuilder::new().region(0x10000, 1028).build(),
            &SessionConfig::default(),
        );
        assert_eq!(session.search(ScalarValue::U32(0)).unwrap(), 1025);

        session.memory().clear_calls();
        assert_eq!(session.search(ScalarValue::U32(0)).unwrap(), 1025);
        assert_eq!(session.memory().read_calls(), vec![1024, 1]);
    }

    #[test]
    fn test_describe_caps_entries() {
        let mut session = start(
            MockProcessBuilder::new().region(0x10000, 64).build(),
            &SessionConfig::default(),
        );
        session.search(ScalarValue::U32(0)).unwrap();

        let listing = session.describe(3);
        assert_eq!(listing.lines().count(), 4);
        assert!(listing.ends_with("... and 58 more, refine the search"));
    }
}

mod failure_tests {
    use super::*;

    #[test]
    fn test_failed_read_leaves_generation_intact() {
        let mut session = start(
            MockProcessBuilder::new()
                .region(0x1000, 16)
                .region(0x2000, 16)
                .write_u32(0x1004, 42)
                .write_u32(0x2008, 42)
                .fail_read_call(1, TransferErrorKind::OutOfMemory)
                .build(),
            &SessionConfig::default(),
        );
        session.search(ScalarValue::U32(42)).unwrap();
        let before = session.describe(20);

        let err = session.search(ScalarValue::U32(42)).unwrap_err();

        assert!(matches!(
            err,
            Error::Transfer {
                kind: TransferErrorKind::OutOfMemory,
                transferred: 0
            }
        ));
        assert_eq!(session.generation(), 1);
        assert_eq!(session.describe(20), before);
    }

    #[test]
    fn test_partial_batch_failure_reports_progress() {
        let config = SessionConfig::builder().batch_limit(1).build();
        let mut session = start(
            MockProcessBuilder::new()
                .region(0x1000, 16)
                .region(0x2000, 16)
                .fail_read_call(1, TransferErrorKind::AccessDenied)
                .build(),
            &config,
        );

        let err = session.search(ScalarValue::U32(0)).unwrap_err();

        assert!(matches!(
            err,
            Error::Transfer {
                kind: TransferErrorKind::AccessDenied,
                transferred: 16
            }
        ));
        assert_eq!(session.generation(), 0);
        assert_eq!(session.candidate_count(), 2);
    }

    #[test]
    fn test_exited_target() {
        let mut session = start(
            MockProcessBuilder::new().region(0x1000, 16).exited().build(),
            &SessionConfig::default(),
        );

        assert!(!session.is_target_alive());
        let err = session.search(ScalarValue::U32(0)).unwrap_err();
        assert_eq!(err.transfer_kind(), Some(TransferErrorKind::NoSuchProcess));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());

        let err = session.search(ScalarValue::U64(42)).unwrap_err();

        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(session.memory().read_calls().is_empty());
    }

    #[test]
    fn test_no_scannable_regions() {
        let mut session = start(
            MockProcessBuilder::new()
                .region_with_permissions(0x1000, 16, "r-xp")
                .build(),
            &SessionConfig::default(),
        );

        assert_eq!(session.candidate_count(), 0);
        assert_eq!(session.search(ScalarValue::U32(0)).unwrap(), 0);
        assert!(session.memory().read_calls().is_empty());
    }
}

mod write_tests {
    use super::*;

    #[test]
    fn test_write_then_find_new_value() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        session.write(0, ScalarValue::U32(99)).unwrap();

        assert_eq!(session.search(ScalarValue::U32(99)).unwrap(), 1);
        assert_eq!(session.describe(20), "[0] = Base: 0x1004 Len: 4");
    }

    #[test]
    fn test_write_out_of_range_changes_nothing() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        let err = session.write(5, ScalarValue::U32(99)).unwrap_err();

        assert!(matches!(err, Error::OutOfRange { position: 5, len: 2 }));
        assert!(session.memory().write_calls().is_empty());
        assert_eq!(session.memory().peek(0x1004, 4), Some(42u32.to_le_bytes().to_vec()));
    }

    #[test]
    fn test_write_char() {
        let config = SessionConfig::builder().scalar_type(ScalarType::Char).build();
        let mut session = start(
            MockProcessBuilder::new()
                .region(0x1000, 8)
                .write_bytes(0x1000, b"meemo!!!")
                .build(),
            &config,
        );
        assert_eq!(session.search(ScalarValue::Char(b'!')).unwrap(), 3);

        session.write(2, ScalarValue::Char(b'?')).unwrap();
        assert_eq!(session.memory().peek(0x1000, 8), Some(b"meemo!!?".to_vec()));
    }
}

mod reset_tests {
    use super::*;

    #[test]
    fn test_reset_returns_to_regions() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        let listing = session.memory().maps_listing();
        let catalog = RegionCatalog::parse(Cursor::new(listing), 2048).unwrap();
        assert_eq!(session.reset_with(catalog).unwrap(), 2);

        assert_eq!(session.generation(), 0);
        assert!(session.last_value().is_none());
        assert_eq!(session.search(ScalarValue::U32(42)).unwrap(), 2);
    }

    #[test]
    fn test_snapshot_after_search() {
        let mut session = start(two_regions_with_42(), &SessionConfig::default());
        session.search(ScalarValue::U32(42)).unwrap();

        let snapshot = session.snapshot(1);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(snapshot.candidate_count, 2);
        assert_eq!(snapshot.candidates.len(), 1);

        let json: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(json["last_value"]["type"], "u32");
        assert_eq!(json["last_value"]["value"], 42);
    }
}
