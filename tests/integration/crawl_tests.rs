//! Integration tests for full harvest runs
//!
//! These tests drive the orchestrator against the scripted portal in
//! `support` under paused tokio time, so waits and retry delays cost nothing.

use crate::support::*;
use sei_harvester::browser::Cookie;
use sei_harvester::crawler::{Orchestrator, SKIPPED_UNIT_ORDINAL};
use sei_harvester::session::Session;
use sei_harvester::storage::{CommitMode, ProcessRecord, RecordStore, SqliteStorage};
use sei_harvester::{Config, HarvestError};
use tempfile::TempDir;

fn orchestrator<S: RecordStore>(
    config: Config,
    portal: FakePortal,
    storage: S,
) -> Orchestrator<FakePortal, S> {
    let sessions = session_store(&config);
    Orchestrator::new(config, portal, storage, sessions)
}

fn memory_storage() -> SqliteStorage {
    SqliteStorage::new_in_memory(CommitMode::PerRecord).unwrap()
}

fn stored_names(storage: &impl RecordStore) -> Vec<String> {
    storage
        .records()
        .unwrap()
        .into_iter()
        .map(|stored| stored.record.name)
        .collect()
}

fn label(id: u32) -> String {
    FakeRecord::new(id).label
}

#[tokio::test(start_paused = true)]
async fn test_full_run_commits_records_in_order() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![
        FakeUnit::with_pages(1, vec![vec![FakeRecord::new(101), FakeRecord::new(102)]]),
        FakeUnit::with_pages(2, vec![vec![FakeRecord::new(201)]]),
    ]);

    let mut orchestrator = orchestrator(config.clone(), portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert!(summary.logged_in);
    assert_eq!(summary.units_total, 2);
    assert_eq!(summary.units_crawled, 2);
    assert_eq!(summary.records_committed, 3);
    assert_eq!(summary.rows_stored, 3);

    assert_eq!(
        stored_names(orchestrator.storage()),
        vec![label(101), label(102), label(201)]
    );

    let first = &orchestrator.storage().records().unwrap()[0].record;
    assert_eq!(
        *first,
        ProcessRecord {
            name: label(101),
            description: "Assunto 101".to_string(),
            received_at: Some("19/10/2026 14:32".to_string()),
            unit: Some("SESAPI-GAB".to_string()),
            user: Some("maria.silva".to_string()),
            details: Some("Recebido 101".to_string()),
            day_count: Some(101),
        }
    );

    assert!(orchestrator.browser().is_closed());

    // The fresh login was saved for the next run
    let (_, _) = orchestrator.shutdown();
    let saved = session_store(&config).restore().unwrap();
    assert_eq!(saved.cookies()[0].value, SESSION_TOKEN);
}

#[tokio::test(start_paused = true)]
async fn test_skipped_unit_is_never_selected() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");

    let units: Vec<FakeUnit> = (1..=50)
        .map(|ordinal| {
            if ordinal == SKIPPED_UNIT_ORDINAL {
                FakeUnit::with_pages(ordinal, vec![vec![FakeRecord::new(4800)]])
            } else {
                FakeUnit::without_list(ordinal)
            }
        })
        .collect();

    let mut orchestrator = orchestrator(config, FakePortal::new(units), memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.units_total, 50);
    assert_eq!(summary.units_skipped, 1);
    assert_eq!(summary.units_empty, 49);
    assert_eq!(summary.records_committed, 0);

    let skipped = format!("select:#selInfraUnidades:{}", unit_value(SKIPPED_UNIT_ORDINAL));
    assert_eq!(orchestrator.browser().count_calls(&skipped), 0);

    let neighbour = format!("select:#selInfraUnidades:{}", unit_value(49));
    assert_eq!(orchestrator.browser().count_calls(&neighbour), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_list_page_ends_unit() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![
        FakeUnit::with_pages(1, vec![vec![]]),
        FakeUnit::with_pages(2, vec![vec![FakeRecord::new(201)]]),
    ]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.units_crawled, 2);
    assert_eq!(summary.pages, 2);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(201)]);
    assert_eq!(orchestrator.browser().count_calls("click:#pagingNext"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_paginates_through_every_page() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![
            vec![FakeRecord::new(1), FakeRecord::new(2)],
            vec![FakeRecord::new(3), FakeRecord::new(4)],
            vec![FakeRecord::new(5)],
        ],
    )]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.records_committed, 5);
    assert_eq!(
        stored_names(orchestrator.storage()),
        (1..=5).map(label).collect::<Vec<_>>()
    );
}

#[tokio::test(start_paused = true)]
async fn test_page_limit_stops_pagination() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "max-pages-per-unit = 2");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![
            vec![FakeRecord::new(1)],
            vec![FakeRecord::new(2)],
            vec![FakeRecord::new(3)],
        ],
    )]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages, 2);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(1), label(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_record_navigation_retries_then_succeeds() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![FakeRecord::new(1), FakeRecord::new(2)]],
    )])
    .fail_goto(&record_url(1), 2);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.records_committed, 2);
    assert_eq!(summary.records_skipped, 0);
    assert_eq!(
        orchestrator
            .browser()
            .count_calls(&format!("goto:{}", record_url(1))),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_record_skipped_after_three_failures() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![FakeRecord::new(1), FakeRecord::new(2)]],
    )])
    .fail_goto(&record_url(1), 5);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.records_committed, 1);
    assert_eq!(summary.records_skipped, 1);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(2)]);
    assert_eq!(
        orchestrator
            .browser()
            .count_calls(&format!("goto:{}", record_url(1))),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_record_without_history_is_stored_with_nulls() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![FakeRecord::new(7).without_history()]],
    )]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    orchestrator.run().await.unwrap();

    let records = orchestrator.storage().records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].record.name, label(7));
    assert_eq!(records[0].record.description, "Assunto 7");
    assert_eq!(records[0].record.received_at, None);
    assert_eq!(records[0].record.day_count, None);
}

#[tokio::test(start_paused = true)]
async fn test_extraction_failures_do_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![
            FakeRecord::new(1).without_tree_frame(),
            FakeRecord::new(2).with_header_only_history(),
            FakeRecord::new(3),
        ]],
    )]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.records_committed, 3);
    assert_eq!(summary.commit_failures, 0);

    assert_eq!(
        stored_names(orchestrator.storage()),
        vec![label(1), label(2), label(3)]
    );

    let records = orchestrator.storage().records().unwrap();

    for stored in &records[..2] {
        assert_eq!(stored.record.received_at, None);
        assert_eq!(stored.record.unit, None);
        assert_eq!(stored.record.user, None);
        assert_eq!(stored.record.details, None);
        assert_eq!(stored.record.day_count, None);
    }
    assert_eq!(records[0].record.description, "Assunto 1");
    assert_eq!(records[1].record.description, "Assunto 2");
    assert_eq!(records[2].record.details, Some("Recebido 3".to_string()));
    assert_eq!(records[2].record.day_count, Some(3));

    // The record without a tree frame never got as far as the trigger
    assert_eq!(orchestrator.browser().count_calls("click:#divConsultarAndamento > a"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failed_commit_does_not_stop_the_run() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![
            FakeRecord::new(1),
            FakeRecord::new(2),
            FakeRecord::new(3),
        ]],
    )]);
    let storage = FailingCommitStore::new(memory_storage(), 2);

    let mut orchestrator = orchestrator(config, portal, storage);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.records_committed, 2);
    assert_eq!(summary.commit_failures, 1);
    assert_eq!(summary.rows_stored, 2);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(1), label(3)]);
}

#[tokio::test(start_paused = true)]
async fn test_unreadable_page_is_not_counted() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![FakeRecord::new(1)], vec![FakeRecord::new(2)]],
    )])
    .with_unreadable_page(1);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.units_crawled, 1);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(1)]);
    assert_eq!(orchestrator.browser().count_calls("click:#pagingNext"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_prior_rows_are_cleared() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");

    let mut storage = memory_storage();
    storage
        .commit(&ProcessRecord {
            name: "stale".to_string(),
            ..Default::default()
        })
        .unwrap();

    let portal = FakePortal::new(vec![FakeUnit::with_pages(1, vec![vec![FakeRecord::new(1)]])]);

    let mut orchestrator = orchestrator(config, portal, storage);
    orchestrator.run().await.unwrap();

    assert_eq!(stored_names(orchestrator.storage()), vec![label(1)]);
}

#[tokio::test(start_paused = true)]
async fn test_per_run_mode_promotes_at_the_end() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(
        1,
        vec![vec![FakeRecord::new(1), FakeRecord::new(2)]],
    )]);
    let storage = SqliteStorage::new_in_memory(CommitMode::PerRun).unwrap();

    let mut orchestrator = orchestrator(config, portal, storage);
    let summary = orchestrator.run().await.unwrap();

    assert_eq!(summary.rows_stored, 2);
    assert_eq!(orchestrator.storage().staged_count().unwrap(), 0);
    assert_eq!(stored_names(orchestrator.storage()), vec![label(1), label(2)]);
}

#[tokio::test(start_paused = true)]
async fn test_restored_session_skips_login() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    session_store(&config)
        .save(&Session::new(vec![Cookie::new("PHPSESSID", SESSION_TOKEN)]))
        .unwrap();

    let portal = FakePortal::new(vec![FakeUnit::with_pages(1, vec![vec![FakeRecord::new(1)]])]);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();

    assert!(!summary.logged_in);
    assert_eq!(summary.records_committed, 1);

    let portal = orchestrator.browser();
    assert_eq!(portal.count_calls("add_cookies"), 1);
    assert_eq!(portal.count_calls(&format!("goto:{}", ENTRY_URL)), 2);
    assert_eq!(portal.count_calls("click:#sbmLogin"), 0);
    assert!(!portal.calls().iter().any(|c| c.starts_with("fill:")));
}

#[tokio::test(start_paused = true)]
async fn test_stale_session_is_replaced_after_login() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    session_store(&config)
        .save(&Session::new(vec![Cookie::new("PHPSESSID", "expired")]))
        .unwrap();

    let portal = FakePortal::new(vec![FakeUnit::with_pages(1, vec![vec![FakeRecord::new(1)]])]);

    let mut orchestrator = orchestrator(config.clone(), portal, memory_storage());
    let summary = orchestrator.run().await.unwrap();
    orchestrator.shutdown();

    assert!(summary.logged_in);
    let saved = session_store(&config).restore().unwrap();
    assert!(saved.cookies().iter().any(|c| c.value == SESSION_TOKEN));
}

#[tokio::test(start_paused = true)]
async fn test_missing_landing_page_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![FakeUnit::with_pages(1, vec![vec![FakeRecord::new(1)]])])
        .without_landing();

    let mut orchestrator = orchestrator(config.clone(), portal, memory_storage());
    let result = orchestrator.run().await;

    match result {
        Err(HarvestError::LandingTimeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 5000),
        other => panic!("expected a landing timeout, got {:?}", other.map(|_| ())),
    }

    let portal = orchestrator.browser();
    assert!(portal.is_closed());
    assert!(!portal.calls().iter().any(|c| c.starts_with("select:#selInfraUnidades")));

    // Nothing is saved before the landing page is confirmed
    orchestrator.shutdown();
    assert!(session_store(&config).restore().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_portal_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, "");
    let portal = FakePortal::new(vec![]).fail_goto(ENTRY_URL, 3);

    let mut orchestrator = orchestrator(config, portal, memory_storage());
    let result = orchestrator.run().await;

    match result {
        Err(HarvestError::PortalUnavailable { attempts, url, .. }) => {
            assert_eq!(attempts, 3);
            assert_eq!(url, ENTRY_URL);
        }
        other => panic!("expected an unavailable portal, got {:?}", other.map(|_| ())),
    }
    assert!(orchestrator.browser().is_closed());
}
