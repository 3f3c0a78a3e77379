mod common;

use std::sync::Arc;

use common::{address_lines, fast_config, seeded_store, Behavior, FakeFactory, FakePortal, FlakyStore};
use paytax_lookup::models::{parse_address_line, RecordStatus};
use paytax_lookup::orchestrator::{process_batch, Batch};
use paytax_lookup::store::{MemoryStore, RecordStore};
use paytax_lookup::workflow::RecordFlow;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_each_record_is_written_back() {
    let lines = vec![
        parse_address_line("1 Main St"),
        parse_address_line("2 Main St"),
        parse_address_line("3 Main St"),
    ];
    let (store, records) = seeded_store(&lines).await;
    let factory = FakeFactory::new(FakePortal::new().with("2", Behavior::NoRows));
    let flow = RecordFlow::new(&fast_config());

    let report = process_batch(
        &factory,
        store.as_ref(),
        &flow,
        Batch { index: 1, records },
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.total, 3);
    assert_eq!(report.matched, 2);
    assert_eq!(report.no_result, 1);
    assert_eq!(report.abandoned, 0);
    assert_eq!(store.write_count(), 3);
    assert_eq!(store.get(1).unwrap().status, RecordStatus::Processed);
    assert_eq!(store.get(1).unwrap().owner_name.as_deref(), Some("Owner 1"));
    assert_eq!(store.get(2).unwrap().status, RecordStatus::Error);
    assert!(store.snapshot().iter().all(|r| r.is_consistent()));

    // 一个批次只用一个会话
    assert_eq!(factory.portal.opened(), 1);
    assert_eq!(factory.portal.closed(), 1);
}

#[tokio::test]
async fn test_write_failure_does_not_stop_batch() {
    let (memory, records) = seeded_store(&address_lines(3)).await;
    let store = FlakyStore {
        inner: Arc::try_unwrap(memory).ok().unwrap(),
        failing_id: 2,
    };
    let factory = FakeFactory::new(FakePortal::new());
    let flow = RecordFlow::new(&fast_config());

    let report = process_batch(
        &factory,
        &store,
        &flow,
        Batch { index: 1, records },
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.matched, 3);
    assert_eq!(report.write_failures, 1);
    assert_eq!(store.inner.get(2).unwrap().status, RecordStatus::Unprocessed);
    assert_eq!(store.inner.get(3).unwrap().status, RecordStatus::Processed);
}

#[tokio::test]
async fn test_session_loss_leaves_rest_unprocessed() {
    let (store, records) = seeded_store(&address_lines(4)).await;
    let factory = FakeFactory::new(FakePortal::new().with("2", Behavior::SessionDies));
    let flow = RecordFlow::new(&fast_config());

    let report = process_batch(
        &factory,
        store.as_ref(),
        &flow,
        Batch { index: 1, records },
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.matched, 1);
    assert_eq!(report.abandoned, 3);
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.count_with_status(RecordStatus::Unprocessed), 3);
    // 后面的记录没有再尝试
    assert_eq!(factory.portal.searches().len(), 2);
    assert_eq!(factory.portal.closed(), 1);

    let remaining = store.fetch_unprocessed(0, 100).await.unwrap();
    assert_eq!(
        remaining.iter().filter_map(|r| r.id).collect::<Vec<_>>(),
        vec![2, 3, 4]
    );
}

#[tokio::test]
async fn test_transient_error_marks_record_and_continues() {
    let (store, records) = seeded_store(&address_lines(3)).await;
    let factory = FakeFactory::new(FakePortal::new().with("1", Behavior::FinishMissing));
    let flow = RecordFlow::new(&fast_config());

    let report = process_batch(
        &factory,
        store.as_ref(),
        &flow,
        Batch { index: 1, records },
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.transient, 1);
    assert_eq!(report.matched, 2);
    assert_eq!(store.get(1).unwrap().status, RecordStatus::Error);
    assert_eq!(store.get(1).unwrap().owner_name, None);
}

#[tokio::test]
async fn test_open_failure_abandons_batch() {
    let (store, records) = seeded_store(&address_lines(2)).await;
    let factory = FakeFactory::new(FakePortal::new().failing_to_open());
    let flow = RecordFlow::new(&fast_config());

    let report = process_batch(
        &factory,
        store.as_ref(),
        &flow,
        Batch { index: 5, records },
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(report.batch_index, 5);
    assert_eq!(report.abandoned, 2);
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_cancelled_batch_processes_nothing() {
    let store = MemoryStore::new();
    let records: Vec<_> = address_lines(3)
        .into_iter()
        .enumerate()
        .map(|(i, r)| r.with_id(i as i64 + 1))
        .collect();
    let factory = FakeFactory::new(FakePortal::new());
    let flow = RecordFlow::new(&fast_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = process_batch(&factory, &store, &flow, Batch { index: 1, records }, &cancel).await;

    assert_eq!(report.abandoned, 3);
    assert!(factory.portal.searches().is_empty());
    assert_eq!(factory.portal.closed(), 1);
}
