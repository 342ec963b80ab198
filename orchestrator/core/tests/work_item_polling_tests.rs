// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use cadio_orchestrator_core::application::{JobOrchestrator, PollSettings, ResourceCatalog};
use cadio_orchestrator_core::domain::activity::{Activity, OwnerScope};
use cadio_orchestrator_core::domain::error::OrchestrationError;
use cadio_orchestrator_core::domain::resource_store::StoreError;
use cadio_orchestrator_core::domain::work_item::WorkItemStatus;
use cadio_orchestrator_core::infrastructure::bundle_inspector::BundleInspector;
use cadio_orchestrator_core::infrastructure::resource_store::{InMemoryResourceStore, StoreOperation};
use cadio_orchestrator_core::infrastructure::transfer::InMemoryTransferGateway;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const INPUT: &str = "https://bucket.example.com/drawings/host.dwg";

fn orchestrator_with(store: Arc<InMemoryResourceStore>, settings: PollSettings) -> JobOrchestrator {
    let transfer = Arc::new(InMemoryTransferGateway::new());
    let catalog = ResourceCatalog::new(
        store.clone(),
        transfer.clone(),
        Arc::new(BundleInspector::default()),
        "20.0",
    );
    JobOrchestrator::new(catalog, store, transfer, settings)
}

fn fast() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
        timeout: None,
    }
}

fn store_with_plot_activity() -> Arc<InMemoryResourceStore> {
    let store = Arc::new(InMemoryResourceStore::new("client-1"));
    let mut activity = Activity::draft("PlotToPDF", "-export _pdf result.pdf", "20.0").unwrap();
    activity.owner_scope = OwnerScope::Shared;
    store.insert_activity(activity);
    store
}

#[tokio::test]
async fn test_succeeds_after_four_fetches() {
    let store = store_with_plot_activity();
    store.script_statuses(["Pending", "InProgress", "InProgress", "Succeeded"]);
    let orchestrator = orchestrator_with(store.clone(), fast());

    let locator = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await
        .unwrap();

    assert!(locator.starts_with("https://"));
    assert!(locator.ends_with("/Result"));
    assert_eq!(store.calls().create_work_item, 1);
    assert_eq!(store.calls().get_work_item, 4);
}

#[tokio::test]
async fn test_failed_work_item_reports_details_after_four_fetches() {
    let store = store_with_plot_activity();
    store.script_statuses(["Pending", "InProgress", "InProgress", "Failed"]);
    let orchestrator = orchestrator_with(store.clone(), fast());

    let result = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await;

    match result {
        Err(OrchestrationError::WorkItemFailed { work_item_id, details }) => {
            assert!(work_item_id.starts_with("wi-"));
            assert!(details.ends_with("report.txt"));
        }
        other => panic!("expected WorkItemFailed, got {:?}", other),
    }
    assert_eq!(store.calls().get_work_item, 4);
}

#[tokio::test]
async fn test_unknown_activity_is_never_polled() {
    let store = Arc::new(InMemoryResourceStore::new("client-1"));
    let orchestrator = orchestrator_with(store.clone(), fast());

    let result = orchestrator
        .submit_work_item("DoesNotExist", INPUT, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(OrchestrationError::NotFound { .. })));
    assert_eq!(store.calls().get_work_item, 0);
}

#[tokio::test]
async fn test_submission_rejection_is_never_polled() {
    let store = store_with_plot_activity();
    store.fail_next(
        StoreOperation::CreateWorkItem,
        StoreError::Rejected {
            status: 400,
            message: "input argument missing".to_string(),
        },
    );
    let orchestrator = orchestrator_with(store.clone(), fast());

    let result = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await;

    assert!(matches!(result, Err(OrchestrationError::RemoteRejection(_))));
    assert_eq!(store.calls().get_work_item, 0);
}

#[tokio::test]
async fn test_unknown_status_is_surfaced() {
    let store = store_with_plot_activity();
    store.script_statuses(["Pending", "FailedDownload"]);
    let orchestrator = orchestrator_with(store.clone(), fast());

    let result = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await;

    assert!(matches!(
        result,
        Err(OrchestrationError::UnexpectedStatus(ref status)) if status == "FailedDownload"
    ));
    assert_eq!(store.calls().get_work_item, 2);
}

#[tokio::test]
async fn test_deadline_exceeded_times_out() {
    let store = store_with_plot_activity();
    store.script_statuses(["InProgress"]);
    let orchestrator = orchestrator_with(
        store.clone(),
        PollSettings {
            interval: Duration::from_millis(5),
            timeout: Some(Duration::from_millis(40)),
        },
    );

    let result = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err, OrchestrationError::Timeout { .. }));
    assert!(err.is_retryable());
    assert!(store.calls().get_work_item >= 1);
}

#[tokio::test]
async fn test_cancellation_stops_polling() {
    let store = store_with_plot_activity();
    store.script_statuses(["InProgress"]);
    let orchestrator = orchestrator_with(
        store.clone(),
        PollSettings {
            interval: Duration::from_millis(5),
            timeout: None,
        },
    );

    let work_item = orchestrator.submit("PlotToPDF", INPUT).await.unwrap();
    let cancel = CancellationToken::new();
    let waiter = {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.await_completion(work_item, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(30)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), waiter)
        .await
        .expect("poll loop did not observe cancellation")
        .unwrap();
    assert!(matches!(result, Err(OrchestrationError::Cancelled(_))));

    let fetched = store.calls().get_work_item;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.calls().get_work_item, fetched);
}

#[tokio::test]
async fn test_pre_cancelled_token_fetches_nothing() {
    let store = store_with_plot_activity();
    let orchestrator = orchestrator_with(store.clone(), fast());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = orchestrator.submit_work_item("PlotToPDF", INPUT, &cancel).await;

    assert!(matches!(result, Err(OrchestrationError::Cancelled(_))));
    assert_eq!(store.calls().create_work_item, 1);
    assert_eq!(store.calls().get_work_item, 0);
}

#[tokio::test]
async fn test_poll_once_returns_a_snapshot() {
    let store = store_with_plot_activity();
    store.script_statuses(["InProgress", "Succeeded"]);
    let orchestrator = orchestrator_with(store.clone(), fast());

    let work_item = orchestrator.submit("PlotToPDF", INPUT).await.unwrap();
    assert_eq!(work_item.parsed_status(), Ok(WorkItemStatus::Pending));

    let first = orchestrator.poll_once(&work_item).await.unwrap();
    assert_eq!(first.parsed_status(), Ok(WorkItemStatus::InProgress));
    assert!(first.result_resource().is_none());

    let second = orchestrator.poll_once(&work_item).await.unwrap();
    assert_eq!(second.parsed_status(), Ok(WorkItemStatus::Succeeded));
    assert!(second.result_resource().is_some());
}

#[tokio::test]
async fn test_result_download_end_to_end() {
    let store = store_with_plot_activity();
    let transfer = Arc::new(InMemoryTransferGateway::new());
    let catalog = ResourceCatalog::new(
        store.clone(),
        transfer.clone(),
        Arc::new(BundleInspector::default()),
        "20.0",
    );
    let orchestrator = JobOrchestrator::new(catalog, store.clone(), transfer.clone(), fast());

    let locator = orchestrator
        .submit_work_item("PlotToPDF", INPUT, &CancellationToken::new())
        .await
        .unwrap();
    transfer.put_blob(locator.as_str(), "%PDF-1.7");

    let dir = tempfile::tempdir().unwrap();
    let path = orchestrator.download_result(&locator, dir.path()).await.unwrap();
    assert_eq!(path.file_name().unwrap(), "Result");
    assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.7");
}
