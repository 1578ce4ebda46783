//! Tests for the garbage collector.

use super::*;
use crate::references::{MemoryReferenceSource, ReferenceSourceSpec};
use crate::storage::{
    DeleteResult, MemoryObjectStore, ObjectStore, PageRequest, StoreError, StoredObject,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn seven_days() -> std::time::Duration {
    std::time::Duration::from_secs(7 * 24 * 3600)
}

fn collector(
    store: &MemoryObjectStore,
    refs: &MemoryReferenceSource,
    policy: RetentionPolicy,
) -> GarbageCollector {
    GarbageCollector::new(Arc::new(store.clone()), Arc::new(refs.clone()), policy).unwrap()
}

fn old(store: &MemoryObjectStore, path: &str, days: i64) {
    store.insert(StoredObject::new(path, now() - Duration::days(days)));
}

/// Stores a row in `table.column` referencing `path`.
fn reference(
    store: &MemoryObjectStore,
    refs: &MemoryReferenceSource,
    table: &str,
    column: &str,
    path: &str,
) {
    refs.insert(table, column, store.public_url(path));
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_example_scenario_deletes_only_old_unused() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();

    old(&store, "events/old-unused.jpg", 10);
    store.insert(StoredObject::new(
        "gallery/recent-unused.jpg",
        now() - Duration::hours(1),
    ));
    old(&store, "sponsors/logo1.jpg", 30);
    old(&store, "gallery/.emptyFolderPlaceholder", 30);
    reference(&store, &refs, "sponsorships", "logo_url", "sponsors/logo1.jpg");

    let gc = collector(&store, &refs, RetentionPolicy::scheduled());
    let report = gc.run_at(now(), RunMode::Delete).await.unwrap();

    assert_eq!(report.deleted, vec!["events/old-unused.jpg"]);
    assert_eq!(report.objects_scanned, 4);
    assert_eq!(report.references_found, 1);
    assert_eq!(report.excluded.placeholder, 1);
    assert_eq!(report.excluded.within_grace_period, 1);
    assert_eq!(report.excluded.referenced, 1);
    assert!(report.is_clean());

    assert!(!store.contains("events/old-unused.jpg"));
    assert!(store.contains("gallery/recent-unused.jpg"));
    assert!(store.contains("sponsors/logo1.jpg"));
    assert!(store.contains("gallery/.emptyFolderPlaceholder"));
}

#[tokio::test]
async fn test_failed_source_degrades_by_default() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();

    old(&store, "events/banner.jpg", 30);
    old(&store, "gallery/photo.jpg", 30);
    old(&store, "sponsors/logo.jpg", 30);
    reference(&store, &refs, "events", "image_url", "events/banner.jpg");
    reference(&store, &refs, "photos", "image_url", "gallery/photo.jpg");
    reference(&store, &refs, "sponsorships", "logo_url", "sponsors/logo.jpg");
    refs.fail_source("photos", "image_url");

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    // Photo references were lost, so the photo looks orphaned
    assert_eq!(report.references_found, 2);
    assert_eq!(report.deleted, vec!["gallery/photo.jpg"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("photos.image_url"));
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_failed_source_aborts_when_configured() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();

    old(&store, "gallery/photo.jpg", 30);
    old(&store, "events/orphan.jpg", 30);
    reference(&store, &refs, "photos", "image_url", "gallery/photo.jpg");
    refs.fail_source("photos", "image_url");

    let policy =
        RetentionPolicy::scheduled().with_reference_failure_mode(ReferenceFailureMode::Abort);
    let result = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await;

    match result {
        Err(CleanupError::ReferenceQueryFailed { source_name, .. }) => {
            assert_eq!(source_name, "photos.image_url");
        },
        other => panic!("expected ReferenceQueryFailed, got {other:?}"),
    }
    assert!(store.delete_log().is_empty());
    assert_eq!(store.len(), 2);
}

// =============================================================================
// Safety properties
// =============================================================================

#[tokio::test]
async fn test_second_run_is_noop() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/a.jpg", 10);
    old(&store, "events/b.jpg", 10);
    old(&store, "gallery/kept.jpg", 10);
    reference(&store, &refs, "photos", "image_url", "gallery/kept.jpg");

    let gc = collector(&store, &refs, RetentionPolicy::scheduled());
    let first = gc.run_at(now(), RunMode::Delete).await.unwrap();
    assert_eq!(first.deleted.len(), 2);

    let second = gc.run_at(now(), RunMode::Delete).await.unwrap();
    assert!(second.candidates.is_empty());
    assert!(second.deleted.is_empty());
    assert_eq!(store.delete_log().len(), 2);
}

#[tokio::test]
async fn test_referenced_objects_kept_regardless_of_age() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    for days in [8, 100, 3650] {
        let path = format!("events/{days}.jpg");
        old(&store, &path, days);
        reference(&store, &refs, "events", "image_url", &path);
    }

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.excluded.referenced, 3);
}

#[tokio::test]
async fn test_grace_period_boundary() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    let grace = Duration::days(7);
    store.insert(StoredObject::new("events/exactly.jpg", now() - grace));
    store.insert(StoredObject::new(
        "events/almost.jpg",
        now() - grace + Duration::seconds(1),
    ));
    store.insert(StoredObject::new("events/future.jpg", now() + Duration::hours(2)));

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["events/exactly.jpg"]);
    assert_eq!(report.excluded.within_grace_period, 2);
}

#[tokio::test]
async fn test_placeholder_never_deleted() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/.emptyFolderPlaceholder", 999);
    old(&store, ".emptyFolderPlaceholder", 999);

    let policy = RetentionPolicy::scheduled().with_partitions(["", "events"]);
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.excluded.placeholder, 2);
}

#[tokio::test]
async fn test_partition_entry_guard() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    // A root listing that reports the partition itself as a dated entry
    old(&store, "events", 30);
    old(&store, "stray.jpg", 30);

    let policy = RetentionPolicy::scheduled().with_partitions(["", "events"]);
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["stray.jpg"]);
    assert_eq!(report.excluded.partition_entry, 1);
    assert!(store.contains("events"));
}

#[tokio::test]
async fn test_undated_entries_kept() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    store.insert(StoredObject::undated("gallery"));

    let policy = RetentionPolicy::library();
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.excluded.undated, 1);
}

#[tokio::test]
async fn test_each_candidate_deleted_exactly_once() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    let mut expected = Vec::new();
    for i in 0..7 {
        let path = format!("gallery/{i}.jpg");
        old(&store, &path, 30);
        expected.push(path);
    }

    let policy = RetentionPolicy::scheduled().with_delete_batch_size(3);
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    let mut log = store.delete_log();
    log.sort();
    expected.sort();
    assert_eq!(log, expected);
    assert_eq!(report.deleted.len(), 7);
}

#[tokio::test]
async fn test_malformed_urls_tolerated() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/kept.jpg", 30);
    reference(&store, &refs, "events", "image_url", "events/kept.jpg");
    refs.insert("events", "image_url", "https://cdn.elsewhere.com/events/kept.jpg");
    refs.insert("photos", "image_url", "not even a url");
    refs.insert_null("sponsorships", "logo_url");

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert_eq!(report.malformed_references, 2);
    assert_eq!(report.references_found, 1);
    assert!(report.deleted.is_empty());
}

// =============================================================================
// Pagination and recovered failures
// =============================================================================

#[tokio::test]
async fn test_pagination_until_short_page() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    for i in 0..5 {
        old(&store, &format!("events/{i}.jpg"), 30 + i);
    }
    for i in 0..4 {
        old(&store, &format!("gallery/{i}.jpg"), 30 + i);
    }

    let policy = RetentionPolicy::scheduled()
        .with_partitions(["events", "gallery", "sponsors"])
        .with_page_size(2);
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::DryRun)
        .await
        .unwrap();

    assert_eq!(report.objects_scanned, 9);

    let calls = store.list_calls();
    let count = |partition: &str| calls.iter().filter(|(p, _)| p == partition).count();
    // 2 + 2 + 1
    assert_eq!(count("events"), 3);
    // 2 + 2 + 0
    assert_eq!(count("gallery"), 3);
    // empty partition: a single short page
    assert_eq!(count("sponsors"), 1);

    let offsets: Vec<u32> = calls
        .iter()
        .filter(|(p, _)| p == "events")
        .map(|(_, page)| page.offset)
        .collect();
    assert_eq!(offsets, vec![0, 2, 4]);
}

#[tokio::test]
async fn test_failed_partition_listing_is_skipped() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/a.jpg", 30);
    old(&store, "gallery/b.jpg", 30);
    store.fail_partition("gallery");

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert_eq!(report.deleted, vec!["events/a.jpg"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("gallery"));
    assert!(store.contains("gallery/b.jpg"));
}

#[tokio::test]
async fn test_all_partitions_failing_is_fatal() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    for partition in ["events", "gallery", "sponsors"] {
        store.fail_partition(partition);
    }

    let result = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::Delete)
        .await;

    assert!(matches!(result, Err(CleanupError::StoreUnavailable(_))));
    assert!(store.delete_log().is_empty());
}

#[tokio::test]
async fn test_delete_failure_does_not_stop_run() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/a.jpg", 30);
    old(&store, "events/locked.jpg", 31);
    old(&store, "events/c.jpg", 32);
    store.fail_delete("events/locked.jpg");

    let policy = RetentionPolicy::scheduled().with_delete_batch_size(1);
    let report = collector(&store, &refs, policy)
        .run_at(now(), RunMode::Delete)
        .await
        .unwrap();

    assert_eq!(report.deleted.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, "events/locked.jpg");
    assert!(!report.is_clean());
}

#[tokio::test]
async fn test_dry_run_deletes_nothing() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    old(&store, "events/a.jpg", 30);

    let report = collector(&store, &refs, RetentionPolicy::scheduled())
        .run_at(now(), RunMode::DryRun)
        .await
        .unwrap();

    assert!(report.dry_run);
    assert_eq!(report.candidates, vec!["events/a.jpg"]);
    assert!(report.deleted.is_empty());
    assert!(store.delete_log().is_empty());
    assert!(store.contains("events/a.jpg"));
}

#[test]
fn test_invalid_policy_rejected() {
    let store = MemoryObjectStore::new("images");
    let refs = MemoryReferenceSource::new();
    let result = GarbageCollector::new(
        Arc::new(store),
        Arc::new(refs),
        RetentionPolicy::scheduled().with_page_size(0),
    );
    assert!(matches!(result, Err(CleanupError::InvalidPolicy(_))));
}

// =============================================================================
// Races and deadlines
// =============================================================================

/// Store that lets another "run" delete each batch first, and optionally
/// sleeps on listing and deletion.
struct RacingStore {
    inner: MemoryObjectStore,
    raced: bool,
    list_delay: std::time::Duration,
    delete_delay: std::time::Duration,
}

impl RacingStore {
    fn new(inner: MemoryObjectStore) -> Self {
        Self {
            inner,
            raced: false,
            list_delay: std::time::Duration::ZERO,
            delete_delay: std::time::Duration::ZERO,
        }
    }
}

#[async_trait]
impl ObjectStore for RacingStore {
    fn bucket(&self) -> &str {
        self.inner.bucket()
    }

    async fn list_page(
        &self,
        partition: &str,
        page: PageRequest,
    ) -> std::result::Result<Vec<StoredObject>, StoreError> {
        tokio::time::sleep(self.list_delay).await;
        self.inner.list_page(partition, page).await
    }

    async fn delete_objects(
        &self,
        paths: &[String],
    ) -> std::result::Result<Vec<DeleteResult>, StoreError> {
        tokio::time::sleep(self.delete_delay).await;
        if self.raced {
            self.inner.delete_objects(paths).await?;
        }
        self.inner.delete_objects(paths).await
    }

    fn public_url(&self, path: &str) -> String {
        self.inner.public_url(path)
    }
}

#[tokio::test]
async fn test_concurrent_delete_counts_as_already_gone() {
    let inner = MemoryObjectStore::new("images");
    old(&inner, "events/a.jpg", 30);
    let store = RacingStore {
        raced: true,
        ..RacingStore::new(inner)
    };

    let gc = GarbageCollector::new(
        Arc::new(store),
        Arc::new(MemoryReferenceSource::new()),
        RetentionPolicy::scheduled(),
    )
    .unwrap();
    let report = gc.run_at(now(), RunMode::Delete).await.unwrap();

    assert!(report.deleted.is_empty());
    assert_eq!(report.already_gone, vec!["events/a.jpg"]);
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_deadline_during_enumeration_aborts() {
    let inner = MemoryObjectStore::new("images");
    old(&inner, "events/a.jpg", 30);
    let store = RacingStore {
        list_delay: std::time::Duration::from_millis(500),
        ..RacingStore::new(inner.clone())
    };

    let policy =
        RetentionPolicy::scheduled().with_deadline(Some(std::time::Duration::from_millis(50)));
    let gc = GarbageCollector::new(
        Arc::new(store),
        Arc::new(MemoryReferenceSource::new()),
        policy,
    )
    .unwrap();
    let result = gc.run_at(now(), RunMode::Delete).await;

    assert!(matches!(
        result,
        Err(CleanupError::DeadlineExceeded {
            phase: "enumeration",
            ..
        })
    ));
    assert!(inner.contains("events/a.jpg"));
}

#[tokio::test]
async fn test_deadline_during_deletion_returns_partial_report() {
    let inner = MemoryObjectStore::new("images");
    for i in 0..5 {
        old(&inner, &format!("events/{i}.jpg"), 30);
    }
    let store = RacingStore {
        delete_delay: std::time::Duration::from_millis(60),
        ..RacingStore::new(inner.clone())
    };

    let policy = RetentionPolicy::scheduled()
        .with_delete_batch_size(1)
        .with_deadline(Some(std::time::Duration::from_millis(100)));
    let gc = GarbageCollector::new(
        Arc::new(store),
        Arc::new(MemoryReferenceSource::new()),
        policy,
    )
    .unwrap();
    let report = gc.run_at(now(), RunMode::Delete).await.unwrap();

    assert!(report.deadline_exceeded);
    assert!(!report.deleted.is_empty());
    assert!(!report.skipped.is_empty());
    assert_eq!(report.deleted.len() + report.skipped.len(), 5);
    assert_eq!(inner.len(), report.skipped.len());
}

// =============================================================================
// Classification properties
// =============================================================================

fn arb_object() -> impl Strategy<Value = (String, i64)> {
    (
        prop_oneof![
            Just("events".to_string()),
            Just("gallery".to_string()),
            Just("sponsors".to_string())
        ],
        "[a-z0-9]{1,12}\\.(jpg|png)",
        -48i64..24 * 60,
    )
        .prop_map(|(partition, name, age_hours)| (format!("{partition}/{name}"), age_hours))
}

proptest! {
    #![proptest_config(ProptestConfig {
        max_global_rejects: 65536,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_referenced_never_candidate((path, age_hours) in arb_object()) {
        let policy = RetentionPolicy::scheduled();
        let object = StoredObject::new(path.clone(), now() - Duration::hours(age_hours));
        let mut refs = ReferenceSet::new();
        refs.add_url(&format!("https://x/object/public/images/{path}"), "images");
        prop_assert!(classify(&object, now(), &policy, &refs).is_some());
    }

    #[test]
    fn prop_young_never_candidate((path, age_hours) in arb_object()) {
        let policy = RetentionPolicy::scheduled();
        prop_assume!(age_hours < 7 * 24);
        let object = StoredObject::new(path, now() - Duration::hours(age_hours));
        prop_assert!(classify(&object, now(), &policy, &ReferenceSet::new()).is_some());
    }

    #[test]
    fn prop_old_unreferenced_always_candidate((path, age_hours) in arb_object()) {
        let policy = RetentionPolicy::scheduled();
        prop_assume!(age_hours >= 7 * 24);
        let object = StoredObject::new(path, now() - Duration::hours(age_hours));
        prop_assert!(classify(&object, now(), &policy, &ReferenceSet::new()).is_none());
    }

    #[test]
    fn prop_placeholder_never_candidate(age_hours in -48i64..100_000) {
        let policy = RetentionPolicy::scheduled();
        let object = StoredObject::new(
            "gallery/.emptyFolderPlaceholder",
            now() - Duration::hours(age_hours),
        );
        prop_assert_eq!(
            classify(&object, now(), &policy, &ReferenceSet::new()),
            Some(Exclusion::Placeholder)
        );
    }
}

#[test]
fn test_policy_grace_matches_seven_days() {
    assert_eq!(RetentionPolicy::scheduled().grace_period, seven_days());
}

#[test]
fn test_reference_source_spec_defaults() {
    let sources = RetentionPolicy::scheduled().reference_sources;
    assert!(sources.contains(&ReferenceSourceSpec::new("sponsorships", "logo_url")));
}
