//! End-to-end resume behaviour of the fetch-and-enrich pipeline.

mod common;

use common::{CapturingExporter, FakeSource, ids, record, signature};
use matchfetch::checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
use matchfetch::client::NoDelay;
use matchfetch::models::MatchFetchError;
use matchfetch::pipeline::{
    CancellationFlag, CheckpointResolution, NoProgress, Pipeline, PipelineOptions, RunOutcome,
    Stage,
};
use std::collections::HashSet;
use tempfile::TempDir;

const OPTIONS: PipelineOptions = PipelineOptions {
    page_size: 100,
    batch_size: 24,
};

fn memory_pipeline(
    source: FakeSource,
    store: MemoryCheckpointStore,
) -> Pipeline<FakeSource, MemoryCheckpointStore, NoDelay> {
    Pipeline::new(source, store, NoDelay::new(), OPTIONS)
}

fn sample_ids(records: &[matchfetch::models::Record]) -> Vec<String> {
    records.iter().map(|r| r.sample_id.clone()).collect()
}

#[tokio::test]
async fn test_target_250_requests_three_pages() {
    let pipeline = memory_pipeline(FakeSource::with_matches(1000, 100), MemoryCheckpointStore::new());
    let exporter = CapturingExporter::default();

    let outcome = pipeline.run(signature("G1", 250), &exporter, &NoProgress).await;

    assert!(outcome.is_completed());
    assert_eq!(pipeline.source().pages_requested(), vec![1, 2, 3]);
    assert_eq!(sample_ids(&exporter.records()), ids("m", 250));
}

#[tokio::test]
async fn test_50_records_enrich_in_three_batches() {
    let pipeline = memory_pipeline(FakeSource::with_matches(50, 100), MemoryCheckpointStore::new());
    let exporter = CapturingExporter::default();

    let outcome = pipeline.run(signature("G1", 100), &exporter, &NoProgress).await;

    assert!(outcome.is_completed());
    let sizes: Vec<usize> = pipeline
        .source()
        .batches_requested()
        .iter()
        .map(Vec::len)
        .collect();
    assert_eq!(sizes, vec![24, 24, 2]);
    // One page save plus one save per batch
    assert_eq!(pipeline.store().save_count(), 4);
    assert!(pipeline.store().snapshot().is_none());
}

#[tokio::test]
async fn test_resume_after_page_failure_matches_clean_run() {
    let clean = memory_pipeline(FakeSource::with_matches(300, 100), MemoryCheckpointStore::new());
    let clean_export = CapturingExporter::default();
    assert!(
        clean
            .run(signature("G1", 250), &clean_export, &NoProgress)
            .await
            .is_completed()
    );

    let source = FakeSource::with_matches(300, 100);
    source.fail_on_page(2);
    let flaky = memory_pipeline(source, MemoryCheckpointStore::new());
    let export = CapturingExporter::default();

    let RunOutcome::Failed(failure) = flaky.run(signature("G1", 250), &export, &NoProgress).await
    else {
        panic!("expected the first run to fail");
    };
    assert_eq!(failure.stage, Stage::Paginating);
    assert_eq!(failure.fetched, 100);
    assert!(failure.resumable);

    let RunOutcome::Completed(report) = flaky.run(signature("G1", 250), &export, &NoProgress).await
    else {
        panic!("expected the resumed run to complete");
    };
    assert_eq!(
        report.resolution,
        CheckpointResolution::Resumed {
            fetched: 100,
            enriched: 0
        }
    );
    assert_eq!(flaky.source().pages_requested(), vec![1, 2, 2, 3]);
    assert_eq!(export.records(), clean_export.records());
}

#[tokio::test]
async fn test_resume_after_batch_failure_skips_finished_batches() {
    let source = FakeSource::with_matches(50, 100);
    source.fail_on_batch_call(2);
    let pipeline = memory_pipeline(source, MemoryCheckpointStore::new());
    let exporter = CapturingExporter::default();

    let RunOutcome::Failed(failure) = pipeline.run(signature("G1", 50), &exporter, &NoProgress).await
    else {
        panic!("expected batch failure");
    };
    assert_eq!(failure.stage, Stage::Enriching);
    assert_eq!(failure.enriched, 24);
    assert!(failure.resumable);
    assert_eq!(failure.error.retry_after(), Some(30.0));

    let saved = pipeline.store().snapshot().unwrap();
    assert_eq!(saved.enriched_count(), 24);
    assert!(saved.records[..24].iter().all(|r| r.is_enriched()));
    assert!(saved.records[24..].iter().all(|r| !r.is_enriched()));

    pipeline.source().reset_requests();
    assert!(
        pipeline
            .run(signature("G1", 50), &exporter, &NoProgress)
            .await
            .is_completed()
    );

    // Target already met: no page requests, only batches 2 and 3
    assert!(pipeline.source().pages_requested().is_empty());
    let all = ids("m", 50);
    assert_eq!(
        pipeline.source().batches_requested(),
        vec![all[24..48].to_vec(), all[48..].to_vec()]
    );
}

#[tokio::test]
async fn test_overlapping_pages_yield_unique_records() {
    let page = |range: std::ops::Range<usize>| -> Vec<_> {
        range.map(|i| record(&format!("m{i:04}"))).collect()
    };
    let source = FakeSource::with_pages(vec![page(0..100), page(50..150), page(150..180)]);
    let pipeline = memory_pipeline(source, MemoryCheckpointStore::new());
    let exporter = CapturingExporter::default();

    assert!(
        pipeline
            .run(signature("G1", 500), &exporter, &NoProgress)
            .await
            .is_completed()
    );

    let exported = sample_ids(&exporter.records());
    let unique: HashSet<_> = exported.iter().collect();
    assert_eq!(exported.len(), 180);
    assert_eq!(unique.len(), exported.len());
}

#[tokio::test]
async fn test_every_exported_record_is_fully_enriched() {
    let pipeline = memory_pipeline(FakeSource::with_matches(75, 100), MemoryCheckpointStore::new());
    let exporter = CapturingExporter::default();

    assert!(
        pipeline
            .run(signature("G1", 75), &exporter, &NoProgress)
            .await
            .is_completed()
    );

    let records = exporter.records();
    assert_eq!(records.len(), 75);
    for record in &records {
        assert!(record.is_enriched(), "{} not enriched", record.sample_id);
        let journeys = record.journeys.as_ref().unwrap();
        assert_eq!(journeys.len(), 1);
        assert_eq!(
            record.journey_names.as_ref().unwrap(),
            &vec![format!("Journey {}", journeys[0])]
        );
        assert_eq!(
            record.subjourneys.as_ref().unwrap(),
            &vec![format!("Community {}", journeys[0])]
        );
        assert_eq!(record.regions.as_ref().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_signature_mismatch_discards_stale_checkpoint() {
    let mut stale = Checkpoint::new(signature("OLD", 10));
    stale.records = vec![record("old-1"), record("old-2")];
    let store = MemoryCheckpointStore::with_checkpoint(stale);
    let pipeline = memory_pipeline(FakeSource::with_matches(20, 100), store);
    let exporter = CapturingExporter::default();

    let RunOutcome::Completed(report) = pipeline.run(signature("G1", 10), &exporter, &NoProgress).await
    else {
        panic!("expected completion");
    };

    let CheckpointResolution::Discarded { stale } = report.resolution else {
        panic!("expected the stale checkpoint to be discarded");
    };
    assert_eq!(stale.test_guid, "OLD");
    assert_eq!(sample_ids(&exporter.records()), ids("m", 10));
}

#[tokio::test]
async fn test_file_store_resume_across_pipelines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");

    let source = FakeSource::with_matches(300, 100);
    source.fail_on_page(2);
    let first = Pipeline::new(source, FileCheckpointStore::new(&path), NoDelay::new(), OPTIONS);
    let outcome = first
        .run(signature("G1", 300), &CapturingExporter::default(), &NoProgress)
        .await;
    assert!(!outcome.is_completed());
    assert!(path.exists());

    let second = Pipeline::new(
        FakeSource::with_matches(300, 100),
        FileCheckpointStore::new(&path),
        NoDelay::new(),
        OPTIONS,
    );
    let exporter = CapturingExporter::default();
    let RunOutcome::Completed(report) = second.run(signature("G1", 300), &exporter, &NoProgress).await
    else {
        panic!("expected completion");
    };

    assert!(matches!(
        report.resolution,
        CheckpointResolution::Resumed { fetched: 100, .. }
    ));
    assert_eq!(second.source().pages_requested(), vec![2, 3]);
    assert_eq!(exporter.records().len(), 300);
    assert!(!path.exists());
}

#[tokio::test]
async fn test_truncated_checkpoint_starts_fresh() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("progress.json");
    std::fs::write(&path, r#"{"params": {"test_guid": "G1", "#).unwrap();

    let store = FileCheckpointStore::new(&path);
    assert!(store.load().is_none());

    let pipeline = Pipeline::new(FakeSource::with_matches(10, 100), store, NoDelay::new(), OPTIONS);
    let exporter = CapturingExporter::default();
    let RunOutcome::Completed(report) = pipeline.run(signature("G1", 10), &exporter, &NoProgress).await
    else {
        panic!("expected completion");
    };

    assert_eq!(report.resolution, CheckpointResolution::Fresh);
    assert_eq!(exporter.records().len(), 10);
}

#[tokio::test]
async fn test_persistence_failure_is_fatal() {
    let store = MemoryCheckpointStore::new();
    store.set_fail_saves(true);
    let pipeline = memory_pipeline(FakeSource::with_matches(10, 100), store);

    let RunOutcome::Failed(failure) = pipeline
        .run(signature("G1", 10), &CapturingExporter::default(), &NoProgress)
        .await
    else {
        panic!("expected failure");
    };

    assert!(matches!(failure.error, MatchFetchError::Persistence { .. }));
    assert!(!failure.resumable);
}

#[tokio::test]
async fn test_cancellation_stops_at_page_boundary() {
    let cancel = CancellationFlag::new();
    let source = FakeSource::with_matches(500, 100);
    source.cancel_on_page(2, cancel.clone());
    let pipeline = memory_pipeline(source, MemoryCheckpointStore::new()).with_cancellation(cancel);

    let RunOutcome::Failed(failure) = pipeline
        .run(signature("G1", 400), &CapturingExporter::default(), &NoProgress)
        .await
    else {
        panic!("expected cancellation");
    };

    assert!(matches!(failure.error, MatchFetchError::Cancelled));
    assert!(failure.resumable);
    assert_eq!(failure.fetched, 200);
    assert_eq!(pipeline.source().pages_requested(), vec![1, 2]);
    assert_eq!(pipeline.store().snapshot().unwrap().fetched_count(), 200);
}

#[tokio::test]
async fn test_export_failure_keeps_enriched_checkpoint() {
    let pipeline = memory_pipeline(FakeSource::with_matches(30, 100), MemoryCheckpointStore::new());

    let RunOutcome::Failed(failure) = pipeline
        .run(signature("G1", 30), &CapturingExporter::failing(), &NoProgress)
        .await
    else {
        panic!("expected export failure");
    };
    assert_eq!(failure.stage, Stage::Exporting);

    pipeline.source().reset_requests();
    let exporter = CapturingExporter::default();
    assert!(
        pipeline
            .run(signature("G1", 30), &exporter, &NoProgress)
            .await
            .is_completed()
    );
    assert!(pipeline.source().pages_requested().is_empty());
    assert!(pipeline.source().batches_requested().is_empty());
    assert_eq!(exporter.records().len(), 30);
}

#[tokio::test]
async fn test_failed_save_resumes_from_last_saved_page() {
    let store = MemoryCheckpointStore::new();
    store.fail_saves_after(1);
    let pipeline = memory_pipeline(FakeSource::with_matches(300, 100), store);
    let exporter = CapturingExporter::default();

    let RunOutcome::Failed(failure) = pipeline.run(signature("G1", 250), &exporter, &NoProgress).await
    else {
        panic!("expected the failed save to stop the run");
    };
    assert!(matches!(failure.error, MatchFetchError::Persistence { .. }));
    assert_eq!(failure.stage, Stage::Paginating);
    assert_eq!((failure.fetched, failure.saved_fetched), (200, 100));
    assert_eq!(sample_ids(&failure.checkpoint.records), ids("m", 200));
    assert!(failure.resumable);

    pipeline.store().set_fail_saves(false);
    let RunOutcome::Completed(report) = pipeline.run(signature("G1", 250), &exporter, &NoProgress).await
    else {
        panic!("expected the resumed run to complete");
    };
    assert!(matches!(
        report.resolution,
        CheckpointResolution::Resumed { fetched: 100, .. }
    ));
    assert_eq!(sample_ids(&exporter.records()), ids("m", 250));
}
