//! Offline build, publish, load and maintenance on a temporary workspace.

use super::support_pairs;
use crate::config::{
    get_build_dir, get_config_path, get_current_path, index_file, manifest_file, meta_file,
};
use crate::types::{AskStatus, BuildOptions, PrepareOptions, QaPair};
use crate::{build, clean, dataset, load_context, open_pipeline, prepare, reload, snapshot, stats};
use crate::progress::{ProgressEvent, ProgressReporter};
use helpdesk_core::{AppConfig, AppError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const BASE: &str = "ubuntu";

async fn write_corpus(dir: &Path, pairs: &[QaPair]) -> PathBuf {
    let path = dir.join("pairs.jsonl");
    dataset::write_pairs(&path, pairs).await.unwrap();
    path
}

fn options(input: PathBuf) -> BuildOptions {
    BuildOptions {
        base_name: BASE.to_string(),
        input,
    }
}

#[tokio::test]
async fn test_build_then_ask() {
    let temp = TempDir::new().unwrap();
    let mut pairs = support_pairs();
    // Dropped by the filter: too short, and chatter.
    pairs.push(QaPair::new("wifi?", "try again"));
    pairs.push(QaPair::new("anyone here from brazil", "yes i am from sao paulo"));
    let input = write_corpus(temp.path(), &pairs).await;

    let phases = Arc::new(Mutex::new(Vec::new()));
    let phases_clone = phases.clone();
    let reporter = ProgressReporter::new(Arc::new(move |event: ProgressEvent| {
        phases_clone.lock().unwrap().push(event.phase);
    }));

    let app = AppConfig::default();
    let built = build(temp.path(), &app, options(input), &reporter).await.unwrap();

    assert_eq!(built.pairs_read, 8);
    assert_eq!(built.pairs_indexed, 6);
    assert_eq!(built.filter.dropped(), 2);
    assert_eq!(built.dimensions, 384);
    assert!(get_config_path(temp.path(), BASE).exists());

    let phases = phases.lock().unwrap().clone();
    for phase in ["load", "filter", "embed", "index", "publish"] {
        assert!(phases.iter().any(|p| p == phase), "missing phase {}", phase);
    }

    let pipeline = open_pipeline(temp.path(), &app, BASE).await.unwrap();
    let response = pipeline
        .ask("how do I fix WiFi not connecting after update")
        .await
        .unwrap();
    assert_eq!(response.status, AskStatus::Accepted);
    assert!(response
        .candidates
        .iter()
        .any(|c| c.pair.query == "wifi driver not detected after kernel update"));

    let rejected = pipeline.ask("what's the capital of France").await.unwrap();
    assert_eq!(rejected.status, AskStatus::Rejected);
}

#[tokio::test]
async fn test_rebuild_keeps_current_and_previous() {
    let temp = TempDir::new().unwrap();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    let app = AppConfig::default();
    let reporter = ProgressReporter::noop();

    let first = build(temp.path(), &app, options(input.clone()), &reporter).await.unwrap();
    let second = build(temp.path(), &app, options(input.clone()), &reporter).await.unwrap();
    let third = build(temp.path(), &app, options(input), &reporter).await.unwrap();

    let builds = snapshot::list_builds(temp.path(), BASE).unwrap();
    assert_eq!(builds.len(), 2);
    assert!(!builds.contains(&first.build_id));
    assert!(builds.contains(&second.build_id));
    assert_eq!(
        snapshot::read_current(temp.path(), BASE).unwrap(),
        Some(third.build_id.clone())
    );

    let info = stats(temp.path(), BASE).unwrap();
    assert_eq!(info.build_id, third.build_id);
    assert_eq!(info.pair_count, 6);
    assert!(info.index_size_bytes > 0);
    assert!(info.meta_size_bytes > 0);
}

#[tokio::test]
async fn test_rebuild_over_unreadable_current_keeps_old_builds() {
    let temp = TempDir::new().unwrap();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    let app = AppConfig::default();
    let reporter = ProgressReporter::noop();

    let first = build(temp.path(), &app, options(input.clone()), &reporter).await.unwrap();
    let second = build(temp.path(), &app, options(input.clone()), &reporter).await.unwrap();
    std::fs::write(get_current_path(temp.path(), BASE), "").unwrap();

    let third = build(temp.path(), &app, options(input), &reporter).await.unwrap();

    assert_eq!(
        snapshot::read_current(temp.path(), BASE).unwrap(),
        Some(third.build_id.clone())
    );
    let builds = snapshot::list_builds(temp.path(), BASE).unwrap();
    assert_eq!(builds.len(), 3);
    assert!(builds.contains(&first.build_id));
    assert!(builds.contains(&second.build_id));
}

#[tokio::test]
async fn test_reload_swaps_published_build() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig::default();
    let reporter = ProgressReporter::noop();

    let input = write_corpus(temp.path(), &support_pairs()[..2]).await;
    build(temp.path(), &app, options(input), &reporter).await.unwrap();
    let pipeline = open_pipeline(temp.path(), &app, BASE).await.unwrap();
    assert_eq!(pipeline.context().retriever().corpus().len(), 2);

    let input = write_corpus(temp.path(), &support_pairs()).await;
    build(temp.path(), &app, options(input), &reporter).await.unwrap();
    reload(&pipeline, temp.path(), &app, BASE).await.unwrap();
    assert_eq!(pipeline.context().retriever().corpus().len(), 6);
}

#[tokio::test]
async fn test_load_refuses_tampered_index() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig::default();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    let built = build(temp.path(), &app, options(input), &ProgressReporter::noop())
        .await
        .unwrap();

    let path = index_file(&get_build_dir(temp.path(), BASE, &built.build_id));
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0x55;
    std::fs::write(&path, bytes).unwrap();

    let err = load_context(temp.path(), &app, BASE).await.err().unwrap();
    assert!(matches!(err, AppError::CorruptData(_)));
    assert!(err.is_integrity_failure());
}

#[tokio::test]
async fn test_load_refuses_count_mismatch() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig::default();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    let built = build(temp.path(), &app, options(input), &ProgressReporter::noop())
        .await
        .unwrap();
    let build_dir = get_build_dir(temp.path(), BASE, &built.build_id);

    let conn = rusqlite::Connection::open(meta_file(&build_dir)).unwrap();
    conn.execute("DELETE FROM pairs WHERE id = 5", []).unwrap();
    drop(conn);

    assert!(matches!(
        load_context(temp.path(), &app, BASE).await,
        Err(AppError::CorruptData(_))
    ));
}

#[tokio::test]
async fn test_load_refuses_manifest_disagreement() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig::default();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    let built = build(temp.path(), &app, options(input), &ProgressReporter::noop())
        .await
        .unwrap();
    let build_dir = get_build_dir(temp.path(), BASE, &built.build_id);

    let mut manifest = snapshot::read_manifest(&build_dir).unwrap();
    manifest.pair_count = 7;
    snapshot::write_manifest(&build_dir, &manifest).unwrap();

    assert!(matches!(
        load_context(temp.path(), &app, BASE).await,
        Err(AppError::CorruptData(_))
    ));
    assert!(manifest_file(&build_dir).exists());
}

#[tokio::test]
async fn test_load_refuses_other_encoder() {
    let temp = TempDir::new().unwrap();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    build(
        temp.path(),
        &AppConfig::default(),
        options(input),
        &ProgressReporter::noop(),
    )
    .await
    .unwrap();

    let app = AppConfig {
        model: Some("trigram-v2".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        load_context(temp.path(), &app, BASE).await,
        Err(AppError::Encoding(_))
    ));
}

#[tokio::test]
async fn test_build_with_nothing_left_fails_without_publishing() {
    let temp = TempDir::new().unwrap();
    let input = write_corpus(temp.path(), &[QaPair::new("hi", "hello")]).await;

    let result = build(
        temp.path(),
        &AppConfig::default(),
        options(input),
        &ProgressReporter::noop(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(snapshot::read_current(temp.path(), BASE).unwrap(), None);
}

#[tokio::test]
async fn test_clean_removes_builds() {
    let temp = TempDir::new().unwrap();
    let app = AppConfig::default();
    let input = write_corpus(temp.path(), &support_pairs()).await;
    build(temp.path(), &app, options(input), &ProgressReporter::noop())
        .await
        .unwrap();

    assert_eq!(clean(temp.path(), BASE).unwrap(), 1);
    assert!(load_context(temp.path(), &app, BASE).await.is_err());
    assert!(stats(temp.path(), BASE).is_err());
    assert!(clean(temp.path(), "missing").is_err());
}

#[tokio::test]
async fn test_prepare_pairs_dialogues() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("dialogues.jsonl");
    std::fs::write(
        &input,
        concat!(
            r#"{"dialogue_id":"7","from":"amy","text":"[10:01] my wifi drops every few minutes","date":"2010-05-01T10:01"}"#,
            "\n",
            r#"{"dialogue_id":"7","from":"bob","text":"try  disabling power management on the card","date":"2010-05-01T10:02"}"#,
            "\n",
            r#"{"dialogue_id":"7","from":"amy","text":"thanks","date":"2010-05-01T10:03"}"#,
            "\n",
            r#"{"dialogue_id":"8","from":"cat","text":"anyone around to help with grub","date":"2010-05-02T08:00"}"#,
            "\n",
        ),
    )
    .unwrap();
    let output = temp.path().join("pairs.jsonl");

    let prepared = prepare(
        temp.path(),
        BASE,
        PrepareOptions {
            input,
            output: output.clone(),
        },
    )
    .await
    .unwrap();

    assert_eq!(prepared.messages_read, 4);
    assert_eq!(prepared.dialogues, 2);
    assert_eq!(prepared.pairs_written, 1);

    let pairs = dataset::read_pairs(&output).await.unwrap().records;
    assert_eq!(pairs[0].query, "my wifi drops every few minutes");
    assert_eq!(pairs[0].answer, "try disabling power management on the card");
}
