//! Upload pipeline tests against local storage
//!
//! Run with: cargo test -p questlab-processing --test upload_pipeline_test

use std::sync::Arc;

use questlab_core::{AppError, QuestlabConfig, RateLimitRule};
use questlab_infra::{ActionRateLimiter, InMemoryStore, ManualClock, RateLimiter};
use questlab_processing::{UploadPipeline, UploadValidator};
use questlab_storage::{LocalStorage, Storage};
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";

struct Harness {
    pipeline: UploadPipeline,
    storage: Arc<LocalStorage>,
    clock: Arc<ManualClock>,
    _dir: TempDir,
}

async fn harness(config: QuestlabConfig) -> Harness {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
    let clock = Arc::new(ManualClock::starting_now());
    let limiter = RateLimiter::new(Arc::new(InMemoryStore::new()), clock.clone());
    let pipeline = UploadPipeline::new(
        Arc::new(UploadValidator::from_config(&config)),
        ActionRateLimiter::new(limiter, &config),
        storage.clone(),
    );
    Harness {
        pipeline,
        storage,
        clock,
        _dir: dir,
    }
}

fn stored_files(h: &Harness) -> usize {
    std::fs::read_dir(h.storage.base_path()).unwrap().count()
}

#[tokio::test]
async fn test_valid_png_is_stored_under_generated_name() {
    let h = harness(QuestlabConfig::default()).await;
    let stored = h
        .pipeline
        .store("203.0.113.7", "../../etc/passwd.png", PNG.to_vec())
        .await
        .unwrap();

    assert!(stored.storage_name.ends_with(".png"));
    assert!(!stored.storage_name.contains("passwd"));
    assert_eq!(stored.size_bytes, PNG.len() as u64);
    assert_eq!(h.storage.get(&stored.storage_key).await.unwrap(), PNG);
    assert_eq!(stored_files(&h), 1);
}

#[tokio::test]
async fn test_accepted_png_keeps_extension_whatever_the_stem() {
    let h = harness(QuestlabConfig::default()).await;

    for filename in ["фото.png", "_.png", "..png"] {
        let stored = h.pipeline.store("203.0.113.7", filename, PNG.to_vec()).await.unwrap();
        assert!(
            stored.storage_name.ends_with(".png"),
            "{} stored as {}",
            filename,
            stored.storage_name
        );
        assert!(h.storage.exists(&stored.storage_key).await.unwrap());
    }
    assert_eq!(stored_files(&h), 3);
}

#[tokio::test]
async fn test_rejections_write_nothing() {
    let h = harness(QuestlabConfig::default()).await;
    let client = "203.0.113.8";

    let cases: Vec<(&str, Vec<u8>, &str)> = vec![
        ("", PNG.to_vec(), "No file selected"),
        ("script.exe", PNG.to_vec(), "File type not allowed"),
        ("photo.png", b"This is not an image".to_vec(), "Invalid file type"),
        ("photo.jpg", PNG.to_vec(), "Invalid file type"),
    ];

    for (filename, data, message) in cases {
        match h.pipeline.store(client, filename, data).await {
            Err(AppError::InvalidInput(msg)) => assert_eq!(msg, message, "{}", filename),
            other => panic!("{}: expected InvalidInput, got {:?}", filename, other),
        }
    }
    assert_eq!(stored_files(&h), 0);
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let config = QuestlabConfig {
        max_content_length_bytes: 10 * 1024 * 1024,
        ..QuestlabConfig::default()
    };
    let h = harness(config).await;
    let mut data = PNG.to_vec();
    data.resize(11 * 1024 * 1024, 0);

    match h.pipeline.store("c", "big.png", data).await {
        Err(AppError::PayloadTooLarge { size, max }) => {
            assert_eq!(size, 11 * 1024 * 1024);
            assert_eq!(max, 10 * 1024 * 1024);
        }
        other => panic!("expected PayloadTooLarge, got {:?}", other),
    }
    assert_eq!(stored_files(&h), 0);

    let mut data = PNG.to_vec();
    data.resize(10 * 1024 * 1024, 0);
    assert!(h.pipeline.store("c", "exact.png", data).await.is_ok());
}

#[tokio::test]
async fn test_upload_budget_is_per_client() {
    let config = QuestlabConfig {
        upload_rate_limit: RateLimitRule::new(2, 60),
        ..QuestlabConfig::default()
    };
    let h = harness(config).await;

    assert!(h.pipeline.store("a", "1.png", PNG.to_vec()).await.is_ok());
    // rejected files still spend budget
    assert!(h.pipeline.store("a", "2.exe", PNG.to_vec()).await.is_err());
    assert!(matches!(
        h.pipeline.store("a", "3.png", PNG.to_vec()).await,
        Err(AppError::TooManyRequests { .. })
    ));
    assert!(h.pipeline.store("b", "4.png", PNG.to_vec()).await.is_ok());

    h.clock.advance_secs(61);
    assert!(h.pipeline.store("a", "5.png", PNG.to_vec()).await.is_ok());
    assert_eq!(stored_files(&h), 3);
}

#[tokio::test]
async fn test_check_does_not_store_or_spend_budget() {
    let config = QuestlabConfig {
        upload_rate_limit: RateLimitRule::new(1, 60),
        ..QuestlabConfig::default()
    };
    let h = harness(config).await;
    for _ in 0..3 {
        assert_eq!(h.pipeline.check("a.png", PNG).unwrap(), PNG.len() as u64);
    }
    assert_eq!(stored_files(&h), 0);
    assert!(h.pipeline.store("a", "a.png", PNG.to_vec()).await.is_ok());
}
