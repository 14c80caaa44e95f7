//! Concurrency tests
//!
//! These tests verify thread-safety between the configuring side and the worker:
//! - Concurrent start requests spawn a single worker
//! - Configuration edits while the worker is sampling

use std::sync::Arc;
use std::time::Duration;

use voltage_monitor::{StartStatus, TickOutcome};

use crate::helpers::*;

#[tokio::test]
async fn test_double_start_runs_single_worker() {
    let config = create_test_config(1, 200.0);
    let fetcher = ScriptedFetcher::readings(&[220.0; 10]);
    let (monitor, _alert_rx) = create_test_monitor(config, fetcher.clone());

    assert_eq!(monitor.start(), StartStatus::Started);
    assert_eq!(monitor.start(), StartStatus::AlreadyRunning);

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(fetcher.calls(), 1, "a second worker would have fetched too");

    monitor.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_start_requests() {
    let config = create_test_config(3600, 200.0);
    let (monitor, _alert_rx) = create_test_monitor(config, ScriptedFetcher::default());
    let monitor = Arc::new(monitor);

    let mut tasks = vec![];
    for _ in 0..10 {
        let monitor = monitor.clone();
        tasks.push(tokio::spawn(async move { monitor.start() }));
    }

    let mut started = 0;
    for task in tasks {
        if task.await.unwrap() == StartStatus::Started {
            started += 1;
        }
    }

    assert_eq!(started, 1);
    assert!(monitor.is_running());

    monitor.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_config_edits_while_sampling() {
    let config = create_test_config(3600, 200.0);
    let fetcher = ScriptedFetcher::readings(&[210.0; 50]);
    let (monitor, _alert_rx) = create_test_monitor(config.clone(), fetcher);
    monitor.start();

    let editor = {
        let config = config.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                config.set_threshold(&format!("{}", 150 + i % 50)).unwrap();
                config.set_interval(&format!("{}", 1 + i % 5)).unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    for _ in 0..50 {
        let outcome = monitor.check_now().await.unwrap();
        assert!(matches!(outcome, TickOutcome::Evaluated { value, .. } if value == 210.0));
    }

    editor.await.unwrap();
    assert!(monitor.is_running());

    monitor.stop();
}
