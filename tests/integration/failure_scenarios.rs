//! Failure tests for the monitoring loop
//!
//! These tests verify that cycle errors are absorbed:
//! - Network failures and timeouts
//! - Malformed pages
//! - Panicking alert sinks

use std::time::Duration;

use assert_matches::assert_matches;
use voltage_monitor::{
    AlertEvent, AlertSink, AlertState, ExtractError, FetchError, Monitor, TickOutcome,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_timeout_before_drop_changes_nothing() {
    let config = create_test_config(3600, 200.0);
    let fetcher = ScriptedFetcher::new([
        Ok(status_page(205.0)),
        Err(FetchError::Timeout),
        Ok(status_page(199.0)),
    ]);
    let (monitor, mut alert_rx) = create_test_monitor(config, fetcher);
    monitor.start();

    monitor.check_now().await.unwrap();
    assert_eq!(
        monitor.check_now().await.unwrap(),
        TickOutcome::FetchFailed(FetchError::Timeout)
    );
    assert_eq!(monitor.alert_state().await, Some(AlertState::Armed));
    assert!(alert_rx.try_recv().is_err());

    assert_matches!(
        monitor.check_now().await.unwrap(),
        TickOutcome::Evaluated { fired: true, .. }
    );
    assert_eq!(alert_rx.recv().await.unwrap().value, 199.0);

    monitor.stop();
}

#[tokio::test]
async fn test_timeout_while_alerted_keeps_latch() {
    let config = create_test_config(3600, 200.0);
    let fetcher = ScriptedFetcher::new([
        Ok(status_page(199.0)),
        Err(FetchError::Timeout),
        Ok(status_page(198.0)),
    ]);
    let (monitor, mut alert_rx) = create_test_monitor(config, fetcher);
    monitor.start();

    for _ in 0..3 {
        monitor.check_now().await.unwrap();
    }

    assert_eq!(monitor.alert_state().await, Some(AlertState::Alerted));
    assert_eq!(alert_rx.recv().await.unwrap().value, 199.0);
    assert!(alert_rx.try_recv().is_err(), "no repeat alert after timeout");

    monitor.stop();
}

#[tokio::test]
async fn test_malformed_pages_abort_cycle() {
    let config = create_test_config(3600, 200.0);
    let fetcher = ScriptedFetcher::new([
        Ok("<html><body>maintenance</body></html>".to_string()),
        Ok(r#"<div class="text-md">Струм: 4А</div>"#.to_string()),
        Ok(r#"<div class="text-md">Напруга: ???В</div>"#.to_string()),
        Ok(status_page(201.0)),
    ]);
    let (monitor, _alert_rx) = create_test_monitor(config, fetcher);
    monitor.start();

    assert_eq!(
        monitor.check_now().await.unwrap(),
        TickOutcome::ExtractFailed(ExtractError::NoCandidateElements)
    );
    assert_eq!(
        monitor.check_now().await.unwrap(),
        TickOutcome::ExtractFailed(ExtractError::LabelNotFound)
    );
    assert_matches!(
        monitor.check_now().await.unwrap(),
        TickOutcome::ExtractFailed(ExtractError::NumberFormat(_))
    );
    assert_eq!(
        monitor.check_now().await.unwrap(),
        TickOutcome::Evaluated {
            value: 201.0,
            state: AlertState::Armed,
            fired: false,
        }
    );
    assert!(monitor.is_running());

    monitor.stop();
}

#[tokio::test]
async fn test_http_timeout_is_classified() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/voltage"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(status_page(190.0))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = create_test_config(3600, 200.0);
    config
        .set_url(&format!("{}/voltage", mock_server.uri()))
        .unwrap();

    let (alert_tx, mut alert_rx) = tokio::sync::mpsc::unbounded_channel::<AlertEvent>();
    let monitor = Monitor::new(config, alert_tx);
    monitor.start();

    assert_eq!(
        monitor.check_now().await.unwrap(),
        TickOutcome::FetchFailed(FetchError::Timeout)
    );
    assert!(alert_rx.try_recv().is_err());
    assert_eq!(monitor.alert_state().await, Some(AlertState::Armed));

    monitor.stop();
}

#[tokio::test]
async fn test_unreachable_page_keeps_loop_alive() {
    let config = create_test_config(3600, 200.0);
    config.set_url("http://127.0.0.1:9999/voltage").unwrap();

    let (alert_tx, _alert_rx) = tokio::sync::mpsc::unbounded_channel::<AlertEvent>();
    let monitor = Monitor::new(config, alert_tx);
    monitor.start();

    for _ in 0..3 {
        assert_matches!(
            monitor.check_now().await.unwrap(),
            TickOutcome::FetchFailed(FetchError::Transport(_))
        );
    }
    assert!(monitor.is_running());

    monitor.stop();
}

struct PanickingSink;

impl AlertSink for PanickingSink {
    fn deliver(&self, _event: AlertEvent) {
        panic!("sink failure");
    }
}

#[tokio::test]
async fn test_panicking_sink_does_not_end_loop() {
    let config = create_test_config(3600, 200.0);
    let fetcher = ScriptedFetcher::readings(&[190.0, 201.0]);
    let monitor = Monitor::new(config, PanickingSink).with_fetcher(fetcher);
    monitor.start();

    assert_eq!(monitor.check_now().await.unwrap(), TickOutcome::Panicked);
    assert!(monitor.is_running());

    assert_matches!(
        monitor.check_now().await.unwrap(),
        TickOutcome::Evaluated { value, .. } if value == 201.0
    );

    monitor.stop();
}
