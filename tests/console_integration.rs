//! Integration tests for the console core against fake upstream services.
//!
//! These tests exercise the full wiring of `ConsoleHandle`:
//! - Live SSE ingestion through the HTTP transport
//! - Telemetry polling against fake `/healthz`, `/config` and `/metrics`
//! - Offline mode and the synthetic fallback
//! - Operator commands and their failure notices

use std::convert::Infallible;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::{Json, Router};
use edgesight_console::stream::SourceKind;
use edgesight_console::telemetry::{Gauge, Service};
use edgesight_console::{ConsoleConfig, ConsoleHandle, ConsoleView};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::watch;

const UNREACHABLE: &str = "http://127.0.0.1:1";

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{addr}")
}

fn config_for(base: &str) -> ConsoleConfig {
    let mut config = ConsoleConfig::default();
    config.endpoints.adapter = base.to_string();
    config.endpoints.inference = base.to_string();
    config.endpoints.capture = base.to_string();
    config.endpoints.preprocess = base.to_string();
    config.polling.interval_ms = 100;
    config.polling.request_timeout_ms = 500;
    config
}

/// Wait until `predicate` holds for the published view.
async fn wait_for<F>(views: &mut watch::Receiver<ConsoleView>, predicate: F) -> ConsoleView
where
    F: Fn(&ConsoleView) -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let view = views.borrow_and_update();
                if predicate(&view) {
                    return view.clone();
                }
            }
            if views.changed().await.is_err() {
                panic!("console stopped publishing views");
            }
        }
    })
    .await;
    match waited {
        Ok(view) => view,
        Err(_) => panic!("condition not reached; last view: {:?}", views.borrow()),
    }
}

fn sse_event(frame_id: u32, latency_ms: f64) -> Event {
    let payload = json!({
        "ts": "2024-05-01T08:00:00Z",
        "frame_id": frame_id,
        "detections": [
            { "bbox": [10.0, 20.0, 30.0, 40.0], "score": 0.91, "class_id": "defect" }
        ],
        "corr_id": format!("corr-{frame_id}"),
        "latency_ms": latency_ms,
    });
    Event::default().event("result").data(payload.to_string())
}

/// Three valid events and one malformed one, then the stream stays open.
async fn event_stream() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = vec![
        sse_event(1, 41.0),
        Event::default().comment("keep-alive"),
        Event::default().data("{not json"),
        sse_event(2, 43.5),
        sse_event(3, 39.0),
    ];
    let stream = futures::stream::iter(events.into_iter().map(Ok)).chain(futures::stream::pending());
    Sse::new(stream)
}

async fn capture_metrics() -> &'static str {
    "# TYPE capture_fps gauge\n\
     capture_fps 12.5\n\
     capture_frames_dropped_total 2\n\
     mqtt_published_total 40\n\
     e2e_latency_ms_sum 90.0\n\
     e2e_latency_ms_count 3\n"
}

async fn observed_config() -> Json<Value> {
    Json(json!({ "conf_threshold": 0.55, "opcua_enabled": true, "demo_force": false }))
}

async fn patch_config(Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "ok": true, "applied": body }))
}

fn full_upstream() -> Router {
    Router::new()
        .route("/events", get(event_stream))
        .route("/healthz", get(|| async { StatusCode::OK }))
        .route("/metrics", get(capture_metrics))
        .route("/config", get(observed_config).patch(patch_config))
}

/// Test that live events reach the view newest-first and malformed ones are dropped
#[tokio::test]
async fn test_live_stream_populates_view() {
    let base = serve(full_upstream()).await;
    let console = ConsoleHandle::builder(config_for(&base))
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    let view = wait_for(&mut views, |v| v.events.len() == 3 && v.connected).await;

    let frames: Vec<&str> = view.events.iter().map(|e| e.frame_id.as_str()).collect();
    assert_eq!(frames, vec!["3", "2", "1"]);
    assert_eq!(view.source, Some(SourceKind::Live));
    assert!(!view.live_failed);
    assert_eq!(view.latency_series, vec![41.0, 43.5, 39.0]);
    assert_eq!(view.events[0].correlation_id.as_deref(), Some("corr-3"));
}

/// Test that one poll tick fills health, gauges and observed configuration
#[tokio::test]
async fn test_polling_populates_snapshot() {
    let base = serve(full_upstream()).await;
    let console = ConsoleHandle::builder(config_for(&base))
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    let view = wait_for(&mut views, |v| {
        v.snapshot.gauge(Gauge::CaptureFps).is_some() && v.snapshot.conf_threshold.is_some()
    })
    .await;

    for service in Service::ALL {
        assert_eq!(view.snapshot.health(service), Some(true), "{service:?}");
    }
    assert_eq!(view.snapshot.gauge(Gauge::CaptureFps), Some(12.5));
    assert_eq!(view.snapshot.gauge(Gauge::CaptureFramesDroppedTotal), Some(2.0));
    assert_eq!(view.snapshot.gauge(Gauge::E2eAvgMs), Some(30.0));
    assert_eq!(view.snapshot.conf_threshold, Some(0.55));
    assert_eq!(view.snapshot.opcua_enabled, Some(true));
    assert!(!view.mode.offline);
}

/// Test that a failing service only affects its own readings
#[tokio::test]
async fn test_poller_isolates_failing_service() {
    let healthy = serve(full_upstream()).await;
    let broken = serve(Router::new().route(
        "/metrics",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    ))
    .await;

    let mut config = config_for(&healthy);
    config.endpoints.preprocess = broken;
    config.endpoints.inference = UNREACHABLE.to_string();
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    let view = wait_for(&mut views, |v| {
        v.snapshot.health(Service::Preprocess).is_some()
            && v.snapshot.health(Service::Inference).is_some()
            && v.snapshot.gauge(Gauge::CaptureFps).is_some()
    })
    .await;

    assert_eq!(view.snapshot.health(Service::Capture), Some(true));
    assert_eq!(view.snapshot.health(Service::Adapter), Some(true));
    assert_eq!(view.snapshot.health(Service::Preprocess), Some(false));
    assert_eq!(view.snapshot.health(Service::Inference), Some(false));
    assert_eq!(view.snapshot.gauge(Gauge::CaptureFps), Some(12.5));
    // The adapter still answers /config.
    assert_eq!(view.snapshot.opcua_enabled, Some(true));
}

/// Test that offline mode runs on synthetic data without touching the network
#[tokio::test]
async fn test_offline_mode_uses_synthetic_sources() {
    let mut config = config_for(UNREACHABLE);
    config.synthetic.force_offline = true;
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    let view = wait_for(&mut views, |v| {
        v.events.len() >= 2 && v.snapshot.gauge(Gauge::CaptureFps).is_some()
    })
    .await;

    assert!(view.mode.offline);
    assert!(view.connected);
    assert_eq!(view.source, Some(SourceKind::Synthetic));
    assert!(!view.live_failed);
    for service in Service::ALL {
        assert_eq!(view.snapshot.health(service), Some(true));
    }
}

/// Test that switching online swaps the source and resets derived telemetry
#[tokio::test]
async fn test_mode_switch_swaps_source() {
    let base = serve(full_upstream()).await;
    let mut config = config_for(&base);
    config.synthetic.force_offline = true;
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    wait_for(&mut views, |v| {
        v.source == Some(SourceKind::Synthetic) && v.connected && !v.events.is_empty()
    })
    .await;

    let reply = console.set_force_offline(false).await;
    assert_eq!(reply.as_ref().map(|v| v["ok"].clone()), Some(json!(true)));

    let view = wait_for(&mut views, |v| {
        v.source == Some(SourceKind::Live)
            && v.connected
            && v.events.first().and_then(|e| e.correlation_id.as_deref()) == Some("corr-3")
    })
    .await;
    assert_eq!(view.mode.epoch, 1);
    assert!(!view.mode.offline);
    // Synthetic events from the offline period stay below the live ones.
    let live: Vec<_> = view.events[..3]
        .iter()
        .map(|e| e.correlation_id.as_deref())
        .collect();
    assert_eq!(live, vec![Some("corr-3"), Some("corr-2"), Some("corr-1")]);
    assert!(view.events.len() > 3);
    assert!(view.notice.is_none());
}

/// Test that a failed command surfaces a notice while the local edit stays
#[tokio::test]
async fn test_failed_command_sets_notice() {
    let mut config = config_for(UNREACHABLE);
    config.synthetic.force_offline = true;
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();

    let reply = console.set_threshold(0.8).await;
    assert!(reply.is_none());

    let view = wait_for(&mut views, |v| v.notice.is_some()).await;
    assert_eq!(view.snapshot.conf_threshold, Some(0.8));
    assert_eq!(view.notice.as_ref().map(|n| n.code), Some(4001));

    console.dismiss_notice().await;
    wait_for(&mut views, |v| v.notice.is_none()).await;
}

/// Test that an unusable stream URL falls back to synthetic events for the session
#[tokio::test(start_paused = true)]
async fn test_transport_construction_failure_falls_back() {
    let mut config = config_for("not a url");
    config.synthetic.interval_ms = 220;
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");

    tokio::time::sleep(Duration::from_millis(1_000)).await;

    let view = console.view();
    assert!(!view.mode.offline);
    assert!(view.live_failed);
    assert!(view.connected);
    assert_eq!(view.source, Some(SourceKind::Synthetic));
    assert!(
        (4..=5).contains(&view.events.len()),
        "expected one event per 220 ms, got {}",
        view.events.len()
    );
}

/// Test that disposing stops every background update
#[tokio::test]
async fn test_dispose_stops_updates() {
    let mut config = config_for(UNREACHABLE);
    config.synthetic.force_offline = true;
    let mut console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut views = console.subscribe();
    wait_for(&mut views, |v| !v.events.is_empty()).await;

    console.dispose();
    console.dispose();
    let frozen = console.view().events.len();
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(console.view().events.len(), frozen);
}

/// Test that the view stream yields the current view and then later updates
#[tokio::test]
async fn test_view_stream_follows_updates() {
    let mut config = config_for(UNREACHABLE);
    config.synthetic.force_offline = true;
    let console = ConsoleHandle::builder(config)
        .spawn()
        .expect("console should start");
    let mut stream = console.view_stream();

    let first = tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("initial view")
        .expect("stream open");
    assert!(first.mode.offline);

    let filled = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(view) = stream.next().await {
            if view.events.len() >= 2 {
                return Some(view);
            }
        }
        None
    })
    .await
    .expect("events within timeout")
    .expect("stream open");
    assert_eq!(filled.source, Some(SourceKind::Synthetic));
    assert!(filled.events.len() >= 2);
}
