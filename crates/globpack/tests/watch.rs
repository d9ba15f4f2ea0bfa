//! Integration tests for watch mode.

mod common;

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{capture, drain, recorder, Call, Workspace};
use globpack::{
    ChangeDetector, ChangeSubscription, Error, Globpack, GlobpackOptions, ManualDetector,
    NotifyDetector,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

fn options() -> GlobpackOptions {
    GlobpackOptions {
        silent: true,
        aggregate_timeout: 50,
        ..GlobpackOptions::default()
    }
}

async fn next_call(rx: &mut mpsc::UnboundedReceiver<Call>) -> Call {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a callback")
        .expect("callback channel closed")
}

/// Wait past the coalescing window and return what arrived.
async fn settle(rx: &mut mpsc::UnboundedReceiver<Call>) -> Vec<Call> {
    sleep(Duration::from_millis(400)).await;
    drain(rx)
}

#[tokio::test]
async fn test_watch_resolves_after_initial_compiles() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));
    ws.package("beta", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    let watchers = globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();

    assert_eq!(watchers.len(), 2);
    assert_eq!(drain(&mut rx).len(), 2);
    assert_eq!(detector.subscriber_count(), 2);
    assert!(ws.path("packages/alpha/dist/main.js").exists());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_change_recompiles_only_the_closest_config() {
    let ws = Workspace::new();
    let outer = ws.package_at("app", json!({ "mode": "none", "entry": "./index.js" }));
    let nested = ws.package_at("app/nested", json!({ "mode": "none", "entry": "./index.js" }));
    let sibling = ws.package_at("app2", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    globpack
        .watch(["app/globpack.json", "app/nested/globpack.json", "app2/globpack.json"], Some(cb))
        .await
        .unwrap();
    assert_eq!(drain(&mut rx).len(), 3);

    // Both the outer and nested watchers see the event; only nested owns it.
    assert_eq!(detector.emit(ws.path("app/nested/index.js")), 2);
    let call = next_call(&mut rx).await;
    assert_eq!(call.config.as_deref(), Some(nested.as_path()));
    assert!(settle(&mut rx).await.is_empty());

    detector.emit(ws.path("app/index.js"));
    let call = next_call(&mut rx).await;
    assert_eq!(call.config.as_deref(), Some(outer.as_path()));

    // /app is not an ancestor of /app2.
    detector.emit(ws.path("app2/index.js"));
    let call = next_call(&mut rx).await;
    assert_eq!(call.config.as_deref(), Some(sibling.as_path()));
    assert!(settle(&mut rx).await.is_empty());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_closest_config_spans_separate_watch_calls() {
    let ws = Workspace::new();
    let outer = ws.package_at("app", json!({ "mode": "none", "entry": "./index.js" }));
    let nested = ws.package_at("app/nested", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    globpack.watch(["app/globpack.json"], Some(cb.clone())).await.unwrap();
    let nested_watchers = globpack
        .watch(["app/nested/globpack.json"], Some(cb))
        .await
        .unwrap();
    assert_eq!(drain(&mut rx).len(), 2);

    // The watcher started first defers to the nested config started later.
    assert_eq!(detector.emit(ws.path("app/nested/index.js")), 2);
    let call = next_call(&mut rx).await;
    assert_eq!(call.config.as_deref(), Some(nested.as_path()));
    assert!(settle(&mut rx).await.is_empty());

    // Once the nested watcher is gone, the outer config owns the change.
    nested_watchers[0].close().await.unwrap();
    detector.emit(ws.path("app/nested/index.js"));
    let call = next_call(&mut rx).await;
    assert_eq!(call.config.as_deref(), Some(outer.as_path()));
    assert!(settle(&mut rx).await.is_empty());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_rapid_changes_coalesce_into_one_callback() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(GlobpackOptions {
        aggregate_timeout: 150,
        ..options()
    })
    .with_cwd(&ws.root)
    .with_detector(detector.clone());

    globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);

    for _ in 0..5 {
        detector.emit(ws.path("packages/alpha/index.js"));
    }

    next_call(&mut rx).await;
    assert!(settle(&mut rx).await.is_empty());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_config_aggregate_timeout_wins_over_default() {
    let ws = Workspace::new();
    ws.package(
        "alpha",
        json!({ "mode": "none", "entry": "./index.js", "watchOptions": { "aggregateTimeout": 20 } }),
    );

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(GlobpackOptions {
        aggregate_timeout: 60_000,
        ..options()
    })
    .with_cwd(&ws.root)
    .with_detector(detector.clone());

    globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);

    detector.emit(ws.path("packages/alpha/index.js"));
    next_call(&mut rx).await;

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_output_hidden_and_ignored_changes_are_dropped() {
    let ws = Workspace::new();
    ws.package(
        "alpha",
        json!({ "mode": "none", "entry": "./index.js", "watchOptions": { "ignored": "tmp/**" } }),
    );

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);

    detector.emit(ws.path("packages/alpha/dist/main.js"));
    detector.emit(ws.path("packages/alpha/.cache/x"));
    detector.emit(ws.path("packages/alpha/node_modules/dep/index.js"));
    detector.emit(ws.path("packages/alpha/tmp/scratch.js"));
    assert!(settle(&mut rx).await.is_empty());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_compile_errors_reach_callback_and_watcher_survives() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./missing.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    let watchers = globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    let initial = drain(&mut rx);
    assert_eq!(initial.len(), 1);
    assert!(initial[0].error.is_some());

    // Fix the entry; the next change compiles cleanly.
    fs::write(ws.path("packages/alpha/missing.js"), "fixed;\n").unwrap();
    detector.emit(ws.path("packages/alpha/missing.js"));
    let call = next_call(&mut rx).await;
    assert!(call.error.is_none());
    assert!(!watchers[0].is_closed());

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_fail_on_warnings_reach_callback_only() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "entry": "./index.js" }));

    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(GlobpackOptions {
        fail_on: true,
        ..options()
    })
    .with_cwd(&ws.root)
    .with_detector(ManualDetector::new());

    let watchers = globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    assert_eq!(watchers.len(), 1);
    let calls = drain(&mut rx);
    assert!(calls[0].error.as_deref().unwrap().contains("warning"));

    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_close_all_is_idempotent() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));
    ws.package("beta", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    let watchers = globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);

    globpack.close_all().await.unwrap();
    globpack.close_all().await.unwrap();

    assert!(watchers.iter().all(|watcher| watcher.is_closed()));
    assert_eq!(detector.subscriber_count(), 0);

    // Closing an individual handle again is a no-op too.
    watchers[0].close().await.unwrap();

    assert_eq!(detector.emit(ws.path("packages/alpha/index.js")), 0);
    assert!(settle(&mut rx).await.is_empty());
}

#[tokio::test]
async fn test_silent_watch_writes_nothing() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "entry": "./index.js" }));

    let detector = ManualDetector::new();
    let (sink, buffer) = capture();
    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(GlobpackOptions {
        progress: true,
        ..options()
    })
    .with_cwd(&ws.root)
    .with_detector(detector.clone())
    .with_output(sink);

    globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);
    detector.emit(ws.path("packages/alpha/index.js"));
    next_call(&mut rx).await;
    globpack.close_all().await.unwrap();

    assert!(buffer.lock().is_empty());
}

#[tokio::test]
async fn test_watch_announces_itself_unless_silent() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));

    let (sink, buffer) = capture();
    let globpack = Globpack::new(GlobpackOptions {
        silent: false,
        ..options()
    })
    .with_cwd(&ws.root)
    .with_detector(ManualDetector::new())
    .with_output(sink);

    globpack.watch(["packages/*/globpack.json"], None).await.unwrap();
    globpack.close_all().await.unwrap();

    let text = common::captured_text(&buffer);
    assert!(text.contains("watching 1 config(s)"));
}

/// Refuses the second subscription.
#[derive(Debug, Default, Clone)]
struct FlakyDetector {
    inner: ManualDetector,
    calls: Arc<AtomicUsize>,
}

impl ChangeDetector for FlakyDetector {
    fn watch(&self, root: &Path) -> globpack::Result<ChangeSubscription> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
            return Err(Error::WatchSetup {
                root: root.to_path_buf(),
                reason: "refused".to_string(),
            });
        }
        self.inner.watch(root)
    }
}

#[tokio::test]
async fn test_setup_failure_closes_started_watchers() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));
    ws.package("beta", json!({ "mode": "none", "entry": "./index.js" }));

    let detector = FlakyDetector::default();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(detector.clone());

    let err = globpack
        .watch(["packages/*/globpack.json"], None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::WatchSetup { .. }));
    assert_eq!(detector.inner.subscriber_count(), 0);
    globpack.close_all().await.unwrap();
}

#[tokio::test]
async fn test_native_file_changes_trigger_rebuilds() {
    let ws = Workspace::new();
    ws.package("alpha", json!({ "mode": "none", "entry": "./index.js" }));

    let (cb, mut rx) = recorder();
    let globpack = Globpack::new(options())
        .with_cwd(&ws.root)
        .with_detector(NotifyDetector);

    globpack.watch(["packages/*/globpack.json"], Some(cb)).await.unwrap();
    drain(&mut rx);

    // Give the native watcher a moment to settle after the initial build.
    sleep(Duration::from_millis(200)).await;
    drain(&mut rx);

    fs::write(ws.path("packages/alpha/index.js"), "export const changed = true;\n").unwrap();
    let call = timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no rebuild after a file change")
        .unwrap();
    assert!(call.error.is_none());

    let bundle = fs::read_to_string(ws.path("packages/alpha/dist/main.js")).unwrap();
    assert!(bundle.contains("changed"));

    globpack.close_all().await.unwrap();
}
