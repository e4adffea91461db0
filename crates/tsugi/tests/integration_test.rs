use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};
use tsugi::prelude::*;

#[derive(Debug, Deserialize)]
struct Constant {
    value: Value,
}

#[async_trait]
impl Action for Constant {
    fn tag(&self) -> Tag {
        Tag::new("constant")
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        Ok(Output::Value(self.value.clone()))
    }
}

#[derive(Debug, Deserialize)]
struct Increment {}

#[async_trait]
impl Action for Increment {
    fn tag(&self) -> Tag {
        Tag::new("increment")
    }

    async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
        let n = previous
            .and_then(Output::into_value)
            .and_then(|v| v.as_i64())
            .ok_or("increment needs a number")?;
        tokio::task::yield_now().await;
        Ok(Output::value(n + 1))
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("quota exceeded after {0} calls")]
struct QuotaExceeded(u32);

#[derive(Debug)]
struct Exhausted;

#[async_trait]
impl Action for Exhausted {
    fn tag(&self) -> Tag {
        Tag::new("exhausted")
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        Err(Box::new(QuotaExceeded(3)))
    }
}

#[derive(Debug, Default)]
struct Counter {
    calls: AtomicU64,
}

#[async_trait]
impl Action for Counter {
    fn tag(&self) -> Tag {
        Tag::new("counter")
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Output::value(n))
    }
}

#[derive(Debug)]
struct Gate {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

#[async_trait]
impl Action for Gate {
    fn tag(&self) -> Tag {
        Tag::new("gate")
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(Output::value("released"))
    }
}

fn registry() -> Arc<Registry> {
    let registry = Registry::shared();
    registry
        .register("constant", from_config(|c: Constant| c))
        .expect("fresh tag");
    registry
        .register("increment", from_config(|i: Increment| i))
        .expect("fresh tag");
    registry
        .register(
            "exhausted",
            factory(|_| Ok(Arc::new(Exhausted) as Arc<dyn Action>)),
        )
        .expect("fresh tag");
    registry
}

fn capturing() -> QueueConfig {
    QueueConfig::default().capture_results(true)
}

#[tokio::test]
async fn test_chain_of_three() {
    let ledger = Flow::new(registry(), capturing())
        .start("constant", json!({ "value": 5 }))
        .expect("registered")
        .next("increment", Value::Null)
        .expect("registered")
        .next("increment", Value::Null)
        .expect("registered")
        .run()
        .await
        .expect("chain succeeds");

    assert_eq!(
        ledger.snapshot(),
        vec![
            LedgerEntry::new("constant", Output::value(5)),
            LedgerEntry::new("increment", Output::value(6)),
            LedgerEntry::new("increment", Output::value(7)),
        ]
    );
    assert_eq!(ledger.values_for("increment").len(), 2);
}

#[tokio::test]
async fn test_capture_disabled() {
    let ledger = Flow::new(registry(), QueueConfig::default())
        .start("constant", json!({ "value": 5 }))
        .expect("registered")
        .next("increment", Value::Null)
        .expect("registered")
        .run()
        .await
        .expect("chain succeeds");

    assert!(ledger.is_empty());
    assert!(ledger.snapshot().is_empty());
}

#[tokio::test]
async fn test_failure_propagates_exact_error() {
    let flow = Flow::new(registry(), capturing())
        .start("constant", json!({ "value": 1 }))
        .expect("registered")
        .next("exhausted", Value::Null)
        .expect("registered")
        .next("increment", Value::Null)
        .expect("registered")
        .next("increment", Value::Null)
        .expect("registered");

    let error = assert_err!(flow.run().await);
    assert!(matches!(&error, PipelineError::Action { tag, .. } if tag == "exhausted"));
    assert_eq!(
        error
            .action_error()
            .and_then(|e| e.downcast_ref::<QuotaExceeded>()),
        Some(&QuotaExceeded(3))
    );
    assert_eq!(flow.queue().len(), 2);
    assert!(!flow.queue().is_processing());
}

#[tokio::test]
async fn test_failure_with_handler_is_delegated_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let config = capturing().on_error(move |error, action| {
        assert_eq!(action.tag(), "exhausted");
        assert!(error.downcast_ref::<QuotaExceeded>().is_some());
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let flow = Flow::new(registry(), config)
        .start("exhausted", Value::Null)
        .expect("registered")
        .next("constant", json!({ "value": 1 }))
        .expect("registered");

    let ledger = assert_ok!(flow.run().await);
    assert!(ledger.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(flow.queue().len(), 1);
}

#[tokio::test]
async fn test_same_instance_runs_fresh_each_time() {
    let counter: Arc<dyn Action> = Arc::new(Counter::default());
    let flow = Flow::new(registry(), capturing())
        .then(counter.clone())
        .then(counter.clone())
        .then(counter);

    let ledger = flow.run().await.expect("run succeeds");
    assert_eq!(
        ledger.values_for("counter"),
        vec![
            LedgerEntry::new("counter", Output::value(1)),
            LedgerEntry::new("counter", Output::value(2)),
            LedgerEntry::new("counter", Output::value(3)),
        ]
    );
}

#[tokio::test]
async fn test_queue_is_frozen_while_running() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let queue = ActionQueue::new(capturing());
    queue.enqueue(Arc::new(Gate {
        started: started.clone(),
        release: release.clone(),
    }));
    queue.enqueue(Arc::new(Counter::default()));

    let probe = async {
        started.notified().await;
        assert!(queue.is_processing());
        assert_eq!(queue.len(), 1);

        assert!(!queue.enqueue(Arc::new(Counter::default())));
        assert_eq!(queue.len(), 1);
        assert!(matches!(queue.clear(), Err(PipelineError::AlreadyRunning)));
        assert!(matches!(queue.run().await, Err(PipelineError::AlreadyRunning)));
        assert_eq!(queue.len(), 1);

        release.notify_one();
    };

    let (result, ()) = tokio::join!(queue.run(), probe);
    let ledger = result.expect("run succeeds");
    assert_eq!(
        ledger.snapshot(),
        vec![
            LedgerEntry::new("gate", Output::value("released")),
            LedgerEntry::new("counter", Output::value(1)),
        ]
    );
    assert!(!queue.is_processing());
    assert!(queue.enqueue(Arc::new(Counter::default())));
    assert_ok!(queue.clear());
}

#[tokio::test]
async fn test_pipeline_file_round_trip() {
    let dir = tempfile::tempdir().expect("temp dir");
    let json_path = dir.path().join("app.json");
    let toml_path = dir.path().join("app.toml");

    let mut pipeline = Pipeline::with_builtins(Registry::shared(), capturing())
        .expect("empty registry");
    pipeline
        .register_action("constant", from_config(|c: Constant| c))
        .expect("fresh tag");

    let ledger = pipeline
        .begin_with("constant", json!({ "value": { "server": { "port": 8080 } } }))
        .expect("registered")
        .next("write_file", json!({ "path": json_path, "object": { "name": "app" } }))
        .expect("registered")
        .next("load_file", json!({ "path": json_path }))
        .expect("registered")
        .next("write_file", json!({ "path": toml_path }))
        .expect("registered")
        .next("append_file", json!({ "path": toml_path, "object": { "server": { "tls": true } } }))
        .expect("registered")
        .next("load_file", json!({ "path": toml_path }))
        .expect("registered")
        .run()
        .await
        .expect("pipeline succeeds");

    let writes = ledger.values_for("write_file");
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|e| e.output.is_nothing()));

    let loads = ledger.values_for("load_file");
    assert_eq!(
        loads[0].output,
        Output::value(json!({ "name": "app", "server": { "port": 8080 } }))
    );
    assert_eq!(
        loads[1].output,
        Output::value(json!({ "name": "app", "server": { "port": 8080, "tls": true } }))
    );
}

#[tokio::test]
async fn test_unknown_tag_from_facade() {
    let pipeline = Pipeline::new(registry(), QueueConfig::default());
    let error = assert_err!(pipeline.begin_with("select", Value::Null));
    assert!(matches!(error, PipelineError::UnknownTag(tag) if tag == "select"));
}
