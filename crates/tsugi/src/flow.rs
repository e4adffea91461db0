//! Fluent composition of a single run.

use crate::queue::{ActionQueue, QueueConfig};
use crate::registry::Registry;
use serde_json::Value;
use std::sync::Arc;
use tsugi_core::{Action, Ledger, PipelineError, Tag};

/// Builds a run by naming registered tags, then executes it.
///
/// Each call to [`start`](Self::start) or [`next`](Self::next) resolves the
/// tag, builds the action with the given configuration and appends it to the
/// flow's own [`ActionQueue`]. The two methods behave identically; pick the
/// one that reads best at the call site.
///
/// A flow is meant to be used for one run. Once a run drained its queue the
/// flow can be extended and run again.
///
/// # Examples
///
/// ```
/// use serde::Deserialize;
/// use serde_json::json;
/// use tsugi::{from_config, Action, BoxError, Flow, Output, QueueConfig, Registry, Tag};
/// use async_trait::async_trait;
///
/// #[derive(Debug, Deserialize)]
/// struct Add {
///     n: i64,
/// }
///
/// #[async_trait]
/// impl Action for Add {
///     fn tag(&self) -> Tag {
///         Tag::new("add")
///     }
///
///     async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
///         let base = previous.and_then(|o| o.into_value()).and_then(|v| v.as_i64()).unwrap_or(0);
///         Ok(Output::value(base + self.n))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tsugi::PipelineError> {
/// let registry = Registry::shared();
/// registry.register("add", from_config(|add: Add| add))?;
///
/// let ledger = Flow::new(registry, QueueConfig::default().capture_results(true))
///     .start("add", json!({ "n": 2 }))?
///     .next("add", json!({ "n": 3 }))?
///     .run()
///     .await?;
///
/// assert_eq!(ledger.last().map(|e| e.output.clone()), Some(Output::value(5)));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Flow {
    registry: Arc<Registry>,
    queue: ActionQueue,
}

impl Flow {
    /// Creates an empty flow resolving tags through `registry`.
    pub fn new(registry: Arc<Registry>, config: QueueConfig) -> Self {
        Self {
            registry,
            queue: ActionQueue::new(config),
        }
    }

    /// Appends the first action of the flow.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownTag`] if `tag` was never registered
    /// - [`PipelineError::Configuration`] if the factory rejects `config`
    pub fn start(self, tag: impl Into<Tag>, config: Value) -> Result<Self, PipelineError> {
        self.next(tag, config)
    }

    /// Appends another action to the flow.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownTag`] if `tag` was never registered
    /// - [`PipelineError::Configuration`] if the factory rejects `config`
    pub fn next(self, tag: impl Into<Tag>, config: Value) -> Result<Self, PipelineError> {
        let tag = tag.into();
        let action = self.registry.instantiate(tag.as_str(), config)?;
        Ok(self.then(action))
    }

    /// Appends an action that was built elsewhere.
    ///
    /// The same instance may be appended several times; it runs once per
    /// appearance and keeps its state between runs.
    pub fn then(self, action: Arc<dyn Action>) -> Self {
        // `run` only borrows the flow, so a flow held by value is idle.
        self.queue.enqueue(action);
        self
    }

    /// Returns the queue backing this flow.
    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    /// Returns the registry this flow resolves tags through.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Runs every appended action in order.
    ///
    /// # Errors
    ///
    /// See [`ActionQueue::run`].
    pub async fn run(&self) -> Result<Ledger, PipelineError> {
        self.queue.run().await
    }
}
