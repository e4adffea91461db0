//! FIFO execution queue.

use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tsugi_core::{Action, BoxError, ErrorHandler, Ledger, Output, PipelineError};

/// Configuration shared by queues, flows and pipelines.
///
/// # Examples
///
/// ```
/// use tsugi::QueueConfig;
///
/// let config = QueueConfig::default()
///     .capture_results(true)
///     .on_error(|error, action| eprintln!("'{}' failed: {}", action.tag(), error));
///
/// assert!(config.captures_results());
/// assert!(config.has_error_handler());
/// ```
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Record every action output in the returned [`Ledger`]. Default: off.
    pub capture_results: bool,
    /// Receives the failure that stopped a run instead of the caller.
    #[serde(skip)]
    pub error_handler: Option<Arc<dyn ErrorHandler>>,
}

impl fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConfig")
            .field("capture_results", &self.capture_results)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl QueueConfig {
    /// Sets whether action outputs are recorded.
    pub fn capture_results(mut self, capture: bool) -> Self {
        self.capture_results = capture;
        self
    }

    /// Sets the error handler.
    pub fn with_error_handler(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    /// Sets a closure as the error handler.
    pub fn on_error<F>(self, handler: F) -> Self
    where
        F: Fn(BoxError, Arc<dyn Action>) + Send + Sync + 'static,
    {
        self.with_error_handler(Arc::new(handler))
    }

    /// Returns `true` if action outputs are recorded.
    pub fn captures_results(&self) -> bool {
        self.capture_results
    }

    /// Returns `true` if an error handler is configured.
    pub fn has_error_handler(&self) -> bool {
        self.error_handler.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
}

struct QueueInner {
    actions: VecDeque<Arc<dyn Action>>,
    state: RunState,
}

/// Holds actions in FIFO order and runs them one at a time.
///
/// Each action receives the output of the one before it. While a run is in
/// progress the contents are frozen: [`enqueue`](Self::enqueue) refuses new
/// actions and [`clear`](Self::clear) fails. Every action is removed from the
/// queue before it executes, so a failed run leaves exactly the actions that
/// never ran.
///
/// All methods take `&self`. The internal lock is never held while an action
/// executes, so the queue can be observed from another future while a run is
/// suspended.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tsugi::{Action, ActionQueue, BoxError, Output, QueueConfig, Tag};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct AddOne;
///
/// #[async_trait]
/// impl Action for AddOne {
///     fn tag(&self) -> Tag {
///         Tag::new("add_one")
///     }
///
///     async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
///         let n = previous.and_then(|o| o.into_value()).and_then(|v| v.as_i64()).unwrap_or(0);
///         Ok(Output::value(n + 1))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tsugi::PipelineError> {
/// let queue = ActionQueue::new(QueueConfig::default().capture_results(true));
/// let action: Arc<dyn Action> = Arc::new(AddOne);
/// queue.enqueue(action.clone());
/// queue.enqueue(action);
///
/// let ledger = queue.run().await?;
/// assert_eq!(ledger.last().map(|e| e.output.clone()), Some(Output::value(2)));
/// assert!(queue.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct ActionQueue {
    inner: Mutex<QueueInner>,
    config: QueueConfig,
}

impl fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ActionQueue")
            .field(
                "actions",
                &inner.actions.iter().map(|a| a.tag()).collect::<Vec<_>>(),
            )
            .field("state", &inner.state)
            .field("config", &self.config)
            .finish()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}

/// Puts the queue back to idle when a run ends, however it ends.
struct RunGuard<'a> {
    inner: &'a Mutex<QueueInner>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.inner.lock().state = RunState::Idle;
    }
}

impl ActionQueue {
    /// Creates an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                actions: VecDeque::new(),
                state: RunState::Idle,
            }),
            config,
        }
    }

    /// Returns the configuration the queue was built with.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Appends an action.
    ///
    /// Returns `false`, leaving the queue unchanged, if a run is in progress.
    pub fn enqueue(&self, action: Arc<dyn Action>) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == RunState::Running {
            warn!("Refused to enqueue '{}' while running", action.tag());
            return false;
        }
        debug!("Enqueued action '{}'", action.tag());
        inner.actions.push_back(action);
        true
    }

    /// Removes every queued action.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::AlreadyRunning`] if a run is in progress.
    pub fn clear(&self) -> Result<(), PipelineError> {
        let mut inner = self.inner.lock();
        if inner.state == RunState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        inner.actions.clear();
        Ok(())
    }

    /// Returns the number of queued actions.
    pub fn len(&self) -> usize {
        self.inner.lock().actions.len()
    }

    /// Returns `true` if no action is queued.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().actions.is_empty()
    }

    /// Returns `true` while a run is in progress.
    pub fn is_processing(&self) -> bool {
        self.inner.lock().state == RunState::Running
    }

    /// Runs every queued action in order.
    ///
    /// Returns the ledger of recorded outputs; it stays empty unless the
    /// queue captures results. An action that returns [`Output::Nothing`] is
    /// recorded as such.
    ///
    /// When an action fails the run stops at once and the queue goes back to
    /// idle with the remaining actions still queued. If an error handler is
    /// configured it is called once with the error and the failing action,
    /// and the ledger recorded so far is returned.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::AlreadyRunning`] if a run is already in progress
    /// - [`PipelineError::Action`] wrapping the action's error, when no error
    ///   handler is configured
    pub async fn run(&self) -> Result<Ledger, PipelineError> {
        let guard = self.begin()?;
        let mut ledger = Ledger::new();
        let mut carried: Option<Output> = None;
        let mut executed = 0usize;

        while let Some(action) = self.pop() {
            let tag = action.tag();
            match self.execute(&action, carried.take(), &mut ledger).await {
                Ok(output) => {
                    info!("Action '{}' completed successfully", tag);
                    executed += 1;
                    carried = Some(output);
                }
                Err(error) => {
                    drop(guard);
                    warn!(
                        "Action '{}' failed: {} ({} action(s) left in queue)",
                        tag,
                        error,
                        self.len()
                    );
                    return match &self.config.error_handler {
                        Some(handler) => {
                            handler.handle(error, action);
                            Ok(ledger)
                        }
                        None => Err(PipelineError::Action { tag, source: error }),
                    };
                }
            }
        }

        drop(guard);
        info!("Run finished after {} action(s)", executed);
        Ok(ledger)
    }

    fn begin(&self) -> Result<RunGuard<'_>, PipelineError> {
        let mut inner = self.inner.lock();
        if inner.state == RunState::Running {
            return Err(PipelineError::AlreadyRunning);
        }
        inner.state = RunState::Running;
        Ok(RunGuard { inner: &self.inner })
    }

    fn pop(&self) -> Option<Arc<dyn Action>> {
        self.inner.lock().actions.pop_front()
    }

    async fn execute(
        &self,
        action: &Arc<dyn Action>,
        previous: Option<Output>,
        ledger: &mut Ledger,
    ) -> Result<Output, BoxError> {
        let output = action.execute(previous).await?;
        if self.config.capture_results {
            ledger.append(action.tag(), output.clone())?;
        }
        Ok(output)
    }
}
