//! The action contract and its factories.

use crate::tag::Tag;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;

/// Error raised by an action. Opaque to the pipeline.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The value an action produces.
///
/// `Nothing` marks an action that completed without a result. It is kept
/// distinct from `Value(Value::Null)`, which is a real `null` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Output {
    /// A produced value.
    Value(Value),
    /// The action produced no result.
    Nothing,
}

impl Output {
    /// Wraps anything convertible into a JSON value.
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Returns the produced value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Nothing => None,
        }
    }

    /// Consumes the output and returns the produced value, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Nothing => None,
        }
    }

    /// Returns `true` for [`Output::Nothing`].
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

impl From<Value> for Output {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for Output {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Nothing, Self::Value)
    }
}

/// A unit of work that can be placed in a pipeline.
///
/// `execute` receives the output of the previous action, or `None` when the
/// action is the first of a run. An action that finishes without awaiting
/// anything is simply a future that is ready on its first poll, so
/// synchronous and deferred actions are driven the same way.
///
/// Actions are shared as `Arc<dyn Action>` and are never cloned by the
/// pipeline. Enqueueing the same instance several times runs it several
/// times; any state it keeps must live behind interior mutability.
///
/// # Examples
///
/// ```
/// use tsugi_core::{Action, BoxError, Output, Tag};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct Increment;
///
/// #[async_trait]
/// impl Action for Increment {
///     fn tag(&self) -> Tag {
///         Tag::new("increment")
///     }
///
///     async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
///         let n = previous
///             .and_then(|o| o.into_value())
///             .and_then(|v| v.as_i64())
///             .unwrap_or(0);
///         Ok(Output::value(n + 1))
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Send + Sync + Debug {
    /// Returns the action tag. Must not be empty.
    fn tag(&self) -> Tag;

    /// Executes the action.
    ///
    /// # Errors
    ///
    /// Any error is intercepted by the queue running the action.
    async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError>;
}

/// Builds actions of one kind from a configuration payload.
pub trait ActionFactory: Send + Sync {
    /// Creates a new action from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is not acceptable.
    fn create(&self, config: Value) -> Result<Arc<dyn Action>, BoxError>;
}

impl<F> ActionFactory for F
where
    F: Fn(Value) -> Result<Arc<dyn Action>, BoxError> + Send + Sync,
{
    fn create(&self, config: Value) -> Result<Arc<dyn Action>, BoxError> {
        self(config)
    }
}

/// Wraps a closure into a shareable factory.
///
/// ```
/// use std::sync::Arc;
/// use tsugi_core::{factory, Action, ActionFactory};
/// # use tsugi_core::{BoxError, Output, Tag};
/// # use async_trait::async_trait;
/// # #[derive(Debug)]
/// # struct Noop;
/// # #[async_trait]
/// # impl Action for Noop {
/// #     fn tag(&self) -> Tag { Tag::new("noop") }
/// #     async fn execute(&self, _: Option<Output>) -> Result<Output, BoxError> {
/// #         Ok(Output::Nothing)
/// #     }
/// # }
///
/// let f = factory(|_config| Ok(Arc::new(Noop) as Arc<dyn Action>));
/// let action = f.create(serde_json::json!({})).expect("noop accepts any config");
/// assert_eq!(action.tag(), "noop");
/// ```
pub fn factory<F>(f: F) -> Arc<dyn ActionFactory>
where
    F: Fn(Value) -> Result<Arc<dyn Action>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Builds a factory that deserializes its configuration into `C` first.
///
/// A `null` configuration is treated as an empty object, so configuration
/// types whose fields all have defaults accept it.
pub fn from_config<C, A, F>(build: F) -> Arc<dyn ActionFactory>
where
    C: DeserializeOwned + 'static,
    A: Action + 'static,
    F: Fn(C) -> A + Send + Sync + 'static,
{
    factory(move |config| {
        let config = match config {
            Value::Null => Value::Object(serde_json::Map::new()),
            other => other,
        };
        let config: C = serde_json::from_value(config)?;
        Ok(Arc::new(build(config)) as Arc<dyn Action>)
    })
}

/// Receives the error of a failed action and the action itself.
///
/// The run that failed has already stopped when the handler is invoked.
pub trait ErrorHandler: Send + Sync {
    /// Handles a failure.
    fn handle(&self, error: BoxError, action: Arc<dyn Action>);
}

impl<F> ErrorHandler for F
where
    F: Fn(BoxError, Arc<dyn Action>) + Send + Sync,
{
    fn handle(&self, error: BoxError, action: Arc<dyn Action>) {
        self(error, action)
    }
}
