//! A small action pipeline engine for Rust.
//!
//! Register kinds of actions under string tags, compose a run by naming
//! those tags, and execute it: actions run one at a time in FIFO order,
//! each one receiving the output of the previous one.
//!
//! # Example
//!
//! ```rust
//! use tsugi::prelude::*;
//! use async_trait::async_trait;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct Seed;
//!
//! #[async_trait]
//! impl Action for Seed {
//!     fn tag(&self) -> Tag {
//!         Tag::new("seed")
//!     }
//!
//!     async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
//!         Ok(Output::value(5))
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct Double;
//!
//! #[async_trait]
//! impl Action for Double {
//!     fn tag(&self) -> Tag {
//!         Tag::new("double")
//!     }
//!
//!     async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
//!         let n = previous
//!             .and_then(|o| o.into_value())
//!             .and_then(|v| v.as_i64())
//!             .ok_or("double needs a number")?;
//!         Ok(Output::value(n * 2))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), PipelineError> {
//!     let mut pipeline = Pipeline::new(
//!         Registry::shared(),
//!         QueueConfig::default().capture_results(true),
//!     );
//!     pipeline.register_action("seed", factory(|_| Ok(Arc::new(Seed) as Arc<dyn Action>)))?;
//!     pipeline.register_action("double", factory(|_| Ok(Arc::new(Double) as Arc<dyn Action>)))?;
//!
//!     let ledger = pipeline
//!         .begin_with("seed", json!({}))?
//!         .next("double", json!({}))?
//!         .run()
//!         .await?;
//!
//!     assert_eq!(ledger.values_for("double")[0].output, Output::value(10));
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Without an error handler a failing action makes `run` return
//! [`PipelineError::Action`]. With one, the handler receives the error and the
//! action, and `run` returns the ledger recorded so far. Either way the run
//! stops at the failure and the actions after it stay queued.

pub mod actions;
mod flow;
mod pipeline;
mod queue;
mod registry;

// Re-export core types
pub use tsugi_core::*;

pub use flow::Flow;
pub use pipeline::Pipeline;
pub use queue::{ActionQueue, QueueConfig};
pub use registry::Registry;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        factory, from_config, Action, ActionFactory, ActionQueue, BoxError, ErrorHandler, Flow,
        Ledger, LedgerEntry, Output, Pipeline, PipelineError, QueueConfig, Registry, Tag,
    };
}
