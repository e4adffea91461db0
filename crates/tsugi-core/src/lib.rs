//! Core traits and types for the tsugi action pipeline.
//!
//! This crate provides the contract shared by the engine and by crates that
//! only implement actions. It has no runtime dependencies.
//!
//! # Core Types
//!
//! - [`Action`] - A unit of work placed in a pipeline
//! - [`Output`] - What an action produced, or [`Output::Nothing`]
//! - [`ActionFactory`] - Builds actions from a configuration payload
//! - [`ErrorHandler`] - Receives the failure that stopped a run
//! - [`Ledger`] - Ordered record of the outputs of a run
//! - [`PipelineError`] - Error types for the pipeline

mod action;
mod error;
mod ledger;
mod tag;

pub use action::{factory, from_config, Action, ActionFactory, BoxError, ErrorHandler, Output};
pub use error::PipelineError;
pub use ledger::{Ledger, LedgerEntry};
pub use tag::Tag;
