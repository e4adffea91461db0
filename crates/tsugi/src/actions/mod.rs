//! Built-in file actions.
//!
//! These actions read and write configuration-style documents and are
//! ordinary implementations of [`Action`](tsugi_core::Action); the engine
//! gives them no special treatment.
//!
//! | Tag | Configuration | Output |
//! |---|---|---|
//! | `load_file` | `{ "path": str, "raw": bool }` | the parsed document, or the text when `raw` |
//! | `write_file` | `{ "path": str, "object": {..} }` | nothing |
//! | `append_file` | `{ "path": str, "object": {..} }` | nothing |
//!
//! Supported formats are JSON, YAML (`.yaml` or `.yml`), TOML and XML, chosen
//! by file extension. See [`Format`] for how XML maps onto a document.

mod file;
mod format;

pub use file::{
    AppendFileAction, AppendFileConfig, LoadFileAction, LoadFileConfig, WriteFileAction,
    WriteFileConfig,
};
pub use format::{merge, Format};

use crate::registry::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tsugi_core::{Action, ActionFactory, PipelineError, Tag};

/// Errors raised by the built-in file actions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum FileActionError {
    /// The file extension does not name a supported format.
    #[error("Expected file extension: {expected}, but received: {received}")]
    InvalidExtension {
        /// The supported extensions.
        expected: &'static str,
        /// The extension that was found.
        received: String,
    },

    /// Reading or writing the file failed.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// JSON could not be parsed or produced.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML could not be parsed.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// The value cannot be written as TOML.
    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    /// YAML could not be parsed or produced.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// XML could not be parsed or produced.
    #[error("XML error: {0}")]
    Xml(String),

    /// An XML document must be an object with exactly one root key.
    #[error("XML document needs exactly one root element")]
    XmlRoot,
}

/// Returns the built-in tags with their factories, in a stable order.
pub fn builtins() -> Vec<(Tag, Arc<dyn ActionFactory>)> {
    vec![
        (Tag::new(LoadFileAction::TAG), LoadFileAction::factory()),
        (Tag::new(WriteFileAction::TAG), WriteFileAction::factory()),
        (Tag::new(AppendFileAction::TAG), AppendFileAction::factory()),
    ]
}

/// Registers every built-in action into `registry`.
///
/// # Errors
///
/// Returns [`PipelineError::DuplicateTag`] if one of the tags is taken.
/// Tags registered before the failure stay registered.
pub fn register_builtins(registry: &Registry) -> Result<(), PipelineError> {
    for (tag, factory) in builtins() {
        registry.register(tag, factory)?;
    }
    Ok(())
}

fn shared<A: Action + 'static>(action: A) -> Arc<dyn Action> {
    Arc::new(action)
}
