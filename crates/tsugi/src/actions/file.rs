//! The `load_file`, `write_file` and `append_file` actions.
//!
//! Each action picks its [`Format`] from the path extension when it is
//! built, so an unsupported extension is reported at configuration time.
//! `load_file` with `raw` set skips parsing and accepts any extension.

use super::format::{merge, Format};
use super::{shared, FileActionError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tsugi_core::{factory, ActionFactory, BoxError, Output, Tag};

async fn read(path: &Path) -> Result<String, FileActionError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FileActionError::Io {
            path: path.to_path_buf(),
            source,
        })
}

async fn write(path: &Path, contents: String) -> Result<(), FileActionError> {
    tokio::fs::write(path, contents)
        .await
        .map_err(|source| FileActionError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Configuration of [`LoadFileAction`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoadFileConfig {
    /// File to read.
    pub path: PathBuf,
    /// Return the text as-is instead of parsing it. Default: `false`.
    #[serde(default)]
    pub raw: bool,
}

/// Reads a file and outputs its parsed content.
#[derive(Debug)]
pub struct LoadFileAction {
    path: PathBuf,
    format: Option<Format>,
}

impl LoadFileAction {
    /// Tag under which the action is registered.
    pub const TAG: &'static str = "load_file";

    /// Creates the action.
    ///
    /// # Errors
    ///
    /// Returns [`FileActionError::InvalidExtension`] if the content must be
    /// parsed and the extension is not supported.
    pub fn new(config: LoadFileConfig) -> Result<Self, FileActionError> {
        let format = if config.raw {
            None
        } else {
            Some(Format::from_path(&config.path)?)
        };
        Ok(Self {
            path: config.path,
            format,
        })
    }

    /// Factory building the action from a [`LoadFileConfig`] payload.
    pub fn factory() -> Arc<dyn ActionFactory> {
        factory(|config| {
            let config: LoadFileConfig = serde_json::from_value(config)?;
            Ok(shared(Self::new(config)?))
        })
    }
}

#[async_trait]
impl tsugi_core::Action for LoadFileAction {
    fn tag(&self) -> Tag {
        Tag::new(Self::TAG)
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        let content = read(&self.path).await?;
        debug!("Loaded {} bytes from {:?}", content.len(), self.path);
        let value = match self.format {
            Some(format) => format.parse(&content)?,
            None => Value::String(content),
        };
        Ok(Output::Value(value))
    }
}

fn empty_object() -> Map<String, Value> {
    Map::new()
}

/// Configuration of [`WriteFileAction`].
#[derive(Debug, Clone, Deserialize)]
pub struct WriteFileConfig {
    /// File to create or overwrite.
    pub path: PathBuf,
    /// Base document. Default: `{}`.
    #[serde(default = "empty_object")]
    pub object: Map<String, Value>,
}

/// Writes a document, merging the previous output over a base object.
///
/// When the previous action produced an object it is deep-merged over the
/// configured `object`, its keys winning. Any other input is ignored.
#[derive(Debug)]
pub struct WriteFileAction {
    path: PathBuf,
    format: Format,
    object: Map<String, Value>,
}

impl WriteFileAction {
    /// Tag under which the action is registered.
    pub const TAG: &'static str = "write_file";

    /// Creates the action.
    ///
    /// # Errors
    ///
    /// Returns [`FileActionError::InvalidExtension`] if the extension is not
    /// supported.
    pub fn new(config: WriteFileConfig) -> Result<Self, FileActionError> {
        Ok(Self {
            format: Format::from_path(&config.path)?,
            path: config.path,
            object: config.object,
        })
    }

    /// Factory building the action from a [`WriteFileConfig`] payload.
    pub fn factory() -> Arc<dyn ActionFactory> {
        factory(|config| {
            let config: WriteFileConfig = serde_json::from_value(config)?;
            Ok(shared(Self::new(config)?))
        })
    }
}

#[async_trait]
impl tsugi_core::Action for WriteFileAction {
    fn tag(&self) -> Tag {
        Tag::new(Self::TAG)
    }

    async fn execute(&self, previous: Option<Output>) -> Result<Output, BoxError> {
        let mut document = Value::Object(self.object.clone());
        if let Some(incoming @ Value::Object(_)) = previous.and_then(Output::into_value) {
            merge(&mut document, incoming);
        }
        let text = self.format.serialize(&document)?;
        write(&self.path, text).await?;
        debug!("Wrote {:?}", self.path);
        Ok(Output::Nothing)
    }
}

/// Configuration of [`AppendFileAction`].
#[derive(Debug, Clone, Deserialize)]
pub struct AppendFileConfig {
    /// Existing file to update.
    pub path: PathBuf,
    /// Keys to merge into the file.
    pub object: Map<String, Value>,
}

/// Deep-merges an object into an existing document and writes it back.
#[derive(Debug)]
pub struct AppendFileAction {
    path: PathBuf,
    format: Format,
    object: Map<String, Value>,
}

impl AppendFileAction {
    /// Tag under which the action is registered.
    pub const TAG: &'static str = "append_file";

    /// Creates the action.
    ///
    /// # Errors
    ///
    /// Returns [`FileActionError::InvalidExtension`] if the extension is not
    /// supported.
    pub fn new(config: AppendFileConfig) -> Result<Self, FileActionError> {
        Ok(Self {
            format: Format::from_path(&config.path)?,
            path: config.path,
            object: config.object,
        })
    }

    /// Factory building the action from an [`AppendFileConfig`] payload.
    pub fn factory() -> Arc<dyn ActionFactory> {
        factory(|config| {
            let config: AppendFileConfig = serde_json::from_value(config)?;
            Ok(shared(Self::new(config)?))
        })
    }
}

#[async_trait]
impl tsugi_core::Action for AppendFileAction {
    fn tag(&self) -> Tag {
        Tag::new(Self::TAG)
    }

    async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
        let mut document = self.format.parse(&read(&self.path).await?)?;
        merge(&mut document, Value::Object(self.object.clone()));
        let text = self.format.serialize(&document)?;
        write(&self.path, text).await?;
        debug!("Appended {} key(s) to {:?}", self.object.len(), self.path);
        Ok(Output::Nothing)
    }
}
