//! Facade combining registration bookkeeping with flow creation.

use crate::actions;
use crate::flow::Flow;
use crate::queue::QueueConfig;
use crate::registry::Registry;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tsugi_core::{ActionFactory, PipelineError, Tag};

/// Entry point for building pipelines.
///
/// A `Pipeline` registers actions into a shared [`Registry`] and keeps its
/// own record of what it registered, which [`list_registered`] exposes. Each
/// call to [`begin_with`] opens a fresh [`Flow`] configured with the
/// pipeline's [`QueueConfig`].
///
/// [`list_registered`]: Self::list_registered
/// [`begin_with`]: Self::begin_with
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use tsugi::{Pipeline, QueueConfig, Registry};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let dir = std::env::temp_dir().join("tsugi-doc-pipeline");
/// std::fs::create_dir_all(&dir)?;
/// let path = dir.join("settings.json");
///
/// let pipeline = Pipeline::with_builtins(
///     Registry::shared(),
///     QueueConfig::default().capture_results(true),
/// )?;
///
/// let ledger = pipeline
///     .begin_with("write_file", json!({ "path": path, "object": { "debug": true } }))?
///     .next("load_file", json!({ "path": path }))?
///     .run()
///     .await?;
///
/// assert_eq!(
///     ledger.values_for("load_file")[0].output.as_value(),
///     Some(&json!({ "debug": true }))
/// );
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    registry: Arc<Registry>,
    registered: IndexMap<Tag, Arc<dyn ActionFactory>>,
    config: QueueConfig,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("registered", &self.registered.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline over `registry`. Nothing is registered yet.
    pub fn new(registry: Arc<Registry>, config: QueueConfig) -> Self {
        Self {
            registry,
            registered: IndexMap::new(),
            config,
        }
    }

    /// Creates a pipeline and registers the built-in file actions.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::DuplicateTag`] if `registry` already holds
    /// one of the built-in tags. Built-ins registered before the failing one
    /// stay in the shared registry.
    pub fn with_builtins(
        registry: Arc<Registry>,
        config: QueueConfig,
    ) -> Result<Self, PipelineError> {
        let mut pipeline = Self::new(registry, config);
        for (tag, factory) in actions::builtins() {
            pipeline.register_action(tag, factory)?;
        }
        Ok(pipeline)
    }

    /// Registers `factory` under `tag`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::DuplicateTag`] if this pipeline or the registry
    ///   already has `tag`
    /// - [`PipelineError::InvalidArgument`] if `tag` is empty
    pub fn register_action(
        &mut self,
        tag: impl Into<Tag>,
        factory: Arc<dyn ActionFactory>,
    ) -> Result<(), PipelineError> {
        let tag = tag.into();
        if self.registered.contains_key(&tag) {
            return Err(PipelineError::DuplicateTag(tag));
        }
        self.registry.register(tag.clone(), Arc::clone(&factory))?;
        self.registered.insert(tag, factory);
        Ok(())
    }

    /// Unregisters `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTag`] if the registry does not have `tag`.
    pub fn unregister_action(&mut self, tag: &str) -> Result<(), PipelineError> {
        self.registry.unregister(tag)?;
        self.registered.shift_remove(tag);
        Ok(())
    }

    /// Replaces the factory registered under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTag`] if the registry does not have `tag`.
    pub fn update_action(
        &mut self,
        tag: impl Into<Tag>,
        factory: Arc<dyn ActionFactory>,
    ) -> Result<(), PipelineError> {
        let tag = tag.into();
        self.registry.update(tag.clone(), Arc::clone(&factory))?;
        self.registered.insert(tag, factory);
        Ok(())
    }

    /// Returns a copy of the registrations made through this pipeline.
    pub fn list_registered(&self) -> IndexMap<Tag, Arc<dyn ActionFactory>> {
        self.registered.clone()
    }

    /// Returns the shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Returns the configuration every new flow receives.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Opens a new flow whose first action is `tag` built from `config`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownTag`] if `tag` was never registered
    /// - [`PipelineError::Configuration`] if the factory rejects `config`
    pub fn begin_with(&self, tag: impl Into<Tag>, config: Value) -> Result<Flow, PipelineError> {
        Flow::new(Arc::clone(&self.registry), self.config.clone()).start(tag, config)
    }
}
