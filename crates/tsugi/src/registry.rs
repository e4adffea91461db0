//! Tag to factory registry.

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use tsugi_core::{Action, ActionFactory, PipelineError, Tag};

/// Maps tags to the factories that build their actions.
///
/// A registry is an ordinary value: share it with `Arc<Registry>` and every
/// holder observes the same entries. Entries are listed in insertion order.
/// There is no isolation between holders, so register from one owner
/// (usually at startup).
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tsugi::{factory, Action, Registry};
/// # use tsugi::{BoxError, Output, Tag};
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
/// let registry = Registry::new();
/// registry.register("noop", factory(|_| Ok(Arc::new(Noop) as Arc<dyn Action>)))?;
///
/// assert!(registry.contains("noop"));
/// assert!(registry.register("noop", factory(|_| Ok(Arc::new(Noop) as Arc<dyn Action>))).is_err());
/// # Ok::<(), tsugi::PipelineError>(())
/// ```
#[derive(Default)]
pub struct Registry {
    factories: RwLock<IndexMap<Tag, Arc<dyn ActionFactory>>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.factories.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry ready to be shared.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Registers `factory` under `tag`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidArgument`] if `tag` is empty
    /// - [`PipelineError::DuplicateTag`] if `tag` already has a factory; the
    ///   existing mapping is left untouched
    pub fn register(
        &self,
        tag: impl Into<Tag>,
        factory: Arc<dyn ActionFactory>,
    ) -> Result<(), PipelineError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(PipelineError::InvalidArgument(
                "tag must not be empty".to_string(),
            ));
        }

        let mut factories = self.factories.write();
        if factories.contains_key(&tag) {
            return Err(PipelineError::DuplicateTag(tag));
        }
        debug!("Registered action '{}'", tag);
        factories.insert(tag, factory);
        Ok(())
    }

    /// Removes the factory registered under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTag`] if nothing is registered under `tag`.
    pub fn unregister(&self, tag: &str) -> Result<(), PipelineError> {
        match self.factories.write().shift_remove(tag) {
            Some(_) => {
                debug!("Unregistered action '{}'", tag);
                Ok(())
            }
            None => Err(PipelineError::UnknownTag(Tag::new(tag))),
        }
    }

    /// Replaces the factory registered under `tag`.
    ///
    /// Composed of [`unregister`](Self::unregister) followed by
    /// [`register`](Self::register); a concurrent reader may briefly see the
    /// tag missing. The tag moves to the end of the listing order.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTag`] if nothing is registered under `tag`.
    pub fn update(
        &self,
        tag: impl Into<Tag>,
        factory: Arc<dyn ActionFactory>,
    ) -> Result<(), PipelineError> {
        let tag = tag.into();
        self.unregister(tag.as_str())?;
        self.register(tag, factory)
    }

    /// Returns the factory registered under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownTag`] if nothing is registered under `tag`.
    pub fn resolve(&self, tag: &str) -> Result<Arc<dyn ActionFactory>, PipelineError> {
        self.factories
            .read()
            .get(tag)
            .cloned()
            .ok_or_else(|| PipelineError::UnknownTag(Tag::new(tag)))
    }

    /// Resolves `tag` and builds an action from `config`.
    ///
    /// The registry lock is released before the factory runs.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::UnknownTag`] if nothing is registered under `tag`
    /// - [`PipelineError::Configuration`] if the factory rejects `config`
    pub fn instantiate(&self, tag: &str, config: Value) -> Result<Arc<dyn Action>, PipelineError> {
        let factory = self.resolve(tag)?;
        factory
            .create(config)
            .map_err(|source| PipelineError::Configuration {
                tag: Tag::new(tag),
                source,
            })
    }

    /// Lists every registration in insertion order.
    pub fn list(&self) -> Vec<(Tag, Arc<dyn ActionFactory>)> {
        self.factories
            .read()
            .iter()
            .map(|(tag, factory)| (tag.clone(), Arc::clone(factory)))
            .collect()
    }

    /// Returns `true` if `tag` has a factory.
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.read().contains_key(tag)
    }

    /// Returns the number of registered tags.
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Removes every registration.
    pub fn clear(&self) {
        self.factories.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use tsugi_core::{factory, BoxError, Output};

    #[derive(Debug)]
    struct Constant(i64);

    #[async_trait]
    impl Action for Constant {
        fn tag(&self) -> Tag {
            Tag::new("constant")
        }

        async fn execute(&self, _previous: Option<Output>) -> Result<Output, BoxError> {
            Ok(Output::value(self.0))
        }
    }

    fn constant_factory(n: i64) -> Arc<dyn ActionFactory> {
        factory(move |_| Ok(Arc::new(Constant(n)) as Arc<dyn Action>))
    }

    #[test]
    fn test_resolve_returns_registered_factory() {
        let registry = Registry::new();
        let f = constant_factory(1);
        registry.register("one", f.clone()).expect("fresh tag");

        let resolved = registry.resolve("one").expect("registered");
        assert!(Arc::ptr_eq(&resolved, &f));

        registry.unregister("one").expect("registered");
        assert!(matches!(
            registry.resolve("one"),
            Err(PipelineError::UnknownTag(tag)) if tag == "one"
        ));
    }

    #[test]
    fn test_duplicate_registration_keeps_original() {
        let registry = Registry::new();
        let original = constant_factory(1);
        registry.register("n", original.clone()).expect("fresh tag");

        let result = registry.register("n", constant_factory(2));
        assert!(matches!(result, Err(PipelineError::DuplicateTag(tag)) if tag == "n"));

        let resolved = registry.resolve("n").expect("registered");
        assert!(Arc::ptr_eq(&resolved, &original));
    }

    #[test]
    fn test_empty_tag_is_invalid() {
        let registry = Registry::new();
        let result = registry.register("", constant_factory(1));
        assert!(matches!(result, Err(PipelineError::InvalidArgument(_))));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_tag() {
        let registry = Registry::new();
        assert!(matches!(
            registry.unregister("ghost"),
            Err(PipelineError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_list_in_insertion_order() {
        let registry = Registry::new();
        assert!(registry.list().is_empty());

        for tag in ["c", "a", "b"] {
            registry.register(tag, constant_factory(0)).expect("fresh tag");
        }
        registry.unregister("a").expect("registered");

        let tags: Vec<Tag> = registry.list().into_iter().map(|(tag, _)| tag).collect();
        assert_eq!(tags, vec![Tag::new("c"), Tag::new("b")]);
    }

    #[tokio::test]
    async fn test_update_replaces_factory() {
        let registry = Registry::new();
        registry.register("n", constant_factory(1)).expect("fresh tag");
        let replacement = constant_factory(2);
        registry.update("n", replacement.clone()).expect("registered");

        assert!(Arc::ptr_eq(&registry.resolve("n").expect("registered"), &replacement));
        let action = registry.instantiate("n", json!({})).expect("valid config");
        let output = action.execute(None).await.expect("constant never fails");
        assert_eq!(output, Output::value(2));

        assert!(matches!(
            registry.update("missing", constant_factory(3)),
            Err(PipelineError::UnknownTag(_))
        ));
    }

    #[test]
    fn test_instantiate_maps_factory_error() {
        let registry = Registry::new();
        registry
            .register("picky", factory(|_| Err("no thanks".into())))
            .expect("fresh tag");

        match registry.instantiate("picky", json!(null)) {
            Err(PipelineError::Configuration { tag, source }) => {
                assert_eq!(tag, "picky");
                assert_eq!(source.to_string(), "no thanks");
            }
            other => panic!("unexpected result: {:?}", other.map(|a| a.tag())),
        }
    }

    #[test]
    fn test_shared_registry_is_observed_by_all_holders() {
        let registry = Registry::shared();
        let other = Arc::clone(&registry);
        registry.register("x", constant_factory(0)).expect("fresh tag");
        assert!(other.contains("x"));

        other.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }
}
