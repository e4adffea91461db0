//! Pipeline error types.

use crate::action::BoxError;
use crate::tag::Tag;
use thiserror::Error;

/// Errors that can occur while registering, composing or running actions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PipelineError {
    /// A registration argument was empty.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The tag already has a factory.
    #[error("Tag is already registered: {0}")]
    DuplicateTag(Tag),

    /// No factory is registered under the tag.
    #[error("Tag is not registered: {0}")]
    UnknownTag(Tag),

    /// The queue is in the middle of a run.
    #[error("Process is already running")]
    AlreadyRunning,

    /// A ledger entry was appended with an empty tag.
    #[error("Ledger tag cannot be empty")]
    EmptyTag,

    /// A factory rejected the configuration it was given.
    #[error("Invalid configuration for action '{tag}': {source}")]
    Configuration {
        /// The tag whose factory failed.
        tag: Tag,
        /// The factory's error.
        #[source]
        source: BoxError,
    },

    /// An action failed and no error handler was configured.
    #[error("Action '{tag}' failed: {source}")]
    Action {
        /// The tag of the failing action.
        tag: Tag,
        /// The error returned by the action, unchanged.
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    /// Returns the error raised by a failing action, if this is one.
    pub fn action_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Action { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Consumes the error and returns the action's own error, if this is one.
    pub fn into_action_error(self) -> Option<BoxError> {
        match self {
            Self::Action { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error, PartialEq)]
    #[error("disk full")]
    struct DiskFull;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PipelineError::DuplicateTag(Tag::new("input")).to_string(),
            "Tag is already registered: input"
        );
        assert_eq!(
            PipelineError::UnknownTag(Tag::new("select")).to_string(),
            "Tag is not registered: select"
        );
        assert_eq!(
            PipelineError::AlreadyRunning.to_string(),
            "Process is already running"
        );
    }

    #[test]
    fn test_action_error_keeps_source() {
        let error = PipelineError::Action {
            tag: Tag::new("write_file"),
            source: Box::new(DiskFull),
        };
        assert_eq!(error.to_string(), "Action 'write_file' failed: disk full");
        assert_eq!(
            error.action_error().and_then(|e| e.downcast_ref::<DiskFull>()),
            Some(&DiskFull)
        );

        let inner = error.into_action_error().expect("action variant");
        assert!(inner.downcast::<DiskFull>().is_ok());
    }

    #[test]
    fn test_structural_errors_have_no_action_error() {
        assert!(PipelineError::EmptyTag.action_error().is_none());
    }
}
