//! Ordered record of the outputs produced during a run.

use crate::action::Output;
use crate::error::PipelineError;
use crate::tag::Tag;
use serde::{Deserialize, Serialize};

/// One recorded action output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Tag of the action that produced the output.
    pub tag: Tag,
    /// The produced output.
    pub output: Output,
}

impl LedgerEntry {
    /// Creates a new entry.
    pub fn new(tag: impl Into<Tag>, output: Output) -> Self {
        Self {
            tag: tag.into(),
            output,
        }
    }
}

/// Append-only log of `(tag, output)` pairs.
///
/// Entries keep their append order and are never deduplicated: an action
/// that runs three times leaves three entries. Accessors hand out owned
/// copies, so callers may mutate what they receive freely.
///
/// # Examples
///
/// ```
/// use tsugi_core::{Ledger, Output};
///
/// let mut ledger = Ledger::new();
/// assert!(ledger.is_empty());
///
/// ledger.append("count", Output::value(1))?;
/// ledger.append("count", Output::value(2))?;
/// ledger.append("done", Output::Nothing)?;
///
/// assert_eq!(ledger.values_for("count").len(), 2);
/// assert!(ledger.values_for("missing").is_empty());
/// # Ok::<(), tsugi_core::PipelineError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<LedgerEntry>", into = "Vec<LedgerEntry>")]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an output under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyTag`] if `tag` is empty.
    pub fn append(&mut self, tag: impl Into<Tag>, output: Output) -> Result<(), PipelineError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(PipelineError::EmptyTag);
        }
        self.entries.push(LedgerEntry { tag, output });
        Ok(())
    }

    /// Returns every entry recorded under `tag`, in append order.
    pub fn values_for(&self, tag: &str) -> Vec<LedgerEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.tag.as_str() == tag)
            .cloned()
            .collect()
    }

    /// Returns `true` until the first append.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns a copy of all entries in append order.
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.clone()
    }

    /// Returns the most recent entry.
    pub fn last(&self) -> Option<&LedgerEntry> {
        self.entries.last()
    }

    /// Iterates over the entries without copying them.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }
}

impl TryFrom<Vec<LedgerEntry>> for Ledger {
    type Error = PipelineError;

    /// Rebuilds a ledger through [`Ledger::append`], so a deserialized
    /// ledger obeys the same tag rule as one filled by a run.
    fn try_from(entries: Vec<LedgerEntry>) -> Result<Self, Self::Error> {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.append(entry.tag, entry.output)?;
        }
        Ok(ledger)
    }
}

impl From<Ledger> for Vec<LedgerEntry> {
    fn from(ledger: Ledger) -> Self {
        ledger.entries
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
