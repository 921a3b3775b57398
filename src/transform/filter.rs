//! Record filtering.

use std::fmt;

use crate::error::PipelineResult;
use crate::types::Record;

use super::{Operator, Outcome};

/// Keeps `record` if `predicate` returns `true`, otherwise drops it.
pub fn filter<F>(record: Record, predicate: F) -> Outcome
where
    F: FnOnce(&Record) -> bool,
{
    if predicate(&record) {
        Outcome::Kept(record)
    } else {
        Outcome::Dropped
    }
}

type Predicate = Box<dyn Fn(&Record) -> PipelineResult<bool> + Send + Sync>;

/// [`filter`] as a pipeline [`Operator`].
///
/// The predicate may fail (e.g. when it names a field the record does not have); the failure
/// aborts the run.
pub struct Filter {
    name: String,
    predicate: Predicate,
}

impl Filter {
    /// An infallible predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self::try_new(move |r| Ok(predicate(r)))
    }

    /// A predicate that may fail.
    pub fn try_new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> PipelineResult<bool> + Send + Sync + 'static,
    {
        Self {
            name: "filter".to_string(),
            predicate: Box::new(predicate),
        }
    }

    /// Override the display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

impl Operator for Filter {
    fn apply(&self, record: Record) -> PipelineResult<Outcome> {
        let keep = (self.predicate)(&record)?;
        Ok(filter(record, |_| keep))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
