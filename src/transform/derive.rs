//! Computed fields.

use std::fmt;

use crate::error::{PipelineError, PipelineResult};
use crate::types::Record;

use super::{Operator, Outcome};

/// Returns a new [`Record`] equal to `record` plus the field `name` set to `function(record)`.
///
/// Existing fields keep their order. If `name` already exists its value is replaced in place,
/// otherwise the field is appended.
pub fn derive<F>(record: &Record, name: &str, function: F) -> PipelineResult<Record>
where
    F: FnOnce(&Record) -> String,
{
    let value = function(record);
    record.with_field(name, value)
}

type Compute = Box<dyn Fn(&Record) -> PipelineResult<String> + Send + Sync>;

/// [`derive`] as a pipeline [`Operator`].
pub struct Derive {
    field: String,
    compute: Compute,
}

impl Derive {
    /// Derive `field` with an infallible function.
    pub fn new<F>(field: impl Into<String>, function: F) -> PipelineResult<Self>
    where
        F: Fn(&Record) -> String + Send + Sync + 'static,
    {
        Self::try_new(field, move |r| Ok(function(r)))
    }

    /// Derive `field` with a function that may fail.
    pub fn try_new<F>(field: impl Into<String>, function: F) -> PipelineResult<Self>
    where
        F: Fn(&Record) -> PipelineResult<String> + Send + Sync + 'static,
    {
        let field = field.into();
        if field.is_empty() {
            return Err(PipelineError::config("derived field name must be non-empty"));
        }
        Ok(Self {
            field,
            compute: Box::new(function),
        })
    }

    /// Name of the derived field.
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Debug for Derive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derive").field("field", &self.field).finish()
    }
}

impl Operator for Derive {
    fn apply(&self, record: Record) -> PipelineResult<Outcome> {
        let value = (self.compute)(&record)?;
        record.with_field(self.field.as_str(), value).map(Outcome::Kept)
    }

    fn name(&self) -> &str {
        "derive"
    }
}
