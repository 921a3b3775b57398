//! Record operators.
//!
//! An operator turns one [`Record`] into zero or one record. Operators are pure: they never
//! mutate their input, never look at other records and have no side effects.
//!
//! Currently implemented:
//!
//! - [`select()`]: choose and reorder fields
//! - [`filter()`]: keep or drop a record by predicate
//! - [`derive()`]: add (or overwrite) one computed field
//!
//! ## Example: select → derive
//!
//! ```rust
//! use record_pipeline::transform::{derive, select};
//! use record_pipeline::types::{FieldOrder, Record};
//!
//! let r = Record::try_from_pairs([
//!     ("id", "1"),
//!     ("producto", "Espresso"),
//!     ("precio", "2.50"),
//! ])
//! .unwrap();
//!
//! let fields = FieldOrder::new(["producto", "precio"]).unwrap();
//! let selected = select(&r, &fields).unwrap();
//! let labeled = derive(&selected, "etiqueta", |r| {
//!     format!("{} ({})", r.get("producto").unwrap_or(""), r.get("precio").unwrap_or(""))
//! })
//! .unwrap();
//!
//! assert_eq!(labeled.names().collect::<Vec<_>>(), vec!["producto", "precio", "etiqueta"]);
//! assert_eq!(labeled.get("etiqueta"), Some("Espresso (2.50)"));
//! ```

pub mod derive;
pub mod filter;
pub mod select;

pub use derive::{derive, Derive};
pub use filter::{filter, Filter};
pub use select::{select, Select};

use crate::error::PipelineResult;
use crate::types::Record;

/// Result of applying an operator to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The record continues down the chain.
    Kept(Record),
    /// The record is discarded; later operators and the sink never see it.
    Dropped,
}

impl Outcome {
    /// The kept record, if any.
    pub fn into_record(self) -> Option<Record> {
        match self {
            Self::Kept(r) => Some(r),
            Self::Dropped => None,
        }
    }

    pub fn is_dropped(&self) -> bool {
        matches!(self, Self::Dropped)
    }
}

/// A pipeline stage operating on one record at a time.
pub trait Operator {
    /// Transform `record`. Errors are fatal to the run.
    fn apply(&self, record: Record) -> PipelineResult<Outcome>;

    /// The display name of this operator.
    fn name(&self) -> &str;
}
