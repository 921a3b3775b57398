//! Field selection and reordering.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{FieldOrder, Record};

use super::{Operator, Outcome};

/// Returns a new [`Record`] containing exactly `fields`, in that order, with values copied from
/// `record`.
///
/// Fails with [`PipelineError::FieldNotFound`] on the first name `record` does not have; no
/// partial record is ever returned.
pub fn select(record: &Record, fields: &FieldOrder) -> PipelineResult<Record> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(fields.len());
    for name in fields.iter() {
        match record.get(name) {
            Some(value) => out.push((name.to_owned(), value.to_owned())),
            None => {
                return Err(PipelineError::FieldNotFound {
                    field: name.to_owned(),
                    available: record.available_names(),
                });
            }
        }
    }
    // `FieldOrder` guarantees unique, non-empty names.
    Ok(Record::from_validated(out))
}

/// [`select`] as a pipeline [`Operator`].
#[derive(Debug, Clone)]
pub struct Select {
    fields: FieldOrder,
}

impl Select {
    pub fn new(fields: FieldOrder) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldOrder {
        &self.fields
    }
}

impl Operator for Select {
    fn apply(&self, record: Record) -> PipelineResult<Outcome> {
        select(&record, &self.fields).map(Outcome::Kept)
    }

    fn name(&self) -> &str {
        "select"
    }
}

#[cfg(test)]
mod tests {
    use super::{select, Select};
    use crate::transform::{Operator, Outcome};
    use crate::types::{FieldOrder, Record};
    use crate::PipelineError;

    fn espresso() -> Record {
        Record::try_from_pairs([
            ("id", "1"),
            ("producto", "Espresso"),
            ("precio", "2.50"),
            ("descripcion", "Café negro, intenso"),
        ])
        .unwrap()
    }

    #[test]
    fn select_reorders_and_copies_values() {
        let r = espresso();
        let fields = FieldOrder::new(["descripcion", "producto", "precio", "id"]).unwrap();
        let out = select(&r, &fields).unwrap();

        assert_eq!(
            out.names().collect::<Vec<_>>(),
            vec!["descripcion", "producto", "precio", "id"]
        );
        for name in fields.iter() {
            assert_eq!(out.get(name), r.get(name));
        }
        // Original unchanged
        assert_eq!(r.names().next(), Some("id"));
    }

    #[test]
    fn select_can_drop_fields() {
        let fields = FieldOrder::new(["producto", "precio"]).unwrap();
        let out = select(&espresso(), &fields).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.values().collect::<Vec<_>>(), vec!["Espresso", "2.50"]);
    }

    #[test]
    fn select_with_empty_ordering_yields_empty_record() {
        let fields = FieldOrder::new(Vec::<String>::new()).unwrap();
        assert!(select(&espresso(), &fields).unwrap().is_empty());
    }

    #[test]
    fn select_unknown_field_is_a_schema_error() {
        let fields = FieldOrder::new(["nonexistent", "producto"]).unwrap();
        let err = select(&espresso(), &fields).unwrap_err();
        assert!(err.is_schema_error());
        match err {
            PipelineError::FieldNotFound { field, available } => {
                assert_eq!(field, "nonexistent");
                assert_eq!(available, vec!["id", "producto", "precio", "descripcion"]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn select_operator_always_keeps() {
        let op = Select::new(FieldOrder::new(["id"]).unwrap());
        let out = op.apply(espresso()).unwrap();
        assert!(matches!(out, Outcome::Kept(ref r) if r.len() == 1));
        assert_eq!(op.name(), "select");
    }
}
