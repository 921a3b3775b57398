//! Header establishment and per-record column layout shared by all sinks.

use crate::error::{PipelineError, PipelineResult};
use crate::types::{FieldOrder, Record};

use super::FieldSetPolicy;

#[derive(Debug)]
pub(crate) struct HeaderLayout {
    order: Option<FieldOrder>,
    policy: FieldSetPolicy,
    emitted: bool,
    records: u64,
}

impl HeaderLayout {
    pub(crate) fn new(order: Option<FieldOrder>, policy: FieldSetPolicy) -> Self {
        Self {
            order,
            policy,
            emitted: false,
            records: 0,
        }
    }

    /// Fixes the ordering from `record` if none was configured.
    ///
    /// Returns the ordering if the header still has to be emitted.
    pub(crate) fn establish(&mut self, record: &Record) -> Option<&FieldOrder> {
        if self.order.is_none() {
            self.order = Some(record.field_order());
        }
        self.pending_header()
    }

    /// The configured ordering if the header has not been emitted yet.
    pub(crate) fn pending_header(&self) -> Option<&FieldOrder> {
        if self.emitted { None } else { self.order.as_ref() }
    }

    pub(crate) fn mark_emitted(&mut self) {
        self.emitted = true;
    }

    pub(crate) fn order(&self) -> Option<&FieldOrder> {
        self.order.as_ref()
    }

    /// Values of `record` laid out in header order, after applying the divergence policy.
    ///
    /// Must be called after [`Self::establish`].
    pub(crate) fn project<'r>(&mut self, record: &'r Record) -> PipelineResult<Vec<&'r str>> {
        self.records += 1;
        let order = match self.order.as_ref() {
            Some(o) => o,
            None => return Err(PipelineError::config("sink header ordering not established")),
        };

        let mut values = Vec::with_capacity(order.len());
        let mut missing = Vec::new();
        for name in order.iter() {
            match record.get(name) {
                Some(v) => values.push(v),
                None => {
                    missing.push(name.to_string());
                    values.push("");
                }
            }
        }

        let extra: Vec<String> = record
            .names()
            .filter(|n| !order.contains(n))
            .map(str::to_string)
            .collect();

        let diverges = match self.policy {
            FieldSetPolicy::Strict => !missing.is_empty() || !extra.is_empty(),
            FieldSetPolicy::FillMissing => !extra.is_empty(),
            FieldSetPolicy::FillMissingIgnoreExtra => false,
        };
        if diverges {
            return Err(PipelineError::FieldSetDivergence {
                record: self.records,
                missing,
                extra,
            });
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::HeaderLayout;
    use crate::sink::FieldSetPolicy;
    use crate::types::{FieldOrder, Record};
    use crate::PipelineError;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        Record::try_from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn header_is_inferred_from_first_record_and_pending_once() {
        let mut layout = HeaderLayout::new(None, FieldSetPolicy::Strict);
        let first = rec(&[("b", "1"), ("a", "2")]);
        let header = layout.establish(&first).cloned().unwrap();
        assert_eq!(header.to_string(), "b,a");
        layout.mark_emitted();

        let second = rec(&[("a", "3"), ("b", "4")]);
        assert!(layout.establish(&second).is_none());
        // Later records are laid out in the established order.
        assert_eq!(layout.project(&second).unwrap(), vec!["4", "3"]);
    }

    #[test]
    fn strict_policy_rejects_missing_and_extra() {
        let order = FieldOrder::new(["a", "b"]).unwrap();
        let mut layout = HeaderLayout::new(Some(order), FieldSetPolicy::Strict);
        let r = rec(&[("a", "1"), ("c", "2")]);
        layout.establish(&r);
        match layout.project(&r).unwrap_err() {
            PipelineError::FieldSetDivergence { record, missing, extra } => {
                assert_eq!(record, 1);
                assert_eq!(missing, vec!["b".to_string()]);
                assert_eq!(extra, vec!["c".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fill_missing_writes_empty_values_but_rejects_extra() {
        let order = FieldOrder::new(["a", "b"]).unwrap();
        let mut layout = HeaderLayout::new(Some(order), FieldSetPolicy::FillMissing);
        let short = rec(&[("b", "2")]);
        assert_eq!(layout.project(&short).unwrap(), vec!["", "2"]);

        let wide = rec(&[("a", "1"), ("b", "2"), ("z", "9")]);
        assert!(layout.project(&wide).is_err());
    }

    #[test]
    fn fill_missing_ignore_extra_never_diverges() {
        let order = FieldOrder::new(["a", "b"]).unwrap();
        let mut layout = HeaderLayout::new(Some(order), FieldSetPolicy::FillMissingIgnoreExtra);
        let wide = rec(&[("z", "9"), ("a", "1")]);
        assert_eq!(layout.project(&wide).unwrap(), vec!["1", ""]);
    }
}
