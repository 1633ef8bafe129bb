//! Constraint drafts: the mergeable per-(class, property) record of facets,
//! and the engine that fills one in from ontology axioms.

use crate::graph::{Literal, Term};
use crate::inspect::SchemaInspector;
use crate::vocab::{is_known_datatype, LiteralKind};
use serde::{Deserialize, Serialize};

/// The single value-type facet of a draft. Enumeration wins over class and
/// datatype inference, so at most one of the three is ever present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueConstraint {
    Class(Term),
    Datatype(String),
    Enumeration(Vec<Term>),
}

/// An inclusive pair, always set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstraintDraft {
    pub value: Option<ValueConstraint>,
    pub min_count: Option<u64>,
    pub max_count: Option<u64>,
    pub inclusive: Option<Bounds<Literal>>,
    pub length: Option<Bounds<u64>>,
}

impl ConstraintDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datatype(&self) -> Option<&str> {
        match &self.value {
            Some(ValueConstraint::Datatype(dt)) => Some(dt),
            _ => None,
        }
    }

    pub fn value_class(&self) -> Option<&Term> {
        match &self.value {
            Some(ValueConstraint::Class(class)) => Some(class),
            _ => None,
        }
    }

    pub fn enumeration(&self) -> Option<&[Term]> {
        match &self.value {
            Some(ValueConstraint::Enumeration(values)) => Some(values),
            _ => None,
        }
    }

    /// Literal family of the datatype facet, if it has one.
    pub fn literal_kind(&self) -> Option<LiteralKind> {
        self.datatype().and_then(LiteralKind::of)
    }

    pub fn mark_required(&mut self) {
        self.min_count = Some(1);
    }

    /// Idempotent: a draft that is already functional stays `max_count = 1`.
    pub fn mark_functional(&mut self) {
        self.max_count = Some(1);
    }

    pub fn set_inclusive(&mut self, min: Literal, max: Literal) {
        self.inclusive = Some(Bounds { min, max });
    }

    pub fn set_length(&mut self, min: u64, max: u64) {
        self.length = Some(Bounds { min, max });
    }
}

/// What to do with a range that is neither an enumeration nor a declared
/// class nor a known datatype IRI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Treat it as a datatype and log a warning.
    #[default]
    Lenient,
    /// Refuse to draft the pair.
    Strict,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("range {range} of {property} is not a class, enumeration or known datatype")]
    UnresolvedRange { property: Term, range: Term },
}

/// Builds the inferred draft for `property` on `class`.
pub fn draft(
    inspector: &SchemaInspector<'_>,
    class: &Term,
    property: &Term,
    policy: RangePolicy,
) -> Result<ConstraintDraft, DraftError> {
    let mut draft = ConstraintDraft::new();

    if inspector.is_functional(property) {
        draft.mark_functional();
    }

    let Some(range) = inspector.resolve_range(property) else {
        tracing::debug!(class = %class, property = %property, "property has no range");
        return Ok(draft);
    };

    let values = inspector.enumeration_values(&range);
    let value = if !values.is_empty() {
        ValueConstraint::Enumeration(values)
    } else if inspector.is_class(&range) {
        ValueConstraint::Class(range)
    } else {
        match &range {
            Term::Iri(iri) if is_known_datatype(iri) => ValueConstraint::Datatype(iri.clone()),
            Term::Iri(iri) if policy == RangePolicy::Lenient => {
                tracing::warn!(
                    property = %property,
                    range = %range,
                    "range is not a declared class or known datatype; treating it as a datatype"
                );
                ValueConstraint::Datatype(iri.clone())
            }
            _ if policy == RangePolicy::Lenient => {
                tracing::warn!(
                    property = %property,
                    range = %range,
                    "range is not an IRI; no value facet drafted"
                );
                return Ok(draft);
            }
            _ => {
                return Err(DraftError::UnresolvedRange {
                    property: property.clone(),
                    range: range.clone(),
                })
            }
        }
    };
    draft.value = Some(value);

    tracing::debug!(class = %class, property = %property, ?draft, "drafted constraint");
    Ok(draft)
}
