//! Turns finished drafts into SHACL node and property shapes.

use crate::draft::{ConstraintDraft, ValueConstraint};
use crate::graph::{local_name, Graph, Literal, Term, Triple};
use crate::vocab::{rdf, sh};
use std::collections::HashMap;

/// Shapes written for one `materialize` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyShapeHandle {
    pub node_shape: Term,
    pub property_shape: Term,
}

/// Node shapes are keyed by class and created once; every `materialize`
/// call mints a new property shape.
///
/// Blank nodes coming from the ontology are relabelled into the shapes
/// graph's own label space, one local label per ontology label.
#[derive(Debug, Default)]
pub struct ShapeMaterializer {
    node_shapes: HashMap<Term, Term>,
    minted: HashMap<String, usize>,
    foreign_blanks: HashMap<Term, Term>,
}

impl ShapeMaterializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_shape_count(&self) -> usize {
        self.node_shapes.len()
    }

    /// `term` as it is written into `shapes`: IRIs and literals unchanged,
    /// ontology blank nodes mapped to a blank node allocated in `shapes`.
    fn local_term(&mut self, shapes: &mut Graph, term: &Term) -> Term {
        if !term.is_blank() {
            return term.clone();
        }
        self.foreign_blanks
            .entry(term.clone())
            .or_insert_with(|| shapes.fresh_blank())
            .clone()
    }

    /// Writes the node shape for `class` if it does not exist yet.
    pub fn ensure_node_shape(&mut self, shapes: &mut Graph, class: &Term) -> Term {
        let mut staged = Vec::new();
        let node_shape = self.stage_node_shape(shapes, class, &mut staged);
        shapes.extend(staged);
        node_shape
    }

    fn stage_node_shape(
        &mut self,
        shapes: &mut Graph,
        class: &Term,
        staged: &mut Vec<Triple>,
    ) -> Term {
        if let Some(existing) = self.node_shapes.get(class) {
            return existing.clone();
        }
        let node_shape = match class {
            Term::Iri(iri) => Term::Iri(format!("{iri}_Shape")),
            _ => shapes.fresh_blank(),
        };
        staged.push(Triple::new(
            node_shape.clone(),
            rdf::TYPE,
            Term::iri(sh::NODE_SHAPE),
        ));
        let target = self.local_term(shapes, class);
        staged.push(Triple::new(node_shape.clone(), sh::TARGET_CLASS, target));
        self.node_shapes.insert(class.clone(), node_shape.clone());
        node_shape
    }

    fn mint_property_shape(&mut self, shapes: &mut Graph, class: &Term, property: &Term) -> Term {
        let (Term::Iri(class_iri), Term::Iri(property_iri)) = (class, property) else {
            return shapes.fresh_blank();
        };
        let base = format!("{class_iri}_{}_PropertyShape", local_name(property_iri));
        let count = self.minted.entry(base.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            Term::Iri(base)
        } else {
            Term::Iri(format!("{base}_{count}"))
        }
    }

    /// Appends one property shape for `draft` on `class`/`property`, plus the
    /// class's node shape on first use. All triples of the call are staged
    /// and appended together.
    pub fn materialize(
        &mut self,
        shapes: &mut Graph,
        class: &Term,
        property: &Term,
        draft: &ConstraintDraft,
    ) -> PropertyShapeHandle {
        let mut staged = Vec::new();
        let node_shape = self.stage_node_shape(shapes, class, &mut staged);
        let pshape = self.mint_property_shape(shapes, class, property);
        let path = self.local_term(shapes, property);

        let mut cells = Vec::new();
        let value = match &draft.value {
            Some(ValueConstraint::Datatype(dt)) => Some((sh::DATATYPE, Term::iri(dt.clone()))),
            Some(ValueConstraint::Class(range)) => Some((sh::CLASS, self.local_term(shapes, range))),
            Some(ValueConstraint::Enumeration(values)) if !values.is_empty() => {
                let items: Vec<Term> = values.iter().map(|v| self.local_term(shapes, v)).collect();
                Some((sh::IN, stage_list(shapes, &items, &mut cells)))
            }
            _ => None,
        };

        let mut add = |predicate: &str, object: Term| {
            staged.push(Triple::new(pshape.clone(), predicate, object));
        };
        add(rdf::TYPE, Term::iri(sh::PROPERTY_SHAPE));
        add(sh::PATH, path);
        if let Some((predicate, object)) = value {
            add(predicate, object);
        }
        if let Some(min) = draft.min_count {
            add(sh::MIN_COUNT, Term::Literal(Literal::integer(min)));
        }
        if let Some(max) = draft.max_count {
            add(sh::MAX_COUNT, Term::Literal(Literal::integer(max)));
        }
        if let Some(bounds) = &draft.inclusive {
            add(sh::MIN_INCLUSIVE, Term::Literal(bounds.min.clone()));
            add(sh::MAX_INCLUSIVE, Term::Literal(bounds.max.clone()));
        }
        if let Some(length) = &draft.length {
            add(sh::MIN_LENGTH, Term::Literal(Literal::integer(length.min)));
            add(sh::MAX_LENGTH, Term::Literal(Literal::integer(length.max)));
        }

        staged.extend(cells);
        staged.push(Triple::new(node_shape.clone(), sh::PROPERTY, pshape.clone()));
        shapes.extend(staged);

        tracing::debug!(
            class = %class,
            property = %property,
            shape = %pshape,
            "materialized property shape"
        );

        PropertyShapeHandle {
            node_shape,
            property_shape: pshape,
        }
    }
}

/// Stages a fresh `rdf:first`/`rdf:rest` chain for `items` and returns its
/// head (`rdf:nil` for an empty slice).
pub fn stage_list(shapes: &mut Graph, items: &[Term], staged: &mut Vec<Triple>) -> Term {
    let nodes: Vec<Term> = items.iter().map(|_| shapes.fresh_blank()).collect();
    for (i, item) in items.iter().enumerate() {
        let rest = nodes
            .get(i + 1)
            .cloned()
            .unwrap_or_else(|| Term::iri(rdf::NIL));
        staged.push(Triple::new(nodes[i].clone(), rdf::FIRST, item.clone()));
        staged.push(Triple::new(nodes[i].clone(), rdf::REST, rest));
    }
    nodes.into_iter().next().unwrap_or_else(|| Term::iri(rdf::NIL))
}
