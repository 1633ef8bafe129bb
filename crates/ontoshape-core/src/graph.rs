//! In-memory triple store shared by the ontology and the shapes graph.
//!
//! Triples keep insertion order (so serialization is reproducible) and the
//! store rejects duplicates, giving set semantics like any RDF graph.

use crate::vocab::xsd;
use std::collections::{HashMap, HashSet};
use std::fmt;

// ============================================================================
// Terms
// ============================================================================

/// An RDF literal. `datatype` is `None` for plain literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub lexical: String,
    pub datatype: Option<String>,
    pub language: Option<String>,
}

impl Literal {
    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn plain(lexical: impl Into<String>) -> Self {
        Self {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn integer(value: impl fmt::Display) -> Self {
        Self::typed(value.to_string(), xsd::INTEGER)
    }

    /// True for literals whose datatype is absent or `xsd:string`.
    pub fn is_simple_string(&self) -> bool {
        self.language.is_none()
            && self
                .datatype
                .as_deref()
                .map_or(true, |dt| dt == xsd::STRING)
    }
}

/// A node or value in a triple.
///
/// The derived ordering (IRIs, then blank nodes, then literals, each
/// lexicographic) is the total order used wherever the engine has to pick
/// deterministically from a set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal(Literal),
}

impl Term {
    pub fn iri(iri: impl Into<String>) -> Self {
        Term::Iri(iri.into())
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn is_iri(&self, iri: &str) -> bool {
        self.as_iri() == Some(iri)
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::Blank(_))
    }

    /// Short human-readable name: the local part of an IRI, `_:label` for
    /// blank nodes, the lexical form for literals.
    pub fn display_name(&self) -> String {
        match self {
            Term::Iri(iri) => local_name(iri).to_string(),
            Term::Blank(label) => format!("_:{label}"),
            Term::Literal(lit) => lit.lexical.clone(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::Blank(label) => write!(f, "_:{label}"),
            Term::Literal(lit) => {
                write!(f, "\"{}\"", lit.lexical)?;
                if let Some(lang) = &lit.language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = &lit.datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// The part of an IRI after the last `#` or `/`.
pub fn local_name(iri: &str) -> &str {
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

/// The IRI up to and including the last `#` or `/`.
pub fn namespace_of(iri: &str) -> &str {
    match iri.rfind(['#', '/']) {
        Some(pos) => &iri[..=pos],
        None => iri,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: Term,
    pub predicate: String,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: Term, predicate: impl Into<String>, object: Term) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Graph {
    triples: Vec<Triple>,
    index: HashSet<Triple>,
    /// Positions in `triples`, ascending.
    by_subject: HashMap<Term, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
    blank_labels: HashSet<String>,
    next_blank: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Adds a triple; returns `false` if it was already present.
    pub fn insert(&mut self, subject: Term, predicate: &str, object: Term) -> bool {
        self.insert_triple(Triple::new(subject, predicate, object))
    }

    pub fn insert_triple(&mut self, triple: Triple) -> bool {
        if self.index.contains(&triple) {
            return false;
        }
        for term in [&triple.subject, &triple.object] {
            if let Term::Blank(label) = term {
                self.blank_labels.insert(label.clone());
            }
        }
        let pos = self.triples.len();
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(pos);
        self.by_object
            .entry(triple.object.clone())
            .or_default()
            .push(pos);
        self.index.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    pub fn contains(&self, subject: &Term, predicate: &str, object: &Term) -> bool {
        self.index
            .contains(&Triple::new(subject.clone(), predicate, object.clone()))
    }

    /// `subject rdf:type class`
    pub fn has_type(&self, subject: &Term, class_iri: &str) -> bool {
        self.contains(
            subject,
            crate::vocab::rdf::TYPE,
            &Term::iri(class_iri),
        )
    }

    /// Objects of `subject predicate ?`, in insertion order.
    pub fn objects<'a>(
        &'a self,
        subject: &Term,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.positions(&self.by_subject, subject)
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.object)
    }

    /// Subjects of `? predicate object`, in insertion order.
    pub fn subjects<'a>(
        &'a self,
        predicate: &'a str,
        object: &Term,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.positions(&self.by_object, object)
            .filter(move |t| t.predicate == predicate)
            .map(|t| &t.subject)
    }

    fn positions<'a>(
        &'a self,
        index: &'a HashMap<Term, Vec<usize>>,
        term: &Term,
    ) -> impl Iterator<Item = &'a Triple> + 'a {
        index
            .get(term)
            .into_iter()
            .flatten()
            .map(move |&pos| &self.triples[pos])
    }

    /// Allocates a blank node label not yet used in this graph.
    pub fn fresh_blank(&mut self) -> Term {
        loop {
            let label = format!("b{}", self.next_blank);
            self.next_blank += 1;
            if self.blank_labels.insert(label.clone()) {
                return Term::Blank(label);
            }
        }
    }
}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.insert_triple(triple);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::rdf;

    #[test]
    fn insert_rejects_duplicates_and_keeps_order() {
        let mut g = Graph::new();
        let a = Term::iri("http://example.org/a");
        assert!(g.insert(a.clone(), rdf::TYPE, Term::iri("http://example.org/C")));
        assert!(g.insert(a.clone(), rdf::TYPE, Term::iri("http://example.org/B")));
        assert!(!g.insert(a.clone(), rdf::TYPE, Term::iri("http://example.org/C")));
        assert_eq!(g.len(), 2);

        let types: Vec<_> = g.objects(&a, rdf::TYPE).map(Term::display_name).collect();
        assert_eq!(types, vec!["C", "B"]);
    }

    #[test]
    fn indexed_lookups_keep_insertion_order_and_accept_temporaries() {
        let ex = |local: &str| Term::iri(format!("http://example.org/{local}"));
        let mut g = Graph::new();
        g.insert(ex("list"), rdf::FIRST, ex("x"));
        g.insert(ex("other"), rdf::FIRST, ex("x"));
        g.insert(ex("list"), rdf::REST, Term::iri(rdf::NIL));

        let firsts: Vec<&Term> = g.objects(&ex("list"), rdf::FIRST).collect();
        assert_eq!(firsts, vec![&ex("x")]);
        let owners: Vec<_> = g
            .subjects(rdf::FIRST, &ex("x"))
            .map(Term::display_name)
            .collect();
        assert_eq!(owners, vec!["list", "other"]);
        assert_eq!(g.objects(&ex("missing"), rdf::FIRST).count(), 0);
    }

    #[test]
    fn fresh_blank_skips_labels_already_in_use() {
        let mut g = Graph::new();
        g.insert(
            Term::Blank("b0".to_string()),
            rdf::FIRST,
            Term::Literal(Literal::plain("x")),
        );
        assert_eq!(g.fresh_blank(), Term::Blank("b1".to_string()));
        assert_eq!(g.fresh_blank(), Term::Blank("b2".to_string()));
    }

    #[test]
    fn term_order_puts_iris_before_blanks_before_literals() {
        let mut terms = vec![
            Term::Literal(Literal::plain("a")),
            Term::Blank("z".to_string()),
            Term::iri("http://example.org/b"),
            Term::iri("http://example.org/a"),
        ];
        terms.sort();
        assert_eq!(terms[0], Term::iri("http://example.org/a"));
        assert!(terms[2].is_blank());
    }

    #[test]
    fn local_name_and_namespace_split_on_hash_or_slash() {
        assert_eq!(local_name("http://example.org/onto#Match"), "Match");
        assert_eq!(namespace_of("http://example.org/onto#Match"), "http://example.org/onto#");
        assert_eq!(local_name("http://example.org/Team"), "Team");
    }
}
