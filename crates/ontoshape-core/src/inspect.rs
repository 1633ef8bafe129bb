//! Schema queries over an ontology graph.
//!
//! Every query is read-only and returns sorted collections so that callers
//! iterate classes, properties and ranges in a reproducible order.

use crate::graph::{Graph, Term};
use crate::vocab::{owl, rdf, rdfs};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Object,
    Datatype,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySets {
    pub object: BTreeSet<Term>,
    pub datatype: BTreeSet<Term>,
}

impl PropertySets {
    /// Object and datatype properties together, sorted.
    pub fn all(&self) -> BTreeSet<Term> {
        self.object.union(&self.datatype).cloned().collect()
    }

    /// A property declared as both kinds counts as an object property.
    pub fn kind_of(&self, property: &Term) -> Option<PropertyKind> {
        if self.object.contains(property) {
            Some(PropertyKind::Object)
        } else if self.datatype.contains(property) {
            Some(PropertyKind::Datatype)
        } else {
            None
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnumerationError {
    #[error("list node {0} has no rdf:first")]
    MissingFirst(Term),
    #[error("list node {0} has no rdf:rest")]
    MissingRest(Term),
    #[error("list revisits node {0}")]
    Cycle(Term),
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaInspector<'g> {
    graph: &'g Graph,
}

impl<'g> SchemaInspector<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    /// Subjects typed `owl:Class` or `rdfs:Class`.
    pub fn classes(&self) -> BTreeSet<Term> {
        let owl_class = Term::iri(owl::CLASS);
        let rdfs_class = Term::iri(rdfs::CLASS);
        self.graph
            .subjects(rdf::TYPE, &owl_class)
            .chain(self.graph.subjects(rdf::TYPE, &rdfs_class))
            .cloned()
            .collect()
    }

    pub fn is_class(&self, term: &Term) -> bool {
        self.graph.has_type(term, owl::CLASS) || self.graph.has_type(term, rdfs::CLASS)
    }

    pub fn properties(&self) -> PropertySets {
        let object_type = Term::iri(owl::OBJECT_PROPERTY);
        let datatype_type = Term::iri(owl::DATATYPE_PROPERTY);
        PropertySets {
            object: self.graph.subjects(rdf::TYPE, &object_type).cloned().collect(),
            datatype: self
                .graph
                .subjects(rdf::TYPE, &datatype_type)
                .cloned()
                .collect(),
        }
    }

    pub fn domains(&self, property: &Term) -> BTreeSet<Term> {
        self.graph.objects(property, rdfs::DOMAIN).cloned().collect()
    }

    pub fn ranges(&self, property: &Term) -> BTreeSet<Term> {
        self.graph.objects(property, rdfs::RANGE).cloned().collect()
    }

    pub fn domains_and_ranges(&self, property: &Term) -> (BTreeSet<Term>, BTreeSet<Term>) {
        (self.domains(property), self.ranges(property))
    }

    /// The single range drafting works from: the smallest one in term order.
    pub fn resolve_range(&self, property: &Term) -> Option<Term> {
        let ranges = self.ranges(property);
        if ranges.len() > 1 {
            tracing::debug!(
                property = %property,
                ranges = ranges.len(),
                "property has several ranges; using the first in term order"
            );
        }
        ranges.into_iter().next()
    }

    pub fn is_functional(&self, property: &Term) -> bool {
        self.graph.has_type(property, owl::FUNCTIONAL_PROPERTY)
    }

    /// Properties linked to `property` by `owl:inverseOf` in either direction.
    pub fn inverses(&self, property: &Term) -> BTreeSet<Term> {
        self.graph
            .objects(property, owl::INVERSE_OF)
            .chain(self.graph.subjects(owl::INVERSE_OF, property))
            .cloned()
            .collect()
    }

    /// Members of the closed `owl:oneOf` list declared on `node`, in list order.
    ///
    /// Returns an empty vector when `node` declares no enumeration or when
    /// every declared list is malformed.
    pub fn enumeration_values(&self, node: &Term) -> Vec<Term> {
        let heads: BTreeSet<&Term> = self.graph.objects(node, owl::ONE_OF).collect();
        for head in heads {
            match self.read_list(head) {
                Ok(values) if !values.is_empty() => return values,
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(
                        node = %node,
                        error = %err,
                        "ignoring malformed owl:oneOf list"
                    );
                }
            }
        }
        Vec::new()
    }

    /// Walks an RDF collection from `head` to `rdf:nil`.
    pub fn read_list(&self, head: &Term) -> Result<Vec<Term>, EnumerationError> {
        let mut values = Vec::new();
        let mut visited: HashSet<&Term> = HashSet::new();
        let mut current = head;
        while !current.is_iri(rdf::NIL) {
            if !visited.insert(current) {
                return Err(EnumerationError::Cycle(current.clone()));
            }
            let first = self
                .graph
                .objects(current, rdf::FIRST)
                .next()
                .ok_or_else(|| EnumerationError::MissingFirst(current.clone()))?;
            values.push(first.clone());
            current = self
                .graph
                .objects(current, rdf::REST)
                .next()
                .ok_or_else(|| EnumerationError::MissingRest(current.clone()))?;
        }
        Ok(values)
    }
}

/// One property as reported by `SchemaInspector::summary`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySummary {
    pub iri: String,
    pub kind: PropertyKind,
    pub domains: Vec<String>,
    pub ranges: Vec<String>,
    pub functional: bool,
    pub inverses: Vec<String>,
    pub enumeration: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub classes: Vec<String>,
    pub properties: Vec<PropertySummary>,
}

impl SchemaInspector<'_> {
    /// Everything drafting looks at, in one serializable value.
    pub fn summary(&self) -> SchemaSummary {
        let names = |terms: BTreeSet<Term>| terms.iter().map(Term::to_string).collect();
        let props = self.properties();
        let properties = props
            .all()
            .into_iter()
            .filter_map(|p| {
                let kind = props.kind_of(&p)?;
                let enumeration = self
                    .resolve_range(&p)
                    .map(|r| self.enumeration_values(&r))
                    .unwrap_or_default();
                Some(PropertySummary {
                    iri: p.to_string(),
                    kind,
                    domains: names(self.domains(&p)),
                    ranges: names(self.ranges(&p)),
                    functional: self.is_functional(&p),
                    inverses: names(self.inverses(&p)),
                    enumeration: enumeration.iter().map(Term::to_string).collect(),
                })
            })
            .collect();
        SchemaSummary {
            classes: names(self.classes()),
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_str, RdfFormat};

    const ONTOLOGY: &str = r#"
@prefix ex: <http://example.org/onto#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

ex:Team a owl:Class .
ex:Match a owl:Class .
ex:Person a rdfs:Class .

ex:homeTeam a owl:ObjectProperty, owl:FunctionalProperty ;
    rdfs:domain ex:Match ;
    rdfs:range ex:Team .

ex:playsIn a owl:ObjectProperty ;
    owl:inverseOf ex:hosts ;
    rdfs:domain ex:Team ;
    rdfs:range ex:Match .

ex:hosts a owl:ObjectProperty .

ex:nickname a owl:DatatypeProperty ;
    rdfs:domain ex:Team , ex:Person ;
    rdfs:range xsd:token , xsd:string .

ex:hasSex a owl:ObjectProperty ;
    rdfs:domain ex:Person ;
    rdfs:range [ a owl:Class ; owl:oneOf ( ex:Male ex:Female ) ] .
"#;

    fn graph() -> Graph {
        load_str(ONTOLOGY, RdfFormat::Turtle).expect("ontology")
    }

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/onto#{local}"))
    }

    #[test]
    fn collects_owl_and_rdfs_classes() {
        let g = graph();
        let classes = SchemaInspector::new(&g).classes();
        assert!(classes.contains(&ex("Team")));
        assert!(classes.contains(&ex("Match")));
        assert!(classes.contains(&ex("Person")));
        // the anonymous oneOf class is a class too
        assert_eq!(classes.iter().filter(|c| c.is_blank()).count(), 1);
    }

    #[test]
    fn splits_object_and_datatype_properties() {
        let g = graph();
        let props = SchemaInspector::new(&g).properties();
        assert!(props.object.contains(&ex("homeTeam")));
        assert!(props.datatype.contains(&ex("nickname")));
        assert_eq!(props.kind_of(&ex("hasSex")), Some(PropertyKind::Object));
        assert_eq!(props.all().len(), 5);
    }

    #[test]
    fn domains_ranges_and_tie_break() {
        let g = graph();
        let inspector = SchemaInspector::new(&g);
        let (domains, ranges) = inspector.domains_and_ranges(&ex("nickname"));
        assert_eq!(domains.len(), 2);
        assert_eq!(ranges.len(), 2);
        assert_eq!(
            inspector.resolve_range(&ex("nickname")),
            Some(Term::iri(crate::vocab::xsd::STRING))
        );
        assert_eq!(inspector.resolve_range(&ex("hosts")), None);
    }

    #[test]
    fn functional_and_inverse_lookups() {
        let g = graph();
        let inspector = SchemaInspector::new(&g);
        assert!(inspector.is_functional(&ex("homeTeam")));
        assert!(!inspector.is_functional(&ex("playsIn")));
        assert_eq!(
            inspector.inverses(&ex("hosts")),
            BTreeSet::from([ex("playsIn")])
        );
        assert_eq!(
            inspector.inverses(&ex("playsIn")),
            BTreeSet::from([ex("hosts")])
        );
    }

    #[test]
    fn enumeration_values_keep_declaration_order() {
        let g = graph();
        let inspector = SchemaInspector::new(&g);
        let range = inspector.resolve_range(&ex("hasSex")).expect("range");
        assert_eq!(
            inspector.enumeration_values(&range),
            vec![ex("Male"), ex("Female")]
        );
        assert!(inspector.enumeration_values(&ex("Team")).is_empty());
    }

    #[test]
    fn malformed_enumeration_degrades_to_empty() {
        let nt = r#"
<http://example.org/Sex> <http://www.w3.org/2002/07/owl#oneOf> _:l1 .
_:l1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#first> <http://example.org/Male> .
_:l1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#rest> _:l2 .
_:l2 <http://www.w3.org/1999/02/22-rdf-syntax-ns#rest> <http://www.w3.org/1999/02/22-rdf-syntax-ns#nil> .
"#;
        let g = load_str(nt, RdfFormat::NTriples).expect("nt");
        let inspector = SchemaInspector::new(&g);
        let sex = Term::iri("http://example.org/Sex");
        assert!(inspector.enumeration_values(&sex).is_empty());

        let head = g.objects(&sex, owl::ONE_OF).next().expect("head").clone();
        assert!(matches!(
            inspector.read_list(&head),
            Err(EnumerationError::MissingFirst(_))
        ));
    }

    #[test]
    fn summary_lists_every_property_with_its_axioms() {
        let g = graph();
        let summary = SchemaInspector::new(&g).summary();
        assert_eq!(summary.properties.len(), 5);
        let home = summary
            .properties
            .iter()
            .find(|p| p.iri == "<http://example.org/onto#homeTeam>")
            .expect("homeTeam");
        assert!(home.functional);
        assert_eq!(home.kind, PropertyKind::Object);
        assert_eq!(home.ranges, vec!["<http://example.org/onto#Team>".to_string()]);
        let sex = summary
            .properties
            .iter()
            .find(|p| p.iri.ends_with("hasSex>"))
            .expect("hasSex");
        assert_eq!(sex.enumeration.len(), 2);
    }

    #[test]
    fn cyclic_list_is_rejected() {
        let nt = r#"
<http://example.org/Sex> <http://www.w3.org/2002/07/owl#oneOf> _:l1 .
_:l1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#first> <http://example.org/Male> .
_:l1 <http://www.w3.org/1999/02/22-rdf-syntax-ns#rest> _:l1 .
"#;
        let g = load_str(nt, RdfFormat::NTriples).expect("nt");
        let inspector = SchemaInspector::new(&g);
        assert!(inspector
            .enumeration_values(&Term::iri("http://example.org/Sex"))
            .is_empty());
    }
}
