//! Turtle and N-Triples output for the shapes graph.

use crate::config::PrefixMap;
use crate::graph::{Graph, Literal, Term, Triple};
use crate::vocab::{rdf, xsd};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Turtle,
    NTriples,
}

pub fn write_graph<W: Write>(
    graph: &Graph,
    prefixes: &PrefixMap,
    format: OutputFormat,
    out: W,
) -> io::Result<()> {
    match format {
        OutputFormat::Turtle => write_turtle(graph, prefixes, out),
        OutputFormat::NTriples => write_ntriples(graph, out),
    }
}

// ============================================================================
// N-Triples
// ============================================================================

pub fn write_ntriples<W: Write>(graph: &Graph, mut out: W) -> io::Result<()> {
    for t in graph.iter() {
        writeln!(
            out,
            "{} <{}> {} .",
            nt_term(&t.subject),
            t.predicate,
            nt_term(&t.object)
        )?;
    }
    out.flush()
}

fn nt_term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{iri}>"),
        Term::Blank(label) => format!("_:{label}"),
        Term::Literal(lit) => {
            let mut s = format!("\"{}\"", escape(&lit.lexical));
            if let Some(lang) = &lit.language {
                s.push_str(&format!("@{lang}"));
            } else if let Some(dt) = &lit.datatype {
                s.push_str(&format!("^^<{dt}>"));
            }
            s
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// Turtle
// ============================================================================

struct TurtleWriter<'a> {
    prefixes: &'a PrefixMap,
    lists: HashMap<Term, Vec<Term>>,
}

impl TurtleWriter<'_> {
    fn iri(&self, iri: &str) -> String {
        match self.prefixes.compact(iri) {
            Some((prefix, local)) => format!("{prefix}:{local}"),
            None => format!("<{iri}>"),
        }
    }

    fn literal(&self, lit: &Literal) -> String {
        if let Some(lang) = &lit.language {
            return format!("\"{}\"@{lang}", escape(&lit.lexical));
        }
        match lit.datatype.as_deref() {
            Some(xsd::INTEGER) if is_integer_lexical(&lit.lexical) => lit.lexical.clone(),
            _ if lit.is_simple_string() => format!("\"{}\"", escape(&lit.lexical)),
            Some(dt) => format!("\"{}\"^^{}", escape(&lit.lexical), self.iri(dt)),
            None => format!("\"{}\"", escape(&lit.lexical)),
        }
    }

    fn term(&self, term: &Term) -> String {
        match term {
            Term::Iri(iri) if iri == rdf::NIL => "()".to_string(),
            Term::Iri(iri) => self.iri(iri),
            Term::Blank(label) => match self.lists.get(term) {
                Some(items) => {
                    let items: Vec<String> = items.iter().map(|i| self.term(i)).collect();
                    format!("( {} )", items.join(" "))
                }
                None => format!("_:{label}"),
            },
            Term::Literal(lit) => self.literal(lit),
        }
    }

    fn predicate(&self, predicate: &str) -> String {
        if predicate == rdf::TYPE {
            "a".to_string()
        } else {
            self.iri(predicate)
        }
    }
}

fn is_integer_lexical(s: &str) -> bool {
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Blank-node list heads that can be written as `( … )`, with their items,
/// and the set of list nodes absorbed into them.
fn inline_lists(graph: &Graph) -> (HashMap<Term, Vec<Term>>, HashSet<Term>) {
    let mut by_subject: HashMap<&Term, Vec<&Triple>> = HashMap::new();
    let mut references: HashMap<&Term, usize> = HashMap::new();
    for t in graph.iter() {
        by_subject.entry(&t.subject).or_default().push(t);
        *references.entry(&t.object).or_default() += 1;
    }

    // A list cell has exactly rdf:first and rdf:rest and one incoming link.
    let cell = |node: &Term| -> Option<(Term, Term)> {
        if !node.is_blank() || references.get(node).copied() != Some(1) {
            return None;
        }
        let triples = by_subject.get(node)?;
        if triples.len() != 2 {
            return None;
        }
        let first = triples.iter().find(|t| t.predicate == rdf::FIRST)?;
        let rest = triples.iter().find(|t| t.predicate == rdf::REST)?;
        Some((first.object.clone(), rest.object.clone()))
    };

    let mut lists = HashMap::new();
    let mut absorbed = HashSet::new();
    let rest_targets: HashSet<&Term> = graph
        .iter()
        .filter(|t| t.predicate == rdf::REST)
        .map(|t| &t.object)
        .collect();

    for t in graph.iter() {
        let head = &t.object;
        if t.predicate == rdf::REST || rest_targets.contains(head) || lists.contains_key(head) {
            continue;
        }
        let mut items = Vec::new();
        let mut nodes = Vec::new();
        let mut current = head.clone();
        let complete = loop {
            if current.is_iri(rdf::NIL) {
                break true;
            }
            if nodes.contains(&current) {
                break false;
            }
            let Some((first, rest)) = cell(&current) else {
                break false;
            };
            items.push(first);
            nodes.push(current);
            current = rest;
        };
        if complete && !nodes.is_empty() {
            absorbed.extend(nodes);
            lists.insert(head.clone(), items);
        }
    }

    (lists, absorbed)
}

pub fn write_turtle<W: Write>(graph: &Graph, prefixes: &PrefixMap, mut out: W) -> io::Result<()> {
    for (prefix, ns) in prefixes.iter() {
        writeln!(out, "@prefix {prefix}: <{ns}> .")?;
    }
    if !graph.is_empty() {
        writeln!(out)?;
    }

    let (lists, absorbed) = inline_lists(graph);
    let writer = TurtleWriter { prefixes, lists };

    let mut subjects: Vec<&Term> = Vec::new();
    let mut grouped: HashMap<&Term, Vec<(&str, Vec<&Term>)>> = HashMap::new();
    for t in graph.iter() {
        if absorbed.contains(&t.subject) {
            continue;
        }
        let groups = grouped.entry(&t.subject).or_insert_with(|| {
            subjects.push(&t.subject);
            Vec::new()
        });
        match groups.iter_mut().find(|(p, _)| *p == t.predicate) {
            Some((_, objects)) => objects.push(&t.object),
            None => groups.push((t.predicate.as_str(), vec![&t.object])),
        }
    }

    for subject in subjects {
        let groups = &grouped[subject];
        let lines: Vec<String> = groups
            .iter()
            .map(|(predicate, objects)| {
                let objects: Vec<String> = objects.iter().map(|o| writer.term(o)).collect();
                format!("{} {}", writer.predicate(predicate), objects.join(", "))
            })
            .collect();
        writeln!(
            out,
            "{} {} .\n",
            writer.term(subject),
            lines.join(" ;\n    ")
        )?;
    }
    out.flush()
}

pub fn to_turtle_string(graph: &Graph, prefixes: &PrefixMap) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_turtle(graph, prefixes, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{load_str, RdfFormat};
    use crate::materialize::stage_list;
    use crate::vocab::sh;

    fn ex(local: &str) -> Term {
        Term::iri(format!("http://example.org/onto#{local}"))
    }

    fn prefixes() -> PrefixMap {
        let mut map = PrefixMap::standard();
        map.bind("ex", "http://example.org/onto#").expect("bind");
        map
    }

    fn sample() -> Graph {
        let mut g = Graph::new();
        g.insert(ex("Human_Shape"), rdf::TYPE, Term::iri(sh::NODE_SHAPE));
        g.insert(ex("Human_Shape"), sh::TARGET_CLASS, ex("Human"));
        g.insert(ex("Human_Shape"), sh::PROPERTY, ex("P1"));
        g.insert(ex("P1"), rdf::TYPE, Term::iri(sh::PROPERTY_SHAPE));
        let mut staged = Vec::new();
        let head = stage_list(&mut g, &[ex("Male"), ex("Female")], &mut staged);
        g.extend(staged);
        g.insert(ex("P1"), sh::IN, head);
        g.insert(ex("P1"), sh::MAX_COUNT, Term::Literal(Literal::integer(1)));
        g.insert(
            ex("P1"),
            sh::MIN_INCLUSIVE,
            Term::Literal(Literal::typed("2020-01-01", xsd::DATE)),
        );
        g.insert(ex("P1"), "http://example.org/onto#note", Term::Literal(Literal::plain("a \"b\"")));
        g
    }

    #[test]
    fn turtle_uses_prefixes_collections_and_integer_shorthand() {
        let ttl = to_turtle_string(&sample(), &prefixes());
        assert!(ttl.starts_with("@prefix ex: <http://example.org/onto#> .\n"));
        assert!(ttl.contains("ex:Human_Shape a sh:NodeShape ;\n    sh:targetClass ex:Human ;"));
        assert!(ttl.contains("sh:in ( ex:Male ex:Female )"));
        assert!(ttl.contains("sh:maxCount 1"));
        assert!(ttl.contains("sh:minInclusive \"2020-01-01\"^^xsd:date"));
        assert!(ttl.contains("ex:note \"a \\\"b\\\"\""));
        assert!(!ttl.contains("rdf:first"));
    }

    #[test]
    fn turtle_output_parses_back_to_the_same_triple_count() {
        let g = sample();
        let ttl = to_turtle_string(&g, &prefixes());
        let reparsed = load_str(&ttl, RdfFormat::Turtle).expect("reparse");
        assert_eq!(reparsed.len(), g.len());
    }

    #[test]
    fn shared_list_nodes_are_not_inlined() {
        let mut g = Graph::new();
        let mut staged = Vec::new();
        let head = stage_list(&mut g, &[ex("A")], &mut staged);
        g.extend(staged);
        g.insert(ex("s1"), sh::IN, head.clone());
        g.insert(ex("s2"), sh::IN, head);
        let ttl = to_turtle_string(&g, &prefixes());
        assert!(ttl.contains("_:b0 rdf:first ex:A ;"));
    }

    #[test]
    fn ntriples_are_fully_expanded() {
        let mut buf = Vec::new();
        write_ntriples(&sample(), &mut buf).expect("write");
        let nt = String::from_utf8(buf).expect("utf8");
        assert!(nt.contains(
            "<http://example.org/onto#P1> <http://www.w3.org/ns/shacl#maxCount> \"1\"^^<http://www.w3.org/2001/XMLSchema#integer> ."
        ));
        let reparsed = load_str(&nt, RdfFormat::NTriples).expect("reparse");
        assert_eq!(reparsed.len(), sample().len());
    }
}
