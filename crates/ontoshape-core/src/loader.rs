//! Ontology loading.
//!
//! Sophia does the parsing (Turtle, N-Triples, RDF/XML); each parsed triple is
//! converted into the crate's own [`Term`] model through its N-Triples display
//! form, so the rest of the engine never touches sophia types.

use crate::graph::{Graph, Literal, Term, Triple as GraphTriple};
use sophia::api::prelude::*;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
}

impl RdfFormat {
    /// Picks a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RdfFormat::NTriples => "N-Triples",
            RdfFormat::Turtle => "Turtle",
            RdfFormat::RdfXml => "RDF/XML",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse {format}: {message}")]
    Parse { format: RdfFormat, message: String },
    #[error("unsupported RDF format: .{0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TermSinkError(String);

/// Loads an ontology file, choosing the parser from its extension.
pub fn load(path: &Path) -> Result<Graph, LoadError> {
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let format =
        RdfFormat::from_extension(ext).ok_or_else(|| LoadError::UnsupportedFormat(ext.to_string()))?;
    let bytes = std::fs::read(path)?;
    let graph = load_bytes(&bytes, format)?;
    tracing::info!(
        path = %path.display(),
        %format,
        triples = graph.len(),
        "loaded ontology"
    );
    Ok(graph)
}

pub fn load_str(text: &str, format: RdfFormat) -> Result<Graph, LoadError> {
    load_bytes(text.as_bytes(), format)
}

pub fn load_bytes(bytes: &[u8], format: RdfFormat) -> Result<Graph, LoadError> {
    let reader = std::io::BufReader::new(std::io::Cursor::new(bytes));
    let mut graph = Graph::new();

    let mut sink = |s: String, p: String, o: String| -> Result<(), TermSinkError> {
        let subject = parse_term_display(&s)?;
        let Term::Iri(predicate) = parse_term_display(&p)? else {
            return Ok(());
        };
        let object = parse_term_display(&o)?;
        graph.insert_triple(GraphTriple::new(subject, predicate, object));
        Ok(())
    };

    let parsed = match format {
        RdfFormat::NTriples => sophia::turtle::parser::nt::parse_bufread(reader)
            .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
            .map_err(|e| e.to_string()),
        RdfFormat::Turtle => sophia::turtle::parser::turtle::parse_bufread(reader)
            .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
            .map_err(|e| e.to_string()),
        RdfFormat::RdfXml => sophia::xml::parser::parse_bufread(reader)
            .try_for_each_triple(|t| sink(t.s().to_string(), t.p().to_string(), t.o().to_string()))
            .map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| LoadError::Parse { format, message })?;

    Ok(graph)
}

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

fn parse_term_display(term: &str) -> Result<Term, TermSinkError> {
    let s = term.trim();

    if let Some(iri) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(Term::Iri(iri.to_string()));
    }

    if let Some(label) = s.strip_prefix("_:") {
        return Ok(Term::Blank(label.to_string()));
    }

    if s.starts_with('"') {
        let mut end_quote = None;
        let mut escaped = false;
        for (i, ch) in s.char_indices().skip(1) {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => {
                    end_quote = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end_quote else {
            return Err(TermSinkError(format!(
                "invalid literal term (missing closing quote): {s}"
            )));
        };

        let lexical = unescape_rdf_string(&s[1..end]);
        let rest = s[end + 1..].trim();

        let mut literal = Literal::plain(lexical);
        if let Some(lang) = rest.strip_prefix('@') {
            literal.language = Some(lang.to_string());
        } else if let Some(dt) = rest.strip_prefix("^^") {
            let dt = dt.trim();
            let dt = dt
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(dt);
            if !dt.is_empty() {
                literal.datatype = Some(dt.to_string());
            }
        }
        return Ok(Term::Literal(literal));
    }

    Err(TermSinkError(format!("unsupported RDF term form: {s}")))
}
