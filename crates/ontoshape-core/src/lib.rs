//! SHACL shape synthesis from OWL/RDFS ontologies.
//!
//! The engine reads an ontology graph and writes a shapes graph:
//!
//! - `loader` parses Turtle, N-Triples or RDF/XML (via Sophia) into a [`Graph`].
//! - `inspect` answers schema questions: classes, properties, domains, ranges,
//!   functional axioms, inverses and closed `owl:oneOf` enumerations.
//! - `draft` turns one (class, property) pair into a [`ConstraintDraft`].
//! - `refine` lets an operator add facets through a [`RefinementSession`].
//! - `materialize` writes node and property shapes.
//! - `writer` serializes the result with an explicit [`PrefixMap`].
//!
//! [`Synthesizer`] runs the whole pipeline in a reproducible order.
//!
//! Validation against the produced shapes is out of scope; the output is
//! meant to be fed to a SHACL validator.

pub mod config;
pub mod draft;
pub mod graph;
pub mod inspect;
pub mod loader;
pub mod materialize;
pub mod refine;
pub mod synth;
pub mod vocab;
pub mod writer;

pub use config::{AbortPolicy, ConfigError, PrefixMap, RefineScope, SynthesisConfig};
pub use draft::{ConstraintDraft, DraftError, RangePolicy, ValueConstraint};
pub use graph::{Graph, Literal, Term, Triple};
pub use inspect::{PropertyKind, SchemaInspector};
pub use loader::{load, load_str, LoadError, RdfFormat};
pub use materialize::{PropertyShapeHandle, ShapeMaterializer};
pub use refine::{
    Answer, InferOnly, LineOperator, Operator, PromptConfig, PromptSession, Question,
    RefineError, RefinementSession, ScriptedSession,
};
pub use synth::{Synthesis, SynthesisError, SynthesisReport, Synthesizer};
pub use writer::{write_graph, OutputFormat};
