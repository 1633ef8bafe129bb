//! The synthesis pipeline: classes × properties → drafts → shapes.

use crate::config::{AbortPolicy, ConfigError, PrefixMap, SynthesisConfig};
use crate::draft::{draft, DraftError};
use crate::graph::{namespace_of, Graph, Term};
use crate::inspect::SchemaInspector;
use crate::loader::LoadError;
use crate::materialize::ShapeMaterializer;
use crate::refine::{refine_draft, RefineError, RefinementSession};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Draft(#[from] DraftError),
    #[error(transparent)]
    Refine(#[from] RefineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisReport {
    pub node_shapes: usize,
    pub property_shapes: usize,
    pub refined_pairs: usize,
    pub skipped_pairs: usize,
    /// Why the operator session ended early, if it did.
    pub aborted: Option<String>,
}

#[derive(Debug)]
pub struct Synthesis {
    pub shapes: Graph,
    pub prefixes: PrefixMap,
    pub report: SynthesisReport,
}

/// A named class together with a property whose domain includes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPair {
    pub class: Term,
    pub property: Term,
}

pub struct Synthesizer<'a> {
    ontology: &'a Graph,
    config: &'a SynthesisConfig,
}

impl<'a> Synthesizer<'a> {
    pub fn new(ontology: &'a Graph, config: &'a SynthesisConfig) -> Self {
        Self { ontology, config }
    }

    /// Every (class, property-in-domain) pair, classes then properties in
    /// term order. Anonymous classes are left out.
    pub fn domain_pairs(&self) -> Vec<DomainPair> {
        let inspector = SchemaInspector::new(self.ontology);

        // Properties are visited in term order, so each list stays sorted.
        let mut by_class: HashMap<Term, Vec<Term>> = HashMap::new();
        for property in inspector.properties().all() {
            for domain in inspector.domains(&property) {
                by_class.entry(domain).or_default().push(property.clone());
            }
        }

        let mut pairs = Vec::new();
        for class in inspector.classes() {
            if !matches!(class, Term::Iri(_)) {
                tracing::debug!(class = %class, "skipping anonymous class");
                continue;
            }
            let Some(properties) = by_class.remove(&class) else {
                continue;
            };
            pairs.extend(properties.into_iter().map(|property| DomainPair {
                class: class.clone(),
                property,
            }));
        }
        pairs
    }

    /// Namespace of the first named class, bound under `ontology_prefix`.
    fn ontology_namespace(&self) -> Option<String> {
        SchemaInspector::new(self.ontology)
            .classes()
            .into_iter()
            .find_map(|c| c.as_iri().map(|iri| namespace_of(iri).to_string()))
            .filter(|ns| !ns.is_empty())
    }

    pub fn run(&self, session: &mut dyn RefinementSession) -> Result<Synthesis, SynthesisError> {
        let inspector = SchemaInspector::new(self.ontology);
        let prefixes = self
            .config
            .prefix_map(self.ontology_namespace().as_deref())?;

        let mut shapes = Graph::new();
        let mut materializer = ShapeMaterializer::new();
        let mut report = SynthesisReport::default();

        for pair in self.domain_pairs() {
            let aborted = report.aborted.is_some();
            if aborted && self.config.abort_policy == AbortPolicy::SkipRemaining {
                report.skipped_pairs += 1;
                continue;
            }

            let mut drafted = draft(
                &inspector,
                &pair.class,
                &pair.property,
                self.config.range_policy,
            )?;

            if !aborted
                && session.has_operator()
                && self.config.refine_scope.includes(&pair.property)
            {
                match refine_draft(&mut drafted, &pair.class, &pair.property, session) {
                    Ok(()) => report.refined_pairs += 1,
                    Err(RefineError::Aborted { reason }) => {
                        tracing::info!(
                            class = %pair.class,
                            property = %pair.property,
                            reason = %reason,
                            "refinement aborted"
                        );
                        report.aborted = Some(reason);
                        report.skipped_pairs += 1;
                        continue;
                    }
                    Err(err) => return Err(err.into()),
                }
            }

            materializer.materialize(&mut shapes, &pair.class, &pair.property, &drafted);
            report.property_shapes += 1;
        }

        if self.config.emit_empty_node_shapes {
            for class in inspector.classes() {
                if matches!(class, Term::Iri(_)) {
                    materializer.ensure_node_shape(&mut shapes, &class);
                }
            }
        }
        report.node_shapes = materializer.node_shape_count();

        tracing::info!(
            node_shapes = report.node_shapes,
            property_shapes = report.property_shapes,
            refined = report.refined_pairs,
            skipped = report.skipped_pairs,
            triples = shapes.len(),
            "synthesized shapes graph"
        );

        Ok(Synthesis {
            shapes,
            prefixes,
            report,
        })
    }
}
