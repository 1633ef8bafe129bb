//! Synthesis configuration and namespace bindings.
//!
//! Prefix bindings are explicit values handed to the writer; nothing in the
//! engine keeps global binding state.

use crate::draft::RangePolicy;
use crate::graph::{local_name, Term};
use crate::refine::PromptConfig;
use crate::vocab::{owl, rdf, rdfs, sh, xsd};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid prefix binding `{prefix}` -> `{namespace}`")]
    InvalidPrefix { prefix: String, namespace: String },
}

// ============================================================================
// Prefixes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    bindings: BTreeMap<String, String>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `sh`, `rdf`, `rdfs`, `owl` and `xsd`.
    pub fn standard() -> Self {
        let mut map = Self::new();
        for (prefix, ns) in [
            ("sh", sh::NS),
            ("rdf", rdf::NS),
            ("rdfs", rdfs::NS),
            ("owl", owl::NS),
            ("xsd", xsd::NS),
        ] {
            map.bindings.insert(prefix.to_string(), ns.to_string());
        }
        map
    }

    /// Binds `prefix`, replacing any earlier binding of the same prefix.
    pub fn bind(&mut self, prefix: &str, namespace: &str) -> Result<(), ConfigError> {
        if !is_valid_prefix(prefix) || namespace.is_empty() {
            return Err(ConfigError::InvalidPrefix {
                prefix: prefix.to_string(),
                namespace: namespace.to_string(),
            });
        }
        self.bindings
            .insert(prefix.to_string(), namespace.to_string());
        Ok(())
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    pub fn binds_namespace(&self, namespace: &str) -> bool {
        self.bindings.values().any(|ns| ns == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    /// Splits `iri` into `(prefix, local)` using the longest matching
    /// namespace whose remainder is a safe local name.
    pub fn compact<'a>(&'a self, iri: &'a str) -> Option<(&'a str, &'a str)> {
        self.bindings
            .iter()
            .filter_map(|(prefix, ns)| {
                let local = iri.strip_prefix(ns.as_str())?;
                is_safe_local(local).then_some((prefix.as_str(), ns.len(), local))
            })
            .max_by_key(|(_, len, _)| *len)
            .map(|(prefix, _, local)| (prefix, local))
    }
}

fn is_valid_prefix(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        Some(_) => false,
    }
}

/// A conservative subset of Turtle's `PN_LOCAL`.
fn is_safe_local(local: &str) -> bool {
    let mut chars = local.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

// ============================================================================
// Synthesis options
// ============================================================================

/// Which pairs the operator is asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineScope {
    #[default]
    All,
    /// Only these properties, by local name or full IRI.
    Properties(BTreeSet<String>),
}

impl RefineScope {
    pub fn includes(&self, property: &Term) -> bool {
        match self {
            RefineScope::All => true,
            RefineScope::Properties(names) => match property {
                Term::Iri(iri) => names.contains(iri) || names.contains(local_name(iri)),
                _ => false,
            },
        }
    }
}

/// What happens to the pairs left over after the operator aborts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortPolicy {
    /// Remaining pairs are not drafted or emitted.
    #[default]
    SkipRemaining,
    /// Remaining pairs are emitted with their inferred facets only.
    InferRemaining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Extra prefix bindings for the output, on top of the standard ones.
    pub prefixes: BTreeMap<String, String>,
    /// Prefix bound to the ontology namespace found on the first class.
    pub ontology_prefix: Option<String>,
    pub range_policy: RangePolicy,
    pub abort_policy: AbortPolicy,
    pub refine_scope: RefineScope,
    /// Emit a node shape for every named class, even one without properties.
    pub emit_empty_node_shapes: bool,
    pub prompt: PromptConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            prefixes: BTreeMap::new(),
            ontology_prefix: Some("ex".to_string()),
            range_policy: RangePolicy::default(),
            abort_policy: AbortPolicy::default(),
            refine_scope: RefineScope::default(),
            emit_empty_node_shapes: false,
            prompt: PromptConfig::default(),
        }
    }
}

impl SynthesisConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Standard bindings, then the configured ones, then the ontology
    /// namespace under `ontology_prefix` if neither the prefix nor the
    /// namespace is already taken.
    pub fn prefix_map(&self, ontology_namespace: Option<&str>) -> Result<PrefixMap, ConfigError> {
        let mut map = PrefixMap::standard();
        for (prefix, ns) in &self.prefixes {
            map.bind(prefix, ns)?;
        }
        if let (Some(prefix), Some(ns)) = (&self.ontology_prefix, ontology_namespace) {
            if map.get(prefix).is_none() && !map.binds_namespace(ns) {
                map.bind(prefix, ns)?;
            }
        }
        Ok(map)
    }
}
