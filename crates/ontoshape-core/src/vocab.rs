//! IRIs of the RDF, RDFS, OWL, XSD and SHACL vocabularies used by the engine.

use std::ops::RangeInclusive;

pub mod rdf {
    pub const NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
    pub const REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
    pub const NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
    pub const LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
}

pub mod rdfs {
    pub const NS: &str = "http://www.w3.org/2000/01/rdf-schema#";
    pub const CLASS: &str = "http://www.w3.org/2000/01/rdf-schema#Class";
    pub const DOMAIN: &str = "http://www.w3.org/2000/01/rdf-schema#domain";
    pub const RANGE: &str = "http://www.w3.org/2000/01/rdf-schema#range";
    pub const LITERAL: &str = "http://www.w3.org/2000/01/rdf-schema#Literal";
}

pub mod owl {
    pub const NS: &str = "http://www.w3.org/2002/07/owl#";
    pub const CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
    pub const OBJECT_PROPERTY: &str = "http://www.w3.org/2002/07/owl#ObjectProperty";
    pub const DATATYPE_PROPERTY: &str = "http://www.w3.org/2002/07/owl#DatatypeProperty";
    pub const FUNCTIONAL_PROPERTY: &str = "http://www.w3.org/2002/07/owl#FunctionalProperty";
    pub const INVERSE_OF: &str = "http://www.w3.org/2002/07/owl#inverseOf";
    pub const ONE_OF: &str = "http://www.w3.org/2002/07/owl#oneOf";
}

pub mod xsd {
    pub const NS: &str = "http://www.w3.org/2001/XMLSchema#";
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const NORMALIZED_STRING: &str = "http://www.w3.org/2001/XMLSchema#normalizedString";
    pub const TOKEN: &str = "http://www.w3.org/2001/XMLSchema#token";
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const INT: &str = "http://www.w3.org/2001/XMLSchema#int";
    pub const LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
    pub const SHORT: &str = "http://www.w3.org/2001/XMLSchema#short";
    pub const BYTE: &str = "http://www.w3.org/2001/XMLSchema#byte";
    pub const NON_NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";
    pub const POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#positiveInteger";
    pub const NON_POSITIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonPositiveInteger";
    pub const NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#negativeInteger";
    pub const UNSIGNED_LONG: &str = "http://www.w3.org/2001/XMLSchema#unsignedLong";
    pub const UNSIGNED_INT: &str = "http://www.w3.org/2001/XMLSchema#unsignedInt";
    pub const UNSIGNED_SHORT: &str = "http://www.w3.org/2001/XMLSchema#unsignedShort";
    pub const UNSIGNED_BYTE: &str = "http://www.w3.org/2001/XMLSchema#unsignedByte";
    pub const DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
}

pub mod sh {
    pub const NS: &str = "http://www.w3.org/ns/shacl#";
    pub const NODE_SHAPE: &str = "http://www.w3.org/ns/shacl#NodeShape";
    pub const PROPERTY_SHAPE: &str = "http://www.w3.org/ns/shacl#PropertyShape";
    pub const TARGET_CLASS: &str = "http://www.w3.org/ns/shacl#targetClass";
    pub const PROPERTY: &str = "http://www.w3.org/ns/shacl#property";
    pub const PATH: &str = "http://www.w3.org/ns/shacl#path";
    pub const DATATYPE: &str = "http://www.w3.org/ns/shacl#datatype";
    pub const CLASS: &str = "http://www.w3.org/ns/shacl#class";
    pub const MIN_COUNT: &str = "http://www.w3.org/ns/shacl#minCount";
    pub const MAX_COUNT: &str = "http://www.w3.org/ns/shacl#maxCount";
    pub const MIN_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#minInclusive";
    pub const MAX_INCLUSIVE: &str = "http://www.w3.org/ns/shacl#maxInclusive";
    pub const MIN_LENGTH: &str = "http://www.w3.org/ns/shacl#minLength";
    pub const MAX_LENGTH: &str = "http://www.w3.org/ns/shacl#maxLength";
    pub const IN: &str = "http://www.w3.org/ns/shacl#in";
}

/// Literal families that unlock datatype-specific refinement questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Integer,
    String,
    Date,
}

impl LiteralKind {
    pub fn of(datatype: &str) -> Option<Self> {
        match datatype {
            xsd::INTEGER
            | xsd::INT
            | xsd::LONG
            | xsd::SHORT
            | xsd::BYTE
            | xsd::NON_NEGATIVE_INTEGER
            | xsd::POSITIVE_INTEGER
            | xsd::NON_POSITIVE_INTEGER
            | xsd::NEGATIVE_INTEGER
            | xsd::UNSIGNED_LONG
            | xsd::UNSIGNED_INT
            | xsd::UNSIGNED_SHORT
            | xsd::UNSIGNED_BYTE => Some(LiteralKind::Integer),
            xsd::STRING | xsd::NORMALIZED_STRING | xsd::TOKEN => Some(LiteralKind::String),
            xsd::DATE => Some(LiteralKind::Date),
            _ => None,
        }
    }
}

/// True when `iri` lives in a namespace that defines literal datatypes
/// (XSD, or `rdf:langString` / `rdfs:Literal`).
/// Value space of a bounded XSD integer type. `None` for `xsd:integer` and
/// anything that is not an integer type.
pub fn integer_value_space(datatype: &str) -> Option<RangeInclusive<i128>> {
    let space: RangeInclusive<i128> = match datatype {
        xsd::LONG => i64::MIN.into()..=i64::MAX.into(),
        xsd::INT => i32::MIN.into()..=i32::MAX.into(),
        xsd::SHORT => i16::MIN.into()..=i16::MAX.into(),
        xsd::BYTE => i8::MIN.into()..=i8::MAX.into(),
        xsd::UNSIGNED_LONG => 0..=u64::MAX.into(),
        xsd::UNSIGNED_INT => 0..=u32::MAX.into(),
        xsd::UNSIGNED_SHORT => 0..=u16::MAX.into(),
        xsd::UNSIGNED_BYTE => 0..=u8::MAX.into(),
        xsd::NON_NEGATIVE_INTEGER => 0..=i128::MAX,
        xsd::POSITIVE_INTEGER => 1..=i128::MAX,
        xsd::NON_POSITIVE_INTEGER => i128::MIN..=0,
        xsd::NEGATIVE_INTEGER => i128::MIN..=-1,
        _ => return None,
    };
    Some(space)
}

pub fn is_known_datatype(iri: &str) -> bool {
    iri.starts_with(xsd::NS) || iri == rdfs::LITERAL || iri == rdf::LANG_STRING
}
