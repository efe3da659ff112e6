mod jsonld;
mod ntriples;
mod rdfxml;
mod turtle;

use std::fmt::Display;
use std::str::FromStr;

use crate::error::ProcessorError;
use crate::graph::Graph;
use crate::mapping::Prefixes;

pub use jsonld::{JsonLdDocument, JsonLdNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Turtle,
    NTriples,
    RdfXml,
    JsonLd,
}

impl OutputFormat {
    pub fn from_tag(tag: &str) -> Result<Self, ProcessorError> {
        match tag.trim().to_lowercase().as_str() {
            "turtle" | "ttl" => Ok(OutputFormat::Turtle),
            "nt" | "ntriples" | "n-triples" => Ok(OutputFormat::NTriples),
            "xml" | "rdfxml" | "rdf/xml" | "pretty-xml" => Ok(OutputFormat::RdfXml),
            "json-ld" | "jsonld" => Ok(OutputFormat::JsonLd),
            other => Err(ProcessorError::InvalidMapping(format!(
                "Unknown output format '{}'. Expected one of: turtle, nt, xml, json-ld",
                other
            ))),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Turtle => "ttl",
            OutputFormat::NTriples => "nt",
            OutputFormat::RdfXml => "rdf",
            OutputFormat::JsonLd => "jsonld",
        }
    }

    /// Render `graph`; prefixes are only used to shorten names.
    pub fn serialize(&self, graph: &Graph, prefixes: &Prefixes) -> Result<String, ProcessorError> {
        tracing::debug!("Serializing {} statements as {}", graph.len(), self);
        match self {
            OutputFormat::Turtle => Ok(turtle::serialize(graph, prefixes)),
            OutputFormat::NTriples => Ok(ntriples::serialize(graph)),
            OutputFormat::RdfXml => rdfxml::serialize(graph, prefixes),
            OutputFormat::JsonLd => jsonld::serialize(graph, prefixes),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ProcessorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag(s)
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Turtle => write!(f, "turtle"),
            OutputFormat::NTriples => write!(f, "nt"),
            OutputFormat::RdfXml => write!(f, "xml"),
            OutputFormat::JsonLd => write!(f, "json-ld"),
        }
    }
}

/// Escape a literal's lexical form for a double-quoted N-Triples/Turtle string.
pub(crate) fn escape_string(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Escape the characters an IRIREF may not contain.
pub(crate) fn escape_iri(iri: &str) -> String {
    let mut escaped = String::with_capacity(iri.len());
    for c in iri.chars() {
        match c {
            '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\' => {
                escaped.push_str(&format!("\\u{:04X}", c as u32))
            }
            c if c <= ' ' => escaped.push_str(&format!("\\u{:04X}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}
