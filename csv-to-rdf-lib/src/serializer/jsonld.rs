use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ProcessorError;
use crate::graph::{Graph, Literal, Term, RDF_TYPE};
use crate::mapping::Prefixes;

#[derive(Debug, Serialize, Clone)]
pub struct JsonLdNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type", skip_serializing_if = "Vec::is_empty")]
    pub type_: Vec<String>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl JsonLdNode {
    /// Add a value under `key`, turning a single value into an array on the
    /// second insert.
    fn push(&mut self, key: String, value: Value) {
        match self.properties.entry(key) {
            serde_json::map::Entry::Vacant(entry) => {
                entry.insert(value);
            }
            serde_json::map::Entry::Occupied(mut entry) => {
                match entry.get_mut() {
                    Value::Array(values) => values.push(value),
                    current => {
                        let first = current.take();
                        *current = Value::Array(vec![first, value]);
                    }
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonLdDocument {
    #[serde(rename = "@context")]
    pub context: Map<String, Value>,
    #[serde(rename = "@graph")]
    pub graph: Vec<JsonLdNode>,
}

fn compact(iri: &str, prefixes: &Prefixes) -> String {
    match prefixes.compact(iri) {
        Some((prefix, local)) => format!("{}:{}", prefix, local),
        None => iri.to_string(),
    }
}

fn literal_value(literal: &Literal, prefixes: &Prefixes) -> Value {
    match (&literal.lang, &literal.datatype) {
        (Some(lang), _) => serde_json::json!({ "@value": literal.value, "@language": lang }),
        (None, Some(datatype)) => {
            serde_json::json!({ "@value": literal.value, "@type": compact(datatype, prefixes) })
        }
        (None, None) => Value::String(literal.value.clone()),
    }
}

pub fn build(graph: &Graph, prefixes: &Prefixes) -> JsonLdDocument {
    let context: Map<String, Value> = prefixes
        .iter()
        .map(|(prefix, namespace)| (prefix.to_string(), Value::String(namespace.to_string())))
        .collect();

    let mut nodes = Vec::new();
    for (subject, statements) in graph.by_subject() {
        let mut node = JsonLdNode {
            id: subject.to_string(),
            type_: Vec::new(),
            properties: Map::new(),
        };
        for statement in statements {
            match &statement.object {
                Term::Iri(class) if statement.predicate == RDF_TYPE => {
                    node.type_.push(compact(class, prefixes))
                }
                Term::Iri(iri) => node.push(
                    compact(&statement.predicate, prefixes),
                    serde_json::json!({ "@id": iri }),
                ),
                Term::Literal(literal) => node.push(
                    compact(&statement.predicate, prefixes),
                    literal_value(literal, prefixes),
                ),
            }
        }
        nodes.push(node);
    }

    JsonLdDocument {
        context,
        graph: nodes,
    }
}

pub fn serialize(graph: &Graph, prefixes: &Prefixes) -> Result<String, ProcessorError> {
    let document = build(graph, prefixes);
    serde_json::to_string_pretty(&document).map_err(|e| {
        ProcessorError::Processing(format!("Failed to serialize JSON-LD document: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Statement;
    use std::collections::BTreeMap;

    #[test]
    fn test_nodes_and_context() {
        let mut user = BTreeMap::new();
        user.insert("dct".to_string(), "http://purl.org/dc/terms/".to_string());
        let prefixes = Prefixes::build(&user, "http://example.org/resource/");

        let subject = "http://example.org/resource/e1";
        let mut graph = Graph::new();
        graph.insert(Statement::type_of(subject, "http://purl.org/ontology/bibo/Article"));
        graph.insert(Statement::literal(
            subject,
            "http://purl.org/dc/terms/subject",
            Literal::plain("graphs"),
        ));
        graph.insert(Statement::literal(
            subject,
            "http://purl.org/dc/terms/subject",
            Literal::plain("rdf"),
        ));
        graph.insert(Statement::link(
            subject,
            "http://purl.org/dc/terms/creator",
            "http://example.org/author/57123",
        ));

        let text = serialize(&graph, &prefixes).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["@context"]["dct"], "http://purl.org/dc/terms/");

        let node = &value["@graph"][0];
        assert_eq!(node["@id"], subject);
        assert_eq!(node["@type"], serde_json::json!(["bibo:Article"]));
        assert_eq!(node["dct:subject"], serde_json::json!(["graphs", "rdf"]));
        assert_eq!(
            node["dct:creator"],
            serde_json::json!({ "@id": "http://example.org/author/57123" })
        );
    }
}
