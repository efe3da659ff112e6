use std::collections::BTreeMap;

use crate::error::ProcessorError;
use crate::graph::{Graph, Term};
use crate::mapping::Prefixes;
use crate::utils::split_xml_name;

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

fn escape_xml(value: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Namespace declarations for every predicate, reusing the prefix table
/// where possible and generating `ns<N>` names otherwise.
struct Namespaces {
    by_namespace: BTreeMap<String, String>,
    generated: usize,
}

impl Namespaces {
    fn new() -> Self {
        let mut by_namespace = BTreeMap::new();
        by_namespace.insert(RDF_NS.to_string(), "rdf".to_string());
        Self {
            by_namespace,
            generated: 0,
        }
    }

    fn qname(&mut self, predicate: &str, prefixes: &Prefixes) -> Result<String, ProcessorError> {
        if let Some((prefix, local)) = prefixes.compact(predicate) {
            if let Some(namespace) = prefixes.get(prefix) {
                self.by_namespace
                    .entry(namespace.to_string())
                    .or_insert_with(|| prefix.to_string());
                let prefix = &self.by_namespace[namespace];
                return Ok(format!("{}:{}", prefix, local));
            }
        }
        let (namespace, local) = split_xml_name(predicate).ok_or_else(|| {
            ProcessorError::Processing(format!(
                "Predicate <{}> cannot be written as an RDF/XML element name",
                predicate
            ))
        })?;
        if !self.by_namespace.contains_key(namespace) {
            let prefix = format!("ns{}", self.generated);
            self.generated += 1;
            self.by_namespace.insert(namespace.to_string(), prefix);
        }
        Ok(format!("{}:{}", self.by_namespace[namespace], local))
    }
}

pub fn serialize(graph: &Graph, prefixes: &Prefixes) -> Result<String, ProcessorError> {
    let mut namespaces = Namespaces::new();
    let mut body = String::new();

    for (subject, statements) in graph.by_subject() {
        body.push_str(&format!(
            "  <rdf:Description rdf:about=\"{}\">\n",
            escape_xml(subject, true)
        ));
        for statement in statements {
            let element = namespaces.qname(&statement.predicate, prefixes)?;
            match &statement.object {
                Term::Iri(iri) => body.push_str(&format!(
                    "    <{} rdf:resource=\"{}\"/>\n",
                    element,
                    escape_xml(iri, true)
                )),
                Term::Literal(literal) => {
                    let attribute = match (&literal.lang, &literal.datatype) {
                        (Some(lang), _) => format!(" xml:lang=\"{}\"", escape_xml(lang, true)),
                        (None, Some(datatype)) => {
                            format!(" rdf:datatype=\"{}\"", escape_xml(datatype, true))
                        }
                        (None, None) => String::new(),
                    };
                    body.push_str(&format!(
                        "    <{}{}>{}</{}>\n",
                        element,
                        attribute,
                        escape_xml(&literal.value, false),
                        element
                    ));
                }
            }
        }
        body.push_str("  </rdf:Description>\n");
    }

    let mut declarations: Vec<(&String, &String)> = namespaces
        .by_namespace
        .iter()
        .map(|(namespace, prefix)| (prefix, namespace))
        .collect();
    declarations.sort();

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<rdf:RDF");
    for (prefix, namespace) in declarations {
        out.push_str(&format!(
            "\n   xmlns:{}=\"{}\"",
            prefix,
            escape_xml(namespace, true)
        ));
    }
    out.push_str(">\n");
    out.push_str(&body);
    out.push_str("</rdf:RDF>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Literal, Statement};

    fn prefixes() -> Prefixes {
        let mut user = BTreeMap::new();
        user.insert("dct".to_string(), "http://purl.org/dc/terms/".to_string());
        Prefixes::build(&user, "http://example.org/resource/")
    }

    #[test]
    fn test_description_per_subject() {
        let subject = "http://example.org/resource/e1";
        let mut graph = Graph::new();
        graph.insert(Statement::type_of(subject, "http://purl.org/ontology/bibo/Article"));
        graph.insert(Statement::literal(
            subject,
            "http://purl.org/dc/terms/title",
            Literal::tagged("Graphs & Trees", "en"),
        ));
        graph.insert(Statement::literal(
            subject,
            "http://schema.org/datePublished",
            Literal::typed("2021", Some("http://www.w3.org/2001/XMLSchema#gYear".into())),
        ));

        let out = serialize(&graph, &prefixes()).unwrap();
        assert!(out.contains("xmlns:dct=\"http://purl.org/dc/terms/\""));
        assert!(out.contains("xmlns:ns0=\"http://schema.org/\""));
        assert!(out.contains("<rdf:Description rdf:about=\"http://example.org/resource/e1\">"));
        assert!(out.contains("<rdf:type rdf:resource=\"http://purl.org/ontology/bibo/Article\"/>"));
        assert!(out.contains("<dct:title xml:lang=\"en\">Graphs &amp; Trees</dct:title>"));
        assert!(out.contains(
            "<ns0:datePublished rdf:datatype=\"http://www.w3.org/2001/XMLSchema#gYear\">2021</ns0:datePublished>"
        ));
        assert!(out.ends_with("</rdf:RDF>\n"));
    }

    #[test]
    fn test_predicate_with_leading_digits() {
        let subject = "http://example.org/resource/e1";
        let mut graph = Graph::new();
        graph.insert(Statement::literal(
            subject,
            "http://example.org/resource/column/2019_Impact",
            Literal::plain("3.2"),
        ));
        graph.insert(Statement::literal(
            subject,
            "http://example.org/resource/column/Cited_by",
            Literal::plain("12"),
        ));

        let out = serialize(&graph, &prefixes()).unwrap();
        assert!(out.contains("xmlns:ns0=\"http://example.org/resource/column/2019\""));
        assert!(out.contains("<ns0:_Impact>3.2</ns0:_Impact>"));
        assert!(out.contains("<col:Cited_by>12</col:Cited_by>"));
    }

    #[test]
    fn test_unwritable_predicate() {
        let mut graph = Graph::new();
        graph.insert(Statement::link(
            "http://example.org/resource/e1",
            "http://example.org/p/",
            "http://example.org/resource/e2",
        ));
        assert!(serialize(&graph, &prefixes()).is_err());
    }
}
