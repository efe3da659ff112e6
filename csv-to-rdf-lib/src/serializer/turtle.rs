use std::borrow::Cow;
use std::collections::BTreeSet;

use crate::graph::{Graph, Literal, Statement, Term, RDF_TYPE};
use crate::mapping::Prefixes;

use super::{escape_iri, escape_string};

struct Writer<'p> {
    prefixes: &'p Prefixes,
    used: BTreeSet<String>,
}

impl<'p> Writer<'p> {
    fn name(&mut self, iri: &str) -> String {
        match self.prefixes.compact(iri) {
            Some((prefix, local)) => {
                self.used.insert(prefix.to_string());
                format!("{}:{}", prefix, local)
            }
            None => format!("<{}>", escape_iri(iri)),
        }
    }

    fn literal(&mut self, literal: &Literal) -> String {
        let lexical = format!("\"{}\"", escape_string(&literal.value));
        match (&literal.lang, &literal.datatype) {
            (Some(lang), _) => format!("{}@{}", lexical, lang),
            (None, Some(datatype)) => format!("{}^^{}", lexical, self.name(datatype)),
            (None, None) => lexical,
        }
    }

    fn object(&mut self, term: &Term) -> String {
        match term {
            Term::Iri(iri) => self.name(iri),
            Term::Literal(l) => self.literal(l),
        }
    }

    fn subject_block(&mut self, subject: &str, statements: &[Cow<'_, Statement>]) -> String {
        let statements: Vec<&Statement> = statements.iter().map(|s| &**s).collect();
        // rdf:type first, then the remaining predicates in order
        let mut ordered: Vec<&Statement> = statements
            .iter()
            .filter(|s| s.predicate == RDF_TYPE)
            .copied()
            .collect();
        ordered.extend(statements.iter().filter(|s| s.predicate != RDF_TYPE).copied());

        let mut predicates: Vec<(String, Vec<String>)> = Vec::new();
        for statement in ordered {
            let predicate = if statement.predicate == RDF_TYPE {
                "a".to_string()
            } else {
                self.name(&statement.predicate)
            };
            let object = self.object(&statement.object);
            match predicates.last_mut() {
                Some((last, objects)) if *last == predicate => objects.push(object),
                _ => predicates.push((predicate, vec![object])),
            }
        }

        let body = predicates
            .iter()
            .map(|(predicate, objects)| format!("{} {}", predicate, objects.join(", ")))
            .collect::<Vec<_>>()
            .join(" ;\n    ");
        format!("{} {} .\n", self.name(subject), body)
    }
}

pub fn serialize(graph: &Graph, prefixes: &Prefixes) -> String {
    let mut writer = Writer {
        prefixes,
        used: BTreeSet::new(),
    };
    let blocks: Vec<String> = graph
        .by_subject()
        .into_iter()
        .map(|(subject, statements)| writer.subject_block(subject, &statements))
        .collect();

    let mut out = String::new();
    for prefix in &writer.used {
        if let Some(namespace) = prefixes.get(prefix) {
            out.push_str(&format!("@prefix {}: <{}> .\n", prefix, escape_iri(namespace)));
        }
    }
    if !writer.used.is_empty() {
        out.push('\n');
    }
    out.push_str(&blocks.join("\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_grouped_and_compacted() {
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
        graph.insert(Statement::literal(
            subject,
            "http://purl.org/dc/terms/issued",
            Literal::typed("2021", Some("http://www.w3.org/2001/XMLSchema#gYear".into())),
        ));

        let out = serialize(&graph, &prefixes);
        assert!(out.starts_with("@prefix bibo: <http://purl.org/ontology/bibo/> .\n"));
        assert!(out.contains("@prefix dct: <http://purl.org/dc/terms/> .\n"));
        assert!(!out.contains("@prefix skos:"));
        assert!(out.contains(
            "<http://example.org/resource/e1> a bibo:Article ;\n    dct:issued \"2021\"^^xsd:gYear ;\n    dct:subject \"graphs\", \"rdf\" .\n"
        ));
    }
}
