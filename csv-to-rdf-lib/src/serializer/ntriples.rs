use crate::graph::{Graph, Literal, Term};

use super::{escape_iri, escape_string};

fn literal(literal: &Literal) -> String {
    let lexical = format!("\"{}\"", escape_string(&literal.value));
    match (&literal.lang, &literal.datatype) {
        (Some(lang), _) => format!("{}@{}", lexical, lang),
        (None, Some(datatype)) => format!("{}^^<{}>", lexical, escape_iri(datatype)),
        (None, None) => lexical,
    }
}

pub fn serialize(graph: &Graph) -> String {
    let mut out = String::new();
    for statement in graph.by_subject().values().flatten() {
        let object = match &statement.object {
            Term::Iri(iri) => format!("<{}>", escape_iri(iri)),
            Term::Literal(l) => literal(l),
        };
        out.push_str(&format!(
            "<{}> <{}> {} .\n",
            escape_iri(&statement.subject),
            escape_iri(&statement.predicate),
            object
        ));
    }
    out
}
