use std::collections::BTreeMap;

use crate::error::ProcessorError;
use crate::utils::{is_absolute_iri, is_simple_local_name};

pub const DEFAULT_PREFIXES: [(&str, &str); 5] = [
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("bibo", "http://purl.org/ontology/bibo/"),
];

/// Short name → namespace IRI table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prefixes(BTreeMap<String, String>);

impl Prefixes {
    /// Defaults, then the run-internal `col`/`val` namespaces, then user prefixes on top.
    pub fn build(user: &BTreeMap<String, String>, base_iri: &str) -> Self {
        let mut table: BTreeMap<String, String> = DEFAULT_PREFIXES
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        table.insert("col".to_string(), format!("{}column/", base_iri));
        table.insert("val".to_string(), format!("{}value/", base_iri));
        for (prefix, namespace) in user {
            table.insert(prefix.clone(), namespace.clone());
        }
        Self(table)
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.0.get(prefix).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Expand a CURIE or pass an absolute IRI through. `what` names the
    /// mapping field for error messages.
    pub fn expand(&self, term: &str, what: &str) -> Result<String, ProcessorError> {
        let term = term.trim();
        if is_absolute_iri(term) {
            return Ok(term.to_string());
        }
        match term.split_once(':') {
            Some((prefix, local)) => match self.0.get(prefix) {
                Some(namespace) => Ok(format!("{}{}", namespace, local)),
                None => Err(ProcessorError::InvalidMapping(format!(
                    "Unknown prefix '{}' in {} '{}'. Declare it under \"prefixes\" or use an absolute IRI",
                    prefix, what, term
                ))),
            },
            None => Err(ProcessorError::InvalidMapping(format!(
                "{} '{}' is neither a prefixed name nor an absolute IRI",
                what, term
            ))),
        }
    }

    /// Longest matching namespace wins; only returns names whose local part
    /// is writable without escaping.
    pub fn compact<'a>(&'a self, iri: &'a str) -> Option<(&'a str, &'a str)> {
        self.0
            .iter()
            .filter(|(_, namespace)| iri.starts_with(namespace.as_str()))
            .max_by_key(|(_, namespace)| namespace.len())
            .map(|(prefix, namespace)| (prefix.as_str(), &iri[namespace.len()..]))
            .filter(|(_, local)| is_simple_local_name(local))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> Prefixes {
        let mut user = BTreeMap::new();
        user.insert("dct".to_string(), "http://purl.org/dc/terms/".to_string());
        Prefixes::build(&user, "http://example.org/resource/")
    }

    #[test]
    fn test_expand() {
        let prefixes = prefixes();
        assert_eq!(
            prefixes.expand("dct:title", "predicate").unwrap(),
            "http://purl.org/dc/terms/title"
        );
        assert_eq!(
            prefixes.expand("col:Source_title", "predicate").unwrap(),
            "http://example.org/resource/column/Source_title"
        );
        assert_eq!(
            prefixes.expand("https://schema.org/url", "predicate").unwrap(),
            "https://schema.org/url"
        );
    }

    #[test]
    fn test_unknown_prefix_is_fatal() {
        let err = prefixes().expand("foaf:name", "predicate").unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidMapping(_)));
        assert!(prefixes().expand("title", "predicate").is_err());
    }

    #[test]
    fn test_compact() {
        let prefixes = prefixes();
        assert_eq!(
            prefixes.compact("http://purl.org/dc/terms/title"),
            Some(("dct", "title"))
        );
        assert_eq!(
            prefixes.compact("http://example.org/resource/value/Source%20title/IEEE"),
            None
        );
        assert_eq!(prefixes.compact("http://unknown.org/x"), None);
    }
}
