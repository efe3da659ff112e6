use std::sync::Arc;

use dashmap::DashMap;

use crate::graph::{
    Entity, EntityKind, Literal, Statement, RDFS_LABEL, SKOS_CONCEPT, SKOS_CONCEPT_SCHEME,
    SKOS_IN_SCHEME, SKOS_PREF_LABEL,
};
use crate::utils::encode_segment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogTerm {
    pub iri: String,
    pub column: String,
    /// Trimmed, case-preserved value; the identity key within the column.
    pub label: String,
    pub scheme: String,
}

impl CatalogTerm {
    /// Statements that describe the term itself.
    pub fn statements(&self, lang: &str) -> Vec<Statement> {
        vec![
            Statement::type_of(&self.iri, SKOS_CONCEPT),
            Statement::literal(
                &self.iri,
                SKOS_PREF_LABEL,
                Literal::tagged(self.label.clone(), lang),
            ),
            Statement::link(&self.iri, SKOS_IN_SCHEME, &self.scheme),
        ]
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(
            self.iri.clone(),
            EntityKind::CatalogTerm(self.column.clone()),
            vec![SKOS_CONCEPT.to_string()],
        )
    }
}

#[derive(Debug, Clone)]
pub struct CatalogLookup {
    pub term: Arc<CatalogTerm>,
    /// True for the one lookup that created the term.
    pub created: bool,
}

/// Promotes catalog column values to shared controlled-vocabulary terms.
#[derive(Debug)]
pub struct CatalogBuilder {
    base_iri: String,
    lang: String,
    terms: DashMap<(String, String), Arc<CatalogTerm>>,
}

impl CatalogBuilder {
    pub fn new(base_iri: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            base_iri: base_iri.into(),
            lang: lang.into(),
            terms: DashMap::new(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn scheme_iri(&self, column: &str) -> String {
        format!("{}scheme/{}", self.base_iri, encode_segment(column))
    }

    /// Concept scheme grouping the terms of one catalog column.
    pub fn scheme_statements(&self, column: &str) -> Vec<Statement> {
        let scheme = self.scheme_iri(column);
        vec![
            Statement::type_of(&scheme, SKOS_CONCEPT_SCHEME),
            Statement::literal(&scheme, RDFS_LABEL, Literal::tagged(column, &self.lang)),
        ]
    }

    pub fn scheme_entity(&self, column: &str) -> Entity {
        Entity::new(
            self.scheme_iri(column),
            EntityKind::CatalogScheme(column.to_string()),
            vec![SKOS_CONCEPT_SCHEME.to_string()],
        )
    }

    /// Create-or-return the term for `raw_value` in `column`. Blank values
    /// have no term.
    pub fn term(&self, column: &str, raw_value: &str) -> Option<CatalogLookup> {
        let label = raw_value.trim();
        if label.is_empty() {
            return None;
        }
        let mut created = false;
        let term = self
            .terms
            .entry((column.to_string(), label.to_string()))
            .or_insert_with(|| {
                created = true;
                Arc::new(CatalogTerm {
                    iri: format!(
                        "{}value/{}/{}",
                        self.base_iri,
                        encode_segment(column),
                        encode_segment(label)
                    ),
                    column: column.to_string(),
                    label: label.to_string(),
                    scheme: self.scheme_iri(column),
                })
            })
            .value()
            .clone();
        if created {
            tracing::debug!("New catalog term in '{}': {}", column, label);
        }
        Some(CatalogLookup { term, created })
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}
