//! Format-agnostic graph model handed to the serializers.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const SKOS_CONCEPT: &str = "http://www.w3.org/2004/02/skos/core#Concept";
pub const SKOS_CONCEPT_SCHEME: &str = "http://www.w3.org/2004/02/skos/core#ConceptScheme";
pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";
pub const SKOS_IN_SCHEME: &str = "http://www.w3.org/2004/02/skos/core#inScheme";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub value: String,
    pub datatype: Option<String>,
    pub lang: Option<String>,
}

impl Literal {
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: Option<String>) -> Self {
        Self {
            value: value.into(),
            datatype,
            lang: None,
        }
    }

    /// Language-tagged literal; an empty tag yields a plain literal.
    pub fn tagged(value: impl Into<String>, lang: &str) -> Self {
        Self {
            value: value.into(),
            datatype: None,
            lang: (!lang.is_empty()).then(|| lang.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Term {
    Iri(String),
    Literal(Literal),
}

impl Term {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Iri(_) => None,
            Term::Literal(literal) => Some(literal),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Statement {
    pub subject: String,
    pub predicate: String,
    pub object: Term,
}

impl Statement {
    pub fn link(subject: &str, predicate: &str, object: &str) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: Term::Iri(object.to_string()),
        }
    }

    pub fn literal(subject: &str, predicate: &str, literal: Literal) -> Self {
        Self {
            subject: subject.to_string(),
            predicate: predicate.to_string(),
            object: Term::Literal(literal),
        }
    }

    pub fn type_of(subject: &str, class: &str) -> Self {
        Self::link(subject, RDF_TYPE, class)
    }
}

/// What produced a graph resource. Identity of a resource is (kind, identifier).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// The primary resource of an input record.
    Record,
    /// A sub-entity produced by the named entity template.
    Template(String),
    /// A controlled-vocabulary term of the named catalog column.
    CatalogTerm(String),
    /// The concept scheme grouping the terms of a catalog column.
    CatalogScheme(String),
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Record => write!(f, "record"),
            EntityKind::Template(name) => write!(f, "template '{}'", name),
            EntityKind::CatalogTerm(column) => write!(f, "catalog term '{}'", column),
            EntityKind::CatalogScheme(column) => write!(f, "catalog scheme '{}'", column),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub iri: String,
    pub kind: EntityKind,
    pub types: Vec<String>,
}

impl Entity {
    pub fn new(iri: impl Into<String>, kind: EntityKind, types: Vec<String>) -> Self {
        Self {
            iri: iri.into(),
            kind,
            types,
        }
    }
}

/// Accumulated output of a run: every resource plus a deduplicated statement set.
///
/// Both collections are ordered so that serializing the same input twice
/// produces identical output.
#[derive(Debug, Default, Clone)]
pub struct Graph {
    entities: BTreeMap<String, Entity>,
    statements: BTreeSet<Statement>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource; types of an already known IRI are unioned.
    pub fn add_entity(&mut self, entity: Entity) {
        match self.entities.entry(entity.iri.clone()) {
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert(entity);
            }
            std::collections::btree_map::Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                for class in entity.types {
                    if !existing.types.contains(&class) {
                        existing.types.push(class);
                    }
                }
            }
        }
    }

    /// Returns false when the statement was already present.
    pub fn insert(&mut self, statement: Statement) -> bool {
        self.statements.insert(statement)
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Statement>) {
        self.statements.extend(statements);
    }

    pub fn merge(&mut self, other: Graph) {
        for entity in other.entities.into_values() {
            self.add_entity(entity);
        }
        self.statements.extend(other.statements);
    }

    pub fn entity(&self, iri: &str) -> Option<&Entity> {
        self.entities.get(iri)
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.statements.contains(statement)
    }

    /// Statements of one subject, in order.
    pub fn about<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements.iter().filter(move |s| s.subject == subject)
    }

    /// Objects of every `(subject, predicate, _)` statement.
    pub fn objects<'a>(
        &'a self,
        subject: &'a str,
        predicate: &'a str,
    ) -> impl Iterator<Item = &'a Term> + 'a {
        self.about(subject)
            .filter(move |s| s.predicate == predicate)
            .map(|s| &s.object)
    }

    /// Statements pointing at `object`.
    pub fn inbound<'a>(&'a self, object: &'a str) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements
            .iter()
            .filter(move |s| s.object.as_iri() == Some(object))
    }

    /// Subjects grouped with their statements, in subject order. The types of
    /// registered entities are included even when no statement asserts them.
    pub fn by_subject(&self) -> BTreeMap<&str, Vec<Cow<'_, Statement>>> {
        let mut grouped: BTreeMap<&str, Vec<Cow<'_, Statement>>> = BTreeMap::new();
        for statement in &self.statements {
            grouped
                .entry(statement.subject.as_str())
                .or_default()
                .push(Cow::Borrowed(statement));
        }
        for entity in self.entities.values() {
            let missing: Vec<Cow<'_, Statement>> = entity
                .types
                .iter()
                .map(|class| Statement::type_of(&entity.iri, class))
                .filter(|statement| !self.statements.contains(statement))
                .map(Cow::Owned)
                .collect();
            if missing.is_empty() {
                continue;
            }
            let statements = grouped.entry(entity.iri.as_str()).or_default();
            statements.extend(missing);
            statements.sort();
        }
        grouped
    }
}
