//! Identity-keyed registry of graph resources.
//!
//! Every IRI the projector emits for a record or a template sub-entity comes
//! from here. A key is created at most once per run, even when records are
//! projected on several threads at the same time.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;

use crate::graph::{Entity, EntityKind};
use crate::mapping::CompiledTemplate;
use crate::utils::{encode_segment, is_http_iri};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub kind: EntityKind,
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("blank identifier for {0}")]
    BlankIdentifier(EntityKind),
}

#[derive(Debug, Clone)]
pub struct Resolved {
    pub entity: Arc<Entity>,
    /// True for the one call that created the entity.
    pub created: bool,
}

impl Resolved {
    pub fn iri(&self) -> &str {
        &self.entity.iri
    }
}

#[derive(Debug)]
pub struct EntityResolver {
    base_iri: String,
    entity_base_iri: String,
    registry: DashMap<EntityKey, Arc<Entity>>,
}

impl EntityResolver {
    pub fn new(base_iri: impl Into<String>, entity_base_iri: impl Into<String>) -> Self {
        Self {
            base_iri: base_iri.into(),
            entity_base_iri: entity_base_iri.into(),
            registry: DashMap::new(),
        }
    }

    /// IRI of the record with primary key `key`. Keys that are already
    /// absolute http(s) IRIs are used verbatim.
    pub fn record_iri(&self, key: &str) -> String {
        let key = key.trim();
        if is_http_iri(key) {
            key.to_string()
        } else {
            format!("{}{}", self.base_iri, encode_segment(key))
        }
    }

    /// Create-or-return the primary resource of a record.
    pub fn resolve_record(&self, key: &str, classes: &[String]) -> Result<Resolved, ResolveError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ResolveError::BlankIdentifier(EntityKind::Record));
        }
        self.resolve(
            EntityKey {
                kind: EntityKind::Record,
                identifier: key.to_string(),
            },
            || Entity::new(self.record_iri(key), EntityKind::Record, classes.to_vec()),
        )
    }

    /// Create-or-return the sub-entity of `template` for `identifier`.
    /// `value` is the split source value; it only feeds the path when the
    /// template has no separate identifier source, in which case the two are equal.
    pub fn resolve_template(
        &self,
        template: &CompiledTemplate,
        identifier: &str,
        value: &str,
    ) -> Result<Resolved, ResolveError> {
        let kind = EntityKind::Template(template.name.clone());
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ResolveError::BlankIdentifier(kind));
        }
        let key = EntityKey {
            kind: kind.clone(),
            identifier: identifier.to_string(),
        };
        self.resolve(key, || {
            let path = template.path.render(&template.name, identifier, value);
            Entity::new(
                format!("{}{}", self.entity_base_iri, path),
                kind,
                template.types.clone(),
            )
        })
    }

    fn resolve(
        &self,
        key: EntityKey,
        mint: impl FnOnce() -> Entity,
    ) -> Result<Resolved, ResolveError> {
        let mut created = false;
        // The shard lock is held while `mint` runs, so concurrent callers with
        // the same key wait and then observe the entity created here.
        let entity = self
            .registry
            .entry(key)
            .or_insert_with(|| {
                created = true;
                Arc::new(mint())
            })
            .value()
            .clone();
        Ok(Resolved { entity, created })
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{MappingSpec, PathTemplate};

    fn template(path: &str) -> CompiledTemplate {
        CompiledTemplate {
            name: "Authors".to_string(),
            source_column: "Authors".to_string(),
            separator: Some(";".to_string()),
            path: PathTemplate::parse(path).unwrap(),
            id_source: None,
            types: vec!["http://xmlns.com/foaf/0.1/Person".to_string()],
            link_predicate: "http://purl.org/dc/terms/creator".to_string(),
            inverse_predicate: None,
            literals: Vec::new(),
        }
    }

    fn resolver() -> EntityResolver {
        EntityResolver::new("http://example.org/resource/", "http://example.org/")
    }

    #[test]
    fn test_same_identifier_resolves_to_one_entity() {
        let resolver = resolver();
        let template = template("author/{id}");
        let first = resolver.resolve_template(&template, "57123", "Smith J.").unwrap();
        let second = resolver.resolve_template(&template, " 57123 ", "Smith John").unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.iri(), "http://example.org/author/57123");
        assert_eq!(first.iri(), second.iri());
        assert_eq!(resolver.len(), 1);
    }

    #[test]
    fn test_identity_includes_template() {
        let resolver = resolver();
        let authors = template("{template}/{id}");
        let mut editors = template("{template}/{id}");
        editors.name = "Editors".to_string();

        let a = resolver.resolve_template(&authors, "1", "1").unwrap();
        let e = resolver.resolve_template(&editors, "1", "1").unwrap();
        assert_ne!(a.iri(), e.iri());
        assert_eq!(resolver.len(), 2);
    }

    #[test]
    fn test_blank_identifier_fails() {
        let resolver = resolver();
        let err = resolver.resolve_template(&template("author/{id}"), "  ", "").unwrap_err();
        assert_eq!(
            err,
            ResolveError::BlankIdentifier(EntityKind::Template("Authors".to_string()))
        );
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_identifiers_are_percent_encoded() {
        let resolver = resolver();
        let resolved = resolver
            .resolve_template(&template("author/{id}"), "a/b c", "a/b c")
            .unwrap();
        assert_eq!(resolved.iri(), "http://example.org/author/a%2Fb%20c");
    }

    #[test]
    fn test_record_iri() {
        let resolver = resolver();
        assert_eq!(
            resolver.record_iri("2-s2.0-85123"),
            "http://example.org/resource/2-s2.0-85123"
        );
        assert_eq!(
            resolver.record_iri("https://doi.org/10.1000/1"),
            "https://doi.org/10.1000/1"
        );
        let record = resolver
            .resolve_record("2-s2.0-85123", &["http://purl.org/ontology/bibo/Article".into()])
            .unwrap();
        assert!(record.created);
        assert!(!resolver.resolve_record("2-s2.0-85123", &[]).unwrap().created);
        assert!(resolver.resolve_record(" ", &[]).is_err());
    }

    #[test]
    fn test_concurrent_resolution_creates_once() {
        let spec = MappingSpec::from_json_str(
            r#"{ "primary_key": "EID", "entity_templates": { "Authors": { "link_predicate": "bibo:authorList" } } }"#,
        )
        .unwrap();
        let mapping = spec.validate().unwrap();
        let template = &mapping.templates[0];
        let resolver = resolver();

        let created: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        (0..100)
                            .filter(|i| {
                                resolver
                                    .resolve_template(template, &format!("id-{}", i % 10), "")
                                    .unwrap()
                                    .created
                            })
                            .count()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(created, 10);
        assert_eq!(resolver.len(), 10);
    }
}
