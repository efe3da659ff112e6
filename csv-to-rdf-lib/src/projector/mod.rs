//! Per-record projection of flat records into graph statements.
//!
//! The projector is pure computation over one materialised record. All node
//! identity goes through the run's [`EntityResolver`] and [`CatalogBuilder`];
//! the projector never builds a resource IRI itself.

pub mod datatype;

use std::collections::HashSet;

use crate::catalog::CatalogBuilder;
use crate::correlator::{split_cell, CorrelationError, MultivalueCorrelator};
use crate::error::ProcessingMessage;
use crate::graph::{Graph, Literal, Statement};
use crate::mapping::{
    ColumnRule, CompiledMapping, CompiledTemplate, IdSource, IndexMismatchPolicy, LiteralRule,
};
use crate::record::Record;
use crate::resolver::EntityResolver;
use crate::utils::safe;

/// Statements and issues produced by one record.
#[derive(Debug, Default)]
pub struct Projection {
    pub row: usize,
    /// IRI of the record's primary resource; `None` when the record was rejected.
    pub subject: Option<String>,
    pub graph: Graph,
    pub messages: Vec<ProcessingMessage>,
}

impl Projection {
    fn rejected(row: usize, message: impl Into<String>) -> Self {
        Self {
            row,
            subject: None,
            graph: Graph::new(),
            messages: vec![ProcessingMessage::rejected(message, row)],
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.subject.is_none()
    }
}

/// One planned instantiation of an entity template.
#[derive(Debug)]
struct Instantiation<'r> {
    index: usize,
    value: &'r str,
    identifier: String,
}

#[derive(Debug)]
struct TemplatePlan<'t, 'r> {
    template: &'t CompiledTemplate,
    instances: Vec<Instantiation<'r>>,
    warnings: Vec<ProcessingMessage>,
    /// Indexes with no correlated identifier.
    mismatched: Vec<usize>,
}

pub struct TripleProjector<'a> {
    mapping: &'a CompiledMapping,
    correlator: MultivalueCorrelator,
    resolver: &'a EntityResolver,
    catalog: &'a CatalogBuilder,
    primary_keys: &'a HashSet<String>,
}

impl<'a> TripleProjector<'a> {
    /// `primary_keys` holds every (trimmed) primary key of the input; relation
    /// columns may only point at those.
    pub fn new(
        mapping: &'a CompiledMapping,
        resolver: &'a EntityResolver,
        catalog: &'a CatalogBuilder,
        primary_keys: &'a HashSet<String>,
    ) -> Self {
        Self {
            mapping,
            correlator: MultivalueCorrelator::from_mapping(mapping),
            resolver,
            catalog,
            primary_keys,
        }
    }

    /// Why `record` would be rejected, decided without touching any registry.
    pub fn rejection(&self, record: &Record) -> Option<String> {
        self.screen(record).err()
    }

    /// Plan every template, or explain why the record is rejected.
    fn screen<'r>(&self, record: &'r Record) -> Result<Vec<TemplatePlan<'a, 'r>>, String> {
        if record.value(&self.mapping.primary_key).trim().is_empty() {
            return Err(format!("Missing primary key '{}'", self.mapping.primary_key));
        }

        let plans: Vec<TemplatePlan> = self
            .mapping
            .templates
            .iter()
            .map(|template| self.plan(template, record))
            .collect();

        if self.mapping.index_mismatch == IndexMismatchPolicy::RejectRecord {
            if let Some(plan) = plans.iter().find(|p| !p.mismatched.is_empty()) {
                return Err(format!(
                    "Template '{}': no '{}' value at index(es) {:?}",
                    plan.template.name,
                    plan.template
                        .id_source
                        .as_ref()
                        .map(|s| s.column.as_str())
                        .unwrap_or_default(),
                    plan.mismatched
                ));
            }
        }
        Ok(plans)
    }

    pub fn project(&self, record: &Record) -> Projection {
        let row = record.row();
        // Screening happens before any registry is touched, so a rejected
        // record leaves no trace.
        let plans = match self.screen(record) {
            Ok(plans) => plans,
            Err(reason) => return Projection::rejected(row, reason),
        };
        let key = record.value(&self.mapping.primary_key).trim();

        let resolved = match self.resolver.resolve_record(key, &self.mapping.classes) {
            Ok(resolved) => resolved,
            Err(e) => return Projection::rejected(row, e.to_string()),
        };
        let subject = resolved.iri().to_string();

        let mut projection = Projection {
            row,
            subject: Some(subject.clone()),
            graph: Graph::new(),
            messages: Vec::new(),
        };
        projection.graph.add_entity(resolved.entity.as_ref().clone());
        for class in &self.mapping.classes {
            projection.graph.insert(Statement::type_of(&subject, class));
        }

        let mut plans: Vec<Option<TemplatePlan>> = plans.into_iter().map(Some).collect();
        for column in record.headers().names() {
            for rule in self.mapping.rules_for(column) {
                match rule {
                    ColumnRule::DirectLiteral {
                        predicate,
                        datatype,
                    } => self.project_literals(
                        record,
                        column,
                        predicate,
                        datatype.as_deref(),
                        &subject,
                        &mut projection,
                    ),
                    ColumnRule::EntityTemplate(index) => {
                        if let Some(plan) = plans.get_mut(*index).and_then(Option::take) {
                            self.instantiate(plan, record, &subject, &mut projection);
                        }
                    }
                    ColumnRule::Catalog { predicate } => {
                        self.project_catalog(record, column, predicate, &subject, &mut projection)
                    }
                    ColumnRule::Relation { predicate } => {
                        self.project_relation(record, column, predicate, &subject, &mut projection)
                    }
                }
            }
        }

        tracing::trace!(
            "Row {} -> {} ({} statements)",
            row,
            subject,
            projection.graph.len()
        );
        projection
    }

    fn project_literals(
        &self,
        record: &Record,
        column: &str,
        predicate: &str,
        datatype: Option<&str>,
        subject: &str,
        projection: &mut Projection,
    ) {
        for value in self.correlator.values(record, column) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let literal = self.literal(value, datatype, column, projection);
            projection
                .graph
                .insert(Statement::literal(subject, predicate, literal));
        }
    }

    /// Typed literal for a direct column value. Values that do not fit their
    /// declared datatype fall back to an untyped string.
    fn literal(
        &self,
        value: &str,
        declared: Option<&str>,
        column: &str,
        projection: &mut Projection,
    ) -> Literal {
        match declared {
            Some(iri) => match datatype::conform(value, iri) {
                Ok(lexical) => Literal::typed(lexical, Some(iri.to_string())),
                Err(message) => {
                    projection.messages.push(ProcessingMessage::warning(
                        message,
                        Some(column),
                        projection.row,
                    ));
                    Literal::plain(value)
                }
            },
            None if self.mapping.infer_datatypes => match datatype::infer_typed(value) {
                Some((lexical, iri)) => Literal::typed(lexical, Some(iri.to_string())),
                None => Literal::plain(value),
            },
            None => Literal::plain(value),
        }
    }

    fn plan<'r>(&self, template: &'a CompiledTemplate, record: &'r Record) -> TemplatePlan<'a, 'r> {
        let row = record.row();
        let column = template.source_column.as_str();
        let mut plan = TemplatePlan {
            template,
            instances: Vec::new(),
            warnings: Vec::new(),
            mismatched: Vec::new(),
        };

        let raw = record.value(column);
        if raw.trim().is_empty() {
            return plan;
        }
        let separator = template
            .separator
            .as_deref()
            .or_else(|| self.correlator.correlation_separator(column));

        for (index, segment) in split_cell(raw, separator).into_iter().enumerate() {
            let value = segment.trim();
            if value.is_empty() {
                plan.warnings.push(ProcessingMessage::warning(
                    format!("Template '{}': blank value at index {}", template.name, index),
                    Some(column),
                    row,
                ));
                continue;
            }

            let identifier = match &template.id_source {
                None => value.to_string(),
                Some(IdSource {
                    column: id_column,
                    by_index: false,
                }) => record.value(id_column).trim().to_string(),
                Some(IdSource {
                    column: id_column,
                    by_index: true,
                }) => match self.correlator.value_at(record, id_column, index) {
                    Ok(id) => id.trim().to_string(),
                    Err(e) => {
                        if matches!(e, CorrelationError::IndexOutOfRange { .. }) {
                            plan.mismatched.push(index);
                        }
                        plan.warnings.push(ProcessingMessage::warning(
                            format!("Template '{}': {}", template.name, e),
                            Some(id_column.as_str()),
                            row,
                        ));
                        continue;
                    }
                },
            };

            plan.instances.push(Instantiation {
                index,
                value,
                identifier,
            });
        }
        plan
    }

    fn instantiate(
        &self,
        plan: TemplatePlan,
        record: &Record,
        subject: &str,
        projection: &mut Projection,
    ) {
        let template = plan.template;
        projection.messages.extend(plan.warnings);

        for instance in plan.instances {
            let resolved =
                match self
                    .resolver
                    .resolve_template(template, &instance.identifier, instance.value)
                {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        projection.messages.push(ProcessingMessage::warning(
                            format!("Template '{}' at index {}: {}", template.name, instance.index, e),
                            Some(template.source_column.as_str()),
                            projection.row,
                        ));
                        continue;
                    }
                };
            let entity_iri = resolved.iri();

            projection.graph.add_entity(resolved.entity.as_ref().clone());
            for class in &template.types {
                projection.graph.insert(Statement::type_of(entity_iri, class));
            }
            projection
                .graph
                .insert(Statement::link(subject, &template.link_predicate, entity_iri));
            if let Some(inverse) = &template.inverse_predicate {
                projection
                    .graph
                    .insert(Statement::link(entity_iri, inverse, subject));
            }

            for (predicate, rule) in &template.literals {
                let value = match rule {
                    LiteralRule::Raw => instance.value.to_string(),
                    LiteralRule::Safe => safe(instance.value),
                    LiteralRule::FromColumn {
                        column,
                        by_index: true,
                    } => match self.correlator.value_at(record, column, instance.index) {
                        Ok(value) => value.trim().to_string(),
                        Err(e) => {
                            projection.messages.push(ProcessingMessage::warning(
                                format!("Template '{}': {}", template.name, e),
                                Some(column.as_str()),
                                projection.row,
                            ));
                            continue;
                        }
                    },
                    LiteralRule::FromColumn {
                        column,
                        by_index: false,
                    } => record.value(column).trim().to_string(),
                };
                if value.is_empty() {
                    continue;
                }
                projection.graph.insert(Statement::literal(
                    entity_iri,
                    predicate,
                    Literal::tagged(value, &self.mapping.lang),
                ));
            }
        }
    }

    fn project_catalog(
        &self,
        record: &Record,
        column: &str,
        predicate: &str,
        subject: &str,
        projection: &mut Projection,
    ) {
        for value in self.correlator.values(record, column) {
            let Some(lookup) = self.catalog.term(column, value) else {
                continue;
            };
            let term = lookup.term;
            projection.graph.add_entity(term.to_entity());
            projection
                .graph
                .insert(Statement::link(subject, predicate, &term.iri));
            if lookup.created {
                projection
                    .graph
                    .extend(term.statements(self.catalog.lang()));
            }
        }
    }

    fn project_relation(
        &self,
        record: &Record,
        column: &str,
        predicate: &str,
        subject: &str,
        projection: &mut Projection,
    ) {
        for value in self.correlator.values(record, column) {
            let key = value.trim();
            if key.is_empty() {
                continue;
            }
            if self.primary_keys.contains(key) {
                let target = self.resolver.record_iri(key);
                projection
                    .graph
                    .insert(Statement::link(subject, predicate, &target));
            } else {
                projection.messages.push(ProcessingMessage::warning(
                    format!("No record with primary key '{}'", key),
                    Some(column),
                    projection.row,
                ));
            }
        }
    }
}
