use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::catalog::CatalogBuilder;
use crate::error::{IssueKind, ProcessingMessage, ProcessingOutcome, ProcessorError, RunReport};
use crate::graph::Graph;
use crate::mapping::{CompiledMapping, IndexMismatchPolicy, Prefixes};
use crate::projector::{Projection, TripleProjector};
use crate::record::{Record, RecordSource};
use crate::resolver::EntityResolver;
use crate::serializer::OutputFormat;

/// Result of one run: the accumulated graph and the run report.
#[derive(Debug)]
pub struct RunOutput {
    pub graph: Graph,
    pub report: RunReport,
    pub prefixes: Prefixes,
    /// Format requested by the mapping.
    pub format: OutputFormat,
}

impl RunOutput {
    pub fn serialize(&self, format: OutputFormat) -> Result<String, ProcessorError> {
        format.serialize(&self.graph, &self.prefixes)
    }

    pub fn outcome(&self) -> ProcessingOutcome {
        ProcessingOutcome::from_report(&self.report)
    }
}

pub struct Processor {
    mapping: CompiledMapping,
    is_strict: bool,
    is_parallel: bool,
    cancelled: Arc<AtomicBool>,
}

impl Processor {
    pub fn new(mapping: CompiledMapping) -> Self {
        tracing::info!(
            "Creating processor with base IRI: {} (primary key: {})",
            mapping.base_iri,
            mapping.primary_key
        );
        Self {
            mapping,
            is_strict: false,
            is_parallel: true,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// In strict mode input columns unknown to the mapping are fatal.
    pub fn strict(mut self, is_strict: bool) -> Self {
        self.is_strict = is_strict;
        self
    }

    pub fn parallel(mut self, is_parallel: bool) -> Self {
        self.is_parallel = is_parallel;
        self
    }

    /// Setting the flag aborts the run at the next record.
    pub fn cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    pub fn mapping(&self) -> &CompiledMapping {
        &self.mapping
    }

    fn check_cancelled(&self) -> Result<(), ProcessorError> {
        if self.cancelled.load(Ordering::Relaxed) {
            tracing::warn!("Run cancelled");
            return Err(ProcessorError::Cancelled);
        }
        Ok(())
    }

    /// Project every record of `source`. Nothing is written anywhere; the
    /// registries live and die with this call.
    pub fn run(&self, source: &dyn RecordSource) -> Result<RunOutput, ProcessorError> {
        let mut mapping = self.mapping.clone();
        let headers = source.headers()?;
        let mut report = mapping.check_headers(headers.names(), self.is_strict)?;

        let mut records = Vec::new();
        for record in source.records()? {
            self.check_cancelled()?;
            records.push(record?);
        }
        tracing::info!("Read {} records", records.len());

        let resolver = EntityResolver::new(mapping.base_iri.clone(), mapping.entity_base_iri.clone());
        let catalog = CatalogBuilder::new(mapping.base_iri.clone(), mapping.lang.clone());

        let mut primary_keys = index_primary_keys(&mapping.primary_key, &records, &mut report);
        if mapping.index_mismatch == IndexMismatchPolicy::RejectRecord {
            // Keys whose every record is rejected must not be relation targets.
            let unindexed = HashSet::new();
            let screen = TripleProjector::new(&mapping, &resolver, &catalog, &unindexed);
            let accepted: HashSet<&str> = records
                .iter()
                .filter(|record| screen.rejection(record).is_none())
                .map(|record| record.value(&mapping.primary_key).trim())
                .collect();
            primary_keys.retain(|key| accepted.contains(key.as_str()));
        }

        let mut graph = Graph::new();
        for column in &mapping.catalogs {
            graph.add_entity(catalog.scheme_entity(column));
            graph.extend(catalog.scheme_statements(column));
        }

        let projector = TripleProjector::new(&mapping, &resolver, &catalog, &primary_keys);
        let project = |record: &Record| -> Result<Projection, ProcessorError> {
            self.check_cancelled()?;
            Ok(projector.project(record))
        };
        let projections: Vec<Projection> = if self.is_parallel {
            records.par_iter().map(project).collect::<Result<_, _>>()?
        } else {
            records.iter().map(project).collect::<Result<_, _>>()?
        };

        // merged in input order so the report reads top to bottom
        for projection in projections {
            report.record_seen();
            if !projection.is_rejected() {
                report.record_projected();
            }
            for message in projection.messages {
                report.push(message);
            }
            graph.merge(projection.graph);
        }

        tracing::info!(
            "Projected {} of {} records: {} statements, {} entities, {} catalog terms",
            report.records_projected(),
            report.records_seen(),
            graph.len(),
            resolver.len(),
            catalog.len()
        );

        Ok(RunOutput {
            graph,
            report,
            prefixes: mapping.prefixes.clone(),
            format: mapping.format,
        })
    }

    /// Run and write the serialized graph to `destination` in the mapping's format.
    pub async fn process<P: AsRef<Path>>(
        &self,
        source: &dyn RecordSource,
        destination: P,
    ) -> Result<RunOutput, ProcessorError> {
        let destination = destination.as_ref();
        let output = self.run(source)?;
        let text = output.serialize(output.format)?;

        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ProcessorError::Processing(format!(
                    "Failed to create directory for output file: {}",
                    e
                ))
            })?;
        }
        tokio::fs::write(destination, text).await.map_err(|e| {
            ProcessorError::Processing(format!("Failed to write output file: {}", e))
        })?;

        tracing::info!("Saved {} output to {}", output.format, destination.display());
        Ok(output)
    }
}

/// Every non-blank primary key of the input. Repeated keys are reported;
/// their records all project onto the same resource.
fn index_primary_keys(
    column: &str,
    records: &[Record],
    report: &mut RunReport,
) -> HashSet<String> {
    let mut first_rows: HashMap<&str, usize> = HashMap::new();
    for record in records {
        let key = record.value(column).trim();
        if key.is_empty() {
            continue;
        }
        if let Some(first) = first_rows.get(key) {
            report.push(ProcessingMessage::new(
                IssueKind::DuplicatePrimaryKey,
                format!(
                    "Primary key '{}' already used by row {}; statements are merged",
                    key, first
                ),
                Some(column.to_string()),
                Some(record.row()),
            ));
        } else {
            first_rows.insert(key, record.row());
        }
    }
    first_rows.into_keys().map(str::to_string).collect()
}
