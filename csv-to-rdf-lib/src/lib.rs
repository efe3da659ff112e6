//! CSV to RDF Processor Library
//!
//! This library turns tabular bibliographic exports (CSV or spreadsheets)
//! into RDF graphs, driven by a JSON mapping document.

mod catalog;
mod correlator;
mod error;
mod graph;
mod mapping;
mod processor;
mod projector;
mod record;
mod resolver;
mod serializer;
mod utils;

pub use catalog::{CatalogBuilder, CatalogLookup, CatalogTerm};
pub use correlator::{split_cell, CorrelationError, MultivalueCorrelator};
pub use error::{IssueKind, ProcessingMessage, ProcessingOutcome, ProcessorError, RunReport};
pub use graph::{Entity, EntityKind, Graph, Literal, Statement, Term};
pub use mapping::{
    ClassList, ColumnRule, CompiledMapping, CompiledTemplate, CsvOptions, EntityTemplateSpec,
    IndexMismatchPolicy, LiteralRule, MappingSpec, PathTemplate, Prefixes, RelationSpec,
};
pub use processor::{Processor, RunOutput};
pub use projector::{datatype, Projection, TripleProjector};
pub use record::{
    CsvRecordSource, Headers, MemoryRecordSource, Record, RecordIter, RecordSource,
    SpreadsheetRecordSource,
};
pub use resolver::{EntityKey, EntityResolver, ResolveError, Resolved};
pub use serializer::{JsonLdDocument, JsonLdNode, OutputFormat};
pub use utils::safe;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Once;
    use tracing::info;

    static INIT: Once = Once::new();

    /// Initialize logging exactly once for all tests
    fn init_logging() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(tracing::Level::DEBUG)
                .init();
        });
    }

    #[test]
    fn test_sample_export_end_to_end() {
        init_logging();

        let mut mapping = MappingSpec::from_file("../test-data/mapping.jsonc")
            .unwrap()
            .validate()
            .unwrap();
        let source = CsvRecordSource::new("../test-data/scopus.csv", mapping.csv.clone());
        let headers = source.headers().unwrap();
        assert!(mapping.check_headers(headers.names(), true).is_ok());

        let output = Processor::new(mapping).run(&source).unwrap();
        for format in [
            OutputFormat::Turtle,
            OutputFormat::NTriples,
            OutputFormat::RdfXml,
            OutputFormat::JsonLd,
        ] {
            let text = output.serialize(format).unwrap();
            info!("{} output: {} bytes", format, text.len());
            assert!(!text.is_empty());
        }
        assert!(matches!(
            output.outcome(),
            ProcessingOutcome::Success | ProcessingOutcome::SuccessWithWarnings(_)
        ));
    }
}
