use std::collections::HashMap;

use thiserror::Error;

use crate::mapping::CompiledMapping;
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrelationError {
    #[error("correlated column '{0}' is missing from the record")]
    MissingColumn(String),
    #[error("column '{column}' has {len} value(s), no value at index {index}")]
    IndexOutOfRange {
        column: String,
        index: usize,
        len: usize,
    },
}

/// Splits multivalued cells and aligns split sequences across columns by position.
#[derive(Debug, Clone)]
pub struct MultivalueCorrelator {
    declared: HashMap<String, String>,
    default_separator: String,
}

/// Split `raw` on `separator`. An absent or empty separator means "do not
/// split". Segments are returned untrimmed and blank segments are kept, so
/// positions stay aligned with other columns.
pub fn split_cell<'a>(raw: &'a str, separator: Option<&str>) -> Vec<&'a str> {
    match separator {
        Some(sep) if !sep.is_empty() => raw.split(sep).collect(),
        _ => vec![raw],
    }
}

impl MultivalueCorrelator {
    pub fn new(declared: HashMap<String, String>, default_separator: impl Into<String>) -> Self {
        Self {
            declared,
            default_separator: default_separator.into(),
        }
    }

    pub fn from_mapping(mapping: &CompiledMapping) -> Self {
        Self::new(mapping.multivalued.clone(), mapping.default_separator.clone())
    }

    /// Separator used when the column's values are projected directly. Columns
    /// that are not declared multivalued are never split.
    pub fn separator(&self, column: &str) -> Option<&str> {
        self.declared.get(column).map(String::as_str)
    }

    /// Separator used when the column is read as a correlation target; falls
    /// back to the default separator when the column is not declared.
    pub fn correlation_separator(&self, column: &str) -> Option<&str> {
        match self.declared.get(column) {
            Some(sep) => Some(sep.as_str()),
            None => Some(self.default_separator.as_str()),
        }
    }

    /// Atomic values of a column for direct projection.
    pub fn values<'r>(&self, record: &'r Record, column: &str) -> Vec<&'r str> {
        split_cell(record.value(column), self.separator(column))
    }

    /// Split sequence of a correlation target column.
    pub fn correlated<'r>(
        &self,
        record: &'r Record,
        column: &str,
    ) -> Result<Vec<&'r str>, CorrelationError> {
        let raw = record
            .get(column)
            .or_else(|| record.has_column(column).then_some(""))
            .ok_or_else(|| CorrelationError::MissingColumn(column.to_string()))?;
        Ok(split_cell(raw, self.correlation_separator(column)))
    }

    /// Value `index` of a correlation target column.
    pub fn value_at<'r>(
        &self,
        record: &'r Record,
        column: &str,
        index: usize,
    ) -> Result<&'r str, CorrelationError> {
        let values = self.correlated(record, column)?;
        values
            .get(index)
            .copied()
            .ok_or_else(|| CorrelationError::IndexOutOfRange {
                column: column.to_string(),
                index,
                len: values.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MemoryRecordSource, RecordSource};

    fn correlator() -> MultivalueCorrelator {
        let mut declared = HashMap::new();
        declared.insert("Authors".to_string(), ";".to_string());
        declared.insert("Abstract".to_string(), String::new());
        MultivalueCorrelator::new(declared, ";")
    }

    fn record(headers: &[&str], values: &[&str]) -> Record {
        MemoryRecordSource::new(headers.iter().copied())
            .with_row(values.iter().copied())
            .records()
            .unwrap()
            .next()
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_split_preserves_blank_segments() {
        assert_eq!(split_cell("a;;c", Some(";")), vec!["a", "", "c"]);
        assert_eq!(split_cell("a; b", Some(";")), vec!["a", " b"]);
        assert_eq!(split_cell("a;b", None), vec!["a;b"]);
    }

    #[test]
    fn test_empty_separator_never_splits() {
        let record = record(&["Abstract"], &["We study graphs; and more; and more."]);
        assert_eq!(
            correlator().values(&record, "Abstract"),
            vec!["We study graphs; and more; and more."]
        );
        // also when read as a correlation target
        assert_eq!(correlator().correlated(&record, "Abstract").unwrap().len(), 1);
    }

    #[test]
    fn test_undeclared_column_is_not_split_for_projection() {
        let record = record(&["Title"], &["Graphs; a survey"]);
        assert_eq!(correlator().values(&record, "Title"), vec!["Graphs; a survey"]);
        // but uses the default separator as a correlation target
        assert_eq!(
            correlator().correlated(&record, "Title").unwrap(),
            vec!["Graphs", " a survey"]
        );
    }

    #[test]
    fn test_correlation_by_index() {
        let record = record(
            &["Authors", "Author(s) ID"],
            &["Smith J.;Doe A.", "57123;57456"],
        );
        let correlator = correlator();
        let names = correlator.values(&record, "Authors");
        let pairs: Vec<(&str, &str)> = names
            .iter()
            .enumerate()
            .map(|(i, name)| (*name, correlator.value_at(&record, "Author(s) ID", i).unwrap()))
            .collect();
        assert_eq!(pairs, vec![("Smith J.", "57123"), ("Doe A.", "57456")]);
    }

    #[test]
    fn test_correlation_failures() {
        let record = record(&["Authors", "Author(s) ID"], &["Smith J.;Doe A.", "57123"]);
        let correlator = correlator();
        assert_eq!(
            correlator.value_at(&record, "Author(s) ID", 1),
            Err(CorrelationError::IndexOutOfRange {
                column: "Author(s) ID".to_string(),
                index: 1,
                len: 1
            })
        );
        assert_eq!(
            correlator.value_at(&record, "Affiliations", 0),
            Err(CorrelationError::MissingColumn("Affiliations".to_string()))
        );
    }
}
