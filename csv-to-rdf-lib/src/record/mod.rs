mod spreadsheet;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

pub use spreadsheet::SpreadsheetRecordSource;

use crate::error::ProcessorError;
use crate::mapping::CsvOptions;

/// Ordered column names shared by every record of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Headers {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|name| clean_header(&name.into()))
            .collect();
        let mut positions = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            // first occurrence wins for duplicated header names
            positions.entry(name.clone()).or_insert(i);
        }
        Self { names, positions }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.positions.get(column).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn clean_header(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

/// One input row. Columns absent from the row read as empty.
#[derive(Debug, Clone)]
pub struct Record {
    headers: Arc<Headers>,
    values: Vec<String>,
    row: usize,
}

impl Record {
    pub fn new(headers: Arc<Headers>, values: Vec<String>, row: usize) -> Self {
        Self {
            headers,
            values,
            row,
        }
    }

    /// 1-based data row number.
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Raw cell value; `None` when the column is not part of this record.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .position(column)
            .and_then(|i| self.values.get(i))
            .map(String::as_str)
    }

    /// Raw cell value, empty when absent.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.position(column).is_some()
    }
}

pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record, ProcessorError>> + 'a>;

/// A finite, restartable sequence of flat records. Every call to `records`
/// starts again from the first row.
pub trait RecordSource {
    fn headers(&self) -> Result<Arc<Headers>, ProcessorError>;
    fn records(&self) -> Result<RecordIter<'_>, ProcessorError>;
}

/// Delimited-text input read with the `csv` crate.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
    options: CsvOptions,
}

impl CsvRecordSource {
    pub fn new<P: Into<PathBuf>>(path: P, options: CsvOptions) -> Self {
        Self {
            path: path.into(),
            options,
        }
    }

    fn reader(&self) -> Result<csv::Reader<std::io::BufReader<std::fs::File>>, ProcessorError> {
        let file = std::fs::File::open(&self.path).map_err(|e| {
            ProcessorError::Processing(format!(
                "Failed to read CSV @ {}: {}",
                self.path.to_string_lossy(),
                e
            ))
        })?;
        let mut input = std::io::BufReader::new(file);
        skip_lines(&mut input, self.options.skip_rows)?;

        let mut builder = csv::ReaderBuilder::new();
        builder
            .delimiter(self.options.delimiter)
            .quote(self.options.quote)
            .escape(self.options.escape)
            .double_quote(self.options.escape.is_none())
            .flexible(true)
            .has_headers(true);
        Ok(builder.from_reader(input))
    }
}

fn skip_lines<R: std::io::BufRead>(input: &mut R, count: usize) -> Result<(), ProcessorError> {
    let mut line = String::new();
    for _ in 0..count {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
    }
    Ok(())
}

impl RecordSource for CsvRecordSource {
    fn headers(&self) -> Result<Arc<Headers>, ProcessorError> {
        let mut rdr = self.reader()?;
        let headers = rdr
            .headers()
            .map_err(|e| ProcessorError::Processing(format!("Failed to read CSV headers: {}", e)))?;
        tracing::debug!("CSV headers: {:?}", headers);
        Ok(Arc::new(Headers::new(headers.iter())))
    }

    fn records(&self) -> Result<RecordIter<'_>, ProcessorError> {
        let headers = self.headers()?;
        let rdr = self.reader()?;
        let iter = rdr
            .into_records()
            .enumerate()
            .map(move |(i, result)| -> Result<Record, ProcessorError> {
                let record = result.map_err(|e| {
                    ProcessorError::Processing(format!(
                        "Failed to read CSV record {}: {}",
                        i + 1,
                        e
                    ))
                })?;
                Ok(Record::new(
                    Arc::clone(&headers),
                    record.iter().map(str::to_string).collect(),
                    i + 1,
                ))
            });
        Ok(Box::new(iter))
    }
}

/// Records already held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRecordSource {
    headers: Arc<Headers>,
    rows: Vec<Vec<String>>,
}

impl MemoryRecordSource {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: Arc::new(Headers::new(headers)),
            rows: Vec::new(),
        }
    }

    pub fn with_row<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.push_row(values);
        self
    }

    pub fn push_row<S: Into<String>>(&mut self, values: impl IntoIterator<Item = S>) {
        self.rows.push(values.into_iter().map(Into::into).collect());
    }
}

impl RecordSource for MemoryRecordSource {
    fn headers(&self) -> Result<Arc<Headers>, ProcessorError> {
        Ok(Arc::clone(&self.headers))
    }

    fn records(&self) -> Result<RecordIter<'_>, ProcessorError> {
        Ok(Box::new(self.rows.iter().enumerate().map(|(i, values)| {
            Ok::<_, ProcessorError>(Record::new(
                Arc::clone(&self.headers),
                values.clone(),
                i + 1,
            ))
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_record_lookup() {
        let source = MemoryRecordSource::new(["EID", "Title", "Year"]).with_row(["2-s2.0-1", "Graphs"]);
        let record = source.records().unwrap().next().unwrap().unwrap();
        assert_eq!(record.get("Title"), Some("Graphs"));
        // declared column, short row
        assert_eq!(record.get("Year"), None);
        assert_eq!(record.value("Year"), "");
        assert!(record.has_column("Year"));
        assert!(!record.has_column("DOI"));
        assert_eq!(record.row(), 1);
    }

    #[test]
    fn test_headers_strip_bom_and_whitespace() {
        let headers = Headers::new(["\u{feff}EID", " Title "]);
        assert_eq!(headers.names(), &["EID".to_string(), "Title".to_string()]);
        assert_eq!(headers.position("Title"), Some(1));
    }

    #[test]
    fn test_csv_source_is_restartable() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exported by scopus").unwrap();
        writeln!(file, "EID;Title;Authors").unwrap();
        writeln!(file, "e1;\"First; part\";Smith J.,Doe A.").unwrap();
        writeln!(file, "e2;Second").unwrap();
        file.flush().unwrap();

        let options = CsvOptions {
            delimiter: b';',
            skip_rows: 1,
            ..CsvOptions::default()
        };
        let source = CsvRecordSource::new(file.path(), options);
        let headers = source.headers().unwrap();
        assert_eq!(headers.names(), &["EID", "Title", "Authors"]);

        for _ in 0..2 {
            let records: Vec<Record> = source
                .records()
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].value("Title"), "First; part");
            assert_eq!(records[1].value("Authors"), "");
            assert_eq!(records[1].row(), 2);
        }
    }
}
