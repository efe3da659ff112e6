use std::path::Path;
use std::sync::Arc;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;

use super::{Headers, MemoryRecordSource, RecordIter, RecordSource};
use crate::error::ProcessorError;

/// One worksheet of an `.xlsx`/`.xls`/`.ods` workbook. The sheet is read
/// once on open; `records` replays it from memory.
#[derive(Debug, Clone)]
pub struct SpreadsheetRecordSource {
    sheet: String,
    rows: MemoryRecordSource,
}

impl SpreadsheetRecordSource {
    /// Open `sheet`, or the first sheet of the workbook when `None`.
    pub fn open<P: AsRef<Path>>(
        path: P,
        sheet: Option<&str>,
        skip_rows: usize,
    ) -> Result<Self, ProcessorError> {
        let path = path.as_ref();
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            ProcessorError::Spreadsheet(format!(
                "Failed to open workbook {}: {}",
                path.display(),
                e
            ))
        })?;

        let sheet = match sheet {
            Some(sheet) => sheet.to_string(),
            None => workbook.sheet_names().first().cloned().ok_or_else(|| {
                ProcessorError::Spreadsheet(format!("Workbook {} has no sheets", path.display()))
            })?,
        };

        let range = workbook.worksheet_range(&sheet).map_err(|e| {
            ProcessorError::Spreadsheet(format!("Sheet '{sheet}' not found in workbook: {e}"))
        })?;

        let mut rows = range
            .rows()
            .skip(skip_rows)
            .map(|row| row.iter().map(cell_to_string).collect::<Vec<_>>());
        let headers = rows.next().ok_or_else(|| {
            ProcessorError::Spreadsheet(format!("Sheet '{}' has no header row", sheet))
        })?;

        let mut source = MemoryRecordSource::new(headers);
        for row in rows {
            source.push_row(row);
        }
        tracing::debug!("Loaded sheet '{}' from {}", sheet, path.display());

        Ok(Self {
            sheet,
            rows: source,
        })
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }
}

/// Date cells become ISO dates (or date-times when they carry a time of day).
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(excel) => match excel.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => dt.format("%Y-%m-%d").to_string(),
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            None => cell.to_string(),
        },
        other => other.to_string(),
    }
}

impl RecordSource for SpreadsheetRecordSource {
    fn headers(&self) -> Result<Arc<Headers>, ProcessorError> {
        self.rows.headers()
    }

    fn records(&self) -> Result<RecordIter<'_>, ProcessorError> {
        self.rows.records()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_workbook_is_a_spreadsheet_error() {
        let err = SpreadsheetRecordSource::open("../test-data/missing.xlsx", None, 0).unwrap_err();
        assert!(matches!(err, ProcessorError::Spreadsheet(_)));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Data::Empty), "");
        assert_eq!(cell_to_string(&Data::String("Smith J.".into())), "Smith J.");
        assert_eq!(cell_to_string(&Data::Float(2021.0)), "2021");
    }
}
