use crate::config::TableConfig;
use crate::error::{LocresError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// One `(key, source text)` pair from the exported string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalizationRow {
    pub key: String,
    pub value: String,
}

/// Reads the CSV produced by the table exporter.
///
/// The key and value columns are located by header name, matched without
/// regard to case or surrounding whitespace. Candidate names are tried in
/// configured order and the first one present in the header wins.
pub struct TableReader {
    key_columns: Vec<String>,
    value_columns: Vec<String>,
}

impl TableReader {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            key_columns: config.key_columns.clone(),
            value_columns: config.value_columns.clone(),
        }
    }

    pub fn read_path<F>(&self, path: &Path, sink: F) -> Result<usize>
    where
        F: FnMut(LocalizationRow),
    {
        let file = File::open(path)?;
        self.read_rows(BufReader::new(file), sink)
    }

    /// Feed every data row to `sink` in file order and return how many were read.
    pub fn read_rows<R, F>(&self, reader: R, mut sink: F) -> Result<usize>
    where
        R: Read,
        F: FnMut(LocalizationRow),
    {
        let mut records = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = records.headers()?.clone();
        let key_index = locate(&headers, &self.key_columns, "key")?;
        let value_index = locate(&headers, &self.value_columns, "value")?;

        let mut record = StringRecord::new();
        let mut count = 0;
        while records.read_record(&mut record)? {
            let Some(key) = record.get(key_index) else {
                let line = record.position().map(|p| p.line()).unwrap_or_default();
                return Err(LocresError::TableFormat {
                    message: format!("row on line {} has no key field", line),
                });
            };

            sink(LocalizationRow {
                key: key.to_string(),
                value: record.get(value_index).unwrap_or_default().to_string(),
            });
            count += 1;
        }

        Ok(count)
    }
}

fn locate(headers: &StringRecord, candidates: &[String], role: &str) -> Result<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    candidates
        .iter()
        .find_map(|candidate| {
            let wanted = candidate.trim().to_lowercase();
            normalized.iter().position(|h| *h == wanted)
        })
        .ok_or_else(|| LocresError::TableFormat {
            message: format!(
                "no {} column found (expected one of: {}; header: {})",
                role,
                candidates.join(", "),
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })
}
