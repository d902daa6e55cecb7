//! CSV datasets used for training and for building input forms

use crate::error::DatasetError;
use crate::models::{RawInputRecord, RawValue};
use std::io::Read;
use std::path::{Path, PathBuf};

/// In-memory table of raw cells
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<RawValue>>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { columns, rows }
    }

    /// Load a CSV file with a header row
    pub fn from_path(path: &Path) -> Result<Self, DatasetError> {
        if !path.exists() {
            return Err(DatasetError::NotFound(path.to_path_buf()));
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| DatasetError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        Self::read(reader, path)
    }

    /// Load CSV from any reader; `label` names the source in errors
    pub fn from_reader<R: Read>(reader: R, label: &str) -> Result<Self, DatasetError> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        Self::read(reader, Path::new(label))
    }

    fn read<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Self, DatasetError> {
        let csv_err = |source| DatasetError::Csv {
            path: PathBuf::from(path),
            source,
        };

        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(String::from)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(RawValue::from_cell).collect());
        }

        if rows.is_empty() {
            return Err(DatasetError::Empty(path.to_path_buf()));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<RawValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All cells of one column
    pub fn column(&self, name: &str) -> Result<Vec<&RawValue>, DatasetError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().filter_map(|row| row.get(idx)).collect())
    }

    /// One row as a record restricted to `columns`
    pub fn record(&self, row: usize, columns: &[&str]) -> RawInputRecord {
        let mut record = RawInputRecord::new();
        if let Some(cells) = self.rows.get(row) {
            for name in columns {
                if let Some(value) = self.column_index(name).and_then(|idx| cells.get(idx)) {
                    record.insert(name.to_string(), value.clone());
                }
            }
        }
        record
    }
}
