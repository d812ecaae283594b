//! Column-typed tables and the CSV dataset loader.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kind of a column, inferred from its cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every cell parsed as a finite number.
    Numeric,
    /// At least one cell is free text.
    Categorical,
}

/// A single named column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Column {
    /// Numeric cells.
    Numeric(Vec<f64>),
    /// Text cells.
    Categorical(Vec<String>),
}

impl Column {
    /// Number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(values) => values.len(),
            Self::Categorical(values) => values.len(),
        }
    }

    /// Returns true when the column has no cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column kind.
    #[must_use]
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Categorical(_) => ColumnKind::Categorical,
        }
    }

    /// Numeric cells, if this is a numeric column.
    #[must_use]
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(values) => Some(values),
            Self::Categorical(_) => None,
        }
    }

    /// Cell `row` rendered as a category label. Numbers use their shortest
    /// decimal form, so `3.0` reads as `"3"`.
    #[must_use]
    pub fn label(&self, row: usize) -> Option<String> {
        match self {
            Self::Numeric(values) => values.get(row).map(ToString::to_string),
            Self::Categorical(values) => values.get(row).cloned(),
        }
    }

    fn take(&self, rows: &[usize]) -> Self {
        match self {
            Self::Numeric(values) => Self::Numeric(rows.iter().map(|&row| values[row]).collect()),
            Self::Categorical(values) => {
                Self::Categorical(rows.iter().map(|&row| values[row].clone()).collect())
            }
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Self::Numeric(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Self::Categorical(values.into_iter().map(str::to_string).collect())
    }
}

/// One value of a [`Table::single_row`] row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Cell {
    Number(f64),
    Label(String),
}

/// Ordered set of equally long named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexMap<String, Column>,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-row table; each value becomes a column of length one.
    pub(crate) fn single_row<'a>(values: impl IntoIterator<Item = (&'a str, Cell)>) -> Self {
        Self {
            columns: values
                .into_iter()
                .map(|(name, cell)| {
                    let column = match cell {
                        Cell::Number(value) => Column::Numeric(vec![value]),
                        Cell::Label(value) => Column::Categorical(vec![value]),
                    };
                    (name.to_string(), column)
                })
                .collect(),
        }
    }

    /// Appends (or replaces) a column. Its length must match the table's.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        let expected = self
            .columns
            .iter()
            .find(|(existing, _)| **existing != name)
            .map(|(_, existing)| existing.len());
        if let Some(expected) = expected {
            if expected != column.len() {
                return Err(SchemaError::RowCountMismatch {
                    column: name,
                    expected,
                    found: column.len(),
                });
            }
        }
        self.columns.insert(name, column);
        Ok(())
    }

    /// Builder-style [`Self::push_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        column: Column,
    ) -> Result<Self, SchemaError> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Number of rows.
    #[must_use]
    pub fn height(&self) -> usize {
        self.columns.first().map_or(0, |(_, column)| column.len())
    }

    /// Number of columns.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Like [`Self::column`] but fails with [`SchemaError::MissingColumn`].
    pub fn require(&self, name: &str) -> Result<&Column, SchemaError> {
        self.column(name)
            .ok_or_else(|| SchemaError::MissingColumn(name.to_string()))
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.keys().map(String::as_str)
    }

    /// `(name, column)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> + '_ {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Removes a column, preserving the order of the others.
    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        self.columns.shift_remove(name)
    }

    /// New table holding the given rows, in the given order.
    #[must_use]
    pub fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(name, column)| (name.clone(), column.take(rows)))
                .collect(),
        }
    }

    /// Parses CSV with a header row, inferring each column's kind.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = csv.headers()?.iter().map(str::to_string).collect();
        for (idx, name) in headers.iter().enumerate() {
            if name.is_empty() {
                return Err(DatasetError::UnnamedColumn(idx));
            }
            if headers[..idx].contains(name) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        for (row, record) in csv.records().enumerate() {
            let record = record?;
            for (idx, name) in headers.iter().enumerate() {
                let cell = record.get(idx).unwrap_or_default();
                if cell.is_empty() {
                    return Err(DatasetError::MissingValue {
                        row,
                        column: name.clone(),
                    });
                }
                cells[idx].push(cell.to_string());
            }
        }
        if cells.first().map_or(true, Vec::is_empty) {
            return Err(DatasetError::Empty);
        }

        let mut table = Self::new();
        for (name, values) in headers.into_iter().zip(cells) {
            let column = infer_column(&name, values)?;
            table.columns.insert(name, column);
        }
        Ok(table)
    }
}

fn infer_column(name: &str, values: Vec<String>) -> Result<Column, DatasetError> {
    let parsed: Option<Vec<f64>> = values
        .iter()
        .map(|cell| cell.parse::<f64>().ok())
        .collect();
    match parsed {
        Some(numbers) => {
            if let Some(row) = numbers.iter().position(|value| !value.is_finite()) {
                return Err(DatasetError::MissingValue {
                    row,
                    column: name.to_string(),
                });
            }
            Ok(Column::Numeric(numbers))
        }
        None => Ok(Column::Categorical(values)),
    }
}

/// Feature table plus the numeric target, as loaded from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Every column except the target.
    pub features: Table,
    /// Target values, one per row.
    pub target: Vec<f64>,
    /// Name of the target column.
    pub target_name: String,
    /// File the dataset was read from.
    pub source: Option<PathBuf>,
}

impl Dataset {
    /// Loads a CSV file and splits off the `target` column.
    pub fn load(path: impl AsRef<Path>, target: &str) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Table::from_csv_reader(file)?;
        let mut dataset = Self::from_table(table, target)?;
        dataset.source = Some(path.to_path_buf());
        Ok(dataset)
    }

    /// Splits `target` off an in-memory table.
    pub fn from_table(mut table: Table, target: &str) -> Result<Self, DatasetError> {
        let column = table
            .remove_column(target)
            .ok_or_else(|| DatasetError::MissingTarget(target.to_string()))?;
        let Column::Numeric(values) = column else {
            return Err(DatasetError::NonNumericTarget(target.to_string()));
        };
        if values.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self {
            features: table,
            target: values,
            target_name: target.to_string(),
            source: None,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.target.len()
    }

    /// Returns true when there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }

    /// New dataset holding the given rows, in the given order.
    #[must_use]
    pub fn subset(&self, rows: &[usize]) -> Self {
        Self {
            features: self.features.take_rows(rows),
            target: rows.iter().map(|&row| self.target[row]).collect(),
            target_name: self.target_name.clone(),
            source: self.source.clone(),
        }
    }
}

/// Errors raised while reading a dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// File could not be opened.
    #[error("reading dataset {path:?}: {source}")]
    Io {
        /// Dataset path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Malformed CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Header row names a column twice.
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    /// Header cell at the given position is blank.
    #[error("column {0} has no name")]
    UnnamedColumn(usize),
    /// Blank or non-finite cell.
    #[error("missing value in column `{column}` at data row {row}")]
    MissingValue {
        /// Zero-based data row (header excluded).
        row: usize,
        /// Column name.
        column: String,
    },
    /// No data rows.
    #[error("dataset has no rows")]
    Empty,
    /// Target column absent.
    #[error("target column `{0}` not found")]
    MissingTarget(String),
    /// Target column holds text.
    #[error("target column `{0}` is not numeric")]
    NonNumericTarget(String),
}

/// Mismatch between a table and the schema a fitted pipeline expects.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// Required column absent.
    #[error("column `{0}` is missing")]
    MissingColumn(String),
    /// Text found where the pipeline was fit on numbers.
    #[error("column `{0}` must be numeric")]
    NotNumeric(String),
    /// Column length differs from the table height.
    #[error("column `{column}` has {found} rows, expected {expected}")]
    RowCountMismatch {
        /// Offending column.
        column: String,
        /// Table height.
        expected: usize,
        /// Column length.
        found: usize,
    },
    /// Design matrix width differs from the fitted coefficients.
    #[error("expected {expected} features, found {found}")]
    WidthMismatch {
        /// Fitted feature count.
        expected: usize,
        /// Provided feature count.
        found: usize,
    },
}
