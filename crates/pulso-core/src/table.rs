//! Column-named, string-celled table with CSV persistence.
//!
//! Every transformation returns a new [`Table`]; nothing mutates a table in
//! place except [`Table::push_row`]. An empty cell stands for a missing value.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::TableError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Create a table from columns and pre-built rows.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] if any row does not match the column count.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<String>>) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append one row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] if the row does not match the column count.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell value at `row` in `column`, or `None` if either is out of range.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    /// Iterate over the values of one column.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if the column does not exist.
    pub fn column_values<'a>(
        &'a self,
        column: &str,
    ) -> Result<impl Iterator<Item = &'a str> + 'a, TableError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        Ok(self.rows.iter().map(move |r| r[idx].as_str()))
    }

    /// Project onto `columns` in the given order. Columns the table does not
    /// have come back as empty cells.
    #[must_use]
    pub fn select(&self, columns: &[&str]) -> Table {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        for (name, idx) in columns.iter().zip(&indices) {
            if idx.is_none() {
                tracing::debug!(column = *name, "selected column absent; filling with empty cells");
            }
        }
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                    .collect()
            })
            .collect();
        Table {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            rows,
        }
    }

    /// Rename columns through `mapping` (`old -> new`); unmapped columns keep their name.
    #[must_use]
    pub fn rename(&self, mapping: &[(&str, String)]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                mapping
                    .iter()
                    .find(|(old, _)| old == c)
                    .map_or_else(|| c.clone(), |(_, new)| new.clone())
            })
            .collect();
        Table {
            columns,
            rows: self.rows.clone(),
        }
    }

    /// Rewrite every non-empty cell of `column` with `f`. Empty cells are left alone.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`, or [`TableError::UnknownColumn`]
    /// (converted into `E`) if the column does not exist.
    pub fn try_map_column<E, F>(&self, column: &str, mut f: F) -> Result<Table, E>
    where
        E: From<TableError>,
        F: FnMut(&str) -> Result<String, E>,
    {
        let idx = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut row = row.clone();
            if !row[idx].is_empty() {
                row[idx] = f(&row[idx])?;
            }
            rows.push(row);
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Append a column holding the same value on every row.
    #[must_use]
    pub fn with_constant_column(&self, name: &str, value: &str) -> Table {
        let mut columns = self.columns.clone();
        columns.push(name.to_string());
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                row.push(value.to_string());
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// Keep the first row for each distinct value of `column`, preserving order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::UnknownColumn`] if the column does not exist.
    pub fn dedup_by(&self, column: &str) -> Result<Table, TableError> {
        let idx = self
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .iter()
            .filter(|row| seen.insert(row[idx].clone()))
            .cloned()
            .collect();
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Stack tables vertically. Tables with no columns are ignored; all others
    /// must share the same columns in the same order.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::ColumnMismatch`] when column lists differ.
    pub fn concat<I>(tables: I) -> Result<Table, TableError>
    where
        I: IntoIterator<Item = Table>,
    {
        let mut out: Option<Table> = None;
        for table in tables {
            if table.columns.is_empty() {
                continue;
            }
            match out.as_mut() {
                None => out = Some(table),
                Some(acc) => {
                    if acc.columns != table.columns {
                        return Err(TableError::ColumnMismatch {
                            left: acc.columns.clone(),
                            right: table.columns,
                        });
                    }
                    acc.rows.extend(table.rows);
                }
            }
        }
        Ok(out.unwrap_or_default())
    }

    /// Read a CSV file with a header row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] if the file cannot be opened, or
    /// [`TableError::Csv`] if it is not well-formed CSV.
    pub fn read_csv(path: &Path) -> Result<Table, TableError> {
        match Self::read_csv_if_exists(path)? {
            Some(table) => Ok(table),
            None => Err(TableError::Io {
                path: path.display().to_string(),
                source: std::io::Error::from(ErrorKind::NotFound),
            }),
        }
    }

    /// Read a CSV file, returning `Ok(None)` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] for I/O failures other than not-found, or
    /// [`TableError::Csv`] if the file is not well-formed CSV.
    pub fn read_csv_if_exists(path: &Path) -> Result<Option<Table>, TableError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TableError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };

        let csv_err = |source: csv::Error| TableError::Csv {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::Reader::from_reader(file);
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            table.push_row(record.iter().map(str::to_string).collect())?;
        }
        Ok(Some(table))
    }

    /// Read a CSV file that is appended to row by row, returning `Ok(None)` if
    /// it does not exist.
    ///
    /// An interrupted append leaves a torn final record: one with the wrong
    /// number of fields, or one not terminated by a newline. Such a record is
    /// dropped and the returned flag is `true`. A width mismatch anywhere
    /// before the last record is still an error.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] for I/O failures other than not-found,
    /// [`TableError::Csv`] if the file is not well-formed CSV, or
    /// [`TableError::RowWidth`] for a malformed record before the tail.
    pub fn read_csv_dropping_torn_tail(path: &Path) -> Result<Option<(Table, bool)>, TableError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(TableError::Io {
                    path: path.display().to_string(),
                    source: e,
                })
            }
        };
        let terminated = bytes.is_empty() || bytes.ends_with(b"\n");

        let csv_err = |source: csv::Error| TableError::Csv {
            path: path.display().to_string(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let columns: Vec<String> = reader
            .headers()
            .map_err(csv_err)?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_err)?;
            rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let torn = rows
            .last()
            .is_some_and(|last| !terminated || last.len() != columns.len());
        if torn {
            rows.pop();
        }

        let table = Table::from_rows(columns, rows)?;
        Ok(Some((table, torn)))
    }

    /// Replace `path` with this table. The data is written to a sibling
    /// temporary file first and renamed into place, so readers never observe
    /// a half-written file. Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] or [`TableError::Csv`] on write failure.
    pub fn write_csv(&self, path: &Path) -> Result<(), TableError> {
        let io_err = |source: std::io::Error| TableError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let tmp = tmp_path(path);
        {
            let csv_err = |source: csv::Error| TableError::Csv {
                path: tmp.display().to_string(),
                source,
            };
            let mut writer = csv::Writer::from_path(&tmp).map_err(csv_err)?;
            writer.write_record(&self.columns).map_err(csv_err)?;
            for row in &self.rows {
                writer.write_record(row).map_err(csv_err)?;
            }
            writer.flush().map_err(io_err)?;
        }
        fs::rename(&tmp, path).map_err(io_err)
    }

    /// Append a single row to the CSV at `path`, writing `columns` as the
    /// header first if the file is new or empty.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::RowWidth`] on a width mismatch, or
    /// [`TableError::Io`] / [`TableError::Csv`] on write failure.
    pub fn append_csv_row(path: &Path, columns: &[String], row: &[String]) -> Result<(), TableError> {
        if row.len() != columns.len() {
            return Err(TableError::RowWidth {
                expected: columns.len(),
                got: row.len(),
            });
        }

        let io_err = |source: std::io::Error| TableError::Io {
            path: path.display().to_string(),
            source,
        };
        let csv_err = |source: csv::Error| TableError::Csv {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        let is_new = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(columns).map_err(csv_err)?;
        }
        writer.write_record(row).map_err(csv_err)?;
        writer.flush().map_err(io_err)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
