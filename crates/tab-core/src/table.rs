//! Core table type: keyed rows and columns over sparse text cells

use crate::error::{Error, Result};
use crate::keys::KeySet;
use crate::parser::{parse_tab, parse_tab_str, TextFormat};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

/// Primary key label given to tables built without one
pub const DEFAULT_PRIMARY_KEY: &str = "ID";

type Cells = HashMap<String, HashMap<String, String>>;

/// A rectangular text table identified by row and column keys
///
/// Only explicitly set, non-empty values are stored. Any cell whose row and
/// column keys are both declared reads as the empty string when unset.
#[derive(Debug, Clone)]
pub struct Table {
    primary_key: String,
    row_keys: KeySet,
    col_keys: KeySet,
    comments: Vec<String>,
    cells: Cells,
}

impl Default for Table {
    fn default() -> Self {
        Self::with_primary_key(DEFAULT_PRIMARY_KEY)
    }
}

impl Table {
    /// Create an empty table with the default primary key
    pub fn build() -> Self {
        Self::default()
    }

    /// Create an empty table with the given primary key label
    pub fn with_primary_key(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
            row_keys: KeySet::new(),
            col_keys: KeySet::new(),
            comments: Vec::new(),
            cells: HashMap::new(),
        }
    }

    /// Create a table with the given keys and every cell empty
    pub fn new<R, C>(primary_key: impl Into<String>, row_keys: R, col_keys: C) -> Result<Self>
    where
        R: IntoIterator,
        R::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let row_keys = KeySet::from_keys(row_keys).map_err(Error::DuplicateRow)?;
        let col_keys = KeySet::from_keys(col_keys).map_err(Error::DuplicateColumn)?;
        Ok(Self {
            row_keys,
            col_keys,
            ..Self::with_primary_key(primary_key)
        })
    }

    pub(crate) fn from_parts(
        primary_key: String,
        row_keys: KeySet,
        col_keys: KeySet,
        comments: Vec<String>,
        cells: Cells,
    ) -> Self {
        Self {
            primary_key,
            row_keys,
            col_keys,
            comments,
            cells,
        }
    }

    /// Parse a table from tab-separated text
    pub fn load(text: &str) -> Result<Self> {
        parse_tab_str(text, &TextFormat::default())
    }

    /// Parse a table from text in the given format
    pub fn load_with(text: &str, format: &TextFormat) -> Result<Self> {
        parse_tab_str(text, format)
    }

    /// Read and parse a tab-separated table file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        parse_tab(path, &TextFormat::default())
    }

    /// Write the table to a file as tab-separated text
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &TextFormat::default())
    }

    /// Write the table to a file in the given format
    pub fn save_with<P: AsRef<Path>>(&self, path: P, format: &TextFormat) -> Result<()> {
        let path = path.as_ref();
        format.validate()?;
        let write_err = |source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", self.to_string_with(format)).map_err(write_err)?;
        writer.flush().map_err(write_err)?;

        log::debug!(
            "Saved {} rows x {} columns to {}",
            self.row_count(),
            self.col_count(),
            path.display()
        );
        Ok(())
    }

    /// Render the table in the given format
    pub fn to_string_with(&self, format: &TextFormat) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.render(&mut out, format.separator, format.comment);
        out
    }

    fn render<W: fmt::Write>(&self, out: &mut W, separator: char, comment: char) -> fmt::Result {
        for line in &self.comments {
            out.write_char(comment)?;
            out.write_str(line)?;
            out.write_char('\n')?;
        }

        out.write_str(&self.primary_key)?;
        for col in self.col_keys.iter() {
            out.write_char(separator)?;
            out.write_str(col)?;
        }

        for row in self.row_keys.iter() {
            out.write_char('\n')?;
            out.write_str(row)?;
            for col in self.col_keys.iter() {
                out.write_char(separator)?;
                out.write_str(self.cell(row, col))?;
            }
        }
        Ok(())
    }

    /// Get the primary key label
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Set the primary key label
    ///
    /// The label is not checked against the text format. One that starts with
    /// the comment marker is read back as a comment line.
    pub fn set_primary_key(&mut self, primary_key: impl Into<String>) {
        self.primary_key = primary_key.into();
    }

    /// Get the row keys in order
    pub fn row_keys(&self) -> &[String] {
        self.row_keys.as_slice()
    }

    /// Get the column keys in order
    pub fn col_keys(&self) -> &[String] {
        self.col_keys.as_slice()
    }

    /// Replace the row keys
    ///
    /// Rows that remain keep their cells in the new order, rows that are
    /// left out are dropped, and new keys start out empty.
    pub fn set_row_keys<I>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let keys = KeySet::from_keys(keys).map_err(Error::DuplicateRow)?;
        self.cells.retain(|row, _| keys.contains(row));
        self.row_keys = keys;
        Ok(())
    }

    /// Replace the column keys, with the same rules as [`Table::set_row_keys`]
    pub fn set_col_keys<I>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let keys = KeySet::from_keys(keys).map_err(Error::DuplicateColumn)?;
        for row in self.cells.values_mut() {
            row.retain(|col, _| keys.contains(col));
        }
        self.cells.retain(|_, row| !row.is_empty());
        self.col_keys = keys;
        Ok(())
    }

    /// Get the leading comment lines
    pub fn comments(&self) -> &[String] {
        &self.comments
    }

    /// Replace the leading comment lines
    pub fn set_comments(&mut self, comments: Vec<String>) {
        self.comments = comments;
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.row_keys.len()
    }

    /// Get the number of columns
    pub fn col_count(&self) -> usize {
        self.col_keys.len()
    }

    /// Check whether a row key is declared
    pub fn has_row(&self, row: &str) -> bool {
        self.row_keys.contains(row)
    }

    /// Check whether a column key is declared
    pub fn has_col(&self, col: &str) -> bool {
        self.col_keys.contains(col)
    }

    /// Declare a row key; returns true when it was new
    pub fn add_row(&mut self, row: impl Into<String>) -> bool {
        self.row_keys.insert(row)
    }

    /// Declare a column key; returns true when it was new
    pub fn add_col(&mut self, col: impl Into<String>) -> bool {
        self.col_keys.insert(col)
    }

    fn cell(&self, row: &str, col: &str) -> &str {
        self.cells
            .get(row)
            .and_then(|cells| cells.get(col))
            .map_or("", String::as_str)
    }

    /// Get a cell value
    ///
    /// Returns `None` if either key is unknown, and `Some("")` for a declared
    /// cell that was never set.
    pub fn get_ele(&self, row: &str, col: &str) -> Option<&str> {
        if self.has_row(row) && self.has_col(col) {
            Some(self.cell(row, col))
        } else {
            None
        }
    }

    /// Set a cell value, declaring the row and column keys if they are new
    pub fn set_ele(
        &mut self,
        row: impl Into<String>,
        col: impl Into<String>,
        value: impl Into<String>,
    ) {
        let row = row.into();
        let col = col.into();
        self.row_keys.insert(row.as_str());
        self.col_keys.insert(col.as_str());
        put(self.cells.entry(row).or_default(), &col, value.into());
    }

    /// Get a row as a column label to value view
    pub fn get_row(&self, row: &str) -> Option<Record<'_>> {
        if !self.has_row(row) {
            return None;
        }
        let values = self.col_keys.iter().map(|col| self.cell(row, col)).collect();
        Some(Record {
            labels: &self.col_keys,
            values,
        })
    }

    /// Get a column as a row label to value view
    pub fn get_col(&self, col: &str) -> Option<Record<'_>> {
        if !self.has_col(col) {
            return None;
        }
        let values = self.row_keys.iter().map(|row| self.cell(row, col)).collect();
        Some(Record {
            labels: &self.row_keys,
            values,
        })
    }

    /// Update a row, declaring the row key if it is new
    ///
    /// Labeled values only touch columns that already exist. Positional
    /// values replace the whole row and must cover every column.
    pub fn set_row(&mut self, row: impl Into<String>, values: impl Into<Assignment>) -> Result<()> {
        let row = row.into();
        match values.into() {
            Assignment::Labeled(pairs) => {
                self.row_keys.insert(row.as_str());
                for (col, value) in pairs {
                    if self.col_keys.contains(&col) {
                        put(self.cells.entry(row.clone()).or_default(), &col, value);
                    } else {
                        log::debug!("Ignoring unknown column '{}' for row '{}'", col, row);
                    }
                }
            }
            Assignment::Positional(values) => {
                check_len(self.col_keys.len(), values.len())?;
                self.row_keys.insert(row.as_str());
                let slot = self.cells.entry(row).or_default();
                for (col, value) in self.col_keys.iter().zip(values) {
                    put(slot, col, value);
                }
            }
        }
        self.cells.retain(|_, cells| !cells.is_empty());
        Ok(())
    }

    /// Update a column, with the same rules as [`Table::set_row`]
    pub fn set_col(&mut self, col: impl Into<String>, values: impl Into<Assignment>) -> Result<()> {
        let col = col.into();
        match values.into() {
            Assignment::Labeled(pairs) => {
                self.col_keys.insert(col.as_str());
                for (row, value) in pairs {
                    if self.row_keys.contains(&row) {
                        put(self.cells.entry(row).or_default(), &col, value);
                    } else {
                        log::debug!("Ignoring unknown row '{}' for column '{}'", row, col);
                    }
                }
            }
            Assignment::Positional(values) => {
                check_len(self.row_keys.len(), values.len())?;
                self.col_keys.insert(col.as_str());
                for (row, value) in self.row_keys.iter().zip(values) {
                    put(self.cells.entry(row.to_string()).or_default(), &col, value);
                }
            }
        }
        self.cells.retain(|_, cells| !cells.is_empty());
        Ok(())
    }

    /// Select rows and columns into a new table
    ///
    /// Keys that are not in this table are dropped. The result follows this
    /// table's key order, not the order of the request.
    pub fn select<R, C>(&self, rows: R, cols: C) -> Table
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let rows = requested(rows);
        let cols = requested(cols);
        self.project(|row| rows.contains(row), |col| cols.contains(col))
    }

    /// Select rows into a new table, keeping every column
    pub fn select_row<R>(&self, rows: R) -> Table
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        let rows = requested(rows);
        self.project(|row| rows.contains(row), |_| true)
    }

    /// Select columns into a new table, keeping every row
    pub fn select_col<C>(&self, cols: C) -> Table
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        let cols = requested(cols);
        self.project(|_| true, |col| cols.contains(col))
    }

    fn project(&self, keep_row: impl Fn(&str) -> bool, keep_col: impl Fn(&str) -> bool) -> Table {
        let row_keys: KeySet = self.row_keys.iter().filter(|row| keep_row(*row)).collect();
        let col_keys: KeySet = self.col_keys.iter().filter(|col| keep_col(*col)).collect();

        let mut cells = Cells::new();
        for row in row_keys.iter() {
            let Some(source) = self.cells.get(row) else {
                continue;
            };
            let kept: HashMap<String, String> = source
                .iter()
                .filter(|(col, _)| col_keys.contains(col))
                .map(|(col, value)| (col.clone(), value.clone()))
                .collect();
            if !kept.is_empty() {
                cells.insert(row.to_string(), kept);
            }
        }

        Table {
            primary_key: self.primary_key.clone(),
            row_keys,
            col_keys,
            comments: self.comments.clone(),
            cells,
        }
    }

    /// Merge another table into a copy of this one
    ///
    /// Keys are the union of both tables: this table's order first, then the
    /// other table's new keys in its order. Wherever `other` declares both
    /// the row and the column, its value wins, including an unset empty cell.
    pub fn merge(&self, other: &Table) -> Table {
        let mut merged = self.clone();
        for row in other.row_keys.iter() {
            merged.row_keys.insert(row);
        }
        for col in other.col_keys.iter() {
            merged.col_keys.insert(col);
        }

        for row in other.row_keys.iter() {
            let slot = merged.cells.entry(row.to_string()).or_default();
            for col in other.col_keys.iter() {
                put(slot, col, other.cell(row, col).to_string());
            }
        }
        merged.cells.retain(|_, cells| !cells.is_empty());
        merged
    }
}

/// Store a value, keeping storage sparse by dropping empty strings
fn put(slot: &mut HashMap<String, String>, col: &str, value: String) {
    if value.is_empty() {
        slot.remove(col);
    } else {
        slot.insert(col.to_string(), value);
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::LengthMismatch { expected, found })
    }
}

fn requested<I>(keys: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keys.into_iter().map(|key| key.as_ref().to_string()).collect()
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.primary_key == other.primary_key
            && self.comments == other.comments
            && self.row_keys == other.row_keys
            && self.col_keys == other.col_keys
            && self.row_keys.iter().all(|row| {
                self.col_keys
                    .iter()
                    .all(|col| self.cell(row, col) == other.cell(row, col))
            })
    }
}

impl Eq for Table {}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let format = TextFormat::default();
        self.render(f, format.separator, format.comment)
    }
}

impl FromStr for Table {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Table::load(s)
    }
}

#[derive(Serialize)]
struct RowRecord<'a> {
    key: &'a str,
    values: Vec<&'a str>,
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let rows: Vec<RowRecord<'_>> = self
            .row_keys
            .iter()
            .map(|key| RowRecord {
                key,
                values: self.col_keys.iter().map(|col| self.cell(key, col)).collect(),
            })
            .collect();

        let mut state = serializer.serialize_struct("Table", 4)?;
        state.serialize_field("primary_key", &self.primary_key)?;
        state.serialize_field("comments", &self.comments)?;
        state.serialize_field("col_keys", &self.col_keys)?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

/// A single row or column, viewed as label to value pairs in key order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    labels: &'a KeySet,
    values: Vec<&'a str>,
}

impl<'a> Record<'a> {
    /// Get the value under a label, or `None` if the label is unknown
    pub fn get(&self, label: &str) -> Option<&'a str> {
        self.labels.position(label).map(|i| self.values[i])
    }

    /// Get the number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the record has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get the values in label order
    pub fn values(&self) -> &[&'a str] {
        &self.values
    }

    /// Iterate over label and value pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.labels.iter().zip(self.values.iter().copied())
    }
}

/// New values for a row or column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Values keyed by column (for a row) or row (for a column) label
    Labeled(Vec<(String, String)>),
    /// Values aligned with the current key order
    Positional(Vec<String>),
}

impl From<Vec<(String, String)>> for Assignment {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Assignment::Labeled(pairs)
    }
}

impl From<Vec<(&str, &str)>> for Assignment {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Assignment::Labeled(
            pairs
                .into_iter()
                .map(|(label, value)| (label.to_string(), value.to_string()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for Assignment {
    fn from(pairs: HashMap<String, String>) -> Self {
        Assignment::Labeled(pairs.into_iter().collect())
    }
}

impl From<Vec<String>> for Assignment {
    fn from(values: Vec<String>) -> Self {
        Assignment::Positional(values)
    }
}

impl From<Vec<&str>> for Assignment {
    fn from(values: Vec<&str>) -> Self {
        Assignment::Positional(values.into_iter().map(str::to_string).collect())
    }
}
