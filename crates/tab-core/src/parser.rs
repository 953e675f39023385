//! Parser for tab-separated table text

use crate::error::{Error, Result};
use crate::keys::KeySet;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Field separator and comment marker of the text format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFormat {
    /// Field separator, tab by default
    pub separator: char,
    /// Marker that starts a leading comment line
    pub comment: char,
}

impl Default for TextFormat {
    fn default() -> Self {
        Self {
            separator: '\t',
            comment: '#',
        }
    }
}

impl TextFormat {
    /// Tab-separated format with a different field separator
    pub fn with_separator(separator: char) -> Self {
        Self {
            separator,
            ..Self::default()
        }
    }

    /// Check that both markers can be used as single-byte delimiters
    pub fn validate(&self) -> Result<()> {
        ascii_byte(self.separator)?;
        ascii_byte(self.comment)?;
        Ok(())
    }
}

fn ascii_byte(c: char) -> Result<u8> {
    if c.is_ascii() && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(Error::InvalidSeparator(c))
    }
}

/// Parse a table file
pub fn parse_tab<P: AsRef<Path>>(path: P, format: &TextFormat) -> Result<Table> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let table = parse_tab_str(&content, format)?;
    log::debug!(
        "Parsed {} rows x {} columns from {}",
        table.row_count(),
        table.col_count(),
        path.display()
    );
    Ok(table)
}

/// Parse a table from a string
///
/// Leading comment lines are collected first. The next line is the header,
/// holding the primary key label followed by the column keys. Every other
/// line is a row key followed by exactly one value per column. Line numbers
/// in errors count the header as line 1.
pub fn parse_tab_str(content: &str, format: &TextFormat) -> Result<Table> {
    let (comments, body) = split_comments(content, format.comment);
    let mut reader = reader(body, format)?;
    let mut records = reader.records();

    let header = records.next().ok_or(Error::MissingHeader)??;
    let header_start = start_of(body, &header);
    let mut fields = header.iter();
    let primary_key = fields.next().unwrap_or_default().to_string();
    let col_keys = KeySet::from_keys(fields).map_err(Error::DuplicateColumn)?;

    let mut row_keys = KeySet::new();
    let mut cells = HashMap::new();
    for result in records {
        let record = result?;
        let mut fields = record.iter();
        let Some(key) = fields.next() else {
            continue;
        };

        let values: Vec<&str> = fields.collect();
        if values.len() != col_keys.len() {
            return Err(Error::RowSize {
                line: line_of(body, header_start, &record),
                expected: col_keys.len(),
                found: values.len(),
            });
        }
        if !row_keys.insert(key) {
            return Err(Error::DuplicateRow(key.to_string()));
        }

        let row: HashMap<String, String> = col_keys
            .iter()
            .zip(values)
            .filter(|(_, value)| !value.is_empty())
            .map(|(col, value)| (col.to_string(), value.to_string()))
            .collect();
        if !row.is_empty() {
            cells.insert(key.to_string(), row);
        }
    }

    Ok(Table::from_parts(
        primary_key,
        row_keys,
        col_keys,
        comments,
        cells,
    ))
}

/// Split off leading comment lines, returning them without the marker
pub(crate) fn split_comments(content: &str, marker: char) -> (Vec<String>, &str) {
    let mut comments = Vec::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let Some(text) = line.strip_prefix(marker) else {
            break;
        };
        comments.push(text.trim_end_matches(['\n', '\r']).to_string());
        offset += line.len();
    }

    (comments, &content[offset..])
}

/// Build an unquoted reader that leaves field-count checks to the caller
pub(crate) fn reader<'a>(body: &'a str, format: &TextFormat) -> Result<csv::Reader<&'a [u8]>> {
    format.validate()?;
    Ok(csv::ReaderBuilder::new()
        .delimiter(ascii_byte(format.separator)?)
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(body.as_bytes()))
}

/// Byte offset where a record's text begins within the body
///
/// The reader reports the offset just past the previous record, before any
/// blank lines it skipped, so those terminators are stepped over here.
pub(crate) fn start_of(body: &str, record: &csv::StringRecord) -> usize {
    let pos = record.position().map_or(0, |pos| pos.byte() as usize);
    let rest = body.get(pos..).unwrap_or_default();
    pos + (rest.len() - rest.trim_start_matches(['\r', '\n']).len())
}

/// 1-based line of a record, the header being line 1
pub(crate) fn line_of(body: &str, header_start: usize, record: &csv::StringRecord) -> u64 {
    let end = start_of(body, record);
    let newlines = body
        .get(header_start..end)
        .map_or(0, |span| span.matches('\n').count());
    newlines as u64 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let table = parse_tab_str("ID\tA\tB\n1\tC++\tgood\n2\tRuby\tbetter\n", &TextFormat::default())
            .unwrap();

        assert_eq!(table.primary_key(), "ID");
        assert_eq!(table.col_keys(), &["A", "B"]);
        assert_eq!(table.row_keys(), &["1", "2"]);
        assert_eq!(table.get_ele("2", "A"), Some("Ruby"));
        assert!(table.comments().is_empty());
    }

    #[test]
    fn test_parse_comments() {
        let text = "#first\n# second\nID\tA\n1\tx\n#not a comment\ty\n";
        let table = parse_tab_str(text, &TextFormat::default()).unwrap();

        assert_eq!(table.comments(), &["first", " second"]);
        assert_eq!(table.row_keys(), &["1", "#not a comment"]);
        assert_eq!(table.get_ele("#not a comment", "A"), Some("y"));
    }

    #[test]
    fn test_parse_keeps_empty_fields() {
        let table = parse_tab_str("ID\tA\tB\n1\t\t\n2\tx\t\n", &TextFormat::default()).unwrap();
        assert_eq!(table.get_ele("1", "A"), Some(""));
        assert_eq!(table.get_ele("1", "B"), Some(""));
        assert_eq!(table.get_ele("2", "A"), Some("x"));
    }

    #[test]
    fn test_parse_crlf_and_quotes() {
        let table = parse_tab_str("ID\tA\r\n1\t\"quoted\"\r\n", &TextFormat::default()).unwrap();
        assert_eq!(table.get_ele("1", "A"), Some("\"quoted\""));
    }

    #[test]
    fn test_duplicate_column() {
        let err = parse_tab_str("ID\tA\tA\n1\tC++\tgood\n", &TextFormat::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(col) if col == "A"));
    }

    #[test]
    fn test_duplicate_row() {
        let err = parse_tab_str("ID\tA\tB\n1\tC++\tgood\n1\tRuby\tbetter\n", &TextFormat::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRow(row) if row == "1"));
    }

    #[test]
    fn test_row_size_reports_line() {
        let err = parse_tab_str("ID\tA\tB\n1\tC++\tgood\n2\tRuby\n", &TextFormat::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RowSize {
                line: 3,
                expected: 2,
                found: 1
            }
        ));

        // Comment lines do not count
        let err = parse_tab_str("#c\n#d\nID\tA\n1\tx\ty\n", &TextFormat::default()).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 2, found: 2, .. }));
    }

    #[test]
    fn test_row_size_counts_blank_lines() {
        let format = TextFormat::default();

        let err = parse_tab_str("ID\tA\n\n1\tx\ty", &format).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 3, .. }));

        let err = parse_tab_str("ID\tA\n1\tx\n\n\n2\ty\tz", &format).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 5, .. }));

        // Blank lines before the header do not shift the count
        let err = parse_tab_str("#c\n\nID\tA\n1\tx\ty", &format).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 2, .. }));

        let err = parse_tab_str("ID\tA\r\n\r\n1\tx\ty\r\n", &format).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 3, .. }));
    }

    #[test]
    fn test_missing_header() {
        let err = parse_tab_str("#only a comment\n", &TextFormat::default()).unwrap_err();
        assert!(matches!(err, Error::MissingHeader));
        assert!(matches!(
            parse_tab_str("", &TextFormat::default()),
            Err(Error::MissingHeader)
        ));
    }

    #[test]
    fn test_custom_separator() {
        let format = TextFormat::with_separator(',');
        let table = parse_tab_str("ID,A,B\n1,x,y\n", &format).unwrap();
        assert_eq!(table.get_ele("1", "B"), Some("y"));

        let err = parse_tab_str("ID\tA", &TextFormat::with_separator('→')).unwrap_err();
        assert!(matches!(err, Error::InvalidSeparator('→')));
    }

    #[test]
    fn test_format_from_json_defaults() {
        let format: TextFormat = serde_json::from_str(r#"{"separator": ","}"#).unwrap();
        assert_eq!(format.separator, ',');
        assert_eq!(format.comment, '#');
    }

    #[test]
    fn test_parse_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("table.tab");
        fs::write(&path, "ID\tA\n1\tx\n").unwrap();

        let table = parse_tab(&path, &TextFormat::default()).unwrap();
        assert_eq!(table.get_ele("1", "A"), Some("x"));

        let err = parse_tab(dir.path().join("missing.tab"), &TextFormat::default()).unwrap_err();
        assert!(matches!(err, Error::FileRead { .. }));
    }

    #[test]
    fn test_save_then_load_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.tab");
        let text = "#note\nID\tA\tB\n1\tx\t\n2\t\ty";
        let table = Table::load(text).unwrap();

        table.save(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), format!("{text}\n"));
        assert_eq!(Table::load_file(&path).unwrap(), table);
    }
}
