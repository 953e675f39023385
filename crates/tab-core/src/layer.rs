//! Layers: a node table and an edge table stored side by side
//!
//! A layer lives in a directory as two table files, `node.tab` and
//! `edge.tab`, optionally sharing a filename prefix such as a date stamp:
//!
//! ```text
//! co-occurrence/[20150405]node.tab
//! co-occurrence/[20150405]edge.tab
//! ```
//!
//! Each edge row names its source and target node (and optionally an
//! interaction type). Nodes referenced by edges are always present in the
//! node table, with extra node attributes merged in from `node.tab`.

use crate::error::{Error, Result};
use crate::parser::{self, parse_tab, TextFormat};
use crate::table::Table;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the node table within a layer directory
pub const NODE_FILE: &str = "node.tab";
/// File name of the edge table within a layer directory
pub const EDGE_FILE: &str = "edge.tab";

/// Names of the edge file columns that identify an edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeColumns {
    pub source: String,
    pub target: String,
    pub interaction: Option<String>,
}

impl Default for EdgeColumns {
    fn default() -> Self {
        Self {
            source: "Source".to_string(),
            target: "Target".to_string(),
            interaction: None,
        }
    }
}

impl EdgeColumns {
    /// Primary key label of the edge table
    pub fn primary_key(&self) -> String {
        edge_key(&self.source, self.interaction.as_deref(), &self.target)
    }
}

/// Row key of an edge: source, interaction (if any) and target joined by tabs
pub fn edge_key(source: &str, interaction: Option<&str>, target: &str) -> String {
    match interaction {
        Some(interaction) => format!("{source}\t{interaction}\t{target}"),
        None => format!("{source}\t{target}"),
    }
}

/// Path of a layer file for the given directory and prefix
pub fn layer_file(dir: &Path, prefix: &str, name: &str) -> PathBuf {
    dir.join(format!("{prefix}{name}"))
}

/// Today's date as a layer file prefix, e.g. `[20150405]`
pub fn stamp_prefix() -> String {
    stamp_prefix_for(Local::now().date_naive())
}

/// A date as a layer file prefix
pub fn stamp_prefix_for(date: NaiveDate) -> String {
    date.format("[%Y%m%d]").to_string()
}

/// A node table paired with an edge table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    node_tab: Table,
    edge_tab: Table,
}

impl Default for Layer {
    fn default() -> Self {
        Self::new()
    }
}

impl Layer {
    /// Create an empty layer
    pub fn new() -> Self {
        Self {
            node_tab: Table::with_primary_key("Node"),
            edge_tab: Table::with_primary_key("Edge"),
        }
    }

    /// Create a layer from existing tables
    pub fn from_tables(node_tab: Table, edge_tab: Table) -> Self {
        Self { node_tab, edge_tab }
    }

    /// Get the node table
    pub fn node_tab(&self) -> &Table {
        &self.node_tab
    }

    /// Get the edge table
    pub fn edge_tab(&self) -> &Table {
        &self.edge_tab
    }

    /// Get the node table for editing
    pub fn node_tab_mut(&mut self) -> &mut Table {
        &mut self.node_tab
    }

    /// Get the edge table for editing
    pub fn edge_tab_mut(&mut self) -> &mut Table {
        &mut self.edge_tab
    }

    /// Load a layer from `<dir>/<prefix>edge.tab` and `<dir>/<prefix>node.tab`
    ///
    /// The node file is optional; without it the node table only holds the
    /// nodes named by edges.
    pub fn load<P: AsRef<Path>>(dir: P, prefix: &str, columns: &EdgeColumns) -> Result<Self> {
        let dir = dir.as_ref();
        let edge_path = layer_file(dir, prefix, EDGE_FILE);
        let node_path = layer_file(dir, prefix, NODE_FILE);

        let content = fs::read_to_string(&edge_path).map_err(|e| Error::FileRead {
            path: edge_path.clone(),
            source: e,
        })?;
        let (mut node_tab, edge_tab) = parse_edges(&content, columns, &edge_path)?;

        if node_path.is_file() {
            let nodes = parse_tab(&node_path, &TextFormat::default())?;
            node_tab.set_primary_key(nodes.primary_key());
            node_tab = node_tab.merge(&nodes);
        } else {
            log::warn!(
                "No node table at {}, using nodes from edges only",
                node_path.display()
            );
        }

        log::info!(
            "Loaded layer from {}: {} nodes, {} edges",
            dir.display(),
            node_tab.row_count(),
            edge_tab.row_count()
        );
        Ok(Self { node_tab, edge_tab })
    }

    /// Save both tables under `dir`, creating it if needed
    pub fn save<P: AsRef<Path>>(&self, dir: P, prefix: &str) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| Error::FileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;

        self.edge_tab.save(layer_file(dir, prefix, EDGE_FILE))?;
        self.node_tab.save(layer_file(dir, prefix, NODE_FILE))?;

        log::info!(
            "Saved layer to {} with prefix '{}'",
            dir.display(),
            prefix
        );
        Ok(())
    }
}

/// Parse an edge file into (node table, edge table)
fn parse_edges(content: &str, columns: &EdgeColumns, path: &Path) -> Result<(Table, Table)> {
    let format = TextFormat::default();
    let (comments, body) = parser::split_comments(content, format.comment);
    let mut reader = parser::reader(body, &format)?;
    let mut records = reader.records();

    let header = records.next().ok_or(Error::MissingHeader)??;
    let header_start = parser::start_of(body, &header);
    let header: Vec<&str> = header.iter().collect();
    let find = |role: &'static str, name: &str| {
        header
            .iter()
            .position(|col| *col == name)
            .ok_or_else(|| Error::MissingColumn {
                role,
                column: name.to_string(),
                path: path.to_path_buf(),
            })
    };
    let i_src = find("source", columns.source.as_str())?;
    let i_tgt = find("target", columns.target.as_str())?;
    let i_typ = match &columns.interaction {
        Some(name) => Some(find("interaction", name.as_str())?),
        None => None,
    };
    let is_attribute = |i: usize| i != i_src && i != i_tgt && Some(i) != i_typ;

    let attributes: Vec<&str> = header
        .iter()
        .enumerate()
        .filter(|(i, _)| is_attribute(*i))
        .map(|(_, col)| *col)
        .collect();
    let mut edge_tab = Table::new(columns.primary_key(), Vec::<String>::new(), attributes)?;
    edge_tab.set_comments(comments);
    let mut node_tab = Table::with_primary_key("Node");

    for result in records {
        let record = result?;
        let fields: Vec<&str> = record.iter().collect();
        if fields.len() != header.len() {
            return Err(Error::RowSize {
                line: parser::line_of(body, header_start, &record),
                expected: header.len(),
                found: fields.len(),
            });
        }

        let source = fields[i_src];
        let target = fields[i_tgt];
        node_tab.add_row(source);
        node_tab.add_row(target);

        let key = edge_key(source, i_typ.map(|i| fields[i]), target);
        if edge_tab.has_row(&key) {
            return Err(Error::DuplicateRow(key));
        }
        let values: Vec<&str> = fields
            .iter()
            .enumerate()
            .filter(|(i, _)| is_attribute(*i))
            .map(|(_, value)| *value)
            .collect();
        edge_tab.set_row(key, values)?;
    }

    Ok((node_tab, edge_tab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_new_layer() {
        let layer = Layer::new();
        assert_eq!(layer.node_tab().primary_key(), "Node");
        assert_eq!(layer.edge_tab().primary_key(), "Edge");
        assert_eq!(layer.edge_tab().row_count(), 0);
    }

    #[test]
    fn test_load_layer() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "edge.tab",
            "Source\tWeight\tTarget\na\t0.5\tb\nb\t0.1\tc\n",
        );
        write(dir.path(), "node.tab", "Gene\tName\nc\tgamma\na\talpha\nz\tzeta\n");

        let layer = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap();

        let edges = layer.edge_tab();
        assert_eq!(edges.primary_key(), "Source\tTarget");
        assert_eq!(edges.col_keys(), &["Weight"]);
        assert_eq!(edges.row_keys(), &["a\tb", "b\tc"]);
        assert_eq!(edges.get_ele(&edge_key("b", None, "c"), "Weight"), Some("0.1"));

        let nodes = layer.node_tab();
        assert_eq!(nodes.primary_key(), "Gene");
        assert_eq!(nodes.row_keys(), &["a", "b", "c", "z"]);
        assert_eq!(nodes.get_ele("a", "Name"), Some("alpha"));
        assert_eq!(nodes.get_ele("b", "Name"), Some(""));
    }

    #[test]
    fn test_load_with_interaction_and_prefix() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "[20150405]edge.tab",
            "From\tKind\tTo\tScore\nx\tbinds\ty\t3\nx\tinhibits\ty\t1\n",
        );
        let columns = EdgeColumns {
            source: "From".to_string(),
            target: "To".to_string(),
            interaction: Some("Kind".to_string()),
        };

        let layer = Layer::load(dir.path(), "[20150405]", &columns).unwrap();

        assert_eq!(layer.edge_tab().primary_key(), "From\tKind\tTo");
        assert_eq!(
            layer.edge_tab().get_ele("x\tinhibits\ty", "Score"),
            Some("1")
        );
        assert_eq!(layer.node_tab().row_keys(), &["x", "y"]);
        assert_eq!(layer.node_tab().primary_key(), "Node");
    }

    #[test]
    fn test_load_missing_column() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "edge.tab", "Source\tTo\na\tb\n");

        let err = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingColumn { role: "target", ref column, .. } if column == "Target"
        ));
    }

    #[test]
    fn test_load_inconsistent_edge_row() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "edge.tab", "Source\tTarget\tW\na\tb\t1\nb\tc\n");

        let err = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, Error::RowSize { line: 3, .. }));
    }

    #[test]
    fn test_inconsistent_edge_row_after_blank_lines() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "edge.tab",
            "#edges\n\nSource\tTarget\tW\na\tb\t1\n\nb\tc\n",
        );

        let err = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::RowSize {
                line: 4,
                expected: 3,
                found: 2
            }
        ));
    }

    #[test]
    fn test_load_duplicate_edge() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "edge.tab", "Source\tTarget\na\tb\na\tb\n");

        let err = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap_err();
        assert!(matches!(err, Error::DuplicateRow(_)));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "edge.tab", "Source\tTarget\tW\na\tb\t1\n");
        write(dir.path(), "node.tab", "Node\tLabel\na\tA\nb\tB\n");
        let layer = Layer::load(dir.path(), "", &EdgeColumns::default()).unwrap();

        let out = dir.path().join("copy");
        layer.save(&out, "v1_").unwrap();
        assert!(out.join("v1_edge.tab").is_file());
        assert!(out.join("v1_node.tab").is_file());

        let reloaded = Layer::load(&out, "v1_", &EdgeColumns::default()).unwrap();
        assert_eq!(reloaded, layer);
    }

    #[test]
    fn test_stamp_prefix() {
        let date = NaiveDate::from_ymd_opt(2015, 4, 5).unwrap();
        assert_eq!(stamp_prefix_for(date), "[20150405]");
        assert_eq!(stamp_prefix().len(), "[20150405]".len());
    }
}
