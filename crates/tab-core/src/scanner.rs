//! Directory scanner for discovering layers on disk

use crate::error::Result;
use crate::layer::{layer_file, EdgeColumns, Layer, EDGE_FILE, NODE_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A layer found on disk, identified by its directory and filename prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// Directory holding the layer files
    pub dir: PathBuf,
    /// Prefix shared by the layer files (e.g. "[20150405]"), may be empty
    pub prefix: String,
    /// Whether a matching node table exists next to the edge table
    pub has_node_table: bool,
}

impl LayerEntry {
    /// Path of the edge table
    pub fn edge_path(&self) -> PathBuf {
        layer_file(&self.dir, &self.prefix, EDGE_FILE)
    }

    /// Path of the node table
    pub fn node_path(&self) -> PathBuf {
        layer_file(&self.dir, &self.prefix, NODE_FILE)
    }

    /// Load the layer
    pub fn load(&self, columns: &EdgeColumns) -> Result<Layer> {
        Layer::load(&self.dir, &self.prefix, columns)
    }
}

/// Result of scanning directories
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerScan {
    /// Root directories that were scanned
    pub roots: Vec<PathBuf>,
    /// Discovered layers, sorted by directory then prefix
    pub layers: Vec<LayerEntry>,
    /// Total number of `.tab` files found
    pub total_files: usize,
}

impl LayerScan {
    /// Find a layer by directory and prefix
    pub fn find(&self, dir: &Path, prefix: &str) -> Option<&LayerEntry> {
        self.layers
            .iter()
            .find(|layer| layer.dir == dir && layer.prefix == prefix)
    }
}

/// Scan one or more directories for layers
///
/// Every `<prefix>edge.tab` file marks a layer; its node table is optional.
pub fn scan_layers<P: AsRef<Path>>(roots: &[P]) -> Result<LayerScan> {
    let mut layers = Vec::new();
    let mut total_files = 0;

    for root in roots {
        let root = root.as_ref();

        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(file_name) = entry.file_name().to_str() else {
                log::warn!("Skipping non UTF-8 file name {}", entry.path().display());
                continue;
            };
            if !file_name.ends_with(".tab") {
                continue;
            }
            total_files += 1;

            if let Some(prefix) = file_name.strip_suffix(EDGE_FILE) {
                let dir = entry
                    .path()
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_default();
                let has_node_table = layer_file(&dir, prefix, NODE_FILE).is_file();
                layers.push(LayerEntry {
                    dir,
                    prefix: prefix.to_string(),
                    has_node_table,
                });
            }
        }
    }

    layers.sort_by(|a, b| a.dir.cmp(&b.dir).then_with(|| a.prefix.cmp(&b.prefix)));
    log::debug!(
        "Found {} layers in {} table files",
        layers.len(),
        total_files
    );

    Ok(LayerScan {
        roots: roots.iter().map(|r| r.as_ref().to_path_buf()).collect(),
        layers,
        total_files,
    })
}
