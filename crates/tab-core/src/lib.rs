//! tab-core: Core library for keyed tab-separated tables
//!
//! This library provides functionality to:
//! - Parse tab-separated text (with leading comment lines) into tables
//! - Read and write cells, rows and columns with empty-string defaults
//! - Select rows and columns into independent tables
//! - Merge tables on their row keys, the right-hand table winning on overlap
//! - Load and save node/edge layers and discover them on disk
//! - Run JSON merge plans

pub mod error;
pub mod keys;
pub mod layer;
pub mod parser;
pub mod plan;
pub mod scanner;
pub mod table;

pub use error::{Error, Result};
pub use keys::KeySet;
pub use layer::{edge_key, stamp_prefix, stamp_prefix_for, EdgeColumns, Layer};
pub use parser::{parse_tab, parse_tab_str, TextFormat};
pub use plan::{merge_files, run_plan, MergePlan, PlanResult};
pub use scanner::{scan_layers, LayerEntry, LayerScan};
pub use table::{Assignment, Record, Table, DEFAULT_PRIMARY_KEY};
