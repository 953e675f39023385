//! Merge plans: JSON job files that merge several tables into one
//!
//! A plan lists input tables in merge order. Later inputs win wherever
//! they overlap earlier ones. The merged table can be narrowed to a set of
//! rows and columns before it is written out.

use crate::error::{Error, Result};
use crate::parser::{parse_tab, TextFormat};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A merge job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePlan {
    /// Input tables, in merge order
    pub inputs: Vec<PathBuf>,
    /// Output table path
    pub output: PathBuf,
    /// Rows to keep, all if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<String>>,
    /// Columns to keep, all if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<Vec<String>>,
    /// Text format of inputs and output
    #[serde(default)]
    pub format: TextFormat,
}

impl MergePlan {
    /// Create a plan with no selection and the default format
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            rows: None,
            cols: None,
            format: TextFormat::default(),
        }
    }

    /// Load a plan from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the plan as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content).map_err(|e| Error::FileWrite {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        Ok(())
    }
}

/// Outcome of running a plan
#[derive(Debug, Clone)]
pub struct PlanResult {
    /// File that was written
    pub output: PathBuf,
    /// Number of input tables merged
    pub inputs: usize,
    /// Rows in the written table
    pub row_count: usize,
    /// Columns in the written table
    pub col_count: usize,
}

/// Load tables and merge them in order, later tables winning on overlap
pub fn merge_files<P: AsRef<Path>>(paths: &[P], format: &TextFormat) -> Result<Table> {
    let (first, rest) = paths.split_first().ok_or(Error::EmptyPlan)?;

    let mut merged = parse_tab(first, format)?;
    for path in rest {
        let next = parse_tab(path, format)?;
        merged = merged.merge(&next);
    }
    Ok(merged)
}

/// Run a merge plan and write its output
pub fn run_plan(plan: &MergePlan) -> Result<PlanResult> {
    let merged = merge_files(&plan.inputs, &plan.format)?;

    let table = match (&plan.rows, &plan.cols) {
        (None, None) => merged,
        (Some(rows), None) => merged.select_row(rows),
        (None, Some(cols)) => merged.select_col(cols),
        (Some(rows), Some(cols)) => merged.select(rows, cols),
    };

    table.save_with(&plan.output, &plan.format)?;
    log::info!(
        "Merged {} tables into {} ({} rows x {} columns)",
        plan.inputs.len(),
        plan.output.display(),
        table.row_count(),
        table.col_count()
    );

    Ok(PlanResult {
        output: plan.output.clone(),
        inputs: plan.inputs.len(),
        row_count: table.row_count(),
        col_count: table.col_count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_inputs(dir: &Path) -> Vec<PathBuf> {
        let base = dir.join("base.tab");
        let overlay = dir.join("overlay.tab");
        fs::write(&base, "ID\tA\tB\n1\tx\t1\n2\ty\t2\n").unwrap();
        fs::write(&overlay, "ID\tB\tC\n1\tab\tz\n3\tq\tw\n").unwrap();
        vec![base, overlay]
    }

    #[test]
    fn test_plan_serialization() {
        let mut plan = MergePlan::new(vec![PathBuf::from("a.tab")], "out.tab");
        plan.cols = Some(vec!["B".to_string()]);

        let json = serde_json::to_string_pretty(&plan).unwrap();
        assert!(!json.contains("\"rows\""));
        let loaded: MergePlan = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, plan);

        let minimal: MergePlan =
            serde_json::from_str(r#"{"inputs": ["a.tab"], "output": "b.tab"}"#).unwrap();
        assert_eq!(minimal.format, TextFormat::default());
        assert!(minimal.rows.is_none());
    }

    #[test]
    fn test_merge_files_in_order() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(dir.path());

        let merged = merge_files(&inputs, &TextFormat::default()).unwrap();
        assert_eq!(merged.row_keys(), &["1", "2", "3"]);
        assert_eq!(merged.col_keys(), &["A", "B", "C"]);
        assert_eq!(merged.get_ele("1", "B"), Some("ab"));
        assert_eq!(merged.get_ele("2", "B"), Some("2"));
        assert_eq!(merged.get_ele("3", "A"), Some(""));
    }

    #[test]
    fn test_run_plan_with_selection() {
        let dir = TempDir::new().unwrap();
        let inputs = write_inputs(dir.path());
        let output = dir.path().join("out.tab");

        let mut plan = MergePlan::new(inputs, &output);
        plan.rows = Some(vec!["3".to_string(), "1".to_string(), "9".to_string()]);
        plan.cols = Some(vec!["C".to_string(), "B".to_string()]);

        let plan_path = dir.path().join("plan.json");
        plan.save(&plan_path).unwrap();
        let result = run_plan(&MergePlan::load(&plan_path).unwrap()).unwrap();

        assert_eq!(result.inputs, 2);
        assert_eq!(result.row_count, 2);
        assert_eq!(result.col_count, 2);
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "ID\tB\tC\n1\tab\tz\n3\tq\tw\n"
        );
    }

    #[test]
    fn test_empty_plan() {
        let plan = MergePlan::new(Vec::new(), "out.tab");
        assert!(matches!(run_plan(&plan), Err(Error::EmptyPlan)));
    }
}
