//! Tab Table CLI
//!
//! Command-line tool for inspecting, selecting and merging keyed tab-separated
//! tables and node/edge layers.

use clap::{Parser, Subcommand};
use tab_core::{
    merge_files, run_plan, scan_layers, stamp_prefix, EdgeColumns, Layer, MergePlan, Table,
    TextFormat,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "tab-cli")]
#[command(about = "Keyed tab-separated table tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and display a table
    Show {
        /// Path to table file
        #[arg(short, long)]
        file: PathBuf,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,

        /// Columns to display (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,

        /// Print the table as JSON
        #[arg(long)]
        json: bool,

        /// Field separator (default: tab)
        #[arg(short, long)]
        separator: Option<char>,
    },

    /// Print a single cell
    Get {
        /// Path to table file
        #[arg(short, long)]
        file: PathBuf,

        /// Row key
        #[arg(long)]
        row: String,

        /// Column key
        #[arg(long)]
        col: String,

        /// Field separator (default: tab)
        #[arg(short, long)]
        separator: Option<char>,
    },

    /// Select rows and columns from a table
    Select {
        /// Path to table file
        #[arg(short, long)]
        file: PathBuf,

        /// Rows to keep (comma-separated), all if omitted
        #[arg(short, long)]
        rows: Option<String>,

        /// Columns to keep (comma-separated), all if omitted
        #[arg(short, long)]
        columns: Option<String>,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field separator (default: tab)
        #[arg(short, long)]
        separator: Option<char>,
    },

    /// Merge tables in order, later tables winning on overlap
    Merge {
        /// Tables to merge
        #[arg(short, long, required = true)]
        file: Vec<PathBuf>,

        /// Output file, stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Field separator (default: tab)
        #[arg(short, long)]
        separator: Option<char>,
    },

    /// Load a layer and print a summary, optionally saving a copy
    Layer {
        /// Layer directory
        #[arg(short, long)]
        dir: PathBuf,

        /// Filename prefix of the layer files
        #[arg(short, long, default_value = "")]
        prefix: String,

        /// Source node column of the edge table
        #[arg(long, default_value = "Source")]
        source: String,

        /// Target node column of the edge table
        #[arg(long, default_value = "Target")]
        target: String,

        /// Interaction type column of the edge table
        #[arg(long)]
        interaction: Option<String>,

        /// Save a copy of the layer into this directory
        #[arg(long)]
        save_to: Option<PathBuf>,

        /// Prefix the saved copy with today's date stamp
        #[arg(long)]
        stamp: bool,
    },

    /// Scan directories for layers
    Scan {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,
    },

    /// Run a merge plan
    RunPlan {
        /// Path to plan file (JSON)
        #[arg(short, long)]
        plan: PathBuf,
    },

    /// Create a merge plan file
    CreatePlan {
        /// Output path for the plan file
        #[arg(short, long)]
        output: PathBuf,

        /// Input tables, in merge order
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Table the plan writes
        #[arg(short, long)]
        target: PathBuf,

        /// Rows to keep (comma-separated)
        #[arg(short, long)]
        rows: Option<String>,

        /// Columns to keep (comma-separated)
        #[arg(short, long)]
        columns: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp_millis()
        .init();
}

fn run(command: Commands) -> tab_core::Result<()> {
    match command {
        Commands::Show {
            file,
            limit,
            columns,
            json,
            separator,
        } => cmd_show(&file, limit, columns, json, &text_format(separator)),
        Commands::Get {
            file,
            row,
            col,
            separator,
        } => cmd_get(&file, &row, &col, &text_format(separator)),
        Commands::Select {
            file,
            rows,
            columns,
            output,
            separator,
        } => cmd_select(&file, rows, columns, output, &text_format(separator)),
        Commands::Merge {
            file,
            output,
            separator,
        } => cmd_merge(&file, output, &text_format(separator)),
        Commands::Layer {
            dir,
            prefix,
            source,
            target,
            interaction,
            save_to,
            stamp,
        } => {
            let columns = EdgeColumns {
                source,
                target,
                interaction,
            };
            cmd_layer(&dir, &prefix, &columns, save_to, stamp)
        }
        Commands::Scan { root } => cmd_scan(&root),
        Commands::RunPlan { plan } => cmd_run_plan(&plan),
        Commands::CreatePlan {
            output,
            input,
            target,
            rows,
            columns,
        } => cmd_create_plan(&output, input, target, rows, columns),
    }
}

fn text_format(separator: Option<char>) -> TextFormat {
    separator.map_or_else(TextFormat::default, TextFormat::with_separator)
}

fn split_list(list: Option<String>) -> Option<Vec<String>> {
    list.map(|l| l.split(',').map(|s| s.trim().to_string()).collect())
}

fn cmd_show(
    file: &Path,
    limit: Option<usize>,
    columns: Option<String>,
    json: bool,
    format: &TextFormat,
) -> tab_core::Result<()> {
    let mut table = tab_core::parse_tab(file, format)?;
    if let Some(cols) = split_list(columns) {
        table = table.select_col(cols);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Primary key: {}", table.primary_key());
    println!("Columns: {}", table.col_count());
    println!("Rows: {}", table.row_count());
    for comment in table.comments() {
        println!("# {}", comment.trim_start());
    }
    println!();

    let mut header = vec![table.primary_key()];
    header.extend(table.col_keys().iter().map(String::as_str));
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    let row_limit = limit.unwrap_or(table.row_count());
    for key in table.row_keys().iter().take(row_limit) {
        if let Some(row) = table.get_row(key) {
            println!("{}\t{}", key, row.values().join("\t"));
        }
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }

    Ok(())
}

fn cmd_get(file: &Path, row: &str, col: &str, format: &TextFormat) -> tab_core::Result<()> {
    let table = tab_core::parse_tab(file, format)?;

    match table.get_ele(row, col) {
        Some(value) => println!("{}", value),
        None => {
            let missing = if table.has_row(row) {
                format!("column '{}'", col)
            } else {
                format!("row '{}'", row)
            };
            eprintln!("Not found: {} in {}", missing, file.display());
            std::process::exit(2);
        }
    }

    Ok(())
}

fn cmd_select(
    file: &Path,
    rows: Option<String>,
    columns: Option<String>,
    output: Option<PathBuf>,
    format: &TextFormat,
) -> tab_core::Result<()> {
    let table = tab_core::parse_tab(file, format)?;

    let selected = match (split_list(rows), split_list(columns)) {
        (None, None) => table,
        (Some(rows), None) => table.select_row(rows),
        (None, Some(cols)) => table.select_col(cols),
        (Some(rows), Some(cols)) => table.select(rows, cols),
    };

    write_table(&selected, output.as_deref(), format)
}

fn cmd_merge(files: &[PathBuf], output: Option<PathBuf>, format: &TextFormat) -> tab_core::Result<()> {
    let merged = merge_files(files, format)?;
    log::info!(
        "Merged {} tables: {} rows x {} columns",
        files.len(),
        merged.row_count(),
        merged.col_count()
    );
    write_table(&merged, output.as_deref(), format)
}

fn write_table(table: &Table, output: Option<&Path>, format: &TextFormat) -> tab_core::Result<()> {
    match output {
        Some(path) => {
            table.save_with(path, format)?;
            println!(
                "Wrote {} rows x {} columns to {}",
                table.row_count(),
                table.col_count(),
                path.display()
            );
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{}", table.to_string_with(format))?;
        }
    }
    Ok(())
}

fn cmd_layer(
    dir: &Path,
    prefix: &str,
    columns: &EdgeColumns,
    save_to: Option<PathBuf>,
    stamp: bool,
) -> tab_core::Result<()> {
    let layer = Layer::load(dir, prefix, columns)?;

    println!("Layer: {}", dir.display());
    println!(
        "Nodes: {} ({} attributes)",
        layer.node_tab().row_count(),
        layer.node_tab().col_count()
    );
    println!(
        "Edges: {} ({} attributes)",
        layer.edge_tab().row_count(),
        layer.edge_tab().col_count()
    );

    if let Some(target) = save_to {
        let prefix = if stamp { stamp_prefix() } else { prefix.to_string() };
        layer.save(&target, &prefix)?;
        println!("Saved to {} with prefix '{}'", target.display(), prefix);
    }

    Ok(())
}

fn cmd_scan(roots: &[PathBuf]) -> tab_core::Result<()> {
    let result = scan_layers(roots)?;

    println!("Scanned {} root(s):", result.roots.len());
    for root in &result.roots {
        println!("  {}", root.display());
    }
    println!();
    println!(
        "Found {} layers in {} table files",
        result.layers.len(),
        result.total_files
    );

    for layer in &result.layers {
        let prefix = if layer.prefix.is_empty() {
            String::new()
        } else {
            format!(" [prefix {}]", layer.prefix)
        };
        let nodes = if layer.has_node_table { "" } else { " (no node table)" };
        println!("  {}{}{}", layer.dir.display(), prefix, nodes);
    }

    Ok(())
}

fn cmd_run_plan(plan_path: &Path) -> tab_core::Result<()> {
    let plan = MergePlan::load(plan_path)?;
    println!("Running plan with {} inputs", plan.inputs.len());

    let result = run_plan(&plan)?;

    println!();
    println!("Plan complete:");
    println!("  {} tables merged", result.inputs);
    println!(
        "  {} rows x {} columns written to {}",
        result.row_count,
        result.col_count,
        result.output.display()
    );

    Ok(())
}

fn cmd_create_plan(
    output: &Path,
    inputs: Vec<PathBuf>,
    target: PathBuf,
    rows: Option<String>,
    columns: Option<String>,
) -> tab_core::Result<()> {
    let inputs = if inputs.is_empty() {
        vec![PathBuf::from("base.tab"), PathBuf::from("overlay.tab")]
    } else {
        inputs
    };

    let mut plan = MergePlan::new(inputs, target);
    plan.rows = split_list(rows);
    plan.cols = split_list(columns);

    plan.save(output)?;
    println!("Created plan file: {}", output.display());
    println!("Inputs: {}", plan.inputs.len());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  tab-cli run-plan --plan {}", output.display());

    Ok(())
}
