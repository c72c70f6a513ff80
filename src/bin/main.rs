//! threadline CLI - Column lineage from dashboard fields to source columns
//!
//! Usage:
//!   threadline db-lineage <facts.csv> [-o <out.json>]
//!   threadline stitch <bi.json> <facts.csv> [--json <out.json>] [--csv <out.csv>]
//!   threadline flatten <combined.json> [-o <out.csv>] [--format csv|json]
//!   threadline cycles <facts.csv>
//!   threadline parse-response <response.txt>
//!   threadline refresh-plan <current.csv> <previous.csv>
//!
//! Examples:
//!   threadline stitch tableau_lineage.json column_lineage.csv --csv flattened.csv
//!   threadline -vv db-lineage column_lineage.csv -o db_lineage.json

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use threadline::config::{Settings, SettingsError};
use threadline::document::stitch;
use threadline::export::{self, ExportError, ExportResult};
use threadline::facts::refresh::plan_refresh;
use threadline::facts::response::parse_inference_response;
use threadline::lineage::{detect_cycles, TreeBuilder};
use threadline::merge::Merger;
use threadline::telemetry;
use tracing::info;

const DB_LINEAGE_FILE: &str = "db_lineage.json";
const COMBINED_FILE: &str = "combined_lineage.json";
const FLATTENED_CSV_FILE: &str = "flattened_lineage.csv";
const FLATTENED_JSON_FILE: &str = "flattened_lineage.json";

#[derive(Parser)]
#[command(name = "threadline")]
#[command(about = "threadline - Column lineage from dashboard fields to source columns")]
#[command(version)]
struct Cli {
    /// Path to a threadline.toml (default: THREADLINE_CONFIG, ./threadline.toml, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the database lineage tree of every fact
    DbLineage {
        /// Lineage fact CSV
        facts: PathBuf,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge BI lineage with database lineage and flatten the result
    Stitch {
        /// BI lineage document (JSON)
        bi: PathBuf,

        /// Lineage fact CSV
        facts: PathBuf,

        /// Write the combined nested document here
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write the flattened rows here
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Flatten an existing combined document
    Flatten {
        /// Combined lineage document (JSON)
        combined: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "csv")]
        format: RowFormat,
    },

    /// Report circular dependencies among lineage facts
    Cycles {
        /// Lineage fact CSV
        facts: PathBuf,
    },

    /// Parse an upstream inference response into table and column lists
    ParseResponse {
        /// File holding the response text
        file: PathBuf,
    },

    /// List facts that need upstream inference
    RefreshPlan {
        /// Current lineage fact CSV
        current: PathBuf,

        /// Previously inferred lineage fact CSV
        previous: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum RowFormat {
    Csv,
    Json,
}

/// Resolved settings shared by every command.
struct Context {
    settings: Settings,
    delimiter: u8,
    output_dir: Option<PathBuf>,
}

impl Context {
    fn new(settings: Settings) -> Result<Self, SettingsError> {
        Ok(Self {
            delimiter: settings.export.delimiter()?,
            output_dir: settings.export.resolved_output_dir()?,
            settings,
        })
    }

    /// The explicit path, else `name` under the configured output directory.
    fn output_path(&self, explicit: Option<PathBuf>, name: &str) -> Option<PathBuf> {
        explicit.or_else(|| self.output_dir.as_ref().map(|dir| dir.join(name)))
    }

    fn builder<'f>(&self, facts: &'f threadline::facts::FactTable) -> TreeBuilder<'f> {
        TreeBuilder::new(facts).with_max_depth(self.settings.lineage.max_depth)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let context = match settings.and_then(Context::new) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init(&context.settings.log, cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = match cli.command {
        Commands::DbLineage { facts, output } => cmd_db_lineage(&context, &facts, output),
        Commands::Stitch {
            bi,
            facts,
            json,
            csv,
        } => cmd_stitch(&context, &bi, &facts, json, csv),
        Commands::Flatten {
            combined,
            output,
            format,
        } => cmd_flatten(&context, &combined, output, format),
        Commands::Cycles { facts } => cmd_cycles(&context, &facts),
        Commands::ParseResponse { file } => cmd_parse_response(&context, &file),
        Commands::RefreshPlan { current, previous } => cmd_refresh_plan(&current, &previous),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_db_lineage(
    context: &Context,
    facts: &Path,
    output: Option<PathBuf>,
) -> ExportResult<ExitCode> {
    let facts = export::load_fact_table(facts, context.settings.normalize_options())?;
    let trees = context.builder(&facts).build_all();
    info!(trees = trees.len(), "built database lineage");

    let pretty = context.settings.export.pretty_json;
    emit(context.output_path(output, DB_LINEAGE_FILE).as_deref(), |out| {
        export::write_json(out, &trees, pretty)
    })?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_stitch(
    context: &Context,
    bi: &Path,
    facts: &Path,
    json: Option<PathBuf>,
    csv: Option<PathBuf>,
) -> ExportResult<ExitCode> {
    let document = export::read_bi_document(bi)?;
    let facts = export::load_fact_table(facts, context.settings.normalize_options())?;

    let merger = Merger::new(context.builder(&facts));
    let output = stitch(&document, &merger);
    eprintln!(
        "Stitched {} field(s): {} database tree(s) grafted, {} column(s) without database lineage",
        output.document.field_count(),
        output.stats.grafted,
        output.stats.unmatched
    );

    let json_path = context.output_path(json, COMBINED_FILE);
    let csv_path = context.output_path(csv, FLATTENED_CSV_FILE);
    let pretty = context.settings.export.pretty_json;

    if json_path.is_some() || csv_path.is_none() {
        emit(json_path.as_deref(), |out| {
            export::write_json(out, &output.document, pretty)
        })?;
    }
    if let Some(path) = csv_path {
        let rows = output.document.flatten();
        emit(Some(path.as_path()), |out| {
            export::write_rows_csv(out, &rows, context.delimiter)
        })?;
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_flatten(
    context: &Context,
    combined: &Path,
    output: Option<PathBuf>,
    format: RowFormat,
) -> ExportResult<ExitCode> {
    let document = export::read_combined_document(combined)?;
    let rows = document.flatten();
    info!(rows = rows.len(), "flattened combined lineage");

    match format {
        RowFormat::Csv => {
            let path = context.output_path(output, FLATTENED_CSV_FILE);
            emit(path.as_deref(), |out| {
                export::write_rows_csv(out, &rows, context.delimiter)
            })?;
        }
        RowFormat::Json => {
            let path = context.output_path(output, FLATTENED_JSON_FILE);
            let pretty = context.settings.export.pretty_json;
            emit(path.as_deref(), |out| export::write_json(out, &rows, pretty))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_cycles(context: &Context, facts: &Path) -> ExportResult<ExitCode> {
    let facts = export::load_fact_table(facts, context.settings.normalize_options())?;
    let report = detect_cycles(&facts);
    print!("{}", report);

    if report.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_parse_response(context: &Context, file: &Path) -> ExportResult<ExitCode> {
    let text = fs::read_to_string(file).map_err(|source| ExportError::File {
        path: file.to_path_buf(),
        source,
    })?;

    let parsed = parse_inference_response(&text);
    if parsed.is_empty() {
        eprintln!("Warning: no upstream lists found in '{}'", file.display());
    }
    emit(None, |out| {
        export::write_json(out, &parsed, context.settings.export.pretty_json)
    })?;
    Ok(ExitCode::SUCCESS)
}

fn cmd_refresh_plan(current: &Path, previous: &Path) -> ExportResult<ExitCode> {
    let current = export::read_facts_file(current)?;
    let previous = export::read_facts_file(previous)?;
    let plan = plan_refresh(&current, &previous);

    for key in &plan.new {
        println!("new      {}", key);
    }
    for key in &plan.changed {
        println!("changed  {}", key);
    }
    for key in &plan.removed {
        println!("removed  {}", key);
    }
    println!();
    println!(
        "{} to infer, {} unchanged, {} removed",
        plan.pending().count(),
        plan.unchanged,
        plan.removed.len()
    );
    Ok(ExitCode::SUCCESS)
}

/// Run `write` against the file at `path`, or stdout when there is none.
fn emit(
    path: Option<&Path>,
    write: impl FnOnce(&mut dyn Write) -> ExportResult<()>,
) -> ExportResult<()> {
    match path {
        Some(path) => {
            let mut file = export::create_file(path)?;
            write(&mut file)?;
            info!(path = %path.display(), "wrote output");
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}
