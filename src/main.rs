// tirada-pdf: Print membership fee receipt sheets

use std::path::PathBuf;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use log::LevelFilter;
use serde::Deserialize;
use uuid::Uuid;

use tirada_pdf::record::NORMALIZED_FIELDS;
use tirada_pdf::source::{ApiSource, JsonFileSource, RecordSource};
use tirada_pdf::{
    map_records, unknown_fields, Calibration, CellTemplate, PageGrid, PdfSettings, PdfSurface,
    PrintError, RenderOptions, RenderSession, RulerOptions, TemplateStore,
};

// ============================================================================
// Data Structures
// ============================================================================

/// CLI Arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Print membership fee receipt sheets")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log every skipped record and page decision
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print receipts for a set of fees
    Print(PrintArgs),

    /// Print a calibration ruler page
    Ruler(RulerArgs),

    /// Dump the built-in templates as JSON
    Templates,

    /// Check templates for fields no record provides
    Lint {
        /// Template JSON files (defaults to the built-in templates)
        files: Vec<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct PrintArgs {
    /// JSON file with an array of fee records
    #[arg(short, long, conflicts_with = "server")]
    input: Option<PathBuf>,

    /// Membership server base URL, e.g. http://localhost:3000
    #[arg(short, long)]
    server: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, env = "TIRADA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Fee ids to print (comma separated)
    #[arg(long, value_delimiter = ',')]
    ids: Vec<i64>,

    /// First fee id of a range (with --end, server only)
    #[arg(long, requires_all = ["end", "server"], conflicts_with = "ids")]
    start: Option<i64>,

    /// Last fee id of a range
    #[arg(long, requires = "start")]
    end: Option<i64>,

    /// Server-side page of 8 fees, numbered from 1
    #[arg(long, requires = "server", conflicts_with_all = ["ids", "start"])]
    page: Option<i64>,

    /// Output filename (defaults to tirada-{date}-{run id}.pdf)
    #[arg(short, long)]
    output: Option<String>,

    /// Device resolution used for layout
    #[arg(long, default_value = "300")]
    dpi: i32,

    /// Draw cut lines between receipts
    #[arg(long)]
    lines: bool,

    /// Directory with TrueType fonts named after the template fonts
    #[arg(long)]
    font_dir: Option<PathBuf>,

    /// Directory template images are loaded from
    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(flatten)]
    calibration: CalibrationArgs,
}

#[derive(Args, Debug)]
struct CalibrationArgs {
    /// Horizontal shift in mm
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset_x: f64,

    /// Vertical shift in mm
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset_y: f64,

    /// Horizontal stretch factor
    #[arg(long, default_value = "1")]
    scale_x: f64,

    /// Vertical stretch factor
    #[arg(long, default_value = "1")]
    scale_y: f64,
}

#[derive(Args, Debug)]
struct RulerArgs {
    /// Output filename
    #[arg(short, long, default_value = "ruler.pdf")]
    output: String,

    /// Device resolution used for layout
    #[arg(long, default_value = "300")]
    dpi: i32,

    /// Leave out the 10 mm matrix
    #[arg(long)]
    no_matrix: bool,

    /// Leave out the millimeter rulers
    #[arg(long)]
    no_scale: bool,
}

/// A template file holds one template, or a list as dumped by `templates`.
#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateFile {
    One(CellTemplate),
    Many(Vec<CellTemplate>),
}

impl TemplateFile {
    fn into_templates(self) -> Vec<CellTemplate> {
        match self {
            TemplateFile::One(template) => vec![template],
            TemplateFile::Many(templates) => templates,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_module("tirada_pdf", LevelFilter::Debug);
    }
    builder.init();
}

fn run(command: Command) -> Result<(), PrintError> {
    match command {
        Command::Print(args) => print_fees(args),
        Command::Ruler(args) => print_ruler(args),
        Command::Templates => dump_templates(),
        Command::Lint { files } => lint_templates(&files),
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn generate_short_id() -> String {
    let uuid = Uuid::new_v4();
    let hex = format!("{:x}", uuid);
    hex[..8].to_uppercase()
}

fn load_rows(args: &PrintArgs) -> Result<Vec<serde_json::Value>, PrintError> {
    match (&args.input, &args.server) {
        (Some(path), _) => JsonFileSource::load(path)?.fetch(&args.ids),
        (None, Some(url)) => {
            let mut api = ApiSource::new(url, args.api_key.clone())?;
            match (args.page, args.start, args.end) {
                (Some(page), _, _) => api.fetch_page(page),
                (None, Some(start), Some(end)) => api.fetch_range(start, end),
                _ => api.fetch(&args.ids),
            }
        }
        (None, None) => Err(PrintError::InvalidConfiguration(
            "either --input or --server is required".into(),
        )),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn print_fees(args: PrintArgs) -> Result<(), PrintError> {
    let rows = load_rows(&args)?;
    let mapped = map_records(rows);

    let run_id = generate_short_id();
    let output_file = args.output.unwrap_or_else(|| {
        format!(
            "tirada-{}-{}.pdf",
            Local::now().date_naive().format("%Y-%m-%d"),
            run_id.to_lowercase()
        )
    });

    let settings = PdfSettings {
        title: format!("Tirada {}", run_id),
        dpi: args.dpi,
        font_dir: args.font_dir,
        asset_dir: args.assets,
        ..Default::default()
    };
    let calibration = Calibration {
        offset_x_mm: args.calibration.offset_x,
        offset_y_mm: args.calibration.offset_y,
        scale_x: args.calibration.scale_x,
        scale_y: args.calibration.scale_y,
    };

    let store = TemplateStore::builtin();
    let pairing = store.receipt_pairing()?;
    let surface = PdfSurface::open(&output_file, settings)?;
    let session = RenderSession::open(surface, PageGrid::default(), calibration)?;
    let summary = session.render_batch(&mapped.records, &pairing, RenderOptions { guide_lines: args.lines })?;

    println!("✓ Generated: {}", output_file);
    println!("  Pages: {}", summary.pages);
    println!("  Receipts: {}", summary.drawn);
    if summary.skipped > 0 {
        println!("  Not billable: {}", summary.skipped);
    }
    if mapped.rejected > 0 {
        println!("  Invalid records: {}", mapped.rejected);
    }
    println!("  Run ID: {}", run_id);

    Ok(())
}

fn print_ruler(args: RulerArgs) -> Result<(), PrintError> {
    let settings = PdfSettings {
        title: "Calibration".to_string(),
        dpi: args.dpi,
        ..Default::default()
    };
    let surface = PdfSurface::open(&args.output, settings)?;
    let session = RenderSession::open(surface, PageGrid::default(), Calibration::default())?;
    session.render_ruler(&RulerOptions {
        matrix: !args.no_matrix,
        scale: !args.no_scale,
    })?;

    println!("✓ Generated: {}", args.output);
    Ok(())
}

fn dump_templates() -> Result<(), PrintError> {
    let store = TemplateStore::builtin();
    let json = serde_json::to_string_pretty(&store.list()).map_err(std::io::Error::from)?;
    println!("{}", json);
    Ok(())
}

fn lint_templates(files: &[PathBuf]) -> Result<(), PrintError> {
    let templates: Vec<CellTemplate> = if files.is_empty() {
        TemplateStore::builtin().list().into_iter().cloned().collect()
    } else {
        let mut templates = Vec::new();
        for path in files {
            let content = std::fs::read_to_string(path)?;
            let file: TemplateFile = serde_json::from_str(&content).map_err(|e| {
                PrintError::InvalidConfiguration(format!("{}: {}", path.display(), e))
            })?;
            templates.extend(file.into_templates());
        }
        templates
    };

    let mut problems = 0;
    for template in &templates {
        let unknown = unknown_fields(template, NORMALIZED_FIELDS);
        if unknown.is_empty() {
            println!("✓ {}", template.name);
        } else {
            println!("✗ {}: unknown field(s) {}", template.name, unknown.join(", "));
            problems += 1;
        }
    }

    if problems > 0 {
        return Err(PrintError::InvalidConfiguration(format!(
            "{} template(s) reference fields no record provides",
            problems
        )));
    }
    Ok(())
}
