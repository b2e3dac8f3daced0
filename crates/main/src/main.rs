use std::error::Error;
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;

use report_composer::output::DirectorySink;
use report_composer::paginate::PaginationPolicy;
use report_composer::{ReportComposer, ReportOptions, ReportRequest};

mod request;
mod sample;

/// Generates PDF reports with the report_composer engine.
///
/// Fonts must be present under `assets/fonts` relative to the `report_composer` crate
/// or provided via the `REPORT_COMPOSER_FONTS_DIR` environment variable before
/// running the commands below.
#[derive(Parser)]
#[command(author, version, about = "Report composition from JSON requests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Never merge a short trailing table page into its predecessor.
    #[arg(long, global = true)]
    strict_pagination: bool,

    /// Date used in the output file name (defaults to today).
    #[arg(long, global = true)]
    date: Option<NaiveDate>,

    /// Skip the branding logos.
    #[arg(long, global = true)]
    no_branding: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a report described by a JSON request file.
    #[command(name = "render")]
    Render {
        /// Path of the request file.
        #[arg(long)]
        request: PathBuf,

        /// Directory the PDF is written to.
        #[arg(long, default_value = "target/reports")]
        out_dir: PathBuf,
    },

    /// Render the built-in sample report.
    #[command(name = "sample")]
    Sample {
        /// Directory the PDF is written to.
        #[arg(long, default_value = "target/reports")]
        out_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        print_error_sources(err.as_ref());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut options = ReportOptions::new();
    if cli.strict_pagination {
        options = options.with_pagination(PaginationPolicy::strict());
    }
    if let Some(date) = cli.date {
        options = options.with_generation_date(date);
    }
    if cli.no_branding {
        options = options.without_branding();
    }

    let (request, out_dir): (ReportRequest, PathBuf) = match cli.command {
        Commands::Render {
            request: path,
            out_dir,
        } => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."));
            let file = request::RequestFile::load(&path)?;
            (file.into_request(&base), out_dir)
        }
        Commands::Sample { out_dir } => (sample::request(), out_dir),
    };

    let mut composer = ReportComposer::with_bundled_fonts()?.with_options(options);
    let mut sink = DirectorySink::new(out_dir);
    let report = composer.generate(&request, &mut sink)?;

    info!(
        "Wrote {} ({} pages)",
        sink.directory().join(&report.filename).display(),
        report.page_count
    );
    for section in &report.sections {
        info!(
            "  {}: {:?} (chart: {}, table pages: {})",
            section.title, section.status, section.chart_captured, section.table_pages
        );
    }
    Ok(())
}

fn print_error_sources(mut error: &(dyn Error + 'static)) {
    while let Some(source) = error.source() {
        eprintln!("  caused by: {}", source);
        error = source;
    }
}
