// label-sorter CLI - thin front end over the sort pipeline
use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use label_sorter::config::{ExtractionSettings, RunSettings, Settings, TableSettings};
use label_sorter::keyword_table::{KeywordTable, BUILTIN_TABLES};
use label_sorter::pdf_extraction::TextStrategy;
use label_sorter::pipeline::block_on;
use label_sorter::progress::LogProgress;
use label_sorter::{MatchMode, SortJob, SortReport};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sort shipping-label PDFs so pages of the same courier or model come out together"
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (default: ./label-sorter.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a reordered copy of INPUT to OUTPUT
    Sort {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show how each page would be classified, without writing anything
    Classify {
        input: PathBuf,
        #[command(flatten)]
        run: RunArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List built-in keyword tables, or print one as TOML
    Tables {
        #[arg(long, value_name = "NAME")]
        show: Option<String>,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Built-in table name or path to a table TOML file
    #[arg(short, long)]
    table: Option<String>,

    #[arg(long, value_enum)]
    match_mode: Option<MatchMode>,

    #[arg(short, long, value_enum)]
    strategy: Option<TextStrategy>,

    /// Render upscaling factor for OCR
    #[arg(long)]
    scale: Option<f32>,

    /// OCR language
    #[arg(long)]
    lang: Option<String>,

    /// Pages extracted in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Seconds before a page's extraction is abandoned
    #[arg(long)]
    page_timeout: Option<u64>,
}

impl RunArgs {
    fn into_settings(self) -> Settings {
        Settings {
            table: TableSettings {
                source: self.table,
                match_mode: self.match_mode,
            },
            extraction: ExtractionSettings {
                strategy: self.strategy,
                scale: self.scale,
                language: self.lang,
                jobs: self.jobs,
                page_timeout_secs: self.page_timeout,
            },
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn load_settings(path: Option<&PathBuf>, run: RunArgs) -> Result<RunSettings> {
    let file = match path {
        Some(path) => Settings::load(path)?,
        None => Settings::discover()?,
    };
    Ok(file.merge(run.into_settings()).resolve())
}

fn print_summary(report: &SortReport) {
    println!();
    for count in &report.per_category {
        println!("  {:>4}  {} (priority {})", count.pages, count.category, count.priority);
    }
    println!();
    if let Some(output) = &report.output {
        println!("✓ Sorting Complete!");
        println!("✓ Saved at: {}", output.display());
    }
    println!("⚠ Unknown Pages: {}", report.unmatched_pages);
    if report.degraded_pages > 0 {
        println!("⚠ Pages with failed text extraction: {}", report.degraded_pages);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    block_on(run(cli)).context("starting the async runtime")?
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Sort { input, output, run } => {
            let settings = load_settings(cli.config.as_ref(), run)?;
            let job = SortJob::from_settings(&settings)?;
            log::info!("Sorting {} with table '{}'", input.display(), job.table().name());
            let report = job
                .run(&input, &output, &LogProgress)
                .await
                .with_context(|| format!("sorting {}", input.display()))?;
            print_summary(&report);
        }
        Command::Classify { input, run, json } => {
            let settings = load_settings(cli.config.as_ref(), run)?;
            let job = SortJob::from_settings(&settings)?;
            let report = job
                .plan(&input, &LogProgress)
                .await
                .with_context(|| format!("classifying {}", input.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for (position, page) in report.order.iter().enumerate() {
                    println!(
                        "{:>4}  <- page {:>4}  {}",
                        position + 1,
                        page.original_index + 1,
                        page.category
                    );
                }
                print_summary(&report);
            }
        }
        Command::Tables { show: Some(name) } => {
            let table = KeywordTable::load(&name)?;
            print!("{}", table.to_toml()?);
        }
        Command::Tables { show: None } => {
            for (name, _) in BUILTIN_TABLES {
                let table = KeywordTable::builtin(name)?;
                println!(
                    "{:<10} {:>3} categories, fallback '{}' ({})",
                    name,
                    table.categories().len(),
                    table.fallback(),
                    table.fallback_priority()
                );
            }
        }
    }

    Ok(())
}
