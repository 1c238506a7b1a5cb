use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rfm_cohorts::models::Segment;
use rfm_cohorts::scoring::QuantilePolicy;
use rfm_cohorts::{dataset, prep, report, AnalysisConfig};

#[derive(Parser)]
#[command(name = "rfm-cohorts")]
#[command(about = "RFM customer segmentation and cohort export", long_about = None)]
struct Cli {
    /// JSON file with reference date, quantile policy and cohort definitions
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Date recency is measured against (YYYY-MM-DD)
    #[arg(long, global = true)]
    reference_date: Option<NaiveDate>,
    /// Fail instead of collapsing bins when a metric has tied quantile edges
    #[arg(long, global = true)]
    strict_quantiles: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise order channels and top customers
    Describe {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        json: bool,
    },
    /// Score and segment customers
    Segment {
        #[arg(long)]
        csv: PathBuf,
        /// Write the segmented table to this CSV file
        #[arg(long)]
        out: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only list and write customers in these segments (repeatable)
        #[arg(long = "segment")]
        segments: Vec<Segment>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Write one customer id file per configured cohort
    Export {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<AnalysisConfig> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => AnalysisConfig::default(),
    };

    if let Some(date) = cli.reference_date {
        config.reference_date = date;
    }
    if cli.strict_quantiles {
        config.quantile_policy = QuantilePolicy::Strict;
    }

    Ok(config)
}

fn load_orders(csv: &Path) -> anyhow::Result<Vec<rfm_cohorts::models::OrderRecord>> {
    dataset::load_orders(csv).with_context(|| format!("failed to read {}", csv.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Describe { csv, top, json } => {
            let records = load_orders(csv)?;
            let orders = prep::prepare_orders(&records);
            let description = report::describe(&orders, *top);
            if *json {
                println!("{}", serde_json::to_string_pretty(&description)?);
            } else {
                print!("{}", report::render_description(&description));
            }
        }
        Commands::Segment {
            csv,
            out,
            limit,
            segments,
        } => {
            let records = load_orders(csv)?;
            let run = rfm_cohorts::run(&records, &config)?;

            println!("Customers by segment:");
            for summary in report::summarize_by_segment(&run.customers) {
                println!(
                    "- {}: {} customers (recency {:.1}, frequency {:.2}, monetary {:.2})",
                    summary.segment,
                    summary.count,
                    summary.avg_recency,
                    summary.avg_frequency,
                    summary.avg_monetary
                );
            }

            let selected = run.in_segments(segments);
            println!();
            println!("First {} customers:", (*limit).min(selected.len()));
            for customer in selected.iter().take(*limit) {
                let metrics = customer.metrics();
                println!(
                    "- {} recency {} frequency {} monetary {:.2} rfm {} {}",
                    metrics.customer_id,
                    metrics.recency,
                    metrics.frequency,
                    metrics.monetary,
                    customer.rfm_code,
                    customer.segment
                );
            }

            if !run.excluded.is_empty() {
                println!("{} customers excluded from scoring.", run.excluded.len());
            }

            if let Some(out) = out {
                let file = File::create(out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                dataset::write_segmented(file, selected.iter().copied())?;
                println!("Segmented table written to {}.", out.display());
            }
        }
        Commands::Report { csv, out } => {
            let records = load_orders(csv)?;
            let run = rfm_cohorts::run(&records, &config)?;
            let cohorts = run.cohorts(&config.cohorts);
            let report = report::build_report(config.reference_date, &run, &cohorts);
            std::fs::write(out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { csv, out_dir } => {
            let records = load_orders(csv)?;
            let run = rfm_cohorts::run(&records, &config)?;
            let cohorts = run.cohorts(&config.cohorts);
            let paths = dataset::export_cohorts(out_dir, &cohorts)
                .with_context(|| format!("failed to export cohorts to {}", out_dir.display()))?;
            for (cohort, path) in cohorts.iter().zip(paths) {
                println!(
                    "Wrote {} ids for {} to {}.",
                    cohort.customer_ids.len(),
                    cohort.name,
                    path.display()
                );
            }
        }
    }

    Ok(())
}
