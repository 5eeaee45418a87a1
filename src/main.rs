use anyhow::Context;
use clap::{Parser, Subcommand};
use outlier_insight_engine::{Dataset, EngineConfig, OutlierEngine, Statistics};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "outlier-insight-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Detect and treat outliers in CSV datasets", long_about = None)]
struct Cli {
    /// Path to CSV file
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// JSON engine configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify columns into categorical, numerical and cardinal
    Classify,

    /// Check every numerical column for outliers
    Check {
        /// Identifier-like columns to skip
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Show a column's outlier rows
    Fetch {
        #[arg(short = 'C', long)]
        column: String,

        /// Also print the labels of all outlier rows
        #[arg(short, long)]
        index: bool,
    },

    /// Remove a column's outlier rows and print the remaining shape
    Remove {
        #[arg(short = 'C', long)]
        column: String,
    },

    /// Cap a column's outliers at its bounds and print its statistics
    Cap {
        #[arg(short = 'C', long)]
        column: String,
    },

    /// Score rows with Local Outlier Factor over the numeric columns
    Lof {
        /// Number of neighbors (overrides the config)
        #[arg(short, long)]
        neighbors: Option<usize>,

        /// Rank of the threshold in the ascending scores
        #[arg(short, long, default_value_t = 3)]
        rank: usize,
    },
}

fn init_logging(quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Commands::Lof {
        neighbors: Some(k), ..
    } = &cli.command
    {
        config.neighbor_count = *k;
    }
    let engine = OutlierEngine::with_config(config)?;

    let file = cli.file.context("--file is required")?;
    let content = fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    let dataset = Dataset::from_csv(name, &content)?;

    match cli.command {
        Commands::Classify => {
            let classification = engine.classify(&dataset);
            println!("{}", serde_json::to_string_pretty(&engine.summary(&dataset))?);
            println!("cat_cols: {:?}", classification.categorical);
            println!("num_cols: {:?}", classification.numerical);
            println!("cat_but_car: {:?}", classification.cardinal);
        }

        Commands::Check { exclude } => {
            let exclude: Vec<&str> = exclude.iter().map(String::as_str).collect();
            let report = engine.check(&dataset, &exclude)?;
            for check in &report.columns {
                println!("{} {}", check.column, check.has_outliers);
            }
        }

        Commands::Fetch { column, index } => {
            let fetch = engine.fetch(&dataset, &column, index)?;
            println!(
                "{} outliers in '{}' (lower {:.4}, upper {:.4})",
                fetch.total, column, fetch.bounds.lower, fetch.bounds.upper
            );
            print!("{}", fetch.rows);
            if let Some(labels) = fetch.labels {
                println!("index: {:?}", labels);
            }
        }

        Commands::Remove { column } => {
            let cleaned = engine.remove_all(&dataset, &[column])?;
            println!(
                "({}, {}) -> ({}, {})",
                dataset.len(),
                dataset.column_count(),
                cleaned.len(),
                cleaned.column_count()
            );
        }

        Commands::Cap { column } => {
            let mut dataset = dataset;
            let bounds = engine.cap_all(&mut dataset, &[column.clone()])?;
            for (name, b) in &bounds {
                println!("{}: capped to [{:.4}, {:.4}]", name, b.lower, b.upper);
            }
            print_stats(&Statistics::compute(&dataset, &column)?);
        }

        Commands::Lof { rank, .. } => {
            let numeric = dataset.numeric_only().drop_missing();
            let outliers = engine.density_outliers(&numeric, rank)?;

            let mut sorted = outliers.scores.clone();
            sorted.sort_by(f64::total_cmp);
            println!("most extreme scores: {:?}", &sorted[..sorted.len().min(5)]);
            println!("threshold: {:.4}", outliers.threshold);
            print!("{}", numeric.select_rows(&outliers.positions));
        }
    }

    Ok(())
}

fn print_stats(stats: &Statistics) {
    println!("\n=== Statistics for '{}' ===", stats.field);
    println!("Count:  {}", stats.count);
    println!("Mean:   {:.2}", stats.mean);
    println!("Min:    {:.2}", stats.min);
    println!("Q1:     {:.2}", stats.q1);
    println!("Median: {:.2}", stats.median);
    println!("Q3:     {:.2}", stats.q3);
    println!("Max:    {:.2}", stats.max);
}
