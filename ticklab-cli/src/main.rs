//! TickLab CLI — load market data into both backends and compare them.
//!
//! Commands:
//! - `generate` — write a deterministic synthetic CSV dataset
//! - `load` — ingest the CSV tables into both stores
//! - `query` — run one analytical query against a chosen backend
//! - `compare` — run the full benchmark harness and save a report
//! - `info` — report per-store sizes and partition layout

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use ticklab_bench::config::BenchConfig;
use ticklab_bench::{ingest, render_markdown, run_comparison, save_report, synthetic};
use ticklab_core::{BarColumn, ColumnarStore, RelationalStore};

#[derive(Parser)]
#[command(
    name = "ticklab",
    about = "TickLab CLI — relational vs columnar storage for minute bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a deterministic synthetic CSV dataset.
    Generate {
        /// Output directory for tickers.csv and market_data_multi.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Symbols to generate (e.g., AAPL TSLA MSFT).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Minutes of data per symbol.
        #[arg(long, default_value_t = 390)]
        minutes: usize,

        /// First bar timestamp (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS").
        #[arg(long, default_value = "2025-11-17 09:30:00")]
        start: String,
    },
    /// Ingest the CSV tables and load both stores.
    Load {
        /// Directory containing tickers.csv and market_data_multi.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// SQLite database file.
        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,

        /// Parquet partition root.
        #[arg(long, default_value = "market_data")]
        parquet_dir: PathBuf,
    },
    /// Run one analytical query against a chosen backend.
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
    /// Run the full comparison harness and save a report.
    Compare {
        /// Directory containing the CSV tables. Omit with --synthetic.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Use a generated synthetic dataset instead of CSV input.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Symbols for --synthetic.
        #[arg(long, value_delimiter = ',', default_value = "AAPL,TSLA,MSFT,AMZN")]
        symbols: Vec<String>,

        /// Minutes per symbol for --synthetic.
        #[arg(long, default_value_t = 390)]
        minutes: usize,

        /// Optional TOML config for store paths and query parameters.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for report.md / report.json.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Report per-store sizes and partition layout.
    Info {
        /// SQLite database file.
        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,

        /// Parquet partition root.
        #[arg(long, default_value = "market_data")]
        parquet_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum QueryCommand {
    /// Bars for one symbol in an inclusive timestamp range.
    Range {
        #[arg(long, value_enum)]
        backend: Backend,

        #[arg(long)]
        symbol: String,

        /// Range start (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS").
        #[arg(long)]
        start: String,

        /// Range end (a bare date means end-of-day).
        #[arg(long)]
        end: String,

        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,

        #[arg(long, default_value = "market_data")]
        parquet_dir: PathBuf,
    },
    /// Average daily volume per ticker (relational).
    Volume {
        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,
    },
    /// Top N tickers by full-period return (relational).
    Returns {
        #[arg(long, default_value_t = 3)]
        top_n: usize,

        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,
    },
    /// First/last price per ticker per day (relational).
    DailyEdges {
        #[arg(long, default_value = "market_data.db")]
        sqlite_path: PathBuf,
    },
    /// Rolling average of one column for one symbol (columnar).
    RollingAvg {
        #[arg(long)]
        symbol: String,

        #[arg(long, default_value_t = 5)]
        window: usize,

        /// Column: open, high, low, close, or volume.
        #[arg(long, default_value = "close")]
        column: String,

        #[arg(long, default_value = "market_data")]
        parquet_dir: PathBuf,
    },
    /// Rolling volatility of returns for every ticker (columnar).
    Volatility {
        #[arg(long, default_value_t = 5)]
        window: usize,

        #[arg(long, default_value = "market_data")]
        parquet_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Relational,
    Columnar,
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            data_dir,
            symbols,
            minutes,
            start,
        } => run_generate(&data_dir, &symbols, minutes, &start),
        Commands::Load {
            data_dir,
            sqlite_path,
            parquet_dir,
        } => run_load(&data_dir, &sqlite_path, &parquet_dir),
        Commands::Query { query } => run_query(query),
        Commands::Compare {
            data_dir,
            synthetic,
            symbols,
            minutes,
            config,
            output_dir,
        } => run_compare(data_dir, synthetic, &symbols, minutes, config, output_dir),
        Commands::Info {
            sqlite_path,
            parquet_dir,
        } => run_info(&sqlite_path, &parquet_dir),
    }
}

fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_generate(
    data_dir: &std::path::Path,
    symbols: &[String],
    minutes: usize,
    start: &str,
) -> Result<()> {
    let start = parse_datetime(start, false)?;
    let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();

    let dataset = synthetic::generate_dataset(&sym_refs, start, minutes);
    ingest::write_csv(&dataset, data_dir)?;

    println!(
        "Generated {} bars across {} symbols in {}",
        dataset.bars.len(),
        dataset.tickers.len(),
        data_dir.display()
    );
    Ok(())
}

fn run_load(
    data_dir: &std::path::Path,
    sqlite_path: &std::path::Path,
    parquet_dir: &std::path::Path,
) -> Result<()> {
    let dataset = ingest::load_and_validate(data_dir)?;

    if sqlite_path.exists() {
        std::fs::remove_file(sqlite_path)
            .with_context(|| format!("failed to remove {}", sqlite_path.display()))?;
    }
    let mut relational = RelationalStore::open(sqlite_path)?;
    relational.create_schema()?;
    relational.insert_tickers(&dataset.tickers)?;
    let index = relational.ticker_index()?;
    relational.insert_price_bars(&dataset.bars, &index)?;

    let columnar = ColumnarStore::new(parquet_dir);
    columnar.write_partitioned(&dataset.bars, &dataset.tickers)?;

    println!(
        "Loaded {} bars / {} tickers into {} and {}",
        dataset.bars.len(),
        dataset.tickers.len(),
        sqlite_path.display(),
        parquet_dir.display()
    );
    Ok(())
}

fn run_query(query: QueryCommand) -> Result<()> {
    match query {
        QueryCommand::Range {
            backend,
            symbol,
            start,
            end,
            sqlite_path,
            parquet_dir,
        } => {
            let start = parse_datetime(&start, false)?;
            let end = parse_datetime(&end, true)?;
            let bars = match backend {
                Backend::Relational => {
                    open_relational(&sqlite_path)?.query_by_date_range(&symbol, start, end)?
                }
                Backend::Columnar => {
                    ColumnarStore::new(&parquet_dir).query_by_date_range(&symbol, start, end)?
                }
            };
            println!("{:<20} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "timestamp", "open", "high", "low", "close", "volume");
            for b in &bars {
                println!(
                    "{:<20} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                    b.timestamp, b.open, b.high, b.low, b.close, b.volume
                );
            }
            println!("Total rows: {}", bars.len());
        }
        QueryCommand::Volume { sqlite_path } => {
            let rows = open_relational(&sqlite_path)?.query_average_daily_volume()?;
            println!("{:<8} {:>20}", "Symbol", "Avg Daily Volume");
            for r in &rows {
                println!("{:<8} {:>20.1}", r.symbol, r.avg_daily_volume);
            }
        }
        QueryCommand::Returns { top_n, sqlite_path } => {
            let rows = open_relational(&sqlite_path)?.query_top_tickers_by_return(top_n)?;
            println!(
                "{:<8} {:>12} {:>12} {:>10}",
                "Symbol", "First", "Last", "Return %"
            );
            for r in &rows {
                println!(
                    "{:<8} {:>12.2} {:>12.2} {:>+10.2}",
                    r.symbol, r.first_price, r.last_price, r.return_pct
                );
            }
        }
        QueryCommand::DailyEdges { sqlite_path } => {
            let rows = open_relational(&sqlite_path)?.query_daily_first_last_prices()?;
            println!(
                "{:<12} {:<8} {:>10} {:<20} {:>10} {:<20}",
                "Date", "Symbol", "First", "First Time", "Last", "Last Time"
            );
            for r in &rows {
                println!(
                    "{:<12} {:<8} {:>10.2} {:<20} {:>10.2} {:<20}",
                    r.trade_date.to_string(),
                    r.symbol,
                    r.first_price,
                    r.first_time.to_string(),
                    r.last_price,
                    r.last_time.to_string()
                );
            }
            println!("Total rows: {}", rows.len());
        }
        QueryCommand::RollingAvg {
            symbol,
            window,
            column,
            parquet_dir,
        } => {
            let column: BarColumn = column
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let points = ColumnarStore::new(&parquet_dir)
                .compute_rolling_average(&symbol, window, column)?;
            println!(
                "{:<20} {:>12} {:>16}",
                "timestamp",
                column.as_str(),
                format!("rolling_{window}")
            );
            for p in &points {
                let rolled = if p.rolling_avg.is_nan() {
                    "-".to_string()
                } else {
                    format!("{:.4}", p.rolling_avg)
                };
                println!("{:<20} {:>12.4} {:>16}", p.timestamp, p.value, rolled);
            }
            println!("Total rows: {}", points.len());
        }
        QueryCommand::Volatility {
            window,
            parquet_dir,
        } => {
            let points = ColumnarStore::new(&parquet_dir).compute_rolling_volatility(window)?;
            println!(
                "{:<20} {:<8} {:>10} {:>10} {:>12}",
                "timestamp", "symbol", "close", "return", "volatility"
            );
            for p in &points {
                let ret = if p.ret.is_nan() {
                    "-".to_string()
                } else {
                    format!("{:+.5}", p.ret)
                };
                let vol = if p.rolling_volatility.is_nan() {
                    "-".to_string()
                } else {
                    format!("{:.5}", p.rolling_volatility)
                };
                println!(
                    "{:<20} {:<8} {:>10.2} {:>10} {:>12}",
                    p.timestamp, p.symbol, p.close, ret, vol
                );
            }
            println!("Total rows: {}", points.len());
        }
    }
    Ok(())
}

fn run_compare(
    data_dir: Option<PathBuf>,
    use_synthetic: bool,
    symbols: &[String],
    minutes: usize,
    config_path: Option<PathBuf>,
    output_dir: PathBuf,
) -> Result<()> {
    if data_dir.is_some() && use_synthetic {
        bail!("--data-dir and --synthetic are mutually exclusive");
    }

    let dataset = if use_synthetic {
        let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        let start = parse_datetime("2025-11-17 09:30:00", false)?;
        synthetic::generate_dataset(&sym_refs, start, minutes)
    } else {
        let dir = data_dir.unwrap_or_else(|| PathBuf::from("data"));
        ingest::load_and_validate(&dir)?
    };

    let mut config = match config_path {
        Some(path) => BenchConfig::from_file(&path)?,
        None => BenchConfig::default(),
    };
    config.output_dir = output_dir;

    let report = run_comparison(&dataset, &config)?;
    print!("{}", render_markdown(&report));

    let saved = save_report(&report, &config.output_dir)?;
    println!("\nReport saved to: {}", saved.display());
    Ok(())
}

fn run_info(sqlite_path: &std::path::Path, parquet_dir: &std::path::Path) -> Result<()> {
    if sqlite_path.exists() {
        let store = RelationalStore::open(sqlite_path)?;
        let tickers = store.tickers()?;
        println!(
            "Relational: {} ({} tickers, {} bytes)",
            sqlite_path.display(),
            tickers.len(),
            store.database_size()
        );
    } else {
        println!("Relational: {} (not loaded)", sqlite_path.display());
    }

    let columnar = ColumnarStore::new(parquet_dir);
    let infos = columnar.partition_info()?;
    if infos.is_empty() {
        println!("Columnar:   {} (no partitions)", parquet_dir.display());
        return Ok(());
    }

    println!(
        "Columnar:   {} ({} partitions, {} bytes total)",
        parquet_dir.display(),
        infos.len(),
        columnar.storage_size()
    );
    println!("{:<8} {:>8} {:>8} {:>12}", "Ticker", "Files", "Rows", "Bytes");
    println!("{}", "-".repeat(40));
    for info in &infos {
        println!(
            "{:<8} {:>8} {:>8} {:>12}",
            info.symbol, info.file_count, info.row_count, info.size_bytes
        );
    }
    Ok(())
}

fn open_relational(path: &std::path::Path) -> Result<RelationalStore> {
    if !path.exists() {
        bail!("database not found: {} — run `ticklab load` first", path.display());
    }
    Ok(RelationalStore::open(path)?)
}

/// Parse a datetime, accepting a bare date; `end_of_day` controls which
/// edge of a bare date is used.
fn parse_datetime(raw: &str, end_of_day: bool) -> Result<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("unparseable datetime '{raw}'"))?;
    let time = if end_of_day {
        chrono::NaiveTime::from_hms_opt(23, 59, 59).unwrap()
    } else {
        chrono::NaiveTime::from_hms_opt(0, 0, 0).unwrap()
    };
    Ok(date.and_time(time))
}
