//! QuoteLab CLI — bulk quote downloads, single fetches, legacy migration.
//!
//! Commands:
//! - `bulk` — download every symbol of a symbol document from one provider
//! - `fetch-av` — one Alpha Vantage intraday series
//! - `fetch-yf` — one Yahoo Finance series by period, dates, or last week
//! - `fetch-gme` — one GME electricity market document (XML)
//! - `adapt` — migrate previously downloaded files to the current layout
//! - `docs` — list the available symbol documents
//! - `log last` — last successfully downloaded symbol per service

use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use quotelab_core::data::{
    AlphaVantageProvider, ArtifactStore, Downloaded, GmeDownloader, GmeMarket, IntervalDownloader,
    RangeDownloader, YahooProvider, ZoneTable, DEFAULT_PERIOD_INTERVAL,
};
use quotelab_core::domain::{AvInterval, DateRange, OutputSize, Provider, YahooInterval, YahooPeriod};
use quotelab_runner::{
    last_downloaded, AlphaVantageJob, AppConfig, BulkConfig, BulkOrchestrator, CancelToken,
    FileResultLogger, LegacyAdapter, StdoutProgress, SymbolDownloader, YahooJob,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "quotelab",
    about = "QuoteLab — bulk stock quote downloads from Alpha Vantage and Yahoo Finance"
)]
struct Cli {
    /// Config file (TOML, or JSON when the extension is .json).
    #[arg(long, global = true, default_value = "quotelab.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every symbol of a symbol document.
    Bulk {
        /// Provider: av (Alpha Vantage) or yf (Yahoo Finance).
        #[arg(long)]
        provider: Provider,

        /// Symbol document name (file stem under the docs directory).
        #[arg(long)]
        list: String,
    },
    /// Fetch one Alpha Vantage intraday series.
    FetchAv {
        symbol: String,

        /// 1min, 5min, 15min, 30min or 60min. Defaults to the configured interval.
        #[arg(long)]
        interval: Option<AvInterval>,

        /// compact or full. Defaults to the configured output size.
        #[arg(long)]
        outputsize: Option<OutputSize>,
    },
    /// Fetch one Yahoo Finance series.
    FetchYf {
        symbol: String,

        /// Lookback period (1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max).
        #[arg(long, conflicts_with_all = ["start", "end", "last_week"])]
        period: Option<YahooPeriod>,

        /// Window start (YYYY-MM-DD).
        #[arg(long, requires = "end", conflicts_with = "last_week")]
        start: Option<NaiveDate>,

        /// Window end, exclusive (YYYY-MM-DD).
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// The last seven days at the finest interval.
        #[arg(long, default_value_t = false)]
        last_week: bool,

        /// Sampling interval. Dates without an interval use the finest one available.
        #[arg(long, conflicts_with = "last_week")]
        interval: Option<YahooInterval>,
    },
    /// Fetch one GME (mercatoelettrico.org) market document.
    FetchGme {
        /// MGP or MI1 to MI7.
        market: GmeMarket,

        /// Data type, e.g. Prezzi or Quantita.
        #[arg(long = "type")]
        data_type: String,

        /// Market day (YYYY-MM-DD).
        #[arg(long)]
        date: NaiveDate,

        /// Write the XML here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Migrate previously downloaded files in data/<service>/<folder>.
    Adapt {
        /// Service folder: AlphaVantage or YahooFinance.
        #[arg(long)]
        service: String,

        /// Run folder inside the service folder.
        #[arg(long)]
        folder: String,

        /// Ticker -> timezone table (TOML or JSON).
        #[arg(long)]
        zones: Option<PathBuf>,

        /// Zone used for tickers missing from the table.
        #[arg(long)]
        default_zone: Option<String>,
    },
    /// List the available symbol documents.
    Docs,
    /// Inspect the result log.
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Show the last successfully downloaded symbol.
    Last {
        /// AV or YF.
        #[arg(long)]
        service: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?.with_env_overrides();

    match cli.command {
        Commands::Bulk { provider, list } => run_bulk(&config, provider, &list),
        Commands::FetchAv {
            symbol,
            interval,
            outputsize,
        } => run_fetch_av(&config, &symbol, interval, outputsize),
        Commands::FetchYf {
            symbol,
            period,
            start,
            end,
            last_week,
            interval,
        } => run_fetch_yf(&config, &symbol, period, start.zip(end), last_week, interval),
        Commands::FetchGme {
            market,
            data_type,
            date,
            output,
        } => run_fetch_gme(market, &data_type, date, output.as_deref()),
        Commands::Adapt {
            service,
            folder,
            zones,
            default_zone,
        } => run_adapt(&config, &service, &folder, zones.as_deref(), default_zone),
        Commands::Docs => run_docs(&config),
        Commands::Log { action } => match action {
            LogAction::Last { service } => run_log_last(&config, &service),
        },
    }
}

fn run_bulk(config: &AppConfig, provider: Provider, list: &str) -> Result<()> {
    let symbols = config.load_symbols(list)?;
    let started_at = Local::now().naive_local();
    let store = ArtifactStore::for_run(&config.paths.data_dir, provider, started_at);
    let bulk = BulkConfig::with_delay(config.throttle.delay_for(provider));

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted, stopping after the current symbol...");
        handler_token.cancel();
    })
    .context("failed to install Ctrl-C handler")?;

    println!(
        "Downloading {} symbols from {provider} into {}",
        symbols.len(),
        store.dir().display()
    );

    match provider {
        Provider::AlphaVantage => {
            let source = AlphaVantageProvider::new(config.require_api_key()?)?;
            let job = AlphaVantageJob::new(
                IntervalDownloader::new(source, config.alphavantage.outputsize),
                config.alphavantage.interval,
                store,
            );
            drive(job, config, bulk, cancel, symbols.symbols())
        }
        Provider::YahooFinance => {
            let job = YahooJob::new(
                RangeDownloader::new(YahooProvider::new()?),
                config.yahoo.lookback_days,
                store,
            );
            drive(job, config, bulk, cancel, symbols.symbols())
        }
    }
}

fn drive<D: SymbolDownloader>(
    job: D,
    config: &AppConfig,
    bulk: BulkConfig,
    cancel: CancelToken,
    symbols: &[String],
) -> Result<()> {
    let logger = FileResultLogger::new(&config.paths.log_file);
    let mut orchestrator = BulkOrchestrator::new(job, logger, bulk).with_cancel_token(cancel);
    let summary = orchestrator.run(symbols, &StdoutProgress);
    tracing::info!(
        provider = %summary.provider,
        downloaded = summary.downloaded,
        absent = summary.absent,
        failed = summary.failed,
        cancelled = summary.cancelled,
        "bulk run finished"
    );
    if summary.cancelled {
        std::process::exit(130);
    }
    Ok(())
}

fn run_fetch_av(
    config: &AppConfig,
    symbol: &str,
    interval: Option<AvInterval>,
    outputsize: Option<OutputSize>,
) -> Result<()> {
    let source = AlphaVantageProvider::new(config.require_api_key()?)?;
    let downloader = IntervalDownloader::new(
        source,
        outputsize.unwrap_or(config.alphavantage.outputsize),
    );
    let fetched =
        downloader.download_interval(symbol, interval.unwrap_or(config.alphavantage.interval))?;
    let now = Local::now().naive_local();
    let store = ArtifactStore::for_run(&config.paths.data_dir, Provider::AlphaVantage, now);
    report(symbol, store.save(symbol, fetched, now)?);
    Ok(())
}

fn run_fetch_yf(
    config: &AppConfig,
    symbol: &str,
    period: Option<YahooPeriod>,
    dates: Option<(NaiveDate, NaiveDate)>,
    last_week: bool,
    interval: Option<YahooInterval>,
) -> Result<()> {
    let downloader = RangeDownloader::new(YahooProvider::new()?);
    let now = Local::now().naive_local();
    let today = now.date();

    let fetched = match (period, dates, last_week) {
        (Some(period), None, false) => downloader.download_period(
            symbol,
            period,
            interval.unwrap_or(DEFAULT_PERIOD_INTERVAL),
        )?,
        (None, Some((start, end)), false) => {
            let range = DateRange::new(start, end)?;
            match interval {
                Some(interval) => downloader.download_dates(symbol, range, interval)?,
                None => downloader.download_minimum_interval(symbol, range, today)?,
            }
        }
        (None, None, true) => downloader.download_last_week(symbol, today)?,
        _ => bail!("choose exactly one of --period, --start/--end or --last-week"),
    };

    let store = ArtifactStore::for_run(&config.paths.data_dir, Provider::YahooFinance, now);
    report(symbol, store.save(symbol, fetched, now)?);
    Ok(())
}

fn run_fetch_gme(
    market: GmeMarket,
    data_type: &str,
    day: NaiveDate,
    output: Option<&Path>,
) -> Result<()> {
    let xml = GmeDownloader::new()?.get_data(market, data_type, day)?;
    match output {
        Some(path) => {
            std::fs::write(path, &xml)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Saved GME {market} {data_type} for {day} to {}", path.display());
        }
        None => println!("{xml}"),
    }
    Ok(())
}

fn report(symbol: &str, downloaded: Downloaded) {
    match downloaded {
        Downloaded::Saved(path) => println!("Saved {symbol} to {}", path.display()),
        Downloaded::Absent => println!("No data for {symbol}"),
    }
}

fn run_adapt(
    config: &AppConfig,
    service: &str,
    folder: &str,
    zones_path: Option<&Path>,
    default_zone: Option<String>,
) -> Result<()> {
    let data_dir = &config.paths.data_dir;
    let provider = Provider::from_dir_name(service).ok_or_else(|| {
        anyhow!(
            "unknown service '{service}'. Choose from: {}",
            subfolders(data_dir).join(", ")
        )
    })?;
    let service_dir = data_dir.join(service);
    let dir = service_dir.join(folder);
    if !dir.is_dir() {
        bail!(
            "no folder '{folder}' in {}. Choose from: {}",
            service_dir.display(),
            subfolders(&service_dir).join(", ")
        );
    }

    let mut zones = match zones_path {
        Some(path) => ZoneTable::from_file(path)?,
        None => ZoneTable::new(),
    };
    if let Some(zone) = default_zone {
        zones = zones.with_default(zone);
        zones.validate()?;
    }

    let adapter = LegacyAdapter::new(provider, &zones);
    let summary = adapter.adapt_dir(&dir)?;

    println!(
        "Migrated {} of {} files in {}",
        summary.migrated.len(),
        summary.total(),
        dir.display()
    );
    for (path, reason) in &summary.skipped {
        println!("  skipped {}: {reason}", path.display());
    }
    Ok(())
}

fn subfolders(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn run_docs(config: &AppConfig) -> Result<()> {
    let docs = config.available_documents()?;
    if docs.is_empty() {
        println!("No symbol documents in {}", config.paths.docs_dir.display());
        return Ok(());
    }
    println!("Symbol documents in {}:", config.paths.docs_dir.display());
    for name in docs {
        println!("  {name}");
    }
    Ok(())
}

fn run_log_last(config: &AppConfig, service: &str) -> Result<()> {
    let provider = Provider::from_service_code(&service.to_ascii_uppercase())
        .ok_or_else(|| anyhow!("unknown service '{service}', expected AV or YF"))?;
    let log_file = &config.paths.log_file;
    match last_downloaded(log_file, provider)
        .with_context(|| format!("failed to read {}", log_file.display()))?
    {
        Some(entry) => println!("{}", entry.to_line()),
        None => println!("No successful {} downloads in {}", provider.service_code(), log_file.display()),
    }
    Ok(())
}
