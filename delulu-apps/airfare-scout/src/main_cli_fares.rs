//!  Delulu Airfare Scout
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! CLI for tour.ne.jp airfare searches.
//!
//! Runs once over every (destination, date) pair, prints the cheapest fares
//! and optionally posts a summary to Telegram. Settings can come from the
//! environment (`ORIGIN`, `DESTINATIONS`, `DEPARTURE_DATES`, ...).

use std::cmp::max;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use delulu_airfare_scout::{
    FareQuery, FareRecord, FareSearchResult, FaresCache, MarkupSource, NOT_AVAILABLE, Route,
    TelegramConfig, TelegramSink, TourFaresClient, TripKind, expand_queries, html_report,
    leg_times, parse_date, parse_list, summary_message,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
    Json,
}

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "delulu-fares")]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Origin airport or city code (e.g., TYO, NRT)
    #[arg(short, long, env = "ORIGIN")]
    origin: String,

    /// Destination codes, comma separated (e.g., "CMB,BKK")
    #[arg(short, long, env = "DESTINATIONS")]
    destinations: String,

    /// Departure dates, comma separated (YYYYMMDD, YYYY-MM-DD or YYYY/MM/DD)
    #[arg(long, env = "DEPARTURE_DATES")]
    dates: String,

    /// Trip type flag of the site: 0 = one-way, 1 = round-trip
    #[arg(short = 'a', long, env = "AIR_TYPE", default_value = "0")]
    air_type: u8,

    /// Reuse the newest cached batch of a query instead of fetching it
    #[arg(long, env = "USE_CACHE")]
    use_cache: bool,

    /// Directory holding cached batches
    #[arg(long, env = "CACHE_DIR", default_value = "data")]
    cache_dir: PathBuf,

    /// Saved result page to parse for every query
    #[arg(long, conflicts_with = "html_dir")]
    html_file: Option<PathBuf>,

    /// Directory of saved result pages named <ORIGIN>-<DEST>-<YYYYMMDD>.html
    /// (<ORIGIN>-<DEST>-<YYYYMMDD>-1.html for round-trip)
    #[arg(long)]
    html_dir: Option<PathBuf>,

    /// Render result pages in a headless Chrome
    #[cfg(feature = "browser")]
    #[arg(long, conflicts_with_all = ["html_file", "html_dir"])]
    render: bool,

    /// DevTools websocket of a running Chrome to render with (implies --render)
    #[cfg(feature = "browser")]
    #[arg(long, env = "DEVTOOLS_URL", conflicts_with_all = ["html_file", "html_dir"])]
    devtools_url: Option<String>,

    /// Number of fares to show per query
    #[arg(short, long, default_value = "5")]
    top: usize,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Write the report to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_bot_token: Option<String>,

    /// Telegram chat id
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    /// Verbose output
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Save fetched pages next to the cache, for replay with --html-dir
    #[arg(long)]
    save_html: bool,
}

/// Configure logging: RUST_LOG wins, else verbosity picks the level.
/// Logs go to stderr so that stdout only carries the report.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn markup_source(args: &CliArgs) -> Option<MarkupSource> {
    if let Some(file) = &args.html_file {
        return Some(MarkupSource::File(file.clone()));
    }
    if let Some(dir) = &args.html_dir {
        return Some(MarkupSource::Directory(dir.clone()));
    }
    #[cfg(feature = "browser")]
    if args.render || args.devtools_url.is_some() {
        return Some(MarkupSource::Browser(delulu_airfare_scout::RenderConfig {
            devtools_url: args.devtools_url.clone(),
            ..Default::default()
        }));
    }
    None
}

struct Pipeline {
    client: Option<TourFaresClient>,
    cache: FaresCache,
    use_cache: bool,
    save_html: bool,
}

impl Pipeline {
    async fn run_query(&self, query: &FareQuery) -> Result<FareSearchResult> {
        if self.use_cache {
            if let Some(records) = self.cache.load_latest(query)? {
                return Ok(FareSearchResult::from_records(records, query.clone()));
            }
            tracing::info!("No cached batch for {}, fetching", query);
        }

        let Some(client) = &self.client else {
            bail!("No cached batch and no page source for {}", query);
        };
        let result = client.search_fares(query).await.context("Search failed")?;

        if self.save_html && !result.raw_response.is_empty() {
            std::fs::create_dir_all(self.cache.dir())
                .context("Failed to create cache dir")?;
            let path = MarkupSource::page_path(self.cache.dir(), query);
            std::fs::write(&path, &result.raw_response).context("Failed to write HTML file")?;
            tracing::info!("Saved HTML to {}", path.display());
        }
        self.cache.store(query, &result.records)?;
        Ok(result)
    }
}

/// Get terminal width for responsive tables
fn get_terminal_width() -> usize {
    term_size::dimensions().map(|(w, _)| w).unwrap_or(100)
}

fn dash_bar() -> String {
    "-".repeat(get_terminal_width().min(100))
}

fn width(s: &str) -> usize {
    s.chars().count()
}

/// `乗継3回/自己 (SIN, KUL)`, or just the count when airports are unknown.
fn fmt_transfers(record: &FareRecord) -> String {
    let count = &record.route.first_leg().transfers.count_str;
    let airports = record.route.transfer_airports();
    if airports.is_empty() {
        count.to_string()
    } else {
        format!("{} ({})", count, airports.join(", "))
    }
}

fn fmt_carrier(record: &FareRecord) -> String {
    if record.flight_code == NOT_AVAILABLE {
        record.airline.clone()
    } else {
        format!("{} {}", record.airline, record.flight_code)
    }
}

/// Calculate terminal-aware column widths
fn calc_column_widths(records: &[FareRecord]) -> (usize, usize, usize, usize) {
    let mut max_carrier = 7;
    let mut max_times = 15;
    let mut max_duration = 8;
    let mut max_transfers = 9;

    for record in records {
        let leg = record.route.first_leg();
        max_carrier = max(max_carrier, width(&fmt_carrier(record)));
        max_times = max(max_times, width(&leg_times(leg)));
        max_duration = max(max_duration, width(&leg.duration));
        max_transfers = max(max_transfers, width(&fmt_transfers(record)));
    }

    let terminal_width = get_terminal_width();
    let available_width = terminal_width.saturating_sub(40);
    let total_content = max_carrier + max_times + max_duration + max_transfers;

    if total_content > available_width && available_width > 50 {
        let ratio = available_width as f64 / total_content as f64;
        max_carrier = max((max_carrier as f64 * ratio).floor() as usize, 4);
        max_times = max((max_times as f64 * ratio).floor() as usize, 10);
        max_duration = max((max_duration as f64 * ratio).floor() as usize, 5);
        max_transfers = max((max_transfers as f64 * ratio).floor() as usize, 8);
    }

    (max_carrier, max_times, max_duration, max_transfers)
}

fn truncate(s: &str, w: usize) -> String {
    if width(s) <= w {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(w.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

/// Render results to stdout
fn render_results(result: &FareSearchResult, top: usize) {
    let query = &result.query;

    let title_bar = format!(
        "================================================================================================\n  🛫  {} → {} on {} ({:?})\n================================================================================================",
        query.origin, query.destination, query.depart_date, query.trip
    );
    println!("{}\n", title_bar);

    let best_price = result
        .records
        .first()
        .map(|r| r.price.as_str())
        .unwrap_or(NOT_AVAILABLE);
    println!("💰 Best Price:  {}", best_price);
    println!("📊 Total Fares: {}", result.len());
    println!("\n🔗 Search URL: {}", query.search_url());

    let shown = result.top(top);
    if shown.is_empty() {
        return;
    }
    let (cw, tw, dw, xw) = calc_column_widths(shown);

    println!("\n🏆 Top {} Results:", shown.len());
    println!("{}\n", dash_bar());
    println!(
        "  {:>3}  {:<cw$}  {:<tw$}  {:<dw$}  {:<xw$}   PRICE / PROVIDER",
        "#", "CARRIER", "DEP → ARR", "DURATION", "TRANSFERS",
    );
    println!("{}\n", dash_bar());

    for (i, record) in shown.iter().enumerate() {
        let leg = record.route.first_leg();
        println!(
            "  {:>3}  {:<cw$}  {:<tw$}  {:<dw$}  {:<xw$}   {} / {}",
            i + 1,
            truncate(&fmt_carrier(record), cw),
            truncate(&leg_times(leg), tw),
            truncate(&leg.duration, dw),
            truncate(&fmt_transfers(record), xw),
            record.price,
            record.provider_name,
        );
        if let Route::RoundTrip {
            inbound,
            stay_duration,
            ..
        } = &record.route
        {
            println!(
                "  {:>3}  {:<cw$}  {:<tw$}  {:<dw$}  stay {}",
                "↩",
                "",
                truncate(&leg_times(inbound), tw),
                truncate(&inbound.duration, dw),
                stay_duration,
            );
        }
    }
    println!();
}

fn json_report(results: &[FareSearchResult], top: usize) -> Result<String> {
    let batches: Vec<serde_json::Value> = results
        .iter()
        .map(|r| {
            serde_json::json!({
                "origin": r.query.origin,
                "destination": r.query.destination,
                "depart_date": r.query.depart_date,
                "trip": r.query.trip,
                "search_url": r.query.search_url(),
                "total": r.len(),
                "records": r.top(top),
            })
        })
        .collect();
    serde_json::to_string_pretty(&batches).context("Failed to serialize report")
}

fn emit(output: &Option<PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            tracing::info!("Wrote report to {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    setup_logging(args.verbose);

    tracing::info!("Starting delulu-fares CLI");
    tracing::debug!("Args: {:?}", args);

    let trip = TripKind::from_air_type(args.air_type).with_context(|| {
        format!("Invalid air type: {}. Use 0 (one-way) or 1 (round-trip)", args.air_type)
    })?;
    let dates = parse_list(&args.dates)
        .iter()
        .map(|d| parse_date(d))
        .collect::<Result<Vec<_>>>()?;
    let queries = expand_queries(&args.origin, &parse_list(&args.destinations), &dates, trip)?;

    let source = markup_source(&args);
    if source.is_none() && !args.use_cache {
        bail!("No page source: pass --html-file or --html-dir, or enable --use-cache");
    }
    let pipeline = Pipeline {
        client: source.map(TourFaresClient::new),
        cache: FaresCache::new(&args.cache_dir),
        use_cache: args.use_cache,
        save_html: args.save_html,
    };

    let telegram = TelegramSink::new(
        TelegramConfig::from_parts(args.telegram_bot_token.clone(), args.telegram_chat_id.clone()),
        10,
    )?;

    let mut results = Vec::with_capacity(queries.len());
    let mut failures = 0;
    for query in &queries {
        tracing::info!("Searching {}", query);
        match pipeline.run_query(query).await {
            Ok(result) => {
                if telegram.is_configured() {
                    if let Err(e) = telegram.send_text(&summary_message(&result, args.top)).await {
                        tracing::error!("{}: {:#}", query, e);
                    }
                }
                results.push(result);
            }
            Err(e) => {
                tracing::error!("{}: {:#}", query, e);
                failures += 1;
            }
        }
    }

    match args.format {
        OutputFormat::Text => {
            for result in &results {
                render_results(result, args.top);
            }
        }
        OutputFormat::Html => emit(&args.output, &html_report(&results, args.top))?,
        OutputFormat::Json => emit(&args.output, &json_report(&results, args.top)?)?,
    }

    tracing::info!(
        "Done: {} queries, {} failed",
        queries.len(),
        failures
    );
    if failures == queries.len() {
        bail!("All {} queries failed", failures);
    }
    Ok(())
}
