use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tabled::{Table, Tabled};

use shift_scout::cache::{CacheStack, CacheTier, MemoryTier, SqliteTier};
use shift_scout::config::{OPTIMIZER, PERSISTENCE};
use shift_scout::data::{GraphStore, JsonDirectorySource};
use shift_scout::domain::StartZone;
use shift_scout::engine::{
    CachedSolver, MobilityOptimizer, RateModel, RecommendationService, SolveRequest,
};
use shift_scout::signals::{
    NeutralSurge, NeutralWeather, SurgeProvider, SurgeTable, WeatherModel, WeatherProvider,
};
use shift_scout::utils::TimeUtils;

#[derive(Parser, Debug)]
#[command(author, version, about = "Shift Scout - Right zone. Right hour.", long_about = None)]
struct Cli {
    /// Directory holding the upstream tables, signal files, snapshots and
    /// the shared cache db
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Run without any result cache (recompute every solve)
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Rebuild graphs from the source tables instead of the local snapshot
    #[arg(long, default_value_t = false)]
    rebuild: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve one shift: expected earnings and the optimal zone path
    Solve {
        #[arg(long)]
        city: u32,
        /// Start zone id; omit to search for the best starting position
        #[arg(long)]
        zone: Option<String>,
        #[arg(long)]
        hour: u8,
        /// Shift length in hours
        #[arg(long)]
        hours: u8,
        /// Date in YYYY-MM-DD format
        #[arg(long)]
        date: String,
        /// Print the step-by-step timing breakdown
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Score every start hour in a preferred window
    BestHours {
        #[arg(long)]
        city: u32,
        #[arg(long)]
        zone: Option<String>,
        #[arg(long)]
        earliest: u8,
        #[arg(long)]
        latest: u8,
        #[arg(long)]
        hours: u8,
        #[arg(long)]
        date: String,
        /// Abort remaining solves after this many seconds, keep partials
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Rank every zone for a given start hour
    BestZones {
        #[arg(long)]
        city: u32,
        #[arg(long)]
        hour: u8,
        #[arg(long)]
        hours: u8,
        #[arg(long)]
        date: String,
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Show the hourly earning rate for one zone
    Rate {
        #[arg(long)]
        city: u32,
        #[arg(long)]
        zone: String,
        #[arg(long)]
        hour: u8,
        #[arg(long)]
        date: String,
    },
    /// The same shift solved across the next 7 days
    Week {
        #[arg(long)]
        city: u32,
        #[arg(long)]
        zone: Option<String>,
        #[arg(long)]
        hour: u8,
        #[arg(long)]
        hours: u8,
        #[arg(long)]
        date: String,
    },
    /// Drop a city's graph, snapshot and cached results
    Invalidate {
        #[arg(long)]
        city: u32,
    },
}

#[derive(Tabled)]
struct HourRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Window Left")]
    remaining: String,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Earnings")]
    earnings: String,
    #[tabled(rename = "Rate/h")]
    rate: String,
    #[tabled(rename = "Path Len")]
    path_len: usize,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Earnings")]
    earnings: String,
    #[tabled(rename = "Rate/h")]
    rate: String,
    #[tabled(rename = "Start Zone")]
    start_zone: String,
    #[tabled(rename = "Zones Visited")]
    diversity: usize,
}

fn load_surge(data_dir: &Path) -> Arc<dyn SurgeProvider> {
    let path = data_dir.join("surge_by_hour.json");
    if !path.exists() {
        log::info!("No surge table at {:?}; using neutral multipliers", path);
        return Arc::new(NeutralSurge);
    }
    match SurgeTable::from_json_file(&path) {
        Ok(table) => Arc::new(table),
        Err(e) => {
            log::warn!("Surge table load failed: {:#}. Using neutral multipliers.", e);
            Arc::new(NeutralSurge)
        }
    }
}

fn load_weather(data_dir: &Path) -> Arc<dyn WeatherProvider> {
    let path = data_dir.join("weather_daily.json");
    if !path.exists() {
        log::info!("No weather history at {:?}; using neutral multipliers", path);
        return Arc::new(NeutralWeather);
    }
    match WeatherModel::from_json_file(&path) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            log::warn!("Weather history load failed: {:#}. Using neutral multipliers.", e);
            Arc::new(NeutralWeather)
        }
    }
}

async fn build_service(cli: &Cli) -> RecommendationService {
    let source = JsonDirectorySource::new(&cli.data_dir);
    let mut store = GraphStore::new(
        Box::new(source),
        cli.data_dir.join(PERSISTENCE.graph.directory),
    );
    if cli.rebuild {
        store = store.without_snapshots();
    }

    let rates = RateModel::new(
        OPTIMIZER.rate,
        load_surge(&cli.data_dir),
        load_weather(&cli.data_dir),
    );
    let optimizer = MobilityOptimizer::new(Arc::new(store), rates, OPTIMIZER.dp);

    let cache = if cli.no_cache {
        CacheStack::disabled()
    } else {
        let mut tiers: Vec<Box<dyn CacheTier>> = vec![Box::new(MemoryTier::new())];
        let db_path = cli.data_dir.join(PERSISTENCE.result_cache.db_filename);
        match SqliteTier::new(&db_path.to_string_lossy()).await {
            Ok(tier) => tiers.push(Box::new(tier)),
            // A dead shared tier costs latency, never correctness.
            Err(e) => log::warn!("Shared cache unavailable: {:#}. Memory tier only.", e),
        }
        CacheStack::new(tiers)
    };

    RecommendationService::new(CachedSolver::new(optimizer, cache))
}

fn euros(v: f64) -> String {
    format!("{:.2}", v)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let service = build_service(&cli).await;

    match &cli.command {
        Command::Solve {
            city,
            zone,
            hour,
            hours,
            date,
            verbose,
        } => {
            let date = TimeUtils::parse_date(date)?;
            let req = SolveRequest {
                city_id: *city,
                start: StartZone::from_option(zone.clone()),
                start_hour: *hour,
                duration_hours: *hours,
                date,
            };
            let outcome = service
                .solver()
                .solve(&req)
                .await
                .context("Solve failed")?;

            println!(
                "City {} | start {} | {:02}:00 for {}h on {}",
                city, outcome.start_zone, hour, hours, date
            );
            println!("Expected earnings: {}", euros(outcome.expected_earnings));
            if *hours > 0 {
                println!(
                    "Expected hourly rate: {}/h",
                    euros(outcome.expected_earnings / *hours as f64)
                );
            }
            println!("Optimal path: {}", outcome.path.join(" -> "));

            if *verbose {
                let steps = service
                    .solver()
                    .optimizer()
                    .path_timing(*city, &outcome.path, *hour, date)
                    .context("Path breakdown failed")?;
                for s in steps {
                    println!(
                        "  {}. {} -> {} @ {:02}:00 | fare {} (surge {:.2}x, weather {:.2}x) | wait {:.1}m travel {:.1}m | total {} ({:.1}m in)",
                        s.step,
                        s.from_zone,
                        s.to_zone,
                        s.hour,
                        euros(s.final_fare),
                        s.surge_multiplier,
                        s.weather_multiplier,
                        s.wait_minutes,
                        s.travel_minutes,
                        euros(s.cumulative_earnings),
                        s.cumulative_minutes,
                    );
                }
            }
        }

        Command::BestHours {
            city,
            zone,
            earliest,
            latest,
            hours,
            date,
            timeout_secs,
        } => {
            let date = TimeUtils::parse_date(date)?;
            let scores = service
                .all_time_scores(
                    *city,
                    StartZone::from_option(zone.clone()),
                    *earliest,
                    *latest,
                    *hours,
                    date,
                    timeout_secs.map(Duration::from_secs),
                )
                .await
                .context("Hour scoring failed")?;

            if scores.is_empty() {
                println!("No recommendation available for city {}", city);
                return Ok(());
            }

            let rows: Vec<HourRow> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| HourRow {
                    rank: i + 1,
                    hour: format!("{:02}:00", s.time),
                    score: euros(s.score),
                    remaining: format!("{}h", s.remaining_hours),
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Command::BestZones {
            city,
            hour,
            hours,
            date,
            timeout_secs,
        } => {
            let date = TimeUtils::parse_date(date)?;
            let scores = service
                .all_zone_scores(
                    *city,
                    *hour,
                    *hours,
                    date,
                    timeout_secs.map(Duration::from_secs),
                )
                .await
                .context("Zone scoring failed")?;

            if scores.is_empty() {
                println!("No recommendation available for city {}", city);
                return Ok(());
            }

            let rows: Vec<ZoneRow> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| ZoneRow {
                    rank: i + 1,
                    zone: s.zone_id.clone(),
                    earnings: euros(s.expected_earnings),
                    rate: euros(s.expected_hourly_rate),
                    path_len: s.path_length,
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Command::Rate { city, zone, hour, date } => {
            let date = TimeUtils::parse_date(date)?;
            let optimizer = service.solver().optimizer();
            let graph = optimizer.graphs().load(*city).context("Graph load failed")?;
            let idx = graph
                .index_of(zone)
                .with_context(|| format!("Zone {} not found in city {}", zone, city))?;

            let b = optimizer.rates().breakdown(&graph, idx, *hour, date);
            println!("{} @ {:02}:00 on {} ({})", zone, hour, date, TimeUtils::weekday_name(date));
            println!("Earning rate:   {}/h", euros(b.rate_per_hour));
            println!("Expected fare:  {}", euros(b.expected_fare));
            println!("Travel time:    {:.1} min", b.expected_travel_minutes);
            println!("Wait time:      {:.1} min", b.expected_wait_minutes);
            println!("Surge:          {:.2}x", b.surge_multiplier);
            println!("Weather:        {:.2}x", b.weather_multiplier);
        }

        Command::Week {
            city,
            zone,
            hour,
            hours,
            date,
        } => {
            let date = TimeUtils::parse_date(date)?;
            let days = service
                .weekly_outlook(*city, StartZone::from_option(zone.clone()), *hour, *hours, date)
                .await
                .context("Weekly outlook failed")?;

            let rows: Vec<DayRow> = days
                .iter()
                .map(|d| DayRow {
                    date: d.date.to_string(),
                    day: d.day_of_week.clone(),
                    earnings: euros(d.expected_earnings),
                    rate: euros(d.hourly_rate),
                    start_zone: d.start_zone.clone(),
                    diversity: d.path_diversity,
                })
                .collect();
            println!("{}", Table::new(rows));
        }

        Command::Invalidate { city } => {
            let removed = service.solver().invalidate_city(*city).await;
            println!("City {} invalidated ({} cached results dropped)", city, removed);
        }
    }

    Ok(())
}
