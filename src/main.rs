//! nasa-data: command-line front end for the NASA data layer.
//!
//! Reads go through the typed query caches; `refresh-*` commands go through
//! the mutation coordinator; favorites live in a local JSON file.

mod config;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use common::dates::{self, trailing_range};
use common::{AppConfig, Error};
use data_layer::{FavoritesStore, MutationCoordinator, NasaQueries};
use nasa_client::NasaRestClient;
use query_cache::{QueryResult, QueryStatus, RetryPolicy};

/// Days of archive shown by `apod-range` when no range is given.
const DEFAULT_ARCHIVE_DAYS: i64 = 7;

/// NASA daily image and near-Earth-object browser
#[derive(Parser)]
#[command(name = "nasa-data", about = "Browse NASA daily images and near-Earth objects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Daily image for a date (today when omitted).
    Apod {
        #[arg(long)]
        date: Option<String>,
    },
    /// Daily images for a date range (the last week when omitted).
    ApodRange {
        #[arg(long, requires = "end")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Near-Earth-object feed with hazard summary (current week when omitted).
    Feed {
        #[arg(long, requires = "end")]
        start: Option<String>,
        #[arg(long, requires = "start")]
        end: Option<String>,
    },
    /// Full record for one near-Earth object.
    Neo { id: String },
    /// Refetch a feed window, bypassing the cache.
    RefreshFeed {
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: String,
    },
    /// Refetch a daily image, bypassing the cache.
    RefreshApod {
        #[arg(long)]
        date: Option<String>,
    },
    /// Manage saved daily images.
    Favorites {
        #[command(subcommand)]
        action: FavoritesCommand,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    List,
    Add { date: String },
    Remove { date: String },
}

/// Collapse a read into its value, or the error that stands in for it.
fn settle<V>(result: QueryResult<V>) -> Result<V, Error> {
    if result.status == QueryStatus::Disabled {
        return Err(Error::Validation("missing required query parameter".into()));
    }
    match (result.data, result.error) {
        (_, Some(e)) => Err(e),
        (Some(value), None) => Ok(value),
        (None, None) => Err(Error::Other("query returned no data".into())),
    }
}

/// Normalize a daily-image date and reject dates with no image, before any request.
fn checked_apod_date(raw: &str, today: chrono::NaiveDate) -> Result<String, Error> {
    let date = dates::normalize_date(raw)?;
    if !dates::is_valid_apod_date(&date, today) {
        return Err(Error::Validation(format!(
            "no daily image for {} (archive runs {} to {})",
            date,
            dates::FIRST_APOD_DATE,
            dates::format_api_date(today)
        )));
    }
    Ok(date)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_feed_summary(queries: &NasaQueries<NasaRestClient>) {
    let state = queries.store().snapshot();
    println!("Range:      {}", state.date_range_label());
    println!("Objects:    {}", state.total_count());
    println!("Hazardous:  {}", state.hazardous_count());
    for asteroid in state.all_asteroids() {
        println!(
            "  {}  {:<12} {}{}",
            asteroid.approach_date.as_deref().unwrap_or("?"),
            asteroid.id,
            asteroid.name,
            if asteroid.is_potentially_hazardous_asteroid {
                "  [hazardous]"
            } else {
                ""
            }
        );
    }
}

async fn run(cli: Cli, cfg: AppConfig) -> Result<(), Error> {
    let api = Arc::new(NasaRestClient::new(&cfg.api)?);
    info!("Using {}", api.base_url());

    let queries = NasaQueries::new(api, RetryPolicy::from(&cfg.retry));
    let mutations = MutationCoordinator::new(queries.clone());
    let favorites = FavoritesStore::from_config(&cfg.favorites);

    match cli.command {
        Command::Apod { date } => {
            let image = match date.as_deref() {
                Some(d) => {
                    let date = checked_apod_date(d, dates::today())?;
                    settle(queries.image_by_date(Some(&date)).await)?
                }
                None => settle(queries.today_image().await)?,
            };
            print_json(&image)?;
            if favorites.has(&image.date) {
                println!("(in favorites)");
            }
        }
        Command::ApodRange { start, end } => {
            let range = match (start, end) {
                (Some(start_date), Some(end_date)) => common::DateRange {
                    start_date,
                    end_date,
                },
                _ => trailing_range(dates::today(), DEFAULT_ARCHIVE_DAYS),
            };
            let images = settle(
                queries
                    .image_range(Some(&range.start_date), Some(&range.end_date))
                    .await,
            )?;
            for image in &images {
                println!("{}  {}", image.date, image.title);
            }
        }
        Command::Feed { start, end } => {
            match (start, end) {
                (Some(s), Some(e)) => settle(queries.neo_feed(Some(&s), Some(&e)).await)?,
                _ => settle(queries.current_week_neo_feed(dates::today()).await)?,
            };
            print_feed_summary(&queries);
        }
        Command::Neo { id } => {
            let asteroid = settle(queries.neo_details(Some(&id)).await)?;
            print_json(&asteroid)?;
        }
        Command::RefreshFeed { start, end } => {
            mutations.refresh_feed(&start, &end).await?;
            print_feed_summary(&queries);
        }
        Command::RefreshApod { date } => {
            let date = date
                .map(|d| checked_apod_date(&d, dates::today()))
                .transpose()?;
            let image = mutations.refresh_daily_image(date.as_deref()).await?;
            print_json(&image)?;
        }
        Command::Favorites { action } => match action {
            FavoritesCommand::List => {
                for record in favorites.get() {
                    println!("{}  {}  (added {})", record.date, record.title, record.added_at);
                }
            }
            FavoritesCommand::Add { date } => {
                let date = checked_apod_date(&date, dates::today())?;
                let image = settle(queries.image_by_date(Some(&date)).await)?;
                let records = favorites.add(&image);
                if !records.iter().any(|r| r.date == image.date) {
                    return Err(Error::Io(format!(
                        "could not save favorites to {}",
                        favorites.path().display()
                    )));
                }
                println!("Saved {}; {} favorites", image.date, records.len());
            }
            FavoritesCommand::Remove { date } => {
                let date = dates::normalize_date(&date)?;
                let records = favorites.remove(&date);
                println!("Removed {}; {} favorites", date, records.len());
            }
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nasa_data=info,nasa_client=info,query_cache=info,data_layer=info".into()
            }),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, cfg).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
