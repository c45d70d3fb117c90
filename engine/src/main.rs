//! Bello journal CLI
//!
//! ## Usage
//!
//! ```bash
//! # Save a recording as today's clip (replaces an earlier one from today)
//! bello record ~/Movies/take.mov
//!
//! # This month's clips, or another month's
//! bello list
//! bello list 2024-03 --json
//!
//! # Home-screen check: has today been recorded? (arms/cancels the reminder)
//! bello today
//!
//! # Last month's recap, if one is on offer
//! bello recap
//! bello play
//!
//! # Deliver reminders whose time has come
//! bello reminders fire
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use bello_lib::clock::{Clock, FixedClock, SystemClock};
use bello_lib::config::Config;
use bello_lib::journal::{Journal, MonthKey, RecapBanner};
use bello_lib::logging;
use bello_lib::persistence::{load_json, save_json};
use bello_lib::reminder::{notify, FileScheduler};
use bello_lib::story::StoryStep;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "bello")]
#[command(about = "Daily video journal: one clip a day, monthly recaps")]
struct Cli {
    /// Journal data directory (defaults to BELLO_DATA_DIR or ~/.bello)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend the local time is this (`YYYY-MM-DD HH:MM:SS`)
    #[arg(long, global = true, value_parser = parse_timestamp)]
    now: Option<NaiveDateTime>,

    /// Machine-readable output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a recording as the clip for its day
    Record {
        /// Recorded video file (moved into the journal)
        source: PathBuf,

        /// Capture time, defaults to now
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<NaiveDateTime>,
    },

    /// List a month's clips in capture order
    List {
        /// Month as YYYY-MM, defaults to the current month
        #[arg(value_parser = parse_month)]
        month: Option<MonthKey>,
    },

    /// Delete a clip
    Delete { uri: String },

    /// Check today's clip and bring the reminder in line with it
    Today,

    /// Show last month's recap if one is offered
    Recap {
        /// Dismiss the recap without playing it
        #[arg(long)]
        dismiss: bool,
    },

    /// Play the offered recap as a story (dismisses it)
    Play,

    /// Daily reminder
    Reminders {
        #[command(subcommand)]
        action: ReminderAction,
    },
}

#[derive(Subcommand, Debug)]
enum ReminderAction {
    /// Deliver every reminder whose time has passed
    Fire,
    /// Show pending reminders
    Status,
}

fn parse_timestamp(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw.trim(), fmt).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DD HH:MM:SS, got {raw:?}"))
}

fn parse_month(raw: &str) -> std::result::Result<MonthKey, String> {
    MonthKey::parse(raw).ok_or_else(|| format!("expected YYYY-MM, got {raw:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    config.ensure_dirs().with_context(|| {
        format!(
            "Failed to create data directory {}",
            config.data_dir.display()
        )
    })?;
    debug!(data_dir = %config.data_dir.display(), "Using journal");

    let clock: Arc<dyn Clock> = match cli.now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(SystemClock),
    };
    let platform = Arc::new(FileScheduler::new(config.reminders_file(), clock.clone()));
    let mut journal = Journal::open(&config, platform.clone(), clock.clone()).await;

    match cli.command {
        Command::Record { source, at } => {
            let source = source.to_string_lossy();
            let captured_at = at.unwrap_or_else(|| clock.now());
            let clip = journal
                .record(&source, captured_at)
                .await
                .with_context(|| format!("Failed to record {source}"))?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&clip)?);
            } else {
                println!("Saved {} ({})", clip.uri, clip.captured_at);
            }
        }

        Command::List { month } => {
            let month = month.unwrap_or_else(|| MonthKey::of(&clock.today()));
            let grid = journal.month_grid(month).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&grid)?);
            } else if grid.is_empty() {
                println!("No clips for {}", month.long_name());
            } else {
                println!("{}", month.long_name());
                for entry in grid {
                    let thumb = entry.thumbnail.as_deref().unwrap_or("-");
                    println!("{:>3}  {}  {}", entry.label, entry.clip.uri, thumb);
                }
            }
        }

        Command::Delete { uri } => {
            journal
                .delete(&uri)
                .await
                .with_context(|| format!("Failed to delete {uri}"))?;
            println!("Deleted {uri}");
        }

        Command::Today => {
            let recorded = journal.refresh_today().await?;
            let reminder = journal.reminders();
            if cli.json {
                let status = serde_json::json!({
                    "date": clock.today().to_string(),
                    "recorded": recorded,
                    "reminder": reminder.state(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else if recorded {
                println!("Today's clip is recorded");
            } else {
                println!(
                    "Nothing recorded today (reminder: {:?} at {})",
                    reminder.state(),
                    reminder.fire_time().format("%H:%M")
                );
            }
        }

        Command::Recap { dismiss } => {
            let banner_path = config.recap_banner_file();
            let banner: RecapBanner = load_json(&banner_path).await?;
            let mut banner = journal.evaluate_recap(banner).await;

            match banner.visible() {
                Some(offer) if cli.json => println!("{}", serde_json::to_string_pretty(offer)?),
                Some(offer) => {
                    println!("{} ({} clip(s))", offer.title, offer.artifact.len());
                    for uri in offer.artifact.uris() {
                        println!("  {uri}");
                    }
                }
                None if cli.json => println!("null"),
                None => println!("No recap available"),
            }

            if dismiss {
                let (dismissed, _) = journal.open_recap(banner);
                banner = dismissed;
            }
            save_json(&banner_path, &banner).await?;
        }

        Command::Play => {
            let banner_path = config.recap_banner_file();
            let banner: RecapBanner = load_json(&banner_path).await?;
            let banner = journal.evaluate_recap(banner).await;
            let (banner, story) = journal.open_recap(banner);
            save_json(&banner_path, &banner).await?;

            let Some(mut story) = story else {
                println!("No recap available");
                return Ok(());
            };

            println!("{}", story.title());
            loop {
                let (position, total) = story.progress();
                if let Some(uri) = story.current() {
                    println!("[{position}/{total}] {uri}");
                }
                story.mark_ready();
                if story.on_playback_complete() == StoryStep::Finished {
                    break;
                }
            }
        }

        Command::Reminders { action } => match action {
            ReminderAction::Fire => {
                let due = platform.take_due(clock.now()).await?;
                if due.is_empty() {
                    println!("No reminders due");
                }
                for (id, reminder) in due {
                    debug!(id = %id, fire_at = %reminder.fire_at, "Delivering reminder");
                    notify::deliver(&reminder.payload).context("Failed to deliver reminder")?;
                }
            }
            ReminderAction::Status => {
                let pending = platform.pending().await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&pending)?);
                } else if pending.is_empty() {
                    println!("No reminders scheduled");
                } else {
                    for (id, reminder) in pending {
                        println!("{id}  {}  {}", reminder.fire_at, reminder.payload.title);
                    }
                }
            }
        },
    }

    Ok(())
}
