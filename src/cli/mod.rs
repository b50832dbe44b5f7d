pub mod activity;
pub mod output;
pub mod prompt;

use std::{path::PathBuf, sync::Arc};

use activity::{ActivityArgs, DateArgs};
use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::level_filters::LevelFilter;

use crate::{
    ledger::{file::FileLedger, LoggedEntry},
    tracker::Tracker,
    utils::{
        clock::{Clock, DefaultClock},
        dir::application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

/// Directory under the application directory holding ledger files.
const LEDGER_DIR: &str = "ledger";

#[derive(Parser, Debug)]
#[command(name = "timetrace", version, long_about = None)]
#[command(about = "Reconstructs your engineering activity and suggests time-log entries", long_about = None)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) commands: Commands,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        env = "TIMETRACE_DIR",
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
pub(crate) enum Commands {
    #[command(about = "Show logged entries, commits, pull requests and suggestions for a day")]
    Summary {
        #[command(flatten)]
        activity: ActivityArgs,
    },
    #[command(about = "Show suggested entries for a day and optionally log them")]
    Suggest {
        #[command(flatten)]
        activity: ActivityArgs,
        #[arg(long, help = "Ask for hours of every suggestion and log the answered ones")]
        accept: bool,
    },
    #[command(about = "Show logged hours per project for a week")]
    Week {
        #[command(flatten)]
        date: DateArgs,
    },
    #[command(about = "Log an entry manually")]
    Add {
        #[arg(long)]
        project: String,
        #[arg(long)]
        task: String,
        #[arg(long)]
        hours: f64,
        #[arg(long, default_value = "")]
        description: String,
        #[command(flatten)]
        date: DateArgs,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = application_path(args.dir)?;
    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &dir, logging_level, args.log)?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let tracker = Tracker::new(FileLedger::new(dir.join(LEDGER_DIR))?);

    match args.commands {
        Commands::Summary { activity } => {
            let engine = activity.build_engine(clock)?;
            let summary = tracker.daily_summary(&engine, shutdown_token()).await?;
            print!("{}", output::format_daily(&summary));
            Ok(())
        }
        Commands::Suggest { activity, accept } => {
            let engine = activity.build_engine(clock)?;
            let summary = tracker.daily_summary(&engine, shutdown_token()).await?;
            let mut out = String::new();
            output::format_suggestions(&mut out, &summary.suggestions);
            print!("{out}");
            if accept {
                let accepted = prompt::accept_suggestions(
                    &tracker,
                    summary.suggestions,
                    BufReader::new(tokio::io::stdin()),
                    &mut std::io::stdout(),
                )
                .await?;
                println!("Logged {} entries", accepted.len());
            }
            Ok(())
        }
        Commands::Week { date } => {
            let week = tracker.week_summary(date.resolve(clock.as_ref())?).await?;
            print!("{}", output::format_week(&week));
            Ok(())
        }
        Commands::Add {
            project,
            task,
            hours,
            description,
            date,
        } => {
            let entry = LoggedEntry {
                date: date.resolve(clock.as_ref())?,
                project,
                task,
                hours,
                description,
                commit_notes: String::new(),
                pr_notes: String::new(),
            };
            tracker.add_entry(entry).await?;
            println!("Entry logged");
            Ok(())
        }
    }
}

/// Token cancelled once the process receives Ctrl-C. Collection still in flight is abandoned and
/// reported as unavailable.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let cancelation = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancelation.cancel();
        }
    });
    token
}
