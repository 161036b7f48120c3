//! `scrub` command line: runs a scrub against a JSON record file.

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use scrub_core::config::non_zero;
use scrub_core::{FileStore, ScrubConfig, ScrubMigration};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const EXIT_ABORTED: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_REFUSED: u8 = 3;

fn cli() -> Command {
    let input = Arg::new("input")
        .long("input")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("JSON file holding [{\"id\": ..., \"field\": ...}] records");

    Command::new("scrub")
        .version(scrub_core::VERSION)
        .about("Strip non-allow-listed keys from a stored JSON field")
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("text")
                .value_parser(["text", "json"])
                .help("Log output format"),
        )
        .subcommand(
            Command::new("apply")
                .about("Rewrite records in place (irreversible)")
                .arg(input.clone())
                .arg(
                    Arg::new("batch-size")
                        .long("batch-size")
                        .value_parser(value_parser!(usize))
                        .help("Updates committed per batch"),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .value_parser(value_parser!(u64))
                        .help("Stop waiting after this many seconds; committed batches stay"),
                ),
        )
        .subcommand(
            Command::new("plan")
                .about("Show what apply would do without writing")
                .arg(input.clone())
                .arg(
                    Arg::new("show-updates")
                        .long("show-updates")
                        .action(ArgAction::SetTrue)
                        .help("Print every pending update"),
                ),
        )
        .subcommand(
            Command::new("revert")
                .about("Attempt to undo apply (always refused)")
                .arg(input),
        )
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<ScrubConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => ScrubConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ScrubConfig::new()),
    }
}

async fn run(matches: ArgMatches) -> anyhow::Result<ExitCode> {
    let Some((name, args)) = matches.subcommand() else {
        return Ok(ExitCode::from(EXIT_USAGE));
    };
    // Global args propagate down, so the subcommand sees them wherever they were given.
    let mut config = load_config(args)?;

    let input = args
        .get_one::<PathBuf>("input")
        .context("missing --input")?;
    let store = Arc::new(FileStore::open(input)?);

    match name {
        "apply" => {
            if let Some(size) = args.get_one::<usize>("batch-size") {
                config = config.with_batch_size(non_zero("batch_size", *size)?);
            }
            let migration = ScrubMigration::with_tracing(store.clone(), config);
            let timeout = args.get_one::<u64>("timeout-secs").copied();

            let result = match timeout {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), migration.apply())
                    .await
                    .ok(),
                None => Some(migration.apply().await),
            };

            // Persist whatever was committed, including aborted and timed-out runs.
            store.persist()?;

            match result {
                Some(Ok(summary)) => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    Ok(ExitCode::SUCCESS)
                }
                Some(Err(err)) => {
                    if let Some(summary) = err.summary() {
                        println!("{}", serde_json::to_string_pretty(summary)?);
                    }
                    eprintln!("error: {err}");
                    Ok(ExitCode::from(EXIT_ABORTED))
                }
                None => {
                    tracing::warn!(
                        timeout_secs = timeout.unwrap_or_default(),
                        "apply timed out; completed batches are kept, re-run to finish"
                    );
                    eprintln!("error: apply timed out");
                    Ok(ExitCode::from(EXIT_ABORTED))
                }
            }
        }
        "plan" => {
            let migration = ScrubMigration::with_tracing(store, config);
            let plan = migration.plan().await?;
            println!("{}", serde_json::to_string_pretty(&plan.summary)?);
            if args.get_flag("show-updates") {
                for update in &plan.updates {
                    println!("{}", serde_json::to_string(update)?);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        "revert" => {
            let migration = ScrubMigration::with_tracing(store, config);
            match migration.revert().await {
                Ok(()) => Ok(ExitCode::SUCCESS),
                Err(err) => {
                    eprintln!("error: {err}");
                    Ok(ExitCode::from(EXIT_REFUSED))
                }
            }
        }
        _ => Ok(ExitCode::from(EXIT_USAGE)),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let matches = cli().get_matches();
    let log_format = matches
        .subcommand()
        .map_or(&matches, |(_, args)| args)
        .get_one::<String>("log-format")
        .map_or("text", String::as_str);
    init_tracing(log_format);

    match run(matches).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}
