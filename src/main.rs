use mjscore::config::Config;
use mjscore::db::{init_db_pool, DBWrapper};
use mjscore::error::Error;
use mjscore::models::ResourceType;
use mjscore::service::{GroupForm, Service};

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::process;
use tracing_subscriber::EnvFilter;

/// Maintenance tool for the mahjong score store
#[derive(Parser, Debug)]
#[command(name = "mjscore", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Create a group and print its share links
    CreateGroup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Issuer identity stamped on the group (a random one by default)
        #[arg(long)]
        issuer: Option<String>,
    },
    /// List the links visible to a key
    Links {
        #[arg(long, env = "MJSCORE_KEY")]
        key: String,
    },
    /// Print a tournament's score map
    ScoreMap {
        #[arg(long, env = "MJSCORE_KEY")]
        key: String,
        /// Defaults to the tournament the key was issued for
        #[arg(long)]
        tournament: Option<i32>,
        /// Leave CHIP tables out of the totals
        #[arg(long)]
        normal_only: bool,
    },
    /// Print per player statistics for a group
    Stats {
        #[arg(long, env = "MJSCORE_KEY")]
        key: String,
        /// Defaults to the group the key was issued for
        #[arg(long)]
        group: Option<i32>,
        /// First day of the window (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last day of the window (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!("could not serialize output: {}", e),
    }
}

/// The id of `expected` type the command targets: the explicit one, or the
/// key's own resource
fn target_id(
    service: &Service<DBWrapper>,
    key: &str,
    explicit: Option<i32>,
    expected: ResourceType,
) -> Result<i32, Error> {
    match explicit {
        Some(id) => Ok(id),
        None => Ok(service.open_as(key, expected)?.resource.id()),
    }
}

fn run(cli: Cli, config: &Config) -> Result<(), Error> {
    let pool = init_db_pool(config.require_database_url()?, config.pool_size)?;
    let db = DBWrapper::from_pg_pool(&pool)?;

    if let Command::Migrate = cli.command {
        db.run_migrations()?;
        tracing::info!("migrations applied");
        return Ok(());
    }

    let service = Service::new(db).with_mint_attempts(config.key_attempts);
    match cli.command {
        Command::Migrate => {}
        Command::CreateGroup {
            name,
            description,
            issuer,
        } => {
            let form = GroupForm { name, description };
            print_json(&service.create_group(&form, issuer.as_deref())?);
        }
        Command::Links { key } => print_json(&service.links(&key)?),
        Command::ScoreMap {
            key,
            tournament,
            normal_only,
        } => {
            let id = target_id(&service, &key, tournament, ResourceType::Tournament)?;
            let map = if normal_only {
                service.score_map_normal_only(&key, id)?
            } else {
                service.score_map(&key, id)?
            };
            print_json(&map);
        }
        Command::Stats {
            key,
            group,
            start,
            end,
        } => {
            let id = target_id(&service, &key, group, ResourceType::Group)?;
            print_json(&service.player_stats(&key, id, start.as_deref(), end.as_deref())?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli, &config) {
        tracing::error!(code = e.code(), "{}", e);
        process::exit(1);
    }
}
