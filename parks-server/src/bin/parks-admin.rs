//! parks-admin - one-shot maintenance for the parks collection
//!
//! Each command opens a connection, runs once and closes the connection,
//! whatever the outcome.

use clap::{Parser, Subcommand};
use parks::config::{ParksConfig, SeedSource};
use parks::errors::ParksResult;
use parks::service::ParkService;
use parks_mongo_adapter::MongoModule;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "parks-admin")]
#[command(about = "Initialize or flush the parks collection", long_about = None)]
struct Cli {
    /// Connection string (default: PARKS_DB_URI or mongodb://localhost:27017/parks)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Collection name (default: PARKS_COLLECTION or parkpoints)
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the 2dsphere index and import the dataset if the collection is empty
    Init {
        /// JSON file with an array of parks (default: built-in dataset)
        #[arg(long)]
        seed_file: Option<PathBuf>,
    },
    /// Drop the whole collection
    Flush,
}

fn main() -> ExitCode {
    colog::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ParksResult<()> {
    let mut builder = ParksConfig::builder();
    let env_config = ParksConfig::from_env()?;
    builder = builder
        .connection_string(cli.uri.as_deref().unwrap_or(env_config.connection_string()))
        .collection_name(
            cli.collection
                .as_deref()
                .unwrap_or(env_config.collection_name()),
        )
        .default_database(env_config.default_database())
        .retry_policy(env_config.retry_policy())
        .seed_source(env_config.seed_source().clone());
    if let Command::Init {
        seed_file: Some(path),
    } = &cli.command
    {
        builder = builder.seed_source(SeedSource::File(path.clone()));
    }
    let config = builder.build();

    let service = ParkService::builder()
        .load_module(MongoModule::from_parks_config(&config).build()?)
        .config(config)
        .build()?;

    match cli.command {
        Command::Init { .. } => {
            let outcome = service.one_shot().initialize()?;
            println!("{}", outcome);
        }
        Command::Flush => {
            service.one_shot().flush()?;
            println!("collection flushed");
        }
    }
    Ok(())
}
