//! # ISS Tracker CLI (`iss-tracker`)
//!
//! ## Usage
//!
//! ```bash
//! iss-tracker --config ./config/iss-tracker.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `iss-tracker serve` | Start the HTTP server |
//! | `iss-tracker serve --preload` | Fetch the feed, then start the server |
//! | `iss-tracker fetch` | Fetch the feed once and print a summary |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use iss_tracker::{config, loader::Loader, logging, query, server};

/// ISS Tracker: serves position, speed, and location queries over the
/// ISS orbital ephemeris.
#[derive(Parser)]
#[command(name = "iss-tracker", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/iss-tracker.toml`. Built-in defaults are used
    /// when the file does not exist.
    #[arg(long, global = true, default_value = "./config/iss-tracker.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server.
    ///
    /// Binds to `[server].bind`. The dataset starts empty unless
    /// `--preload` is given; `POST /post-data` loads it at any time.
    Serve {
        /// Fetch the feed before accepting requests.
        #[arg(long)]
        preload: bool,
    },

    /// Fetch and parse the feed once, then print a summary.
    ///
    /// Useful for checking that the upstream URL is reachable and the
    /// document parses, without starting the server.
    Fetch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging();

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Serve { preload } => {
            server::run_server(&cfg, preload).await?;
        }
        Commands::Fetch => {
            run_fetch(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_fetch(cfg: &config::Config) -> anyhow::Result<()> {
    let loader = Loader::new(&cfg.upstream)?;
    let dataset = loader.load().await?;

    let object = dataset
        .metadata
        .as_ref()
        .and_then(|m| m.object_name.as_deref())
        .unwrap_or("(unknown)");

    println!("--- Ephemeris ---");
    println!("source:       {}", loader.url());
    println!("object:       {}", object);
    if let Some(originator) = dataset.header.as_ref().and_then(|h| h.originator.as_deref()) {
        println!("originator:   {}", originator);
    }
    println!("epochs:       {}", dataset.epoch_count());
    println!(
        "comments:     {}",
        dataset.comments.as_ref().map_or(0, Vec::len)
    );

    if let Ok(vectors) = query::state_vectors(&dataset) {
        if let (Some(first), Some(last)) = (vectors.first(), vectors.last()) {
            println!("first epoch:  {}", first.epoch);
            println!("last epoch:   {}", last.epoch);
        }
        match query::nearest_to_now(&dataset) {
            Ok(sv) => println!("nearest now:  {}", sv.epoch),
            Err(e) => println!("nearest now:  ({})", e),
        }
    }

    Ok(())
}
