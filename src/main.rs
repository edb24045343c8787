use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;

use tessera::{settings::load_settings, snapshot::load_snapshot, TimelineSettings};

#[derive(Parser, Debug)]
#[clap(name = "tessera", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging output.
    #[clap(short, long, action)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the render plan of a timeline snapshot as JSON.
    Render {
        /// The JSON timeline snapshot to render.
        #[clap(long, value_parser)]
        snapshot: PathBuf,

        /// The JSON timeline settings file. Defaults apply if it is omitted or missing.
        #[clap(long, value_parser)]
        settings: Option<PathBuf>,

        /// Pretty-print the render plan.
        #[clap(long, action)]
        pretty: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Render { snapshot, settings, pretty } => {
            let settings = match settings {
                Some(path) => load_settings(&path)?,
                None => TimelineSettings::default(),
            };
            let mut snapshot = load_snapshot(&snapshot)?;
            let plan = snapshot.render(&settings);
            let json = if pretty {
                serde_json::to_string_pretty(&plan)
            } else {
                serde_json::to_string(&plan)
            }.context("Failed to serialize the render plan")?;
            println!("{json}");
        }
    }
    Ok(())
}
