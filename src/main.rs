// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};

use rhythmctl::config::{self, catalog::Catalog};
use rhythmctl::instruments::InstrumentRegistry;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=808 style drum machine

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/rhythmctl
ExecStart=/usr/local/bin/rhythmctl start --config "$RHYTHMCTL_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=rhythmctl.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An 808 style drum machine."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start runs the drum machine, controlled from the keyboard.
    Start {
        /// The path to the sequencer config.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Lists the instruments of a catalog.
    Instruments {
        /// The path to the instrument catalog. Defaults to the stock 808 catalog.
        #[arg(short, long)]
        catalog: Option<PathBuf>,
    },
    /// Lists every sample a catalog can play and verifies them against a sample directory.
    Samples {
        /// The path to the instrument catalog. Defaults to the stock 808 catalog.
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// The directory holding the sample files.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Prints the stock 808 catalog as YAML.
    Catalog {},
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config } => {
            config::init_machine_and_controller(config.as_deref())?
                .join()
                .await?;
        }
        Commands::Instruments { catalog } => {
            let catalog = config::load_catalog(catalog.as_deref())?;
            let registry = InstrumentRegistry::new(&catalog, None)?;

            println!("Instruments (count: {}):", registry.len());
            for instrument in registry.iter() {
                println!("- {}", instrument);
            }
        }
        Commands::Samples { catalog, dir } => {
            let catalog = config::load_catalog(catalog.as_deref())?;
            let assets = config::load_assets(dir.as_deref())?;
            let registry = InstrumentRegistry::new(&catalog, assets.as_ref())?;

            println!("Samples (count: {}):", registry.sample_count());
            for instrument in registry.iter() {
                let ids: Vec<String> = instrument
                    .variants()
                    .ids()
                    .map(|id| id.file_name())
                    .collect();
                println!("- {}: {}", instrument.name(), ids.join(", "));
            }

            if assets.is_some() {
                let missing: Vec<String> = registry
                    .missing_samples()
                    .map(|id| id.file_name())
                    .collect();
                if missing.is_empty() {
                    println!("\nAll samples present.");
                } else {
                    println!("\nMissing (count: {}):", missing.len());
                    for file in missing {
                        println!("- {}", file);
                    }
                    return Err("sample directory is incomplete".into());
                }
            }
        }
        Commands::Catalog {} => {
            print!("{}", Catalog::default().to_yaml()?);
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
