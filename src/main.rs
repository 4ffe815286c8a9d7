//! Rune Compose - inspect and compare compose files
//!
//! This is the CLI entry point for rune-compose.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rune_compose::compose::{Compose, ComposeParser};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Rune Compose - compose descriptor tooling
#[derive(Parser)]
#[command(name = "rune-compose")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "Read, normalize and compare compose files", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a compose file
    Config {
        /// Compose file
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: Format,
    },

    /// List services
    #[command(name = "ls")]
    List {
        /// Compose file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the content hash of a compose file
    Hash {
        /// Compose file
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Compare two compose files
    Eq {
        /// First compose file
        left: PathBuf,
        /// Second compose file
        right: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config { file, format } => {
            let compose = load(file)?;
            let output = match format {
                Format::Yaml => ComposeParser::to_yaml(&compose)?,
                Format::Json => ComposeParser::to_json(&compose)?,
            };
            println!("{}", output.trim_end());
        }
        Commands::List { file } => {
            let compose = load(file)?;
            print_services(&compose);
        }
        Commands::Hash { file } => {
            let compose = load(file)?;
            println!("{}", compose.hash()?);
        }
        Commands::Eq { left, right } => {
            let a = parse(&left)?;
            let b = parse(&right)?;
            if !a.equal(&b)? {
                bail!("{} and {} differ", left.display(), right.display());
            }
            println!("{} and {} are equal", left.display(), right.display());
        }
    }

    Ok(())
}

fn load(file: Option<PathBuf>) -> Result<Compose> {
    let path = match file {
        Some(path) => path,
        None => {
            let working_dir = std::env::current_dir()?;
            ComposeParser::find_compose_file(&working_dir).with_context(|| {
                format!("No compose file found in {}", working_dir.display())
            })?
        }
    };
    parse(&path)
}

fn parse(path: &Path) -> Result<Compose> {
    ComposeParser::parse_file(path).with_context(|| format!("Failed to load {}", path.display()))
}

fn print_services(compose: &Compose) {
    println!(
        "{:<20} {:<30} {:<20} {:<20} VOLUMES",
        "SERVICE", "SOURCE", "NETWORKS", "DEPENDS ON"
    );
    for service in compose.services() {
        let source = match (service.image(), service.build()) {
            (Some(image), _) => image.to_string(),
            (None, Some(build)) => format!("build {}", build.context),
            (None, None) => "-".to_string(),
        };
        println!(
            "{:<20} {:<30} {:<20} {:<20} {}",
            service.name,
            source,
            join(service.networks().keys()),
            join(service.depends_on().keys()),
            join(service.bindings().map(|b| b.to_string())),
        );
    }
}

fn join(items: Vec<String>) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}
