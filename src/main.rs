use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::catalog_kind::CatalogKind;
use crate::models::errors::{CatalogError, ErrorKind};
use crate::models::filter::SortOrder;
use crate::models::uploader::AssetSlot;

mod commands;
mod config;
mod endpoints;
mod models;

type Result<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Parser)]
#[command(name = "skin-catalog", version, about = "Browse and administer the cosmetic asset catalogs")]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the bearer token and report whether writes are enabled
    Token,
    /// List a catalog
    List {
        catalog: CatalogKind,
        #[arg(long, default_value = "")]
        search: String,
        /// Only records whose role or type equals this value
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_enum, default_value_t = SortOrder::Source)]
        sort: SortOrder,
        /// Read through the contents API instead of the public mirror
        #[arg(long)]
        authenticated: bool,
        /// Print the matching records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print one record
    Show { catalog: CatalogKind, id: String },
    /// Add a record; the id is generated
    Add {
        catalog: CatalogKind,
        /// Record fields as a JSON object
        #[arg(long)]
        json: String,
        /// Upload a local file into a field first, e.g. `--upload zip=./skin.zip`
        #[arg(long = "upload", value_parser = parse_upload)]
        uploads: Vec<(String, PathBuf)>,
    },
    /// Change fields of an existing record
    Update {
        catalog: CatalogKind,
        id: String,
        /// Fields to change as a JSON object
        #[arg(long, default_value = "{}")]
        json: String,
        #[arg(long = "upload", value_parser = parse_upload)]
        uploads: Vec<(String, PathBuf)>,
    },
    /// Delete a record
    Delete { catalog: CatalogKind, id: String },
    /// Upload an image or archive and print its public url
    Upload {
        catalog: CatalogKind,
        #[arg(value_enum)]
        slot: AssetSlot,
        path: PathBuf,
    },
    /// Search a catalog interactively, one query per line
    Browse { catalog: CatalogKind },
    /// Install an asset archive through the host downloader
    Install {
        url: String,
        /// Program that downloads and extracts the archive
        #[arg(long, env = "CATALOG_DOWNLOADER")]
        downloader: Option<String>,
    },
}

fn parse_upload(arg: &str) -> std::result::Result<(String, PathBuf), String> {
    let (field, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=PATH, got {}", arg))?;

    if field.is_empty() || path.is_empty() {
        return Err(format!("expected FIELD=PATH, got {}", arg));
    }

    Ok((field.to_owned(), PathBuf::from(path)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.config, cli.command).await {
        match e.kind {
            ErrorKind::Conflict => {
                eprintln!("{}: {}. Reload the catalog and try again.", e.kind, e)
            }
            _ => eprintln!("{}: {}", e.kind, e),
        }

        std::process::exit(e.kind.exit_code());
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upload_argument_is_split_on_equals() {
        assert_eq!(
            parse_upload("zip=./skins/layla.zip").unwrap(),
            ("zip".to_owned(), PathBuf::from("./skins/layla.zip"))
        );
        assert!(parse_upload("zip").is_err());
        assert!(parse_upload("=a.png").is_err());
    }

    #[test]
    fn parses_add_command() {
        let cli = Cli::try_parse_from([
            "skin-catalog",
            "--owner",
            "o",
            "--repo",
            "r",
            "add",
            "battleemote",
            "--json",
            "{}",
            "--upload",
            "image1=a.png",
        ])
        .unwrap();

        match cli.command {
            Command::Add { catalog, uploads, .. } => {
                assert_eq!(catalog, CatalogKind::BattleEmote);
                assert_eq!(uploads.len(), 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
