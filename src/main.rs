//! # Doc Catalog CLI (`doccat`)
//!
//! ## Usage
//!
//! ```bash
//! doccat --config ./config/doccat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `doccat list` | Load documents from the API, store them locally, print the grid |
//! | `doccat cached` | Print the locally stored documents |
//! | `doccat create` | Create a document in the local store |
//! | `doccat watch` | Load, render, and follow live notifications until Ctrl-C |
//!
//! ## Examples
//!
//! ```bash
//! # Newest documents first
//! doccat list --sort createdDate
//!
//! # Highest version first
//! doccat cached --sort version --desc
//!
//! # Create a document with two contributors
//! doccat create --title "Release notes" --version 2.1 \
//!     --contributor Ada --contributor Grace --attachment notes.pdf
//!
//! # Follow live notifications with debug logging
//! doccat -vv watch
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use doc_catalog::commands;
use doc_catalog::config;
use doc_catalog::logging;
use doc_catalog::core::service::CreateDocumentInput;
use doc_catalog::core::sort::{SortBy, SortOrder, SortState};

/// Doc Catalog CLI: browse, create, and follow documents in a catalog.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used. See
/// `config/doccat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "doccat",
    about = "Doc Catalog: browse, create, and follow documents in a catalog",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/doccat.toml`.
    #[arg(long, global = true, default_value = "./config/doccat.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace). Ignored
    /// when `RUST_LOG` is set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Load documents from the catalog API and print them.
    ///
    /// The loaded collection replaces the local copy. Records missing an
    /// id, title, or version are skipped.
    List(SortArgs),

    /// Print the locally stored documents without contacting the API.
    Cached(SortArgs),

    /// Create a document in the local store.
    Create {
        #[arg(long)]
        title: String,

        #[arg(long = "version")]
        doc_version: String,

        /// Contributor name. Repeat for several contributors.
        #[arg(long = "contributor")]
        contributors: Vec<String>,

        /// Attachment name. Repeat for several attachments.
        #[arg(long = "attachment")]
        attachments: Vec<String>,
    },

    /// Load and print documents, then follow live notifications until Ctrl-C.
    ///
    /// If the notification stream is unreachable the grid is still shown.
    Watch(SortArgs),
}

#[derive(Args)]
struct SortArgs {
    /// Sort key: `name`, `version`, or `createdDate`.
    #[arg(long, default_value = "name")]
    sort: SortBy,

    /// Reverse the order.
    #[arg(long)]
    desc: bool,
}

impl SortArgs {
    fn state(&self) -> SortState {
        let order = if self.desc {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        SortState::new(self.sort, order)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::List(args) => commands::run_list(&cfg, args.state()).await?,
        Commands::Cached(args) => commands::run_cached(&cfg, args.state()).await?,
        Commands::Create {
            title,
            doc_version,
            contributors,
            attachments,
        } => {
            let input = CreateDocumentInput {
                title,
                version: doc_version,
                contributors,
                attachments,
            };
            commands::run_create(&cfg, input).await?;
        }
        Commands::Watch(args) => commands::run_watch(&cfg, args.state()).await?,
    }

    Ok(())
}
