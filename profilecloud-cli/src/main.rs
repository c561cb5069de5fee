//! ProfileCloud command-line viewer
//!
//! Merges a set of local config files with a set of remote documents and
//! prints the resulting config tree.
//!
//! Usage:
//!   profilecloud --local local.json --remote remote.json --principal u1 --show-community
//!   profilecloud --local local.json --search "studio \$midi" --sort name --asc
//!   profilecloud --share-links links.json --clone abc123 --json

use anyhow::Result;
use clap::{Parser, ValueEnum};
use profilecloud_cli::{Inputs, Settings, View, read_documents, read_share_links, render_tree, run};
use profilecloud_tree::{SortDirection, SortField, SortKey, terms_from_query};
use profilecloud_types::PrincipalId;
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Date,
    Type,
}

impl From<SortArg> for SortField {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortField::Name,
            SortArg::Date => SortField::Date,
            SortArg::Type => SortField::Type,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "profilecloud")]
#[command(about = "Merge local and cloud configs and print the config tree")]
struct Args {
    /// JSON array of local config files
    #[arg(short, long)]
    local: Option<PathBuf>,

    /// JSON array of remote documents
    #[arg(short, long)]
    remote: Option<PathBuf>,

    /// JSON object mapping share-link ids to documents
    #[arg(long)]
    share_links: Option<PathBuf>,

    /// Settings file (recommended owners, engine and catalog options)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Signed-in user id
    #[arg(short, long)]
    principal: Option<String>,

    /// Clone the config behind this share link before printing
    #[arg(long)]
    clone: Option<String>,

    /// Search query; `$name` terms match action blocks
    #[arg(short, long)]
    search: Option<String>,

    /// Only match whole words
    #[arg(long)]
    whole_match: bool,

    /// Match case
    #[arg(long)]
    case_match: bool,

    #[arg(long, value_enum, default_value = "date")]
    sort: SortArg,

    /// Sort items in ascending order
    #[arg(long)]
    asc: bool,

    /// Device or element types to check compatibility against
    #[arg(short, long, value_delimiter = ',')]
    types: Vec<String>,

    /// Move shared configs that do not fit `--types` into their own folder
    #[arg(long)]
    supported_only: bool,

    /// Show recommended and community configs in separate folders
    #[arg(long)]
    show_community: bool,

    /// Print the merged list as JSON instead of the tree
    #[arg(long)]
    json: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_level.as_str())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::load(args.settings.as_deref())?;
    let inputs = Inputs {
        local: args.local.as_deref().map(read_documents).transpose()?.unwrap_or_default(),
        remote: args.remote.as_deref().map(read_documents).transpose()?.unwrap_or_default(),
        share_links: args
            .share_links
            .as_deref()
            .map(read_share_links)
            .transpose()?
            .unwrap_or_default(),
        principal: args.principal.map(PrincipalId::new),
        clone_link: args.clone,
    };
    let view = View {
        terms: args
            .search
            .as_deref()
            .map(|q| terms_from_query(q, args.whole_match, args.case_match))
            .unwrap_or_default(),
        sort: SortKey {
            field: args.sort.into(),
            direction: if args.asc { SortDirection::Asc } else { SortDirection::Desc },
        },
        supported_only: args.supported_only,
        hide_community: !args.show_community,
        types: args.types,
    };

    let outcome = run(&settings, inputs, &view).await?;
    if let Some(cloned) = &outcome.cloned {
        info!("Cloned share link into {} ({})", cloned.name(), cloned.application_id);
    }
    info!("{} configs merged", outcome.merged.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.merged)?);
    } else {
        print!("{}", render_tree(&outcome.tree));
    }
    Ok(())
}
