mod scrape;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scrape::{BackfillArgs, SortKey};

#[derive(Debug, Parser)]
#[command(name = "vscout-cli")]
#[command(about = "Extract product variants and their prices from product pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract variants from a saved product page
    Extract {
        /// Path to the saved HTML document
        file: std::path::PathBuf,

        /// Address the page was saved from; used for variant links
        #[arg(long)]
        url: Option<String>,

        /// Fetch each variant's own page to fill in missing prices
        #[arg(long)]
        backfill: bool,

        #[command(flatten)]
        backfill_args: BackfillArgs,
    },
    /// Fetch a product page, extract its variants and fill in their prices
    Scrape {
        url: String,

        /// Skip fetching variant pages
        #[arg(long)]
        no_backfill: bool,

        #[command(flatten)]
        backfill_args: BackfillArgs,

        /// Order variants in the output
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = vscout_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.env.ansi_logs())
        .init();

    match cli.command {
        Commands::Extract {
            file,
            url,
            backfill,
            backfill_args,
        } => {
            let backfill = backfill.then_some(backfill_args);
            scrape::run_extract(&config, &file, url.as_deref(), backfill.as_ref()).await
        }
        Commands::Scrape {
            url,
            no_backfill,
            backfill_args,
            sort,
        } => {
            let backfill = (!no_backfill).then_some(backfill_args);
            scrape::run_scrape(&config, &url, backfill.as_ref(), sort).await
        }
    }
}
