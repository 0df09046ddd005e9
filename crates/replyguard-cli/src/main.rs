mod monitor;
mod review;
mod services;

use clap::{Parser, Subcommand};
use replyguard_core::{CommentStatus, Sentiment};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "replyguard-cli")]
#[command(about = "Watch Reddit for brand mentions and review drafted replies")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one monitor in the foreground until Ctrl-C
    Monitor {
        /// Term to look for in new comments
        #[arg(long)]
        term: String,

        /// Recipient of negative-mention alerts
        #[arg(long)]
        notify_target: Option<String>,

        /// Comma-separated subreddits to watch
        #[arg(long, value_delimiter = ',', required = true)]
        sources: Vec<String>,

        /// Seconds between scans (defaults to REPLYGUARD_DEFAULT_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Approve a pending reply and post it
    Approve {
        natural_id: String,

        /// Post this text instead of the draft
        #[arg(long)]
        edited_response: Option<String>,
    },
    /// Reject a pending reply
    Reject { natural_id: String },
    /// List processed comments
    List {
        #[arg(long, conflicts_with_all = ["sentiment", "term"])]
        status: Option<CommentStatus>,

        #[arg(long, conflicts_with = "term")]
        sentiment: Option<Sentiment>,

        /// Tracked term the comments were found for
        #[arg(long)]
        term: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Show replies waiting for a decision
    Pending,
    /// Retry approved replies whose post failed
    RetryPosts {
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },
    /// Apply database migrations
    Migrate,
}

fn init_tracing(fallback: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        // Only needs DATABASE_URL, not the full service configuration.
        Commands::Migrate => {
            init_tracing("info")?;
            services::migrate().await
        }
        command => run(command).await,
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = replyguard_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    let registry = services::connect(&config).await?;
    let workflow = registry.workflow();

    match command {
        Commands::Monitor {
            term,
            notify_target,
            sources,
            interval,
        } => {
            let interval = interval.unwrap_or(config.default_interval_secs);
            monitor::run_foreground(&registry, &term, notify_target, &sources, interval).await
        }
        Commands::Approve {
            natural_id,
            edited_response,
        } => review::approve(workflow, &natural_id, edited_response).await,
        Commands::Reject { natural_id } => review::reject(workflow, &natural_id).await,
        Commands::List {
            status,
            sentiment,
            term,
            limit,
        } => review::list(workflow, status, sentiment, term, limit).await,
        Commands::Pending => review::pending(workflow).await,
        Commands::RetryPosts { limit } => review::retry_posts(workflow, limit).await,
        Commands::Migrate => services::migrate().await,
    }
}

#[cfg(test)]
mod tests;
