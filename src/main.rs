use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use forum_curator::command::curate_command;
use forum_curator::config::{CuratorConfig, PlatformConfig, StoreConfig};
use forum_curator::curator::Curator;
use forum_curator::metrics::{Metrics, NoopMetrics, PrometheusMetrics};
use forum_curator::platform::DiscordPlatform;
use forum_curator::scheduler::{self, parse_schedule, spawn_curation_loop};
use forum_curator::store::{CurationStore, LibSqlBackend};

#[derive(Parser)]
#[command(name = "forum-curator")]
#[command(about = "Greenlights forum suggestions that the community agrees with")]
struct Cli {
    /// Path to the curation database
    #[arg(long, env = "CURATOR_DB_PATH")]
    db_path: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Curate a single forum channel
    Curate {
        channel_id: String,

        /// Leave thread tags untouched; already-finalized threads are still
        /// re-synced into the database
        #[arg(long)]
        read_only: bool,
    },
    /// Curate every configured forum on the configured cron schedule
    Schedule,
    /// Print the stored curation records as JSON lines
    List,
    /// Run a read-only pass over the configured forums and print metrics.
    /// Tags are untouched, but finalized threads are re-synced to storage.
    Metrics,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    let cli = Cli::parse();

    let mut store_config = StoreConfig::from_env();
    if let Some(path) = cli.db_path {
        store_config.db_path = path.into();
    }
    let store = Arc::new(
        LibSqlBackend::new_local(&store_config.db_path)
            .await
            .with_context(|| {
                format!("failed to open database at {}", store_config.db_path.display())
            })?,
    );

    if let Command::List = cli.command {
        for record in store.list_curation_records().await? {
            println!("{}", serde_json::to_string(&record)?);
        }
        return Ok(());
    }

    let curator_config = CuratorConfig::from_env()?;
    let platform_config = PlatformConfig::from_env()?;
    let platform = Arc::new(DiscordPlatform::new(&platform_config)?);

    let prometheus = if curator_config.metrics_enabled || matches!(cli.command, Command::Metrics)
    {
        Some(Arc::new(PrometheusMetrics::new()?))
    } else {
        None
    };
    let metrics: Arc<dyn Metrics> = match &prometheus {
        Some(m) => m.clone(),
        None => Arc::new(NoopMetrics),
    };

    let curator = Arc::new(Curator::new(platform, store, metrics, curator_config));

    match cli.command {
        Command::Curate {
            channel_id,
            read_only,
        } => {
            let (reply, _) = curate_command(&curator, &channel_id, read_only).await?;
            println!("{reply}");
        }
        Command::Schedule => {
            let expr = curator
                .config()
                .schedule
                .clone()
                .context("CURATOR_SCHEDULE is not set")?;
            let schedule = parse_schedule(&expr)?;
            let forum_ids = curator.config().forum_ids();
            if forum_ids.is_empty() {
                anyhow::bail!("no forums configured, set CURATOR_FORUM_IDS or CURATOR_ALPHA_FORUM_IDS");
            }

            info!(schedule = %expr, forums = forum_ids.len(), "Starting scheduled curation");
            let handle = spawn_curation_loop(curator.clone(), forum_ids, schedule);

            tokio::signal::ctrl_c().await?;
            info!("Shutting down");
            handle.abort();
        }
        Command::Metrics => {
            let forum_ids = curator.config().forum_ids();
            let summary = scheduler::run_scheduled_pass(&curator, &forum_ids, true).await;
            info!(
                channels = summary.channels,
                failed = summary.failed_channels,
                "Read-only pass complete"
            );
            if let Some(prometheus) = &prometheus {
                print!("{}", prometheus.render()?);
            }
        }
        Command::List => {}
    }

    Ok(())
}
