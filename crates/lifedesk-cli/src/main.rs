use clap::Parser;
use lifedesk_store::{LocalCache, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lifedesk_cli=info,lifedesk_store=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();

    let mut config = config::Config::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(dir = %config.data_dir.display(), key = %config.store_key, "Using store");

    let mut cache = LocalCache::with_key(config.file_store(), config.store_key.clone());
    if commands::run_offline(&cli.command, &mut cache)? {
        return Ok(());
    }

    let mut session = Session::open(cache, config.autosave_delay, &config.app_name);
    let result = commands::run(cli.command, &mut session, &config);

    // Pending edits are written before exit, even when the command failed
    if session.close().await.is_none() {
        tracing::warn!("Auto-save task ended unexpectedly; last edits may be lost");
    }
    result
}
