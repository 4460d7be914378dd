mod commands;
mod config;
mod file_store;
mod fingerprint;
mod supabase;
mod tasks;

use clap::Parser;
use shared::powerup::FirstVisit;
use tracing_subscriber::EnvFilter;

use crate::commands::{Cli, Command, Context};
use crate::config::MainConfig;
use crate::file_store::FileStore;
use crate::fingerprint::HostProbe;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = Cli::parse().command;

    let config = MainConfig::from_env()?;
    let store = FileStore::new(config.state_path()?);
    tracing::debug!(path = %store.path().display(), "using local state");

    if FirstVisit::new(&store).take() && command != Command::Spin {
        println!("Welcome! Spin the daily wheel for a power-up with `gradence spin`.\n");
    }

    let ctx = Context {
        backend: supabase::connect(config.supabase()?),
        store,
        probe: HostProbe,
        watch_interval: config.watch_interval(),
    };

    commands::run(command, &ctx).await
}
