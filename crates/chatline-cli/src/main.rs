//! chatline - terminal chat client

mod config;
mod ui;

use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use chatline_core::{
    CompletionClientCache, ConversationRepository, CredentialCache, FileKeyStore, OpenAIFactory,
    Orchestrator, Services, Session, SessionSettings,
};
use chatline_store::{Connector, StoreHandles, drivers::FsConnector};
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = init_logging() {
        eprintln!("Warning: logging disabled: {e}");
    }

    if let Err(e) = run().await {
        tracing::error!(error = %e, "chatline exited with an error");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load();
    tracing::info!(path = %Config::config_path().display(), "starting chatline");

    let credentials = Arc::new(CredentialCache::new(FileKeyStore::new(config.key_path())));
    let clients = Arc::new(CompletionClientCache::new(
        credentials.clone(),
        OpenAIFactory::new(config.base_url.clone()),
    ));

    let connector: Arc<dyn Connector> = Arc::new(FsConnector::new(config.store_root()));
    let store = Arc::new(StoreHandles::new(connector, config.store_config()));
    let repository = Arc::new(ConversationRepository::new(store.clone()));
    let orchestrator = Orchestrator::new(clients.clone()).with_max_tokens(config.max_tokens);

    let services = Services {
        credentials,
        clients,
        repository,
        orchestrator,
    };
    let settings = SessionSettings {
        models: config.models.clone(),
        system_prompt: config.system_prompt.clone(),
    };

    let result = ui::run(Session::new(services, settings)).await;

    if let Err(e) = store.invalidate_cluster().await {
        tracing::warn!(error = %e, "failed to close the store");
    }
    result?;

    println!("See ya !");
    Ok(())
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() -> anyhow::Result<()> {
    let dir = Config::data_dir();
    fs::create_dir_all(&dir)?;
    let file = File::options()
        .create(true)
        .append(true)
        .open(dir.join("chatline.log"))?;

    let filter =
        EnvFilter::try_from_env("CHATLINE_LOG").unwrap_or_else(|_| EnvFilter::new("chatline=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
