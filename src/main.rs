#![deny(clippy::implicit_return)]
#![allow(clippy::needless_return)]

mod application;
mod configuration;
mod domain;
mod infrastructure;

use std::env;
use std::path;
use std::process;
use std::sync::Arc;

use anyhow::Error;
use tokio::sync::mpsc;
use tokio::sync::Mutex;

use crate::application::cli;
use crate::application::repl;
use crate::configuration::Settings;
use crate::domain::models::Event;
use crate::domain::services::Controller;
use crate::domain::services::SessionStore;
use crate::infrastructure::gateway::HttpGateway;
use crate::infrastructure::storage::FileStorage;

fn handle_error(err: Error) {
    eprintln!(
        "quickchat {} failed with the following error: {err}",
        env!("CARGO_PKG_VERSION")
    );
    process::exit(1);
}

#[tokio::main]
async fn main() {
    let debug_log_dir = env::var("QUICKCHAT_LOG_DIR").unwrap_or_else(|_| {
        return dirs::cache_dir()
            .unwrap()
            .join("quickchat")
            .to_string_lossy()
            .to_string();
    });

    let file_appender = tracing_appender::rolling::never(debug_log_dir, "debug.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);
    if env::var("RUST_LOG")
        .unwrap_or_else(|_| return "".to_string())
        .contains("quickchat")
    {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(writer)
            .with_ansi(false)
            .init();
    }

    let matches = cli::build().get_matches();

    let storage = match matches.get_one::<String>("data-dir") {
        Some(dir) => FileStorage::new(path::PathBuf::from(dir)),
        None => FileStorage::default(),
    };

    let mut settings = Settings::load(&storage);
    if let Some(model) = matches.get_one::<String>("model") {
        settings.model = model.to_string();
        if let Err(err) = settings.save(&storage) {
            tracing::warn!(error = ?err, "Failed to persist settings");
        }
    }

    let mut store = SessionStore::hydrate(Box::new(storage));
    store.create_chat();
    let store = Arc::new(Mutex::new(store));

    // Safe: api-url carries a default value.
    let api_url = matches.get_one::<String>("api-url").unwrap();
    let gateway = Arc::new(HttpGateway::new(api_url));

    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    let controller = Controller::new(store.clone(), Arc::new(settings), gateway, tx);

    if let Err(err) = repl::start(controller, store, rx).await {
        handle_error(err);
    }

    process::exit(0);
}
