// Moderated chat simulator: type messages, watch harmful ones get hidden,
// and play moderator by restoring them from the flagged-message history.
//
// Layers: `core/` has no terminal or database code, `infra/` backs the
// history port with SQLite or memory, `console/` owns stdin and stdout.
//
// Startup reads settings from the environment, opens the history store,
// builds one shared ledger and session, then starts the restoration watcher
// and the live history view before handing stdin to the console. On exit the
// session is shut down and the feed is closed so the watcher can drain.

// Each layer root is a descriptively named file rather than another mod.rs.
#[path = "console/console_layer.rs"]
mod console;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::console::history_view::HistoryView;
use crate::console::repl::Console;
use crate::core::history::{
    HistoryNotifier, HistoryStore, ModerationLedger, RestorationTarget, RestorationWatcher,
};
use crate::core::moderation::MessageClassifier;
use crate::core::simulation::{SimulationConfig, SimulationSession};
use crate::infra::history::{InMemoryHistoryStore, ModerationFeed, SqliteHistoryStore};
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

const DEFAULT_BOT_REPLY_DELAY_MS: u64 = 1000;
const DEFAULT_FEED_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Sqlite,
    Memory,
}

/// Settings read from the environment (and `.env`).
#[derive(Debug)]
struct Settings {
    store: StoreKind,
    db_path: String,
    bot_reply_delay: Duration,
    feed_capacity: usize,
}

impl Settings {
    fn from_env() -> anyhow::Result<Self> {
        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());

        let store = match std::env::var("HISTORY_STORE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StoreKind::Sqlite,
            "memory" => StoreKind::Memory,
            other => anyhow::bail!("HISTORY_STORE must be 'sqlite' or 'memory', got '{}'", other),
        };

        let db_path = std::env::var("HISTORY_DB_PATH")
            .unwrap_or_else(|_| format!("{}/moderation_history.db", data_dir));

        let bot_reply_delay = std::env::var("BOT_REPLY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_BOT_REPLY_DELAY_MS);

        let feed_capacity = std::env::var("MODERATION_FEED_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_FEED_CAPACITY);

        Ok(Self {
            store,
            db_path,
            bot_reply_delay: Duration::from_millis(bot_reply_delay),
            feed_capacity,
        })
    }
}

async fn open_store(settings: &Settings) -> anyhow::Result<Box<dyn HistoryStore>> {
    match settings.store {
        StoreKind::Memory => {
            tracing::info!("Using in-memory history store; nothing will be kept");
            Ok(Box::new(InMemoryHistoryStore::new()))
        }
        StoreKind::Sqlite => {
            // Keep runtime databases in a dedicated folder so the repo root stays tidy.
            if let Some(parent) = std::path::Path::new(&settings.db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create data directory {}", parent.display())
                    })?;
                }
            }

            let store = SqliteHistoryStore::connect(&settings.db_path)
                .await
                .context("Failed to open history database")?;
            store
                .migrate()
                .await
                .context("Failed to migrate history database")?;
            tracing::info!(path = %settings.db_path, "Using SQLite history store");
            Ok(Box::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = Settings::from_env()?;
    tracing::debug!(?settings, "Loaded settings");

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.

    let store = open_store(&settings).await?;
    let notifier = Arc::new(HistoryNotifier::new());
    let ledger = Arc::new(ModerationLedger::new(store, Arc::clone(&notifier)));
    let session = Arc::new(SimulationSession::new(
        Arc::new(MessageClassifier::new()),
        Arc::clone(&ledger),
        SimulationConfig {
            bot_reply_delay: settings.bot_reply_delay,
        },
    ));

    // Moderator decisions flow feed -> watcher -> ledger + session
    let feed = ModerationFeed::new(settings.feed_capacity);
    let watcher = RestorationWatcher::new(Arc::clone(&ledger))
        .watch(Arc::clone(&session) as Arc<dyn RestorationTarget>)
        .spawn(feed.subscribe());

    // Live history view prints through its own task
    let (render_tx, mut render_rx) = mpsc::unbounded_channel::<String>();
    let history_view = HistoryView::spawn(Arc::clone(&session), render_tx);
    let printer = tokio::spawn(async move {
        while let Some(table) = render_rx.recv().await {
            println!("{}", table);
        }
    });

    println!("🛡️ Moderated chat simulator is ready!");
    let result = Console::new(Arc::clone(&session), feed.clone())
        .run()
        .await;

    // ========================================================================
    // SHUTDOWN
    // ========================================================================
    session.shutdown();
    history_view.close();

    // Dropping the last feed sender lets the watcher drain and exit
    drop(feed);
    if let Err(e) = watcher.await {
        tracing::warn!("Restoration watcher ended abnormally: {}", e);
    }
    let _ = printer.await;

    tracing::info!("Goodbye 👋");
    result
}
