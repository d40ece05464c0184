use std::sync::Arc;
use std::time::Duration;
use dotenv::dotenv;
use teloxide::prelude::*;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

use groupscribe::api::init_router;
use groupscribe::bot::schema;
use groupscribe::core::{AppConfig, AppState};
use groupscribe::database::{apply_schema, init_pg_pool, ChatLogDatabase, JoinRequestDatabase, StatsDatabase};
use groupscribe::moderation::{
    run_periodic_cleanup, CleanerSettings, JoinRequestCleaner, TelegramModerator,
};
use groupscribe::services::OpenRouterClient;

/// How long shutdown waits for an in-flight cleanup pass before the process
/// exits anyway; unfinished requests stay pending and are retried next start.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    dotenv().ok();

    let config = AppConfig::new().unwrap_or_else(|err| panic!("Missing needed env: {}", err));
    init_logging(&config.log_level);
    info!("Starting groupscribe...");

    let pool = init_pg_pool(&config.database_url).await;
    if config.db_init {
        if let Err(err) = apply_schema(&pool).await {
            error!("Failed to apply database schema: {err}");
            std::process::exit(1);
        }
    }

    let bot = Bot::new(config.telegram_token.clone());
    let join_requests = JoinRequestDatabase::new(pool.clone());

    let cleaner = config.moderated_chat_id.map(|chat_id| {
        Arc::new(JoinRequestCleaner::new(
            Arc::new(join_requests.clone()),
            Arc::new(TelegramModerator::new(bot.clone())),
            CleanerSettings {
                chat_id,
                fresh_account_threshold: config.fresh_account_id_threshold,
                batch_limit: config.join_request_clean_batch_limit,
                log_path: config.declined_requests_log_path.clone().into(),
            },
        ))
    });

    let summarizer = config
        .openrouter_api_key
        .clone()
        .filter(|key| !key.is_empty())
        .map(|key| OpenRouterClient::new(key, config.openrouter_model.clone()));

    let state = Arc::new(AppState {
        env: config.clone(),
        chat_log: ChatLogDatabase::new(pool.clone()),
        join_requests,
        stats: StatsDatabase::new(pool),
        summarizer,
        cleaner: cleaner.clone(),
    });

    let shutdown = CancellationToken::new();

    let app = init_router(state.clone());
    let address = format!("0.0.0.0:{}", config.http_port);
    let listener = match TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("Failed to bind {address}: {err}");
            std::process::exit(1);
        }
    };
    info!("Admin API is listening on: {address}");
    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            error!("Admin API server error: {err}");
        }
    });

    let cleanup = match cleaner {
        Some(cleaner) => {
            let interval = Duration::from_secs(config.join_request_clean_interval_sec);
            Some(tokio::spawn(run_periodic_cleanup(cleaner, interval, shutdown.clone())))
        }
        None => {
            warn!("MODERATED_CHAT_ID is not set; join request cleanup is disabled");
            None
        }
    };

    info!("Bot is running...");
    info!("Make sure Privacy Mode is disabled in @BotFather for this bot");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .default_handler(|update| async move {
            debug!("Ignoring update {:?}", update.id);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Stopping groupscribe...");
    shutdown.cancel();
    if let Some(handle) = cleanup {
        if tokio::time::timeout(SHUTDOWN_GRACE, handle).await.is_err() {
            warn!("Cleanup pass did not finish within {SHUTDOWN_GRACE:?}; exiting anyway");
        }
    }
    let _ = tokio::time::timeout(SHUTDOWN_GRACE, server).await;
    info!("Stopped.");
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
