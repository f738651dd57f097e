use crate::bot::handlers::{handle_text, Command, Coordinator};
use crate::bot::TelegramRelayTransport;
use crate::config::BotSettings;
use anyhow::{anyhow, Context, Result};
use media_relay_core::fetcher::{MediaFetcher, YtDlpFetcher};
use media_relay_core::policy::DeliveryPolicy;
use media_relay_runtime::{CoordinatorConfig, RequestCoordinator};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::{ShutdownToken, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::polling_default;
use teloxide::utils::command::BotCommands;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const SHUTDOWN_ATTEMPTS: usize = 50;

/// Run the Telegram transport runtime until `cancel` fires or polling stops.
///
/// # Errors
///
/// Returns an error if the token is missing or the bot identity cannot be
/// fetched.
pub async fn run_bot(settings: Arc<BotSettings>, cancel: CancellationToken) -> Result<()> {
    let token = settings
        .telegram
        .token()
        .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN is not set"))?;
    let bot = Bot::new(token);

    let me = bot.get_me().await.context("failed to fetch bot identity")?;
    info!("Start listening for @{}", me.username());

    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {e}");
    }

    let coordinator = init_coordinator(&bot, &settings, cancel.clone());
    let handler = setup_handler();

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![coordinator])
        .distribution_function(|_| None::<Infallible>)
        .error_handler(LoggingErrorHandler::with_custom_text(
            "An error has occurred in the dispatcher",
        ))
        .build();

    spawn_shutdown_listener(dispatcher.shutdown_token(), cancel);

    info!("Bot is running...");

    let listener = polling_default(bot).await;
    dispatcher
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("Telegram API Error"),
        )
        .await;

    info!("Dispatcher stopped");
    Ok(())
}

fn init_coordinator(bot: &Bot, settings: &BotSettings, cancel: CancellationToken) -> Arc<Coordinator> {
    let fetcher = YtDlpFetcher::new(&settings.relay);
    info!(
        program = %fetcher.program().display(),
        download_dir = %settings.relay.download_dir.display(),
        "Downloader configured"
    );
    let fetcher: Arc<dyn MediaFetcher> = Arc::new(fetcher);

    let config = CoordinatorConfig {
        cleanup_grace: settings.relay.cleanup_grace(),
        policy: DeliveryPolicy::default(),
    };

    Arc::new(RequestCoordinator::new(
        Arc::new(TelegramRelayTransport::new(bot.clone())),
        fetcher,
        config,
        cancel,
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry().branch(
        Update::filter_message()
            .filter(|msg: Message| msg.text().is_some())
            .endpoint(handle_text),
    )
}

/// Cancel `cancel` and stop the dispatcher on SIGINT or SIGTERM.
fn spawn_shutdown_listener(shutdown: ShutdownToken, cancel: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            () = wait_for_signal() => info!("Shutdown signal received"),
            () = cancel.cancelled() => debug!("Shutdown requested internally"),
        }
        cancel.cancel();

        // The dispatcher may not be running yet if the signal arrives during start-up.
        for _ in 0..SHUTDOWN_ATTEMPTS {
            match shutdown.shutdown() {
                Ok(done) => {
                    done.await;
                    return;
                }
                Err(_) => tokio::time::sleep(Duration::from_millis(100)).await,
            }
        }
        debug!("Dispatcher was idle, nothing to stop");
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {e}");
            wait_for_ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        () = wait_for_ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
