//#![windows_subsystem = "windows"]

use std::process::ExitCode;

use single_instance::SingleInstance;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use slippi_discord_rpc::config::Config;
use slippi_discord_rpc::discord::connect_with_retry;
use slippi_discord_rpc::melee::user::load_identity;
use slippi_discord_rpc::reconciler::Reconciler;
use slippi_discord_rpc::replay::SlpOpener;
use slippi_discord_rpc::selector::{ActiveReplaySelector, FsReplayDirectory, SystemClock};
use slippi_discord_rpc::{Log, PresenceError};

const INSTANCE_NAME: &str = "SLIPPI_DISCORD_RICH_PRESENCE_MTX";

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn acquire_instance() -> Result<SingleInstance, PresenceError> {
    SingleInstance::new(INSTANCE_NAME).map_err(|error| PresenceError::SingleInstance(error.to_string()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();

    // Held for the life of the process.
    let instance = match acquire_instance() {
        Ok(instance) => instance,
        Err(error) => {
            tracing::error!(?error, "Unable to start");
            return ExitCode::FAILURE;
        },
    };

    if !instance.is_single() {
        tracing::error!("Another instance is already running");
        return ExitCode::FAILURE;
    }

    let config = Config::load();
    let user = load_identity(
        config.identity.connect_code.as_deref(),
        config.identity.user_json_path.clone(),
    );

    let Some(replay_root) = config.replay_root() else {
        tracing::error!(target: Log::Config, "Unable to locate the Documents folder; set replays.directory");
        return ExitCode::FAILURE;
    };

    tracing::info!(target: Log::Config, ?replay_root, "Replay folder");

    let stop_signal = CancellationToken::new();
    {
        let stop_signal = stop_signal.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received shutdown signal");
                    stop_signal.cancel();
                },

                Err(error) => tracing::error!(?error, "Unable to listen for shutdown signal"),
            }
        });
    }

    tracing::info!(target: Log::Discord, "Attempting to connect to Discord...");

    let Some(client) = connect_with_retry(
        &config.discord.client_id,
        config.discord.clear_when_idle,
        config.connect_backoff(),
        &stop_signal,
    )
    .await
    else {
        return ExitCode::SUCCESS;
    };

    let selector = ActiveReplaySelector::new(
        FsReplayDirectory::new(replay_root, config.replays.monthly_subfolders),
        SystemClock,
        config.active_window(),
    );

    Reconciler::new(selector, SlpOpener, client, user, config.presence_style())
        .run(config.poll_interval(), stop_signal)
        .await;

    ExitCode::SUCCESS
}
