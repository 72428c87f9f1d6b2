use std::time::Duration;

use discord_rich_presence::{activity, DiscordIpc, DiscordIpcClient};
use tokio_util::sync::CancellationToken;

use crate::melee::user::Sides;
use crate::melee::MatchState;
use crate::{Log, PresenceError, Result};

pub const DEFAULT_CLIENT_ID: &str = "1381760940973756476";
pub const DEFAULT_LARGE_IMAGE: &str = "ssbm";
pub const DEFAULT_LARGE_TEXT: &str = "NTSC v1.02";

pub const IDLE_DETAILS: &str = "No active game";
pub const IDLE_STATE: &str = "Idle";

/// Upper bound for the startup connection backoff.
const MAX_CONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Everything we hand to Discord for one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePayload {
    pub details: String,
    pub state: String,
    pub large_image: String,
    pub large_text: String,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    pub start_timestamp: Option<i64>,

    /// Always `false`; discord-rich-presence leaves the field off, which Discord reads as not instanced.
    pub instance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    Active(PresencePayload),
    Idle(PresencePayload),
}

/// Presentation knobs sourced from the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceStyle {
    pub large_image: String,
    pub large_text: String,
    pub show_opponent_name: bool,
    pub show_elapsed_time: bool,
}

impl Default for PresenceStyle {
    fn default() -> Self {
        Self {
            large_image: DEFAULT_LARGE_IMAGE.into(),
            large_text: DEFAULT_LARGE_TEXT.into(),
            show_opponent_name: true,
            show_elapsed_time: true,
        }
    }
}

/// Builds the in-game payload. Pure: identical inputs give identical payloads.
///
/// `started_at` is when we began tracking the replay, in unix seconds.
pub fn format_presence(state: &MatchState, sides: Sides, started_at: i64, style: &PresenceStyle) -> PresencePayload {
    let local = &state.participants[sides.local];
    let remote = &state.participants[sides.remote];

    let local_label = local.label();
    let local_character = local.character.display_label();
    let remote_character = remote.character.display_label();
    let remote_label = match style.show_opponent_name {
        true => remote.label(),
        false => remote_character.clone(),
    };

    PresencePayload {
        details: format!("vs {} ({})", remote_label, remote_character),
        state: format!(
            "{}: {} stock(s) | {}: {} stock(s)",
            local_label, local.stocks, remote_label, remote.stocks
        ),
        large_image: style.large_image.clone(),
        large_text: style.large_text.clone(),
        small_image: Some(local.character.as_discord_resource()),
        small_text: Some(format!("Playing as {}", local_character)),
        start_timestamp: style.show_elapsed_time.then_some(started_at),
        instance: false,
    }
}

pub fn idle_presence(style: &PresenceStyle) -> PresencePayload {
    PresencePayload {
        details: IDLE_DETAILS.into(),
        state: IDLE_STATE.into(),
        large_image: style.large_image.clone(),
        large_text: style.large_text.clone(),
        small_image: None,
        small_text: None,
        start_timestamp: None,
        instance: false,
    }
}

/// The only thing the presence loop writes to.
pub trait PresenceClient {
    fn update(&mut self, presence: &Presence) -> Result<()>;

    fn clear(&mut self) -> Result<()>;

    fn close(&mut self);
}

fn discord_error(error: Box<dyn std::error::Error>) -> PresenceError {
    PresenceError::Discord(error.to_string())
}

fn build_activity(payload: &PresencePayload) -> activity::Activity<'_> {
    let mut assets = activity::Assets::new()
        .large_image(payload.large_image.as_str())
        .large_text(payload.large_text.as_str());

    if let Some(small_image) = payload.small_image.as_deref() {
        assets = assets.small_image(small_image);
    }

    if let Some(small_text) = payload.small_text.as_deref() {
        assets = assets.small_text(small_text);
    }

    let mut activity = activity::Activity::new()
        .details(payload.details.as_str())
        .state(payload.state.as_str())
        .assets(assets);

    if let Some(start) = payload.start_timestamp {
        activity = activity.timestamps(activity::Timestamps::new().start(start));
    }

    activity
}

/// Discord IPC connection. Identical consecutive updates are only written once.
pub struct DiscordClient {
    client: DiscordIpcClient,
    clear_when_idle: bool,
    last_sent: Option<Presence>,
}

impl DiscordClient {
    pub fn connect(client_id: &str, clear_when_idle: bool) -> Result<Self> {
        let mut client = DiscordIpcClient::new(client_id).map_err(discord_error)?;
        client.connect().map_err(discord_error)?;

        tracing::info!(target: Log::Discord, "Connected to Discord");

        Ok(Self {
            client,
            clear_when_idle,
            last_sent: None,
        })
    }

    fn write(&mut self, presence: &Presence) -> std::result::Result<(), Box<dyn std::error::Error>> {
        match presence {
            Presence::Idle(_) if self.clear_when_idle => self.client.clear_activity(),
            Presence::Active(payload) | Presence::Idle(payload) => self.client.set_activity(build_activity(payload)),
        }
    }
}

impl PresenceClient for DiscordClient {
    /// On a failed write, reconnects once and retries before giving up on this update.
    fn update(&mut self, presence: &Presence) -> Result<()> {
        if self.last_sent.as_ref() == Some(presence) {
            return Ok(());
        }

        if let Err(error) = self.write(presence) {
            tracing::warn!(target: Log::Discord, %error, "Activity update failed, reconnecting");
            self.last_sent = None;
            self.client.reconnect().map_err(discord_error)?;
            self.write(presence).map_err(discord_error)?;
        }

        tracing::debug!(target: Log::Discord, ?presence, "Updated activity");
        self.last_sent = Some(presence.clone());

        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.last_sent = None;
        self.client.clear_activity().map_err(discord_error)
    }

    fn close(&mut self) {
        if let Err(error) = self.client.close() {
            tracing::warn!(target: Log::Discord, %error, "Failed to close Discord connection");
        }
    }
}

/// Keeps trying to reach Discord, backing off from `initial_backoff` up to a minute.
/// Returns `None` only if `stop_signal` fires first.
pub async fn connect_with_retry(
    client_id: &str,
    clear_when_idle: bool,
    initial_backoff: Duration,
    stop_signal: &CancellationToken,
) -> Option<DiscordClient> {
    let mut backoff = initial_backoff.max(Duration::from_secs(1));

    loop {
        match DiscordClient::connect(client_id, clear_when_idle) {
            Ok(client) => return Some(client),

            Err(error) => {
                tracing::error!(
                    target: Log::Discord,
                    ?error,
                    retry_in = backoff.as_secs(),
                    "Unable to connect to Discord"
                );
            },
        }

        tokio::select! {
            _ = stop_signal.cancelled() => return None,
            _ = tokio::time::sleep(backoff) => {},
        }

        backoff = (backoff * 2).min(MAX_CONNECT_BACKOFF);
    }
}
