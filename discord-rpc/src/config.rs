use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discord::{PresenceStyle, DEFAULT_CLIENT_ID, DEFAULT_LARGE_IMAGE, DEFAULT_LARGE_TEXT};
use crate::reconciler::DEFAULT_POLL_INTERVAL;
use crate::selector::DEFAULT_ACTIVE_WINDOW;
use crate::util::{default_replay_root, get_appdata_file};
use crate::{Log, Result};

/// Overrides where the config file is read from.
pub const CONFIG_PATH_ENV: &str = "SLIPPI_DISCORD_RPC_CONFIG";

const CONFIG_FILE_SUFFIX: &str = "slippi-discord-rpc/config.toml";

structstruck::strike! {
    /// Core configuration object for this program. Every key is optional in the file.
    #[strikethrough[derive(Clone, Debug, serde::Serialize, serde::Deserialize, PartialEq)]]
    #[strikethrough[serde(default)]]
    pub struct Config {
        pub replays: struct {
            /// Defaults to `<Documents>/Slippi`.
            pub directory: Option<PathBuf>,
            pub monthly_subfolders: bool,
            pub active_window_secs: u64,
        },
        pub polling: struct {
            pub interval_ms: u64,
        },
        pub discord: struct {
            pub client_id: String,
            pub large_image: String,
            pub large_text: String,
            pub show_opponent_name: bool,
            pub show_elapsed_time: bool,
            pub clear_when_idle: bool,
            pub connect_retry_secs: u64,
        },
        pub identity: struct {
            /// Takes precedence over `user.json`.
            pub connect_code: Option<String>,
            pub user_json_path: Option<PathBuf>,
        }
    }
}

impl Default for Replays {
    fn default() -> Self {
        Self {
            directory: None,
            monthly_subfolders: true,
            active_window_secs: DEFAULT_ACTIVE_WINDOW.as_secs(),
        }
    }
}

impl Default for Polling {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Default for Discord {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.into(),
            large_image: DEFAULT_LARGE_IMAGE.into(),
            large_text: DEFAULT_LARGE_TEXT.into(),
            show_opponent_name: true,
            show_elapsed_time: true,
            clear_when_idle: false,
            connect_retry_secs: 2,
        }
    }
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            connect_code: None,
            user_json_path: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            replays: Replays::default(),
            polling: Polling::default(),
            discord: Discord::default(),
            identity: Identity::default(),
        }
    }
}

impl Config {
    /// The env override if set, otherwise `<config dir>/slippi-discord-rpc/config.toml`.
    pub fn path() -> Option<PathBuf> {
        env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .or_else(|| get_appdata_file(CONFIG_FILE_SUFFIX))
    }

    /// Loads the config from its usual location. Never fails; problems are logged
    /// and defaults are used instead.
    pub fn load() -> Self {
        match Self::path() {
            Some(path) => Self::load_from(&path),

            None => {
                tracing::warn!(target: Log::Config, "Unable to locate a config directory, using defaults");
                Self::default()
            },
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    tracing::info!(target: Log::Config, ?path, "Loaded config");
                    config
                },

                Err(error) => {
                    tracing::error!(target: Log::Config, ?path, ?error, "Unable to parse config, using defaults");
                    Self::default()
                },
            },

            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::info!(target: Log::Config, ?path, "No config file, using defaults");
                Self::default()
            },

            Err(error) => {
                tracing::error!(target: Log::Config, ?path, ?error, "Unable to read config, using defaults");
                Self::default()
            },
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn replay_root(&self) -> Option<PathBuf> {
        self.replays.directory.clone().or_else(default_replay_root)
    }

    pub fn active_window(&self) -> Duration {
        Duration::from_secs(self.replays.active_window_secs)
    }

    /// Clamped so a typo can't spin the loop or hammer Discord.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.polling.interval_ms.max(100))
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_secs(self.discord.connect_retry_secs)
    }

    pub fn presence_style(&self) -> PresenceStyle {
        PresenceStyle {
            large_image: self.discord.large_image.clone(),
            large_text: self.discord.large_text.clone(),
            show_opponent_name: self.discord.show_opponent_name,
            show_elapsed_time: self.discord.show_elapsed_time,
        }
    }
}
