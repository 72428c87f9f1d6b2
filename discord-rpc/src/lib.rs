//! Mirrors live Slippi matches into Discord rich presence.
//!
//! Slippi writes a replay file for every match while it is being played. This
//! crate watches the replay folder, follows whichever file is still growing, and
//! turns its latest frame into a Discord activity: who you're playing, as what,
//! and how many stocks everyone has left. When the file stops changing the
//! activity drops back to "No active game".

pub mod config;
pub mod discord;
pub mod melee;
pub mod reconciler;
pub mod replay;
pub mod selector;
pub mod util;

mod error;
pub use error::PresenceError;

pub(crate) type Result<T> = std::result::Result<T, PresenceError>;

/// Tracing targets for the different parts of the program, so `RUST_LOG` can
/// dial each one up or down independently.
pub struct Log;

#[allow(non_upper_case_globals)]
impl Log {
    pub const Config: &'static str = "slippi_discord_rpc::config";
    pub const Discord: &'static str = "slippi_discord_rpc::discord";
    pub const Identity: &'static str = "slippi_discord_rpc::identity";
    pub const Presence: &'static str = "slippi_discord_rpc::presence";
    pub const Replay: &'static str = "slippi_discord_rpc::replay";
}
