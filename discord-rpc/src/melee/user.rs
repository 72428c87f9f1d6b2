//! Works out which side of a match is the person running this program.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;

use crate::melee::ParticipantState;
use crate::util::get_appdata_file;
use crate::{Log, Result};

/// Where Slippi Launcher keeps the logged in user, relative to the OS config directory.
const USER_JSON_SUFFIX: &str = "Slippi Launcher/netplay/User/Slippi/user.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectCode(String);

impl ConnectCode {
    /// Returns `None` unless `code` looks like `ABCD#123`.
    pub fn parse(code: impl Into<String>) -> Option<Self> {
        let code = Self(code.into());
        code.is_valid().then_some(code)
    }

    pub fn is_valid(&self) -> bool {
        lazy_static! {
            static ref RE: Regex = Regex::new("^([A-Za-z0-9])+#[0-9]{1,6}$").expect("connect code pattern compiles");
        }
        RE.is_match(self.0.as_str())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The slice of `user.json` we need.
#[derive(Debug, Default, serde::Deserialize)]
struct UserFile {
    #[serde(alias = "connectCode", default)]
    connect_code: Option<String>,
}

pub fn default_user_json_path() -> Option<PathBuf> {
    get_appdata_file(USER_JSON_SUFFIX)
}

/// Reads the connect code out of a Slippi Launcher `user.json`.
pub fn read_connect_code(path: &Path) -> Result<Option<ConnectCode>> {
    let contents = fs::read_to_string(path)?;
    let user: UserFile = serde_json::from_str(&contents)?;

    Ok(user.connect_code.and_then(ConnectCode::parse))
}

/// Resolves the local user's identity once at startup. A configured code wins over
/// `user.json`. Every failure here is soft: we log and fall back to port order.
pub fn load_identity(configured: Option<&str>, user_json_path: Option<PathBuf>) -> Option<ConnectCode> {
    if let Some(code) = configured {
        return match ConnectCode::parse(code) {
            Some(code) => {
                tracing::info!(target: Log::Identity, code = code.as_str(), "Using configured connect code");
                Some(code)
            },

            None => {
                tracing::warn!(target: Log::Identity, ?code, "Configured connect code is not valid, ignoring");
                None
            },
        };
    }

    let Some(path) = user_json_path.or_else(default_user_json_path) else {
        tracing::warn!(target: Log::Identity, "Unable to locate the config directory for user.json");
        return None;
    };

    match read_connect_code(&path) {
        Ok(Some(code)) => {
            tracing::info!(target: Log::Identity, code = code.as_str(), "Loaded connect code from user.json");
            Some(code)
        },

        Ok(None) => {
            tracing::warn!(target: Log::Identity, ?path, "user.json has no valid connect code");
            None
        },

        Err(error) => {
            tracing::warn!(target: Log::Identity, ?path, ?error, "Unable to read user.json, assuming port order");
            None
        },
    }
}

/// Indices into a participant list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sides {
    pub local: usize,
    pub remote: usize,
}

impl Sides {
    /// Without an identity we assume the user is listed first. This holds for matches
    /// the user started locally, but is only an approximation for netplay.
    pub const POSITIONAL: Sides = Sides { local: 0, remote: 1 };
}

/// Picks the local side by connect code, falling back to port order unless exactly
/// one participant carries the code.
pub fn resolve(participants: &[ParticipantState], user: Option<&ConnectCode>) -> Sides {
    let Some(code) = user else {
        return Sides::POSITIONAL;
    };

    let mut matching = participants
        .iter()
        .enumerate()
        .filter(|(_, participant)| participant.connect_code.as_deref() == Some(code.as_str()))
        .map(|(index, _)| index);

    let (Some(local), None) = (matching.next(), matching.next()) else {
        return Sides::POSITIONAL;
    };

    match (0..participants.len()).find(|index| *index != local) {
        Some(remote) => Sides { local, remote },
        None => Sides::POSITIONAL,
    }
}
