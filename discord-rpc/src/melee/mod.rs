//! Turns an open replay into the per-player state we display.

use std::fmt::Display;

use slippi_replay::{Frame, Participant};

use crate::replay::ReplayHandle;
use crate::{Log, Result};

pub mod character;
use character::{name_for, OptionalMeleeCharacter};

pub mod user;

/// Marker shown in place of a stock count we haven't read yet.
pub const UNKNOWN_STOCKS: &str = "?";

/// Remaining stocks. `Stocks(Some(0))` is an eliminated player, `Stocks(None)` is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stocks(pub Option<u8>);

impl Display for Stocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(stocks) => write!(f, "{}", stocks),
            None => write!(f, "{}", UNKNOWN_STOCKS),
        }
    }
}

/// What we know about one player as of the latest frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantState {
    pub port: u8,
    pub display_name: Option<String>,
    pub connect_code: Option<String>,
    pub character: OptionalMeleeCharacter,
    pub stocks: Stocks,
}

impl ParticipantState {
    /// Character comes from the frame rather than the settings so that
    /// transformations are reflected while the match is live.
    fn read(participant: &Participant, frame: &Frame) -> Self {
        let post = frame.player(participant.port);

        Self {
            port: participant.port,
            display_name: participant.display_name.clone(),
            connect_code: participant.connect_code.clone(),
            character: post
                .map(|post| name_for(post.internal_character))
                .unwrap_or(OptionalMeleeCharacter(None)),
            stocks: Stocks(post.and_then(|post| post.stocks_remaining)),
        }
    }

    /// The player's own name if they have one, otherwise their character.
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.character.display_label())
    }
}

/// A 1v1 snapshot. Participants are in settings order (lowest port first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchState {
    pub participants: [ParticipantState; 2],
}

/// Outcome of reading a replay on one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Ready(MatchState),

    /// Settings or frame data isn't on disk yet. Try again next tick.
    Incomplete,
}

/// Pulls any new data from `handle` and derives the current match state.
pub fn extract(handle: &mut dyn ReplayHandle) -> Result<Extraction> {
    handle.refresh()?;

    let (Some(settings), Some(frame)) = (handle.settings(), handle.latest_frame()) else {
        return Ok(Extraction::Incomplete);
    };

    // Only the first two players are considered; anything else isn't a 1v1.
    let [first, second, ..] = settings.participants.as_slice() else {
        tracing::trace!(
            target: Log::Replay,
            participants = settings.participants.len(),
            "Not enough participants to describe a match"
        );
        return Ok(Extraction::Incomplete);
    };

    Ok(Extraction::Ready(MatchState {
        participants: [ParticipantState::read(first, frame), ParticipantState::read(second, frame)],
    }))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use slippi_replay::{Metadata, PlayerKind, PostFrame, Settings};

    use super::*;
    use crate::PresenceError;

    struct StaticReplay {
        path: PathBuf,
        settings: Option<Settings>,
        frame: Option<Frame>,
        fail: bool,
    }

    impl ReplayHandle for StaticReplay {
        fn path(&self) -> &Path {
            &self.path
        }

        fn refresh(&mut self) -> Result<()> {
            match self.fail {
                true => Err(PresenceError::GenericIO(std::io::Error::other("disk went away"))),
                false => Ok(()),
            }
        }

        fn settings(&self) -> Option<&Settings> {
            self.settings.as_ref()
        }

        fn latest_frame(&self) -> Option<&Frame> {
            self.frame.as_ref()
        }

        fn metadata(&self) -> Metadata {
            Metadata::default()
        }
    }

    fn participant(port: u8) -> Participant {
        Participant {
            port,
            character: 0,
            kind: PlayerKind::Human,
            display_name: None,
            connect_code: None,
        }
    }

    fn replay(participants: Vec<Participant>, ports: [Option<PostFrame>; 4]) -> StaticReplay {
        StaticReplay {
            path: PathBuf::from("Game_20240101T000000.slp"),
            settings: Some(Settings {
                participants,
                ..Settings::default()
            }),
            frame: Some(Frame { index: 10, ports }),
            fail: false,
        }
    }

    #[test]
    fn reads_frame_level_character_and_stocks() {
        let sheik = PostFrame {
            internal_character: 0x07,
            stocks_remaining: Some(2),
        };
        let mut handle = replay(vec![participant(0), participant(2)], [Some(sheik), None, None, None]);

        let Ok(Extraction::Ready(state)) = extract(&mut handle) else {
            panic!("expected a ready match state");
        };

        assert_eq!(state.participants[0].character.name(), "sheik");
        assert_eq!(state.participants[0].stocks, Stocks(Some(2)));
        assert_eq!(state.participants[1].port, 2);
        assert_eq!(state.participants[1].stocks, Stocks(None));
        assert_eq!(state.participants[1].character.name(), "unknown");
    }

    #[test]
    fn zero_stocks_is_not_unknown() {
        assert_eq!(Stocks(Some(0)).to_string(), "0");
        assert_eq!(Stocks(None).to_string(), "?");
    }

    #[test]
    fn unmapped_character_is_unknown() {
        let post = PostFrame {
            internal_character: 0x7F,
            stocks_remaining: Some(4),
        };
        let mut handle = replay(vec![participant(0), participant(1)], [Some(post), Some(post), None, None]);

        let Ok(Extraction::Ready(state)) = extract(&mut handle) else {
            panic!("expected a ready match state");
        };
        assert_eq!(state.participants[0].label(), "Unknown");
    }

    #[test]
    fn missing_settings_or_frame_is_incomplete() {
        let mut handle = replay(vec![participant(0), participant(1)], [None; 4]);
        handle.frame = None;
        assert_eq!(extract(&mut handle).ok(), Some(Extraction::Incomplete));

        let mut handle = replay(vec![participant(0), participant(1)], [None; 4]);
        handle.settings = None;
        assert_eq!(extract(&mut handle).ok(), Some(Extraction::Incomplete));

        let mut handle = replay(vec![participant(0)], [None; 4]);
        assert_eq!(extract(&mut handle).ok(), Some(Extraction::Incomplete));
    }

    #[test]
    fn read_failures_surface_as_errors() {
        let mut handle = replay(vec![participant(0), participant(1)], [None; 4]);
        handle.fail = true;
        assert!(extract(&mut handle).is_err());
    }

    #[test]
    fn display_name_wins_over_character() {
        let mut named = participant(0);
        named.display_name = Some("Hbox".into());
        let post = PostFrame {
            internal_character: 0x0F,
            stocks_remaining: Some(1),
        };
        let mut handle = replay(vec![named, participant(1)], [Some(post), Some(post), None, None]);

        let Ok(Extraction::Ready(state)) = extract(&mut handle) else {
            panic!("expected a ready match state");
        };
        assert_eq!(state.participants[0].label(), "Hbox");
        assert_eq!(state.participants[1].label(), "Jigglypuff");
    }
}
