//! The polling loop that keeps Discord in sync with whatever match is live.
//!
//! Each tick asks the selector for the active replay, (re)opens it if the path
//! changed, reads the latest frame and pushes a presence update. Nothing that
//! happens inside a tick escapes it: failures are logged and the next tick
//! simply tries again.

use std::path::Path;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::discord::{format_presence, idle_presence, Presence, PresenceClient, PresencePayload, PresenceStyle};
use crate::melee::user::{resolve, ConnectCode};
use crate::melee::{extract, Extraction};
use crate::replay::{ReplayHandle, ReplayOpener};
use crate::selector::ReplaySelector;
use crate::util::current_unix_time;
use crate::{Log, Result};

/// Default poll cadence. Discord rate limits activity updates, so don't go much lower.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// The replay currently being followed.
pub struct TrackedReplay {
    handle: Box<dyn ReplayHandle>,
    started_at: i64,
    reported_end: bool,
}

impl TrackedReplay {
    fn new(handle: Box<dyn ReplayHandle>) -> Self {
        Self {
            handle,
            started_at: current_unix_time(),
            reported_end: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Re-reads the replay and formats a payload, or `None` if it isn't readable yet.
    fn observe(&mut self, user: Option<&ConnectCode>, style: &PresenceStyle) -> Result<Option<PresencePayload>> {
        let state = match extract(self.handle.as_mut())? {
            Extraction::Ready(state) => state,
            Extraction::Incomplete => return Ok(None),
        };

        if !self.reported_end && self.handle.metadata().game_ended {
            let last_frame = self.handle.latest_frame().map(|frame| frame.index);
            tracing::info!(
                target: Log::Replay,
                path = ?self.path(),
                ?last_frame,
                "Match ended, waiting for the replay to go stale"
            );
            self.reported_end = true;
        }

        let sides = resolve(&state.participants, user);

        Ok(Some(format_presence(&state, sides, self.started_at, style)))
    }
}

pub enum ReconcilerState {
    Idle,
    Tracking(TrackedReplay),
}

/// What a single tick did. Mostly useful for tests and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Emitted(Presence),

    /// The tracked replay had nothing to show yet.
    Incomplete,

    /// Opening or reading the replay failed; already logged.
    Failed,
}

pub struct Reconciler<S, O, P> {
    selector: S,
    opener: O,
    client: P,
    user: Option<ConnectCode>,
    style: PresenceStyle,
    state: ReconcilerState,
}

impl<S, O, P> Reconciler<S, O, P>
where
    S: ReplaySelector,
    O: ReplayOpener,
    P: PresenceClient,
{
    pub fn new(selector: S, opener: O, client: P, user: Option<ConnectCode>, style: PresenceStyle) -> Self {
        Self {
            selector,
            opener,
            client,
            user,
            style,
            state: ReconcilerState::Idle,
        }
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn tracked_path(&self) -> Option<&Path> {
        match &self.state {
            ReconcilerState::Tracking(tracked) => Some(tracked.path()),
            ReconcilerState::Idle => None,
        }
    }

    /// Runs one poll. Never fails; see [`TickOutcome`].
    pub fn tick(&mut self) -> TickOutcome {
        let Some(path) = self.selector.select_active() else {
            return self.go_idle();
        };

        let mut tracked = match std::mem::replace(&mut self.state, ReconcilerState::Idle) {
            ReconcilerState::Tracking(tracked) if tracked.path() == path => tracked,

            _ => {
                tracing::info!(target: Log::Replay, ?path, "New replay detected");

                match self.opener.open(&path) {
                    Ok(handle) => TrackedReplay::new(handle),

                    // Whatever was shown belongs to a replay we no longer follow.
                    Err(error) => {
                        tracing::warn!(target: Log::Replay, ?path, ?error, "Unable to open replay");
                        self.emit(&Presence::Idle(idle_presence(&self.style)));
                        return TickOutcome::Failed;
                    },
                }
            },
        };

        let observed = tracked.observe(self.user.as_ref(), &self.style);
        self.state = ReconcilerState::Tracking(tracked);

        match observed {
            Ok(Some(payload)) => {
                let presence = Presence::Active(payload);
                self.emit(&presence);
                TickOutcome::Emitted(presence)
            },

            Ok(None) => {
                tracing::trace!(target: Log::Replay, ?path, "Replay not ready yet");
                TickOutcome::Incomplete
            },

            Err(error) => {
                tracing::warn!(target: Log::Replay, ?path, ?error, "Unable to read replay this tick");
                TickOutcome::Failed
            },
        }
    }

    /// Idle is re-sent every tick; the Discord client drops repeats before they hit IPC.
    fn go_idle(&mut self) -> TickOutcome {
        if let ReconcilerState::Tracking(tracked) = &self.state {
            tracing::info!(target: Log::Presence, path = ?tracked.path(), "Replay went stale, no active game");
        }

        self.state = ReconcilerState::Idle;

        let presence = Presence::Idle(idle_presence(&self.style));
        self.emit(&presence);
        TickOutcome::Emitted(presence)
    }

    fn emit(&mut self, presence: &Presence) {
        if let Err(error) = self.client.update(presence) {
            tracing::warn!(target: Log::Presence, ?error, "Unable to update presence");
        }
    }

    /// Ticks on a fixed interval until `stop_signal` fires, then clears the activity.
    /// A tick that overruns causes missed ticks to be skipped rather than queued.
    pub async fn run(mut self, interval: Duration, stop_signal: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(target: Log::Presence, interval_ms = interval.as_millis() as u64, "Watching for replays");

        loop {
            tokio::select! {
                _ = stop_signal.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick();
                },
            }
        }

        tracing::info!(target: Log::Presence, "Shutting down presence loop");

        if let Err(error) = self.client.clear() {
            tracing::warn!(target: Log::Presence, ?error, "Unable to clear presence on shutdown");
        }

        self.client.close();
    }
}
