//! Decides which replay, if any, belongs to a match that is still being played.
//!
//! Replays are never deleted when a match ends, so "live" is inferred from how
//! recently the newest replay was written to. Once it goes quiet for longer than
//! the active window, there is no active match.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::Log;
use crate::util::month_folder;

/// Replay files are recognised by extension alone.
pub const REPLAY_EXTENSION: &str = "slp";

/// How stale the newest replay may be before we consider the match over. Dolphin
/// writes every frame, so this tolerates several missed polls.
pub const DEFAULT_ACTIVE_WINDOW: Duration = Duration::from_secs(10);

/// A directory entry and when it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Anything that can list candidate replay files.
pub trait ReplayDirectory {
    fn list(&self) -> io::Result<Vec<ReplayEntry>>;
}

pub trait Clock {
    fn now(&self) -> SystemTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// What the presence loop asks every tick.
pub trait ReplaySelector {
    fn select_active(&self) -> Option<PathBuf>;
}

fn is_replay_file(path: &Path) -> bool {
    path.extension().is_some_and(|extension| extension == REPLAY_EXTENSION)
}

/// Returns the newest replay in `entries`, provided it was modified within `window` of `now`.
///
/// Ties on modification time go to the greater file name; Slippi names replays by
/// start time, so that is also the later match.
pub fn select_active(entries: &[ReplayEntry], now: SystemTime, window: Duration) -> Option<PathBuf> {
    let newest = entries
        .iter()
        .filter(|entry| is_replay_file(&entry.path))
        .max_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.path.file_name().cmp(&b.path.file_name()))
        })?;

    // A timestamp slightly in the future (clock skew, network drives) counts as fresh.
    let age = now.duration_since(newest.modified).unwrap_or(Duration::ZERO);

    (age <= window).then(|| newest.path.clone())
}

/// Lists the Slippi replay folder on disk.
#[derive(Clone, Debug)]
pub struct FsReplayDirectory {
    root: PathBuf,
    monthly_subfolders: bool,
}

impl FsReplayDirectory {
    /// With `monthly_subfolders`, replays are looked for in `root/YYYY-MM`, recomputed
    /// on every listing so the folder follows the calendar.
    pub fn new(root: PathBuf, monthly_subfolders: bool) -> Self {
        Self {
            root,
            monthly_subfolders,
        }
    }

    pub fn current_dir(&self) -> PathBuf {
        match self.monthly_subfolders {
            true => self.root.join(month_folder(chrono::Local::now())),
            false => self.root.clone(),
        }
    }
}

impl ReplayDirectory for FsReplayDirectory {
    /// A missing directory lists as empty; Slippi only creates it on the first game of the month.
    fn list(&self) -> io::Result<Vec<ReplayEntry>> {
        let dir = self.current_dir();

        let read_dir = match fs::read_dir(&dir) {
            Ok(read_dir) => read_dir,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(error),
        };

        let mut entries = Vec::new();

        for entry in read_dir {
            let entry = entry?;

            // Files can vanish between listing and stat; just skip those.
            let Ok(metadata) = entry.metadata() else {
                continue;
            };

            if !metadata.is_file() {
                continue;
            }

            if let Ok(modified) = metadata.modified() {
                entries.push(ReplayEntry {
                    path: entry.path(),
                    modified,
                });
            }
        }

        Ok(entries)
    }
}

/// Combines a directory listing and a clock into the per-tick answer.
#[derive(Debug)]
pub struct ActiveReplaySelector<D, C> {
    directory: D,
    clock: C,
    window: Duration,
}

impl<D, C> ActiveReplaySelector<D, C>
where
    D: ReplayDirectory,
    C: Clock,
{
    pub fn new(directory: D, clock: C, window: Duration) -> Self {
        Self {
            directory,
            clock,
            window,
        }
    }
}

impl<D, C> ReplaySelector for ActiveReplaySelector<D, C>
where
    D: ReplayDirectory,
    C: Clock,
{
    fn select_active(&self) -> Option<PathBuf> {
        match self.directory.list() {
            Ok(entries) => select_active(&entries, self.clock.now(), self.window),

            Err(error) => {
                tracing::warn!(target: Log::Replay, ?error, "Unable to list replay directory");
                None
            },
        }
    }
}
