//! The seam between the presence loop and replay decoding. The loop only ever
//! talks to these traits so tests can substitute scripted replays.

use std::path::Path;

use slippi_replay::{Frame, Metadata, Replay, Settings};

use crate::Result;

/// An open replay that can be polled for new data.
pub trait ReplayHandle {
    fn path(&self) -> &Path;

    /// Picks up anything written since the last call.
    fn refresh(&mut self) -> Result<()>;

    fn settings(&self) -> Option<&Settings>;

    fn latest_frame(&self) -> Option<&Frame>;

    fn metadata(&self) -> Metadata;
}

/// Opens replay handles for paths chosen by the selector.
pub trait ReplayOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ReplayHandle>>;
}

impl ReplayHandle for Replay {
    fn path(&self) -> &Path {
        Replay::path(self)
    }

    fn refresh(&mut self) -> Result<()> {
        Ok(Replay::refresh(self)?)
    }

    fn settings(&self) -> Option<&Settings> {
        Replay::settings(self)
    }

    fn latest_frame(&self) -> Option<&Frame> {
        Replay::latest_frame(self)
    }

    fn metadata(&self) -> Metadata {
        *Replay::metadata(self)
    }
}

/// Opens `.slp` files from disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlpOpener;

impl ReplayOpener for SlpOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn ReplayHandle>> {
        Ok(Box::new(Replay::open(path)?))
    }
}
