//! An incremental reader for Slippi `.slp` replays.
//!
//! Dolphin appends to a replay for the whole length of a match, so this reader
//! never expects a complete file: each call to [`Replay::refresh`] picks up the
//! bytes written since the last call, applies every complete event, and holds
//! on to a trailing partial event until more data shows up.
//!
//! Only the events needed to describe a live match are decoded. Everything else
//! is skipped using the sizes announced in the Event Payloads table.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

mod errors;
pub use errors::ReplayError;

mod parser;

mod types;
pub use types::{Frame, Metadata, Participant, PlayerKind, PostFrame, Settings, Version, PORT_COUNT};

pub(crate) type Result<T> = std::result::Result<T, ReplayError>;

/// UBJSON prefix for the `raw` element, followed by a big-endian u32 length.
const RAW_HEADER: &[u8] = b"{U\x03raw[$U#l";
const HEADER_LEN: usize = RAW_HEADER.len() + 4;

/// An open replay file plus everything decoded from it so far.
#[derive(Debug)]
pub struct Replay {
    path: PathBuf,
    file: File,
    read_position: u64,
    pending: Vec<u8>,
    header_read: bool,
    stream_offset: u64,
    stream_remaining: Option<u64>,
    payload_sizes: Option<HashMap<u8, u16>>,
    settings: Option<Settings>,
    latest_frame: Option<Frame>,
    metadata: Metadata,
}

impl Replay {
    /// Opens `path` for reading. No events are decoded until `refresh` is called.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::open(&path)?;

        Ok(Self {
            path,
            file,
            read_position: 0,
            pending: Vec::new(),
            header_read: false,
            stream_offset: 0,
            stream_remaining: None,
            payload_sizes: None,
            settings: None,
            latest_frame: None,
            metadata: Metadata::default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Match settings, once the Game Start event has been written.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// The newest post-frame state per port, once any frame has been written.
    pub fn latest_frame(&self) -> Option<&Frame> {
        self.latest_frame.as_ref()
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Reads anything appended since the previous call and applies all complete events.
    ///
    /// Events before a bad byte stay applied; the next call resumes at that byte.
    pub fn refresh(&mut self) -> Result<()> {
        if self.is_finished() {
            return Ok(());
        }

        self.file.seek(SeekFrom::Start(self.read_position))?;
        let read = self.file.read_to_end(&mut self.pending)?;
        self.read_position += read as u64;

        if !self.header_read && !self.read_header()? {
            return Ok(());
        }

        let pending = std::mem::take(&mut self.pending);
        let (consumed, result) = self.apply_events(&pending);

        // Whatever follows the last event is the metadata element, which we don't decode.
        if !self.is_finished() {
            self.pending = pending[consumed..].to_vec();
        }

        result
    }

    /// Dolphin only fills in the raw length once the match is over, so a file opened
    /// mid-match learns it has finished from Game End rather than from the header.
    fn is_finished(&self) -> bool {
        self.metadata.game_ended || self.stream_remaining == Some(0)
    }

    /// Returns `false` if not enough of the file exists yet to read the header.
    fn read_header(&mut self) -> Result<bool> {
        if self.pending.len() < HEADER_LEN {
            return Ok(false);
        }

        if !self.pending.starts_with(RAW_HEADER) {
            return Err(ReplayError::InvalidHeader);
        }

        let mut length = [0u8; 4];
        length.copy_from_slice(&self.pending[RAW_HEADER.len()..HEADER_LEN]);

        // Dolphin leaves the length at zero until the match is over.
        self.stream_remaining = match u32::from_be_bytes(length) {
            0 => None,
            length => Some(length as u64),
        };

        self.pending.drain(..HEADER_LEN);
        self.header_read = true;

        Ok(true)
    }

    /// Applies every complete event in `buffer`. Returns how many bytes were consumed
    /// alongside the error that stopped decoding, if any.
    fn apply_events(&mut self, buffer: &[u8]) -> (usize, Result<()>) {
        let available = match self.stream_remaining {
            Some(remaining) => buffer.len().min(usize::try_from(remaining).unwrap_or(usize::MAX)),
            None => buffer.len(),
        };

        let mut cursor = 0;
        let mut result = Ok(());

        while let Some(&command) = buffer[..available].get(cursor) {
            let size = match self.event_size(&buffer[..available], cursor) {
                Ok(Some(size)) => size,
                Ok(None) => break,
                Err(error) => {
                    result = Err(error);
                    break;
                },
            };

            let end = cursor + 1 + size;
            if end > available {
                break;
            }

            self.apply_event(command, &buffer[cursor..end]);
            cursor = end;

            if command == parser::GAME_END {
                break;
            }
        }

        self.stream_offset += cursor as u64;
        if let Some(remaining) = self.stream_remaining.as_mut() {
            *remaining -= cursor as u64;
        }

        (cursor, result)
    }

    /// Payload size of the event starting at `buffer[cursor]`, or `None` if its size
    /// byte hasn't been written yet.
    fn event_size(&self, buffer: &[u8], cursor: usize) -> Result<Option<usize>> {
        let command = buffer[cursor];

        if command == parser::EVENT_PAYLOADS {
            return Ok(buffer.get(cursor + 1).map(|size| *size as usize));
        }

        let sizes = self
            .payload_sizes
            .as_ref()
            .ok_or(ReplayError::MissingEventPayloads { command })?;

        match sizes.get(&command) {
            Some(size) => Ok(Some(*size as usize)),
            None => Err(ReplayError::UnknownEvent {
                command,
                offset: self.stream_offset + cursor as u64,
            }),
        }
    }

    fn apply_event(&mut self, command: u8, event: &[u8]) {
        match command {
            parser::EVENT_PAYLOADS => {
                self.payload_sizes = Some(parser::payload_sizes(event));
            },

            parser::GAME_START => {
                let settings = parser::game_start(event);
                tracing::debug!(
                    path = ?self.path,
                    version = ?settings.version,
                    stage = ?settings.stage,
                    participants = settings.participants.len(),
                    "Read game start"
                );
                self.settings = Some(settings);
            },

            parser::POST_FRAME => {
                if let Some(update) = parser::post_frame(event) {
                    update.apply(&mut self.latest_frame);
                }
            },

            parser::GAME_END => {
                tracing::debug!(path = ?self.path, "Read game end");
                self.metadata.game_ended = true;
            },

            _ => {},
        }
    }
}
