//! Decoders for the handful of events the presence loop consumes. Offsets are
//! relative to the command byte, matching the documented Slippi replay format:
//! https://github.com/project-slippi/slippi-wiki/blob/master/SPEC.md

use std::collections::HashMap;

use encoding_rs::SHIFT_JIS;

use crate::types::{Frame, Participant, PlayerKind, PostFrame, Settings, Version, PORT_COUNT};

pub(crate) const EVENT_PAYLOADS: u8 = 0x35;
pub(crate) const GAME_START: u8 = 0x36;
pub(crate) const POST_FRAME: u8 = 0x38;
pub(crate) const GAME_END: u8 = 0x39;

const GAME_START_VERSION: usize = 0x01;
const GAME_START_STAGE: usize = 0x13;
const GAME_START_PLAYER_BLOCK: usize = 0x65;
const PLAYER_BLOCK_LEN: usize = 0x24;
const PLAYER_BLOCK_KIND: usize = 0x01;
const GAME_START_DISPLAY_NAME: usize = 0x1A5;
const DISPLAY_NAME_LEN: usize = 0x1F;
const GAME_START_CONNECT_CODE: usize = 0x221;
const CONNECT_CODE_LEN: usize = 0x0A;

const POST_FRAME_INDEX: usize = 0x01;
const POST_FRAME_PORT: usize = 0x05;
const POST_FRAME_IS_FOLLOWER: usize = 0x06;
const POST_FRAME_INTERNAL_CHARACTER: usize = 0x07;
const POST_FRAME_STOCKS: usize = 0x21;

/// A decoded Post-Frame Update for a leader character.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct PostFrameUpdate {
    pub frame: i32,
    pub port: u8,
    pub post: PostFrame,
}

impl PostFrameUpdate {
    /// Folds this update into the running latest frame.
    pub fn apply(self, latest: &mut Option<Frame>) {
        let frame = latest.get_or_insert_with(|| Frame::new(self.frame));
        frame.index = frame.index.max(self.frame);
        frame.ports[self.port as usize] = Some(self.post);
    }
}

/// Reads the Event Payloads table: repeated `(command, u16 size)` triples after the size byte.
pub(crate) fn payload_sizes(event: &[u8]) -> HashMap<u8, u16> {
    event
        .get(2..)
        .unwrap_or_default()
        .chunks_exact(3)
        .map(|chunk| (chunk[0], u16::from_be_bytes([chunk[1], chunk[2]])))
        .collect()
}

pub(crate) fn game_start(event: &[u8]) -> Settings {
    let version = match event.get(GAME_START_VERSION..GAME_START_VERSION + 3) {
        Some(&[major, minor, build]) => Version(major, minor, build),
        _ => Version::default(),
    };

    let stage = read_u16(event, GAME_START_STAGE);
    let has_netplay_identity = version.at_least(3, 9, 0);

    let participants = (0..PORT_COUNT)
        .filter_map(|port| {
            let block = GAME_START_PLAYER_BLOCK + PLAYER_BLOCK_LEN * port;
            let character = *event.get(block)?;
            let kind = event
                .get(block + PLAYER_BLOCK_KIND)
                .and_then(|kind| PlayerKind::try_from(*kind).ok())
                .unwrap_or(PlayerKind::Empty);

            if kind == PlayerKind::Empty {
                return None;
            }

            let (display_name, connect_code) = match has_netplay_identity {
                true => (
                    read_text(event, GAME_START_DISPLAY_NAME + DISPLAY_NAME_LEN * port, DISPLAY_NAME_LEN),
                    read_text(event, GAME_START_CONNECT_CODE + CONNECT_CODE_LEN * port, CONNECT_CODE_LEN),
                ),
                false => (None, None),
            };

            Some(Participant {
                port: port as u8,
                character,
                kind,
                display_name,
                connect_code,
            })
        })
        .collect();

    Settings {
        version,
        stage,
        participants,
    }
}

/// Returns `None` for follower updates (Nana) and for truncated events.
pub(crate) fn post_frame(event: &[u8]) -> Option<PostFrameUpdate> {
    if event.get(POST_FRAME_IS_FOLLOWER).copied().unwrap_or(0) != 0 {
        return None;
    }

    let frame = read_i32(event, POST_FRAME_INDEX)?;
    let port = *event.get(POST_FRAME_PORT)?;
    if port as usize >= PORT_COUNT {
        return None;
    }

    Some(PostFrameUpdate {
        frame,
        port,
        post: PostFrame {
            internal_character: *event.get(POST_FRAME_INTERNAL_CHARACTER)?,
            stocks_remaining: event.get(POST_FRAME_STOCKS).copied(),
        },
    })
}

fn read_u16(event: &[u8], offset: usize) -> Option<u16> {
    match event.get(offset..offset + 2)? {
        &[a, b] => Some(u16::from_be_bytes([a, b])),
        _ => None,
    }
}

fn read_i32(event: &[u8], offset: usize) -> Option<i32> {
    match event.get(offset..offset + 4)? {
        &[a, b, c, d] => Some(i32::from_be_bytes([a, b, c, d])),
        _ => None,
    }
}

/// Decodes a NUL-terminated Shift-JIS field. Blank fields come back as `None`.
fn read_text(event: &[u8], offset: usize, len: usize) -> Option<String> {
    let raw = event.get(offset..offset + len)?;
    let end = raw.iter().position(|byte| *byte == 0).unwrap_or(raw.len());
    let (decoded, _) = SHIFT_JIS.decode_without_bom_handling(&raw[..end]);
    let text = to_halfwidth(&decoded);
    let text = text.trim();

    match text.is_empty() {
        true => None,
        false => Some(text.to_string()),
    }
}

/// Melee stores tags with full-width glyphs (`ＡＢＣ＃１２３`), fold them back to ASCII.
pub(crate) fn to_halfwidth(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            '\u{3000}' => ' ',
            _ => c,
        })
        .collect()
}
