//! Full pipeline over a real folder: a live `.slp` on disk, the filesystem
//! selector, the incremental reader and a recording presence client.

use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use slippi_discord_rpc::PresenceError;
use slippi_discord_rpc::discord::{Presence, PresenceClient, PresenceStyle};
use slippi_discord_rpc::melee::user::ConnectCode;
use slippi_discord_rpc::reconciler::{Reconciler, TickOutcome};
use slippi_discord_rpc::replay::SlpOpener;
use slippi_discord_rpc::selector::{ActiveReplaySelector, DEFAULT_ACTIVE_WINDOW, FsReplayDirectory, SystemClock};

const GAME_START_SIZE: u16 = 0x2A0;
const POST_FRAME_SIZE: u16 = 0x40;
const GAME_END_SIZE: u16 = 0x02;

#[derive(Clone, Default)]
struct RecordingClient(Rc<RefCell<Vec<Presence>>>);

impl PresenceClient for RecordingClient {
    fn update(&mut self, presence: &Presence) -> Result<(), PresenceError> {
        self.0.borrow_mut().push(presence.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PresenceError> {
        Ok(())
    }

    fn close(&mut self) {}
}

fn live_replay_start() -> Vec<u8> {
    // Header with a zero raw length: the console is still writing.
    let mut bytes = b"{U\x03raw[$U#l".to_vec();
    bytes.extend(0u32.to_be_bytes());

    bytes.extend([0x35, 10]);
    for (command, size) in [(0x36u8, GAME_START_SIZE), (0x38, POST_FRAME_SIZE), (0x39, GAME_END_SIZE)] {
        bytes.push(command);
        bytes.extend(size.to_be_bytes());
    }

    let mut start = vec![0u8; 1 + GAME_START_SIZE as usize];
    start[0] = 0x36;
    start[1..4].copy_from_slice(&[3, 16, 0]);
    for port in 0..4 {
        start[0x65 + 0x24 * port + 1] = 3;
    }

    // Port 1: Mango on Captain Falcon. Port 2: no display name, on Falco.
    let players: [(usize, u8, &[u8], &[u8]); 2] = [
        (0, 0x02, b"Mango", &[b'M', b'N', b'G', b'O', 0x81, 0x94, b'1', b'2', b'3']),
        (1, 0x14, b"", &[b'F', b'A', b'L', b'C', 0x81, 0x94, b'9']),
    ];
    for (port, character, name, code) in players {
        start[0x65 + 0x24 * port] = character;
        start[0x65 + 0x24 * port + 1] = 0;

        let name_at = 0x1A5 + 0x1F * port;
        start[name_at..name_at + name.len()].copy_from_slice(name);

        let code_at = 0x221 + 0x0A * port;
        start[code_at..code_at + code.len()].copy_from_slice(code);
    }
    bytes.extend(start);

    bytes
}

fn post_frame(frame: i32, port: u8, character: u8, stocks: u8) -> Vec<u8> {
    let mut bytes = vec![0u8; 1 + POST_FRAME_SIZE as usize];
    bytes[0] = 0x38;
    bytes[1..5].copy_from_slice(&frame.to_be_bytes());
    bytes[5] = port;
    bytes[7] = character;
    bytes[0x21] = stocks;
    bytes
}

fn append(path: &Path, bytes: &[u8]) {
    let mut file = OpenOptions::new().append(true).open(path).expect("open for append");
    file.write_all(bytes).expect("append bytes");
}

fn active_state(outcome: TickOutcome) -> (String, String) {
    match outcome {
        TickOutcome::Emitted(Presence::Active(payload)) => (payload.details, payload.state),
        other => panic!("expected an active presence, got {other:?}"),
    }
}

#[test]
fn follows_a_live_replay_on_disk() {
    let folder = tempfile::tempdir().expect("temp dir");
    let replay = folder.path().join("Game_20231114T221320.slp");

    fs::write(&replay, live_replay_start()).expect("write replay");
    fs::write(folder.path().join("notes.txt"), "not a replay").expect("write decoy");

    let client = RecordingClient::default();
    let selector = ActiveReplaySelector::new(
        FsReplayDirectory::new(folder.path().to_path_buf(), false),
        SystemClock,
        DEFAULT_ACTIVE_WINDOW,
    );
    let mut reconciler = Reconciler::new(
        selector,
        SlpOpener,
        client.clone(),
        ConnectCode::parse("FALC#9"),
        PresenceStyle::default(),
    );

    // Only settings so far.
    assert_eq!(reconciler.tick(), TickOutcome::Incomplete);
    assert_eq!(reconciler.tracked_path(), Some(replay.as_path()));

    append(&replay, &post_frame(-123, 0, 0x02, 4));
    append(&replay, &post_frame(-123, 1, 0x16, 4));
    let (details, state) = active_state(reconciler.tick());
    assert_eq!(details, "vs Mango (Captain Falcon)");
    assert_eq!(state, "Falco: 4 stock(s) | Mango: 4 stock(s)");

    append(&replay, &post_frame(900, 0, 0x02, 3));
    append(&replay, &post_frame(900, 1, 0x16, 4));
    let (_, state) = active_state(reconciler.tick());
    assert_eq!(state, "Falco: 4 stock(s) | Mango: 3 stock(s)");

    match client.0.borrow().last() {
        Some(Presence::Active(payload)) => {
            assert_eq!(payload.small_image.as_deref(), Some("falco"));
            assert_eq!(payload.small_text.as_deref(), Some("Playing as Falco"));
        },
        other => panic!("expected an active presence, got {other:?}"),
    }

    // Falco loses the last stock; the console closes out the file.
    append(&replay, &post_frame(901, 1, 0x16, 0));
    append(&replay, &[0x39, 0x02, 0xFF]);
    append(&replay, b"U\x08metadata{U\x08playedOnSU\x07dolphin}}");

    let (_, state) = active_state(reconciler.tick());
    assert_eq!(state, "Falco: 0 stock(s) | Mango: 3 stock(s)");

    let (_, state) = active_state(reconciler.tick());
    assert_eq!(state, "Falco: 0 stock(s) | Mango: 3 stock(s)");
}

#[test]
fn empty_folder_stays_idle() {
    let folder = tempfile::tempdir().expect("temp dir");
    let selector = ActiveReplaySelector::new(
        FsReplayDirectory::new(folder.path().to_path_buf(), false),
        SystemClock,
        DEFAULT_ACTIVE_WINDOW,
    );
    let mut reconciler = Reconciler::new(
        selector,
        SlpOpener,
        RecordingClient::default(),
        None,
        PresenceStyle::default(),
    );

    assert!(matches!(reconciler.tick(), TickOutcome::Emitted(Presence::Idle(_))));
    assert_eq!(reconciler.tracked_path(), None);
}
