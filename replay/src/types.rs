use num_enum::TryFromPrimitive;

/// Number of controller ports a replay can describe.
pub const PORT_COUNT: usize = 4;

/// The Slippi version that recorded a replay (major, minor, build).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u8, pub u8, pub u8);

impl Version {
    pub fn at_least(&self, major: u8, minor: u8, build: u8) -> bool {
        *self >= Version(major, minor, build)
    }
}

/// Who is sitting at a port.
// reference: https://github.com/project-slippi/slippi-wiki/blob/master/SPEC.md#game-start
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum PlayerKind {
    Human = 0,
    Cpu = 1,
    Demo = 2,
    Empty = 3,
}

/// One occupied port as declared by the Game Start event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    /// Zero-based controller port. Stable for the whole match.
    pub port: u8,

    /// External (character select screen) character id. This does not follow
    /// transformations, so prefer the post-frame id for anything shown live.
    pub character: u8,

    pub kind: PlayerKind,

    /// Netplay display name. Only recorded by 3.9.0+ and blank offline.
    pub display_name: Option<String>,

    /// Netplay connect code, e.g. `ABCD#123`. Only recorded by 3.9.0+.
    pub connect_code: Option<String>,
}

/// Match settings. Immutable once the Game Start event has been read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    pub version: Version,
    pub stage: Option<u16>,
    pub participants: Vec<Participant>,
}

/// The parts of a Post-Frame Update we care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostFrame {
    /// In-engine character id. Differs from the external id for Sheik/Zelda swaps etc.
    pub internal_character: u8,

    /// `None` when the recording version predates the field.
    pub stocks_remaining: Option<u8>,
}

/// The most recent simulation snapshot seen in the stream.
///
/// Ports are updated independently, so a port holds the newest post-state
/// recorded for it even if the frame at `index` has not reached it yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub index: i32,
    pub ports: [Option<PostFrame>; PORT_COUNT],
}

impl Frame {
    pub(crate) fn new(index: i32) -> Self {
        Self {
            index,
            ports: [None; PORT_COUNT],
        }
    }

    /// Returns the post-state for `port`, if one has been recorded.
    pub fn player(&self, port: u8) -> Option<&PostFrame> {
        self.ports.get(port as usize).and_then(Option::as_ref)
    }
}

/// Stream-level facts gathered while reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Metadata {
    pub game_ended: bool,
}
