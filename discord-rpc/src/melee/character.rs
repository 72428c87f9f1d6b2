use std::fmt::Display;

use num_enum::TryFromPrimitive;
use strum_macros::{EnumIter, IntoStaticStr};

/// Canonical name reported for ids with no mapping entry.
pub const UNKNOWN_CHARACTER: &str = "unknown";

/// In-engine character ids, as written into post-frame updates. These are not
/// the character select screen ids; transformations (Sheik/Zelda) show up here.
// reference: https://github.com/project-slippi/slippi-wiki/blob/master/SPEC.md#melee-ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum MeleeCharacter {
    Mario = 0x00,
    Fox = 0x01,
    CaptainFalcon = 0x02,
    DonkeyKong = 0x03,
    Kirby = 0x04,
    Bowser = 0x05,
    Link = 0x06,
    Sheik = 0x07,
    Ness = 0x08,
    Peach = 0x09,
    Popo = 0x0A,
    Nana = 0x0B,
    Pikachu = 0x0C,
    Samus = 0x0D,
    Yoshi = 0x0E,
    Jigglypuff = 0x0F,
    Mewtwo = 0x10,
    Luigi = 0x11,
    Marth = 0x12,
    Zelda = 0x13,
    YoungLink = 0x14,
    DrMario = 0x15,
    Falco = 0x16,
    Pichu = 0x17,
    MrGameAndWatch = 0x18,
    Ganondorf = 0x19,
    Roy = 0x1A,
    MasterHand = 0x1B,
    CrazyHand = 0x1C,
    WireFrameMale = 0x1D,
    WireFrameFemale = 0x1E,
    GigaBowser = 0x1F,
    Sandbag = 0x20,
}

impl MeleeCharacter {
    /// Lowercase, underscore separated name, e.g. `captain_falcon`.
    pub fn canonical_name(self) -> &'static str {
        self.into()
    }
}

/// Looks up an internal id. Never fails: unmapped ids come back as unknown.
pub fn name_for(internal_id: u8) -> OptionalMeleeCharacter {
    OptionalMeleeCharacter(MeleeCharacter::try_from(internal_id).ok())
}

/// `captain_falcon` -> `Captain Falcon`.
pub fn display_label(name: &str) -> String {
    name.split('_').map(capitalize).collect::<Vec<_>>().join(" ")
}

/// Key used for the character images uploaded to the Discord application.
pub fn asset_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct OptionalMeleeCharacter(pub Option<MeleeCharacter>);

impl OptionalMeleeCharacter {
    pub fn name(&self) -> &'static str {
        self.0.map(MeleeCharacter::canonical_name).unwrap_or(UNKNOWN_CHARACTER)
    }

    pub fn display_label(&self) -> String {
        display_label(self.name())
    }

    pub fn as_discord_resource(&self) -> String {
        asset_key(self.name())
    }
}

impl Display for OptionalMeleeCharacter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_label())
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_id_resolves_without_panicking() {
        for id in 0..=u8::MAX {
            let character = name_for(id);
            assert_eq!(character.display_label(), name_for(id).display_label());

            match id {
                0x00..=0x20 => assert!(character.0.is_some(), "id {id:#04x} should be mapped"),
                _ => assert_eq!(character.name(), UNKNOWN_CHARACTER),
            }
        }
    }

    #[test]
    fn ids_round_trip_through_the_enum() {
        for character in MeleeCharacter::iter() {
            assert_eq!(name_for(character as u8).0, Some(character));
        }
    }

    #[test]
    fn canonical_names() {
        assert_eq!(name_for(0x00).name(), "mario");
        assert_eq!(name_for(0x02).name(), "captain_falcon");
        assert_eq!(name_for(0x18).name(), "mr_game_and_watch");
        assert_eq!(name_for(0x1D).name(), "wire_frame_male");
        assert_eq!(name_for(0xFF).name(), "unknown");
    }

    #[test]
    fn labels() {
        assert_eq!(display_label("young_link"), "Young Link");
        assert_eq!(display_label("fox"), "Fox");
        assert_eq!(display_label(&display_label("dr_mario")), "Dr Mario");
        assert_eq!(name_for(0xFF).to_string(), "Unknown");
    }

    #[test]
    fn asset_keys_are_stable() {
        assert_eq!(asset_key("Captain Falcon"), "captain_falcon");
        assert_eq!(asset_key("captain_falcon"), "captain_falcon");
        assert_eq!(name_for(0x03).as_discord_resource(), "donkey_kong");
        assert_eq!(name_for(0x03).as_discord_resource(), name_for(0x03).as_discord_resource());
    }
}
