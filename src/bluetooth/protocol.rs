// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wire protocol of the Zoom remote control port.
//!
//! The recorder sends one status byte at a time. While bit 7 is set it is
//! still waiting for a controller and must be answered with a key-up
//! sequence. Once bit 7 clears, each byte is a status snapshot:
//!
//! | Bit | Meaning                                   |
//! |-----|-------------------------------------------|
//! | 7   | handshake in progress                     |
//! | 6   | green level, channel 3                    |
//! | 5   | green level, channel 1                    |
//! | 4   | green level, channel 2                    |
//! | 3   | red level, channel 3                      |
//! | 2   | red level, channel 1                      |
//! | 1   | red level, channel 2                      |
//! | 0   | recording (toggles while paused)          |
//!
//! Controller key presses are two-byte sequences followed by [`KEY_UP`].

use std::fmt;

/// Set on every status byte sent while the handshake is in progress.
pub const HANDSHAKE_FLAG: u8 = 0x80;

/// "All keys released". Answers handshake bytes and ends every key press.
pub const KEY_UP: [u8; 2] = [0x80, 0x00];

/// Sent once after connecting to wake a recorder that was already synced.
pub const PROMPT_SEQUENCE: [u8; 3] = [0x80, 0x00, 0x00];

/// Whether a status byte carries the handshake flag.
pub fn is_handshake(byte: u8) -> bool {
    byte & HANDSHAKE_FLAG != 0
}

/// Buttons of the wired remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteKey {
    Record,
    Play,
    /// Sets a marker while recording. Same code as play.
    Mark,
    Next,
    Prev,
    RecPause,
    VolumeUp,
    VolumeDown,
}

impl RemoteKey {
    /// All keys, in display order.
    pub const ALL: [RemoteKey; 8] = [
        Self::Record,
        Self::Play,
        Self::Mark,
        Self::Next,
        Self::Prev,
        Self::RecPause,
        Self::VolumeUp,
        Self::VolumeDown,
    ];

    /// Parse from a key name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "RECORD" | "REC" => Some(Self::Record),
            "PLAY" | "PAUSE" => Some(Self::Play),
            "MARK" => Some(Self::Mark),
            "NEXT" => Some(Self::Next),
            "PREV" | "PREVIOUS" => Some(Self::Prev),
            "REC_PAUSE" => Some(Self::RecPause),
            "VOLUME_UP" | "VOL+" => Some(Self::VolumeUp),
            "VOLUME_DOWN" | "VOL_" => Some(Self::VolumeDown),
            _ => None,
        }
    }

    /// Get string code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Record => "RECORD",
            Self::Play => "PLAY",
            Self::Mark => "MARK",
            Self::Next => "NEXT",
            Self::Prev => "PREV",
            Self::RecPause => "REC_PAUSE",
            Self::VolumeUp => "VOLUME_UP",
            Self::VolumeDown => "VOLUME_DOWN",
        }
    }

    /// Bytes sent when the key goes down.
    pub fn sequence(&self) -> [u8; 2] {
        match self {
            Self::Record => [0x81, 0x00],
            Self::Play | Self::Mark => [0x82, 0x00],
            Self::Next => [0x88, 0x00],
            Self::Prev => [0x90, 0x00],
            Self::RecPause => [0x80, 0x02],
            Self::VolumeUp => [0x80, 0x08],
            Self::VolumeDown => [0x80, 0x10],
        }
    }
}

/// Crude input level of one recorder channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Off,
    Green,
    Amber,
    Red,
}

impl Level {
    fn from_flags(green: bool, red: bool) -> Self {
        match (green, red) {
            (true, true) => Self::Amber,
            (true, false) => Self::Green,
            (false, true) => Self::Red,
            (false, false) => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Green => "green",
            Self::Amber => "amber",
            Self::Red => "red",
        }
    }
}

/// Decoded status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderStatus {
    pub raw: u8,
    pub recording: bool,
    /// Levels for channels 1, 2 and 3. The H2n has no channel 3.
    pub levels: [Level; 3],
}

impl RecorderStatus {
    /// Decode a status byte received after sync.
    pub fn decode(raw: u8) -> Self {
        let bit = |n: u8| raw & (1 << n) != 0;
        Self {
            raw,
            recording: bit(0),
            levels: [
                Level::from_flags(bit(5), bit(2)),
                Level::from_flags(bit(4), bit(1)),
                Level::from_flags(bit(6), bit(3)),
            ],
        }
    }
}

impl fmt::Display for RecorderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ch1={} ch2={} ch3={}",
            if self.recording { "REC" } else { "---" },
            self.levels[0].as_str(),
            self.levels[1].as_str(),
            self.levels[2].as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_flag() {
        assert!(is_handshake(0x80));
        assert!(is_handshake(0x81));
        assert!(!is_handshake(0x7F));
        assert!(!is_handshake(0x00));
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(RemoteKey::parse("record"), Some(RemoteKey::Record));
        assert_eq!(RemoteKey::parse(" PLAY "), Some(RemoteKey::Play));
        assert_eq!(RemoteKey::parse("rec-pause"), Some(RemoteKey::RecPause));
        assert_eq!(RemoteKey::parse("rec_pause"), Some(RemoteKey::RecPause));
        assert_eq!(RemoteKey::parse("vol+"), Some(RemoteKey::VolumeUp));
        assert_eq!(RemoteKey::parse("vol-"), Some(RemoteKey::VolumeDown));
        assert_eq!(RemoteKey::parse("eject"), None);
    }

    #[test]
    fn test_key_names_round_trip() {
        for key in RemoteKey::ALL {
            assert_eq!(RemoteKey::parse(key.as_str()), Some(key));
        }
    }

    #[test]
    fn test_key_sequences() {
        assert_eq!(RemoteKey::Record.sequence(), [0x81, 0x00]);
        assert_eq!(RemoteKey::Mark.sequence(), RemoteKey::Play.sequence());
        assert_eq!(RemoteKey::VolumeDown.sequence(), [0x80, 0x10]);
    }

    #[test]
    fn test_status_decode() {
        let idle = RecorderStatus::decode(0x00);
        assert!(!idle.recording);
        assert_eq!(idle.levels, [Level::Off; 3]);

        // ch1 green + red, ch2 green, recording
        let status = RecorderStatus::decode(0x24 | 0x10 | 0x01);
        assert!(status.recording);
        assert_eq!(status.levels[0], Level::Amber);
        assert_eq!(status.levels[1], Level::Green);
        assert_eq!(status.levels[2], Level::Off);

        let red3 = RecorderStatus::decode(0x08);
        assert_eq!(red3.levels[2], Level::Red);
    }

    #[test]
    fn test_status_display() {
        let status = RecorderStatus::decode(0x21);
        assert_eq!(status.to_string(), "REC ch1=green ch2=off ch3=off");
    }
}
