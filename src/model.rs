//! Snapshots of container and sub-sound metadata, captured once at analysis time.

use crate::header::AudioFormat;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::BitOr,
    path::{Path, PathBuf},
};

/// Where a sound container begins inside a file.
///
/// The offset is 0 for standalone `.fsb` files and the scanned signature position for
/// containers embedded in `.bank` files.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerLocation {
    source: PathBuf,
    offset: u64,
}

impl ContainerLocation {
    /// Creates a location for a container starting `offset` bytes into `source`.
    pub fn new(source: impl Into<PathBuf>, offset: u64) -> Self {
        Self {
            source: source.into(),
            offset,
        }
    }

    /// Returns the file that holds the container.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Returns the byte offset of the container's signature within the file.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

impl Display for ContainerLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}@0x{:08x}", self.source.display(), self.offset)
    }
}

/// Container formats the engine can open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ContainerFormat {
    /// FMOD sound bank, version 5.
    Fsb5,
}

impl Display for ContainerFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Fsb5 => "FSB5",
        })
    }
}

/// Mode bits describing how a sub-sound was opened and how it loops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModeFlags(u32);

impl ModeFlags {
    /// The sound plays once.
    pub const LOOP_OFF: Self = Self(0x0000_0001);
    /// The sound loops between its loop points.
    pub const LOOP_NORMAL: Self = Self(0x0000_0002);
    /// Sample data is pulled on demand instead of being decoded up front.
    pub const CREATE_STREAM: Self = Self(0x0000_0080);
    /// Only metadata was read when the container was opened.
    pub const OPEN_ONLY: Self = Self(0x0000_0100);

    const NAMES: [(Self, &'static str); 4] = [
        (Self::LOOP_OFF, "LOOP_OFF"),
        (Self::LOOP_NORMAL, "LOOP_NORMAL"),
        (Self::CREATE_STREAM, "CREATESTREAM"),
        (Self::OPEN_ONLY, "OPENONLY"),
    ];

    /// Creates a set from raw bits.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    #[must_use]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for ModeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl Display for ModeFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut known = 0;
        let mut first = true;

        for (flag, name) in Self::NAMES {
            if self.contains(flag) {
                known |= flag.0;
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        match (self.0 & !known, first) {
            (0, true) => f.write_str("NONE"),
            (0, false) => Ok(()),
            (rest, true) => write!(f, "0x{rest:08x}"),
            (rest, false) => write!(f, "|0x{rest:08x}"),
        }
    }
}

/// Properties of one sub-sound, snapshotted when its container was probed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubSoundDescriptor {
    /// Position of the sub-sound within its container.
    pub index: u32,
    /// Name stored in the container, if any.
    pub name: Option<String>,
    /// Duration in milliseconds.
    pub length_ms: u32,
    /// Duration in PCM sample frames.
    pub length_pcm_samples: u32,
    /// How the sample data is encoded.
    pub encoding: AudioFormat,
    /// Format of the container holding the sub-sound.
    pub container_format: ContainerFormat,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Width of one decoded sample; 0 if the engine could not tell.
    pub bits_per_sample: u16,
    /// Sample rate in Hz; 0 if the engine could not tell.
    pub sample_rate: u32,
    /// Loop start in milliseconds.
    pub loop_start_ms: u32,
    /// Loop end in milliseconds.
    pub loop_end_ms: u32,
    /// Open and loop mode.
    pub mode: ModeFlags,
    /// Container this sub-sound belongs to.
    pub location: ContainerLocation,
}

impl SubSoundDescriptor {
    const DEFAULT_BITS: u16 = 16;
    const DEFAULT_SAMPLE_RATE: u32 = 44100;

    /// Bit depth to write; an unknown depth is treated as 16-bit.
    #[must_use]
    pub fn effective_bits(&self) -> u16 {
        match self.bits_per_sample {
            0 => Self::DEFAULT_BITS,
            bits => bits,
        }
    }

    /// Sample rate to write; an unknown rate is treated as 44.1 kHz.
    #[must_use]
    pub fn effective_sample_rate(&self) -> u32 {
        match self.sample_rate {
            0 => Self::DEFAULT_SAMPLE_RATE,
            rate => rate,
        }
    }

    /// Declared length of the decoded stream in bytes.
    #[must_use]
    pub fn pcm_byte_length(&self) -> u64 {
        u64::from(self.length_pcm_samples)
            * u64::from(self.channels)
            * u64::from(self.effective_bits() / 8)
    }

    /// One-line description used in logs and listings.
    #[must_use]
    pub fn format_summary(&self) -> String {
        format!(
            "{}, {}ch, {}-bit, {} Hz",
            self.encoding,
            self.channels,
            self.effective_bits(),
            self.effective_sample_rate()
        )
    }
}

/// A 128-bit identifier of a logical event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Display for Guid {
    // Microsoft layout: the first three groups are stored little-endian
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let b = &self.0;
        write!(
            f,
            "{{{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}}}",
            b[3], b[2], b[1], b[0], b[5], b[4], b[7], b[6], b[8], b[9], b[10], b[11], b[12], b[13],
            b[14], b[15]
        )
    }
}

/// A named logical event reported by the engine's bank-loading facility.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventInfo {
    /// Event path, e.g. `event:/music/title`.
    pub path: String,
    /// Identifier of the event, if the engine exposes it.
    pub guid: Option<Guid>,
    /// Longest duration of the event in milliseconds, if known.
    pub length_ms: Option<u32>,
}

#[cfg(test)]
mod test {
    use super::{ContainerFormat, ContainerLocation, Guid, ModeFlags, SubSoundDescriptor};
    use crate::header::AudioFormat;

    fn descriptor(bits: u16, rate: u32) -> SubSoundDescriptor {
        SubSoundDescriptor {
            index: 0,
            name: None,
            length_ms: 1000,
            length_pcm_samples: 100,
            encoding: AudioFormat::Vorbis,
            container_format: ContainerFormat::Fsb5,
            channels: 2,
            bits_per_sample: bits,
            sample_rate: rate,
            loop_start_ms: 0,
            loop_end_ms: 0,
            mode: ModeFlags::default(),
            location: ContainerLocation::new("a.fsb", 0),
        }
    }

    #[test]
    fn unknown_depth_and_rate_fall_back() {
        let d = descriptor(0, 0);
        assert_eq!(d.effective_bits(), 16);
        assert_eq!(d.effective_sample_rate(), 44100);
        assert_eq!(d.pcm_byte_length(), 400);

        let d = descriptor(24, 48000);
        assert_eq!(d.pcm_byte_length(), 600);
        assert_eq!(d.format_summary(), "Vorbis, 2ch, 24-bit, 48000 Hz");
    }

    #[test]
    fn mode_flags_display() {
        assert_eq!(ModeFlags::default().to_string(), "NONE");
        assert_eq!(
            (ModeFlags::LOOP_NORMAL | ModeFlags::CREATE_STREAM).to_string(),
            "LOOP_NORMAL|CREATESTREAM"
        );
        assert_eq!(
            (ModeFlags::LOOP_OFF | ModeFlags::from_bits(0x1000)).to_string(),
            "LOOP_OFF|0x00001000"
        );
    }

    #[test]
    fn guid_display() {
        let guid = Guid([
            0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
            0xee, 0xff,
        ]);
        assert_eq!(guid.to_string(), "{00112233-4455-6677-8899-aabbccddeeff}");
    }

    #[test]
    fn location_display() {
        assert_eq!(
            ContainerLocation::new("x.bank", 0x40).to_string(),
            "x.bank@0x00000040"
        );
    }
}
