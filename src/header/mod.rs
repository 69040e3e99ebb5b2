use crate::read::Reader;
pub(crate) mod error;
use bilge::prelude::*;
use error::{
    ChunkError, ChunkErrorKind, HeaderError, HeaderErrorKind, NameError, NameErrorKind,
    StreamError, StreamErrorKind,
};
use std::{
    ffi::CStr,
    fmt::{Display, Formatter, Result as FmtResult},
    io::Read,
    iter::zip,
};
use tap::Pipe;

/// Everything in an FSB5 container that precedes the sample data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Header {
    pub(crate) format: AudioFormat,
    pub(crate) stream_info: Box<[StreamInfo]>,
    /// Offset of the first byte of sample data, relative to the container start.
    pub(crate) data_start: usize,
    /// Size of the whole container: headers, name table and sample data.
    pub(crate) total_size: usize,
}

impl Header {
    pub(crate) fn parse<R: Read>(reader: &mut Reader<R>) -> Result<Self, HeaderError> {
        // check for file signature
        match reader.take_const() {
            Ok(data) if data == FSB5_MAGIC => Ok(()),
            Err(e) => Err(HeaderError::new_with_source(HeaderErrorKind::Magic, e)),
            _ => Err(HeaderError::new(HeaderErrorKind::Magic)),
        }?;

        // determines how encoding flags are read
        let version = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::Version))?
            .pipe(Version::try_from)?;

        let num_streams = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::StreamCount))?;

        if num_streams == 0 {
            return Err(HeaderError::new(HeaderErrorKind::ZeroStreams));
        }

        let stream_headers_size = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::StreamHeadersSize))?;

        let name_table_size = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::NameTableSize))?;

        let total_stream_size = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::TotalStreamSize))?;

        let format = reader
            .le_u32()
            .map_err(HeaderError::factory(HeaderErrorKind::AudioFormat))
            .and_then(AudioFormat::parse)?;

        // encoding flags only exist in version 1; they carry nothing the probe reports
        let base_header_size = match version {
            Version::V0 => 64,
            Version::V1 => {
                reader
                    .skip(8)
                    .map_err(HeaderError::factory(HeaderErrorKind::EncodingFlags))?;
                60
            }
        };

        // skip unknown header data
        reader
            .advance_to(base_header_size)
            .map_err(HeaderError::factory(HeaderErrorKind::Metadata))?;

        let mut stream_info = parse_stream_headers(reader, num_streams, total_stream_size)?;

        let header_size = base_header_size + stream_headers_size as usize;

        // make sure base header + stream headers have been read
        reader.advance_to(header_size).map_err(HeaderError::factory(
            HeaderErrorKind::WrongHeaderSize {
                expected: header_size,
                actual: reader.position(),
            },
        ))?;

        if name_table_size != 0 {
            let table = reader
                .take(name_table_size as usize)
                .map_err(NameError::read_factory(0, NameErrorKind::Table))?;

            read_stream_names(&table, &mut stream_info)?;
        }

        let data_start = header_size + name_table_size as usize;

        Ok(Self {
            format,
            stream_info: stream_info.into_boxed_slice(),
            data_start,
            total_size: data_start + total_stream_size as usize,
        })
    }
}

/// The four bytes every FSB5 container starts with.
pub const FSB5_MAGIC: [u8; 4] = *b"FSB5";

enum Version {
    V0,
    V1,
}

impl TryFrom<u32> for Version {
    type Error = HeaderError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::V0),
            1 => Ok(Self::V1),
            version => Err(HeaderError::new(HeaderErrorKind::UnknownVersion { version })),
        }
    }
}

/// Represents known audio formats of streams within a sound bank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AudioFormat {
    /// PCM with 8-bit integer samples.
    Pcm8,
    /// PCM with 16-bit integer samples.
    Pcm16,
    /// PCM with 24-bit integer samples.
    Pcm24,
    /// PCM with 32-bit integer samples.
    Pcm32,
    /// PCM with 32-bit float (IEEE 754) samples.
    PcmFloat,
    /// GC ADPCM, used in games for the GameCube, Wii and Wii U.
    GcAdpcm,
    /// IMA ADPCM, developed by the
    /// [Interactive Multimedia Association](https://en.wikipedia.org/wiki/Interactive_Multimedia_Association).
    ImaAdpcm,
    /// VAG, an ADPCM format used in games for the PS1, PS2, and PSP.
    Vag,
    /// HEVAG, an ADPCM format used in games for the PS Vita and PS4.
    HeVag,
    /// XMA, used in games for the Xbox 360.
    Xma,
    /// MPEG, developed by the
    /// [ISO/IEC Moving Picture Experts Group](https://en.wikipedia.org/wiki/Moving_Picture_Experts_Group).
    Mpeg,
    /// CELT, developed by the [Xiph.Org Foundation](https://en.wikipedia.org/wiki/Xiph.Org_Foundation).
    Celt,
    /// ATRAC9, used in PlayStation games and debuting with the PS Vita.
    Atrac9,
    /// xWMA, used in games for Windows and Xbox systems.
    Xwma,
    /// Vorbis, developed by the [Xiph.Org Foundation](https://en.wikipedia.org/wiki/Xiph.Org_Foundation).
    Vorbis,
    /// FADPCM, an ADPCM format developed by Firelight Technologies for use with FMOD.
    FAdpcm,
    /// Opus, developed by the [Xiph.Org Foundation](https://en.wikipedia.org/wiki/Xiph.Org_Foundation).
    Opus,
}

impl AudioFormat {
    fn parse(value: u32) -> Result<Self, HeaderError> {
        match value {
            1 => Ok(Self::Pcm8),
            2 => Ok(Self::Pcm16),
            3 => Ok(Self::Pcm24),
            4 => Ok(Self::Pcm32),
            5 => Ok(Self::PcmFloat),
            6 => Ok(Self::GcAdpcm),
            7 => Ok(Self::ImaAdpcm),
            8 => Ok(Self::Vag),
            9 => Ok(Self::HeVag),
            10 => Ok(Self::Xma),
            11 => Ok(Self::Mpeg),
            12 => Ok(Self::Celt),
            13 => Ok(Self::Atrac9),
            14 => Ok(Self::Xwma),
            15 => Ok(Self::Vorbis),
            16 => Ok(Self::FAdpcm),
            17 => Ok(Self::Opus),
            flag => Err(HeaderError::new(HeaderErrorKind::UnknownAudioFormat { flag })),
        }
    }

    /// Returns `true` for the uncompressed formats, whose stream bytes are already PCM.
    #[must_use]
    pub fn is_pcm(self) -> bool {
        matches!(
            self,
            Self::Pcm8 | Self::Pcm16 | Self::Pcm24 | Self::Pcm32 | Self::PcmFloat
        )
    }

    /// Returns `true` if samples are IEEE 754 floats.
    #[must_use]
    pub fn is_float(self) -> bool {
        self == Self::PcmFloat
    }

    /// Returns the width of one sample, or 0 for compressed formats.
    #[must_use]
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Self::Pcm8 => 8,
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
            Self::Pcm32 | Self::PcmFloat => 32,
            _ => 0,
        }
    }
}

impl Display for AudioFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Pcm8 => "PCM (8-bit, integer)",
            Self::Pcm16 => "PCM (16-bit, integer)",
            Self::Pcm24 => "PCM (24-bit, integer)",
            Self::Pcm32 => "PCM (32-bit, integer)",
            Self::PcmFloat => "PCM (32-bit, float)",
            Self::GcAdpcm => "GC ADPCM",
            Self::ImaAdpcm => "IMA ADPCM",
            Self::Vag => "VAG",
            Self::HeVag => "HEVAG",
            Self::Xma => "XMA",
            Self::Mpeg => "MPEG",
            Self::Celt => "CELT",
            Self::Atrac9 => "ATRAC9",
            Self::Xwma => "xWMA",
            Self::Vorbis => "Vorbis",
            Self::FAdpcm => "FADPCM",
            Self::Opus => "Opus",
        })
    }
}

fn parse_stream_headers<R: Read>(
    reader: &mut Reader<R>,
    num_streams: u32,
    total_stream_size: u32,
) -> Result<Vec<StreamInfo>, HeaderError> {
    // the count comes straight from the file, so it cannot be trusted for allocation
    let mut stream_info = Vec::with_capacity(num_streams.min(1024) as usize);

    for index in 0..num_streams {
        // Stream headers contain information such as sample rate (Hz) and number of channels.
        // Sometimes, flags for header fields are set to 0 while the actual values are stored in chunks.
        let mut stream_header = match reader.le_u64() {
            Ok(n) => RawStreamHeader::from(n).parse(index),
            Err(e) => Err(StreamError::new_with_source(index, StreamErrorKind::StreamInfo, e)),
        }?;

        if stream_header.has_chunks {
            parse_stream_chunks(reader, &mut stream_header.info)
                .map_err(|e| e.into_stream_err(index))?;
        }

        stream_info.push(stream_header.info);
    }

    // Only data offsets are stored in stream headers, so consecutive offsets are
    // subtracted to get stream sizes. The last stream runs to the end of the data section.
    let next_offsets = stream_info
        .iter()
        .skip(1)
        .map(|info| info.data_offset)
        .chain([total_stream_size])
        .collect::<Vec<_>>();

    for ((info, next), index) in zip(stream_info.iter_mut(), next_offsets).zip(0..) {
        info.size = next
            .checked_sub(info.data_offset)
            .ok_or_else(|| HeaderError::new(HeaderErrorKind::StreamOffset { index }))?;
    }

    Ok(stream_info)
}

#[bitsize(64)]
#[derive(FromBits)]
struct RawStreamHeader {
    has_chunks: bool,
    sample_rate: u4,
    channels: u2,
    data_offset: u27,
    num_samples: u30,
}

#[derive(Debug)]
#[cfg_attr(test, derive(PartialEq, Eq))]
struct StreamHeader {
    has_chunks: bool,
    info: StreamInfo,
}

impl RawStreamHeader {
    fn parse(self, stream_index: u32) -> Result<StreamHeader, StreamError> {
        let sample_rate = match self.sample_rate().value() {
            0 => Ok(4000),
            1 => Ok(8000),
            2 => Ok(11000),
            3 => Ok(11025),
            4 => Ok(16000),
            5 => Ok(22050),
            6 => Ok(24000),
            7 => Ok(32000),
            8 => Ok(44100),
            9 => Ok(48000),
            10 => Ok(96000),
            flag => Err(StreamError::new(
                stream_index,
                StreamErrorKind::UnknownSampleRate { flag },
            )),
        }?;

        let channels = match self.channels().value() {
            0 => 1,
            1 => 2,
            2 => 6,
            3 => 8,
            _ => unreachable!(),
        };

        // Loops, names and sizes are filled in later from chunks, the name table
        // and neighbouring headers respectively.
        Ok(StreamHeader {
            has_chunks: self.has_chunks(),
            info: StreamInfo {
                sample_rate,
                channels,
                num_samples: self.num_samples().value(),
                stream_loop: None,
                data_offset: self.data_offset().value() * 32,
                size: 0,
                name: None,
            },
        })
    }
}

fn parse_stream_chunks<R: Read>(
    reader: &mut Reader<R>,
    stream: &mut StreamInfo,
) -> Result<(), ChunkError> {
    use StreamChunkKind::*;

    for index in 0.. {
        let chunk = match reader.le_u32() {
            Ok(n) => RawStreamChunk::from(n).parse(index),
            Err(e) => Err(ChunkError::new_with_source(index, ChunkErrorKind::Flag, e)),
        }?;

        let start_position = reader.position();

        match chunk.kind {
            Channels => {
                stream.channels = reader
                    .u8()
                    .map_err(ChunkError::factory(index, ChunkErrorKind::ChannelCount))?;

                if stream.channels == 0 {
                    return Err(ChunkError::new(index, ChunkErrorKind::ZeroChannels));
                }
            }
            SampleRate => {
                stream.sample_rate = reader
                    .le_u32()
                    .map_err(ChunkError::factory(index, ChunkErrorKind::SampleRate))?;

                if stream.sample_rate == 0 {
                    return Err(ChunkError::new(index, ChunkErrorKind::ZeroSampleRate));
                }
            }
            Loop => {
                let start = reader
                    .le_u32()
                    .map_err(ChunkError::factory(index, ChunkErrorKind::LoopStart))?;

                let end = reader
                    .le_u32()
                    .map_err(ChunkError::factory(index, ChunkErrorKind::LoopEnd))?;

                if end < start {
                    return Err(ChunkError::new(
                        index,
                        ChunkErrorKind::InvertedLoop { start, end },
                    ));
                }

                stream.stream_loop = Some(StreamLoop { start, end });
            }
            VorbisIntraLayers => {
                // Some Vorbis stream data is stored as multiple "layers" per channel.
                // Layers simply mean that more channels are present.
                let layers = reader
                    .le_u32()
                    .map_err(ChunkError::factory(index, ChunkErrorKind::VorbisLayerCount))?;

                let layers = u8::try_from(layers).map_err(|_| {
                    ChunkError::new(index, ChunkErrorKind::TooManyVorbisLayers { layers })
                })?;

                if layers == 0 {
                    return Err(ChunkError::new(index, ChunkErrorKind::ZeroVorbisLayers));
                }

                stream.channels = stream.channels.saturating_mul(layers);
            }
            _ => {}
        }

        // make sure the entire chunk has been read before continuing
        reader
            .advance_to(start_position + chunk.size as usize)
            .map_err(ChunkError::factory(
                index,
                ChunkErrorKind::WrongChunkSize {
                    expected: chunk.size,
                    actual: reader.position() - start_position,
                },
            ))?;

        if !chunk.more_chunks {
            break;
        }
    }

    Ok(())
}

#[bitsize(32)]
#[derive(FromBits)]
struct RawStreamChunk {
    more_chunks: bool,
    size: u24,
    kind: u7,
}

struct StreamChunk {
    more_chunks: bool,
    size: u32,
    kind: StreamChunkKind,
}

enum StreamChunkKind {
    Channels,
    SampleRate,
    Loop,
    Comment,
    XmaSeekTable,
    DspCoefficients,
    Atrac9Config,
    XwmaConfig,
    VorbisSeekTable,
    PeakVolume,
    VorbisIntraLayers,
    OpusDataSize,
}

impl RawStreamChunk {
    fn parse(self, chunk_index: u32) -> Result<StreamChunk, ChunkError> {
        use StreamChunkKind::*;

        let kind = match self.kind().value() {
            1 => Ok(Channels),
            2 => Ok(SampleRate),
            3 => Ok(Loop),
            4 => Ok(Comment),
            6 => Ok(XmaSeekTable),
            7 => Ok(DspCoefficients),
            9 => Ok(Atrac9Config),
            10 => Ok(XwmaConfig),
            11 => Ok(VorbisSeekTable),
            13 => Ok(PeakVolume),
            14 => Ok(VorbisIntraLayers),
            15 => Ok(OpusDataSize),
            flag => Err(ChunkError::new(chunk_index, ChunkErrorKind::UnknownType { flag })),
        }?;

        Ok(StreamChunk {
            more_chunks: self.more_chunks(),
            size: self.size().value(),
            kind,
        })
    }
}

/// Loop region of a stream, in samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct StreamLoop {
    pub(crate) start: u32,
    pub(crate) end: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StreamInfo {
    pub(crate) sample_rate: u32,
    pub(crate) channels: u8,
    pub(crate) num_samples: u32,
    pub(crate) stream_loop: Option<StreamLoop>,
    /// Offset of this stream's data, relative to the start of the data section.
    pub(crate) data_offset: u32,
    pub(crate) size: u32,
    pub(crate) name: Option<Box<str>>,
}

// The name table starts with one offset per stream (relative to the table start),
// followed by the null-terminated names those offsets point at.
fn read_stream_names(table: &[u8], stream_info: &mut [StreamInfo]) -> Result<(), NameError> {
    let mut offsets = Reader::new(table);

    for (info, index) in stream_info.iter_mut().zip(0..) {
        let offset = offsets
            .le_u32()
            .map_err(NameError::read_factory(index, NameErrorKind::NameOffset))?;

        let name = table
            .get(offset as usize..)
            .ok_or_else(|| NameError::new(index, NameErrorKind::OffsetOutOfBounds { offset }))?
            .pipe(CStr::from_bytes_until_nul)
            .map_err(NameError::cstr_factory(index))?
            .to_string_lossy();

        info.name = (!name.is_empty()).then(|| name.into());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::error::{ChunkErrorKind::*, HeaderErrorKind::*, StreamErrorKind::*};
    use super::{AudioFormat, Header, RawStreamChunk, RawStreamHeader, StreamLoop, FSB5_MAGIC};
    use crate::read::Reader;

    fn stream_header(has_chunks: bool, rate_flag: u64, channel_flag: u64, offset: u64, samples: u64) -> [u8; 8] {
        (u64::from(has_chunks) | rate_flag << 1 | channel_flag << 5 | (offset / 32) << 7 | samples << 34)
            .to_le_bytes()
    }

    fn chunk_flag(more: bool, size: u32, kind: u32) -> [u8; 4] {
        (u32::from(more) | size << 1 | kind << 25).to_le_bytes()
    }

    // two PCM16 streams: a looping stereo one with a chunk, a plain mono one
    fn sample_container() -> Vec<u8> {
        let mut headers = Vec::new();
        headers.extend(stream_header(true, 8, 1, 0, 8));
        headers.extend(chunk_flag(false, 8, 3));
        headers.extend(2u32.to_le_bytes());
        headers.extend(6u32.to_le_bytes());
        headers.extend(stream_header(false, 9, 0, 32, 8));

        let mut names = Vec::new();
        names.extend(8u32.to_le_bytes());
        names.extend(10u32.to_le_bytes());
        names.extend(b"a\0bb\0\0\0\0");

        let mut data = b"FSB5".to_vec();
        for field in [1, 2, headers.len() as u32, names.len() as u32, 48, 2] {
            data.extend(u32::to_le_bytes(field));
        }
        data.resize(60, 0);
        data.extend(headers);
        data.extend(names);
        data.extend([0x11; 48]);
        data
    }

    #[test]
    fn read_magic() {
        let mut reader;

        reader = Reader::new(b"".as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == Magic));

        reader = Reader::new(b"abcd".as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == Magic));

        reader = Reader::new(FSB5_MAGIC.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == Version));
    }

    #[test]
    fn read_version() {
        let mut reader;

        let data = b"FSB5\xFF\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(
            Header::parse(&mut reader).is_err_and(|e| e.kind() == UnknownVersion { version: 0xFF })
        );

        let data = b"FSB5\x00\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == StreamCount));
    }

    #[test]
    fn read_stream_count() {
        let mut reader;

        let data = b"FSB5\x01\x00\x00\x00\x00\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == ZeroStreams));

        let data = b"FSB5\x01\x00\x00\x00\x01\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == StreamHeadersSize));
    }

    #[test]
    fn read_audio_format() {
        let mut reader;

        let data = b"FSB5\x01\x00\x00\x000000000000000000\x00";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == AudioFormat));

        let data = b"FSB5\x01\x00\x00\x000000000000000000\x00\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(
            Header::parse(&mut reader).is_err_and(|e| e.kind() == UnknownAudioFormat { flag: 0 })
        );
    }

    #[test]
    fn read_encoding_flags_and_metadata() {
        let mut reader;

        let data = b"FSB5\x01\x00\x00\x000000000000000000\x01\x00\x00\x0000000";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == EncodingFlags));

        let data = b"FSB5\x00\x00\x00\x000000000000000000\x01\x00\x00\x00\x00";
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == Metadata));

        let mut data = b"FSB5\x01\x00\x00\x000000000000000000\x01\x00\x00\x00".to_vec();
        data.resize(60, 0);
        reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader).is_err_and(|e| e.is_stream_err_kind(StreamInfo)));
    }

    #[test]
    fn parse_full_container() {
        let data = sample_container();
        let mut reader = Reader::new(data.as_slice());
        let header = Header::parse(&mut reader).unwrap();

        assert_eq!(header.format, AudioFormat::Pcm16);
        assert_eq!(header.data_start, 60 + 28 + 16);
        assert_eq!(header.total_size, data.len());
        assert_eq!(reader.position(), header.data_start);

        let [first, second] = &*header.stream_info else {
            panic!("expected two streams");
        };

        assert_eq!(first.sample_rate, 44100);
        assert_eq!(first.channels, 2);
        assert_eq!(first.num_samples, 8);
        assert_eq!(first.stream_loop, Some(StreamLoop { start: 2, end: 6 }));
        assert_eq!((first.data_offset, first.size), (0, 32));
        assert_eq!(first.name.as_deref(), Some("a"));

        assert_eq!(second.sample_rate, 48000);
        assert_eq!(second.channels, 1);
        assert_eq!(second.stream_loop, None);
        assert_eq!((second.data_offset, second.size), (32, 16));
        assert_eq!(second.name.as_deref(), Some("bb"));
    }

    #[test]
    fn reject_out_of_order_data_offsets() {
        let mut data = sample_container();
        // total data size smaller than the second stream's offset
        data[20..24].copy_from_slice(&16u32.to_le_bytes());
        let mut reader = Reader::new(data.as_slice());

        assert!(Header::parse(&mut reader)
            .is_err_and(|e| e.kind() == StreamOffset { index: 1 }));
    }

    #[test]
    fn reject_name_offset_outside_table() {
        let mut data = sample_container();
        data[60 + 28..60 + 32].copy_from_slice(&99u32.to_le_bytes());
        let mut reader = Reader::new(data.as_slice());

        assert!(Header::parse(&mut reader).is_err_and(|e| e.kind() == NameTable));
    }

    #[test]
    fn derived_stream_info_parsing_works() {
        let data = 0b011010000101100111100000001011_111001101101001101000100110_11_1110_0;

        let mode = RawStreamHeader::from(data);

        assert_eq!(mode.has_chunks(), (data & 0x01) == 1);
        assert_eq!(u64::from(mode.sample_rate()), (data >> 1) & 0x0F);
        assert_eq!(u64::from(mode.channels()), (data >> 5) & 0x03);
        assert_eq!(u64::from(mode.data_offset()) * 32, ((data >> 7) & 0x07FF_FFFF) << 5);
        assert_eq!(u64::from(mode.num_samples()), (data >> 34) & 0x3FFF_FFFF);
    }

    #[test]
    fn parse_stream_info() {
        let data = 0b011010000101100111100000001011_111001101101001101000100110_11_1110_0;
        assert!(RawStreamHeader::from(data)
            .parse(0)
            .is_err_and(|e| e.kind() == UnknownSampleRate { flag: 0b1110 }));

        let data = 0b000000000000000000000000000001_000000000000000000000000001_01_1000_0;
        let header = RawStreamHeader::from(data).parse(0).unwrap();
        assert!(!header.has_chunks);
        assert_eq!(header.info.sample_rate, 44100);
        assert_eq!(header.info.channels, 2);
        assert_eq!(header.info.data_offset, 32);
        assert_eq!(header.info.num_samples, 1);
    }

    #[test]
    fn derived_stream_chunk_parsing_works() {
        let data = 0b0001101_100001101110000000011001_0;

        let flags = RawStreamChunk::from(data);

        assert_eq!(flags.more_chunks(), (data & 0x01) == 1);
        assert_eq!(u32::from(flags.size()), (data >> 1) & 0x00FF_FFFF);
        assert_eq!(u32::from(flags.kind()), (data >> 25) & 0x7F);
    }

    #[test]
    fn reject_unknown_chunk_types() {
        for flag in [0u8, 5, 8, 12, 16, 127] {
            let raw = u32::from_le_bytes(chunk_flag(false, 0, u32::from(flag)));
            assert!(RawStreamChunk::from(raw)
                .parse(0)
                .is_err_and(|e| e.to_string().contains("not recognized")));
        }

        let mut data = sample_container();
        // turn the loop chunk into an unknown chunk type
        data[68..72].copy_from_slice(&chunk_flag(false, 8, 5));
        let mut reader = Reader::new(data.as_slice());
        assert!(Header::parse(&mut reader)
            .is_err_and(|e| e.is_chunk_err_kind(UnknownType { flag: 5 })));
    }
}
