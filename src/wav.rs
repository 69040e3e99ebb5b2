//! Writes sub-sounds as RIFF/WAVE files.

use crate::{
    engine::{ContainerEngine, EngineError},
    model::SubSoundDescriptor,
};
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    fs::File,
    io::{BufWriter, Error as IoError, ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
};
use tracing::debug;

const HEADER_LEN: u32 = 44;
const BUFFER_LEN: usize = 4096;
const FLOAT_LEN: usize = 4;

/// The `fmt ` chunk of a WAVE file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WavFormat {
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Width of one sample.
    pub bits_per_sample: u16,
    /// Whether samples are IEEE 754 floats rather than integers.
    pub float: bool,
}

impl WavFormat {
    /// Derives the format from a sub-sound, filling in defaults for unknown values.
    #[must_use]
    pub fn for_sub_sound(descriptor: &SubSoundDescriptor) -> Self {
        Self {
            channels: descriptor.channels,
            sample_rate: descriptor.effective_sample_rate(),
            bits_per_sample: descriptor.effective_bits(),
            float: descriptor.encoding.is_float(),
        }
    }

    /// 3 for IEEE float, 1 for integer PCM.
    #[must_use]
    pub fn format_tag(&self) -> u16 {
        if self.float {
            3
        } else {
            1
        }
    }

    /// Bytes per sample frame.
    #[must_use]
    pub fn block_align(&self) -> u16 {
        (u32::from(self.channels) * u32::from(self.bits_per_sample) / 8) as u16
    }

    /// Bytes per second.
    #[must_use]
    pub fn byte_rate(&self) -> u32 {
        (u64::from(self.sample_rate) * u64::from(self.channels) * u64::from(self.bits_per_sample)
            / 8) as u32
    }

    /// Builds the 44-byte header for `data_len` bytes of sample data.
    #[must_use]
    pub fn header(&self, data_len: u32) -> Vec<u8> {
        let mut header = Vec::with_capacity(HEADER_LEN as usize);

        header.extend(b"RIFF");
        header.extend(riff_size(data_len).to_le_bytes());
        header.extend(b"WAVE");
        header.extend(b"fmt ");
        header.extend(16u32.to_le_bytes());
        header.extend(self.format_tag().to_le_bytes());
        header.extend(self.channels.to_le_bytes());
        header.extend(self.sample_rate.to_le_bytes());
        header.extend(self.byte_rate().to_le_bytes());
        header.extend(self.block_align().to_le_bytes());
        header.extend(self.bits_per_sample.to_le_bytes());
        header.extend(b"data");
        header.extend(data_len.to_le_bytes());

        header
    }
}

fn riff_size(data_len: u32) -> u32 {
    data_len.saturating_add(HEADER_LEN - 8)
}

/// Streams sub-sounds out of the engine into WAVE files.
#[derive(Clone, Copy, Debug)]
pub struct WavExporter<'e> {
    engine: &'e ContainerEngine,
}

impl<'e> WavExporter<'e> {
    /// Creates an exporter that reads through `engine`.
    #[must_use]
    pub fn new(engine: &'e ContainerEngine) -> Self {
        Self { engine }
    }

    /// Writes the sub-sound described by `descriptor` to `output`.
    ///
    /// Returns the size of the written file. A failed export may leave a partial file behind.
    ///
    /// # Errors
    /// Returns an error if the output cannot be created, the sub-sound cannot be streamed, or
    /// reading or writing fails.
    pub fn export(&self, descriptor: &SubSoundDescriptor, output: &Path) -> Result<u64, WavError> {
        let format = WavFormat::for_sub_sound(descriptor);
        let declared = descriptor.pcm_byte_length();

        let file = File::create(output).map_err(WavError::io_factory(WavErrorKind::Create))?;
        let mut sink = BufWriter::new(file);

        let data_len = self
            .engine
            .with_container(&descriptor.location, |container| {
                let mut samples = container.open_sub_sound(descriptor.index)?;
                Ok(write_wav(format, declared, &mut samples, &mut sink))
            })
            .map_err(WavError::engine_factory(WavErrorKind::Source))??;

        sink.flush()
            .map_err(WavError::io_factory(WavErrorKind::Write))?;

        debug!(output = %output.display(), declared, data_len, "wrote wav file");
        Ok(u64::from(HEADER_LEN) + data_len)
    }
}

/// Writes a WAVE header followed by at most `declared_len` bytes pulled from `source`.
///
/// Pulling stops early when `source` runs dry; the header is then rewritten with the actual
/// length. Float samples are clamped to `[-1.0, 1.0]`. Returns the length of the data chunk.
///
/// # Errors
/// Returns an error if reading from `source` or writing to `sink` fails.
pub fn write_wav<R: Read + ?Sized, W: Write + Seek>(
    format: WavFormat,
    declared_len: u64,
    source: &mut R,
    sink: &mut W,
) -> Result<u64, WavError> {
    let declared = u32::try_from(declared_len).unwrap_or(u32::MAX);
    let write_err = WavError::io_factory(WavErrorKind::Write);

    sink.write_all(&format.header(declared)).map_err(write_err)?;

    let unit = if format.float { FLOAT_LEN } else { 1 };
    let mut buf = [0u8; BUFFER_LEN];
    let mut carried = 0;
    let mut remaining = u64::from(declared);
    let mut data_len = 0u64;

    while remaining > 0 {
        let want = (BUFFER_LEN - carried).min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let read = pull(source, &mut buf[carried..carried + want])?;
        if read == 0 {
            break;
        }

        remaining -= read as u64;
        data_len += read as u64;

        // a partial trailing sample waits for the rest of its bytes
        let filled = carried + read;
        let whole = filled - filled % unit;
        if format.float {
            clamp_floats(&mut buf[..whole]);
        }

        sink.write_all(&buf[..whole])
            .map_err(WavError::io_factory(WavErrorKind::Write))?;
        buf.copy_within(whole..filled, 0);
        carried = filled - whole;
    }

    sink.write_all(&buf[..carried])
        .map_err(WavError::io_factory(WavErrorKind::Write))?;

    if data_len != u64::from(declared) {
        patch_lengths(sink, data_len as u32).map_err(WavError::io_factory(WavErrorKind::Write))?;
    }

    Ok(data_len)
}

fn pull<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> Result<usize, WavError> {
    loop {
        match source.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return Err(WavError::new_with_io(WavErrorKind::Read, e)),
        }
    }
}

fn clamp_floats(samples: &mut [u8]) {
    for sample in samples.chunks_exact_mut(FLOAT_LEN) {
        let value = f32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]);
        if !(-1.0..=1.0).contains(&value) {
            sample.copy_from_slice(&value.clamp(-1.0, 1.0).to_le_bytes());
        }
    }
}

fn patch_lengths<W: Write + Seek>(sink: &mut W, data_len: u32) -> Result<(), IoError> {
    let _ = sink.seek(SeekFrom::Start(4))?;
    sink.write_all(&riff_size(data_len).to_le_bytes())?;
    let _ = sink.seek(SeekFrom::Start(u64::from(HEADER_LEN) - 4))?;
    sink.write_all(&data_len.to_le_bytes())?;
    let _ = sink.seek(SeekFrom::End(0))?;
    Ok(())
}

/// Represents an error that occurred while exporting a WAVE file.
#[derive(Debug)]
pub struct WavError {
    kind: WavErrorKind,
    source: WavErrorSource,
}

/// Describes which step of an export failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavErrorKind {
    /// The output file could not be created.
    Create,
    /// The engine could not provide the sample stream.
    Source,
    /// Pulling sample data failed.
    Read,
    /// Writing the output failed.
    Write,
}

#[derive(Debug)]
enum WavErrorSource {
    Io(IoError),
    Engine(EngineError),
}

impl WavError {
    fn new_with_io(kind: WavErrorKind, source: IoError) -> Self {
        Self {
            kind,
            source: WavErrorSource::Io(source),
        }
    }

    fn io_factory(kind: WavErrorKind) -> impl FnOnce(IoError) -> Self {
        move |source| Self::new_with_io(kind, source)
    }

    fn engine_factory(kind: WavErrorKind) -> impl FnOnce(EngineError) -> Self {
        move |source| Self {
            kind,
            source: WavErrorSource::Engine(source),
        }
    }

    /// Returns which step failed.
    #[must_use]
    pub fn kind(&self) -> WavErrorKind {
        self.kind
    }
}

impl Display for WavError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        use WavErrorKind::*;

        f.write_str(match self.kind {
            Create => "failed to create output file",
            Source => "failed to open sub-sound for streaming",
            Read => "failed to read sample data",
            Write => "failed to write output file",
        })
    }
}

impl Error for WavError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.source {
            WavErrorSource::Io(e) => Some(e),
            WavErrorSource::Engine(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{write_wav, WavErrorKind, WavFormat};
    use std::io::{Cursor, Error as IoError, ErrorKind, Read, Result as IoResult};

    const STEREO_16: WavFormat = WavFormat {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        float: false,
    };

    fn u16_at(data: &[u8], pos: usize) -> u16 {
        u16::from_le_bytes([data[pos], data[pos + 1]])
    }

    fn u32_at(data: &[u8], pos: usize) -> u32 {
        u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
    }

    #[test]
    fn header_fields() {
        let header = STEREO_16.header(1000);

        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(u32_at(&header, 4), 1036);
        assert_eq!(&header[8..16], b"WAVEfmt ");
        assert_eq!(u32_at(&header, 16), 16);
        assert_eq!(u16_at(&header, 20), 1);
        assert_eq!(u16_at(&header, 22), 2);
        assert_eq!(u32_at(&header, 24), 22050);
        assert_eq!(u32_at(&header, 28), 88200);
        assert_eq!(u16_at(&header, 32), 4);
        assert_eq!(u16_at(&header, 34), 16);
        assert_eq!(&header[36..40], b"data");
        assert_eq!(u32_at(&header, 40), 1000);

        let float = WavFormat {
            float: true,
            bits_per_sample: 32,
            channels: 1,
            ..STEREO_16
        };
        assert_eq!(u16_at(&float.header(0), 20), 3);
        assert_eq!(float.block_align(), 4);
    }

    #[test]
    fn copy_declared_length() {
        let data = (0..=255).cycle().take(10_000).collect::<Vec<u8>>();
        let mut sink = Cursor::new(Vec::new());

        let written = write_wav(STEREO_16, 10_000, &mut data.as_slice(), &mut sink).unwrap();
        let out = sink.into_inner();

        assert_eq!(written, 10_000);
        assert_eq!(out.len(), 10_044);
        assert_eq!(&out[44..], data);
    }

    #[test]
    fn stop_at_declared_length() {
        let data = [7u8; 100];
        let mut sink = Cursor::new(Vec::new());

        let written = write_wav(STEREO_16, 40, &mut data.as_slice(), &mut sink).unwrap();
        assert_eq!(written, 40);
        assert_eq!(sink.into_inner().len(), 84);
    }

    #[test]
    fn patch_header_when_stream_ends_early() {
        let data = [1u8; 30];
        let mut sink = Cursor::new(Vec::new());

        let written = write_wav(STEREO_16, 5000, &mut data.as_slice(), &mut sink).unwrap();
        let out = sink.into_inner();

        assert_eq!(written, 30);
        assert_eq!(out.len(), 74);
        assert_eq!(u32_at(&out, 4), 66);
        assert_eq!(u32_at(&out, 40), 30);
    }

    // hands out three bytes at a time so floats straddle reads
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
            let n = buf.len().min(3).min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn clamp_floats_across_reads() {
        let samples = [0.5f32, 2.0, -3.5, -0.25, f32::NAN];
        let data = samples
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect::<Vec<_>>();
        let format = WavFormat {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            float: true,
        };
        let mut sink = Cursor::new(Vec::new());

        let written = write_wav(format, 20, &mut Trickle(&data), &mut sink).unwrap();
        let out = sink.into_inner();
        assert_eq!(written, 20);

        let decoded = out[44..]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect::<Vec<_>>();
        assert_eq!(decoded[..4], [0.5, 1.0, -1.0, -0.25]);
        assert!(decoded[4].is_nan());
    }

    #[test]
    fn keep_partial_trailing_float() {
        let mut data = 4.0f32.to_le_bytes().to_vec();
        data.extend([0xAB, 0xCD]);
        let format = WavFormat {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 32,
            float: true,
        };
        let mut sink = Cursor::new(Vec::new());

        let written = write_wav(format, 8, &mut data.as_slice(), &mut sink).unwrap();
        let out = sink.into_inner();

        assert_eq!(written, 6);
        assert_eq!(&out[44..48], 1.0f32.to_le_bytes());
        assert_eq!(&out[48..], [0xAB, 0xCD]);
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> IoResult<usize> {
            Err(IoError::from(ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn report_read_failures() {
        let mut sink = Cursor::new(Vec::new());

        assert!(write_wav(STEREO_16, 4, &mut Broken, &mut sink)
            .is_err_and(|e| e.kind() == WavErrorKind::Read));
    }
}
