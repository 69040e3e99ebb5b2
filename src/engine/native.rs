use super::{EngineError, EngineErrorKind, OpenContainer, SoundBackend};
use crate::{
    header::{Header, StreamInfo},
    model::{ContainerFormat, ContainerLocation, ModeFlags, SubSoundDescriptor},
    read::Reader,
};
use std::{
    fs::File,
    io::{copy, BufReader, Read, Seek, SeekFrom, Write},
};
use tap::Pipe;
use tracing::debug;

/// Opens FSB5 containers with the crate's own header parser.
///
/// Only uncompressed PCM sample data can be streamed; there is no logical-bank facility.
#[derive(Debug, Default)]
pub struct NativeBackend {
    opened: u64,
}

impl NativeBackend {
    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SoundBackend for NativeBackend {
    fn open(
        &mut self,
        location: &ContainerLocation,
    ) -> Result<Box<dyn OpenContainer + '_>, EngineError> {
        let container = NativeContainer::open(location)?;
        self.opened += 1;

        Ok(Box::new(container))
    }

    fn shutdown(&mut self) {
        debug!(containers = self.opened, "native backend shutting down");
    }
}

struct NativeContainer {
    location: ContainerLocation,
    header: Header,
    file: BufReader<File>,
}

impl NativeContainer {
    fn open(location: &ContainerLocation) -> Result<Self, EngineError> {
        let (header, file) = read_header(location)?;

        Ok(Self {
            location: location.clone(),
            header,
            file,
        })
    }

    fn stream(&self, index: u32) -> Result<&StreamInfo, EngineError> {
        self.header.stream_info.get(index as usize).ok_or_else(|| {
            EngineError::new(EngineErrorKind::SubSoundIndex {
                index,
                count: self.sub_sound_count(),
            })
        })
    }
}

fn read_header(location: &ContainerLocation) -> Result<(Header, BufReader<File>), EngineError> {
    let mut file = File::open(location.source())
        .map_err(EngineError::factory(EngineErrorKind::Open))?;

    let _ = file
        .seek(SeekFrom::Start(location.offset()))
        .map_err(EngineError::factory(EngineErrorKind::Open))?;

    let mut reader = Reader::new(BufReader::new(file));
    let header = Header::parse(&mut reader).map_err(EngineError::factory(EngineErrorKind::Open))?;

    Ok((header, reader.into_inner()))
}

fn samples_to_ms(samples: u32, sample_rate: u32) -> u32 {
    (u64::from(samples) * 1000)
        .checked_div(u64::from(sample_rate))
        .unwrap_or(0)
        .pipe(|ms| u32::try_from(ms).unwrap_or(u32::MAX))
}

impl OpenContainer for NativeContainer {
    // FSB5 has no container-level name
    fn name(&self) -> Option<&str> {
        None
    }

    fn sub_sound_count(&self) -> u32 {
        self.header.stream_info.len() as u32
    }

    fn describe(&mut self, index: u32) -> Result<SubSoundDescriptor, EngineError> {
        let format = self.header.format;
        let info = self.stream(index)?;

        let (loop_start, loop_end) = info
            .stream_loop
            .map_or((0, 0), |l| (l.start, l.end));

        let looping = if info.stream_loop.is_some() {
            ModeFlags::LOOP_NORMAL
        } else {
            ModeFlags::LOOP_OFF
        };

        Ok(SubSoundDescriptor {
            index,
            name: info.name.as_deref().map(str::to_owned),
            length_ms: samples_to_ms(info.num_samples, info.sample_rate),
            length_pcm_samples: info.num_samples,
            encoding: format,
            container_format: ContainerFormat::Fsb5,
            channels: u16::from(info.channels),
            bits_per_sample: format.bits_per_sample(),
            sample_rate: info.sample_rate,
            loop_start_ms: samples_to_ms(loop_start, info.sample_rate),
            loop_end_ms: samples_to_ms(loop_end, info.sample_rate),
            mode: ModeFlags::CREATE_STREAM | ModeFlags::OPEN_ONLY | looping,
            location: self.location.clone(),
        })
    }

    fn open_sub_sound(&mut self, index: u32) -> Result<Box<dyn Read + '_>, EngineError> {
        let format = self.header.format;
        if !format.is_pcm() {
            return Err(EngineError::new(EngineErrorKind::UnsupportedEncoding {
                format,
            }));
        }

        let info = self.stream(index)?;
        let size = u64::from(info.size);
        let start =
            self.location.offset() + self.header.data_start as u64 + u64::from(info.data_offset);

        let _ = self
            .file
            .seek(SeekFrom::Start(start))
            .map_err(EngineError::factory(EngineErrorKind::Read))?;

        Ok(Box::new((&mut self.file).take(size)))
    }
}

/// Copies the FSB5 container at `location` verbatim into `out`.
///
/// Returns the number of bytes copied. The container's extent is taken from its own header.
///
/// # Errors
/// Returns an error if the container cannot be parsed or copying fails.
pub fn dump_container<W: Write>(
    location: &ContainerLocation,
    out: &mut W,
) -> Result<u64, EngineError> {
    let (header, mut file) = read_header(location)?;

    let _ = file
        .seek(SeekFrom::Start(location.offset()))
        .map_err(EngineError::factory(EngineErrorKind::Read))?;

    let expected = header.total_size as u64;
    let written = copy(&mut file.take(expected), out)
        .map_err(EngineError::factory(EngineErrorKind::Read))?;

    if written < expected {
        debug!(%location, expected, written, "container truncated by end of file");
    }

    Ok(written)
}

#[cfg(test)]
mod test {
    use super::{dump_container, samples_to_ms, NativeBackend};
    use crate::{
        engine::{EngineErrorKind, SoundBackend},
        model::{ContainerLocation, ModeFlags},
        AudioFormat,
    };
    use std::io::{Read, Write};
    use tempfile::NamedTempFile;

    fn stream_header(rate_flag: u64, channel_flag: u64, offset: u64, samples: u64) -> [u8; 8] {
        (rate_flag << 1 | channel_flag << 5 | (offset / 32) << 7 | samples << 34).to_le_bytes()
    }

    // version 1 container: one mono PCM16 stream of 4 samples at 8000 Hz, no names
    fn container(format: u32) -> Vec<u8> {
        let mut data = b"FSB5".to_vec();
        for field in [1, 1, 8, 0, 8, format] {
            data.extend(u32::to_le_bytes(field));
        }
        data.resize(60, 0);
        data.extend(stream_header(1, 0, 0, 4));
        data.extend([1, 0, 2, 0, 3, 0, 4, 0]);
        data
    }

    fn file_with(prefix: &[u8], body: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(prefix).unwrap();
        file.write_all(body).unwrap();
        file.write_all(b"trailing").unwrap();
        file
    }

    #[test]
    fn describe_embedded_container() {
        let file = file_with(b"garbage!", &container(2));
        let location = ContainerLocation::new(file.path(), 8);
        let mut backend = NativeBackend::new();
        let mut opened = backend.open(&location).unwrap();

        assert_eq!(opened.name(), None);
        assert_eq!(opened.sub_sound_count(), 1);

        let sound = opened.describe(0).unwrap();
        assert_eq!(sound.encoding, AudioFormat::Pcm16);
        assert_eq!(sound.channels, 1);
        assert_eq!(sound.bits_per_sample, 16);
        assert_eq!(sound.sample_rate, 8000);
        assert_eq!(sound.length_pcm_samples, 4);
        assert_eq!(sound.length_ms, 0);
        assert_eq!(sound.name, None);
        assert_eq!(sound.location, location);
        assert!(sound.mode.contains(ModeFlags::LOOP_OFF | ModeFlags::CREATE_STREAM));

        assert!(opened
            .describe(1)
            .is_err_and(|e| e.kind() == EngineErrorKind::SubSoundIndex { index: 1, count: 1 }));

        let mut samples = Vec::new();
        let _ = opened.open_sub_sound(0).unwrap().read_to_end(&mut samples).unwrap();
        assert_eq!(samples, [1, 0, 2, 0, 3, 0, 4, 0]);
    }

    #[test]
    fn compressed_data_is_not_streamed() {
        let file = file_with(b"", &container(15));
        let mut backend = NativeBackend::new();
        let mut opened = backend.open(&ContainerLocation::new(file.path(), 0)).unwrap();

        assert_eq!(opened.describe(0).unwrap().bits_per_sample, 0);
        assert!(opened.open_sub_sound(0).is_err_and(|e| e.kind()
            == EngineErrorKind::UnsupportedEncoding {
                format: AudioFormat::Vorbis
            }));
    }

    #[test]
    fn reject_garbage_offsets() {
        let file = file_with(b"FSB5 but not really", b"");
        let mut backend = NativeBackend::new();

        assert!(backend
            .open(&ContainerLocation::new(file.path(), 0))
            .is_err_and(|e| e.kind() == EngineErrorKind::Open));
        assert!(backend
            .open(&ContainerLocation::new("does/not/exist.fsb", 0))
            .is_err_and(|e| e.kind() == EngineErrorKind::Open));
    }

    #[test]
    fn dump_copies_only_the_container() {
        let body = container(2);
        let file = file_with(b"pad", &body);
        let mut out = Vec::new();

        let written = dump_container(&ContainerLocation::new(file.path(), 3), &mut out).unwrap();
        assert_eq!(written, body.len() as u64);
        assert_eq!(out, body);
    }

    #[test]
    fn convert_samples_to_milliseconds() {
        assert_eq!(samples_to_ms(44100, 44100), 1000);
        assert_eq!(samples_to_ms(22050, 44100), 500);
        assert_eq!(samples_to_ms(10, 0), 0);
    }
}
