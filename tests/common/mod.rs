//! Builders for synthetic FSB5 containers and banks.

#![allow(dead_code)]

use std::{fs, path::Path, path::PathBuf};

pub(crate) const PCM16: u32 = 2;
pub(crate) const PCM_FLOAT: u32 = 5;
pub(crate) const VORBIS: u32 = 15;

/// One stream of a synthetic container.
pub(crate) struct TestSound {
    pub(crate) name: Option<&'static str>,
    pub(crate) channels: u8,
    pub(crate) rate: u32,
    pub(crate) samples: u32,
    pub(crate) data: Vec<u8>,
}

impl TestSound {
    /// 16-bit PCM with a recognizable byte pattern.
    pub(crate) fn pcm16(name: Option<&'static str>, channels: u8, rate: u32, samples: u32) -> Self {
        let len = samples as usize * usize::from(channels) * 2;
        let data = (0..len).map(|i| (i * 7 % 251) as u8).collect();

        Self {
            name,
            channels,
            rate,
            samples,
            data,
        }
    }
}

fn rate_flag(rate: u32) -> u64 {
    match rate {
        8000 => 1,
        22050 => 5,
        44100 => 8,
        48000 => 9,
        _ => panic!("no flag for {rate} Hz"),
    }
}

fn channel_flag(channels: u8) -> u64 {
    match channels {
        1 => 0,
        2 => 1,
        6 => 2,
        8 => 3,
        _ => panic!("no flag for {channels} channels"),
    }
}

/// A version 1 FSB5 container holding `sounds` in `format`.
pub(crate) fn fsb5(format: u32, sounds: &[TestSound]) -> Vec<u8> {
    let mut headers = Vec::new();
    let mut data = Vec::new();

    for sound in sounds {
        let offset = data.len() as u64;
        let header = rate_flag(sound.rate) << 1
            | channel_flag(sound.channels) << 5
            | (offset / 32) << 7
            | u64::from(sound.samples) << 34;
        headers.extend(header.to_le_bytes());

        data.extend(&sound.data);
        data.resize(data.len().next_multiple_of(32), 0);
    }

    let mut names = Vec::new();
    if sounds.iter().any(|sound| sound.name.is_some()) {
        let mut strings = Vec::new();
        for sound in sounds {
            let offset = (sounds.len() * 4 + strings.len()) as u32;
            names.extend(offset.to_le_bytes());
            strings.extend(sound.name.unwrap_or("").as_bytes());
            strings.push(0);
        }
        names.extend(strings);
    }

    let mut container = b"FSB5".to_vec();
    for field in [
        1,
        sounds.len() as u32,
        headers.len() as u32,
        names.len() as u32,
        data.len() as u32,
        format,
    ] {
        container.extend(field.to_le_bytes());
    }
    container.resize(60, 0);
    container.extend(headers);
    container.extend(names);
    container.extend(data);
    container
}

/// A bank-like blob: a header followed by `containers`, each preceded by filler.
pub(crate) fn bank(containers: &[Vec<u8>]) -> Vec<u8> {
    let mut blob = b"RIFF\0\0\0\0FEV FMT ".to_vec();
    for container in containers {
        blob.extend(b"SND pad!\0\0\0");
        blob.extend(container);
    }
    blob.extend(b"LIST");
    blob
}

/// Offsets at which [`bank`] places each container.
pub(crate) fn bank_offsets(containers: &[Vec<u8>]) -> Vec<u64> {
    let mut offsets = Vec::new();
    let mut position = 16;
    for container in containers {
        position += 11;
        offsets.push(position as u64);
        position += container.len();
    }
    offsets
}

pub(crate) fn write(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    place(&path, contents);
    path
}

pub(crate) fn place(path: &Path, contents: &[u8]) {
    fs::write(path, contents).unwrap();
}
