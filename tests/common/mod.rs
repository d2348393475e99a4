//! Common test utilities and fixtures.
//!
//! Each writer produces a minimal, valid audio file in a temporary
//! directory. Keep the returned `TempDir` alive for as long as the path
//! is used.
#![allow(dead_code)]

use std::path::PathBuf;

use tempfile::TempDir;

/// Writes `bytes` to `name` inside a fresh temporary directory.
pub fn write_fixture(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}

/// Canonical 44-byte-header PCM WAV.
pub fn wav(sample_rate: u32, channels: u16, bits: u16, payload: &[u8]) -> Vec<u8> {
    let block_align = channels * bits.div_ceil(8);
    let mut out = Vec::with_capacity(44 + payload.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + payload.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Uncompressed big-endian AIFF.
pub fn aiff(sample_rate: u32, channels: u16, bits: u16, payload: &[u8]) -> Vec<u8> {
    let frame_size = usize::from(channels) * usize::from(bits.div_ceil(8));
    let frames = (payload.len() / frame_size.max(1)) as u32;

    let mut body = Vec::new();
    body.extend_from_slice(b"AIFF");
    body.extend_from_slice(b"COMM");
    body.extend_from_slice(&18u32.to_be_bytes());
    body.extend_from_slice(&channels.to_be_bytes());
    body.extend_from_slice(&frames.to_be_bytes());
    body.extend_from_slice(&bits.to_be_bytes());
    body.extend_from_slice(&extended(sample_rate));
    body.extend_from_slice(b"SSND");
    body.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes()); // offset
    body.extend_from_slice(&0u32.to_be_bytes()); // block size
    body.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        body.push(0);
    }

    let mut out = Vec::with_capacity(8 + body.len());
    out.extend_from_slice(b"FORM");
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(&body);
    out
}

/// Sun AU with a 24-byte header. `encoding` 1 is µ-law, 3 is 16-bit PCM.
pub fn au(sample_rate: u32, channels: u32, encoding: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(24 + payload.len());
    out.extend_from_slice(b".snd");
    out.extend_from_slice(&24u32.to_be_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&encoding.to_be_bytes());
    out.extend_from_slice(&sample_rate.to_be_bytes());
    out.extend_from_slice(&channels.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// 80-bit IEEE extended encoding of an integer sample rate.
fn extended(rate: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    if rate == 0 {
        return out;
    }
    let bits = 32 - rate.leading_zeros();
    let exponent = 16383 + (bits - 1) as u16;
    let mantissa = u64::from(rate) << (64 - bits);
    out[0..2].copy_from_slice(&exponent.to_be_bytes());
    out[2..10].copy_from_slice(&mantissa.to_be_bytes());
    out
}

/// One second of 16-bit mono silence at 8 kHz, as a WAV file.
pub fn short_wav() -> (TempDir, PathBuf) {
    write_fixture("short.wav", &wav(8000, 1, 16, &vec![0u8; 16_000]))
}
