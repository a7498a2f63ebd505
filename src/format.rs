// wavstream
// Copyright (c) 2024 The wavstream Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RIFF/WAVE header parsing: the "fmt " chunk and the chunk walk to "data".
//!
//! [`parse_header`] runs exactly once, during [`crate::Decoder::open`]. It
//! consumes the RIFF/WAVE container header, the "fmt " chunk (in any of its
//! three legal sizes), and then walks sub-chunks until it finds "data",
//! leaving the source positioned at the first byte of sample data.

use log::{debug, trace};

use crate::errors::{malformed_error, OpenError, Result};
use crate::io::ByteSource;
use crate::primitives::{read_guid, read_u16_le, read_u32_le};

/// Raw `formatTag` value for integer PCM.
pub const WAVE_FORMAT_PCM: u16 = 0x0001;
/// Raw `formatTag` value for Microsoft ADPCM (unsupported; see §4.5).
pub const WAVE_FORMAT_ADPCM: u16 = 0x0002;
/// Raw `formatTag` value for IEEE float (f32 or f64, per `bitsPerSample`).
pub const WAVE_FORMAT_IEEE_FLOAT: u16 = 0x0003;
/// Raw `formatTag` value for ITU-T G.711 A-law.
pub const WAVE_FORMAT_ALAW: u16 = 0x0006;
/// Raw `formatTag` value for ITU-T G.711 μ-law.
pub const WAVE_FORMAT_MULAW: u16 = 0x0007;
/// Raw `formatTag` value indicating the true tag is carried in `subFormat`.
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xFFFE;

const RIFF_HEADER_LEN: usize = 12;
const FMT_CHUNK_HEADER_AND_BODY_LEN: usize = 24;

/// The parsed "fmt " chunk, immutable once [`crate::Decoder::open`]
/// succeeds.
#[derive(Debug, Clone)]
pub struct FormatDescriptor {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// `cbSize`; present only when the chunk body is 40 bytes, always 22.
    pub extended_size: Option<u16>,
    pub valid_bits_per_sample: Option<u16>,
    pub channel_mask: Option<u32>,
    pub sub_format: Option<[u8; 16]>,
}

impl FormatDescriptor {
    /// The effective tag: if [`Self::format_tag`] is
    /// [`WAVE_FORMAT_EXTENSIBLE`], the first two bytes of `subFormat`;
    /// otherwise `format_tag` itself.
    pub fn translated_format_tag(&self) -> u16 {
        if self.format_tag == WAVE_FORMAT_EXTENSIBLE {
            match self.sub_format {
                Some(guid) => read_u16_le(&guid[0..2]),
                None => self.format_tag,
            }
        } else {
            self.format_tag
        }
    }
}

fn read_exact(source: &mut dyn ByteSource, buf: &mut [u8]) -> Result<()> {
    if source.read(buf) == buf.len() {
        Ok(())
    } else {
        Err(OpenError::ShortRead)
    }
}

/// Parses the RIFF/WAVE header and walks chunks up to (and including) the
/// "data" chunk header. On success, `source` is positioned at the first
/// byte of sample data, and the returned `u32` is the data chunk's declared
/// byte length.
pub fn parse_header(source: &mut dyn ByteSource) -> Result<(FormatDescriptor, u32)> {
    // Step 1: RIFF/WAVE container header.
    let mut riff_header = [0u8; RIFF_HEADER_LEN];
    read_exact(source, &mut riff_header)?;

    if &riff_header[0..4] != b"RIFF" {
        return malformed_error("missing \"RIFF\" marker");
    }
    let riff_len = read_u32_le(&riff_header[4..8]);
    if riff_len < 36 {
        return malformed_error("RIFF chunk size is less than the minimum of 36 bytes");
    }
    if &riff_header[8..12] != b"WAVE" {
        return malformed_error("missing \"WAVE\" marker");
    }

    // Step 2: "fmt " chunk header and base body.
    let mut fmt_header = [0u8; FMT_CHUNK_HEADER_AND_BODY_LEN];
    read_exact(source, &mut fmt_header)?;

    if &fmt_header[0..4] != b"fmt " {
        return malformed_error("missing \"fmt \" chunk");
    }
    let fmt_chunk_len = read_u32_le(&fmt_header[4..8]);
    if fmt_chunk_len != 16 && fmt_chunk_len != 18 && fmt_chunk_len != 40 {
        return malformed_error("\"fmt \" chunk size is not one of 16, 18, or 40");
    }

    // Step 3: base fields, bytes [8..24] of the header buffer.
    let format_tag = read_u16_le(&fmt_header[8..10]);
    let channels = read_u16_le(&fmt_header[10..12]);
    let sample_rate = read_u32_le(&fmt_header[12..16]);
    let avg_bytes_per_sec = read_u32_le(&fmt_header[16..20]);
    let block_align = read_u16_le(&fmt_header[20..22]);
    let bits_per_sample = read_u16_le(&fmt_header[22..24]);

    if channels == 0 {
        return malformed_error("channel count is 0");
    }

    let mut extended_size = None;
    let mut valid_bits_per_sample = None;
    let mut channel_mask = None;
    let mut sub_format = None;

    if fmt_chunk_len == 18 {
        // Step 4: skip the 2-byte cbSize, which is zero for a plain
        // extended PCM chunk. Extended fields stay zero-defaulted.
        if !source.seek_relative(2) {
            return Err(OpenError::SeekFailed);
        }
    } else if fmt_chunk_len == 40 {
        // Step 5: cbSize plus the 22-byte extension body.
        let mut ext = [0u8; 24];
        read_exact(source, &mut ext)?;

        let cb_size = read_u16_le(&ext[0..2]);
        if cb_size != 22 {
            return malformed_error("extended \"fmt \" cbSize is not 22");
        }
        extended_size = Some(cb_size);
        valid_bits_per_sample = Some(read_u16_le(&ext[2..4]));
        channel_mask = Some(read_u32_le(&ext[4..8]));
        sub_format = Some(read_guid(&ext[8..24]));
    }

    let fmt = FormatDescriptor {
        format_tag,
        channels,
        sample_rate,
        avg_bytes_per_sec,
        block_align,
        bits_per_sample,
        extended_size,
        valid_bits_per_sample,
        channel_mask,
        sub_format,
    };

    debug!(
        "wave format: tag={:#06x} translated={:#06x} channels={} rate={} bits={}",
        fmt.format_tag,
        fmt.translated_format_tag(),
        fmt.channels,
        fmt.sample_rate,
        fmt.bits_per_sample
    );

    // Step 7: chunk walk for "data".
    let data_chunk_len = loop {
        let mut chunk_header = [0u8; 8];
        read_exact(source, &mut chunk_header)?;

        if &chunk_header[0..4] == b"data" {
            break read_u32_le(&chunk_header[4..8]);
        }

        let chunk_len = read_u32_le(&chunk_header[4..8]);
        trace!(
            "skipping unknown chunk: tag={}, len={}",
            String::from_utf8_lossy(&chunk_header[0..4]),
            chunk_len
        );

        // Round up to the next 2-byte boundary (the WAVE pad byte).
        let mut remaining = u64::from(chunk_len) + (chunk_len & 1) as u64;
        while remaining > 0 {
            let step = remaining.min(i32::MAX as u64) as i32;
            if !source.seek_relative(step) {
                return Err(OpenError::SeekFailed);
            }
            remaining -= step as u64;
        }
    };

    Ok((fmt, data_chunk_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySource;

    fn push_chunk(buf: &mut Vec<u8>, tag: &[u8; 4], body: &[u8]) {
        buf.extend_from_slice(tag);
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(body);
        if body.len() % 2 == 1 {
            buf.push(0);
        }
    }

    fn fmt_body_16(format_tag: u16, channels: u16, sample_rate: u32, bits_per_sample: u16) -> Vec<u8> {
        let block_align = channels * (bits_per_sample / 8);
        let avg_bytes_per_sec = sample_rate * block_align as u32;
        let mut body = Vec::new();
        body.extend_from_slice(&format_tag.to_le_bytes());
        body.extend_from_slice(&channels.to_le_bytes());
        body.extend_from_slice(&sample_rate.to_le_bytes());
        body.extend_from_slice(&avg_bytes_per_sec.to_le_bytes());
        body.extend_from_slice(&block_align.to_le_bytes());
        body.extend_from_slice(&bits_per_sample.to_le_bytes());
        body
    }

    fn wrap_riff(fmt_body: &[u8], data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        push_chunk(&mut body, b"fmt ", fmt_body);
        push_chunk(&mut body, b"data", data);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn parses_fmt_size_16() {
        let fmt_body = fmt_body_16(WAVE_FORMAT_PCM, 1, 44100, 8);
        let bytes = wrap_riff(&fmt_body, &[0x00, 0xFF]);
        let mut src = MemorySource::new(&bytes);
        let (fmt, data_len) = parse_header(&mut src).expect("should parse");
        assert_eq!(fmt.channels, 1);
        assert_eq!(fmt.bits_per_sample, 8);
        assert_eq!(data_len, 2);
    }

    #[test]
    fn parses_fmt_size_18_skips_cb_size() {
        let mut fmt_body = fmt_body_16(WAVE_FORMAT_PCM, 1, 8000, 8);
        fmt_body.extend_from_slice(&0u16.to_le_bytes());
        let bytes = wrap_riff(&fmt_body, &[0x01]);
        let mut src = MemorySource::new(&bytes);
        let (fmt, data_len) = parse_header(&mut src).expect("should parse");
        assert_eq!(fmt.extended_size, None);
        assert_eq!(data_len, 1);
    }

    #[test]
    fn parses_fmt_size_40_extensible_pcm() {
        let mut fmt_body = fmt_body_16(WAVE_FORMAT_EXTENSIBLE, 1, 44100, 16);
        fmt_body.extend_from_slice(&22u16.to_le_bytes());
        fmt_body.extend_from_slice(&16u16.to_le_bytes());
        fmt_body.extend_from_slice(&0u32.to_le_bytes());
        let mut sub_format = [0u8; 16];
        sub_format[0..2].copy_from_slice(&WAVE_FORMAT_PCM.to_le_bytes());
        fmt_body.extend_from_slice(&sub_format);

        let bytes = wrap_riff(&fmt_body, &[0x00, 0x00, 0x00, 0x00]);
        let mut src = MemorySource::new(&bytes);
        let (fmt, _) = parse_header(&mut src).expect("should parse");
        assert_eq!(fmt.translated_format_tag(), WAVE_FORMAT_PCM);
    }

    #[test]
    fn skips_junk_chunk_before_data() {
        let fmt_body = fmt_body_16(WAVE_FORMAT_PCM, 1, 44100, 8);
        let mut body = Vec::new();
        push_chunk(&mut body, b"fmt ", &fmt_body);
        push_chunk(&mut body, b"JUNK", &[0u8; 5]);
        push_chunk(&mut body, b"data", &[0x7F]);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&((body.len() + 4) as u32).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(&body);

        let mut src = MemorySource::new(&out);
        let (_, data_len) = parse_header(&mut src).expect("should parse");
        assert_eq!(data_len, 1);
    }

    #[test]
    fn rejects_bad_riff_marker() {
        let mut bytes = vec![0u8; 12];
        bytes[0..4].copy_from_slice(b"XXXX");
        let mut src = MemorySource::new(&bytes);
        assert!(parse_header(&mut src).is_err());
    }

    #[test]
    fn rejects_short_riff_size() {
        let mut bytes = vec![0u8; 12];
        bytes[0..4].copy_from_slice(b"RIFF");
        bytes[4..8].copy_from_slice(&10u32.to_le_bytes());
        bytes[8..12].copy_from_slice(b"WAVE");
        let mut src = MemorySource::new(&bytes);
        assert!(parse_header(&mut src).is_err());
    }

    #[test]
    fn rejects_bad_fmt_chunk_size() {
        let fmt_body = vec![0u8; 12];
        let bytes = wrap_riff(&fmt_body, &[]);
        let mut src = MemorySource::new(&bytes);
        assert!(parse_header(&mut src).is_err());
    }

    #[test]
    fn zero_length_data_chunk_is_legal() {
        let fmt_body = fmt_body_16(WAVE_FORMAT_PCM, 1, 44100, 8);
        let bytes = wrap_riff(&fmt_body, &[]);
        let mut src = MemorySource::new(&bytes);
        let (_, data_len) = parse_header(&mut src).expect("should parse");
        assert_eq!(data_len, 0);
    }
}
