// wavstream
// Copyright (c) 2024 The wavstream Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The live decoding context: [`Decoder`], its constructors, and the
//! streaming read/seek state machine over the `data` chunk.

use std::path::Path;

use log::{debug, warn};

use crate::convert;
use crate::format::{self, parse_header, FormatDescriptor};
use crate::io::{ByteSource, FileSource, MemorySource};

/// Size of the scratch buffer used to stage raw sample bytes during
/// [`Decoder::read_as_f32`], matching the ~4 KiB sizing in the conversion
/// dispatch design.
const SCRATCH_BYTES: usize = 4096;

/// A live RIFF/WAVE decoding context, positioned somewhere inside the
/// `data` chunk.
///
/// `Decoder` has clear single-owner semantics: it owns its [`ByteSource`]
/// for the purpose of disposal (dropping the decoder drops the source,
/// which closes a file handle or simply releases cursor state for a
/// memory source) and holds no locks, since two concurrent operations on
/// one decoder are a contract violation rather than something this type
/// defends against.
pub struct Decoder<'s> {
    source: Box<dyn ByteSource + 's>,
    fmt: FormatDescriptor,
    translated_format_tag: u16,
    bytes_per_sample: u32,
    total_sample_count: u64,
    bytes_remaining: u64,
}

/// A function that decodes exactly one sample's worth of raw bytes into a
/// normalized `f32`. Selected once per [`Decoder::read_as_f32`] call from
/// the decoder's resolved format, never re-dispatched per sample.
type SampleConverter = fn(&[u8]) -> f32;

fn select_converter(translated_tag: u16, bytes_per_sample: u32) -> Option<SampleConverter> {
    match (translated_tag, bytes_per_sample) {
        (format::WAVE_FORMAT_PCM, 1) => Some(|b| convert::u8_pcm_to_f32(b[0])),
        (format::WAVE_FORMAT_PCM, 2) => Some(|b| convert::s16_pcm_to_f32([b[0], b[1]])),
        (format::WAVE_FORMAT_PCM, 3) => Some(|b| convert::s24_pcm_to_f32([b[0], b[1], b[2]])),
        (format::WAVE_FORMAT_PCM, 4) => {
            Some(|b| convert::s32_pcm_to_f32([b[0], b[1], b[2], b[3]]))
        }
        (format::WAVE_FORMAT_IEEE_FLOAT, 4) => {
            Some(|b| convert::f32_ieee_to_f32([b[0], b[1], b[2], b[3]]))
        }
        (format::WAVE_FORMAT_IEEE_FLOAT, 8) => Some(|b| {
            convert::f64_ieee_to_f32([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }),
        (format::WAVE_FORMAT_ALAW, 1) => Some(|b| convert::alaw_to_f32(b[0])),
        (format::WAVE_FORMAT_MULAW, 1) => Some(|b| convert::mulaw_to_f32(b[0])),
        // Microsoft ADPCM and anything else this crate has no converter for.
        _ => None,
    }
}

impl<'s> Decoder<'s> {
    /// Opens a decoder over an arbitrary [`ByteSource`]. Returns `None` on
    /// any parse failure: malformed header, short read, a failed seek
    /// while skipping a chunk, or a degenerate format (`channels == 0` is
    /// caught while parsing; `blockAlign / channels == 0` is caught here).
    pub fn open<S: ByteSource + 's>(source: S) -> Option<Decoder<'s>> {
        Self::open_boxed(Box::new(source))
    }

    fn open_boxed(mut source: Box<dyn ByteSource + 's>) -> Option<Decoder<'s>> {
        let (fmt, data_chunk_len) = match parse_header(&mut *source) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!("open failed: {}", err);
                return None;
            }
        };

        let bytes_per_sample = fmt.block_align as u32 / fmt.channels as u32;
        if bytes_per_sample == 0 {
            debug!("open failed: blockAlign / channels evaluates to 0");
            return None;
        }

        let translated_format_tag = fmt.translated_format_tag();
        let total_sample_count = u64::from(data_chunk_len) / u64::from(bytes_per_sample);

        Some(Decoder {
            source,
            translated_format_tag,
            bytes_per_sample,
            total_sample_count,
            bytes_remaining: u64::from(data_chunk_len),
            fmt,
        })
    }

    /// Opens a decoder over a file, taking ownership of a freshly opened
    /// file handle.
    pub fn open_file<P: AsRef<Path>>(path: P) -> Option<Decoder<'static>> {
        let source = FileSource::open(path).ok()?;
        Decoder::open(source)
    }

    /// Opens a decoder over a borrowed in-memory buffer. No copy is made.
    pub fn open_memory(bytes: &'s [u8]) -> Option<Decoder<'s>> {
        Decoder::open(MemorySource::new(bytes))
    }

    /// The parsed "fmt " chunk.
    pub fn format(&self) -> &FormatDescriptor {
        &self.fmt
    }

    /// The effective format tag after resolving `WAVE_FORMAT_EXTENSIBLE`.
    pub fn translated_format_tag(&self) -> u16 {
        self.translated_format_tag
    }

    /// Bytes occupied by one sample (one per-channel value), `blockAlign /
    /// channels`.
    pub fn bytes_per_sample(&self) -> u32 {
        self.bytes_per_sample
    }

    /// Total number of samples in the `data` chunk, fixed at open.
    pub fn total_sample_count(&self) -> u64 {
        self.total_sample_count
    }

    /// Bytes remaining to be read from the current position to the end of
    /// the `data` chunk.
    pub fn bytes_remaining(&self) -> u64 {
        self.bytes_remaining
    }

    /// Reads up to `out.len()` raw bytes, clamped to [`Self::bytes_remaining`].
    /// Returns 0 if `out` is empty.
    pub fn read_raw(&mut self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }
        let n = (out.len() as u64).min(self.bytes_remaining) as usize;
        let read = self.source.read(&mut out[..n]);
        self.bytes_remaining -= read as u64;
        read
    }

    /// Reads whole samples into `out`, clamped to both `samples_requested`
    /// and `out.len() / bytes_per_sample`. A partial trailing sample
    /// (fewer than `bytes_per_sample` bytes left in `out` or in the
    /// stream) is discarded, not returned.
    pub fn read(&mut self, samples_requested: u64, out: &mut [u8]) -> u64 {
        if samples_requested == 0 || out.is_empty() {
            return 0;
        }

        let bps = u64::from(self.bytes_per_sample);
        let cap_samples = out.len() as u64 / bps;
        let samples = samples_requested.min(cap_samples);
        let want_bytes = (samples * bps) as usize;

        let bytes_read = self.read_raw(&mut out[..want_bytes]);
        bytes_read as u64 / bps
    }

    /// Seeks to `sampleIndex`, clamped to the last valid sample. Always
    /// reports success: a failed intermediate `seekRelative` is logged but
    /// does not abort the loop or change the return value, matching the
    /// known weakness in the original seek algorithm (an open question
    /// deliberately left unresolved rather than silently fixed).
    pub fn seek(&mut self, sample_index: u64) -> bool {
        if self.total_sample_count == 0 {
            return true;
        }

        let bps = u64::from(self.bytes_per_sample);
        let clamped = sample_index.min(self.total_sample_count - 1);
        let current_byte_pos = self.total_sample_count * bps - self.bytes_remaining;
        let target_byte_pos = clamped * bps;

        let (forward, mut remaining) = if target_byte_pos >= current_byte_pos {
            (true, target_byte_pos - current_byte_pos)
        } else {
            (false, current_byte_pos - target_byte_pos)
        };

        while remaining > 0 {
            let step = remaining.min(i32::MAX as u64);
            let delta = if forward { step as i32 } else { -(step as i32) };

            if !self.source.seek_relative(delta) {
                warn!("seek_relative failed mid-seek; reporting success anyway (known weakness)");
            }

            if forward {
                self.bytes_remaining -= step;
            } else {
                self.bytes_remaining += step;
            }
            remaining -= step;
        }

        true
    }

    /// Reads up to `samples_requested` samples, converted to normalized
    /// `f32`, into `float_out`. Returns 0 for an encoding with no
    /// converter (e.g. Microsoft ADPCM) without consuming any bytes.
    ///
    /// Fast path: native IEEE `f32` samples (`translated_format_tag ==
    /// IEEE_FLOAT`, `bytes_per_sample == 4`) are the WAVE bit pattern as
    /// the target's own `f32` layout on a little-endian host, so the read
    /// lands directly in `float_out` via a safe `bytemuck` reinterpret of
    /// the caller's buffer as bytes, skipping the scratch buffer and the
    /// per-sample converter call entirely. On a big-endian host (or any
    /// other encoding) this falls back to the buffered path below, which
    /// dispatches a converter once per [`Decoder::read_as_f32`] call and
    /// decodes through a fixed scratch buffer.
    pub fn read_as_f32(&mut self, samples_requested: u64, float_out: &mut [f32]) -> u64 {
        if samples_requested == 0 || float_out.is_empty() {
            return 0;
        }

        #[cfg(target_endian = "little")]
        {
            if self.translated_format_tag == format::WAVE_FORMAT_IEEE_FLOAT && self.bytes_per_sample == 4 {
                let want = samples_requested.min(float_out.len() as u64) as usize;
                let out_bytes = bytemuck::cast_slice_mut::<f32, u8>(&mut float_out[..want]);
                return self.read(want as u64, out_bytes);
            }
        }

        let converter = match select_converter(self.translated_format_tag, self.bytes_per_sample) {
            Some(converter) => converter,
            None => return 0,
        };

        let bps = self.bytes_per_sample as usize;
        let want = samples_requested.min(float_out.len() as u64) as usize;
        let scratch_samples = (SCRATCH_BYTES / bps).max(1);

        let mut scratch = [0u8; SCRATCH_BYTES];
        let mut converted = 0usize;

        while converted < want {
            let batch = scratch_samples.min(want - converted);
            let batch_bytes = batch * bps;
            let bytes_read = self.read_raw(&mut scratch[..batch_bytes]);
            let samples_read = bytes_read / bps;

            for i in 0..samples_read {
                float_out[converted + i] = converter(&scratch[i * bps..(i + 1) * bps]);
            }
            converted += samples_read;

            if samples_read < batch {
                break;
            }
        }

        converted as u64
    }
}
