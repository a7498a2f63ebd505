// wavstream
// Copyright (c) 2024 The wavstream Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
// Please see clippy.toml and Cargo.toml's [lints.clippy] table for the
// justification behind each of these.
#![allow(clippy::manual_range_contains)]
#![allow(clippy::excessive_precision)]

//! A streaming decoder for RIFF/WAVE audio.
//!
//! [`Decoder`] parses the container once at [`Decoder::open`], then serves
//! raw or converted sample reads and random access by sample index over a
//! pull-based [`ByteSource`]. Supported encodings are 8/16/24/32-bit
//! integer PCM, 32- and 64-bit IEEE float, and ITU-T G.711 A-law/μ-law;
//! anything else (notably Microsoft ADPCM) is refused rather than
//! guessed at.
//!
//! ```no_run
//! use wavstream::Decoder;
//!
//! let mut decoder = Decoder::open_file("sample.wav").expect("valid wave file");
//! let mut samples = vec![0.0f32; decoder.total_sample_count() as usize];
//! decoder.read_as_f32(samples.len() as u64, &mut samples);
//! ```

mod convert;
mod decoder;
mod errors;
mod format;
mod io;
mod primitives;

pub use convert::{
    alaw_to_f32, f32_ieee_to_f32, f64_ieee_to_f32, mulaw_to_f32, s16_pcm_to_f32, s24_pcm_to_f32,
    s32_pcm_to_f32, u8_pcm_to_f32,
};
pub use decoder::Decoder;
pub use format::{
    FormatDescriptor, WAVE_FORMAT_ADPCM, WAVE_FORMAT_ALAW, WAVE_FORMAT_EXTENSIBLE,
    WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_MULAW, WAVE_FORMAT_PCM,
};
pub use io::{ByteSource, FileSource, MemorySource};
