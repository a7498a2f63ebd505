// wavstream
// Copyright (c) 2024 The wavstream Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the error type used while parsing a RIFF/WAVE
//! header during [`crate::Decoder::open`].
//!
//! This type is internal plumbing only: per the decoder's propagation policy
//! (no out-of-band signaling once a [`crate::Decoder`] exists), it never
//! appears in the public `open`/`read`/`seek` signatures. `open` collapses it
//! to `None`; `read`/`seek` report failure as short counts or `false`.

use std::error::Error as StdError;
use std::fmt;

/// Reasons the RIFF/WAVE header could not be parsed.
#[derive(Debug)]
pub enum OpenError {
    /// The stream contained malformed or internally-inconsistent header data.
    Malformed(&'static str),
    /// An underlying read returned fewer bytes than requested while parsing the header.
    ShortRead,
    /// An underlying seek failed while skipping an unrecognized chunk.
    SeekFailed,
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            OpenError::Malformed(msg) => write!(f, "malformed wave header: {}", msg),
            OpenError::ShortRead => write!(f, "unexpected end of stream while reading header"),
            OpenError::SeekFailed => write!(f, "seek failed while skipping chunk"),
        }
    }
}

impl StdError for OpenError {}

pub type Result<T> = std::result::Result<T, OpenError>;

/// Convenience function to create a malformed-header error.
pub fn malformed_error<T>(desc: &'static str) -> Result<T> {
    Err(OpenError::Malformed(desc))
}
