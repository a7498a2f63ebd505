// wavstream
// Copyright (c) 2024 The wavstream Developers.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `io` module provides the abstract pull-based byte source the decoder
//! reads and seeks through, plus the two concrete variants ([`FileSource`]
//! and [`MemorySource`]) that produce one.
//!
//! A [`ByteSource`] exposes exactly two operations: a short `read` (end of
//! stream and I/O error are not distinguished) and a signed, relative-only
//! `seek_relative`. This is deliberately the minimum surface the chunk
//! walker and random-access seek need; it maps onto any platform file API
//! without per-platform absolute-offset plumbing.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A pull-based source of bytes with relative seeking only.
///
/// Implementors decide what a short read or a failed seek means internally;
/// callers cannot distinguish end-of-stream from an I/O error through this
/// trait alone, by design.
pub trait ByteSource {
    /// Reads up to `buf.len()` bytes, returning the number actually read.
    /// A return value less than `buf.len()` signals end-of-stream or an
    /// error; the two are not distinguished.
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Seeks by a signed relative displacement from the current position.
    /// Returns `false` on failure, in which case the position is
    /// unspecified (but the source remains otherwise usable).
    fn seek_relative(&mut self, offset: i32) -> bool;
}

/// A [`ByteSource`] backed by a platform file handle opened for binary
/// reading.
///
/// Disposal is ordinary ownership: dropping a `FileSource` drops the
/// underlying [`File`], which closes the handle.
pub struct FileSource {
    file: File,
}

impl FileSource {
    /// Opens `path` for binary reading.
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        Ok(FileSource { file: File::open(path)? })
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        // A `Read` impl may return fewer bytes than requested even when more
        // data remains (e.g. a pipe); repeatedly fill to squeeze out the
        // short reads that aren't genuine end-of-stream, but still report
        // whatever was actually read on the first error.
        let mut total = 0;
        while total < buf.len() {
            match self.file.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(_) => break,
            }
        }
        total
    }

    fn seek_relative(&mut self, offset: i32) -> bool {
        self.file.seek(SeekFrom::Current(i64::from(offset))).is_ok()
    }
}

/// A [`ByteSource`] backed by a borrowed byte slice and a cursor.
///
/// The backing bytes are borrowed, not owned; dropping a `MemorySource`
/// disposes only the cursor, never the slice.
pub struct MemorySource<'s> {
    buf: &'s [u8],
    pos: usize,
}

impl<'s> MemorySource<'s> {
    /// Wraps `buf`, starting the cursor at offset 0.
    pub fn new(buf: &'s [u8]) -> Self {
        MemorySource { buf, pos: 0 }
    }
}

impl<'s> ByteSource for MemorySource<'s> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let remaining = self.buf.len() - self.pos;
        let n = buf.len().min(remaining);
        buf[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        n
    }

    fn seek_relative(&mut self, offset: i32) -> bool {
        let target = self.pos as i64 + i64::from(offset);
        self.pos = target.clamp(0, self.buf.len() as i64) as usize;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_up_to_remaining() {
        let data = [1u8, 2, 3, 4, 5];
        let mut src = MemorySource::new(&data);
        let mut out = [0u8; 3];
        assert_eq!(src.read(&mut out), 3);
        assert_eq!(out, [1, 2, 3]);

        let mut out2 = [0u8; 10];
        assert_eq!(src.read(&mut out2), 2);
        assert_eq!(&out2[..2], &[4, 5]);
        assert_eq!(src.read(&mut out2), 0);
    }

    #[test]
    fn memory_source_seek_relative_clamps() {
        let data = [0u8; 10];
        let mut src = MemorySource::new(&data);
        assert!(src.seek_relative(4));
        assert_eq!(src.pos, 4);
        assert!(src.seek_relative(-100));
        assert_eq!(src.pos, 0);
        assert!(src.seek_relative(100));
        assert_eq!(src.pos, 10);
    }
}
