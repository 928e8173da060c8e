#![forbid(unsafe_code)]
//! Fixed-width integer encoding and a bounds-checked cursor for slot parsing.

pub mod be {
    //! Big-endian encoders for the length prefixes stored in slots.

    use core::convert::TryInto;

    /// Width of an encoded `u32`.
    pub const U32_LEN: usize = core::mem::size_of::<u32>();

    /// Reads a big-endian `u32` from the start of `src`, if long enough.
    pub fn get_u32_be(src: &[u8]) -> Option<u32> {
        let head: [u8; U32_LEN] = src.get(..U32_LEN)?.try_into().ok()?;
        Some(u32::from_be_bytes(head))
    }

    /// Appends a big-endian `u32` to `dst`.
    pub fn push_u32_be(dst: &mut Vec<u8>, v: u32) {
        dst.extend_from_slice(&v.to_be_bytes());
    }
}

pub mod buf {
    //! A slice-backed cursor that reports overreads instead of panicking.

    use core::fmt;

    use super::be;
    use crate::types::{MapError, Result};

    /// A cursor for reading bytes from a slice with offset tracking.
    pub struct Cursor<'a> {
        /// The underlying byte slice.
        pub buf: &'a [u8],
        /// Current read offset.
        pub off: usize,
    }

    impl<'a> Cursor<'a> {
        /// Creates a cursor positioned at `off`.
        pub fn at(buf: &'a [u8], off: usize) -> Self {
            Self { buf, off }
        }

        /// Takes the next `n` bytes, advancing the offset.
        pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
            let end = self
                .off
                .checked_add(n)
                .ok_or_else(|| MapError::Corruption("cursor offset overflow".into()))?;
            if end > self.buf.len() {
                return Err(MapError::Corruption(format!(
                    "slot field of {} bytes at offset {} runs past {}-byte slot",
                    n,
                    self.off,
                    self.buf.len()
                )));
            }
            let slice = &self.buf[self.off..end];
            self.off = end;
            Ok(slice)
        }

        /// Reads a big-endian `u32`, advancing the offset.
        pub fn take_u32(&mut self) -> Result<u32> {
            let raw = self.take(be::U32_LEN)?;
            be::get_u32_be(raw).ok_or_else(|| MapError::Corruption("short u32".into()))
        }

        /// Reads a `u32` length prefix followed by that many bytes.
        pub fn take_prefixed(&mut self) -> Result<&'a [u8]> {
            let len = self.take_u32()? as usize;
            self.take(len)
        }

        /// Advances past `n` bytes without returning them.
        pub fn skip(&mut self, n: usize) -> Result<()> {
            self.take(n).map(|_| ())
        }

        /// Returns the number of bytes remaining in the buffer.
        pub fn remaining(&self) -> usize {
            self.buf.len().saturating_sub(self.off)
        }
    }

    impl<'a> fmt::Debug for Cursor<'a> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Cursor")
                .field("off", &self.off)
                .field("remaining", &self.remaining())
                .finish()
        }
    }
}
