// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

use super::errors::Error;

/// Big-endian cursor over a byte window.  Every read is checked against the
/// window bounds; running off the end is reported as truncation rather than
/// panicking.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn read_exact(&mut self, n: usize, what: &str) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| {
                Error::Truncated(format!(
                    "{what}: need {n} bytes at offset {}, {} available",
                    self.pos,
                    self.remaining()
                ))
            })?;

        let start = self.pos;
        self.pos = end;

        Ok(&self.buf[start..end])
    }

    pub fn read_u16(&mut self, what: &str) -> Result<u16, Error> {
        let b = self.read_exact(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self, what: &str) -> Result<u32, Error> {
        let b = self.read_exact(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }
}
