//! Half-bit, bit, and byte encoding over a single track window, including the deliberate
//! clock-rule violations used by sync marks.

use std::io::{self, Write};

use super::{MarkHalfBit, TRACK_HALFBITS};

/// Writes one track's worth of MFM half-bits into a byte sink.
///
/// Writes past [`TRACK_HALFBITS`] are silently dropped; callers are expected to call
/// [`TrackWriter::fill_track`] once they are done emitting records, to pad the track to its full
/// width with the gap byte.
pub struct TrackWriter<'a, W: Write> {
    sink: &'a mut W,
    halfbit: u32,
    shift_reg: u8,
    last_halfbit: u8,
}

impl<'a, W: Write> TrackWriter<'a, W> {
    pub(crate) fn new(sink: &'a mut W) -> Self {
        Self { sink, halfbit: 0, shift_reg: 0, last_halfbit: 0 }
    }

    pub fn halfbit_count(&self) -> u32 {
        self.halfbit
    }

    /// Write one raw half-bit, bypassing the MFM clock rule entirely. Sync marks are built from
    /// calls to this alongside [`TrackWriter::write_bit`] (see [`MarkHalfBit`]).
    pub fn write_halfbit(&mut self, val: u8) -> io::Result<()> {
        if self.halfbit >= TRACK_HALFBITS {
            return Ok(());
        }
        let val = val & 1;
        self.shift_reg = (self.shift_reg << 1) | val;
        self.last_halfbit = val;
        self.halfbit += 1;
        if self.halfbit % 8 == 0 {
            self.sink.write_all(&[self.shift_reg])?;
        }
        Ok(())
    }

    /// Write one logical bit, following the MFM clock rule: a `1` is always `01`; a `0` is `10`
    /// if the previous half-bit was `0`, else `00` (a clock pulse is only inserted between two
    /// zero bits).
    pub fn write_bit(&mut self, val: u8) -> io::Result<()> {
        if val & 1 != 0 {
            self.write_halfbit(0)?;
            self.write_halfbit(1)?;
        } else {
            let clock = u8::from(self.last_halfbit == 0);
            self.write_halfbit(clock)?;
            self.write_halfbit(0)?;
        }
        Ok(())
    }

    /// Write one byte, MSB first, through the clock-rule-respecting [`TrackWriter::write_bit`].
    pub fn write_byte(&mut self, val: u8) -> io::Result<()> {
        for i in (0..8).rev() {
            self.write_bit((val >> i) & 1)?;
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        for &b in data {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Write `n` copies of `val` through the normal clocked path; used for inter-record gaps.
    pub fn write_gap(&mut self, n: usize, val: u8) -> io::Result<()> {
        for _ in 0..n {
            self.write_byte(val)?;
        }
        Ok(())
    }

    /// Pad the remainder of the track with `val`, stopping exactly at the track's half-bit
    /// width.
    pub fn fill_track(&mut self, val: u8) -> io::Result<()> {
        while self.halfbit < TRACK_HALFBITS {
            self.write_byte(val)?;
        }
        Ok(())
    }

    /// Emit a sync-mark byte by replaying its pre-recorded half-bit pattern verbatim, violating
    /// the clock rule where the pattern calls for a raw half-bit.
    pub fn write_mark_pattern(&mut self, pattern: &[MarkHalfBit]) -> io::Result<()> {
        for op in pattern {
            match *op {
                MarkHalfBit::Bit(v) => self.write_bit(v)?,
                MarkHalfBit::Raw(v) => self.write_halfbit(v)?,
            }
        }
        Ok(())
    }
}
