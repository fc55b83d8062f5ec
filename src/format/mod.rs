//! Format engines: the two concrete track layouts the codec understands, plus detection between
//! them.
//!
//! Both engines share the [`crate::bitstream`] substrate and the same recovery philosophy —
//! per-sector problems are logged through the `log` facade and the scan simply continues (or, for
//! Amiga header sums, discards the sector) rather than surfacing as a hard error. Only conditions
//! that make a disk structurally unrepresentable (too many tracks, an unreadable stream) become an
//! [`crate::error::MfmError`].

pub mod amiga;
pub mod ibmpc;

use std::io::{Read, Seek};

use crate::bitstream;

/// Inspect the very start of a disk image and report whether it is Amiga-formatted.
///
/// Reads track 0 only, scanning for whichever of the two formats' sync marks appears first: an
/// IBM-PC disk always presents `00-A1-A1-A1` or `00-C2-C2-C2` ahead of any Amiga-style
/// `00-A1-A1-Fx`, so whichever pattern the rolling history matches first settles it. Returns
/// [`crate::error::MfmError::UnknownFormat`] if track 0 has no discernible sync mark at all.
pub fn detect_amiga<R: Read + Seek>(source: &mut R) -> crate::error::Result<bool> {
    let mut reader = bitstream::seek_reader(source, 0)?;
    let mut history: u32 = 0x1371_3713;
    let mut bits_read = 0usize;
    loop {
        if bitstream::advance_history(&mut reader, &mut history, &mut bits_read).is_none() {
            return Err(crate::error::MfmError::UnknownFormat);
        }
        if history == 0x00A1_A1A1 || history == 0x00C2_C2C2 {
            return Ok(false);
        }
        if history & 0xFFFF_FFF0 == 0x00A1_A1F0 {
            return Ok(true);
        }
    }
}
