//! Per-sector integrity flags, surfaced to library callers and the CLI's `info`/`dump` actions.
//!
//! The original tool only ever logged these conditions to its diagnostic stream; as a library we
//! also want callers to be able to inspect what, if anything, went wrong with a decoded sector
//! without scraping log output.

use bitflags::bitflags;

bitflags! {
    /// Flags describing integrity problems found while decoding a sector. An empty set means the
    /// sector decoded cleanly.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
    pub struct SectorStatus: u8 {
        /// Data-field CRC (IBM-PC) or data checksum (Amiga) did not match.
        const DATA_MISMATCH = 0b0000_0010;
        /// The sector's own header claims a different cylinder/head than the track it was found on.
        const WRONG_TRACK = 0b0000_0100;
        /// IBM-PC only: the ID field's size code was not the expected `2` (512 bytes).
        const UNEXPECTED_SIZE = 0b0000_1000;
    }
}

impl std::fmt::Display for SectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "ok");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                write!(f, "|")?;
            }
            write!(f, "{name}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_sector_displays_as_ok() {
        assert_eq!(SectorStatus::empty().to_string(), "ok");
    }

    #[test]
    fn combined_flags_display_joined() {
        let status = SectorStatus::DATA_MISMATCH | SectorStatus::WRONG_TRACK;
        assert_eq!(status.to_string(), "DATA_MISMATCH|WRONG_TRACK");
    }
}
