//! MFM half-bit serialization: the shared substrate both format engines scan and write through.

pub mod reader;
pub mod writer;

pub use reader::TrackReader;
pub use writer::TrackWriter;

use std::io::{Read, Seek, SeekFrom, Write};

/// Size of one track's reserved window in the MFM stream file.
pub const TRACK_BYTES: u64 = 12_800;
/// Number of half-bits encoded in one track window (`TRACK_BYTES * 8`).
pub const TRACK_HALFBITS: u32 = 102_400;

/// Seek `source` to the start of `track`'s window and return a fresh reader for it.
pub fn seek_reader<R: Read + Seek>(source: &mut R, track: usize) -> std::io::Result<TrackReader<'_, R>> {
    source.seek(SeekFrom::Start(track as u64 * TRACK_BYTES))?;
    Ok(TrackReader::new(source, track))
}

/// Seek `sink` to the start of `track`'s window and return a fresh writer for it.
pub fn seek_writer<W: Write + Seek>(sink: &mut W, track: usize) -> std::io::Result<TrackWriter<'_, W>> {
    sink.seek(SeekFrom::Start(track as u64 * TRACK_BYTES))?;
    Ok(TrackWriter::new(sink))
}

/// One step in a pre-recorded sync-mark half-bit pattern: either a normal clocked bit, or a raw
/// half-bit that bypasses the clock rule entirely (how sync marks create their encoding
/// violation).
#[derive(Copy, Clone, Debug)]
pub enum MarkHalfBit {
    Bit(u8),
    Raw(u8),
}

/// Half-bit pattern for one `0xA1` sync byte (used by both the IBM-PC ID/data marks and the
/// Amiga sector mark): the standard MFM clock rule is followed for six of the eight data bits,
/// but two half-bits in the middle are forced to `0,0` where the rule would otherwise insert a
/// clock pulse, producing a sequence that cannot occur in ordinary encoded data.
pub const A1_PATTERN: [MarkHalfBit; 9] = [
    MarkHalfBit::Bit(1),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Bit(1),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Raw(0),
    MarkHalfBit::Raw(0),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Bit(1),
];

/// Half-bit pattern for one `0xC2` sync byte, used only by the IBM-PC index mark.
pub const C2_PATTERN: [MarkHalfBit; 9] = [
    MarkHalfBit::Bit(1),
    MarkHalfBit::Bit(1),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Bit(0),
    MarkHalfBit::Raw(0),
    MarkHalfBit::Raw(0),
    MarkHalfBit::Bit(1),
    MarkHalfBit::Bit(0),
];

/// Fold one bit into a rolling 32-bit sync-mark history, applying the shared resynchronization
/// rule: a history of all ones cannot occur in valid MFM data, so it means the scanner is half a
/// bit-cell out of phase, and the fix is to swallow one extra half-bit and start over. Returns
/// `None` at end-of-track.
pub(crate) fn advance_history<R: Read>(
    reader: &mut TrackReader<'_, R>,
    history: &mut u32,
    bits_read: &mut usize,
) -> Option<()> {
    loop {
        let bit = reader.read_bit()?;
        *history = (*history << 1) | bit as u32;
        *bits_read += 1;

        if *history == 0xFFFF_FFFF {
            reader.read_halfbit();
            *history = 0;
            continue;
        }
        return Some(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writer_always_advances_to_full_track_width() {
        let mut buf = vec![0u8; TRACK_BYTES as usize];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            let mut writer = seek_writer(&mut cursor, 0).unwrap();
            writer.write_gap(100, 0x4E).unwrap();
            writer.fill_track(0x4E).unwrap();
            assert_eq!(writer.halfbit_count(), TRACK_HALFBITS);
        }
        assert_eq!(buf.len(), TRACK_BYTES as usize);
    }

    #[test]
    fn writes_beyond_track_width_are_dropped_silently() {
        let mut buf = vec![0u8; TRACK_BYTES as usize];
        let mut cursor = Cursor::new(&mut buf[..]);
        let mut writer = seek_writer(&mut cursor, 0).unwrap();
        writer.fill_track(0x4E).unwrap();
        // Further writes must not panic or grow the track.
        writer.write_byte(0xFF).unwrap();
        assert_eq!(writer.halfbit_count(), TRACK_HALFBITS);
    }

    #[test]
    fn reader_reports_end_of_track_past_halfbit_limit() {
        let buf = vec![0u8; TRACK_BYTES as usize];
        let mut cursor = Cursor::new(&buf[..]);
        let mut reader = seek_reader(&mut cursor, 0).unwrap();
        for _ in 0..TRACK_HALFBITS {
            assert!(reader.read_halfbit().is_some());
        }
        assert!(reader.read_halfbit().is_none());
    }

    #[test]
    fn a1_mark_round_trips_through_writer_and_reader() {
        let mut buf = vec![0u8; TRACK_BYTES as usize];
        {
            let mut cursor = Cursor::new(&mut buf[..]);
            let mut writer = seek_writer(&mut cursor, 0).unwrap();
            for _ in 0..12 {
                writer.write_byte(0).unwrap();
            }
            for _ in 0..3 {
                writer.write_mark_pattern(&A1_PATTERN).unwrap();
            }
            writer.write_byte(0xFE).unwrap();
            writer.fill_track(0x4E).unwrap();
        }
        let mut cursor = Cursor::new(&buf[..]);
        let mut reader = seek_reader(&mut cursor, 0).unwrap();
        let mut history = 0x1371_3713u32;
        let mut bits = 0usize;
        loop {
            advance_history(&mut reader, &mut history, &mut bits).expect("mark must be found");
            if history == 0x00A1_A1A1 {
                break;
            }
        }
        assert_eq!(reader.read_byte(), 0xFE);
    }
}
