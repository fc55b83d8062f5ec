//! IBM-PC (System/34-style) track layout: ID and data fields delimited by `0xA1`-sync marks,
//! protected by CRC-16-CCITT, with an optional leading index mark.
//!
//! Grounded on the original `ibmpc.c` sector scanner and on the pack's `structure_parsers/
//! system34.rs`, whose gap/marker constant layout this module's [`crate::config::CodecConfig`]
//! mirrors.

use std::io::{Read, Seek, Write};

use crate::bitstream::{self, TrackReader, TrackWriter, A1_PATTERN, C2_PATTERN};
use crate::chs::Chs;
use crate::config::CodecConfig;
use crate::crc::{crc16, crc16_update, DATA_CRC_SEED, HEADER_CRC_SEED};
use crate::disk::{DiskImage, SECTOR_SIZE};
use crate::status::SectorStatus;

/// ID-field tag: marks a sector identifier.
pub const TAG_ID: u8 = 0xFE;
/// Data-field tag: marks a normal sector data block.
pub const TAG_DATA: u8 = 0xFB;
/// Index-field tag: marks the start-of-track preamble.
pub const TAG_INDEX: u8 = 0xFC;

/// One sector successfully (or partially) decoded off an IBM-PC track.
pub struct SectorRead {
    /// Zero-based sector index (`sector - 1` from the on-disk, 1-based identifier).
    pub sector: usize,
    pub data: [u8; SECTOR_SIZE],
    /// Bits consumed scanning for this sector's ID mark, for analysis/dump reporting.
    pub sector_gap_bits: usize,
    /// Bits consumed scanning from the ID mark to the data mark.
    pub data_gap_bits: usize,
    pub status: SectorStatus,
}

/// Scan forward for the next IBM-PC sync mark, returning its tag byte.
///
/// Matches on the fully-decoded prelude `00 A1 A1 A1` (ID/data field) or `00 C2 C2 C2` (index
/// field); `None` at end-of-track.
pub fn scan(reader: &mut TrackReader<'_, impl Read>, bits_read: &mut usize) -> Option<u8> {
    let mut history: u32 = 0x1371_3713;
    *bits_read = 0;
    loop {
        bitstream::advance_history(reader, &mut history, bits_read)?;
        if history == 0x00A1_A1A1 || history == 0x00C2_C2C2 {
            return Some(reader.read_byte());
        }
    }
}

/// Decode the next sector off an IBM-PC track, starting from the reader's current position.
///
/// Recoverable per-sector errors (header CRC mismatch, an ID mark that turns out to be followed
/// by another ID mark instead of data) are logged and the scan simply continues; they never
/// surface as an error to the caller. `None` means end-of-track, not failure.
pub fn read_sector(reader: &mut TrackReader<'_, impl Read>) -> Option<SectorRead> {
    let mut sector_gap_bits = 0usize;
    'scan: loop {
        let mut gap = 0usize;
        let tag = scan(reader, &mut gap)?;
        sector_gap_bits += gap;
        if tag != TAG_ID {
            log::debug!(
                "track {}: tag {:#04X} while scanning for sector ID, skipping",
                Chs::from_track(reader.track()),
                tag
            );
            continue 'scan;
        }

        'ident: loop {
            let cylinder = reader.read_byte();
            let head = reader.read_byte();
            let sector = reader.read_byte();
            let size = reader.read_byte();
            let stored_crc = (reader.read_byte() as u16) << 8 | reader.read_byte() as u16;

            let mut computed_crc = crc16_update(HEADER_CRC_SEED, cylinder);
            computed_crc = crc16_update(computed_crc, head);
            computed_crc = crc16_update(computed_crc, sector);
            computed_crc = crc16_update(computed_crc, size);

            if computed_crc != stored_crc {
                log::warn!(
                    "track {}: sector header CRC {:#06X}, expected {:#06X}, discarding",
                    Chs::from_track(reader.track()),
                    computed_crc,
                    stored_crc
                );
                continue 'scan;
            }

            let mut status = SectorStatus::empty();

            let header_track = cylinder as usize * 2 + head as usize;
            if header_track != reader.track() {
                status |= SectorStatus::WRONG_TRACK;
                log::warn!(
                    "track {}: sector {} header claims c/h {}/{}",
                    Chs::from_track(reader.track()),
                    sector,
                    cylinder,
                    head
                );
            }
            if size != 2 {
                status |= SectorStatus::UNEXPECTED_SIZE;
                log::warn!(
                    "track {}: sector {} has unexpected size code {}",
                    Chs::from_track(reader.track()),
                    sector,
                    size
                );
            }

            let mut data_gap_bits = 0usize;
            let data_tag = match scan(reader, &mut data_gap_bits) {
                Some(t) => t,
                None => return None,
            };
            if data_tag == TAG_ID {
                sector_gap_bits += data_gap_bits;
                log::debug!(
                    "track {}: sector {} lost its data field (found another ID mark), restarting",
                    Chs::from_track(reader.track()),
                    sector
                );
                continue 'ident;
            }
            if data_tag != TAG_DATA {
                log::warn!(
                    "track {}: sector {} has unexpected data-field tag {:#04X}",
                    Chs::from_track(reader.track()),
                    sector,
                    data_tag
                );
            }

            let mut data = [0u8; SECTOR_SIZE];
            reader.read_exact_lossy(&mut data);
            let stored_data_crc = (reader.read_byte() as u16) << 8 | reader.read_byte() as u16;

            let computed_data_crc = crc16(crc16_update(DATA_CRC_SEED, data_tag), &data);
            if computed_data_crc != stored_data_crc {
                status |= SectorStatus::DATA_MISMATCH;
                log::warn!(
                    "track {}: sector {} data CRC {:#06X}, expected {:#06X}",
                    Chs::from_track(reader.track()),
                    sector,
                    computed_data_crc,
                    stored_data_crc
                );
            }

            return Some(SectorRead {
                sector: sector as usize - 1,
                data,
                sector_gap_bits,
                data_gap_bits,
                status,
            });
        }
    }
}

/// Decode every IBM-PC track off `source` into a fresh [`DiskImage`].
///
/// The sector count starts at 10 and drops to 9 if track 0 never yields a tenth sector, matching
/// the original heuristic for telling 720K and 800K media apart without an out-of-band hint.
pub fn read_disk<R: Read + Seek>(source: &mut R, ntracks: usize) -> crate::error::Result<DiskImage> {
    let mut disk = DiskImage::new(ntracks, 10)?;
    for track in 0..ntracks {
        let mut reader = bitstream::seek_reader(source, track)?;
        let mut seen = vec![false; disk.nsectors_per_track()];
        while let Some(result) = read_sector(&mut reader) {
            if result.sector >= disk.nsectors_per_track() {
                log::error!(
                    "track {}: sector number {} exceeds {} sectors/track, skipping",
                    Chs::from_track(track),
                    result.sector + 1,
                    disk.nsectors_per_track()
                );
                continue;
            }
            seen[result.sector] = true;
            *disk.sector_mut(track, result.sector)? = result.data;
        }

        if track == 0 && !seen[9] {
            disk.set_nsectors_per_track(9);
            seen.truncate(9);
        }

        let missing: Vec<usize> = seen
            .iter()
            .enumerate()
            .filter(|(_, &present)| !present)
            .map(|(i, _)| i + 1)
            .collect();
        if !missing.is_empty() {
            log::error!("track {}: missing sector(s) {:?}", Chs::from_track(track), missing);
        }
    }
    Ok(disk)
}

fn write_ident(writer: &mut TrackWriter<'_, impl Write>, chs: Chs, sector: usize) -> std::io::Result<()> {
    let cylinder = chs.cylinder as u8;
    let head = chs.head;
    let sector_1based = (sector + 1) as u8;
    const SIZE_CODE: u8 = 2;

    writer.write_byte(cylinder)?;
    writer.write_byte(head)?;
    writer.write_byte(sector_1based)?;
    writer.write_byte(SIZE_CODE)?;

    let mut crc = crc16_update(HEADER_CRC_SEED, cylinder);
    crc = crc16_update(crc, head);
    crc = crc16_update(crc, sector_1based);
    crc = crc16_update(crc, SIZE_CODE);
    writer.write_byte((crc >> 8) as u8)?;
    writer.write_byte(crc as u8)
}

fn write_id_mark(writer: &mut TrackWriter<'_, impl Write>) -> std::io::Result<()> {
    for _ in 0..12 {
        writer.write_byte(0)?;
    }
    for _ in 0..3 {
        writer.write_mark_pattern(&A1_PATTERN)?;
    }
    Ok(())
}

fn write_index_mark(writer: &mut TrackWriter<'_, impl Write>) -> std::io::Result<()> {
    for _ in 0..12 {
        writer.write_byte(0)?;
    }
    for _ in 0..3 {
        writer.write_mark_pattern(&C2_PATTERN)?;
    }
    Ok(())
}

/// Encode one IBM-PC track from `sectors` (one 512-byte block per sector, in logical order).
pub fn write_track<W: Write + Seek>(
    sink: &mut W,
    track: usize,
    sectors: &[[u8; SECTOR_SIZE]],
    cfg: &CodecConfig,
) -> std::io::Result<()> {
    let chs = Chs::from_track(track);
    let nsectors = sectors.len();
    let mut writer = bitstream::seek_writer(sink, track)?;

    if !cfg.suppress_index_mark {
        writer.write_gap(80, cfg.gap_byte)?;
        write_index_mark(&mut writer)?;
        writer.write_byte(TAG_INDEX)?;
    }
    writer.write_gap(cfg.index_gap, cfg.gap_byte)?;

    for (s, block) in sectors.iter().enumerate() {
        if s > 0 {
            writer.write_gap(cfg.sector_gap(nsectors), cfg.gap_byte)?;
        }
        write_id_mark(&mut writer)?;
        writer.write_byte(TAG_ID)?;
        write_ident(&mut writer, chs, s)?;

        writer.write_gap(cfg.data_gap, cfg.gap_byte)?;
        write_id_mark(&mut writer)?;
        writer.write_byte(TAG_DATA)?;
        writer.write_bytes(block)?;

        let crc = crc16(crc16_update(DATA_CRC_SEED, TAG_DATA), block);
        writer.write_byte((crc >> 8) as u8)?;
        writer.write_byte(crc as u8)?;
    }

    writer.fill_track(cfg.gap_byte)
}

/// Encode an entire [`DiskImage`] in IBM-PC layout.
pub fn write_disk<W: Write + Seek>(sink: &mut W, disk: &DiskImage, cfg: &CodecConfig) -> crate::error::Result<()> {
    log::debug!(
        "writing {} tracks, {} sectors/track (IBM-PC)",
        disk.ntracks(),
        disk.nsectors_per_track()
    );
    for track in 0..disk.ntracks() {
        let mut sectors = Vec::with_capacity(disk.nsectors_per_track());
        for s in 0..disk.nsectors_per_track() {
            sectors.push(*disk.sector(track, s)?);
        }
        write_track(sink, track, &sectors, cfg)?;
    }
    Ok(())
}
