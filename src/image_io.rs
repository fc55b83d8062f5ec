//! Reading and writing the plain binary (non-MFM) disk image: a flat `[track][sector]` dump with
//! no framing of its own, the format `extract`/`create` convert to and from.

use std::io::{Read, Write};

use crate::disk::{DiskImage, MAX_TRACKS, SECTOR_SIZE};
use crate::error::{MfmError, Result};

/// Load a raw disk image, inferring the track count from `total_len / SECTOR_SIZE /
/// nsectors_per_track`.
pub fn read_raw<R: Read>(source: &mut R, total_len: u64, nsectors_per_track: usize) -> Result<DiskImage> {
    let track_len = SECTOR_SIZE as u64 * nsectors_per_track as u64;
    let ntracks = (total_len / track_len) as usize;
    if ntracks > MAX_TRACKS {
        return Err(MfmError::TooManyTracks(ntracks, MAX_TRACKS));
    }

    let mut disk = DiskImage::new(ntracks, nsectors_per_track)?;
    for track in 0..ntracks {
        for sector in 0..nsectors_per_track {
            let block = disk.sector_mut(track, sector)?;
            source.read_exact(block).map_err(|_| {
                MfmError::ShortRawImage(ntracks, nsectors_per_track, SECTOR_SIZE)
            })?;
        }
    }
    Ok(disk)
}

/// Write a disk image out as a flat binary dump, tracks and sectors in logical order.
pub fn write_raw<W: Write>(sink: &mut W, disk: &DiskImage) -> Result<()> {
    for track in 0..disk.ntracks() {
        for sector in 0..disk.nsectors_per_track() {
            sink.write_all(disk.sector(track, sector)?)?;
        }
    }
    Ok(())
}
