//! Error types surfaced across crate boundaries.
//!
//! The codec itself never panics on malformed input; per-sector problems are logged through the
//! `log` facade and recovered from in place (see the module docs on [`crate::format`]). The errors
//! here are reserved for the fatal conditions in the design: a disk that structurally cannot be
//! represented, or an I/O failure on the underlying stream.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MfmError {
    #[error("an I/O error occurred reading or writing the disk image")]
    Io(#[from] std::io::Error),

    #[error("disk has {0} tracks, exceeding the maximum of {1}")]
    TooManyTracks(usize, usize),

    #[error("disk has {0} sectors per track, exceeding the maximum of {1}")]
    TooManySectors(usize, usize),

    #[error("track {0} is out of range for a disk with {1} tracks")]
    TrackOutOfRange(usize, usize),

    #[error("sector {0} is out of range for a track with {1} sectors")]
    SectorOutOfRange(usize, usize),

    #[error("raw image file is too short for {0} tracks of {1} sectors at {2} bytes each")]
    ShortRawImage(usize, usize, usize),

    #[error("could not determine disk format: no sync marks found before the end of track 0")]
    UnknownFormat,
}

pub type Result<T> = std::result::Result<T, MfmError>;
