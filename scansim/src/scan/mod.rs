//! Scan simulation: mission partitioning, instrument schedules, boresight
//! motion, TOD generation and on-the-fly binning

pub mod chunks;
pub mod schedule;
pub mod spinmaps;
pub mod strategy;
pub mod tod;

pub use chunks::{partition_mission, subpart_chunk, Chunk};
pub use schedule::{ElevationSteps, HwpModulation, RotationSchedule};
pub use spinmaps::{BeamSkyMaps, SpinMaps};
pub use strategy::{BoresightChunk, ConstantElScan, ScanResult, ScanStrategy};
pub use tod::DetectorTod;

use crate::healpix::HealpixError;
use crate::mapmaking::MapMakingError;
use crate::sky::AlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("mission duration must be positive, got {0} s")]
    InvalidDuration(f64),
    #[error("sample rate must be positive, got {0} Hz")]
    InvalidSampleRate(f64),
    #[error("mission contains no samples")]
    EmptyMission,
    #[error("chunk size must be at least one sample")]
    ZeroChunkSize,
    #[error("invalid scan parameters: {0}")]
    InvalidScan(String),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),
    #[error("focal plane has no live detectors")]
    NoLiveDetectors,
    #[error("no sky map for a {0} arcmin beam")]
    MissingSpinMap(f64),
    #[error("sky maps are at nside {found}, scan expects {expected}")]
    SpinMapNside { expected: usize, found: usize },
    #[error(transparent)]
    Healpix(#[from] HealpixError),
    #[error(transparent)]
    Alm(#[from] AlmError),
    #[error(transparent)]
    MapMaking(#[from] MapMakingError),
}
