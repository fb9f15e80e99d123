//! Binned map-making: accumulate TOD into per-pixel normal equations and
//! solve them for I, Q and U

pub mod binner;
pub mod solve;

pub use binner::MapAccumulator;
pub use solve::{solve_map, SolvedMaps, DEFAULT_COND_THRESHOLD};

use crate::healpix::HealpixError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapMakingError {
    #[error(transparent)]
    Healpix(#[from] HealpixError),
    #[error("accumulator nside mismatch: {expected} vs {found}")]
    NsideMismatch { expected: usize, found: usize },
    #[error("pixel, angle and data lengths differ: {pix}, {psi}, {data}")]
    LengthMismatch { pix: usize, psi: usize, data: usize },
    #[error("pixel index {pix} out of range for {npix} pixels")]
    PixelOutOfRange { pix: usize, npix: usize },
    #[error("condition threshold must be at least 1, got {0}")]
    InvalidThreshold(f64),
}
