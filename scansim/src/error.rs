//! Crate-level error aggregating the per-module error types

use crate::hardware::InstrumentError;
use crate::healpix::HealpixError;
use crate::mapmaking::MapMakingError;
use crate::scan::ScanError;
use crate::sky::{AlmError, SpectrumError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("spectrum: {0}")]
    Spectrum(#[from] SpectrumError),
    #[error("sky synthesis: {0}")]
    Alm(#[from] AlmError),
    #[error("pixelization: {0}")]
    Healpix(#[from] HealpixError),
    #[error("instrument: {0}")]
    Instrument(#[from] InstrumentError),
    #[error("scan: {0}")]
    Scan(#[from] ScanError),
    #[error("map-making: {0}")]
    MapMaking(#[from] MapMakingError),
    #[error("rendering: {0}")]
    Viz(#[from] viz::VizError),
    #[error("configuration: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
