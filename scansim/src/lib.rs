//! Ground-based CMB scan strategy simulation
//!
//! This crate simulates a telescope scanning the polarized microwave sky and
//! recovering I, Q and U maps from its detector timestreams:
//!
//! - [`sky`]: power spectrum tables, seeded harmonic realizations, Gaussian
//!   beam smoothing and spin-weighted synthesis onto HEALPix maps
//! - [`hardware`]: observing sites, beams and focal-plane layouts
//! - [`pointing`] and [`algo`]: sidereal time, horizon coordinates and
//!   detector quaternions
//! - [`scan`]: constant-elevation scans, instrument rotation, half-wave-plate
//!   modulation and TOD generation, chunked over the mission
//! - [`mapmaking`]: binning TOD into per-pixel normal equations and solving
//!   them with condition-number diagnostics
//! - [`sims`]: the end-to-end demonstration run

pub mod algo;
pub mod error;
pub mod hardware;
pub mod healpix;
pub mod mapmaking;
pub mod pointing;
pub mod render;
pub mod scan;
pub mod shared_args;
pub mod sims;
pub mod sky;

// Re-exports for easier access
pub use algo::Quaternion;
pub use error::SimError;
pub use hardware::{Beam, FocalPlane, Site};
pub use mapmaking::{solve_map, MapAccumulator, SolvedMaps};
pub use scan::{HwpModulation, RotationSchedule, ScanStrategy, SpinMaps};
pub use sims::{run_demo, DemoConfig, DemoResult, MapComparison};
pub use sky::{synalm, PowerSpectrum, SkyAlm};
