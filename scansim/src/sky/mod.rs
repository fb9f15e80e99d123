//! Sky model: power spectra, harmonic coefficients and map synthesis

pub mod alm;
pub mod sht;
pub mod spectrum;
pub mod wigner;

pub use alm::{gauss_beam, smooth, synalm, Alm, AlmError, BeamWindow, SkyAlm};
pub use sht::{alm2map, alm2map_pol, alm2map_spin2, sky_maps, synthesize_spin, SpinAlm};
pub use spectrum::{PowerSpectrum, SpectrumError, SpectrumLayout, SpectrumUnits};
