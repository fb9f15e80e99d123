//! Beam-convolved sky maps sampled by the detectors
//!
//! For symmetric beams only the spin-0 intensity and spin-2 polarization
//! components survive the convolution, so one intensity map and one complex
//! map P = Q + iU per distinct beam width are all the TOD needs.

use crate::scan::ScanError;
use crate::sky::{alm2map, alm2map_spin2, smooth, SkyAlm};
use log::info;
use rustfft::num_complex::Complex64;

#[derive(Debug, Clone)]
pub struct BeamSkyMaps {
    pub fwhm_arcmin: f64,
    pub intensity: Vec<f64>,
    /// Q + iU
    pub pol: Vec<Complex64>,
}

#[derive(Debug, Clone)]
pub struct SpinMaps {
    nside: usize,
    maps: Vec<BeamSkyMaps>,
}

impl SpinMaps {
    /// Smooth and synthesize the sky once for every beam width.
    pub fn compute(sky: &SkyAlm, fwhms: &[f64], nside: usize) -> Result<Self, ScanError> {
        let mut maps = Vec::with_capacity(fwhms.len());
        for &fwhm in fwhms {
            info!("Synthesizing sky for {fwhm:.1}' beam at nside {nside}");
            let smoothed = smooth(sky, fwhm)?;
            maps.push(BeamSkyMaps {
                fwhm_arcmin: fwhm,
                intensity: alm2map(&smoothed.t, nside)?,
                pol: alm2map_spin2(&smoothed.e, &smoothed.b, nside)?,
            });
        }
        Ok(Self { nside, maps })
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn for_fwhm(&self, fwhm_arcmin: f64) -> Result<&BeamSkyMaps, ScanError> {
        self.maps
            .iter()
            .find(|m| m.fwhm_arcmin == fwhm_arcmin)
            .ok_or(ScanError::MissingSpinMap(fwhm_arcmin))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BeamSkyMaps> {
        self.maps.iter()
    }
}
