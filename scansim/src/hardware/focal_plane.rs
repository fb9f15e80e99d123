//! Focal-plane layouts
//!
//! A grid focal plane places one detector pair at every node of a square
//! `nrow × ncol` grid spanning the field of view. Each pair holds an `A`
//! detector at 0° and a `B` detector at 90° polarization angle.

use crate::algo::linspace;
use crate::hardware::beam::{Beam, Channel};
use crate::hardware::site::InstrumentError;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocalPlane {
    pub beams: Vec<Beam>,
}

impl FocalPlane {
    pub fn new(beams: Vec<Beam>) -> Self {
        Self { beams }
    }

    /// Square grid of detector pairs with offsets in [−fov/2, fov/2] degrees.
    ///
    /// Columns run along azimuth, rows along elevation. A single row or
    /// column sits on the boresight.
    pub fn grid(
        nrow: usize,
        ncol: usize,
        fov_deg: f64,
        fwhm_arcmin: f64,
    ) -> Result<Self, InstrumentError> {
        if nrow == 0 || ncol == 0 {
            return Err(InstrumentError::EmptyFocalPlane { nrow, ncol });
        }
        if !(fov_deg.is_finite() && fov_deg >= 0.0) {
            return Err(InstrumentError::InvalidFieldOfView(fov_deg));
        }

        let az_offsets = linspace(-fov_deg / 2.0, fov_deg / 2.0, ncol);
        let el_offsets = linspace(-fov_deg / 2.0, fov_deg / 2.0, nrow);
        let wide = nrow >= 100 || ncol >= 100;

        let mut beams = Vec::with_capacity(2 * nrow * ncol);
        for (col, &az) in az_offsets.iter().enumerate() {
            for (row, &el) in el_offsets.iter().enumerate() {
                let stem = if wide {
                    format!("r{row:03}c{col:03}")
                } else {
                    format!("r{row:02}c{col:02}")
                };
                beams.push(Beam::gaussian(
                    format!("{stem}A"),
                    az,
                    el,
                    0.0,
                    Channel::A,
                    fwhm_arcmin,
                )?);
                beams.push(Beam::gaussian(
                    format!("{stem}B"),
                    az,
                    el,
                    90.0,
                    Channel::B,
                    fwhm_arcmin,
                )?);
            }
        }
        Ok(Self { beams })
    }

    pub fn ndet(&self) -> usize {
        self.beams.len()
    }

    pub fn live_beams(&self) -> impl Iterator<Item = &Beam> {
        self.beams.iter().filter(|b| !b.dead)
    }

    /// Distinct beam widths among live detectors, ascending.
    pub fn distinct_fwhms(&self) -> Vec<f64> {
        let mut widths: Vec<f64> = self.live_beams().map(|b| b.fwhm_arcmin()).collect();
        widths.sort_by(|a, b| a.total_cmp(b));
        widths.dedup();
        widths
    }

    /// Mark ⌊fraction · ndet⌋ distinct detectors as dead.
    ///
    /// Returns the number of newly killed detectors.
    pub fn kill_channels(&mut self, fraction: f64, seed: u64) -> Result<usize, InstrumentError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(InstrumentError::InvalidKillFraction(fraction));
        }
        let count = (fraction * self.ndet() as f64).floor() as usize;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut killed = 0;
        for idx in rand::seq::index::sample(&mut rng, self.ndet(), count) {
            if !self.beams[idx].dead {
                self.beams[idx].dead = true;
                killed += 1;
            }
        }
        info!("Killed {killed} of {} detectors", self.ndet());
        Ok(killed)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, InstrumentError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| InstrumentError::Io(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| InstrumentError::Io(e.to_string()))
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), InstrumentError> {
        let text =
            serde_json::to_string_pretty(self).map_err(|e| InstrumentError::Io(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| InstrumentError::Io(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_grid_layout() {
        let fp = FocalPlane::grid(3, 3, 3.0, 40.0).unwrap();
        assert_eq!(fp.ndet(), 18);
        assert_eq!(fp.beams[0].name, "r00c00A");
        assert_eq!(fp.beams[1].name, "r00c00B");
        assert_eq!(fp.beams[2].name, "r01c00A");
        assert_relative_eq!(fp.beams[0].az_deg, -1.5);
        assert_relative_eq!(fp.beams[0].el_deg, -1.5);
        assert_relative_eq!(fp.beams[17].az_deg, 1.5);
        assert_relative_eq!(fp.beams[17].el_deg, 1.5);
        assert_eq!(fp.beams[1].polang_deg, 90.0);
        assert_eq!(fp.beams[1].channel, Channel::B);
        assert_eq!(fp.distinct_fwhms(), vec![40.0]);
    }

    #[test]
    fn test_single_detector_on_boresight() {
        let fp = FocalPlane::grid(1, 1, 10.0, 30.0).unwrap();
        assert_eq!(fp.ndet(), 2);
        assert_eq!(fp.beams[0].az_deg, 0.0);
        assert_eq!(fp.beams[0].el_deg, 0.0);
    }

    #[test]
    fn test_wide_grid_names() {
        let fp = FocalPlane::grid(100, 1, 1.0, 30.0).unwrap();
        assert_eq!(fp.beams[0].name, "r000c000A");
    }

    #[test]
    fn test_invalid_grids() {
        assert_eq!(
            FocalPlane::grid(0, 3, 3.0, 40.0),
            Err(InstrumentError::EmptyFocalPlane { nrow: 0, ncol: 3 })
        );
        assert_eq!(
            FocalPlane::grid(1, 1, -1.0, 40.0),
            Err(InstrumentError::InvalidFieldOfView(-1.0))
        );
    }

    #[test]
    fn test_kill_channels() {
        let mut fp = FocalPlane::grid(3, 3, 3.0, 40.0).unwrap();
        assert_eq!(fp.kill_channels(0.25, 1).unwrap(), 4);
        assert_eq!(fp.live_beams().count(), 14);

        let mut again = FocalPlane::grid(3, 3, 3.0, 40.0).unwrap();
        again.kill_channels(0.25, 1).unwrap();
        assert_eq!(fp, again);

        assert_eq!(
            fp.kill_channels(1.5, 0),
            Err(InstrumentError::InvalidKillFraction(1.5))
        );
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focal_plane.json");
        let mut fp = FocalPlane::grid(2, 2, 1.0, 20.0).unwrap();
        fp.beams[3].cross_pol = 0.05;
        fp.to_json_file(&path).unwrap();
        assert_eq!(FocalPlane::from_json_file(&path).unwrap(), fp);
        assert!(FocalPlane::from_json_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_json_rejects_invalid_beams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focal_plane.json");
        let mut fp = FocalPlane::grid(1, 1, 0.0, 20.0).unwrap();
        fp.beams[1].shape = crate::hardware::beam::BeamShape::Gaussian { fwhm_arcmin: -5.0 };
        fp.to_json_file(&path).unwrap();
        assert!(matches!(
            FocalPlane::from_json_file(&path),
            Err(InstrumentError::Io(msg)) if msg.contains("FWHM")
        ));
    }
}
