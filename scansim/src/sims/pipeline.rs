//! The scan-and-map-make demonstration
//!
//! [`run_demo`] performs the whole chain on one configuration:
//!
//! 1. load the angular power spectrum table,
//! 2. draw a seeded sky realization,
//! 3. build the focal plane and scan strategy,
//! 4. scan the beam-smoothed sky and bin the TOD,
//! 5. solve the per-pixel normal equations,
//! 6. compare the recovered maps with the input sky smoothed by the same beam.
//!
//! With identical symmetric beams the binned solve sees exactly the smoothed
//! input at every pixel it can solve, so the residuals are at the level of
//! floating point round-off.

use crate::error::SimError;
use crate::hardware::{FocalPlane, Site};
use crate::mapmaking::{solve_map, SolvedMaps, DEFAULT_COND_THRESHOLD};
use crate::scan::{
    ConstantElScan, ElevationSteps, HwpModulation, RotationSchedule, ScanStrategy,
};
use crate::sky::{sky_maps, smooth, synalm, PowerSpectrum, SpectrumLayout, SpectrumUnits};
use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything needed to reproduce one demo run.
///
/// Missing fields in a JSON file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub spectrum_path: PathBuf,
    pub spectrum_layout: SpectrumLayout,
    pub spectrum_units: SpectrumUnits,
    pub lmax: usize,
    pub seed: u64,

    /// Detector-pair grid, ignored when `focal_plane_path` is set
    pub nrow: usize,
    pub ncol: usize,
    pub fov_deg: f64,
    pub fwhm_arcmin: f64,
    pub cross_pol: f64,
    pub focal_plane_path: Option<PathBuf>,
    /// Fraction of detectors marked dead, drawn with `seed`
    pub kill_fraction: f64,

    pub site: Site,
    /// Mission length, seconds
    pub duration: f64,
    pub sample_rate: f64,
    /// Unix time of the first sample; the current time when unset
    pub ctime0: Option<f64>,
    pub nside_spin: usize,
    pub nside_out: usize,

    pub scan: ConstantElScan,
    pub rotation: RotationSchedule,
    pub hwp: HwpModulation,
    pub el_steps: Option<ElevationSteps>,
    /// Seconds of data per processing chunk
    pub chunk_duration: f64,

    pub cond_threshold: f64,
    /// Distance from the ideal condition number of 2 counted as "near"
    pub cond_tolerance: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            spectrum_path: PathBuf::from("data/fiducial_lensed_cls.dat"),
            spectrum_layout: SpectrumLayout::Lensed,
            spectrum_units: SpectrumUnits::Dl,
            lmax: 700,
            seed: 25,
            nrow: 3,
            ncol: 3,
            fov_deg: 3.0,
            fwhm_arcmin: 40.0,
            cross_pol: 0.0,
            focal_plane_path: None,
            kill_fraction: 0.0,
            site: Site::SOUTH_POLE,
            duration: 24.0 * 3600.0,
            sample_rate: 12.01,
            ctime0: None,
            nside_spin: 256,
            nside_out: 256,
            scan: ConstantElScan::default(),
            rotation: RotationSchedule::periodic(3.0 * 3600.0, 0.0),
            hwp: HwpModulation::continuous(1.0),
            el_steps: None,
            chunk_duration: 3600.0,
            cond_threshold: DEFAULT_COND_THRESHOLD,
            cond_tolerance: 0.1,
        }
    }
}

impl DemoConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text)
            .map_err(|e| SimError::Config(format!("{}: {e}", path.as_ref().display())))
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<(), SimError> {
        let text = serde_json::to_string_pretty(self).map_err(|e| SimError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn load_spectrum(&self) -> Result<PowerSpectrum, SimError> {
        Ok(PowerSpectrum::from_file(
            &self.spectrum_path,
            self.spectrum_layout,
            self.spectrum_units,
            self.lmax,
        )?)
    }

    pub fn focal_plane(&self) -> Result<FocalPlane, SimError> {
        let mut focal_plane = match &self.focal_plane_path {
            Some(path) => FocalPlane::from_json_file(path)?,
            None => {
                let mut grid = FocalPlane::grid(self.nrow, self.ncol, self.fov_deg, self.fwhm_arcmin)?;
                if self.cross_pol != 0.0 {
                    grid.beams = grid
                        .beams
                        .into_iter()
                        .map(|beam| beam.with_cross_pol(self.cross_pol))
                        .collect::<Result<_, _>>()?;
                }
                grid
            }
        };
        if self.kill_fraction > 0.0 {
            focal_plane.kill_channels(self.kill_fraction, self.seed)?;
        }
        Ok(focal_plane)
    }

    /// Samples per processing chunk, at least one.
    pub fn chunk_size(&self) -> usize {
        ((self.chunk_duration * self.sample_rate).ceil() as usize).max(1)
    }

    /// One-line description of the focal plane that will actually be scanned.
    pub fn focal_plane_summary(&self) -> Result<String, SimError> {
        let focal_plane = self.focal_plane()?;
        let widths = focal_plane
            .distinct_fwhms()
            .iter()
            .map(|w| format!("{w:.1}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let source = match &self.focal_plane_path {
            Some(path) => path.display().to_string(),
            None => format!("{}x{} grid over {:.1} deg", self.nrow, self.ncol, self.fov_deg),
        };
        Ok(format!(
            "{} detectors ({} live) from {source}, FWHM {widths}",
            focal_plane.ndet(),
            focal_plane.live_beams().count()
        ))
    }

    /// Width of the beam shared by every live detector.
    ///
    /// The smoothed reference sky is only meaningful for a single width.
    pub fn reference_fwhm(focal_plane: &FocalPlane) -> Result<f64, SimError> {
        match focal_plane.distinct_fwhms().as_slice() {
            [fwhm] => Ok(*fwhm),
            [] => Err(SimError::Config("focal plane has no live detectors".to_string())),
            widths => Err(SimError::Config(format!(
                "live detectors have different beam widths {widths:?} arcmin, \
                 expected a single width to smooth the reference sky"
            ))),
        }
    }

    pub fn scan_strategy(&self) -> Result<ScanStrategy, SimError> {
        let mut strategy = ScanStrategy::new(self.duration, self.sample_rate)?
            .with_site(self.site)
            .with_focal_plane(self.focal_plane()?)
            .with_nsides(self.nside_spin, self.nside_out)
            .with_rotation(self.rotation.clone())
            .with_hwp(self.hwp.clone())
            .with_ces(self.scan)
            .with_chunk_size(self.chunk_size());
        if let Some(ctime0) = self.ctime0 {
            strategy = strategy.with_ctime0(ctime0);
        }
        if let Some(steps) = &self.el_steps {
            strategy = strategy.with_el_steps(steps.clone());
        }
        strategy.validate()?;
        Ok(strategy)
    }
}

/// How well the recovered maps match the smoothed input.
#[derive(Debug, Clone, PartialEq)]
pub struct MapComparison {
    pub npix: usize,
    /// Pixels with at least one hit
    pub scanned: usize,
    /// Scanned pixels with a finite solution
    pub solved: usize,
    /// Largest |recovered − input| over solved pixels for I, Q and U
    pub max_abs_diff: [f64; 3],
    pub rms_diff: [f64; 3],
    /// Fraction of scanned pixels whose condition number is within the
    /// tolerance of 2
    pub cond_near_min: f64,
    /// Pixels whose condition number is NaN
    pub undefined_cond: usize,
}

impl MapComparison {
    pub fn compute(input: &Array2<f64>, solved: &SolvedMaps, cond_tolerance: f64) -> Self {
        let npix = solved.npix();
        let scanned = solved.hits.iter().filter(|&&h| h > 0.0).count();
        let mut max_abs_diff = [0.0f64; 3];
        let mut sum_sq = [0.0f64; 3];
        let mut nsolved = 0;
        for pix in solved.valid_pixels() {
            nsolved += 1;
            for stokes in 0..3 {
                let diff = solved.maps[[stokes, pix]] - input[[stokes, pix]];
                max_abs_diff[stokes] = max_abs_diff[stokes].max(diff.abs());
                sum_sq[stokes] += diff * diff;
            }
        }
        let rms_diff = sum_sq.map(|s| if nsolved > 0 { (s / nsolved as f64).sqrt() } else { 0.0 });

        let near = solved
            .cond
            .iter()
            .zip(&solved.hits)
            .filter(|(c, &h)| h > 0.0 && (**c - 2.0).abs() <= cond_tolerance)
            .count();
        let cond_near_min = if scanned > 0 {
            near as f64 / scanned as f64
        } else {
            0.0
        };

        Self {
            npix,
            scanned,
            solved: nsolved,
            max_abs_diff,
            rms_diff,
            cond_near_min,
            undefined_cond: solved.cond.iter().filter(|c| c.is_nan()).count(),
        }
    }

    pub fn unscanned(&self) -> usize {
        self.npix - self.scanned
    }
}

/// Recovered minus input, NaN wherever the solve failed.
pub fn difference_maps(input: &Array2<f64>, solved: &SolvedMaps) -> Array2<f64> {
    &solved.maps - input
}

/// Output of one demo run.
#[derive(Debug, Clone)]
pub struct DemoResult {
    /// Input sky smoothed by the beam, `(3, npix)` at the output nside
    pub input: Array2<f64>,
    pub solved: SolvedMaps,
    pub comparison: MapComparison,
    pub detector_samples: usize,
    pub nchunks: usize,
}

/// Run the full chain, calling `on_chunk(index, total)` as scan chunks finish.
pub fn run_demo<F>(config: &DemoConfig, mut on_chunk: F) -> Result<DemoResult, SimError>
where
    F: FnMut(usize, usize),
{
    let start = Instant::now();
    let spectrum = config.load_spectrum()?;
    let sky = synalm(&spectrum, config.lmax, config.seed)?;
    info!(
        "Drew sky realization to lmax {} with seed {} ({:.1?})",
        config.lmax,
        config.seed,
        start.elapsed()
    );

    let strategy = config.scan_strategy()?;
    let fwhm_arcmin = DemoConfig::reference_fwhm(&strategy.focal_plane)?;
    let spinmaps = strategy.get_spinmaps(&sky)?;
    info!("Beam-convolved sky ready ({:.1?})", start.elapsed());

    let result = strategy.scan_instrument_with(&spinmaps, true, |idx, total, _| {
        on_chunk(idx, total)
    })?;
    let accumulator = result
        .accumulator
        .ok_or_else(|| SimError::Config("scan returned no binned maps".to_string()))?;
    info!(
        "Scanned {} detector samples in {} chunks ({:.1?})",
        result.detector_samples,
        result.nchunks,
        start.elapsed()
    );

    let solved = solve_map(&accumulator, config.cond_threshold)?;
    let input = sky_maps(&smooth(&sky, fwhm_arcmin)?, config.nside_out)?;
    let comparison = MapComparison::compute(&input, &solved, config.cond_tolerance);
    info!(
        "Solved {} of {} scanned pixels ({:.1?})",
        comparison.solved,
        comparison.scanned,
        start.elapsed()
    );

    Ok(DemoResult {
        input,
        solved,
        comparison,
        detector_samples: result.detector_samples,
        nchunks: result.nchunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_default_config_matches_demo() {
        let config = DemoConfig::default();
        assert_eq!(config.lmax, 700);
        assert_eq!(config.seed, 25);
        assert_eq!((config.nrow, config.ncol), (3, 3));
        assert_eq!(config.fwhm_arcmin, 40.0);
        assert_eq!(config.nside_out, 256);
        assert_eq!(config.sample_rate, 12.01);
        assert_eq!(config.chunk_size(), 43_236);
        assert_eq!(config.focal_plane().unwrap().ndet(), 18);
        assert_eq!(
            config.focal_plane_summary().unwrap(),
            "18 detectors (18 live) from 3x3 grid over 3.0 deg, FWHM 40.0'"
        );
    }

    #[test]
    fn test_config_json_round_trip_and_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        let config = DemoConfig {
            lmax: 64,
            ctime0: Some(1.6e9),
            hwp: HwpModulation::stepped(0.1),
            ..DemoConfig::default()
        };
        config.to_json_file(&path).unwrap();
        assert_eq!(DemoConfig::from_json_file(&path).unwrap(), config);

        std::fs::write(&path, r#"{"lmax": 32, "seed": 7}"#).unwrap();
        let partial = DemoConfig::from_json_file(&path).unwrap();
        assert_eq!(partial.lmax, 32);
        assert_eq!(partial.seed, 7);
        assert_eq!(partial.nside_out, 256);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            DemoConfig::from_json_file(&path),
            Err(SimError::Config(_))
        ));

        std::fs::write(&path, r#"{"site": {"lat_deg": 200, "lon_deg": 999}}"#).unwrap();
        assert!(matches!(
            DemoConfig::from_json_file(&path),
            Err(SimError::Config(msg)) if msg.contains("latitude 200")
        ));
    }

    #[test]
    fn test_reference_fwhm_follows_focal_plane_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("focal_plane.json");
        FocalPlane::grid(2, 1, 1.0, 600.0)
            .unwrap()
            .to_json_file(&path)
            .unwrap();
        let config = DemoConfig {
            fwhm_arcmin: 300.0,
            focal_plane_path: Some(path.clone()),
            ..DemoConfig::default()
        };
        let fp = config.focal_plane().unwrap();
        assert_eq!(DemoConfig::reference_fwhm(&fp).unwrap(), 600.0);
        let summary = config.focal_plane_summary().unwrap();
        assert!(summary.starts_with("4 detectors (4 live)"));
        assert!(summary.ends_with("FWHM 600.0'"));
        assert!(!summary.contains("300"));

        let mut mixed = FocalPlane::grid(1, 1, 0.0, 30.0).unwrap();
        mixed.beams[1].shape = crate::hardware::BeamShape::Gaussian { fwhm_arcmin: 45.0 };
        assert!(matches!(
            DemoConfig::reference_fwhm(&mixed),
            Err(SimError::Config(_))
        ));
        // a dead detector's width does not count
        mixed.beams[1].dead = true;
        assert_eq!(DemoConfig::reference_fwhm(&mixed).unwrap(), 30.0);
        mixed.beams[0].dead = true;
        assert!(DemoConfig::reference_fwhm(&mixed).is_err());
    }

    #[test]
    fn test_focal_plane_options() {
        let config = DemoConfig {
            cross_pol: 0.1,
            kill_fraction: 0.5,
            ..DemoConfig::default()
        };
        let fp = config.focal_plane().unwrap();
        assert_eq!(fp.live_beams().count(), 9);
        assert_relative_eq!(fp.beams[0].pol_efficiency(), 0.9 / 1.1, epsilon = 1e-12);
    }

    #[test]
    fn test_comparison_counts() {
        let npix = 12;
        let mut maps = Array2::from_elem((3, npix), f64::NAN);
        let mut cond = vec![f64::NAN; npix];
        let mut hits = vec![0.0; npix];
        // two solved pixels, one scanned but ill-conditioned
        for (pix, c) in [(0, 2.0), (1, 2.5)] {
            maps[[0, pix]] = 1.0 + 1e-9;
            maps[[1, pix]] = 0.5;
            maps[[2, pix]] = -0.5;
            cond[pix] = c;
            hits[pix] = 10.0;
        }
        cond[2] = f64::INFINITY;
        hits[2] = 1.0;
        let solved = SolvedMaps { maps, cond, hits };
        let mut input = Array2::zeros((3, npix));
        input.column_mut(0).assign(&ndarray::arr1(&[1.0, 0.5, -0.5]));
        input.column_mut(1).assign(&ndarray::arr1(&[1.0, 0.5, -0.25]));

        let cmp = MapComparison::compute(&input, &solved, 0.1);
        assert_eq!(cmp.scanned, 3);
        assert_eq!(cmp.solved, 2);
        assert_eq!(cmp.unscanned(), 9);
        assert_eq!(cmp.undefined_cond, 9);
        assert_relative_eq!(cmp.max_abs_diff[0], 1e-9, epsilon = 1e-15);
        assert_relative_eq!(cmp.max_abs_diff[2], 0.25, epsilon = 1e-15);
        assert_relative_eq!(cmp.cond_near_min, 1.0 / 3.0, epsilon = 1e-15);

        let diff = difference_maps(&input, &solved);
        assert!(diff[[0, 5]].is_nan());
        assert_relative_eq!(diff[[2, 1]], -0.25, epsilon = 1e-15);
    }
}
