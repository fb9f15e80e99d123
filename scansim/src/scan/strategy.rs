//! Ground-based scan strategy
//!
//! [`ScanStrategy`] ties a site, a focal plane and the time-dependent
//! instrument schedules to a mission of `⌊duration · fsamp⌋` samples. The
//! mission is processed chunk by chunk: for each chunk the boresight performs
//! a constant-elevation scan centred on the azimuth and elevation of
//! (ra0, dec0) at the chunk's first sample; chunks are then split wherever
//! the instrument rotation changes, and every live detector is scanned over
//! each piece.

use crate::algo::Quaternion;
use crate::hardware::{FocalPlane, Site};
use crate::healpix;
use crate::mapmaking::MapAccumulator;
use crate::pointing::{boresight_quat, local_sidereal_time, radec_to_azel};
use crate::scan::chunks::{partition_mission, subpart_chunk, Chunk};
use crate::scan::schedule::{ElevationSteps, HwpModulation, RotationSchedule};
use crate::scan::spinmaps::SpinMaps;
use crate::scan::tod::{scan_detector, DetectorTod, TodContext};
use crate::scan::ScanError;
use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::{SystemTime, UNIX_EPOCH};

/// Constant-elevation scan with a triangle azimuth velocity profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConstantElScan {
    /// Scan centre, degrees
    pub ra0: f64,
    pub dec0: f64,
    /// Full azimuth width, degrees
    pub az_throw: f64,
    /// Degrees per second
    pub scan_speed: f64,
}

impl Default for ConstantElScan {
    fn default() -> Self {
        Self {
            ra0: -10.0,
            dec0: -57.5,
            az_throw: 90.0,
            scan_speed: 1.0,
        }
    }
}

impl ConstantElScan {
    /// Seconds for one full back-and-forth sweep.
    pub fn scan_period(&self) -> f64 {
        2.0 * self.az_throw / self.scan_speed
    }

    /// Azimuth offset from the scan centre after `t` seconds, radians.
    pub fn az_offset(&self, t: f64) -> f64 {
        if self.az_throw == 0.0 {
            return 0.0;
        }
        let phase = 2.0 * PI * t / self.scan_period();
        self.az_throw.to_radians() / PI * phase.sin().asin()
    }
}

/// Boresight orientation over one chunk.
#[derive(Debug, Clone)]
pub struct BoresightChunk {
    pub chunk: Chunk,
    pub az: Vec<f64>,
    pub el: Vec<f64>,
    pub quats: Vec<Quaternion>,
}

/// Outcome of a full mission scan.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub accumulator: Option<MapAccumulator>,
    /// Detector samples generated over all chunks
    pub detector_samples: usize,
    pub nchunks: usize,
}

#[derive(Debug, Clone)]
pub struct ScanStrategy {
    /// Mission length, seconds
    pub duration: f64,
    /// Samples per second
    pub sample_rate: f64,
    /// Unix time of the first sample
    pub ctime0: f64,
    pub site: Site,
    pub focal_plane: FocalPlane,
    pub nside_spin: usize,
    pub nside_out: usize,
    pub rotation: RotationSchedule,
    pub hwp: HwpModulation,
    pub el_steps: Option<ElevationSteps>,
    pub ces: ConstantElScan,
    pub chunk_size: usize,
}

impl ScanStrategy {
    /// Mission starting now at the South Pole with a single detector pair.
    pub fn new(duration: f64, sample_rate: f64) -> Result<Self, ScanError> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(ScanError::InvalidDuration(duration));
        }
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(ScanError::InvalidSampleRate(sample_rate));
        }
        let ctime0 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        let focal_plane = FocalPlane::grid(1, 1, 0.0, 30.0)
            .map_err(|e| ScanError::InvalidScan(e.to_string()))?;
        let nsamp = (duration * sample_rate).floor() as usize;
        Ok(Self {
            duration,
            sample_rate,
            ctime0,
            site: Site::default(),
            focal_plane,
            nside_spin: 256,
            nside_out: 256,
            rotation: RotationSchedule::default(),
            hwp: HwpModulation::None,
            el_steps: None,
            ces: ConstantElScan::default(),
            chunk_size: nsamp.max(1),
        })
    }

    pub fn with_ctime0(mut self, ctime0: f64) -> Self {
        self.ctime0 = ctime0;
        self
    }

    pub fn with_site(mut self, site: Site) -> Self {
        self.site = site;
        self
    }

    pub fn with_focal_plane(mut self, focal_plane: FocalPlane) -> Self {
        self.focal_plane = focal_plane;
        self
    }

    pub fn with_nsides(mut self, nside_spin: usize, nside_out: usize) -> Self {
        self.nside_spin = nside_spin;
        self.nside_out = nside_out;
        self
    }

    pub fn with_rotation(mut self, rotation: RotationSchedule) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_hwp(mut self, hwp: HwpModulation) -> Self {
        self.hwp = hwp;
        self
    }

    pub fn with_el_steps(mut self, steps: ElevationSteps) -> Self {
        self.el_steps = Some(steps);
        self
    }

    pub fn with_ces(mut self, ces: ConstantElScan) -> Self {
        self.ces = ces;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn nsamp(&self) -> usize {
        (self.duration * self.sample_rate).floor() as usize
    }

    /// Check the configuration as a whole before scanning.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.nsamp() == 0 {
            return Err(ScanError::EmptyMission);
        }
        if self.chunk_size == 0 {
            return Err(ScanError::ZeroChunkSize);
        }
        healpix::check_nside(self.nside_spin)?;
        healpix::check_nside(self.nside_out)?;

        let ces = &self.ces;
        if !(ces.az_throw.is_finite() && ces.az_throw >= 0.0) {
            return Err(ScanError::InvalidScan(format!(
                "azimuth throw {} deg",
                ces.az_throw
            )));
        }
        if ces.az_throw > 0.0 && !(ces.scan_speed.is_finite() && ces.scan_speed > 0.0) {
            return Err(ScanError::InvalidScan(format!(
                "scan speed {} deg/s",
                ces.scan_speed
            )));
        }

        if let Some(period) = self.rotation.period {
            if !(period.is_finite() && period * self.sample_rate >= 1.0) {
                return Err(ScanError::InvalidSchedule(format!(
                    "rotation period {period} s is shorter than one sample"
                )));
            }
            if self.rotation.angles.is_empty() {
                return Err(ScanError::InvalidSchedule(
                    "rotation needs at least one angle".to_string(),
                ));
            }
        }
        match &self.hwp {
            HwpModulation::None => {}
            HwpModulation::Continuous { freq, .. } => {
                if !freq.is_finite() {
                    return Err(ScanError::InvalidSchedule(format!("HWP frequency {freq} Hz")));
                }
            }
            HwpModulation::Stepped { freq, angles } => {
                if !(freq.is_finite() && *freq > 0.0) || angles.is_empty() {
                    return Err(ScanError::InvalidSchedule(format!(
                        "stepped HWP at {freq} Hz with {} angles",
                        angles.len()
                    )));
                }
            }
        }
        if let Some(steps) = &self.el_steps {
            if !(steps.period.is_finite() && steps.period > 0.0) || steps.steps.is_empty() {
                return Err(ScanError::InvalidSchedule(format!(
                    "elevation steps every {} s",
                    steps.period
                )));
            }
        }
        if self.focal_plane.live_beams().next().is_none() {
            return Err(ScanError::NoLiveDetectors);
        }
        Ok(())
    }

    pub fn partition_mission(&self, chunksize: usize) -> Result<Vec<Chunk>, ScanError> {
        partition_mission(self.nsamp(), chunksize)
    }

    pub fn subpart_chunk(&self, chunk: &Chunk) -> Vec<Chunk> {
        subpart_chunk(chunk, &self.rotation, self.sample_rate)
    }

    /// Beam-convolved sky maps for every live beam width.
    pub fn get_spinmaps(&self, sky: &crate::sky::SkyAlm) -> Result<SpinMaps, ScanError> {
        SpinMaps::compute(sky, &self.focal_plane.distinct_fwhms(), self.nside_spin)
    }

    /// Boresight motion over a chunk.
    pub fn constant_el_scan(&self, chunk: &Chunk) -> BoresightChunk {
        let lat = self.site.lat_rad();
        let lon = self.site.lon_rad();
        let t_start = chunk.start as f64 / self.sample_rate;
        let lst0 = local_sidereal_time(self.ctime0 + t_start, lon);
        let (az0, el0) = radec_to_azel(
            self.ces.ra0.to_radians(),
            self.ces.dec0.to_radians(),
            lat,
            lst0,
        );

        let n = chunk.len();
        let mut az = Vec::with_capacity(n);
        let mut el = Vec::with_capacity(n);
        let mut quats = Vec::with_capacity(n);
        for (local, sample) in chunk.range().enumerate() {
            let t = sample as f64 / self.sample_rate;
            let az_i = az0 + self.ces.az_offset(local as f64 / self.sample_rate);
            let el_step = self
                .el_steps
                .as_ref()
                .map_or(0.0, |steps| steps.offset_at(t).to_radians());
            let el_i = el0 + el_step;
            let lst = local_sidereal_time(self.ctime0 + t, lon);
            quats.push(boresight_quat(az_i, el_i, lat, lst));
            az.push(az_i);
            el.push(el_i);
        }
        BoresightChunk {
            chunk: *chunk,
            az,
            el,
            quats,
        }
    }

    /// Scan every live detector over one subchunk of a boresight chunk.
    pub fn scan_subchunk(
        &self,
        boresight: &BoresightChunk,
        sub: &Chunk,
        maps: &SpinMaps,
    ) -> Result<Vec<DetectorTod>, ScanError> {
        let rotation = self.rotation.angle_at(sub.start, self.sample_rate).to_radians();
        let ctx = TodContext {
            fsamp: self.sample_rate,
            nside_spin: self.nside_spin,
            nside_out: self.nside_out,
            hwp: &self.hwp,
        };
        let beams: Vec<_> = self.focal_plane.live_beams().collect();
        beams
            .par_iter()
            .map(|beam| {
                let beam_maps = maps.for_fwhm(beam.fwhm_arcmin())?;
                Ok(scan_detector(
                    &ctx,
                    &boresight.quats,
                    boresight.chunk.start,
                    sub,
                    rotation,
                    beam,
                    beam_maps,
                ))
            })
            .collect()
    }

    /// Scan the whole mission without progress reporting.
    pub fn scan_instrument(&self, maps: &SpinMaps, mapmaking: bool) -> Result<ScanResult, ScanError> {
        self.scan_instrument_with(maps, mapmaking, |_, _, _| {})
    }

    /// Scan the whole mission, calling `on_chunk(index, total, chunk)` as each
    /// chunk completes.
    pub fn scan_instrument_with<F>(
        &self,
        maps: &SpinMaps,
        mapmaking: bool,
        mut on_chunk: F,
    ) -> Result<ScanResult, ScanError>
    where
        F: FnMut(usize, usize, &Chunk),
    {
        self.validate()?;
        if maps.nside() != self.nside_spin {
            return Err(ScanError::SpinMapNside {
                expected: self.nside_spin,
                found: maps.nside(),
            });
        }

        let chunks = self.partition_mission(self.chunk_size)?;
        let nlive = self.focal_plane.live_beams().count();
        info!(
            "Scanning {} samples with {} live detectors in {} chunks",
            self.nsamp(),
            nlive,
            chunks.len()
        );

        let mut accumulator = if mapmaking {
            Some(MapAccumulator::new(self.nside_out)?)
        } else {
            None
        };
        let mut detector_samples = 0;

        for (idx, chunk) in chunks.iter().enumerate() {
            let boresight = self.constant_el_scan(chunk);
            for sub in self.subpart_chunk(chunk) {
                debug!(
                    "chunk {idx:03} samples {}..{} at rotation {:.1} deg",
                    sub.start,
                    sub.end,
                    self.rotation.angle_at(sub.start, self.sample_rate)
                );
                let tods = self.scan_subchunk(&boresight, &sub, maps)?;
                for tod in &tods {
                    detector_samples += tod.len();
                    if let Some(acc) = accumulator.as_mut() {
                        acc.add_samples(&tod.pix, &tod.psi, &tod.data, tod.pol_efficiency)?;
                    }
                }
            }
            on_chunk(idx, chunks.len(), chunk);
        }

        Ok(ScanResult {
            accumulator,
            detector_samples,
            nchunks: chunks.len(),
        })
    }
}
