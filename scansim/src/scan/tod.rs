//! Detector time-ordered data
//!
//! A detector with polarization efficiency γ pointing at pixel p with
//! effective polarization angle ψ reads
//!
//! ```text
//! d = I(p) + γ·Re(P(p)·e^{−2iψ}) = I + γ(Q cos 2ψ + U sin 2ψ)
//! ```
//!
//! where ψ already includes twice the half-wave-plate angle.

use crate::algo::Quaternion;
use crate::hardware::Beam;
use crate::healpix;
use crate::pointing::{beam_offset_quat, detector_quat, quat_to_radec_pa};
use crate::scan::chunks::Chunk;
use crate::scan::schedule::HwpModulation;
use crate::scan::spinmaps::BeamSkyMaps;
use rustfft::num_complex::Complex64;

/// One detector's samples over a subchunk, ready for binning.
#[derive(Debug, Clone)]
pub struct DetectorTod {
    pub name: String,
    /// Output-map pixel of each sample
    pub pix: Vec<usize>,
    /// Effective polarization angle of each sample, radians
    pub psi: Vec<f64>,
    pub data: Vec<f64>,
    pub pol_efficiency: f64,
}

impl DetectorTod {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Signal seen at one pixel and angle.
#[inline]
pub fn sample_signal(maps: &BeamSkyMaps, pix: usize, psi: f64, pol_efficiency: f64) -> f64 {
    let modulation = Complex64::from_polar(1.0, -2.0 * psi);
    maps.intensity[pix] + pol_efficiency * (maps.pol[pix] * modulation).re
}

/// Static inputs shared by every detector of a scan.
#[derive(Debug, Clone, Copy)]
pub struct TodContext<'a> {
    pub fsamp: f64,
    pub nside_spin: usize,
    pub nside_out: usize,
    pub hwp: &'a HwpModulation,
}

/// Scan one detector over `sub`, a subchunk of the boresight's chunk.
///
/// `boresight[k]` is the orientation at sample `first + k`; `rotation` is
/// the instrument angle in radians, constant over the subchunk.
pub fn scan_detector(
    ctx: &TodContext<'_>,
    boresight: &[Quaternion],
    first: usize,
    sub: &Chunk,
    rotation: f64,
    beam: &Beam,
    maps: &BeamSkyMaps,
) -> DetectorTod {
    let offset = beam_offset_quat(beam);
    let gamma = beam.pol_efficiency();
    let mut tod = DetectorTod {
        name: beam.name.clone(),
        pix: Vec::with_capacity(sub.len()),
        psi: Vec::with_capacity(sub.len()),
        data: Vec::with_capacity(sub.len()),
        pol_efficiency: gamma,
    };

    for sample in sub.range() {
        let q = detector_quat(&boresight[sample - first], rotation, &offset);
        let (ra, dec, pa) = quat_to_radec_pa(&q);
        let psi = pa + 2.0 * ctx.hwp.angle_at(sample as f64 / ctx.fsamp);
        let pix_spin = healpix::radec2pix(ctx.nside_spin, ra, dec);
        let pix_out = if ctx.nside_out == ctx.nside_spin {
            pix_spin
        } else {
            healpix::radec2pix(ctx.nside_out, ra, dec)
        };
        tod.pix.push(pix_out);
        tod.psi.push(psi);
        tod.data.push(sample_signal(maps, pix_spin, psi, gamma));
    }
    tod
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::Channel;
    use crate::pointing::boresight_quat;
    use approx::assert_relative_eq;

    fn uniform_maps(npix: usize, i: f64, q: f64, u: f64) -> BeamSkyMaps {
        BeamSkyMaps {
            fwhm_arcmin: 30.0,
            intensity: vec![i; npix],
            pol: vec![Complex64::new(q, u); npix],
        }
    }

    #[test]
    fn test_sample_signal() {
        let maps = uniform_maps(12, 2.0, 0.5, -0.25);
        let psi = 0.4f64;
        let expected = 2.0 + 0.5 * (2.0 * psi).cos() - 0.25 * (2.0 * psi).sin();
        assert_relative_eq!(sample_signal(&maps, 3, psi, 1.0), expected, epsilon = 1e-14);
        assert_relative_eq!(sample_signal(&maps, 3, psi, 0.0), 2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_hwp_shifts_angle_twice() {
        let maps = uniform_maps(healpix::nside2npix(4), 1.0, 1.0, 0.0);
        let beam = Beam::gaussian("r00c00A", 0.0, 0.0, 0.0, Channel::A, 30.0).unwrap();
        let bore: Vec<Quaternion> = (0..4)
            .map(|_| boresight_quat(0.5, 1.0, -1.0, 0.2))
            .collect();
        let hwp = HwpModulation::stepped(1.0);
        let ctx = TodContext {
            fsamp: 1.0,
            nside_spin: 4,
            nside_out: 2,
            hwp: &hwp,
        };
        let tod = scan_detector(&ctx, &bore, 10, &Chunk::new(10, 14), 0.0, &beam, &maps);
        assert_eq!(tod.len(), 4);
        assert!(tod.pix.iter().all(|&p| p < healpix::nside2npix(2)));
        for k in 1..4 {
            let diff = tod.psi[k] - tod.psi[k - 1];
            assert_relative_eq!(diff, 45f64.to_radians(), epsilon = 1e-12);
        }
        for (psi, d) in tod.psi.iter().zip(&tod.data) {
            assert_relative_eq!(*d, 1.0 + (2.0 * psi).cos(), epsilon = 1e-12);
        }
    }
}
