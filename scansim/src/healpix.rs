//! HEALPix pixelization in the RING ordering scheme
//!
//! Only the pieces the simulation needs: pixel ↔ angle conversion, ring
//! geometry for the harmonic synthesis, and a few count helpers. Angles are
//! colatitude θ ∈ [0, π] and longitude φ ∈ [0, 2π) in radians; rings are
//! numbered from 1 at the north pole to `4·nside − 1` at the south pole.

use std::f64::consts::{FRAC_PI_2, PI, TAU};
use thiserror::Error;

/// Largest nside accepted; keeps pixel indices comfortably inside `usize`
pub const MAX_NSIDE: usize = 1 << 13;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HealpixError {
    #[error("nside {0} must be a power of two between 1 and {MAX_NSIDE}")]
    InvalidNside(usize),
    #[error("map length {0} is not 12*nside^2 for a valid nside")]
    InvalidMapLength(usize),
}

/// Geometry of one iso-latitude ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingInfo {
    /// Index of the first pixel of the ring
    pub start_pix: usize,
    /// Number of pixels in the ring
    pub npix: usize,
    /// cos θ of the ring
    pub cos_theta: f64,
    /// sin θ of the ring
    pub sin_theta: f64,
    /// Longitude of the first pixel center
    pub phi0: f64,
}

impl RingInfo {
    /// Colatitude of the ring in radians
    pub fn theta(&self) -> f64 {
        self.sin_theta.atan2(self.cos_theta)
    }
}

/// Validate an nside value.
pub fn check_nside(nside: usize) -> Result<(), HealpixError> {
    if nside == 0 || nside > MAX_NSIDE || !nside.is_power_of_two() {
        return Err(HealpixError::InvalidNside(nside));
    }
    Ok(())
}

pub fn nside2npix(nside: usize) -> usize {
    12 * nside * nside
}

pub fn nside2nring(nside: usize) -> usize {
    4 * nside - 1
}

/// Recover nside from a map length.
pub fn npix2nside(npix: usize) -> Result<usize, HealpixError> {
    let nside = isqrt(npix / 12);
    if nside2npix(nside) != npix || check_nside(nside).is_err() {
        return Err(HealpixError::InvalidMapLength(npix));
    }
    Ok(nside)
}

/// Approximate pixel side length in radians.
pub fn pixel_resolution(nside: usize) -> f64 {
    (4.0 * PI / nside2npix(nside) as f64).sqrt()
}

fn isqrt(v: usize) -> usize {
    let mut r = (v as f64).sqrt() as usize;
    while r * r > v {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= v {
        r += 1;
    }
    r
}

/// Geometry of ring `ring` (1-based, counted from the north pole).
pub fn ring_info(nside: usize, ring: usize) -> RingInfo {
    debug_assert!(ring >= 1 && ring <= nside2nring(nside));
    let npix_total = nside2npix(nside);
    let nside_f = nside as f64;
    let fact2 = 4.0 / npix_total as f64;

    if ring < nside {
        // north polar cap
        let ir = ring;
        let z = 1.0 - (ir * ir) as f64 * fact2;
        let one_minus_z = (ir * ir) as f64 * fact2;
        RingInfo {
            start_pix: 2 * ir * (ir - 1),
            npix: 4 * ir,
            cos_theta: z,
            sin_theta: (one_minus_z * (2.0 - one_minus_z)).sqrt(),
            phi0: PI / (4 * ir) as f64,
        }
    } else if ring <= 3 * nside {
        let ncap = 2 * nside * (nside - 1);
        let z = (2 * nside) as f64 * 2.0 / (3.0 * nside_f) - (ring as f64) * 2.0 / (3.0 * nside_f);
        let shifted = (ring - nside) % 2 == 0;
        RingInfo {
            start_pix: ncap + (ring - nside) * 4 * nside,
            npix: 4 * nside,
            cos_theta: z,
            sin_theta: ((1.0 - z) * (1.0 + z)).sqrt(),
            phi0: if shifted { PI / (4.0 * nside_f) } else { 0.0 },
        }
    } else {
        // south polar cap, ir counted from the south pole
        let ir = 4 * nside - ring;
        let one_plus_z = (ir * ir) as f64 * fact2;
        RingInfo {
            start_pix: npix_total - 2 * ir * (ir + 1),
            npix: 4 * ir,
            cos_theta: one_plus_z - 1.0,
            sin_theta: (one_plus_z * (2.0 - one_plus_z)).sqrt(),
            phi0: PI / (4 * ir) as f64,
        }
    }
}

/// All rings of a map, north to south.
pub fn rings(nside: usize) -> Vec<RingInfo> {
    (1..=nside2nring(nside))
        .map(|ring| ring_info(nside, ring))
        .collect()
}

/// Pixel center as (θ, φ).
pub fn pix2ang_ring(nside: usize, pix: usize) -> (f64, f64) {
    let npix = nside2npix(nside);
    let ncap = 2 * nside * (nside - 1);
    let fact2 = 4.0 / npix as f64;

    if pix < ncap {
        let iring = (1 + isqrt(1 + 2 * pix)) >> 1;
        let iphi = pix + 1 - 2 * iring * (iring - 1);
        let one_minus_z = (iring * iring) as f64 * fact2;
        let theta = (1.0 - one_minus_z).acos();
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (theta, phi)
    } else if pix < npix - ncap {
        let ip = pix - ncap;
        let nl4 = 4 * nside;
        let iring = ip / nl4 + nside;
        let iphi = ip % nl4 + 1;
        let fodd = if (iring + nside) % 2 == 1 { 1.0 } else { 0.5 };
        let z = (2 * nside) as f64 * 2.0 / (3.0 * nside as f64)
            - iring as f64 * 2.0 / (3.0 * nside as f64);
        let phi = (iphi as f64 - fodd) * PI / (2.0 * nside as f64);
        (z.acos(), phi)
    } else {
        let ip = npix - pix;
        let iring = (1 + isqrt(2 * ip - 1)) >> 1;
        let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
        let one_plus_z = (iring * iring) as f64 * fact2;
        let theta = (one_plus_z - 1.0).acos();
        let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
        (theta, phi)
    }
}

/// Pixel containing the direction (θ, φ).
pub fn ang2pix_ring(nside: usize, theta: f64, phi: f64) -> usize {
    let (sin_theta, z) = theta.sin_cos();
    zphi2pix(nside, z, sin_theta.abs(), phi)
}

/// Pixel containing the unit vector `v` (need not be normalized).
pub fn vec2pix_ring(nside: usize, v: &nalgebra::Vector3<f64>) -> usize {
    let r = v.norm();
    let z = v[2] / r;
    let sin_theta = (v[0] * v[0] + v[1] * v[1]).sqrt() / r;
    let phi = v[1].atan2(v[0]);
    zphi2pix(nside, z, sin_theta, phi)
}

fn zphi2pix(nside: usize, z: f64, sin_theta: f64, phi: f64) -> usize {
    let nl4 = 4 * nside;
    let npix = nside2npix(nside);
    let ncap = 2 * nside * (nside - 1);
    let nside_f = nside as f64;
    let za = z.abs();
    let tt = phi.rem_euclid(TAU) * (2.0 / PI);
    // rem_euclid may return TAU itself for tiny negative input
    let tt = if tt >= 4.0 { 0.0 } else { tt };

    if za <= 2.0 / 3.0 {
        let temp1 = nside_f * (0.5 + tt);
        let temp2 = nside_f * z * 0.75;
        let jp = (temp1 - temp2) as i64;
        let jm = (temp1 + temp2) as i64;
        let ir = nside as i64 + 1 + jp - jm;
        let kshift = 1 - (ir & 1);
        let t1 = jp + jm - nside as i64 + kshift + 1 + 2 * nl4 as i64;
        let ip = ((t1 >> 1) as usize) % nl4;
        ncap + (ir as usize - 1) * nl4 + ip
    } else {
        let tp = tt - tt.floor();
        let tmp = if za < 0.99 {
            nside_f * (3.0 * (1.0 - za)).sqrt()
        } else {
            nside_f * sin_theta / ((1.0 + za) / 3.0).sqrt()
        };
        let jp = (tp * tmp) as usize;
        let jm = ((1.0 - tp) * tmp) as usize;
        let ir = (jp + jm + 1).min(nside);
        let ip = ((tt * ir as f64) as usize) % (4 * ir);
        if z > 0.0 {
            2 * ir * (ir - 1) + ip
        } else {
            npix - 2 * ir * (ir + 1) + ip
        }
    }
}

/// Pixel containing equatorial coordinates (radians).
pub fn radec2pix(nside: usize, ra: f64, dec: f64) -> usize {
    ang2pix_ring(nside, FRAC_PI_2 - dec, ra)
}

/// Pixel center in equatorial coordinates (radians), RA in [0, 2π).
pub fn pix2radec(nside: usize, pix: usize) -> (f64, f64) {
    let (theta, phi) = pix2ang_ring(nside, pix);
    (phi, FRAC_PI_2 - theta)
}

/// Unit vector of a pixel center.
pub fn pix2vec_ring(nside: usize, pix: usize) -> nalgebra::Vector3<f64> {
    let (theta, phi) = pix2ang_ring(nside, pix);
    let (st, ct) = theta.sin_cos();
    nalgebra::Vector3::new(st * phi.cos(), st * phi.sin(), ct)
}

/// Great-circle distance between two (θ, φ) directions, radians.
pub fn ang_dist(theta1: f64, phi1: f64, theta2: f64, phi2: f64) -> f64 {
    // haversine form stays accurate for nearby points
    let half_dt = 0.5 * (theta2 - theta1);
    let half_dp = 0.5 * (phi2 - phi1);
    let h = half_dt.sin().powi(2) + theta1.sin() * theta2.sin() * half_dp.sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_check_nside() {
        assert!(check_nside(1).is_ok());
        assert!(check_nside(256).is_ok());
        assert_eq!(check_nside(0), Err(HealpixError::InvalidNside(0)));
        assert_eq!(check_nside(12), Err(HealpixError::InvalidNside(12)));
    }

    #[test]
    fn test_ang_dist() {
        assert_relative_eq!(ang_dist(0.0, 0.0, PI, 0.0), PI, epsilon = 1e-12);
        assert_relative_eq!(ang_dist(FRAC_PI_2, 0.0, FRAC_PI_2, FRAC_PI_2), FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(ang_dist(1.0, 2.0, 1.0, 2.0), 0.0);
        // every pixel center is close to its neighbours at the pixel scale
        let nside = 16;
        let (t0, p0) = pix2ang_ring(nside, 1000);
        let (t1, p1) = pix2ang_ring(nside, 1001);
        assert!(ang_dist(t0, p0, t1, p1) < 2.0 * pixel_resolution(nside));
    }

    #[test]
    fn test_npix2nside() {
        assert_eq!(npix2nside(12).unwrap(), 1);
        assert_eq!(npix2nside(786_432).unwrap(), 256);
        assert!(npix2nside(100).is_err());
    }

    #[test]
    fn test_round_trip_every_pixel() {
        for nside in [1usize, 2, 4, 8, 16] {
            for pix in 0..nside2npix(nside) {
                let (theta, phi) = pix2ang_ring(nside, pix);
                assert_eq!(ang2pix_ring(nside, theta, phi), pix, "nside {nside} pix {pix}");
                let v = pix2vec_ring(nside, pix);
                assert_eq!(vec2pix_ring(nside, &v), pix);
            }
        }
    }

    #[test]
    fn test_rings_tile_the_sphere() {
        for nside in [1usize, 2, 8, 32] {
            let all = rings(nside);
            assert_eq!(all.len(), nside2nring(nside));
            let mut expected_start = 0;
            for info in &all {
                assert_eq!(info.start_pix, expected_start);
                expected_start += info.npix;
            }
            assert_eq!(expected_start, nside2npix(nside));
        }
    }

    #[test]
    fn test_ring_geometry_matches_pixel_centers() {
        let nside = 8;
        for info in rings(nside) {
            for (k, pix) in (info.start_pix..info.start_pix + info.npix).enumerate() {
                let (theta, phi) = pix2ang_ring(nside, pix);
                assert_relative_eq!(theta.cos(), info.cos_theta, epsilon = 1e-12);
                assert_relative_eq!(theta.sin(), info.sin_theta, epsilon = 1e-12);
                let expected_phi = info.phi0 + TAU * k as f64 / info.npix as f64;
                assert_relative_eq!(phi, expected_phi, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_poles_and_equator() {
        let nside = 16;
        assert!(ang2pix_ring(nside, 0.0, 0.0) < 4);
        assert!(ang2pix_ring(nside, PI, 0.0) >= nside2npix(nside) - 4);
        // negative longitudes wrap
        let a = ang2pix_ring(nside, 1.0, -0.1);
        let b = ang2pix_ring(nside, 1.0, TAU - 0.1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_radec_round_trip() {
        let nside = 32;
        let pix = radec2pix(nside, 350f64.to_radians(), -57.5f64.to_radians());
        let (ra, dec) = pix2radec(nside, pix);
        let res = pixel_resolution(nside);
        assert!((ra - 350f64.to_radians()).abs() < 2.0 * res);
        assert!((dec + 57.5f64.to_radians()).abs() < 2.0 * res);
    }
}
