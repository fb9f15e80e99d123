//! Spherical-harmonic synthesis onto the HEALPix grid
//!
//! Spin-weighted harmonics use
//!
//! ```text
//! ₛY_ℓm(θ, φ) = (−1)^s √((2ℓ+1)/4π) d^ℓ_{m,−s}(θ) e^{imφ}
//! ```
//!
//! which reduces to the usual Condon–Shortley Y_ℓm for s = 0. Each ring is
//! synthesized independently: the Legendre-like sums F_m(θ) are folded into
//! the ring's Fourier bins and a single inverse FFT produces the pixel values.

use crate::healpix::{self, HealpixError, RingInfo};
use crate::sky::alm::{Alm, SkyAlm};
use crate::sky::wigner::WignerRecurrence;
use log::debug;
use ndarray::Array2;
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

/// Complex spin-s coefficients for −ℓ ≤ m ≤ ℓ, ℓ ≤ ℓmax.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinAlm {
    lmax: usize,
    spin: i64,
    data: Vec<Complex64>,
}

impl SpinAlm {
    pub fn zeros(lmax: usize, spin: i64) -> Self {
        Self {
            lmax,
            spin,
            data: vec![Complex64::new(0.0, 0.0); (lmax + 1) * (lmax + 1)],
        }
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    pub fn spin(&self) -> i64 {
        self.spin
    }

    pub fn get(&self, ell: usize, m: i64) -> Complex64 {
        self.data[Self::full_index(ell, m)]
    }

    pub fn set(&mut self, ell: usize, m: i64, value: Complex64) {
        self.data[Self::full_index(ell, m)] = value;
    }

    fn full_index(ell: usize, m: i64) -> usize {
        debug_assert!(m.unsigned_abs() as usize <= ell);
        ((ell * ell + ell) as i64 + m) as usize
    }

    /// Spin-2 coefficients of P = Q + iU from E and B modes.
    ///
    /// ₊₂a_ℓm = −(E_ℓm + iB_ℓm); negative orders follow from Q and U being
    /// real: ₊₂a_ℓ,−m = (−1)^m · (−(E*_ℓm + iB*_ℓm)).
    pub fn from_eb(e: &Alm, b: &Alm) -> Self {
        let lmax = e.lmax().min(b.lmax());
        let mut out = Self::zeros(lmax, 2);
        let i = Complex64::new(0.0, 1.0);
        for ell in 2..=lmax {
            for m in 0..=ell {
                let (elm, blm) = (e.get(ell, m), b.get(ell, m));
                out.set(ell, m as i64, -(elm + i * blm));
                if m > 0 {
                    let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
                    out.set(ell, -(m as i64), -(elm.conj() + i * blm.conj()) * sign);
                }
            }
        }
        out
    }
}

/// Per-order coefficients pre-multiplied by the harmonic normalization.
struct OrderTerm {
    m: i64,
    lmin: usize,
    rec: WignerRecurrence,
    weighted: Vec<Complex64>,
}

fn normalization(lmax: usize) -> Vec<f64> {
    (0..=lmax)
        .map(|ell| ((2 * ell + 1) as f64 / (4.0 * PI)).sqrt())
        .collect()
}

fn plan_rings(rings: &[RingInfo]) -> HashMap<usize, Arc<dyn Fft<f64>>> {
    let mut planner = FftPlanner::<f64>::new();
    let mut plans = HashMap::new();
    for ring in rings {
        plans
            .entry(ring.npix)
            .or_insert_with(|| planner.plan_fft_inverse(ring.npix));
    }
    plans
}

/// Evaluate Σ_m F_m(θ) e^{imφ} on every ring.
///
/// With `hermitian` set, each m > 0 term is accompanied by its complex
/// conjugate, which is how a real field stored for m ≥ 0 is expanded.
fn synthesize_rings(nside: usize, terms: &[OrderTerm], hermitian: bool) -> Vec<Complex64> {
    let rings = healpix::rings(nside);
    let plans = plan_rings(&rings);

    let ring_values: Vec<(usize, Vec<Complex64>)> = rings
        .par_iter()
        .map(|ring| {
            let n = ring.npix;
            let mut bins = vec![Complex64::new(0.0, 0.0); n];
            for term in terms {
                let mut fm = Complex64::new(0.0, 0.0);
                term.rec
                    .for_each(ring.cos_theta, ring.sin_theta, |ell, d| {
                        fm += term.weighted[ell - term.lmin] * d;
                    });
                let phase = fm * Complex64::from_polar(1.0, term.m as f64 * ring.phi0);
                let k = term.m.rem_euclid(n as i64) as usize;
                bins[k] += phase;
                if hermitian && term.m > 0 {
                    bins[(n - k) % n] += phase.conj();
                }
            }
            if let Some(plan) = plans.get(&n) {
                plan.process(&mut bins);
            }
            (ring.start_pix, bins)
        })
        .collect();

    let mut map = vec![Complex64::new(0.0, 0.0); healpix::nside2npix(nside)];
    for (start, values) in ring_values {
        map[start..start + values.len()].copy_from_slice(&values);
    }
    map
}

/// Scalar synthesis of a real field.
pub fn alm2map(alm: &Alm, nside: usize) -> Result<Vec<f64>, HealpixError> {
    healpix::check_nside(nside)?;
    let lmax = alm.lmax();
    let norm = normalization(lmax);
    debug!("alm2map: lmax={lmax} nside={nside}");

    let terms: Vec<OrderTerm> = (0..=lmax)
        .map(|m| OrderTerm {
            m: m as i64,
            lmin: m,
            rec: WignerRecurrence::new(m as i64, 0, lmax),
            weighted: (m..=lmax).map(|ell| alm.get(ell, m) * norm[ell]).collect(),
        })
        .collect();

    Ok(synthesize_rings(nside, &terms, true)
        .into_iter()
        .map(|v| v.re)
        .collect())
}

/// Complex synthesis of a spin-s field f = Σ ₛa_ℓm ₛY_ℓm.
pub fn synthesize_spin(coeffs: &SpinAlm, nside: usize) -> Result<Vec<Complex64>, HealpixError> {
    healpix::check_nside(nside)?;
    let lmax = coeffs.lmax();
    let spin = coeffs.spin();
    let norm = normalization(lmax);
    let spin_sign = if spin.rem_euclid(2) == 0 { 1.0 } else { -1.0 };
    let lmax_i = lmax as i64;
    debug!("synthesize_spin: spin={spin} lmax={lmax} nside={nside}");

    let terms: Vec<OrderTerm> = (-lmax_i..=lmax_i)
        .map(|m| {
            let rec = WignerRecurrence::new(m, -spin, lmax);
            let lmin = rec.lmin();
            let weighted = (lmin..=lmax)
                .map(|ell| coeffs.get(ell, m) * norm[ell] * spin_sign)
                .collect();
            OrderTerm {
                m,
                lmin,
                rec,
                weighted,
            }
        })
        .filter(|term| term.lmin <= lmax)
        .collect();

    Ok(synthesize_rings(nside, &terms, false))
}

/// Complex polarization map P = Q + iU.
pub fn alm2map_spin2(e: &Alm, b: &Alm, nside: usize) -> Result<Vec<Complex64>, HealpixError> {
    synthesize_spin(&SpinAlm::from_eb(e, b), nside)
}

/// Q and U maps from E and B modes.
pub fn alm2map_pol(e: &Alm, b: &Alm, nside: usize) -> Result<(Vec<f64>, Vec<f64>), HealpixError> {
    let p = alm2map_spin2(e, b, nside)?;
    Ok(p.iter().map(|v| (v.re, v.im)).unzip())
}

/// I, Q, U maps stacked as rows of a `(3, npix)` array.
pub fn sky_maps(sky: &SkyAlm, nside: usize) -> Result<Array2<f64>, HealpixError> {
    let npix = healpix::nside2npix(nside);
    healpix::check_nside(nside)?;
    let intensity = alm2map(&sky.t, nside)?;
    let (q, u) = alm2map_pol(&sky.e, &sky.b, nside)?;
    let mut maps = Array2::zeros((3, npix));
    for (row, values) in [intensity, q, u].into_iter().enumerate() {
        maps.row_mut(row)
            .iter_mut()
            .zip(values)
            .for_each(|(dst, v)| *dst = v);
    }
    Ok(maps)
}
