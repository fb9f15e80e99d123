//! Spherical-harmonic coefficients and Gaussian sky realizations
//!
//! Coefficients are stored for m ≥ 0 only, in the HEALPix m-major order
//! `idx(ℓ, m) = m(2ℓmax + 1 − m)/2 + ℓ`. Negative orders follow from the
//! reality of the fields.

use crate::sky::spectrum::PowerSpectrum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rustfft::num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;
use thiserror::Error;

/// Relative slack allowed on TE² ≤ TT·EE before a spectrum is rejected
const PSD_TOLERANCE: f64 = 1e-10;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlmError {
    #[error("spectrum reaches ell={available}, lmax={requested} requested")]
    SpectrumTooShort { available: usize, requested: usize },
    #[error("{channel} spectrum is negative at ell={ell}")]
    NegativeSpectrum { channel: &'static str, ell: usize },
    #[error("TT/TE/EE covariance is not positive semi-definite at ell={ell}")]
    NotPositiveSemiDefinite { ell: usize },
    #[error("window has {found} entries, need {needed}")]
    WindowTooShort { found: usize, needed: usize },
}

/// Complex a_ℓm for 0 ≤ m ≤ ℓ ≤ ℓmax.
#[derive(Debug, Clone, PartialEq)]
pub struct Alm {
    lmax: usize,
    data: Vec<Complex64>,
}

impl Alm {
    pub fn zeros(lmax: usize) -> Self {
        Self {
            lmax,
            data: vec![Complex64::new(0.0, 0.0); Self::size(lmax)],
        }
    }

    /// Number of stored coefficients for a given ℓmax
    pub fn size(lmax: usize) -> usize {
        (lmax + 1) * (lmax + 2) / 2
    }

    pub fn lmax(&self) -> usize {
        self.lmax
    }

    #[inline]
    pub fn index(&self, ell: usize, m: usize) -> usize {
        debug_assert!(m <= ell && ell <= self.lmax);
        m * (2 * self.lmax + 1 - m) / 2 + ell
    }

    #[inline]
    pub fn get(&self, ell: usize, m: usize) -> Complex64 {
        self.data[self.index(ell, m)]
    }

    #[inline]
    pub fn set(&mut self, ell: usize, m: usize, value: Complex64) {
        let idx = self.index(ell, m);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Multiply every a_ℓm by `window[ℓ]`.
    pub fn almxfl(&self, window: &[f64]) -> Result<Alm, AlmError> {
        if window.len() <= self.lmax {
            return Err(AlmError::WindowTooShort {
                found: window.len(),
                needed: self.lmax + 1,
            });
        }
        let mut out = self.clone();
        for m in 0..=self.lmax {
            for ell in m..=self.lmax {
                let idx = out.index(ell, m);
                out.data[idx] *= window[ell];
            }
        }
        Ok(out)
    }
}

/// Temperature and E/B polarization coefficients of one sky.
#[derive(Debug, Clone, PartialEq)]
pub struct SkyAlm {
    pub t: Alm,
    pub e: Alm,
    pub b: Alm,
}

impl SkyAlm {
    pub fn zeros(lmax: usize) -> Self {
        Self {
            t: Alm::zeros(lmax),
            e: Alm::zeros(lmax),
            b: Alm::zeros(lmax),
        }
    }

    pub fn lmax(&self) -> usize {
        self.t.lmax()
    }
}

/// Draw a Gaussian realization of `spectrum` up to `lmax`.
///
/// T and E are correlated through TE using the Cholesky factor of the 2×2
/// covariance at each ℓ, B is independent. A given seed and spectrum always
/// produce identical coefficients.
pub fn synalm(spectrum: &PowerSpectrum, lmax: usize, seed: u64) -> Result<SkyAlm, AlmError> {
    if spectrum.lmax() < lmax {
        return Err(AlmError::SpectrumTooShort {
            available: spectrum.lmax(),
            requested: lmax,
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut sky = SkyAlm::zeros(lmax);

    for ell in 0..=lmax {
        let (tt, ee, bb, te) = (
            spectrum.tt[ell],
            spectrum.ee[ell],
            spectrum.bb[ell],
            spectrum.te[ell],
        );
        for (channel, value) in [("TT", tt), ("EE", ee), ("BB", bb)] {
            if value < 0.0 {
                return Err(AlmError::NegativeSpectrum { channel, ell });
            }
        }
        if te * te > tt * ee * (1.0 + PSD_TOLERANCE) + f64::MIN_POSITIVE {
            return Err(AlmError::NotPositiveSemiDefinite { ell });
        }

        let l11 = tt.sqrt();
        let l21 = if l11 > 0.0 { te / l11 } else { 0.0 };
        let l22 = (ee - l21 * l21).max(0.0).sqrt();
        let lbb = bb.sqrt();

        for m in 0..=ell {
            let g1 = gaussian(&mut rng, m);
            let g2 = gaussian(&mut rng, m);
            let g3 = gaussian(&mut rng, m);
            sky.t.set(ell, m, g1 * l11);
            sky.e.set(ell, m, g1 * l21 + g2 * l22);
            sky.b.set(ell, m, g3 * lbb);
        }
    }

    Ok(sky)
}

/// Unit-variance complex Gaussian; real for m = 0.
fn gaussian(rng: &mut StdRng, m: usize) -> Complex64 {
    let re: f64 = rng.sample(StandardNormal);
    if m == 0 {
        Complex64::new(re, 0.0)
    } else {
        let im: f64 = rng.sample(StandardNormal);
        Complex64::new(re, im) * FRAC_1_SQRT_2
    }
}

/// Gaussian beam transfer functions.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamWindow {
    /// Temperature window exp(−ℓ(ℓ+1)σ²/2)
    pub t: Vec<f64>,
    /// Spin-2 window exp(−(ℓ(ℓ+1) − 4)σ²/2)
    pub pol: Vec<f64>,
}

/// Beam width σ in radians for a FWHM in arcminutes
pub fn fwhm_to_sigma(fwhm_arcmin: f64) -> f64 {
    (fwhm_arcmin / 60.0).to_radians() / (8.0 * 2f64.ln()).sqrt()
}

pub fn gauss_beam(fwhm_arcmin: f64, lmax: usize) -> BeamWindow {
    let sigma2 = fwhm_to_sigma(fwhm_arcmin).powi(2);
    let pol_factor = (2.0 * sigma2).exp();
    let t: Vec<f64> = (0..=lmax)
        .map(|ell| (-0.5 * (ell * (ell + 1)) as f64 * sigma2).exp())
        .collect();
    let pol = t.iter().map(|w| w * pol_factor).collect();
    BeamWindow { t, pol }
}

/// Convolve a sky with a symmetric Gaussian beam.
pub fn smooth(sky: &SkyAlm, fwhm_arcmin: f64) -> Result<SkyAlm, AlmError> {
    let window = gauss_beam(fwhm_arcmin, sky.lmax());
    Ok(SkyAlm {
        t: sky.t.almxfl(&window.t)?,
        e: sky.e.almxfl(&window.pol)?,
        b: sky.b.almxfl(&window.pol)?,
    })
}
