//! Per-pixel accumulation of the map-making normal equations
//!
//! For a detector with polarization efficiency γ each sample contributes the
//! pointing row `a = [1, γ cos 2ψ, γ sin 2ψ]`. The accumulator stores
//! `vec = Σ d·a` as a `(3, npix)` array and the upper triangle of `Σ aᵀa` as a
//! `(6, npix)` array in the order `[II, IQ, IU, QQ, QU, UU]`.

use crate::healpix;
use crate::mapmaking::MapMakingError;
use ndarray::Array2;

#[derive(Debug, Clone, PartialEq)]
pub struct MapAccumulator {
    nside: usize,
    pub vec: Array2<f64>,
    pub proj: Array2<f64>,
}

impl MapAccumulator {
    pub fn new(nside: usize) -> Result<Self, MapMakingError> {
        healpix::check_nside(nside)?;
        let npix = healpix::nside2npix(nside);
        Ok(Self {
            nside,
            vec: Array2::zeros((3, npix)),
            proj: Array2::zeros((6, npix)),
        })
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn npix(&self) -> usize {
        self.vec.ncols()
    }

    /// Bin one detector's samples.
    pub fn add_samples(
        &mut self,
        pix: &[usize],
        psi: &[f64],
        data: &[f64],
        pol_efficiency: f64,
    ) -> Result<(), MapMakingError> {
        if pix.len() != psi.len() || pix.len() != data.len() {
            return Err(MapMakingError::LengthMismatch {
                pix: pix.len(),
                psi: psi.len(),
                data: data.len(),
            });
        }
        let npix = self.npix();
        if let Some(&bad) = pix.iter().find(|&&p| p >= npix) {
            return Err(MapMakingError::PixelOutOfRange { pix: bad, npix });
        }

        for ((&p, &angle), &d) in pix.iter().zip(psi).zip(data) {
            let (s2, c2) = (2.0 * angle).sin_cos();
            let (c, s) = (pol_efficiency * c2, pol_efficiency * s2);
            self.vec[[0, p]] += d;
            self.vec[[1, p]] += d * c;
            self.vec[[2, p]] += d * s;
            self.proj[[0, p]] += 1.0;
            self.proj[[1, p]] += c;
            self.proj[[2, p]] += s;
            self.proj[[3, p]] += c * c;
            self.proj[[4, p]] += c * s;
            self.proj[[5, p]] += s * s;
        }
        Ok(())
    }

    /// Add another accumulator of the same resolution.
    pub fn merge(&mut self, other: &MapAccumulator) -> Result<(), MapMakingError> {
        if other.nside != self.nside {
            return Err(MapMakingError::NsideMismatch {
                expected: self.nside,
                found: other.nside,
            });
        }
        self.vec += &other.vec;
        self.proj += &other.proj;
        Ok(())
    }

    /// Number of samples that landed in each pixel.
    pub fn hits(&self) -> Vec<f64> {
        self.proj.row(0).to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_sample_terms() {
        let mut acc = MapAccumulator::new(1).unwrap();
        let psi = 0.3f64;
        acc.add_samples(&[5], &[psi], &[2.0], 1.0).unwrap();
        let (c, s) = ((2.0 * psi).cos(), (2.0 * psi).sin());
        assert_eq!(acc.vec[[0, 5]], 2.0);
        assert_relative_eq!(acc.vec[[1, 5]], 2.0 * c);
        assert_relative_eq!(acc.vec[[2, 5]], 2.0 * s);
        assert_eq!(acc.proj[[0, 5]], 1.0);
        assert_relative_eq!(acc.proj[[4, 5]], c * s);
        assert_eq!(acc.hits().iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn test_merge_adds() {
        let mut a = MapAccumulator::new(2).unwrap();
        let mut b = MapAccumulator::new(2).unwrap();
        a.add_samples(&[0, 1], &[0.0, 0.5], &[1.0, 1.0], 1.0).unwrap();
        b.add_samples(&[1], &[0.5], &[3.0], 1.0).unwrap();
        a.merge(&b).unwrap();
        assert_eq!(a.hits()[1], 2.0);
        assert_eq!(a.vec[[0, 1]], 4.0);

        let c = MapAccumulator::new(4).unwrap();
        assert_eq!(
            a.merge(&c),
            Err(MapMakingError::NsideMismatch {
                expected: 2,
                found: 4
            })
        );
    }

    #[test]
    fn test_input_validation() {
        let mut acc = MapAccumulator::new(1).unwrap();
        assert!(matches!(
            acc.add_samples(&[0, 1], &[0.0], &[1.0, 1.0], 1.0),
            Err(MapMakingError::LengthMismatch { .. })
        ));
        assert_eq!(
            acc.add_samples(&[12], &[0.0], &[1.0], 1.0),
            Err(MapMakingError::PixelOutOfRange { pix: 12, npix: 12 })
        );
        assert!(MapAccumulator::new(3).is_err());
    }
}
