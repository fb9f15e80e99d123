//! Per-pixel solution of the 3×3 normal equations

use crate::mapmaking::{MapAccumulator, MapMakingError};
use log::debug;
use nalgebra::{Matrix3, SymmetricEigen, Vector3};
use ndarray::Array2;
use rayon::prelude::*;

/// Pixels whose projection matrix is worse conditioned than this are masked
pub const DEFAULT_COND_THRESHOLD: f64 = 1e3;

/// Solved I/Q/U maps with per-pixel diagnostics.
///
/// Unscanned pixels are NaN in every map and in `cond`. Pixels that were
/// scanned but whose condition number exceeds the threshold keep their
/// (finite or infinite) condition number and are NaN in `maps`.
#[derive(Debug, Clone)]
pub struct SolvedMaps {
    /// `(3, npix)` I, Q, U
    pub maps: Array2<f64>,
    pub cond: Vec<f64>,
    pub hits: Vec<f64>,
}

impl SolvedMaps {
    pub fn npix(&self) -> usize {
        self.cond.len()
    }

    /// Pixels with a finite solution.
    pub fn valid_pixels(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.npix()).filter(|&p| !self.maps[[0, p]].is_nan())
    }
}

fn projection_matrix(acc: &MapAccumulator, pix: usize) -> Matrix3<f64> {
    let p = |row: usize| acc.proj[[row, pix]];
    Matrix3::new(
        p(0),
        p(1),
        p(2),
        p(1),
        p(3),
        p(4),
        p(2),
        p(4),
        p(5),
    )
}

/// Condition number λmax/λmin of a symmetric positive semi-definite matrix.
pub fn condition_number(matrix: &Matrix3<f64>) -> f64 {
    let eigen = SymmetricEigen::new(*matrix);
    let max = eigen.eigenvalues.max();
    let min = eigen.eigenvalues.min();
    if max <= 0.0 || min <= max * 1e-14 {
        f64::INFINITY
    } else {
        max / min
    }
}

fn solve_pixel(acc: &MapAccumulator, pix: usize, threshold: f64) -> ([f64; 3], f64) {
    let hits = acc.proj[[0, pix]];
    if hits <= 0.0 {
        return ([f64::NAN; 3], f64::NAN);
    }
    let matrix = projection_matrix(acc, pix) / hits;
    let cond = condition_number(&matrix);
    if cond.is_nan() || cond > threshold {
        return ([f64::NAN; 3], cond);
    }
    let rhs = Vector3::new(acc.vec[[0, pix]], acc.vec[[1, pix]], acc.vec[[2, pix]]) / hits;
    match matrix.cholesky() {
        Some(chol) => {
            let x = chol.solve(&rhs);
            ([x[0], x[1], x[2]], cond)
        }
        None => ([f64::NAN; 3], f64::INFINITY),
    }
}

/// Solve every pixel of an accumulator.
pub fn solve_map(acc: &MapAccumulator, cond_threshold: f64) -> Result<SolvedMaps, MapMakingError> {
    if cond_threshold.is_nan() || cond_threshold < 1.0 {
        return Err(MapMakingError::InvalidThreshold(cond_threshold));
    }
    let npix = acc.npix();
    let solutions: Vec<([f64; 3], f64)> = (0..npix)
        .into_par_iter()
        .map(|pix| solve_pixel(acc, pix, cond_threshold))
        .collect();

    let mut maps = Array2::from_elem((3, npix), f64::NAN);
    let mut cond = Vec::with_capacity(npix);
    for (pix, (iqu, c)) in solutions.into_iter().enumerate() {
        for (row, value) in iqu.into_iter().enumerate() {
            maps[[row, pix]] = value;
        }
        cond.push(c);
    }
    let solved = maps.row(0).iter().filter(|v| !v.is_nan()).count();
    debug!("solve_map: {solved} of {npix} pixels solved");

    Ok(SolvedMaps {
        maps,
        cond,
        hits: acc.hits(),
    })
}
