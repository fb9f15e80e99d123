//! Angular power spectra read from CAMB-style text tables
//!
//! A table row is `ell` followed by the spectra in the column order given by
//! [`SpectrumLayout`]. Lines starting with `#` and blank lines are skipped.
//! Values are stored as C_ℓ for every multipole `0..=lmax`.

use std::f64::consts::PI;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("failed to read spectrum file: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: cannot parse '{value}' as a finite number")]
    Parse { line: usize, value: String },
    #[error("line {line}: expected {expected} columns, found {found}")]
    Ragged {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: multipole {ell} is not a non-negative integer")]
    InvalidMultipole { line: usize, ell: f64 },
    #[error("line {line}: multipole {ell} does not follow {previous}")]
    NonMonotonic {
        line: usize,
        ell: usize,
        previous: usize,
    },
    #[error("table ends at ell={available}, lmax={requested} requested")]
    TooShort { available: usize, requested: usize },
}

/// Column order of a spectrum table after the `ell` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SpectrumLayout {
    /// TT EE BB TE, as in CAMB `lensedCls.dat`
    Lensed,
    /// TT EE TE, as in CAMB `scalCls.dat`; BB is zero
    Unlensed,
}

impl SpectrumLayout {
    fn ncols(self) -> usize {
        match self {
            SpectrumLayout::Lensed => 5,
            SpectrumLayout::Unlensed => 4,
        }
    }
}

/// Normalization of the tabulated values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum SpectrumUnits {
    /// D_ℓ = ℓ(ℓ+1)C_ℓ/2π
    #[default]
    Dl,
    Cl,
}

/// TT, EE, BB and TE spectra as C_ℓ, indexed by ℓ.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpectrum {
    pub tt: Vec<f64>,
    pub ee: Vec<f64>,
    pub bb: Vec<f64>,
    pub te: Vec<f64>,
}

impl PowerSpectrum {
    /// All-zero spectra up to `lmax`.
    pub fn zeros(lmax: usize) -> Self {
        Self {
            tt: vec![0.0; lmax + 1],
            ee: vec![0.0; lmax + 1],
            bb: vec![0.0; lmax + 1],
            te: vec![0.0; lmax + 1],
        }
    }

    pub fn lmax(&self) -> usize {
        self.tt.len() - 1
    }

    /// Load a table from disk, truncated to `lmax`.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        layout: SpectrumLayout,
        units: SpectrumUnits,
        lmax: usize,
    ) -> Result<Self, SpectrumError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, layout, units, lmax)
    }

    /// Parse table text, truncated to `lmax`.
    pub fn parse(
        text: &str,
        layout: SpectrumLayout,
        units: SpectrumUnits,
        lmax: usize,
    ) -> Result<Self, SpectrumError> {
        let mut spectrum = Self::zeros(lmax);
        let mut previous: Option<usize> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let values = trimmed
                .split_whitespace()
                .map(|tok| match tok.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok(value),
                    _ => Err(SpectrumError::Parse {
                        line,
                        value: tok.to_string(),
                    }),
                })
                .collect::<Result<Vec<f64>, _>>()?;

            if values.len() != layout.ncols() {
                return Err(SpectrumError::Ragged {
                    line,
                    expected: layout.ncols(),
                    found: values.len(),
                });
            }

            let ell_f = values[0];
            if ell_f < 0.0 || ell_f.fract() != 0.0 {
                return Err(SpectrumError::InvalidMultipole { line, ell: ell_f });
            }
            let ell = ell_f as usize;
            if let Some(prev) = previous {
                if ell != prev + 1 {
                    return Err(SpectrumError::NonMonotonic {
                        line,
                        ell,
                        previous: prev,
                    });
                }
            }
            previous = Some(ell);

            if ell > lmax {
                continue;
            }

            let (tt, ee, bb, te) = match layout {
                SpectrumLayout::Lensed => (values[1], values[2], values[3], values[4]),
                SpectrumLayout::Unlensed => (values[1], values[2], 0.0, values[3]),
            };
            let scale = match units {
                SpectrumUnits::Cl => 1.0,
                SpectrumUnits::Dl if ell == 0 => 0.0,
                SpectrumUnits::Dl => 2.0 * PI / (ell * (ell + 1)) as f64,
            };
            spectrum.tt[ell] = tt * scale;
            spectrum.ee[ell] = ee * scale;
            spectrum.bb[ell] = bb * scale;
            spectrum.te[ell] = te * scale;
        }

        let available = previous.unwrap_or(0);
        if previous.is_none() || available < lmax {
            return Err(SpectrumError::TooShort {
                available,
                requested: lmax,
            });
        }
        Ok(spectrum)
    }

    /// D_ℓ view of a C_ℓ array.
    pub fn to_dl(cl: &[f64]) -> Vec<f64> {
        cl.iter()
            .enumerate()
            .map(|(ell, c)| c * (ell * (ell + 1)) as f64 / (2.0 * PI))
            .collect()
    }
}
