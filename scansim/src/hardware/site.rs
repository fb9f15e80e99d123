//! Observatory locations on Earth

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("latitude {0}° outside [-90, 90]")]
    InvalidLatitude(f64),
    #[error("longitude {0}° outside [-180, 360]")]
    InvalidLongitude(f64),
    #[error("unknown site '{0}', expected spole, atacama or LAT,LON")]
    UnknownSite(String),
    #[error("focal plane needs at least one row and one column, got {nrow}x{ncol}")]
    EmptyFocalPlane { nrow: usize, ncol: usize },
    #[error("field of view must be finite and non-negative, got {0}°")]
    InvalidFieldOfView(f64),
    #[error("beam FWHM must be positive, got {0} arcmin")]
    InvalidFwhm(f64),
    #[error("cross-polar leakage must be finite and non-negative, got {0}")]
    InvalidCrossPol(f64),
    #[error("kill fraction {0} outside [0, 1]")]
    InvalidKillFraction(f64),
    #[error("focal plane file error: {0}")]
    Io(String),
}

/// Geodetic position of a telescope, degrees (longitude east-positive).
///
/// Deserialized sites go through [`Site::new`], so out-of-range coordinates
/// in a config file are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SiteFields")]
pub struct Site {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

#[derive(Deserialize)]
struct SiteFields {
    lat_deg: f64,
    lon_deg: f64,
}

impl TryFrom<SiteFields> for Site {
    type Error = InstrumentError;

    fn try_from(fields: SiteFields) -> Result<Self, Self::Error> {
        Site::new(fields.lat_deg, fields.lon_deg)
    }
}

impl Site {
    pub const SOUTH_POLE: Site = Site {
        lat_deg: -89.9,
        lon_deg: 169.15,
    };

    pub const ATACAMA: Site = Site {
        lat_deg: -22.96,
        lon_deg: -67.79,
    };

    pub fn new(lat_deg: f64, lon_deg: f64) -> Result<Self, InstrumentError> {
        if !lat_deg.is_finite() || !(-90.0..=90.0).contains(&lat_deg) {
            return Err(InstrumentError::InvalidLatitude(lat_deg));
        }
        if !lon_deg.is_finite() || !(-180.0..=360.0).contains(&lon_deg) {
            return Err(InstrumentError::InvalidLongitude(lon_deg));
        }
        Ok(Self { lat_deg, lon_deg })
    }

    /// Resolve "spole", "atacama" or a "LAT,LON" pair.
    pub fn from_name(name: &str) -> Result<Self, InstrumentError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "spole" | "south_pole" => Ok(Self::SOUTH_POLE),
            "atacama" => Ok(Self::ATACAMA),
            other => {
                let parts: Vec<&str> = other.split(',').collect();
                if parts.len() != 2 {
                    return Err(InstrumentError::UnknownSite(name.to_string()));
                }
                let parse = |s: &str| {
                    s.trim()
                        .parse::<f64>()
                        .map_err(|_| InstrumentError::UnknownSite(name.to_string()))
                };
                Self::new(parse(parts[0])?, parse(parts[1])?)
            }
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.lat_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.lon_deg.to_radians()
    }
}

impl Default for Site {
    fn default() -> Self {
        Self::SOUTH_POLE
    }
}
