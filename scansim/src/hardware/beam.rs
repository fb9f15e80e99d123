//! Detector beams: pointing offsets, polarization response and shape

use crate::hardware::site::InstrumentError;
use serde::{Deserialize, Serialize};

/// Polarization channel of a detector within a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    A,
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BeamShape {
    /// Symmetric Gaussian main lobe
    Gaussian { fwhm_arcmin: f64 },
}

impl BeamShape {
    pub fn fwhm_arcmin(&self) -> f64 {
        match self {
            BeamShape::Gaussian { fwhm_arcmin } => *fwhm_arcmin,
        }
    }
}

/// A single detector as seen on the sky.
///
/// Offsets are measured from the boresight in degrees: `az_deg` along
/// increasing azimuth and `el_deg` along increasing elevation, both at zero
/// instrument rotation. `polang_deg` is the angle of the polarization-
/// sensitive axis, counted from the elevation direction toward azimuth.
///
/// Deserialization goes through [`Beam::gaussian`] and
/// [`Beam::with_cross_pol`], so a focal-plane file cannot carry a
/// non-positive width or a negative leakage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BeamFields")]
pub struct Beam {
    pub name: String,
    pub az_deg: f64,
    pub el_deg: f64,
    pub polang_deg: f64,
    pub channel: Channel,
    pub shape: BeamShape,
    /// Cross-polar leakage ε; the co-polar efficiency is (1 − ε)/(1 + ε)
    #[serde(default)]
    pub cross_pol: f64,
    #[serde(default)]
    pub dead: bool,
}

#[derive(Deserialize)]
struct BeamFields {
    name: String,
    az_deg: f64,
    el_deg: f64,
    polang_deg: f64,
    channel: Channel,
    shape: BeamShape,
    #[serde(default)]
    cross_pol: f64,
    #[serde(default)]
    dead: bool,
}

impl TryFrom<BeamFields> for Beam {
    type Error = InstrumentError;

    fn try_from(fields: BeamFields) -> Result<Self, Self::Error> {
        let beam = match fields.shape {
            BeamShape::Gaussian { fwhm_arcmin } => Beam::gaussian(
                fields.name,
                fields.az_deg,
                fields.el_deg,
                fields.polang_deg,
                fields.channel,
                fwhm_arcmin,
            )?,
        };
        let mut beam = beam.with_cross_pol(fields.cross_pol)?;
        beam.dead = fields.dead;
        Ok(beam)
    }
}

impl Beam {
    pub fn gaussian(
        name: impl Into<String>,
        az_deg: f64,
        el_deg: f64,
        polang_deg: f64,
        channel: Channel,
        fwhm_arcmin: f64,
    ) -> Result<Self, InstrumentError> {
        if !(fwhm_arcmin.is_finite() && fwhm_arcmin > 0.0) {
            return Err(InstrumentError::InvalidFwhm(fwhm_arcmin));
        }
        Ok(Self {
            name: name.into(),
            az_deg,
            el_deg,
            polang_deg,
            channel,
            shape: BeamShape::Gaussian { fwhm_arcmin },
            cross_pol: 0.0,
            dead: false,
        })
    }

    pub fn with_cross_pol(mut self, cross_pol: f64) -> Result<Self, InstrumentError> {
        if !(cross_pol.is_finite() && cross_pol >= 0.0) {
            return Err(InstrumentError::InvalidCrossPol(cross_pol));
        }
        self.cross_pol = cross_pol;
        Ok(self)
    }

    pub fn fwhm_arcmin(&self) -> f64 {
        self.shape.fwhm_arcmin()
    }

    /// Polarization efficiency γ = (1 − ε)/(1 + ε)
    pub fn pol_efficiency(&self) -> f64 {
        (1.0 - self.cross_pol) / (1.0 + self.cross_pol)
    }
}
