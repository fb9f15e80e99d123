//! Time-dependent instrument settings: boresight rotation, half-wave plate
//! and elevation steps
//!
//! Every schedule is a pure function of the sample index or elapsed mission
//! time, so chunks and detectors can be processed in any order.

use crate::algo::wrap_degrees;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Periodic rotation of the focal plane about the boresight.
///
/// Angles are in degrees. Without a period the instrument stays at
/// `start_angle` for the whole mission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationSchedule {
    /// Seconds spent at each angle
    pub period: Option<f64>,
    pub start_angle: f64,
    pub angles: Vec<f64>,
}

impl RotationSchedule {
    /// No rotation
    pub fn fixed(angle: f64) -> Self {
        Self {
            period: None,
            start_angle: angle,
            angles: vec![angle],
        }
    }

    /// Step through eight angles 45° apart, starting at `start_angle`.
    pub fn periodic(period: f64, start_angle: f64) -> Self {
        let angles = (0..8)
            .map(|k| wrap_degrees(start_angle + 45.0 * k as f64))
            .collect();
        Self {
            period: Some(period),
            start_angle,
            angles,
        }
    }

    /// Cycle through explicit angles.
    pub fn with_angles(period: f64, angles: Vec<f64>) -> Self {
        Self {
            period: Some(period),
            start_angle: angles.first().copied().unwrap_or(0.0),
            angles,
        }
    }

    /// Number of samples spent at one angle, if rotating.
    pub fn samples_per_step(&self, fsamp: f64) -> Option<f64> {
        self.period.map(|p| p * fsamp)
    }

    /// Index of the rotation step a sample falls into.
    pub fn step_of(&self, sample: usize, fsamp: f64) -> usize {
        match self.samples_per_step(fsamp) {
            Some(sps) => (sample as f64 / sps).floor() as usize,
            None => 0,
        }
    }

    /// Rotation angle in degrees at a global sample index.
    pub fn angle_at(&self, sample: usize, fsamp: f64) -> f64 {
        if self.period.is_none() || self.angles.is_empty() {
            return self.start_angle;
        }
        self.angles[self.step_of(sample, fsamp) % self.angles.len()]
    }
}

impl Default for RotationSchedule {
    fn default() -> Self {
        Self::fixed(0.0)
    }
}

/// Half-wave-plate modulation. Frequencies in Hz, angles in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum HwpModulation {
    #[default]
    None,
    /// χ(t) = χ₀ + 2πf·t
    Continuous { freq: f64, start_angle: f64 },
    /// Hold each angle for 1/f seconds, cycling through the list
    Stepped { freq: f64, angles: Vec<f64> },
}

impl HwpModulation {
    pub fn continuous(freq: f64) -> Self {
        HwpModulation::Continuous {
            freq,
            start_angle: 0.0,
        }
    }

    /// Stepped modulation through 0°, 22.5°, …, 157.5°.
    pub fn stepped(freq: f64) -> Self {
        HwpModulation::Stepped {
            freq,
            angles: (0..8).map(|k| 22.5 * k as f64).collect(),
        }
    }

    /// HWP angle χ in radians at `t` seconds after mission start.
    pub fn angle_at(&self, t: f64) -> f64 {
        match self {
            HwpModulation::None => 0.0,
            HwpModulation::Continuous { freq, start_angle } => {
                (start_angle.to_radians() + TAU * freq * t).rem_euclid(TAU)
            }
            HwpModulation::Stepped { freq, angles } => {
                if angles.is_empty() {
                    return 0.0;
                }
                let step = (t * freq).floor() as usize;
                angles[step % angles.len()].to_radians()
            }
        }
    }
}

/// Elevation offsets in degrees, each held for `period` seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSteps {
    pub period: f64,
    pub steps: Vec<f64>,
}

impl ElevationSteps {
    pub fn offset_at(&self, t: f64) -> f64 {
        if self.steps.is_empty() || self.period <= 0.0 {
            return 0.0;
        }
        let step = (t / self.period).floor() as usize;
        self.steps[step % self.steps.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_rotation_angles() {
        let rot = RotationSchedule::periodic(60.0, 300.0);
        assert_eq!(
            rot.angles,
            vec![300.0, 345.0, 30.0, 75.0, 120.0, 165.0, 210.0, 255.0]
        );
    }

    #[test]
    fn test_rotation_angle_by_sample() {
        let rot = RotationSchedule::periodic(10.0, 0.0);
        let fsamp = 2.0;
        assert_eq!(rot.angle_at(0, fsamp), 0.0);
        assert_eq!(rot.angle_at(19, fsamp), 0.0);
        assert_eq!(rot.angle_at(20, fsamp), 45.0);
        // wraps after eight steps
        assert_eq!(rot.angle_at(160, fsamp), 0.0);
        assert_eq!(RotationSchedule::fixed(12.0).angle_at(10_000, fsamp), 12.0);
    }

    #[test]
    fn test_continuous_hwp() {
        let hwp = HwpModulation::continuous(2.0);
        assert_eq!(hwp.angle_at(0.0), 0.0);
        assert_relative_eq!(hwp.angle_at(0.125), TAU / 4.0, epsilon = 1e-12);
        assert_relative_eq!(hwp.angle_at(1.0), 0.0, epsilon = 1e-9);
        assert_eq!(HwpModulation::None.angle_at(5.0), 0.0);
    }

    #[test]
    fn test_stepped_hwp() {
        let hwp = HwpModulation::stepped(0.5);
        assert_eq!(hwp.angle_at(1.9), 0.0);
        assert_relative_eq!(hwp.angle_at(2.0), 22.5f64.to_radians());
        assert_relative_eq!(hwp.angle_at(15.0), 157.5f64.to_radians());
        assert_eq!(hwp.angle_at(16.0), 0.0);
    }

    #[test]
    fn test_elevation_steps() {
        let steps = ElevationSteps {
            period: 100.0,
            steps: vec![0.0, 1.0, -1.0],
        };
        assert_eq!(steps.offset_at(50.0), 0.0);
        assert_eq!(steps.offset_at(150.0), 1.0);
        assert_eq!(steps.offset_at(299.0), -1.0);
        assert_eq!(steps.offset_at(300.0), 0.0);
    }

    #[test]
    fn test_hwp_serde_tagging() {
        let json = serde_json::to_string(&HwpModulation::continuous(1.5)).unwrap();
        assert!(json.contains("\"mode\":\"continuous\""));
        let back: HwpModulation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HwpModulation::continuous(1.5));
    }
}
