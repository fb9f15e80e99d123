//! Telescope pointing: sidereal time, horizon ↔ equatorial conversion and
//! detector quaternions
//!
//! Equatorial unit vectors use x̂ toward (RA 0, Dec 0) and ẑ toward the north
//! celestial pole. Azimuth is measured from north through east. All angles
//! are radians unless a name says otherwise.
//!
//! A boresight quaternion maps the instrument frame onto the sky: its ẑ axis is
//! the line of sight, x̂ points toward increasing elevation and ŷ toward
//! increasing azimuth. Detectors hang off the boresight through
//!
//! ```text
//! q_det = q_bore · R_z(rotation) · R_x(−az_offset) · R_y(el_offset) · R_z(polang)
//! ```
//!
//! so that a detector's ẑ is its line of sight and its x̂ the direction of its
//! polarization-sensitive axis.

use crate::algo::Quaternion;
use crate::hardware::Beam;
use nalgebra::Vector3;
use std::f64::consts::{FRAC_PI_2, TAU};

/// Days between the Unix epoch and J2000.0
const UNIX_TO_J2000_DAYS: f64 = 10_957.5;

/// Greenwich mean sidereal time in radians for a Unix timestamp.
pub fn gmst(ctime: f64) -> f64 {
    let days = ctime / 86_400.0 - UNIX_TO_J2000_DAYS;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * days;
    degrees.rem_euclid(360.0).to_radians()
}

/// Local sidereal time in radians for an east-positive longitude.
pub fn local_sidereal_time(ctime: f64, lon: f64) -> f64 {
    (gmst(ctime) + lon).rem_euclid(TAU)
}

/// Local east, north and up unit vectors in equatorial coordinates.
fn horizon_basis(lat: f64, lst: f64) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lst, cos_lst) = lst.sin_cos();
    // hour-angle frame rotated onto the sky by the local sidereal time
    let rotate = |x: f64, y: f64, z: f64| {
        Vector3::new(x * cos_lst - y * sin_lst, x * sin_lst + y * cos_lst, z)
    };
    let east = rotate(0.0, 1.0, 0.0);
    let north = rotate(-sin_lat, 0.0, cos_lat);
    let up = rotate(cos_lat, 0.0, sin_lat);
    (east, north, up)
}

fn vec_to_radec(v: &Vector3<f64>) -> (f64, f64) {
    let dec = v[2].clamp(-1.0, 1.0).asin();
    let ra = v[1].atan2(v[0]).rem_euclid(TAU);
    (ra, dec)
}

/// Unit vector toward equatorial coordinates.
pub fn radec_to_vec(ra: f64, dec: f64) -> Vector3<f64> {
    let (sin_dec, cos_dec) = dec.sin_cos();
    Vector3::new(cos_dec * ra.cos(), cos_dec * ra.sin(), sin_dec)
}

/// Horizon to equatorial coordinates.
pub fn azel_to_radec(az: f64, el: f64, lat: f64, lst: f64) -> (f64, f64) {
    let (east, north, up) = horizon_basis(lat, lst);
    let (sin_el, cos_el) = el.sin_cos();
    let v = east * (cos_el * az.sin()) + north * (cos_el * az.cos()) + up * sin_el;
    vec_to_radec(&v)
}

/// Equatorial to horizon coordinates; azimuth in [0, 2π).
pub fn radec_to_azel(ra: f64, dec: f64, lat: f64, lst: f64) -> (f64, f64) {
    let (east, north, up) = horizon_basis(lat, lst);
    let v = radec_to_vec(ra, dec);
    let el = v.dot(&up).clamp(-1.0, 1.0).asin();
    let az = v.dot(&east).atan2(v.dot(&north)).rem_euclid(TAU);
    (az, el)
}

/// Boresight orientation for a horizon pointing.
pub fn boresight_quat(az: f64, el: f64, lat: f64, lst: f64) -> Quaternion {
    let (east, north, up) = horizon_basis(lat, lst);
    let (sin_el, cos_el) = el.sin_cos();
    let (sin_az, cos_az) = az.sin_cos();
    let z_axis = east * (cos_el * sin_az) + north * (cos_el * cos_az) + up * sin_el;
    let x_axis = -(east * (sin_el * sin_az)) - north * (sin_el * cos_az) + up * cos_el;
    let y_axis = z_axis.cross(&x_axis);
    Quaternion::from_frame(&x_axis, &y_axis, &z_axis)
}

/// Fixed part of a detector quaternion, relative to the rotated boresight.
pub fn offset_quat(az_offset: f64, el_offset: f64, polang: f64) -> Quaternion {
    Quaternion::rot_x(-az_offset) * Quaternion::rot_y(el_offset) * Quaternion::rot_z(polang)
}

/// Offset quaternion of a beam from its degree-valued layout.
pub fn beam_offset_quat(beam: &Beam) -> Quaternion {
    offset_quat(
        beam.az_deg.to_radians(),
        beam.el_deg.to_radians(),
        beam.polang_deg.to_radians(),
    )
}

/// Full detector orientation.
pub fn detector_quat(boresight: &Quaternion, rotation: f64, offset: &Quaternion) -> Quaternion {
    *boresight * Quaternion::rot_z(rotation) * *offset
}

/// Sky position and polarization angle of a detector quaternion.
///
/// ψ is measured from the local e_θ (south) toward e_φ (east), the HEALPix
/// convention for Q and U.
pub fn quat_to_radec_pa(q: &Quaternion) -> (f64, f64, f64) {
    let (pol, los) = q.x_and_z_axes();
    let (ra, dec) = vec_to_radec(&los);
    let theta = FRAC_PI_2 - dec;
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = ra.sin_cos();
    let e_theta = Vector3::new(cos_t * cos_p, cos_t * sin_p, -sin_t);
    let e_phi = Vector3::new(-sin_p, cos_p, 0.0);
    let psi = pol.dot(&e_phi).atan2(pol.dot(&e_theta));
    (ra, dec, psi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_gmst_at_j2000() {
        // 2000-01-01T12:00:00 UTC
        let ctime = 946_728_000.0;
        assert_relative_eq!(gmst(ctime).to_degrees(), 280.460_618_37, epsilon = 1e-6);
        // one sidereal day later the angle repeats
        let sidereal_day = 86_400.0 * 360.0 / 360.985_647_366_29;
        assert_relative_eq!(gmst(ctime + sidereal_day), gmst(ctime), epsilon = 1e-6);
    }

    #[test]
    fn test_zenith_is_latitude() {
        let lat = -22.96f64.to_radians();
        let lst = 1.3;
        let (ra, dec) = azel_to_radec(0.7, FRAC_PI_2, lat, lst);
        assert_relative_eq!(dec, lat, epsilon = 1e-12);
        assert_relative_eq!(ra, lst, epsilon = 1e-9);
    }

    #[test]
    fn test_horizon_directions() {
        let lat = 0.5;
        let lst = 2.0;
        // due north on the horizon lies below the pole, twelve hours from the meridian
        let (ra, dec) = azel_to_radec(0.0, 0.0, lat, lst);
        assert_relative_eq!(dec, FRAC_PI_2 - lat, epsilon = 1e-12);
        assert_relative_eq!(ra, lst + PI, epsilon = 1e-12);
        // due east on the horizon is on the equator six hours ahead
        let (ra, dec) = azel_to_radec(FRAC_PI_2, 0.0, lat, lst);
        assert_relative_eq!(dec, 0.0, epsilon = 1e-12);
        assert_relative_eq!(ra, lst + FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_azel_round_trip() {
        let lat = -89.9f64.to_radians();
        for &(ra, dec) in &[(5.9, -1.0), (0.1, -0.4), (3.0, -1.3)] {
            let lst = 0.37;
            let (az, el) = radec_to_azel(ra, dec, lat, lst);
            let (ra2, dec2) = azel_to_radec(az, el, lat, lst);
            assert_relative_eq!(ra2, ra, epsilon = 1e-10);
            assert_relative_eq!(dec2, dec, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_boresight_quat_points_at_target() {
        let lat = -0.8;
        let lst = 4.1;
        let (az, el) = (1.2, 0.9);
        let q = boresight_quat(az, el, lat, lst);
        let (ra, dec, _) = quat_to_radec_pa(&q);
        let (ra_ref, dec_ref) = azel_to_radec(az, el, lat, lst);
        assert_relative_eq!(ra, ra_ref, epsilon = 1e-10);
        assert_relative_eq!(dec, dec_ref, epsilon = 1e-10);
    }

    #[test]
    fn test_offsets_move_along_horizon_axes() {
        let lat = -1.2;
        let lst = 0.4;
        let (az, el) = (2.0, 0.8);
        let bore = boresight_quat(az, el, lat, lst);
        let delta = 0.01;

        let up = detector_quat(&bore, 0.0, &offset_quat(0.0, delta, 0.0));
        let (ra, dec, _) = quat_to_radec_pa(&up);
        let (_, el_up) = radec_to_azel(ra, dec, lat, lst);
        assert_relative_eq!(el_up, el + delta, epsilon = 1e-10);

        let right = detector_quat(&bore, 0.0, &offset_quat(delta, 0.0, 0.0));
        let (ra, dec, _) = quat_to_radec_pa(&right);
        let (az_right, el_right) = radec_to_azel(ra, dec, lat, lst);
        assert!(az_right > az);
        assert!((el_right - el).abs() < 1e-4);
    }

    #[test]
    fn test_polarization_angle_follows_rotation() {
        let lat = -1.0;
        let lst = 1.0;
        let bore = boresight_quat(0.3, 0.9, lat, lst);
        let base = quat_to_radec_pa(&detector_quat(&bore, 0.0, &offset_quat(0.0, 0.0, 0.0))).2;
        // polarization angle and instrument rotation both turn ψ one for one
        let turned = quat_to_radec_pa(&detector_quat(&bore, 0.0, &offset_quat(0.0, 0.0, 0.4))).2;
        let rotated = quat_to_radec_pa(&detector_quat(&bore, 0.4, &offset_quat(0.0, 0.0, 0.0))).2;
        let diff = (turned - base).rem_euclid(TAU);
        assert_relative_eq!(diff.min(TAU - diff), 0.4, epsilon = 1e-10);
        assert_relative_eq!(turned, rotated, epsilon = 1e-12);
    }
}
