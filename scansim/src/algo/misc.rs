//! Miscellaneous numerical helpers.

/// Evenly spaced samples over the closed interval `[start, end]`.
///
/// A single sample sits at the midpoint of the interval, which keeps a one
/// detector row or column centered on the boresight.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![0.5 * (start + end)],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Wrap an angle in degrees into `[0, 360)`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-1.5, 1.5, 3);
        assert_eq!(v.len(), 3);
        assert_relative_eq!(v[0], -1.5);
        assert_relative_eq!(v[1], 0.0);
        assert_relative_eq!(v[2], 1.5);
    }

    #[test]
    fn test_linspace_degenerate() {
        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(-2.0, 2.0, 1), vec![0.0]);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_relative_eq!(wrap_degrees(370.0), 10.0);
        assert_relative_eq!(wrap_degrees(-45.0), 315.0);
        assert_relative_eq!(wrap_degrees(360.0), 0.0);
        assert!(wrap_degrees(-1e-18) < 360.0);
    }
}
