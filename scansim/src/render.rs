//! Gnomonic projections of HEALPix maps for the PNG renderer.

use crate::error::SimError;
use crate::healpix;
use crate::pointing::radec_to_vec;
use nalgebra::Vector3;
use std::path::Path;
use viz::{MapImage, MapPlotConfig};

/// A square-pixel tangent-plane patch of sky.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GnomonicPatch {
    /// Patch centre, degrees
    pub ra: f64,
    pub dec: f64,
    /// Image size in samples
    pub width: usize,
    pub height: usize,
    /// Arcminutes per sample at the centre
    pub resolution: f64,
}

impl GnomonicPatch {
    /// Patch covering `extent_deg` on a side at `resolution` arcmin per sample.
    pub fn square(ra: f64, dec: f64, extent_deg: f64, resolution: f64) -> Self {
        let n = ((extent_deg * 60.0 / resolution).round() as usize).max(1);
        Self {
            ra,
            dec,
            width: n,
            height: n,
            resolution,
        }
    }

    /// Sky direction of an image sample. East is to the left, north up.
    pub fn direction(&self, col: usize, row: usize) -> Vector3<f64> {
        let ra0 = self.ra.to_radians();
        let dec0 = self.dec.to_radians();
        let step = (self.resolution / 60.0).to_radians();
        let x = (col as f64 - 0.5 * (self.width as f64 - 1.0)) * step;
        let y = (0.5 * (self.height as f64 - 1.0) - row as f64) * step;

        let centre = radec_to_vec(ra0, dec0);
        let east = Vector3::new(-ra0.sin(), ra0.cos(), 0.0);
        let north = Vector3::new(-dec0.sin() * ra0.cos(), -dec0.sin() * ra0.sin(), dec0.cos());
        (centre - east * x + north * y).normalize()
    }
}

/// Sample a RING-ordered map onto a gnomonic patch.
pub fn gnomonic_image(map: &[f64], patch: &GnomonicPatch) -> Result<MapImage, SimError> {
    let nside = healpix::npix2nside(map.len())?;
    let image = MapImage::from_fn(patch.width, patch.height, |col, row| {
        map[healpix::vec2pix_ring(nside, &patch.direction(col, row))]
    })?;
    Ok(image)
}

/// Render a patch of `map` to a PNG at `path`.
pub fn render_gnomonic(
    map: &[f64],
    patch: &GnomonicPatch,
    config: &MapPlotConfig,
    path: &Path,
) -> Result<(), SimError> {
    let image = gnomonic_image(map, patch)?;
    viz::render_png(&image, config, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_patch_centre_and_orientation() {
        let patch = GnomonicPatch::square(-10.0, -57.5, 10.0, 30.0);
        assert_eq!(patch.width, 20);
        let patch = GnomonicPatch {
            width: 21,
            height: 21,
            ..patch
        };
        let centre = patch.direction(10, 10);
        assert_relative_eq!(centre, radec_to_vec((-10f64).to_radians(), (-57.5f64).to_radians()), epsilon = 1e-12);

        // top row is further north, left column further east
        let top = patch.direction(10, 0);
        assert!(top[2] > centre[2]);
        let left = patch.direction(0, 10);
        let ra_left = left[1].atan2(left[0]);
        let ra_centre = centre[1].atan2(centre[0]);
        assert!(ra_left > ra_centre);
    }

    #[test]
    fn test_gnomonic_samples_pixel_values() {
        let nside = 8;
        let map: Vec<f64> = (0..healpix::nside2npix(nside)).map(|p| p as f64).collect();
        let patch = GnomonicPatch::square(45.0, 30.0, 5.0, 60.0);
        let image = gnomonic_image(&map, &patch).unwrap();
        let expected = healpix::vec2pix_ring(nside, &patch.direction(2, 3)) as f64;
        assert_eq!(image.get(2, 3), expected);
        assert!(gnomonic_image(&map[..10], &patch).is_err());
    }
}
