//! PNG rendering of gridded map samples.

use crate::{Result, VizError};
use plotters::prelude::*;
use std::path::Path;

/// Row-major grid of samples. Row 0 is the top of the image.
#[derive(Debug, Clone)]
pub struct MapImage {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl MapImage {
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(VizError::ImageError(format!(
                "image must be non-empty, got {width}x{height}"
            )));
        }
        if values.len() != width * height {
            return Err(VizError::ImageError(format!(
                "expected {} samples for {width}x{height}, got {}",
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Build an image by evaluating `f(col, row)` at every sample
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f64) -> Result<Self> {
        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            for col in 0..width {
                values.push(f(col, row));
            }
        }
        Self::new(width, height, values)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.width + col]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Min and max over finite samples, `None` if there are none
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Range symmetric about zero covering every finite sample
    pub fn symmetric_range(&self) -> Option<(f64, f64)> {
        self.finite_range().map(|(lo, hi)| {
            let amp = lo.abs().max(hi.abs());
            if amp > 0.0 {
                (-amp, amp)
            } else {
                (-1.0, 1.0)
            }
        })
    }
}

/// Color scales for map renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    /// Blue through white to red; suited to signed fields
    Diverging,
    /// Dark blue through green to yellow; suited to positive quantities
    Sequential,
}

const DIVERGING_STOPS: [(f64, [u8; 3]); 5] = [
    (0.0, [5, 48, 97]),
    (0.25, [67, 147, 195]),
    (0.5, [247, 247, 247]),
    (0.75, [214, 96, 77]),
    (1.0, [103, 0, 31]),
];

const SEQUENTIAL_STOPS: [(f64, [u8; 3]); 5] = [
    (0.0, [68, 1, 84]),
    (0.25, [59, 82, 139]),
    (0.5, [33, 145, 140]),
    (0.75, [94, 201, 98]),
    (1.0, [253, 231, 37]),
];

/// Color for undefined samples
pub const MISSING_COLOR: RGBColor = RGBColor(128, 128, 128);

impl Colormap {
    fn stops(&self) -> &'static [(f64, [u8; 3])] {
        match self {
            Colormap::Diverging => &DIVERGING_STOPS,
            Colormap::Sequential => &SEQUENTIAL_STOPS,
        }
    }

    /// Color at fraction `t` of the scale, clamped to [0, 1]
    pub fn color_at(&self, t: f64) -> RGBColor {
        if t.is_nan() {
            return MISSING_COLOR;
        }
        let t = t.clamp(0.0, 1.0);
        let stops = self.stops();
        let upper = stops
            .iter()
            .position(|(pos, _)| *pos >= t)
            .unwrap_or(stops.len() - 1)
            .max(1);
        let (p0, c0) = stops[upper - 1];
        let (p1, c1) = stops[upper];
        let frac = if p1 > p0 { (t - p0) / (p1 - p0) } else { 0.0 };
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        RGBColor(mix(c0[0], c1[0]), mix(c0[1], c1[1]), mix(c0[2], c1[2]))
    }

    /// Color for `value` on the scale `[lo, hi]`
    pub fn color_for(&self, value: f64, lo: f64, hi: f64) -> RGBColor {
        if !value.is_finite() {
            return MISSING_COLOR;
        }
        self.color_at((value - lo) / (hi - lo))
    }
}

/// Render options
#[derive(Debug, Clone)]
pub struct MapPlotConfig {
    pub title: String,
    /// Output size in pixels
    pub size: (u32, u32),
    /// Fixed color range; derived from the data when `None`
    pub range: Option<(f64, f64)>,
    pub colormap: Colormap,
    /// Width of the colorbar panel in pixels, zero hides it. The colorbar
    /// and a non-empty title are the only text drawn.
    pub colorbar_width: u32,
}

impl Default for MapPlotConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            size: (640, 560),
            range: None,
            colormap: Colormap::Diverging,
            colorbar_width: 110,
        }
    }
}

fn plot_err<E: std::fmt::Display>(err: E) -> VizError {
    VizError::PlotError(err.to_string())
}

/// Draw `image` to a PNG at `path` with a colorbar on the right.
pub fn render_png(image: &MapImage, config: &MapPlotConfig, path: &Path) -> Result<()> {
    let (lo, hi) = match config.range {
        Some(range) => range,
        None => match config.colormap {
            Colormap::Diverging => image.symmetric_range(),
            Colormap::Sequential => image.finite_range(),
        }
        .unwrap_or((0.0, 1.0)),
    };
    if !(lo.is_finite() && hi.is_finite() && hi > lo) {
        return Err(VizError::ImageError(format!(
            "invalid color range [{lo}, {hi}]"
        )));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let root = BitMapBackend::new(path, config.size).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let bar_width = config.colorbar_width.min(config.size.0 / 2);
    let (map_area, bar_area) = root.split_horizontally(config.size.0 - bar_width);

    let width = image.width();
    let height = image.height();
    let mut builder = ChartBuilder::on(&map_area);
    builder.margin(10);
    if !config.title.is_empty() {
        builder.caption(&config.title, ("sans-serif", 20));
    }
    let mut chart = builder
        .build_cartesian_2d(0..width, 0..height)
        .map_err(plot_err)?;

    // Flip rows so row 0 lands at the top
    chart
        .draw_series((0..height).flat_map(|row| {
            (0..width).map(move |col| {
                let y = height - 1 - row;
                Rectangle::new(
                    [(col, y), (col + 1, y + 1)],
                    config
                        .colormap
                        .color_for(image.get(col, row), lo, hi)
                        .filled(),
                )
            })
        }))
        .map_err(plot_err)?;

    if bar_width > 0 {
        const STEPS: usize = 128;
        let mut bar = ChartBuilder::on(&bar_area)
            .margin_top(40)
            .margin_bottom(20)
            .margin_right(10)
            .y_label_area_size(70)
            .build_cartesian_2d(0.0..1.0, lo..hi)
            .map_err(plot_err)?;
        bar.configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .disable_x_axis()
            .y_labels(5)
            .y_label_formatter(&|v| format!("{v:.3e}"))
            .draw()
            .map_err(plot_err)?;
        let step = (hi - lo) / STEPS as f64;
        bar.draw_series((0..STEPS).map(|i| {
            let v0 = lo + step * i as f64;
            Rectangle::new(
                [(0.0, v0), (1.0, v0 + step)],
                config
                    .colormap
                    .color_at((i as f64 + 0.5) / STEPS as f64)
                    .filled(),
            )
        }))
        .map_err(plot_err)?;
    }

    root.present().map_err(plot_err)?;
    log::debug!("Wrote map render to {}", path.display());
    Ok(())
}
