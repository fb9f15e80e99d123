//! Visualization for simulated sky maps and their diagnostics.
//!
//! Two kinds of output are supported:
//!
//! - **PNG map renders** (`skymap`): a regular grid of samples, typically a
//!   gnomonic patch cut from a HEALPix map, drawn with a fixed color range and
//!   a colorbar. Undefined samples (NaN) are drawn grey so unscanned sky stands
//!   out from zero-valued sky.
//! - **ASCII histograms** (`histogram`): terminal summaries of per-pixel
//!   quantities such as condition numbers or residuals. Non-finite values are
//!   counted separately instead of being dropped silently.
//!
//! The crate knows nothing about pixelizations; callers sample their maps onto
//! a [`skymap::MapImage`] first.

use std::fmt;
use thiserror::Error;

/// Error types for visualization operations.
#[derive(Debug, Error)]
pub enum VizError {
    /// Histogram creation or analysis error.
    #[error("Histogram error: {0}")]
    HistogramError(String),

    /// Text formatting error.
    #[error("Formatting error: {0}")]
    FmtError(#[from] fmt::Error),

    /// Bad image dimensions or color range.
    #[error("Map image error: {0}")]
    ImageError(String),

    /// Failure inside the plotting backend.
    #[error("Plotting error: {0}")]
    PlotError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Standard Result type for all visualization operations.
pub type Result<T> = std::result::Result<T, VizError>;

pub mod histogram;
pub mod skymap;

pub use histogram::{Histogram, HistogramConfig, Scale};
pub use skymap::{render_png, Colormap, MapImage, MapPlotConfig};
