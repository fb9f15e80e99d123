//! Histogram visualization
//!
//! Fixed-bin histograms over `f64` samples printed as ASCII bar charts.
//! Values outside the bin range and non-finite values are tallied in their
//! own counters and reported beneath the bars.

use crate::{Result, VizError};
use std::fmt::Write;
use std::ops::Range;

/// Spacing of bin edges and scaling of bar lengths
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// Linear scale
    Linear,
    /// Logarithmic scale (base 10)
    Log10,
}

/// Configuration for histogram display
#[derive(Debug, Clone)]
pub struct HistogramConfig {
    /// Title for the histogram
    pub title: Option<String>,
    /// Character to use for bars
    pub bar_char: char,
    /// Whether to show percentage
    pub show_percentage: bool,
    /// Whether to show counts
    pub show_counts: bool,
    /// Scale of the bar lengths
    pub scale: Scale,
    /// Whether to show empty bins
    pub show_empty_bins: bool,
    /// Maximum bar width in characters
    pub max_bar_width: usize,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            title: None,
            bar_char: '#',
            show_percentage: true,
            show_counts: true,
            scale: Scale::Linear,
            show_empty_bins: false,
            max_bar_width: 40,
        }
    }
}

/// Histogram for continuous data
#[derive(Debug, Clone)]
pub struct Histogram {
    /// Bin edges (boundaries between bins)
    bin_edges: Vec<f64>,
    /// Counts in each bin
    counts: Vec<u64>,
    below: u64,
    above: u64,
    non_finite: u64,
    /// Display configuration
    config: HistogramConfig,
}

impl Histogram {
    /// Create a new histogram with specified bin edges
    pub fn new(bin_edges: Vec<f64>) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 2 bin edges".to_string(),
            ));
        }
        if bin_edges.iter().any(|e| !e.is_finite()) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be finite".to_string(),
            ));
        }
        if bin_edges.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be in ascending order".to_string(),
            ));
        }

        let num_bins = bin_edges.len() - 1;
        Ok(Self {
            bin_edges,
            counts: vec![0; num_bins],
            below: 0,
            above: 0,
            non_finite: 0,
            config: HistogramConfig::default(),
        })
    }

    /// Create a new histogram with equally spaced bins
    pub fn new_equal_bins(range: Range<f64>, num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 1 bin".to_string(),
            ));
        }
        let step = (range.end - range.start) / num_bins as f64;
        let edges = (0..=num_bins)
            .map(|i| range.start + step * i as f64)
            .collect();
        Self::new(edges)
    }

    /// Bins equally spaced in log10 between two positive bounds
    pub fn new_log_bins(range: Range<f64>, num_bins: usize) -> Result<Self> {
        if range.start.is_nan() || range.start <= 0.0 {
            return Err(VizError::HistogramError(
                "Logarithmic bins need a positive lower bound".to_string(),
            ));
        }
        let log_range = range.start.log10()..range.end.log10();
        let mut hist = Self::new_equal_bins(log_range, num_bins)?;
        hist.bin_edges.iter_mut().for_each(|e| *e = 10f64.powf(*e));
        Ok(hist)
    }

    /// Set the configuration for the histogram
    pub fn with_config(mut self, config: HistogramConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a value to the histogram
    pub fn add(&mut self, value: f64) {
        if !value.is_finite() {
            self.non_finite += 1;
            return;
        }
        match self.find_bin(value) {
            Some(idx) => self.counts[idx] += 1,
            None if value < self.bin_edges[0] => self.below += 1,
            None => self.above += 1,
        }
    }

    /// Add multiple values to the histogram
    pub fn add_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.add(value);
        }
    }

    /// Bin index for a value; the last edge belongs to the last bin
    fn find_bin(&self, value: f64) -> Option<usize> {
        let last = self.bin_edges.len() - 1;
        if value < self.bin_edges[0] || value > self.bin_edges[last] {
            return None;
        }
        let idx = self.bin_edges.partition_point(|&edge| edge <= value);
        Some(idx.saturating_sub(1).min(last - 1))
    }

    /// Get the counts in each bin
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Get the bin edges
    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    /// Values that landed in a bin
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// (below range, above range, NaN or infinite)
    pub fn outliers(&self) -> (u64, u64, u64) {
        (self.below, self.above, self.non_finite)
    }

    /// Format the histogram as a string
    pub fn format(&self) -> Result<String> {
        let mut output = String::new();

        if let Some(title) = &self.config.title {
            writeln!(output, "{}", title)?;
            writeln!(output, "{}", "=".repeat(title.chars().count()))?;
        }

        let total = self.total_count();
        let max_count = self.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
        let count_width = self
            .counts
            .iter()
            .map(|c| c.to_string().len())
            .max()
            .unwrap_or(5)
            .max(5);

        for (i, &count) in self.counts.iter().enumerate() {
            if count == 0 && !self.config.show_empty_bins {
                continue;
            }

            let bar_length = match self.config.scale {
                Scale::Linear => {
                    ((count as f64 / max_count) * self.config.max_bar_width as f64).round() as usize
                }
                Scale::Log10 if count > 0 => {
                    let frac = (count as f64).log10() / max_count.log10().max(1.0);
                    (frac * self.config.max_bar_width as f64).round().max(1.0) as usize
                }
                Scale::Log10 => 0,
            };

            write!(
                output,
                "{:>11.4e} - {:<11.4e}",
                self.bin_edges[i],
                self.bin_edges[i + 1]
            )?;
            if self.config.show_counts {
                write!(output, " | {:>width$}", count, width = count_width)?;
            }
            if self.config.show_percentage {
                let percentage = if total > 0 {
                    100.0 * count as f64 / total as f64
                } else {
                    0.0
                };
                write!(output, " | {:6.2}%", percentage)?;
            }
            writeln!(
                output,
                " | {}",
                self.config.bar_char.to_string().repeat(bar_length)
            )?;
        }

        if self.below + self.above + self.non_finite > 0 {
            writeln!(
                output,
                "below range: {}, above range: {}, non-finite: {}",
                self.below, self.above, self.non_finite
            )?;
        }
        if self.config.scale == Scale::Log10 {
            writeln!(output, "Note: bar lengths use a log10 scale")?;
        }

        Ok(output)
    }

    /// Print the histogram to stdout
    pub fn print(&self) -> Result<()> {
        println!("{}", self.format()?);
        Ok(())
    }
}
