//! CMB scan simulation demo
//!
//! Draws a sky from a power spectrum, scans it with a grid focal plane from
//! a ground site, bins the detector timestreams into I/Q/U maps and checks
//! the recovered maps against the input sky smoothed by the same beam.
//!
//! Usage:
//! ```
//! cargo run --release --bin scan_demo -- [OPTIONS]
//! ```
//!
//! See --help for detailed options.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use scansim::hardware::Site;
use scansim::render::{render_gnomonic, GnomonicPatch};
use scansim::shared_args::{parse_site, DurationArg};
use scansim::sims::{difference_maps, run_demo, DemoConfig, DemoResult};
use std::path::{Path, PathBuf};
use viz::histogram::{Histogram, HistogramConfig, Scale};
use viz::{Colormap, MapPlotConfig};

/// Command line arguments for the scan demo
#[derive(Parser, Debug)]
#[command(
    name = "Scan Demo",
    about = "Simulates a CMB scan, solves I/Q/U maps and compares them with the input sky",
    long_about = None
)]
struct Args {
    /// JSON configuration file; defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for rendered maps
    #[arg(long, default_value = "plots/scan_demo")]
    output_dir: PathBuf,

    /// Override the maximum multipole
    #[arg(long)]
    lmax: Option<usize>,

    /// Override both the sky and output map nside
    #[arg(long)]
    nside: Option<usize>,

    /// Override the mission length (e.g. 24h, 90m, 1h30m)
    #[arg(long)]
    duration: Option<DurationArg>,

    /// Override the sky realization seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the site: spole, atacama or LAT,LON
    #[arg(long, value_parser = parse_site)]
    site: Option<Site>,

    /// Unix time of the first sample
    #[arg(long)]
    ctime0: Option<f64>,

    /// Write the effective configuration to this JSON file
    #[arg(long)]
    save_config: Option<PathBuf>,

    /// Side of the rendered sky patch in degrees
    #[arg(long, default_value_t = 60.0)]
    patch_size: f64,

    /// Rendered patch resolution in arcminutes per sample
    #[arg(long, default_value_t = 10.0)]
    resolution: f64,

    /// Skip PNG rendering
    #[arg(long, default_value_t = false)]
    no_plots: bool,
}

impl Args {
    fn demo_config(&self) -> Result<DemoConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => DemoConfig::from_json_file(path)?,
            None => DemoConfig::default(),
        };
        if let Some(lmax) = self.lmax {
            config.lmax = lmax;
        }
        if let Some(nside) = self.nside {
            config.nside_spin = nside;
            config.nside_out = nside;
        }
        if let Some(duration) = self.duration {
            config.duration = duration.seconds();
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(site) = self.site {
            config.site = site;
        }
        if self.ctime0.is_some() {
            config.ctime0 = self.ctime0;
        }
        Ok(config)
    }
}

fn print_config(config: &DemoConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Scan demo configuration");
    println!("  spectrum:    {}", config.spectrum_path.display());
    println!("  lmax / seed: {} / {}", config.lmax, config.seed);
    println!("  focal plane: {}", config.focal_plane_summary()?);
    println!(
        "  site:        lat {:.2} deg, lon {:.2} deg",
        config.site.lat_deg, config.site.lon_deg
    );
    println!(
        "  mission:     {} at {} Hz ({} samples per chunk)",
        DurationArg(config.duration),
        config.sample_rate,
        config.chunk_size()
    );
    println!(
        "  nside:       {} (sky) / {} (maps)",
        config.nside_spin, config.nside_out
    );
    println!("  rotation:    {:?}", config.rotation.period);
    println!("  hwp:         {:?}", config.hwp);
    Ok(())
}

fn print_summary(result: &DemoResult) -> Result<(), Box<dyn std::error::Error>> {
    let cmp = &result.comparison;
    println!();
    println!(
        "Scanned {} detector samples in {} chunks",
        result.detector_samples, result.nchunks
    );
    println!(
        "Pixels: {} total, {} scanned, {} solved, {} unscanned",
        cmp.npix,
        cmp.scanned,
        cmp.solved,
        cmp.unscanned()
    );
    for (stokes, name) in ["I", "Q", "U"].iter().enumerate() {
        println!(
            "  {name}: max |recovered - input| = {:.3e}, rms = {:.3e}",
            cmp.max_abs_diff[stokes], cmp.rms_diff[stokes]
        );
    }
    println!(
        "Condition number near 2 on {:.2}% of scanned pixels",
        100.0 * cmp.cond_near_min
    );

    let config = HistogramConfig {
        title: Some("Condition number of scanned pixels".to_string()),
        scale: Scale::Log10,
        ..HistogramConfig::default()
    };
    let mut hist = Histogram::new_log_bins(1.0..1.0e3, 15)?.with_config(config);
    hist.add_all(
        result
            .solved
            .cond
            .iter()
            .zip(&result.solved.hits)
            .filter(|(_, &h)| h > 0.0)
            .map(|(&c, _)| c),
    );
    hist.print()?;
    Ok(())
}

fn render_maps(
    result: &DemoResult,
    config: &DemoConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&args.output_dir)?;
    let patch = GnomonicPatch::square(config.scan.ra0, config.scan.dec0, args.patch_size, args.resolution);
    let out = |name: &str| -> PathBuf { args.output_dir.join(format!("{name}.png")) };
    let diff = difference_maps(&result.input, &result.solved);

    for (stokes, name) in ["I", "Q", "U"].iter().enumerate() {
        let input = result.input.row(stokes).to_vec();
        // same color range for input and output
        let amp = input
            .iter()
            .filter(|v| v.is_finite())
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        let range = if amp > 0.0 { Some((-amp, amp)) } else { None };
        let plot = |title: String| MapPlotConfig {
            title,
            range,
            ..MapPlotConfig::default()
        };

        render_gnomonic(&input, &patch, &plot(format!("Input {name}")), &out(&format!("input_{name}")))?;
        let output = result.solved.maps.row(stokes).to_vec();
        render_gnomonic(&output, &patch, &plot(format!("Recovered {name}")), &out(&format!("output_{name}")))?;

        let residual = diff.row(stokes).to_vec();
        let diff_config = MapPlotConfig {
            title: format!("Recovered - input {name}"),
            ..MapPlotConfig::default()
        };
        render_gnomonic(&residual, &patch, &diff_config, &out(&format!("diff_{name}")))?;
    }

    let cond_config = MapPlotConfig {
        title: "Condition number".to_string(),
        range: Some((2.0, 3.0)),
        colormap: Colormap::Sequential,
        ..MapPlotConfig::default()
    };
    render_gnomonic(&result.solved.cond, &patch, &cond_config, &out("cond"))?;
    info!("Wrote map renders to {}", args.output_dir.display());
    Ok(())
}

fn save_config(config: &DemoConfig, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    config.to_json_file(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging from environment variables
    env_logger::init();

    let args = Args::parse();
    let config = args.demo_config()?;
    print_config(&config)?;
    if let Some(path) = &args.save_config {
        save_config(&config, path)?;
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_message("Scanning chunks");
    let result = run_demo(&config, |idx, total| {
        pb.set_length(total as u64);
        pb.set_position(idx as u64 + 1);
    })?;
    pb.finish_with_message("Scan complete");

    print_summary(&result)?;
    if result.comparison.solved == 0 {
        warn!("No pixels were solved; check the scan and modulation settings");
    }
    if !args.no_plots {
        render_maps(&result, &config, &args)?;
    }
    Ok(())
}
