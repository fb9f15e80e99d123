//! Small end-to-end runs of the scan-and-solve chain.

use scansim::render::{render_gnomonic, GnomonicPatch};
use scansim::scan::{HwpModulation, RotationSchedule};
use scansim::sims::{difference_maps, run_demo, DemoConfig};
use scansim::sky::{synalm, PowerSpectrum, SpectrumLayout, SpectrumUnits};
use std::path::Path;
use test_helpers::{output_path, write_spectrum_fixture};
use viz::MapPlotConfig;

fn small_config(spectrum: &Path) -> DemoConfig {
    DemoConfig {
        spectrum_path: spectrum.to_path_buf(),
        lmax: 24,
        nrow: 2,
        ncol: 2,
        fwhm_arcmin: 300.0,
        duration: 2.0 * 3600.0,
        sample_rate: 5.0,
        ctime0: Some(1_700_000_000.0),
        nside_spin: 16,
        nside_out: 16,
        rotation: RotationSchedule::periodic(900.0, 0.0),
        hwp: HwpModulation::continuous(0.7),
        chunk_duration: 1800.0,
        cond_tolerance: 0.5,
        ..DemoConfig::default()
    }
}

#[test]
fn test_recovered_maps_match_smoothed_input() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let spectrum = dir.path().join("cls.dat");
    write_spectrum_fixture(&spectrum, 40).unwrap();
    let config = small_config(&spectrum);

    let mut progress = Vec::new();
    let result = run_demo(&config, |idx, total| progress.push((idx, total))).unwrap();
    assert_eq!(result.nchunks, 4);
    assert_eq!(progress.last(), Some(&(3, 4)));
    assert_eq!(result.detector_samples, 8 * 36_000);

    let cmp = &result.comparison;
    assert!(cmp.scanned > 0);
    assert!(cmp.solved > 0);
    assert!(cmp.solved <= cmp.scanned);
    for stokes in 0..3 {
        let scale = result
            .input
            .row(stokes)
            .iter()
            .fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert!(scale > 0.0);
        assert!(
            cmp.max_abs_diff[stokes] <= 1e-8 * scale,
            "stokes {stokes}: residual {} against amplitude {scale}",
            cmp.max_abs_diff[stokes]
        );
    }
    assert!(
        cmp.cond_near_min > 0.5,
        "only {:.2} of scanned pixels have condition near 2",
        cmp.cond_near_min
    );

    // unscanned pixels are undefined everywhere
    let solved = &result.solved;
    for pix in 0..solved.npix() {
        if solved.hits[pix] == 0.0 {
            assert!(solved.cond[pix].is_nan());
            assert!(solved.maps[[0, pix]].is_nan());
        } else {
            assert!(!solved.cond[pix].is_nan());
        }
    }
    for pix in solved.valid_pixels() {
        assert!(solved.cond[pix] <= config.cond_threshold);
    }
    assert_eq!(cmp.undefined_cond, cmp.unscanned());

    let diff = difference_maps(&result.input, solved);
    let patch = GnomonicPatch::square(config.scan.ra0, config.scan.dec0, 60.0, 30.0);
    let plot = MapPlotConfig {
        colorbar_width: 0,
        ..MapPlotConfig::default()
    };
    let png = output_path("end_to_end_diff_I.png");
    render_gnomonic(&diff.row(0).to_vec(), &patch, &plot, &png).unwrap();
    assert!(png.exists());
}

#[test]
fn test_sky_realization_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let spectrum_path = dir.path().join("cls.dat");
    write_spectrum_fixture(&spectrum_path, 64).unwrap();
    let spectrum =
        PowerSpectrum::from_file(&spectrum_path, SpectrumLayout::Lensed, SpectrumUnits::Dl, 48)
            .unwrap();

    let first = synalm(&spectrum, 48, 25).unwrap();
    let second = synalm(&spectrum, 48, 25).unwrap();
    let other = synalm(&spectrum, 48, 26).unwrap();
    assert_eq!(first.t.as_slice(), second.t.as_slice());
    assert_eq!(first.e.as_slice(), second.e.as_slice());
    assert_eq!(first.b.as_slice(), second.b.as_slice());
    assert_ne!(first.t.as_slice(), other.t.as_slice());
}

#[test]
fn test_scan_without_modulation_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let spectrum = dir.path().join("cls.dat");
    write_spectrum_fixture(&spectrum, 40).unwrap();
    // a single detector angle cannot separate Q from U
    let config = DemoConfig {
        nrow: 1,
        ncol: 1,
        fov_deg: 0.0,
        kill_fraction: 0.5,
        duration: 1200.0,
        rotation: RotationSchedule::fixed(0.0),
        hwp: HwpModulation::None,
        chunk_duration: 1200.0,
        ..small_config(&spectrum)
    };
    let result = run_demo(&config, |_, _| {}).unwrap();
    assert!(result.comparison.scanned > 0);
    assert_eq!(result.comparison.solved, 0);
    assert_eq!(result.comparison.cond_near_min, 0.0);
}
