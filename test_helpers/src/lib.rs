//! Test helpers for the scan simulation workspace
//!
//! Output directories for test artifacts and small synthetic inputs shared by
//! unit tests, integration tests and benchmarks.

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Returns the path to the project root directory.
///
/// This function searches for the project root by looking for the Cargo.toml file
/// that defines the workspace. It starts from the current directory and moves up
/// until it finds the workspace root.
///
/// # Returns
/// * Ok(PathBuf) - The path to the project root
/// * Err(TestHelperError) - If the project root could not be found
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    // Search for workspace Cargo.toml
    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            // Check if this is the workspace root
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        // Go up one directory
        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Lazily initialized project root path
static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// Returns the path to the output directory for test artifacts.
///
/// This function returns a path to a directory where test outputs like
/// images, plots, and other artifacts can be saved. It creates the directory
/// if it doesn't exist.
///
/// # Returns
/// * PathBuf - The path to the output directory
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    // Create the directory if it doesn't exist
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Returns a path within the output directory.
///
/// This is a convenience function for building paths relative to the output directory.
///
/// # Arguments
/// * `path` - The relative path within the output directory
///
/// # Returns
/// * PathBuf - The full path to the file in the output directory
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Toy CMB-like D_ℓ values in µK² for TT, EE, BB and TE.
///
/// Smooth, positive and with |TE| well inside √(TT·EE), which is all the
/// sky synthesis needs from a fixture.
pub fn toy_spectrum_dl(ell: usize) -> [f64; 4] {
    let l = ell as f64;
    let tt = 1000.0 + 5000.0 * (-((l - 220.0) / 150.0).powi(2)).exp();
    let ee = 1.0 + 40.0 * (-((l - 1000.0) / 600.0).powi(2)).exp();
    let bb = 0.02 + 0.05 * (l / 1000.0);
    let te = 0.3 * (tt * ee).sqrt() * (l / 120.0).cos();
    [tt, ee, bb, te]
}

/// Write a lensed-layout table (`ell TT EE BB TE`, D_ℓ) from ℓ = 2 to `lmax`.
pub fn write_spectrum_fixture<P: AsRef<Path>>(path: P, lmax: usize) -> std::io::Result<()> {
    use std::fmt::Write as _;
    let mut text = String::from("#    L    TT             EE             BB             TE\n");
    for ell in 2..=lmax {
        let [tt, ee, bb, te] = toy_spectrum_dl(ell);
        // writing to a String cannot fail
        let _ = writeln!(text, "{ell:6} {tt:14.6e} {ee:14.6e} {bb:14.6e} {te:14.6e}");
    }
    std::fs::write(path, text)
}
