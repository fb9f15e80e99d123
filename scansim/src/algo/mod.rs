//! Numerical building blocks shared by the scan simulation
//!
//! Quaternion algebra for pointing, plus small array helpers.

pub mod misc;
pub mod quaternion;

pub use misc::{linspace, wrap_degrees};
pub use quaternion::Quaternion;
