//! End-to-end simulation runs built from the library pieces

pub mod pipeline;

pub use pipeline::{difference_maps, run_demo, DemoConfig, DemoResult, MapComparison};
