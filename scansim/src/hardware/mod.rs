//! Instrument description: observing site, detector beams and focal plane

pub mod beam;
pub mod focal_plane;
pub mod site;

pub use beam::{Beam, BeamShape, Channel};
pub use focal_plane::FocalPlane;
pub use site::{InstrumentError, Site};
