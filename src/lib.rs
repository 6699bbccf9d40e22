//! Detection of earthwork structures along transport corridors.
//!
//! Compares roadway elevation against a regression-reconstructed natural
//! terrain model to classify every metre of a corridor as embankment
//! (remblai), cut (deblai) or at grade (rasant), then assembles the
//! classified stations into named longitudinal segments.

pub mod boundary;
pub mod config;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod io;
pub mod milestone;
pub mod postprocess;
pub mod profile;
pub mod providers;
pub mod raster;
pub mod section;
pub mod segments;
pub mod stats;
pub mod terrain;

pub use config::AnalysisConfig;
pub use detector::{detect_in_window, detect_structures, DetectionOutput};
pub use profile::{Classification, ClassifiedStation, CorridorLine};
pub use segments::StructureSegment;
