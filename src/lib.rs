//! Biot-Savart field computation for MRI coil loops.
//!
//! Wire geometry is described by [curve::Curve]s restricted to parameter intervals
//! ([segment::Segment]), grouped into [coil::Coil]s and evaluated on the grid of a
//! [volume::SamplingVolume] owned by a [scanner::Scanner].

pub mod axis;
pub mod biot_savart;
pub mod coil;
pub mod config;
pub mod curve;
pub mod error;
pub mod export;
pub mod field;
pub mod quadrature;
pub mod scanner;
pub mod segment;
pub mod slice;
pub mod volume;
pub mod workspace;
