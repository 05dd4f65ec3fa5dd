//! Sensitivity maps of a circular loop and a rectangular coil.

extern crate coilsim as lib;

use lib::config::SolverConfig;
use lib::curve::Curve;
use lib::export::ExportJob;
use lib::scanner::Scanner;
use lib::slice::{magnitude, phase, slice_scalar, Axis, ColorNorm, SliceLocation};
use nalgebra::Vector3;
use std::f64::consts::PI;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info"))
        .init();

    let mut scanner = Scanner::create(
        &[1.0, -5.0, -1.0, 6.0, 5.0, 1.0],
        &[0.5, 0.5, 0.5],
        SolverConfig::default(),
    )?;

    // Circular loop of radius 1 in the plane x = 0.
    let circle = scanner.add_coil();
    scanner.add_segment(circle, Curve::circle(1.0, Axis::X, 0.0, (0.0, 0.0))?, 0.0, 2.0 * PI)?;

    // Rectangular coil in the plane x = 0, built from four straight wires.
    let rectangle = scanner.add_coil();
    let corners = [
        Vector3::new(0.0, -2.0, -1.5),
        Vector3::new(0.0, 2.0, -1.5),
        Vector3::new(0.0, 2.0, 1.5),
        Vector3::new(0.0, -2.0, 1.5),
    ];
    for i in 0..corners.len() {
        let start = corners[i];
        let end = corners[(i + 1) % corners.len()];
        scanner.add_segment(rectangle, Curve::straight(start, end - start)?, 0.0, 1.0)?;
    }

    let maps = ExportJob::from_scanner(&scanner).spawn()?.wait()?;

    for (index, map) in maps.maps().iter().enumerate() {
        let slice = slice_scalar(map.view(), scanner.volume(), Axis::Z, SliceLocation::Coordinate(0.0))?;
        let mag = magnitude(slice.view());
        let arg = phase(slice.view());
        let norm = ColorNorm::for_data(arg.iter());
        println!(
            "coil {}: peak |B| {:.3}, phase range {:?}",
            index,
            mag.iter().cloned().fold(0.0, f64::max),
            norm
        );
    }
    Ok(())
}
