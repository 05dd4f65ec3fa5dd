//! Export of complex sensitivity maps.
//!
//! A full export recomputes every coil on the whole grid, which can take a long time.
//! [ExportJob] takes a snapshot of the scanner so the work can run on a background
//! thread while the live scanner keeps being edited. The outcome, success or failure, is
//! delivered exactly once through the [ExportTask] handle.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::{Array3, Array4, ArrayView2, Axis as ArrayAxis};
use num_complex::Complex64;
use tracing::{info, warn};

use crate::coil::Coil;
use crate::config::SolverConfig;
use crate::error::ExportError;
use crate::scanner::Scanner;
use crate::slice::{
    check_grid, complex_combine, plane_coordinates, slice_scalar, Axis, SliceLocation,
};
use crate::volume::SamplingVolume;

type Endianness = LittleEndian;

/// Per-coil complex sensitivity maps `Bx - i By` on a common grid.
#[derive(Clone, Debug, PartialEq)]
pub struct SensitivityMaps {
    shape: [usize; 3],
    maps: Vec<Array3<Complex64>>,
}

impl SensitivityMaps {
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn maps(&self) -> &[Array3<Complex64>] {
        &self.maps
    }

    /// All maps stacked along a leading coil axis: `(n_coils, nx, ny, nz)`.
    pub fn stacked(&self) -> Array4<Complex64> {
        let [nx, ny, nz] = self.shape;
        let mut stacked = Array4::zeros((self.maps.len(), nx, ny, nz));
        for (mut target, map) in stacked.axis_iter_mut(ArrayAxis(0)).zip(self.maps.iter()) {
            target.assign(map);
        }
        stacked
    }

    /// Writes the maps as little-endian binary.
    ///
    /// The header is `n_coils, nx, ny, nz` as `u64`, followed for each coil by the
    /// `(re, im)` pairs of every grid point as `f64`, x slowest and z fastest.
    pub fn write_binary<W: Write>(&self, writer: &mut W) -> Result<(), ExportError> {
        writer.write_u64::<Endianness>(self.maps.len() as u64)?;
        for n in self.shape.iter() {
            writer.write_u64::<Endianness>(*n as u64)?;
        }
        for map in self.maps.iter() {
            for value in map.iter() {
                writer.write_f64::<Endianness>(value.re)?;
                writer.write_f64::<Endianness>(value.im)?;
            }
        }
        Ok(())
    }

    /// Reads maps written by [SensitivityMaps::write_binary].
    pub fn read_binary<R: Read>(reader: &mut R) -> Result<SensitivityMaps, ExportError> {
        let n_coils = reader.read_u64::<Endianness>()? as usize;
        let mut shape = [0usize; 3];
        for n in shape.iter_mut() {
            *n = reader.read_u64::<Endianness>()? as usize;
        }
        let points = shape[0] * shape[1] * shape[2];
        let mut maps = Vec::with_capacity(n_coils);
        for _ in 0..n_coils {
            let mut values = Vec::with_capacity(points);
            for _ in 0..points {
                let re = reader.read_f64::<Endianness>()?;
                let im = reader.read_f64::<Endianness>()?;
                values.push(Complex64::new(re, im));
            }
            let map = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
            })?;
            maps.push(map);
        }
        Ok(SensitivityMaps { shape, maps })
    }

    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<(), ExportError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_binary(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_binary<P: AsRef<Path>>(path: P) -> Result<SensitivityMaps, ExportError> {
        let mut reader = BufReader::new(File::open(path)?);
        SensitivityMaps::read_binary(&mut reader)
    }
}

/// Writes a complex slice as CSV, one row per grid point of the plane.
///
/// Columns are the two in-plane coordinates followed by the real part, imaginary part,
/// magnitude and phase.
pub fn write_slice_csv<W: Write>(
    writer: W,
    volume: &SamplingVolume,
    axis: Axis,
    slice: ArrayView2<Complex64>,
) -> Result<(), ExportError> {
    let (row_axis, col_axis) = axis.others();
    let (rows, cols) = plane_coordinates(volume, axis);
    check_grid(vec![rows.len(), cols.len()], slice.shape().to_vec())?;
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&[
        row_axis.to_string(),
        col_axis.to_string(),
        "re".to_string(),
        "im".to_string(),
        "magnitude".to_string(),
        "phase".to_string(),
    ])?;
    for ((i, j), value) in slice.indexed_iter() {
        wtr.serialize((rows[i], cols[j], value.re, value.im, value.norm(), value.arg()))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cuts coil `coil` of `maps` and writes the slice as CSV.
pub fn export_slice_csv<W: Write>(
    writer: W,
    maps: &SensitivityMaps,
    coil: usize,
    volume: &SamplingVolume,
    axis: Axis,
    location: SliceLocation,
) -> Result<(), ExportError> {
    let map = maps.maps.get(coil).ok_or(crate::error::FieldError::CoilIndex {
        index: coil,
        len: maps.len(),
    })?;
    let slice = slice_scalar(map.view(), volume, axis, location)?;
    write_slice_csv(writer, volume, axis, slice.view())
}

/// A snapshot of everything needed to compute sensitivity maps.
#[derive(Clone, Debug)]
pub struct ExportJob {
    volume: SamplingVolume,
    coils: Vec<Coil>,
    config: SolverConfig,
}

impl ExportJob {
    pub fn new(volume: SamplingVolume, coils: Vec<Coil>, config: SolverConfig) -> ExportJob {
        ExportJob {
            volume,
            coils,
            config,
        }
    }

    /// Snapshots the current state of `scanner`.
    pub fn from_scanner(scanner: &Scanner) -> ExportJob {
        ExportJob::new(
            scanner.volume().clone(),
            scanner.coils().to_vec(),
            *scanner.config(),
        )
    }

    pub fn volume(&self) -> &SamplingVolume {
        &self.volume
    }

    /// Recomputes every coil and forms its sensitivity map on the calling thread.
    pub fn run(mut self) -> Result<SensitivityMaps, ExportError> {
        let started = Instant::now();
        info!(coils = self.coils.len(), points = self.volume.len(), "starting export");
        let mut maps = Vec::with_capacity(self.coils.len());
        for coil in self.coils.iter_mut() {
            let composite = coil.recompute(&self.volume, &self.config)?;
            maps.push(complex_combine(composite));
        }
        info!(
            coils = maps.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "finished export"
        );
        Ok(SensitivityMaps {
            shape: self.volume.shape(),
            maps,
        })
    }

    /// Runs the job on a named background thread.
    pub fn spawn(self) -> Result<ExportTask, ExportError> {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("coilsim-export".to_string())
            .spawn(move || {
                let result = self.run();
                if let Err(e) = &result {
                    warn!(error = %e, "export failed");
                }
                // The receiver may already be gone; the result is simply dropped then.
                let _ = sender.send(result);
            })?;
        Ok(ExportTask {
            receiver,
            handle: Some(handle),
        })
    }
}

/// Handle to a running export. Completion is signalled exactly once.
#[derive(Debug)]
pub struct ExportTask {
    receiver: Receiver<Result<SensitivityMaps, ExportError>>,
    handle: Option<JoinHandle<()>>,
}

impl ExportTask {
    /// Returns the outcome if the export has finished, without blocking.
    pub fn try_result(&mut self) -> Option<Result<SensitivityMaps, ExportError>> {
        match self.receiver.try_recv() {
            Ok(result) => {
                self.join();
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.join();
                Some(Err(ExportError::WorkerLost))
            }
        }
    }

    /// Blocks until the export has finished.
    pub fn wait(mut self) -> Result<SensitivityMaps, ExportError> {
        let result = self.receiver.recv().unwrap_or(Err(ExportError::WorkerLost));
        self.join();
        result
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("export worker panicked");
            }
        }
    }
}
