//! `.npz` persistence of surface tensors
//!
//! Entry names and dtypes:
//!
//! | entry      | dtype      | shape      |
//! |------------|------------|------------|
//! | `x`        | float64    | Nx         |
//! | `tt`       | float64    | Nt         |
//! | `uu`       | complex64  | Nt x Nx    |
//! | `features` | float32    | Nt x Nx x F|
//! | `mask`     | uint8      | Nt x Nx    |
//! | `symbol`   | uint8      | UTF-8 bytes|
//! | `expiry`   | uint8      | UTF-8 bytes|

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use ndarray::{Array, Array1, Dimension};
use ndarray_npy::{NpzReader, NpzWriter, ReadableElement};
use num_complex::{Complex32, Complex64};
use tracing::{debug, warn};

use crate::error::{SurfaceError, SurfaceResult};
use crate::surface::SurfaceTensor;

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".partial");
    PathBuf::from(name)
}

fn write_npz(tensor: &SurfaceTensor, path: &Path) -> SurfaceResult<()> {
    let ser = |e: ndarray_npy::WriteNpzError| SurfaceError::serialization(e.to_string());

    let file = BufWriter::new(File::create(path)?);
    let mut npz = NpzWriter::new(file);

    let uu = tensor.uu.mapv(|z| Complex32::new(z.re as f32, z.im as f32));
    let features = tensor.features.mapv(|v| v as f32);
    let symbol = Array1::from_vec(tensor.symbol.as_bytes().to_vec());
    let expiry = Array1::from_vec(tensor.expiry.as_bytes().to_vec());

    npz.add_array("x", &tensor.x).map_err(ser)?;
    npz.add_array("tt", &tensor.tt).map_err(ser)?;
    npz.add_array("uu", &uu).map_err(ser)?;
    npz.add_array("features", &features).map_err(ser)?;
    npz.add_array("mask", &tensor.mask).map_err(ser)?;
    npz.add_array("symbol", &symbol).map_err(ser)?;
    npz.add_array("expiry", &expiry).map_err(ser)?;
    npz.finish().map_err(ser)?;
    Ok(())
}

/// Write `tensor` to `path` as an `.npz` archive.
///
/// The archive is written next to the destination under a `.partial` name and
/// renamed into place only once complete; on failure nothing is left at `path`.
pub fn write_surface(tensor: &SurfaceTensor, path: impl AsRef<Path>) -> SurfaceResult<()> {
    let path = path.as_ref();
    tensor.check_shapes()?;
    let partial = partial_path(path);

    if let Err(e) = write_npz(tensor, &partial) {
        if fs::remove_file(&partial).is_err() {
            warn!(path = %partial.display(), "could not remove partial output");
        }
        return Err(match e {
            SurfaceError::Io(io) => SurfaceError::serialization(format!("{}: {io}", path.display())),
            other => other,
        });
    }
    fs::rename(&partial, path)?;
    debug!(path = %path.display(), nx = tensor.nx(), nt = tensor.nt(), "surface written");
    Ok(())
}

fn read_entry<E, D>(npz: &mut NpzReader<File>, name: &str) -> SurfaceResult<Array<E, D>>
where
    E: ReadableElement,
    D: Dimension,
{
    match npz.by_name(name) {
        Ok(array) => Ok(array),
        Err(_) => npz
            .by_name(&format!("{name}.npy"))
            .map_err(|e| SurfaceError::serialization(format!("entry '{name}': {e}"))),
    }
}

fn read_string(npz: &mut NpzReader<File>, name: &str) -> SurfaceResult<String> {
    let bytes: Array1<u8> = read_entry(npz, name)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| SurfaceError::serialization(format!("entry '{name}': {e}")))
}

/// Read a bundle written by [`write_surface`], widening stored dtypes back to `f64`.
pub fn read_surface(path: impl AsRef<Path>) -> SurfaceResult<SurfaceTensor> {
    let file = File::open(path.as_ref())?;
    let mut npz = NpzReader::new(file).map_err(|e| SurfaceError::serialization(e.to_string()))?;

    let x = read_entry(&mut npz, "x")?;
    let tt = read_entry(&mut npz, "tt")?;
    let uu: ndarray::Array2<Complex32> = read_entry(&mut npz, "uu")?;
    let features: ndarray::Array3<f32> = read_entry(&mut npz, "features")?;
    let mask = read_entry(&mut npz, "mask")?;
    let symbol = read_string(&mut npz, "symbol")?;
    let expiry = read_string(&mut npz, "expiry")?;

    let tensor = SurfaceTensor {
        x,
        tt,
        uu: uu.mapv(|z| Complex64::new(z.re as f64, z.im as f64)),
        features: features.mapv(f64::from),
        mask,
        symbol,
        expiry,
    };
    tensor.check_shapes()?;
    Ok(tensor)
}
