use crate::error::Result;
use crate::types::VolumeDims;
use nifti::NiftiHeader;
use std::path::Path;

/// Reads the voxel dimensions of a volume file
///
/// The selector only needs the slice count, so implementations should read
/// as little of the file as the format allows.
pub trait VolumeProbe {
    /// Returns the dimensions of the volume at `path`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or is not a volume
    fn dims(&self, path: &Path) -> Result<VolumeDims>;
}

impl<P: VolumeProbe + ?Sized> VolumeProbe for &P {
    fn dims(&self, path: &Path) -> Result<VolumeDims> {
        (**self).dims(path)
    }
}

/// Probe reading the NIfTI-1 header of `.nii` and `.nii.gz` files
///
/// Only the 348-byte header is decoded; the voxel data is never read.
#[derive(Debug, Clone, Copy, Default)]
pub struct NiftiProbe;

impl VolumeProbe for NiftiProbe {
    fn dims(&self, path: &Path) -> Result<VolumeDims> {
        let header = NiftiHeader::from_file(path)?;
        Ok(dims_from_header(&header))
    }
}

/// Extracts (W, H, slices) from `dim`, treating missing axes as extent 1
fn dims_from_header(header: &NiftiHeader) -> VolumeDims {
    let [ndim, w, h, z, ..] = header.dim;
    let axis = |index: u16, extent: u16| if ndim >= index { extent.max(1) } else { 1 };
    VolumeDims::new(axis(1, w), axis(2, h), axis(3, z))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    /// Writes a little-endian NIfTI-1 single-file header, padded to `total_size` bytes
    pub(crate) fn write_nifti(path: &Path, dims: [u16; 3], total_size: usize) {
        let mut header = vec![0u8; 352];
        header[0..4].copy_from_slice(&348i32.to_le_bytes());
        let dim: [i16; 8] = [3, dims[0] as i16, dims[1] as i16, dims[2] as i16, 1, 1, 1, 1];
        for (i, d) in dim.iter().enumerate() {
            let offset = 40 + i * 2;
            header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
        }
        // datatype INT16, bitpix 16
        header[70..72].copy_from_slice(&4i16.to_le_bytes());
        header[72..74].copy_from_slice(&16i16.to_le_bytes());
        for i in 0..4 {
            let offset = 76 + i * 4;
            header[offset..offset + 4].copy_from_slice(&1f32.to_le_bytes());
        }
        header[108..112].copy_from_slice(&352f32.to_le_bytes());
        header[112..116].copy_from_slice(&1f32.to_le_bytes());
        header[344..348].copy_from_slice(b"n+1\0");

        let mut file = File::create(path).unwrap();
        file.write_all(&header).unwrap();
        if total_size > header.len() {
            file.write_all(&vec![0u8; total_size - header.len()]).unwrap();
        }
    }

    #[test]
    fn test_nifti_probe_reads_dims() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scan.nii");
        write_nifti(&path, [512, 512, 240], 4096);

        let dims = NiftiProbe.dims(&path).unwrap();

        assert_eq!(dims, VolumeDims::new(512, 512, 240));
    }

    #[test]
    fn test_nifti_probe_rejects_garbage() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.nii");
        std::fs::write(&path, b"not a nifti file").unwrap();

        assert!(NiftiProbe.dims(&path).is_err());
    }

    #[test]
    fn test_nifti_probe_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        assert!(NiftiProbe.dims(&temp_dir.path().join("missing.nii")).is_err());
    }

    #[test]
    fn test_dims_from_header_two_dimensional() {
        let mut header = NiftiHeader::default();
        header.dim = [2, 256, 128, 0, 0, 0, 0, 0];

        assert_eq!(dims_from_header(&header), VolumeDims::new(256, 128, 1));
    }
}
