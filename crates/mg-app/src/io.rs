//! Raw little-endian matrix files.
//!
//! Inputs from the vocoder front end are f64, everything this tool writes is
//! f32, always frame-major with no header.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use mg_core::frame::FrameMatrix;

fn read_bytes<R: Read>(mut reader: R, sample_size: usize) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).context("Lecture du flux impossible")?;
    if bytes.len() % sample_size != 0 {
        bail!(
            "{} bytes is not a whole number of {sample_size}-byte samples",
            bytes.len()
        );
    }
    Ok(bytes)
}

/// Read f64 samples and split them into frames of `width`.
///
/// # Errors
/// Returns an error on I/O failure, a truncated sample, or a sample count
/// that `width` does not divide.
pub fn read_f64_frames<R: Read>(reader: R, width: usize) -> Result<FrameMatrix> {
    let bytes = read_bytes(reader, 8)?;
    let mut data = vec![0.0; bytes.len() / 8];
    LittleEndian::read_f64_into(&bytes, &mut data);
    FrameMatrix::from_vec(data, width)
}

/// Read f32 samples (widened to f64) and split them into frames of `width`.
///
/// # Errors
/// Same as [`read_f64_frames`].
pub fn read_f32_frames<R: Read>(reader: R, width: usize) -> Result<FrameMatrix> {
    let bytes = read_bytes(reader, 4)?;
    let mut narrow = vec![0.0f32; bytes.len() / 4];
    LittleEndian::read_f32_into(&bytes, &mut narrow);
    FrameMatrix::from_vec(narrow.into_iter().map(f64::from).collect(), width)
}

/// Write every value as f32, frame after frame.
///
/// # Errors
/// Returns an error if the writer fails.
pub fn write_f32_frames<W: Write>(mut writer: W, matrix: &FrameMatrix) -> Result<()> {
    for &v in matrix.as_slice() {
        writer.write_f32::<LittleEndian>(v as f32)?;
    }
    writer.flush()?;
    Ok(())
}

/// # Errors
/// Returns an error if the file cannot be opened or decoded.
pub fn load_f64(path: &Path, width: usize) -> Result<FrameMatrix> {
    let file = File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
    let matrix = read_f64_frames(BufReader::new(file), width)
        .with_context(|| format!("Matrice f64 invalide: {}", path.display()))?;
    log::debug!("{}: {} frames x {width}", path.display(), matrix.num_frames());
    Ok(matrix)
}

/// # Errors
/// Returns an error if the file cannot be opened or decoded.
pub fn load_f32(path: &Path, width: usize) -> Result<FrameMatrix> {
    let file = File::open(path).with_context(|| format!("Impossible d'ouvrir {}", path.display()))?;
    let matrix = read_f32_frames(BufReader::new(file), width)
        .with_context(|| format!("Matrice f32 invalide: {}", path.display()))?;
    log::debug!("{}: {} frames x {width}", path.display(), matrix.num_frames());
    Ok(matrix)
}

/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn save_f32(path: &Path, matrix: &FrameMatrix) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Impossible de créer {}", path.display()))?;
    write_f32_frames(BufWriter::new(file), matrix)
        .with_context(|| format!("Écriture échouée: {}", path.display()))?;
    log::info!(
        "Wrote {} frames x {} to {}",
        matrix.num_frames(),
        matrix.width(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn f64_frames_are_little_endian() {
        let mut bytes = Vec::new();
        for v in [1.0, -2.5, 3.25, 0.125] {
            bytes.write_f64::<LittleEndian>(v).expect("écriture");
        }
        let m = read_f64_frames(Cursor::new(bytes), 2).expect("lecture");
        assert_eq!(m.num_frames(), 2);
        assert_eq!(m.frame(1), Some(&[3.25, 0.125][..]));
    }

    #[test]
    fn truncated_or_ragged_input_is_rejected() {
        assert!(read_f64_frames(Cursor::new(vec![0u8; 12]), 1).is_err());
        assert!(read_f64_frames(Cursor::new(vec![0u8; 24]), 2).is_err());
        assert!(read_f32_frames(Cursor::new(vec![0u8; 6]), 1).is_err());
    }

    #[test]
    fn written_f32_reads_back() {
        let m = FrameMatrix::from_vec(vec![0.5, -1.0, 2.0, 4.0, 8.0, -0.25], 3).expect("matrice");
        let mut out = Vec::new();
        write_f32_frames(&mut out, &m).expect("écriture");
        assert_eq!(out.len(), 6 * 4);
        assert_eq!(&out[..4], &0.5f32.to_le_bytes());
        let back = read_f32_frames(Cursor::new(out), 3).expect("lecture");
        assert_eq!(back, m);
    }
}
