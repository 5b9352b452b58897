use anyhow::{Result, bail};

/// Frame-major matrix of `f64` values: all values of frame 0, then frame 1, ...
///
/// Used for per-utterance spectra (one envelope per frame) and for
/// coefficient vectors (M+1 values per frame).
///
/// # Example
/// ```
/// use mg_core::frame::FrameMatrix;
/// let m = FrameMatrix::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 3).unwrap();
/// assert_eq!(m.num_frames(), 2);
/// assert_eq!(m.frame(1), Some(&[4.0, 5.0, 6.0][..]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FrameMatrix {
    data: Vec<f64>,
    width: usize,
}

/// One power-spectrum (or aperiodicity) envelope per frame.
pub type SpectrumMatrix = FrameMatrix;

/// One coefficient vector per frame.
pub type CoefficientMatrix = FrameMatrix;

impl FrameMatrix {
    /// Zero-filled matrix. A zero `width` is bumped to 1.
    #[must_use]
    pub fn zeros(num_frames: usize, width: usize) -> Self {
        let width = width.max(1);
        Self {
            data: vec![0.0; num_frames * width],
            width,
        }
    }

    /// Wrap a flat frame-major buffer.
    ///
    /// # Errors
    /// Returns an error if `width` is zero or does not divide the buffer length.
    pub fn from_vec(data: Vec<f64>, width: usize) -> Result<Self> {
        if width == 0 {
            bail!("Largeur de frame nulle");
        }
        if data.len() % width != 0 {
            bail!(
                "{} values do not split into frames of {width} (remainder {})",
                data.len(),
                data.len() % width
            );
        }
        Ok(Self { data, width })
    }

    /// Values per frame.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn num_frames(&self) -> usize {
        self.data.len() / self.width
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.width)?;
        self.data.get(start..start + self.width)
    }

    pub fn frames(&self) -> std::slice::ChunksExact<'_, f64> {
        self.data.chunks_exact(self.width)
    }

    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.data.chunks_exact_mut(self.width)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Multiply every value in place (e.g. the 32768 scale of aperiodicity coding).
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }
}
