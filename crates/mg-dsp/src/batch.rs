//! Whole-utterance encoding and decoding, parallel over frames.
//!
//! Each rayon worker owns one analyzer (or converter) built by `map_init`;
//! all of them read the same [`TrigCache`]. Output rows keep the input frame
//! order.

use std::sync::Arc;

use mg_core::frame::{CoefficientMatrix, SpectrumMatrix};
use rayon::prelude::*;

use crate::error::{CodecError, CodecResult};
use crate::fft::{FftEngine, MIN_REAL_LEN, TrigCache};
use crate::mcep::{APERIODICITY_SCALE, Convergence, McepOptions, MelCepstrumAnalyzer, frame_fft_len};
use crate::mgc::{CepstralBasis, MgcConverter};

/// Coefficients of every frame plus how each analysis ended.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeReport {
    pub coefficients: CoefficientMatrix,
    pub convergence: Vec<Convergence>,
}

impl EncodeReport {
    #[must_use]
    pub fn converged(&self) -> usize {
        self.convergence.iter().filter(|c| c.is_converged()).count()
    }

    #[must_use]
    pub fn exhausted(&self) -> usize {
        self.convergence.len() - self.converged()
    }

    /// Per-frame status codes (0 converged, -1 exhausted).
    #[must_use]
    pub fn codes(&self) -> Vec<i32> {
        self.convergence.iter().map(|c| c.code()).collect()
    }
}

/// Mel-cepstral analysis of every row of `spectra`.
///
/// # Errors
/// A frame error if any frame fails; no partial result is returned.
///
/// # Example
/// ```
/// use mg_core::config::InputFormat;
/// use mg_core::frame::FrameMatrix;
/// use mg_dsp::batch::encode_spectra;
/// use mg_dsp::{McepOptions, TrigCache};
///
/// let spectra = FrameMatrix::from_vec(vec![1.0; 3 * 129], 129).unwrap();
/// let options = McepOptions { order: 8, input: InputFormat::Periodogram, ..McepOptions::default() };
/// let report = encode_spectra(&spectra, &options, &TrigCache::shared()).unwrap();
/// assert_eq!(report.coefficients.num_frames(), 3);
/// assert_eq!(report.converged(), 3);
/// ```
pub fn encode_spectra(
    spectra: &SpectrumMatrix,
    options: &McepOptions,
    cache: &Arc<TrigCache>,
) -> CodecResult<EncodeReport> {
    options.validate()?;
    let flng = frame_fft_len(spectra.width(), options.input)?;
    let width = options.order + 1;
    let mut coefficients = CoefficientMatrix::zeros(spectra.num_frames(), width);

    let convergence = coefficients
        .as_mut_slice()
        .par_chunks_mut(width)
        .zip(spectra.as_slice().par_chunks(spectra.width()))
        .enumerate()
        .map_init(
            || MelCepstrumAnalyzer::with_fft(FftEngine::with_cache(Arc::clone(cache))),
            |analyzer, (index, (mc, frame))| -> CodecResult<Convergence> {
                let status = analyzer.analyze(frame, options, mc)?;
                if !status.is_converged() {
                    log::warn!(
                        "Frame {index}: no convergence after {} iterations",
                        options.max_iter
                    );
                }
                Ok(status)
            },
        )
        .collect::<CodecResult<Vec<_>>>()?;

    let report = EncodeReport {
        coefficients,
        convergence,
    };
    log::info!(
        "Encoded {} frames (flng {flng}, order {}): {} converged, {} exhausted",
        report.convergence.len(),
        options.order,
        report.converged(),
        report.exhausted()
    );
    Ok(report)
}

/// Code aperiodicity rows (values in `[0, 1]`) into `dims` coefficients each.
///
/// The rows are scaled by [`APERIODICITY_SCALE`] and analyzed with
/// [`McepOptions::aperiodicity`].
///
/// # Errors
/// `InvalidParameter` for `dims == 0`, then as [`encode_spectra`].
pub fn encode_aperiodicity(
    aperiodicity: &SpectrumMatrix,
    dims: usize,
    cache: &Arc<TrigCache>,
) -> CodecResult<EncodeReport> {
    if dims == 0 {
        return Err(CodecError::invalid_param("dims", "at least one coefficient"));
    }
    let mut scaled = aperiodicity.clone();
    scaled.scale(APERIODICITY_SCALE);
    encode_spectra(&scaled, &McepOptions::aperiodicity(dims), cache)
}

/// Rebuild log-magnitude half spectra (`fft_len / 2 + 1` bins per frame).
///
/// # Errors
/// `InvalidFftSize` for a bad `fft_len`, `InvalidParameter` for a bad basis.
pub fn decode_spectra(
    coefficients: &CoefficientMatrix,
    basis: CepstralBasis,
    fft_len: usize,
    cache: &Arc<TrigCache>,
) -> CodecResult<SpectrumMatrix> {
    basis.validate()?;
    if fft_len < MIN_REAL_LEN || !fft_len.is_power_of_two() {
        return Err(CodecError::InvalidFftSize {
            size: fft_len,
            min: MIN_REAL_LEN,
        });
    }
    let bins = fft_len / 2 + 1;
    let mut spectra = SpectrumMatrix::zeros(coefficients.num_frames(), bins);

    spectra
        .as_mut_slice()
        .par_chunks_mut(bins)
        .zip(coefficients.as_slice().par_chunks(coefficients.width()))
        .map_init(
            || {
                let converter = MgcConverter::with_fft(FftEngine::with_cache(Arc::clone(cache)));
                (converter, vec![0.0; fft_len], vec![0.0; fft_len])
            },
            |(converter, x, y), (out, mc)| -> CodecResult<()> {
                converter.mgc2sp(mc, basis, x, y)?;
                out.copy_from_slice(&x[..bins]);
                Ok(())
            },
        )
        .collect::<CodecResult<()>>()?;

    log::info!("Decoded {} frames at fft length {fft_len}", spectra.num_frames());
    Ok(spectra)
}

/// Re-express every row in another basis with `order_out + 1` coefficients.
///
/// # Errors
/// `InvalidParameter` for a bad basis.
pub fn convert_coefficients(
    coefficients: &CoefficientMatrix,
    from: CepstralBasis,
    to: CepstralBasis,
    order_out: usize,
) -> CodecResult<CoefficientMatrix> {
    from.validate()?;
    to.validate()?;
    let width = order_out + 1;
    let mut converted = CoefficientMatrix::zeros(coefficients.num_frames(), width);

    converted
        .as_mut_slice()
        .par_chunks_mut(width)
        .zip(coefficients.as_slice().par_chunks(coefficients.width()))
        .map_init(MgcConverter::new, |converter, (out, c)| {
            converter.mgc2mgc(c, from, out, to)
        })
        .collect::<CodecResult<()>>()?;

    log::debug!(
        "Converted {} frames: ({}, {}) -> ({}, {}), order {order_out}",
        converted.num_frames(),
        from.alpha,
        from.gamma,
        to.alpha,
        to.gamma
    );
    Ok(converted)
}
