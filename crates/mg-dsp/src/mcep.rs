//! Mel-cepstral analysis of one spectrum frame.
//!
//! Fits M+1 mel-cepstral coefficients to a periodogram by Newton-Raphson on
//! the warped log-spectral distance. Each step solves a Toeplitz-plus-Hankel
//! system built from the warped autocorrelation of the model residual.

use mg_core::config::{AnalysisConfig, Floor, InputFormat};

use crate::cepstrum::{WarpScratch, freqt, frqtr};
use crate::error::{CodecError, CodecResult};
use crate::fft::{FftEngine, MIN_REAL_LEN};
use crate::scratch::ensure_len;
use crate::solver::ToeplitzHankelSolver;

/// Amplitude scale applied to aperiodicity values before coding.
pub const APERIODICITY_SCALE: f64 = 32768.0;

/// Analysis parameters for [`MelCepstrumAnalyzer::analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct McepOptions {
    /// All-pass constant, `|alpha| < 1`.
    pub alpha: f64,
    /// Cepstral order M.
    pub order: usize,
    /// Iterations before the convergence test is armed.
    pub min_iter: usize,
    pub max_iter: usize,
    /// Relative change of r(0) under which the fit has converged.
    pub tolerance: f64,
    pub floor: Floor,
    /// Pivot tolerance handed to the solver.
    pub determinant_floor: f64,
    pub input: InputFormat,
}

/// Same values as `[analysis]` in a default configuration file.
impl Default for McepOptions {
    fn default() -> Self {
        Self::from(&AnalysisConfig::default())
    }
}

impl McepOptions {
    /// Preset for aperiodicity coding: `dims` coefficients from an amplitude
    /// array already multiplied by [`APERIODICITY_SCALE`].
    ///
    /// # Example
    /// ```
    /// use mg_dsp::McepOptions;
    /// let options = McepOptions::aperiodicity(5);
    /// assert_eq!(options.order, 4);
    /// assert_eq!(options.alpha, 0.77);
    /// ```
    #[must_use]
    pub fn aperiodicity(dims: usize) -> Self {
        Self {
            alpha: 0.77,
            order: dims.saturating_sub(1),
            min_iter: 2,
            max_iter: 30,
            tolerance: 0.001,
            floor: Floor::Add(1.0e-8),
            determinant_floor: 0.0,
            input: InputFormat::Amplitude,
        }
    }

    /// # Errors
    /// `InvalidParameter` for `|alpha| >= 1` or a bad tolerance,
    /// `InvalidFloor` for a floor with the wrong sign.
    pub fn validate(&self) -> CodecResult<()> {
        if self.alpha.is_nan() || self.alpha.abs() >= 1.0 {
            return Err(CodecError::invalid_param(
                "alpha",
                format!("must satisfy |alpha| < 1, got {}", self.alpha),
            ));
        }
        if !self.floor.is_valid() {
            return Err(CodecError::InvalidFloor(self.floor));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(CodecError::invalid_param(
                "tolerance",
                format!("must be >= 0, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}

impl From<&AnalysisConfig> for McepOptions {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            alpha: config.alpha,
            order: config.order,
            min_iter: config.min_iter,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            floor: config.floor,
            determinant_floor: config.determinant_floor,
            input: config.input,
        }
    }
}

/// How a frame analysis ended. Coefficients are valid in both cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    Converged {
        /// Iteration at which the r(0) change fell under the tolerance.
        iterations: usize,
    },
    /// `max_iter` reached first.
    Exhausted,
}

impl Convergence {
    /// Status code of the classic tool chain: 0 converged, -1 exhausted.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Converged { .. } => 0,
            Self::Exhausted => -1,
        }
    }

    #[must_use]
    pub fn is_converged(self) -> bool {
        matches!(self, Self::Converged { .. })
    }
}

/// Transform length implied by a frame of `len` samples.
///
/// Windowed frames are the transform length. Spectral frames are either the
/// full length (power of two) or the half spectrum `flng / 2 + 1`.
///
/// # Errors
/// `InvalidFftSize` when no admissible transform length matches.
///
/// # Example
/// ```
/// use mg_core::config::InputFormat;
/// use mg_dsp::mcep::frame_fft_len;
/// assert_eq!(frame_fft_len(256, InputFormat::Windowed).unwrap(), 256);
/// assert_eq!(frame_fft_len(513, InputFormat::Periodogram).unwrap(), 1024);
/// assert!(frame_fft_len(513, InputFormat::Windowed).is_err());
/// ```
pub fn frame_fft_len(len: usize, input: InputFormat) -> CodecResult<usize> {
    let admissible = |n: usize| n >= MIN_REAL_LEN && n.is_power_of_two();
    if admissible(len) {
        return Ok(len);
    }
    if input.is_spectral() {
        let full = len.saturating_sub(1) * 2;
        if admissible(full) {
            return Ok(full);
        }
    }
    Err(CodecError::InvalidFftSize {
        size: len,
        min: MIN_REAL_LEN,
    })
}

/// Per-worker analyzer: FFT engine, solver and every frame buffer.
///
/// # Example
/// ```
/// use mg_core::config::InputFormat;
/// use mg_dsp::{McepOptions, MelCepstrumAnalyzer};
/// let mut analyzer = MelCepstrumAnalyzer::new();
/// let options = McepOptions { order: 12, input: InputFormat::Windowed, ..McepOptions::default() };
/// let mut frame = vec![0.0; 256];
/// frame[0] = 1.0;
/// let mut mc = vec![0.0; 13];
/// let status = analyzer.analyze(&frame, &options, &mut mc).unwrap();
/// assert!(status.is_converged());
/// assert!(mc.iter().all(|c| c.abs() < 1e-9));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MelCepstrumAnalyzer {
    fft: FftEngine,
    solver: ToeplitzHankelSolver,
    warp: WarpScratch,
    /// periodogram
    x: Vec<f64>,
    y: Vec<f64>,
    c: Vec<f64>,
    /// (-alpha)^k
    al: Vec<f64>,
    r: Vec<f64>,
    b: Vec<f64>,
    toeplitz: Vec<f64>,
    hankel: Vec<f64>,
    step: Vec<f64>,
}

impl MelCepstrumAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer reading the sine table of an existing engine.
    #[must_use]
    pub fn with_fft(fft: FftEngine) -> Self {
        Self {
            fft,
            ..Self::default()
        }
    }

    /// Fit `options.order + 1` coefficients to `frame`, written into `mc`.
    ///
    /// # Errors
    /// Invalid options, a frame length with no matching transform, an order
    /// of `flng / 2` or more, a non-positive periodogram bin, or a singular
    /// Newton system.
    pub fn analyze(
        &mut self,
        frame: &[f64],
        options: &McepOptions,
        mc: &mut [f64],
    ) -> CodecResult<Convergence> {
        options.validate()?;
        let flng = frame_fft_len(frame.len(), options.input)?;
        let half = flng / 2;
        let m = options.order;
        if m >= half {
            return Err(CodecError::invalid_param(
                "order",
                format!("order {m} needs a transform longer than {flng}"),
            ));
        }
        CodecError::check_len("mel-cepstrum", m + 1, mc.len())?;

        self.periodogram(frame, flng, options)?;
        self.initial_estimate(flng, options.alpha, mc)?;
        let status = self.newton(flng, options, mc)?;

        match status {
            Convergence::Converged { iterations } => {
                log::debug!("mcep: converged after {iterations} iterations (flng {flng}, M {m})");
            }
            Convergence::Exhausted => {
                log::debug!("mcep: no convergence in {} iterations", options.max_iter);
            }
        }
        Ok(status)
    }

    fn periodogram(&mut self, frame: &[f64], flng: usize, options: &McepOptions) -> CodecResult<()> {
        ensure_len(&mut self.x, flng);
        ensure_len(&mut self.y, flng);
        let x = &mut self.x[..flng];
        let add = match options.floor {
            Floor::Add(e) => e,
            Floor::None | Floor::RelativeDb(_) => 0.0,
        };
        let half = flng / 2;

        if options.input.is_spectral() {
            for (dst, &v) in x.iter_mut().zip(&frame[..=half]) {
                *dst = options.input.to_power(v) + add;
            }
            for i in 1..half {
                x[flng - i] = x[i];
            }
        } else {
            x.copy_from_slice(frame);
            self.fft.fftr(x, &mut self.y[..flng])?;
            for (re, &im) in x.iter_mut().zip(&self.y[..flng]) {
                *re = *re * *re + im * im + add;
            }
        }

        if let Floor::RelativeDb(db) = options.floor {
            let peak = x.iter().copied().fold(f64::NEG_INFINITY, f64::max).sqrt();
            let lower = peak * 10f64.powf(db / 20.0);
            let lower = lower * lower;
            for v in x.iter_mut() {
                *v = v.max(lower);
            }
        }

        if let Some((bin, &value)) = x.iter().enumerate().find(|(_, v)| **v <= 0.0 || v.is_nan()) {
            return Err(CodecError::NonPositivePeriodogram { bin, value });
        }
        Ok(())
    }

    /// Warped cepstrum of the log periodogram as the starting point.
    fn initial_estimate(&mut self, flng: usize, alpha: f64, mc: &mut [f64]) -> CodecResult<()> {
        let half = flng / 2;
        ensure_len(&mut self.c, flng);
        let c = &mut self.c[..flng];
        for (dst, &p) in c.iter_mut().zip(&self.x[..flng]) {
            *dst = p.ln();
        }
        self.fft.ifftr(c, &mut self.y[..flng])?;
        c[0] /= 2.0;
        c[half] /= 2.0;
        freqt(&c[..=half], mc, alpha, &mut self.warp);
        Ok(())
    }

    fn newton(&mut self, flng: usize, options: &McepOptions, mc: &mut [f64]) -> CodecResult<Convergence> {
        let half = flng / 2;
        let m = options.order;
        let alpha = options.alpha;

        ensure_len(&mut self.al, m + 1);
        ensure_len(&mut self.r, 2 * m + 1);
        ensure_len(&mut self.b, m + 1);
        ensure_len(&mut self.toeplitz, m + 1);
        ensure_len(&mut self.hankel, 2 * m + 1);
        ensure_len(&mut self.step, m + 1);

        let mut power = 1.0;
        for v in &mut self.al[..=m] {
            *v = power;
            power *= -alpha;
        }

        // reference for the convergence test
        let mut s = self.c[0];

        for iteration in 1..=options.max_iter {
            let c = &mut self.c[..flng];
            let y = &mut self.y[..flng];
            c.fill(0.0);
            freqt(mc, &mut c[..=half], -alpha, &mut self.warp);
            self.fft.fftr(c, y)?;
            for (v, &p) in c.iter_mut().zip(&self.x[..flng]) {
                *v = p / (*v + *v).exp();
            }
            self.fft.ifftr(c, y)?;

            let r = &mut self.r[..=2 * m];
            frqtr(&c[..=half], r, alpha, &mut self.warp);

            let t = r[0];
            log::trace!("mcep iteration {iteration}: r0 = {t:.6e}");
            if iteration >= options.min_iter {
                if ((t - s) / t).abs() < options.tolerance {
                    return Ok(Convergence::Converged { iterations: iteration });
                }
                s = t;
            }

            for (dst, (&ri, &ai)) in self.b[..=m].iter_mut().zip(r.iter().zip(&self.al[..=m])) {
                *dst = ri - ai;
            }
            for (i, (dst, &ri)) in self.hankel[..=2 * m].iter_mut().zip(r.iter()).enumerate() {
                *dst = if i % 2 == 0 { ri - t } else { ri };
            }
            for (i, (dst, &ri)) in self.toeplitz[..=m].iter_mut().zip(r.iter()).enumerate() {
                *dst = if i >= 2 && i % 2 == 0 { ri + t } else { ri };
            }
            self.toeplitz[0] = 2.0 * t;

            self.solver.solve(
                &self.toeplitz[..=m],
                &self.hankel[..=2 * m],
                &self.b[..=m],
                options.determinant_floor,
                &mut self.step[..=m],
            )?;
            for (v, d) in mc.iter_mut().zip(&self.step[..=m]) {
                *v += d;
            }
        }

        Ok(Convergence::Exhausted)
    }
}

/// One-shot analysis with a temporary analyzer.
///
/// # Errors
/// Same as [`MelCepstrumAnalyzer::analyze`].
pub fn mcep(frame: &[f64], options: &McepOptions) -> CodecResult<(Vec<f64>, Convergence)> {
    let mut mc = vec![0.0; options.order + 1];
    let status = MelCepstrumAnalyzer::new().analyze(frame, options, &mut mc)?;
    Ok((mc, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn impulse(len: usize, amplitude: f64) -> Vec<f64> {
        let mut frame = vec![0.0; len];
        frame[0] = amplitude;
        frame
    }

    fn smooth_periodogram(bins: usize) -> Vec<f64> {
        (0..bins).map(|i| 1.0 + 0.5 * (0.05 * i as f64).cos()).collect()
    }

    #[test]
    fn impulse_gives_flat_cepstrum() {
        let options = McepOptions {
            input: InputFormat::Windowed,
            ..McepOptions::default()
        };
        let (mc, status) = mcep(&impulse(256, 2.0), &options).expect("analyse");
        assert_eq!(status, Convergence::Converged { iterations: 3 });
        assert!((mc[0] - 2.0f64.ln()).abs() < 1e-9);
        assert!(mc[1..].iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn zero_bin_needs_a_floor() {
        let mut spectrum = smooth_periodogram(129);
        spectrum[10] = 0.0;
        let mut options = McepOptions {
            alpha: 0.42,
            order: 12,
            input: InputFormat::Periodogram,
            ..McepOptions::default()
        };
        assert_eq!(
            mcep(&spectrum, &options).map(|(_, s)| s),
            Err(CodecError::NonPositivePeriodogram { bin: 10, value: 0.0 })
        );

        options.floor = Floor::Add(1e-8);
        let (_, status) = mcep(&spectrum, &options).expect("floored");
        assert!(status.is_converged());

        options.floor = Floor::RelativeDb(-60.0);
        let (_, status) = mcep(&spectrum, &options).expect("floored");
        assert!(status.is_converged());
    }

    #[test]
    fn floor_sign_is_a_contract_violation() {
        let options = McepOptions {
            floor: Floor::RelativeDb(6.0),
            input: InputFormat::Windowed,
            ..McepOptions::default()
        };
        assert_eq!(
            mcep(&impulse(256, 1.0), &options).map(|(_, s)| s),
            Err(CodecError::InvalidFloor(Floor::RelativeDb(6.0)))
        );
    }

    #[test]
    fn order_must_fit_the_transform() {
        let options = McepOptions {
            order: 4,
            input: InputFormat::Windowed,
            ..McepOptions::default()
        };
        assert!(matches!(
            mcep(&impulse(8, 1.0), &options),
            Err(CodecError::InvalidParameter { name: "order", .. })
        ));
        let mut mc = vec![0.0; 3];
        let err = MelCepstrumAnalyzer::new().analyze(&impulse(64, 1.0), &options, &mut mc);
        assert!(matches!(err, Err(CodecError::LengthMismatch { .. })));
    }

    #[test]
    fn zero_budget_returns_initial_estimate() {
        let options = McepOptions {
            order: 8,
            max_iter: 0,
            input: InputFormat::Windowed,
            ..McepOptions::default()
        };
        let (mc, status) = mcep(&impulse(64, 1.0), &options).expect("analyse");
        assert_eq!(status, Convergence::Exhausted);
        assert_eq!(status.code(), -1);
        assert!(mc.iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn half_and_full_spectra_agree() {
        let options = McepOptions {
            alpha: 0.42,
            order: 12,
            input: InputFormat::Periodogram,
            ..McepOptions::default()
        };
        let half = smooth_periodogram(129);
        let mut full = half.clone();
        full.resize(256, -1.0);
        let (a, _) = mcep(&half, &options).expect("half");
        let (b, _) = mcep(&full, &options).expect("full");
        assert_eq!(a, b);
    }

    #[test]
    fn library_and_config_defaults_agree() {
        let options = McepOptions::default();
        assert_eq!(options, McepOptions::from(&AnalysisConfig::default()));
        assert_eq!((options.alpha, options.order), (0.42, 24));
        assert_eq!(options.input, InputFormat::Periodogram);
    }

    #[test]
    fn aperiodicity_preset_converges() {
        let options = McepOptions::aperiodicity(5);
        let spectrum: Vec<f64> = (0..513)
            .map(|i| APERIODICITY_SCALE * (0.001 + 0.999 * (i as f64 / 400.0).min(1.0)))
            .collect();
        let (mc, status) = mcep(&spectrum, &options).expect("aperiodicity");
        assert!(status.is_converged());
        assert_eq!(mc.len(), 5);
    }
}
