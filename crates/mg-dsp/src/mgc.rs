//! Mel-generalized cepstrum conversion and spectrum reconstruction.

use crate::cepstrum::{WarpScratch, freqt, gc2gc, gnorm, ignorm};
use crate::error::{CodecError, CodecResult};
use crate::fft::{FftEngine, MIN_REAL_LEN};
use crate::scratch::ensure_len;

/// Warping and gain exponent of a coefficient vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CepstralBasis {
    /// All-pass constant, `|alpha| < 1`.
    pub alpha: f64,
    /// Gain exponent, `-1 <= gamma <= 0`. Zero is the log-cepstrum.
    pub gamma: f64,
}

impl CepstralBasis {
    /// Plain (unwarped) cepstrum.
    pub const CEPSTRUM: Self = Self {
        alpha: 0.0,
        gamma: 0.0,
    };

    #[must_use]
    pub fn new(alpha: f64, gamma: f64) -> Self {
        Self { alpha, gamma }
    }

    /// Mel-cepstrum (`gamma = 0`).
    #[must_use]
    pub fn mel(alpha: f64) -> Self {
        Self { alpha, gamma: 0.0 }
    }

    /// # Errors
    /// `InvalidParameter` when alpha or gamma leave their domain.
    pub fn validate(&self) -> CodecResult<()> {
        if self.alpha.is_nan() || self.alpha.abs() >= 1.0 {
            return Err(CodecError::invalid_param(
                "alpha",
                format!("must satisfy |alpha| < 1, got {}", self.alpha),
            ));
        }
        if !(-1.0..=0.0).contains(&self.gamma) {
            return Err(CodecError::invalid_param(
                "gamma",
                format!("must lie in [-1, 0], got {}", self.gamma),
            ));
        }
        Ok(())
    }
}

/// Scratch for repeated conversions: warp state, normalized cepstrum and the
/// FFT used by spectrum reconstruction.
///
/// # Example
/// ```
/// use mg_dsp::{CepstralBasis, MgcConverter};
/// let mut converter = MgcConverter::new();
/// let mc = [0.5, 0.2, -0.1];
/// let mut c = [0.0; 8];
/// converter
///     .mgc2mgc(&mc, CepstralBasis::mel(0.42), &mut c, CepstralBasis::CEPSTRUM)
///     .unwrap();
/// // unwarping spreads the envelope over more coefficients
/// assert!(c[5].abs() > 0.0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct MgcConverter {
    warp: WarpScratch,
    ca: Vec<f64>,
    fft: FftEngine,
}

impl MgcConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fft(fft: FftEngine) -> Self {
        Self {
            fft,
            ..Self::default()
        }
    }

    /// Re-express `c1` (basis `from`) as `c2.len()` coefficients in basis `to`.
    ///
    /// # Errors
    /// `InvalidParameter` for an out-of-domain basis or an empty vector.
    pub fn mgc2mgc(
        &mut self,
        c1: &[f64],
        from: CepstralBasis,
        c2: &mut [f64],
        to: CepstralBasis,
    ) -> CodecResult<()> {
        from.validate()?;
        to.validate()?;
        if c1.is_empty() || c2.is_empty() {
            return Err(CodecError::invalid_param(
                "order",
                "coefficient vectors need at least the gain term",
            ));
        }

        let alpha = (to.alpha - from.alpha) / (1.0 - from.alpha * to.alpha);
        if alpha == 0.0 {
            self.direct(c1, from.gamma, c2, to.gamma);
        } else {
            self.warped(c1, from.gamma, c2, to.gamma, alpha);
        }
        Ok(())
    }

    /// Same warping on both sides: gamma conversion only.
    fn direct(&mut self, c1: &[f64], g1: f64, c2: &mut [f64], g2: f64) {
        ensure_len(&mut self.ca, c1.len());
        let ca = &mut self.ca[..c1.len()];
        ca.copy_from_slice(c1);
        gnorm(ca, g1);
        gc2gc(ca, g1, c2, g2);
        ignorm(c2, g2);
    }

    fn warped(&mut self, c1: &[f64], g1: f64, c2: &mut [f64], g2: f64, alpha: f64) {
        ensure_len(&mut self.ca, c2.len());
        let ca = &mut self.ca[..c2.len()];
        freqt(c1, ca, alpha, &mut self.warp);
        gnorm(ca, g1);
        gc2gc(ca, g1, c2, g2);
        ignorm(c2, g2);
    }

    /// Log-magnitude (`x`) and phase (`y`) of the spectrum described by `mc`,
    /// over all `x.len()` bins.
    ///
    /// # Errors
    /// `InvalidFftSize` for a bad transform length, `LengthMismatch` if `y`
    /// differs from `x`, plus the [`MgcConverter::mgc2mgc`] errors.
    pub fn mgc2sp(
        &mut self,
        mc: &[f64],
        basis: CepstralBasis,
        x: &mut [f64],
        y: &mut [f64],
    ) -> CodecResult<()> {
        let flng = x.len();
        check_fft_len(flng)?;
        CodecError::check_len("phase", flng, y.len())?;
        let half = flng / 2;

        // cepstrum of order N/2 written in place, then padded
        self.mgc2mgc(mc, basis, &mut x[..=half], CepstralBasis::CEPSTRUM)?;
        x[half + 1..].fill(0.0);
        self.fft.fftr(x, y)
    }

    /// Spectrum of a plain cepstrum: zero-pad `c` to `x.len()` and transform.
    ///
    /// # Errors
    /// `InvalidFftSize` for a bad transform length, `LengthMismatch` if `c`
    /// is longer than the transform or `y` differs from `x`.
    pub fn c2sp(&self, c: &[f64], x: &mut [f64], y: &mut [f64]) -> CodecResult<()> {
        c2sp_with(&self.fft, c, x, y)
    }
}

fn check_fft_len(n: usize) -> CodecResult<()> {
    if n >= MIN_REAL_LEN && n.is_power_of_two() {
        Ok(())
    } else {
        Err(CodecError::InvalidFftSize {
            size: n,
            min: MIN_REAL_LEN,
        })
    }
}

fn c2sp_with(fft: &FftEngine, c: &[f64], x: &mut [f64], y: &mut [f64]) -> CodecResult<()> {
    check_fft_len(x.len())?;
    if c.len() > x.len() {
        return Err(CodecError::LengthMismatch {
            what: "cepstrum",
            expected: x.len(),
            got: c.len(),
        });
    }
    x[..c.len()].copy_from_slice(c);
    x[c.len()..].fill(0.0);
    fft.fftr(x, y)
}

/// One-shot [`MgcConverter::mgc2mgc`] into `order + 1` coefficients.
///
/// # Errors
/// Same as [`MgcConverter::mgc2mgc`].
pub fn mgc2mgc(
    c1: &[f64],
    from: CepstralBasis,
    order: usize,
    to: CepstralBasis,
) -> CodecResult<Vec<f64>> {
    let mut c2 = vec![0.0; order + 1];
    MgcConverter::new().mgc2mgc(c1, from, &mut c2, to)?;
    Ok(c2)
}

/// One-shot [`MgcConverter::mgc2sp`]: returns `(log magnitude, phase)`.
///
/// # Errors
/// Same as [`MgcConverter::mgc2sp`].
pub fn mgc2sp(mc: &[f64], basis: CepstralBasis, fft_len: usize) -> CodecResult<(Vec<f64>, Vec<f64>)> {
    let mut x = vec![0.0; fft_len];
    let mut y = vec![0.0; fft_len];
    MgcConverter::new().mgc2sp(mc, basis, &mut x, &mut y)?;
    Ok((x, y))
}

/// One-shot [`MgcConverter::c2sp`].
///
/// # Errors
/// Same as [`MgcConverter::c2sp`].
pub fn c2sp(c: &[f64], fft_len: usize) -> CodecResult<(Vec<f64>, Vec<f64>)> {
    let mut x = vec![0.0; fft_len];
    let mut y = vec![0.0; fft_len];
    c2sp_with(&FftEngine::new(), c, &mut x, &mut y)?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MC: [f64; 6] = [0.4, 0.3, -0.15, 0.08, -0.02, 0.01];

    fn close(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < tol)
    }

    #[test]
    fn direct_and_warped_paths_agree_without_warping() {
        for (m2, g1, g2) in [(3, 0.0, -0.5), (5, -0.3, 0.0), (9, -1.0, -0.2)] {
            let mut converter = MgcConverter::new();
            let mut direct = vec![0.0; m2 + 1];
            let mut warped = vec![0.0; m2 + 1];
            converter.direct(&MC, g1, &mut direct, g2);
            converter.warped(&MC, g1, &mut warped, g2, 0.0);
            assert!(close(&direct, &warped, 1e-14), "{direct:?} vs {warped:?}");
        }
    }

    #[test]
    fn gamma_conversion_round_trip() {
        let from = CepstralBasis::new(0.42, 0.0);
        let to = CepstralBasis::new(0.42, -0.5);
        let mid = mgc2mgc(&MC, from, 5, to).expect("forward");
        let back = mgc2mgc(&mid, to, 5, from).expect("back");
        assert!(close(&back, &MC, 1e-12), "{back:?}");
    }

    #[test]
    fn warp_round_trip_through_wide_cepstrum() {
        let mel = CepstralBasis::mel(0.42);
        let wide = mgc2mgc(&MC, mel, 1024, CepstralBasis::CEPSTRUM).expect("unwarp");
        let back = mgc2mgc(&wide, CepstralBasis::CEPSTRUM, 5, mel).expect("rewarp");
        assert!(close(&back, &MC, 1e-9), "{back:?}");
    }

    #[test]
    fn flat_cepstrum_gives_flat_spectrum() {
        let (x, y) = mgc2sp(&[0.7, 0.0, 0.0], CepstralBasis::mel(0.35), 64).expect("mgc2sp");
        assert!(x.iter().all(|v| (v - 0.7).abs() < 1e-12));
        assert!(y.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn c2sp_matches_mgc2sp_for_plain_cepstrum() {
        let (a, _) = c2sp(&MC, 32).expect("c2sp");
        let (b, _) = mgc2sp(&MC, CepstralBasis::CEPSTRUM, 32).expect("mgc2sp");
        assert!(close(&a, &b, 1e-12));
        // log|H(1)| is the sum of the coefficients
        let dc: f64 = MC.iter().sum();
        assert!((a[0] - dc).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(mgc2mgc(&MC, CepstralBasis::new(1.0, 0.0), 4, CepstralBasis::CEPSTRUM).is_err());
        assert!(mgc2mgc(&MC, CepstralBasis::new(0.0, 0.5), 4, CepstralBasis::CEPSTRUM).is_err());
        assert!(mgc2mgc(&[], CepstralBasis::CEPSTRUM, 4, CepstralBasis::CEPSTRUM).is_err());
        assert_eq!(
            mgc2sp(&MC, CepstralBasis::CEPSTRUM, 100).map(|_| ()),
            Err(CodecError::InvalidFftSize { size: 100, min: 8 })
        );
        assert!(matches!(
            c2sp(&[0.0; 9], 8),
            Err(CodecError::LengthMismatch { what: "cepstrum", .. })
        ));
    }
}
