//! Cepstral transforms: all-pass frequency warping, gain normalization and
//! generalized-log (gamma) conversion.
//!
//! Coefficient slices carry `order + 1` values; the output order of every
//! transform is taken from the length of the destination slice.

use crate::scratch::ensure_len;

/// Recursion state for [`freqt`] and [`frqtr`].
///
/// Reused across calls; zeroed at the start of each one.
#[derive(Debug, Default, Clone)]
pub struct WarpScratch {
    d: Vec<f64>,
    g: Vec<f64>,
}

impl WarpScratch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, len: usize) {
        ensure_len(&mut self.d, len);
        ensure_len(&mut self.g, len);
        self.d[..len].fill(0.0);
        self.g[..len].fill(0.0);
    }
}

/// Frequency-warp `c1` (warping `alpha`) into `c2`.
///
/// Maps a cepstrum on one warped axis onto another whose all-pass constant
/// differs by `alpha`. With `alpha == 0` it copies (and truncates or
/// zero-pads).
///
/// # Example
/// ```
/// use mg_dsp::cepstrum::{freqt, WarpScratch};
/// let mut scratch = WarpScratch::new();
/// let mut out = [0.0; 4];
/// freqt(&[1.0, 0.5, 0.25], &mut out, 0.0, &mut scratch);
/// assert_eq!(out, [1.0, 0.5, 0.25, 0.0]);
/// ```
pub fn freqt(c1: &[f64], c2: &mut [f64], alpha: f64, scratch: &mut WarpScratch) {
    let len = c2.len();
    if len == 0 {
        return;
    }
    scratch.reset(len);
    let WarpScratch { d, g } = scratch;
    let beta = 1.0 - alpha * alpha;

    for &c in c1.iter().rev() {
        d[0] = g[0];
        g[0] = c + alpha * d[0];
        if len > 1 {
            d[1] = g[1];
            g[1] = beta * d[0] + alpha * d[1];
        }
        for j in 2..len {
            d[j] = g[j];
            g[j] = d[j - 1] + alpha * (d[j] - g[j - 1]);
        }
    }

    c2.copy_from_slice(&g[..len]);
}

/// Warp an autocorrelation-like sequence: the transpose of [`freqt`].
///
/// Used on the inverse-FFT of the weighted periodogram to build the Newton
/// normal equations.
pub fn frqtr(c1: &[f64], c2: &mut [f64], alpha: f64, scratch: &mut WarpScratch) {
    let len = c2.len();
    if len == 0 {
        return;
    }
    scratch.reset(len);
    let WarpScratch { d, g } = scratch;

    for &c in c1.iter().rev() {
        d[0] = g[0];
        g[0] = c;
        for j in 1..len {
            d[j] = g[j];
            g[j] = d[j - 1] + alpha * (d[j] - g[j - 1]);
        }
    }

    c2.copy_from_slice(&g[..len]);
}

/// Gain normalization: split `c` into gain `K = c[0]` and normalized tail.
///
/// For `gamma == 0` this is just `c[0] = exp(c[0])`.
pub fn gnorm(c: &mut [f64], gamma: f64) {
    let Some((c0, tail)) = c.split_first_mut() else {
        return;
    };
    if gamma == 0.0 {
        *c0 = c0.exp();
        return;
    }
    let k = 1.0 + gamma * *c0;
    for v in tail.iter_mut() {
        *v /= k;
    }
    *c0 = k.powf(1.0 / gamma);
}

/// Inverse of [`gnorm`].
pub fn ignorm(c: &mut [f64], gamma: f64) {
    let Some((c0, tail)) = c.split_first_mut() else {
        return;
    };
    if gamma == 0.0 {
        *c0 = c0.ln();
        return;
    }
    let k = c0.powf(gamma);
    for v in tail.iter_mut() {
        *v *= k;
    }
    *c0 = (k - 1.0) / gamma;
}

/// Generalized-log conversion of normalized coefficients from `g1` to `g2`.
///
/// `c1[0]` (the gain) passes through. Missing input coefficients read as zero.
pub fn gc2gc(c1: &[f64], g1: f64, c2: &mut [f64], g2: f64) {
    let Some(&gain) = c1.first() else {
        c2.fill(0.0);
        return;
    };
    let Some(first) = c2.first_mut() else {
        return;
    };
    *first = gain;
    let m1 = c1.len() - 1;

    for i in 1..c2.len() {
        let mut ss1 = 0.0;
        let mut ss2 = 0.0;
        for k in 1..=m1.min(i - 1) {
            let cc = c1[k] * c2[i - k];
            ss2 += k as f64 * cc;
            ss1 += (i - k) as f64 * cc;
        }
        let own = c1.get(i).copied().unwrap_or(0.0);
        c2[i] = own + (g2 * ss2 - g1 * ss1) / i as f64;
    }
}
