//! Radix-2 FFT over a shared sine table.
//!
//! The table holds sine samples at the granularity of the largest transform
//! requested so far; any smaller power-of-two size reads it with a stride.
//! Growth rebuilds the table and publishes it through [`TrigCache`], so
//! readers never take a lock.

use std::f64::consts::PI;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::{CodecError, CodecResult};

/// Smallest complex transform.
pub const MIN_COMPLEX_LEN: usize = 4;

/// Smallest real transform (it runs a complex transform of half its length).
pub const MIN_REAL_LEN: usize = 2 * MIN_COMPLEX_LEN;

/// One and a quarter periods of sine sampled at `2π / size`.
#[derive(Debug)]
pub struct SineTable {
    size: usize,
    sin: Vec<f64>,
}

impl SineTable {
    /// Build the table for transforms up to `size` (a power of two).
    #[must_use]
    pub(crate) fn new(size: usize) -> Self {
        let step = 2.0 * PI / size as f64;
        let mut sin: Vec<f64> = (0..=size + size / 4)
            .map(|j| (step * j as f64).sin())
            .collect();
        // sin(π) exactly
        sin[size / 2] = 0.0;
        Self { size, sin }
    }

    /// Largest transform length this table serves.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    fn sin(&self, index: usize) -> f64 {
        self.sin[index]
    }

    #[inline(always)]
    fn cos(&self, index: usize) -> f64 {
        self.sin[index + self.size / 4]
    }
}

/// Capacity-aware holder of the current [`SineTable`].
///
/// Share one cache between workers with `Arc<TrigCache>`, or give each worker
/// its own. Lookups that fit the current capacity are a single atomic load.
///
/// # Example
/// ```
/// use mg_dsp::fft::TrigCache;
/// let cache = TrigCache::default();
/// assert_eq!(cache.capacity(), 0);
/// let table = cache.lookup(512);
/// assert_eq!(table.size(), 512);
/// assert_eq!(cache.lookup(64).size(), 512);
/// ```
#[derive(Debug, Default)]
pub struct TrigCache {
    table: ArcSwapOption<SineTable>,
}

impl TrigCache {
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Size of the cached table, 0 before the first lookup.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.load_full().map_or(0, |t| t.size())
    }

    /// A table valid for every power-of-two transform up to `n`.
    ///
    /// `n` is rounded up to a power of two (at least [`MIN_COMPLEX_LEN`]), so
    /// an odd request never leaves a table the strided readers cannot use.
    pub fn lookup(&self, n: usize) -> Arc<SineTable> {
        let size = n.max(MIN_COMPLEX_LEN).next_power_of_two();
        if let Some(table) = self.table.load_full() {
            if table.size() >= size {
                return table;
            }
        }

        let fresh = Arc::new(SineTable::new(size));
        let previous = self.table.rcu(|current| match current {
            Some(table) if table.size() >= size => Some(Arc::clone(table)),
            _ => Some(Arc::clone(&fresh)),
        });
        match previous {
            // another worker grew it first
            Some(table) if table.size() >= size => table,
            _ => {
                log::debug!("Sine table regenerated for transform size {size}");
                fresh
            }
        }
    }
}

fn check_len(n: usize, min: usize) -> CodecResult<()> {
    if n >= min && n.is_power_of_two() {
        Ok(())
    } else {
        Err(CodecError::InvalidFftSize { size: n, min })
    }
}

/// Complex and real FFT working in place on split real/imaginary buffers.
///
/// Cloning an engine shares its [`TrigCache`].
///
/// # Example
/// ```
/// use mg_dsp::fft::FftEngine;
/// let fft = FftEngine::new();
/// let mut re = vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
/// let mut im = vec![0.0; 8];
/// fft.fftr(&mut re, &mut im).unwrap();
/// assert!(re.iter().all(|&v| (v - 1.0).abs() < 1e-12));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FftEngine {
    cache: Arc<TrigCache>,
}

impl FftEngine {
    /// Engine with a private sine table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine reading a table shared with other engines.
    #[must_use]
    pub fn with_cache(cache: Arc<TrigCache>) -> Self {
        Self { cache }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<TrigCache> {
        &self.cache
    }

    /// Forward complex DFT in place (`exp(-2πi kn/N)` kernel, no scaling).
    ///
    /// # Errors
    /// `InvalidFftSize` unless the length is a power of two >= 4,
    /// `LengthMismatch` if `re` and `im` differ in length.
    pub fn fft(&self, re: &mut [f64], im: &mut [f64]) -> CodecResult<()> {
        let n = re.len();
        check_len(n, MIN_COMPLEX_LEN)?;
        CodecError::check_len("imaginary part", n, im.len())?;

        let table = self.cache.lookup(n);
        let mut stride = table.size() / n;

        // decimation in frequency
        let mut span = n;
        loop {
            let block = span;
            span /= 2;
            if span <= 1 {
                break;
            }
            let mut k = 0;
            for j in 0..span {
                let (s, c) = (table.sin(k), table.cos(k));
                for p in (j..n).step_by(block) {
                    let q = p + span;
                    let t1 = re[p] - re[q];
                    let t2 = im[p] - im[q];
                    re[p] += re[q];
                    im[p] += im[q];
                    re[q] = c * t1 + s * t2;
                    im[q] = c * t2 - s * t1;
                }
                k += stride;
            }
            stride += stride;
        }

        for p in (0..n).step_by(2) {
            let t1 = re[p] - re[p + 1];
            let t2 = im[p] - im[p + 1];
            re[p] += re[p + 1];
            im[p] += im[p + 1];
            re[p + 1] = t1;
            im[p + 1] = t2;
        }

        // bit reversal
        let mut j = 0;
        for i in 0..n - 1 {
            if i < j {
                re.swap(i, j);
                im.swap(i, j);
            }
            let mut k = n / 2;
            while k <= j {
                j -= k;
                k /= 2;
            }
            j += k;
        }

        Ok(())
    }

    /// Inverse complex DFT: conjugate, forward transform, then scale the real
    /// part by `1/N` and the imaginary part by `-1/N`.
    ///
    /// # Errors
    /// Same as [`FftEngine::fft`].
    pub fn ifft(&self, re: &mut [f64], im: &mut [f64]) -> CodecResult<()> {
        for v in im.iter_mut() {
            *v = -*v;
        }
        self.fft(re, im)?;
        scale(re, im);
        Ok(())
    }

    /// Forward DFT of the real sequence in `x`.
    ///
    /// On return `x` holds the real and `y` the imaginary part of all N bins
    /// (Hermitian, so bins `0..=N/2` carry the information). The previous
    /// contents of `y` are ignored.
    ///
    /// # Errors
    /// `InvalidFftSize` unless N is a power of two >= 8,
    /// `LengthMismatch` if `y` is not N long.
    pub fn fftr(&self, x: &mut [f64], y: &mut [f64]) -> CodecResult<()> {
        let n = x.len();
        check_len(n, MIN_REAL_LEN)?;
        CodecError::check_len("imaginary part", n, y.len())?;
        let half = n / 2;

        // table for N before the inner N/2 transform
        let table = self.cache.lookup(n);
        let stride = table.size() / n;

        // even samples as real part, odd samples as imaginary part
        for i in 0..half {
            x[i] = x[2 * i];
            y[i] = x[2 * i + 1];
        }
        self.fft(&mut x[..half], &mut y[..half])?;

        x[half] = x[0] - y[0];
        x[0] += y[0];
        y[0] = 0.0;
        y[half] = 0.0;

        for k in 1..half {
            let (s, c) = (table.sin(k * stride), table.cos(k * stride));
            let mirror = half - k;
            let yt = y[k] + y[mirror];
            let xt = x[k] - x[mirror];
            x[n - k] = (x[k] + x[mirror] + c * yt - s * xt) * 0.5;
            y[n - k] = (y[mirror] - y[k] + s * yt + c * xt) * 0.5;
        }

        for k in 1..half {
            x[k] = x[n - k];
            y[k] = -y[n - k];
        }

        Ok(())
    }

    /// Inverse of [`FftEngine::fftr`] for Hermitian spectra: forward real
    /// transform of `x`, real part scaled by `1/N`, imaginary part by `-1/N`.
    ///
    /// # Errors
    /// Same as [`FftEngine::fftr`].
    pub fn ifftr(&self, x: &mut [f64], y: &mut [f64]) -> CodecResult<()> {
        self.fftr(x, y)?;
        scale(x, y);
        Ok(())
    }
}

fn scale(re: &mut [f64], im: &mut [f64]) {
    let n = re.len() as f64;
    for v in re.iter_mut() {
        *v /= n;
    }
    for v in im.iter_mut() {
        *v /= -n;
    }
}
