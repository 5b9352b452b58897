//! Toeplitz-plus-Hankel linear solver.
//!
//! Solves `A a = b` with `A[i][j] = t[|i - j|] + h[i + j]`, `t` of length n and
//! `h` of length 2n - 1. Pairing unknown `i` with unknown `n - 1 - i` turns
//! the system into a 2x2 block Toeplitz one,
//!
//! ```text
//! R(k) = | t[|k|]       h[n - 1 + k] |
//!        | h[n - 1 - k] t[|k|]       |
//! ```
//!
//! which a block Levinson recursion solves in O(n²). `R(-k)` is `R(k)` with
//! rows and columns swapped, so only `R(0..n)` is stored.

use crate::error::{CodecError, CodecResult};
use crate::scratch::ensure_len;

/// Pivot tolerance used when the caller passes a negative one.
pub const DEFAULT_PIVOT_EPS: f64 = 1.0e-6;

/// Row-major 2x2 matrix.
type Block = [f64; 4];
type Pair = [f64; 2];

const IDENTITY: Block = [1.0, 0.0, 0.0, 1.0];

#[inline(always)]
fn mm_mul(x: &Block, y: &Block) -> Block {
    [
        x[0] * y[0] + x[1] * y[2],
        x[0] * y[1] + x[1] * y[3],
        x[2] * y[0] + x[3] * y[2],
        x[2] * y[1] + x[3] * y[3],
    ]
}

#[inline(always)]
fn mv_mul(x: &Block, y: &Pair) -> Pair {
    [x[0] * y[0] + x[1] * y[1], x[2] * y[0] + x[3] * y[1]]
}

/// `J x J` with `J` the 2x2 exchange matrix.
#[inline(always)]
fn cross(x: &Block) -> Block {
    [x[3], x[2], x[1], x[0]]
}

fn inverse(x: &Block, eps: f64, order: usize) -> CodecResult<Block> {
    let det = x[0] * x[3] - x[1] * x[2];
    if det.abs() <= eps || !det.is_finite() {
        return Err(CodecError::SingularSystem { order });
    }
    Ok([x[3] / det, -x[1] / det, -x[2] / det, x[0] / det])
}

/// Reusable workspace for the block Levinson recursion.
///
/// Buffers grow to the largest order solved so far and are reused afterwards.
///
/// # Example
/// ```
/// use mg_dsp::solver::ToeplitzHankelSolver;
/// // [[4, 1], [1, 4]] + [[1, 0], [0, 0]] (h = [1, 0, 0])
/// let mut solver = ToeplitzHankelSolver::default();
/// let mut a = [0.0; 2];
/// solver.solve(&[4.0, 1.0], &[1.0, 0.0, 0.0], &[6.0, 5.0], 0.0, &mut a).unwrap();
/// assert!((a[0] - 1.0).abs() < 1e-12 && (a[1] - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Default, Clone)]
pub struct ToeplitzHankelSolver {
    r: Vec<Block>,
    x: Vec<Block>,
    xx: Vec<Block>,
    p: Vec<Pair>,
}

impl ToeplitzHankelSolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve for `a` (first `t.len()` entries written).
    ///
    /// A pivot whose determinant magnitude is at most `eps` counts as zero, so
    /// `eps = 0.0` still rejects an exactly singular pivot; a negative value
    /// selects [`DEFAULT_PIVOT_EPS`].
    ///
    /// # Errors
    /// `SingularSystem` if any pivot vanishes, `LengthMismatch` if the
    /// sequences do not describe an order-n system.
    pub fn solve(
        &mut self,
        t: &[f64],
        h: &[f64],
        b: &[f64],
        eps: f64,
        a: &mut [f64],
    ) -> CodecResult<()> {
        let n = t.len();
        if n == 0 {
            return Err(CodecError::invalid_param("t", "system order must be >= 1"));
        }
        CodecError::check_len("hankel sequence", 2 * n - 1, h.len())?;
        CodecError::check_len("right-hand side", n, b.len())?;
        if a.len() < n {
            return Err(CodecError::LengthMismatch {
                what: "solution",
                expected: n,
                got: a.len(),
            });
        }
        let eps = if eps < 0.0 { DEFAULT_PIVOT_EPS } else { eps };

        ensure_len(&mut self.r, n);
        ensure_len(&mut self.x, n);
        ensure_len(&mut self.xx, n);
        ensure_len(&mut self.p, n);
        let Self { r, x, xx, p } = self;

        for (i, block) in r.iter_mut().take(n).enumerate() {
            *block = [t[i], h[n - 1 + i], h[n - 1 - i], t[i]];
        }

        // order 1
        x[0] = IDENTITY;
        p[0] = mv_mul(&inverse(&r[0], eps, 0)?, &[b[0], b[n - 1]]);
        let mut vx = r[0];

        for i in 1..n {
            // error of the forward vector extended by one block
            let mut ex = [0.0; 4];
            for j in 0..i {
                let prod = mm_mul(&r[i - j], &x[j]);
                for (e, v) in ex.iter_mut().zip(prod) {
                    *e += v;
                }
            }
            let mut ep = [0.0; 2];
            for j in 0..i {
                let prod = mv_mul(&r[i - j], &p[j]);
                ep[0] += prod[0];
                ep[1] += prod[1];
            }

            let bx = mm_mul(&inverse(&cross(&vx), eps, i)?, &ex);

            // forward vector update against the previous backward vector
            for j in 1..i {
                let s = mm_mul(&cross(&xx[i - j]), &bx);
                for (v, d) in x[j].iter_mut().zip(s) {
                    *v -= d;
                }
            }
            xx[1..i].copy_from_slice(&x[1..i]);
            let tail = bx.map(|v| -v);
            x[i] = tail;
            xx[i] = tail;

            let s = mm_mul(&cross(&ex), &bx);
            for (v, d) in vx.iter_mut().zip(s) {
                *v -= d;
            }

            let residual = [b[i] - ep[0], b[n - 1 - i] - ep[1]];
            let g = mv_mul(&inverse(&cross(&vx), eps, i)?, &residual);

            for j in 0..i {
                let s = mv_mul(&cross(&x[i - j]), &g);
                p[j][0] += s[0];
                p[j][1] += s[1];
            }
            p[i] = g;
        }

        for (dst, pair) in a.iter_mut().zip(p.iter()).take(n) {
            *dst = pair[0];
        }
        Ok(())
    }
}

/// One-shot solve with a temporary workspace.
///
/// # Errors
/// Same as [`ToeplitzHankelSolver::solve`].
pub fn solve_toeplitz_hankel(t: &[f64], h: &[f64], b: &[f64], eps: f64) -> CodecResult<Vec<f64>> {
    let mut a = vec![0.0; t.len()];
    ToeplitzHankelSolver::new().solve(t, h, b, eps, &mut a)?;
    Ok(a)
}
