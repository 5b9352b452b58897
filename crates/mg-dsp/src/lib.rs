//! Mel-generalized cepstral codec engine.
//!
//! Leaves first:
//! - [`fft`] - radix-2 complex/real FFT over a shared, growable sine table
//! - [`solver`] - Toeplitz-plus-Hankel solver for the Newton normal equations
//! - [`cepstrum`] - frequency warping, gain normalization, gc2gc
//! - [`mcep`] - mel-cepstral analysis of one spectrum frame
//! - [`mgc`] - mgc2mgc re-parameterization and mgc2sp reconstruction
//! - [`batch`] - frame-parallel encoding/decoding of whole utterances
//!
//! Every workspace object ([`MelCepstrumAnalyzer`], [`MgcConverter`],
//! [`solver::ToeplitzHankelSolver`], [`cepstrum::WarpScratch`]) keeps grow-only
//! buffers, so one instance per worker thread is all the state there is.

pub mod batch;
pub mod cepstrum;
pub mod error;
pub mod fft;
pub mod mcep;
pub mod mgc;
mod scratch;
pub mod solver;

pub use error::{CodecError, CodecResult};
pub use fft::{FftEngine, TrigCache};
pub use mcep::{Convergence, McepOptions, MelCepstrumAnalyzer};
pub use mgc::{CepstralBasis, MgcConverter};
