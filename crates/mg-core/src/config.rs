//! Configuration du codec, chargée depuis un fichier TOML.
//!
//! Every field has a default, so a config file only needs the values it changes:
//!
//! ```toml
//! [analysis]
//! alpha = 0.42
//! order = 24
//! input = "periodogram"
//! floor = { mode = "relative_db", value = -80.0 }
//!
//! [synthesis]
//! fft_len = 1024
//! ```

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Spectral representation of one analyzer input frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// Windowed time-domain samples; the periodogram is computed internally.
    Windowed,
    /// Amplitude in dB (20·log10).
    Decibel,
    /// Natural-log amplitude.
    Log,
    /// Linear amplitude.
    Amplitude,
    /// Power spectrum.
    Periodogram,
}

impl InputFormat {
    /// `true` for every format that already lives in the frequency domain.
    ///
    /// # Example
    /// ```
    /// use mg_core::config::InputFormat;
    /// assert!(!InputFormat::Windowed.is_spectral());
    /// assert!(InputFormat::Decibel.is_spectral());
    /// ```
    #[must_use]
    pub fn is_spectral(self) -> bool {
        !matches!(self, Self::Windowed)
    }

    /// Convert one spectral sample to a periodogram value.
    ///
    /// `Windowed` samples are not spectral values and are returned unchanged.
    #[inline]
    #[must_use]
    pub fn to_power(self, value: f64) -> f64 {
        match self {
            Self::Windowed | Self::Periodogram => value,
            Self::Decibel => {
                let amplitude = (value / 20.0 * std::f64::consts::LN_10).exp();
                amplitude * amplitude
            }
            Self::Log => {
                let amplitude = value.exp();
                amplitude * amplitude
            }
            Self::Amplitude => value * value,
        }
    }
}

/// Flooring applied to the periodogram before its logarithm is taken.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum Floor {
    /// No flooring: a zero or negative bin is an error.
    #[default]
    None,
    /// Constant added to every periodogram bin. Must be `>= 0`.
    Add(f64),
    /// Floor relative to the frame maximum, in dB. Must be `< 0`.
    RelativeDb(f64),
}

impl Floor {
    /// Sign and finiteness check for the floor value.
    ///
    /// # Example
    /// ```
    /// use mg_core::config::Floor;
    /// assert!(Floor::Add(1e-8).is_valid());
    /// assert!(!Floor::RelativeDb(3.0).is_valid());
    /// ```
    #[must_use]
    pub fn is_valid(self) -> bool {
        match self {
            Self::None => true,
            Self::Add(e) => e.is_finite() && e >= 0.0,
            Self::RelativeDb(e) => e.is_finite() && e < 0.0,
        }
    }
}

/// Parameters of the mel-cepstral analysis (encoder side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// All-pass warping coefficient, `|alpha| < 1`.
    pub alpha: f64,
    /// Cepstral order M; frames carry M+1 coefficients.
    pub order: usize,
    /// Representation of the incoming frames.
    pub input: InputFormat,
    /// Periodogram flooring.
    pub floor: Floor,
    /// Newton iterations run before convergence is checked.
    pub min_iter: usize,
    /// Upper bound on Newton iterations.
    pub max_iter: usize,
    /// Relative change of r(0) that counts as converged.
    pub tolerance: f64,
    /// Determinant magnitude under which the normal equations are singular.
    pub determinant_floor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.42,
            order: 24,
            input: InputFormat::Periodogram,
            floor: Floor::None,
            min_iter: 2,
            max_iter: 30,
            tolerance: 0.001,
            determinant_floor: 0.0,
        }
    }
}

/// Parameters of coefficient conversion and spectrum reconstruction (decoder side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Warping coefficient of the stored coefficients.
    pub alpha: f64,
    /// Gain exponent of the stored coefficients, `-1 <= gamma <= 0`.
    pub gamma: f64,
    /// Transform length used to rebuild spectra.
    pub fft_len: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            alpha: 0.42,
            gamma: 0.0,
            fft_len: 1024,
        }
    }
}

/// Top-level codec configuration.
///
/// # Example
/// ```
/// use mg_core::config::CodecConfig;
/// let config = CodecConfig::default();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub analysis: AnalysisConfig,
    pub synthesis: SynthesisConfig,
}

impl CodecConfig {
    /// Parse a configuration from TOML text and validate it.
    ///
    /// # Errors
    /// Returns an error on malformed TOML or out-of-range parameters.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Configuration TOML invalide")?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter range the engine relies on.
    ///
    /// # Errors
    /// Returns an error naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.synthesis.validate()
    }
}

impl AnalysisConfig {
    /// # Errors
    /// Returns an error naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        check_alpha("analysis.alpha", self.alpha)?;
        if !self.floor.is_valid() {
            bail!(
                "analysis.floor: {:?} (add floor must be >= 0, relative dB floor must be < 0)",
                self.floor
            );
        }
        if self.min_iter > self.max_iter {
            bail!(
                "analysis.min_iter ({}) exceeds analysis.max_iter ({})",
                self.min_iter,
                self.max_iter
            );
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            bail!("analysis.tolerance must be a non-negative number, got {}", self.tolerance);
        }
        Ok(())
    }
}

impl SynthesisConfig {
    /// # Errors
    /// Returns an error naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        check_alpha("synthesis.alpha", self.alpha)?;
        check_gamma("synthesis.gamma", self.gamma)?;
        if self.fft_len < 8 || !self.fft_len.is_power_of_two() {
            bail!(
                "synthesis.fft_len must be a power of two >= 8, got {}",
                self.fft_len
            );
        }
        Ok(())
    }
}

/// `|alpha| < 1` keeps the all-pass substitution stable.
///
/// # Errors
/// Returns an error when `alpha` is outside the open unit interval.
pub fn check_alpha(name: &str, alpha: f64) -> Result<()> {
    if alpha.is_nan() || alpha.abs() >= 1.0 {
        bail!("{name} must satisfy |alpha| < 1, got {alpha}");
    }
    Ok(())
}

/// # Errors
/// Returns an error when `gamma` is outside `[-1, 0]`.
pub fn check_gamma(name: &str, gamma: f64) -> Result<()> {
    if !(-1.0..=0.0).contains(&gamma) {
        bail!("{name} must lie in [-1, 0], got {gamma}");
    }
    Ok(())
}

/// Load and validate a configuration file.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> Result<CodecConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    let config = CodecConfig::from_toml(&text)
        .with_context(|| format!("Configuration rejetée: {}", path.display()))?;
    log::info!("Loaded codec configuration from {}", path.display());
    Ok(config)
}
