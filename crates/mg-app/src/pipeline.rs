//! Subcommand drivers: load, merge CLI overrides over the config, run the
//! batch engine, save.

use anyhow::{Context, Result};
use mg_core::config::{CodecConfig, Floor, check_alpha, check_gamma};
use mg_dsp::batch::{convert_coefficients, decode_spectra, encode_aperiodicity, encode_spectra};
use mg_dsp::{CepstralBasis, McepOptions, TrigCache};

use crate::cli::{McepArgs, Mgc2mgcArgs, Mgc2spArgs};
use crate::io::{load_f32, load_f64, save_f32};

/// Analysis options: `[analysis]` values, each replaced by its flag when given.
///
/// # Example
/// ```
/// use clap::Parser;
/// use mg_app::cli::{Cli, Command};
/// use mg_app::pipeline::analysis_options;
/// use mg_core::config::CodecConfig;
///
/// let cli = Cli::try_parse_from(["mgcodec", "mcep", "-i", "a", "-o", "b", "--bins", "513", "--order", "39"]).unwrap();
/// let Command::Mcep(args) = cli.command else { unreachable!() };
/// let options = analysis_options(&args, &CodecConfig::default());
/// assert_eq!(options.order, 39);
/// assert_eq!(options.alpha, 0.42);
/// ```
#[must_use]
pub fn analysis_options(args: &McepArgs, config: &CodecConfig) -> McepOptions {
    let mut options = McepOptions::from(&config.analysis);
    if let Some(order) = args.order {
        options.order = order;
    }
    if let Some(alpha) = args.alpha {
        options.alpha = alpha;
    }
    if let Some(format) = args.format {
        options.input = format.into();
    }
    if let Some(e) = args.floor_add {
        options.floor = Floor::Add(e);
    }
    if let Some(db) = args.floor_db {
        options.floor = Floor::RelativeDb(db);
    }
    if let Some(n) = args.min_iter {
        options.min_iter = n;
    }
    if let Some(n) = args.max_iter {
        options.max_iter = n;
    }
    if let Some(tolerance) = args.tolerance {
        options.tolerance = tolerance;
    }
    options
}

/// `mgcodec mcep`
///
/// # Errors
/// Returns an error on I/O failure or when any frame cannot be analyzed.
pub fn run_mcep(args: &McepArgs, config: &CodecConfig) -> Result<()> {
    let spectra = load_f64(&args.input, args.bins)?;
    let cache = TrigCache::shared();

    let encoded = if args.aperiodicity {
        let dims = args.order.unwrap_or(config.analysis.order) + 1;
        log::info!("Coding aperiodicity: {} frames into {dims} dims", spectra.num_frames());
        encode_aperiodicity(&spectra, dims, &cache)
    } else {
        let options = analysis_options(args, config);
        log::info!(
            "Mel-cepstral analysis: {} frames, order {}, alpha {}, {:?} input",
            spectra.num_frames(),
            options.order,
            options.alpha,
            options.input
        );
        encode_spectra(&spectra, &options, &cache)
    };
    let report = encoded.context("Analyse mel-cepstrale échouée")?;

    if report.exhausted() > 0 {
        log::warn!(
            "{} of {} frames stopped at the iteration limit",
            report.exhausted(),
            report.convergence.len()
        );
    }
    save_f32(&args.output, &report.coefficients)
}

/// `mgcodec mgc2mgc`
///
/// # Errors
/// Returns an error on I/O failure or an out-of-range basis.
pub fn run_mgc2mgc(args: &Mgc2mgcArgs, config: &CodecConfig) -> Result<()> {
    let from = CepstralBasis::new(
        args.alpha_in.unwrap_or(config.synthesis.alpha),
        args.gamma_in.unwrap_or(config.synthesis.gamma),
    );
    let to = CepstralBasis::new(args.alpha_out, args.gamma_out);
    check_basis("input", from)?;
    check_basis("output", to)?;
    let order_out = args.order_out.unwrap_or(args.order_in);

    let coefficients = load_f32(&args.input, args.order_in + 1)?;
    let converted = convert_coefficients(&coefficients, from, to, order_out)
        .context("Conversion des coefficients échouée")?;
    save_f32(&args.output, &converted)
}

/// `mgcodec mgc2sp`
///
/// # Errors
/// Returns an error on I/O failure, an out-of-range basis or a bad FFT length.
pub fn run_mgc2sp(args: &Mgc2spArgs, config: &CodecConfig) -> Result<()> {
    let basis = CepstralBasis::new(
        args.alpha.unwrap_or(config.synthesis.alpha),
        args.gamma.unwrap_or(config.synthesis.gamma),
    );
    check_basis("coefficient", basis)?;
    let fft_len = args.fft_len.unwrap_or(config.synthesis.fft_len);

    let coefficients = load_f32(&args.input, args.order + 1)?;
    let spectra = decode_spectra(&coefficients, basis, fft_len, &TrigCache::shared())
        .context("Reconstruction du spectre échouée")?;
    save_f32(&args.output, &spectra)
}

fn check_basis(which: &str, basis: CepstralBasis) -> Result<()> {
    check_alpha(&format!("{which} alpha"), basis.alpha)?;
    check_gamma(&format!("{which} gamma"), basis.gamma)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mg_core::config::InputFormat;
    use mg_core::frame::FrameMatrix;

    use super::*;
    use crate::io::write_f32_frames;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mgcodec-{}-{name}", std::process::id()))
    }

    fn mcep_args(input: PathBuf, output: PathBuf, bins: usize) -> McepArgs {
        McepArgs {
            input,
            output,
            bins,
            order: Some(12),
            alpha: None,
            format: None,
            floor_add: None,
            floor_db: None,
            min_iter: None,
            max_iter: None,
            tolerance: None,
            aperiodicity: false,
        }
    }

    #[test]
    fn flags_override_config() {
        let mut args = mcep_args(PathBuf::new(), PathBuf::new(), 129);
        args.floor_db = Some(-70.0);
        args.format = Some(crate::cli::FormatArg::Amplitude);
        args.max_iter = Some(50);
        let options = analysis_options(&args, &CodecConfig::default());
        assert_eq!(options.floor, Floor::RelativeDb(-70.0));
        assert_eq!(options.input, InputFormat::Amplitude);
        assert_eq!(options.max_iter, 50);
        assert_eq!(options.min_iter, 2);
    }

    #[test]
    fn encode_then_decode_files() {
        let bins = 129;
        let frames: Vec<f64> = (0..3)
            .flat_map(|f| (0..bins).map(move |i| 1.5 + (0.04 * (i + f) as f64).cos()))
            .collect();
        let spectra = scratch_path("spectra.f64");
        let mut bytes = Vec::new();
        for v in &frames {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        std::fs::write(&spectra, bytes).expect("écriture");

        let coeffs = scratch_path("mc.f32");
        run_mcep(&mcep_args(spectra.clone(), coeffs.clone(), bins), &CodecConfig::default())
            .expect("mcep");
        let mc = load_f32(&coeffs, 13).expect("coefficients");
        assert_eq!(mc.num_frames(), 3);

        let rebuilt = scratch_path("sp.f32");
        let args = Mgc2spArgs {
            input: coeffs.clone(),
            output: rebuilt.clone(),
            order: 12,
            alpha: None,
            gamma: None,
            fft_len: Some(256),
        };
        run_mgc2sp(&args, &CodecConfig::default()).expect("mgc2sp");
        let sp = load_f32(&rebuilt, 129).expect("spectres");
        assert_eq!(sp.num_frames(), 3);
        // log amplitude of the 1.5 + cos(.) periodogram at DC
        let want = 0.5 * frames[0].ln();
        assert!((sp.as_slice()[0] - want).abs() < 0.05, "{}", sp.as_slice()[0]);

        for path in [spectra, coeffs, rebuilt] {
            let _ = std::fs::remove_file(path);
        }
    }

    #[test]
    fn mgc2mgc_rejects_bad_gamma() {
        let input = scratch_path("gamma.f32");
        let m = FrameMatrix::from_vec(vec![0.1; 4], 4).expect("matrice");
        let mut bytes = Vec::new();
        write_f32_frames(&mut bytes, &m).expect("écriture");
        std::fs::write(&input, bytes).expect("écriture");

        let args = Mgc2mgcArgs {
            input: input.clone(),
            output: scratch_path("gamma-out.f32"),
            order_in: 3,
            alpha_in: None,
            gamma_in: None,
            order_out: None,
            alpha_out: 0.0,
            gamma_out: 0.4,
        };
        assert!(run_mgc2mgc(&args, &CodecConfig::default()).is_err());
        let _ = std::fs::remove_file(input);
    }
}
