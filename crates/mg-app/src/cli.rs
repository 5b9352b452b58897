use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mg_core::config::InputFormat;

/// mgcodec: mel-generalized cepstral coding of vocoder spectra.
#[derive(Parser, Debug)]
#[command(name = "mgcodec", version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML (sections [analysis] et [synthesis]).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze raw f64 frames into f32 mel-cepstral coefficients.
    Mcep(McepArgs),
    /// Convert f32 coefficients between (alpha, gamma, order) bases.
    Mgc2mgc(Mgc2mgcArgs),
    /// Rebuild f32 log-magnitude half spectra from coefficients.
    Mgc2sp(Mgc2spArgs),
}

#[derive(Args, Debug)]
pub struct McepArgs {
    /// Little-endian f64 frames.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Little-endian f32 coefficients, frame-major.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Values per input frame (flng, or flng/2+1 for half spectra).
    #[arg(long)]
    pub bins: usize,

    #[arg(long)]
    pub order: Option<usize>,

    #[arg(long, allow_negative_numbers = true)]
    pub alpha: Option<f64>,

    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Constant added to every periodogram bin.
    #[arg(long, conflicts_with = "floor_db")]
    pub floor_add: Option<f64>,

    /// Floor relative to the frame peak, in dB (negative).
    #[arg(long, allow_negative_numbers = true)]
    pub floor_db: Option<f64>,

    #[arg(long)]
    pub min_iter: Option<usize>,

    #[arg(long)]
    pub max_iter: Option<usize>,

    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Treat frames as aperiodicity in [0, 1] and code them with the
    /// aperiodicity preset (`--order` + 1 coefficients).
    #[arg(long, conflicts_with_all = ["alpha", "format", "floor_add", "floor_db"])]
    pub aperiodicity: bool,
}

#[derive(Args, Debug)]
pub struct Mgc2mgcArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long)]
    pub order_in: usize,

    /// Defaults to `synthesis.alpha`.
    #[arg(long, allow_negative_numbers = true)]
    pub alpha_in: Option<f64>,

    /// Defaults to `synthesis.gamma`.
    #[arg(long, allow_negative_numbers = true)]
    pub gamma_in: Option<f64>,

    /// Defaults to `--order-in`.
    #[arg(long)]
    pub order_out: Option<usize>,

    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    pub alpha_out: f64,

    #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
    pub gamma_out: f64,
}

#[derive(Args, Debug)]
pub struct Mgc2spArgs {
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub output: PathBuf,

    #[arg(long)]
    pub order: usize,

    #[arg(long, allow_negative_numbers = true)]
    pub alpha: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub gamma: Option<f64>,

    #[arg(long)]
    pub fft_len: Option<usize>,
}

/// Command-line spelling of [`InputFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Windowed,
    Decibel,
    Log,
    Amplitude,
    Periodogram,
}

impl From<FormatArg> for InputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Windowed => Self::Windowed,
            FormatArg::Decibel => Self::Decibel,
            FormatArg::Log => Self::Log,
            FormatArg::Amplitude => Self::Amplitude,
            FormatArg::Periodogram => Self::Periodogram,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mcep_with_negative_values() {
        let cli = Cli::try_parse_from([
            "mgcodec", "-v", "mcep", "-i", "sp.f64", "-o", "mc.f32", "--bins", "513",
            "--alpha", "-0.2", "--floor-db", "-80", "--format", "decibel",
        ])
        .expect("arguments valides");
        assert!(cli.verbose);
        let Command::Mcep(args) = cli.command else {
            panic!("expected mcep");
        };
        assert_eq!(args.bins, 513);
        assert_eq!(args.alpha, Some(-0.2));
        assert_eq!(args.floor_db, Some(-80.0));
        assert_eq!(args.format.map(InputFormat::from), Some(InputFormat::Decibel));
    }

    #[test]
    fn floors_are_exclusive() {
        let err = Cli::try_parse_from([
            "mgcodec", "mcep", "-i", "a", "-o", "b", "--bins", "9", "--floor-add", "1e-8",
            "--floor-db", "-60",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn aperiodicity_excludes_alpha() {
        let err = Cli::try_parse_from([
            "mgcodec", "mcep", "-i", "a", "-o", "b", "--bins", "513", "--aperiodicity",
            "--alpha", "0.5",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn global_config_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mgcodec", "mgc2sp", "-i", "mc.f32", "-o", "sp.f32", "--order", "24",
            "--config", "codec.toml",
        ])
        .expect("arguments valides");
        assert_eq!(cli.config, Some(PathBuf::from("codec.toml")));
        assert!(matches!(cli.command, Command::Mgc2sp(Mgc2spArgs { order: 24, .. })));
    }
}
