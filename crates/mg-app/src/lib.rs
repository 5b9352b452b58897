//! `mgcodec` command-line front end: argument parsing, raw matrix files and
//! the per-subcommand drivers over [`mg_dsp::batch`].

pub mod cli;
pub mod io;
pub mod pipeline;
