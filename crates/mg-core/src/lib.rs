//! Shared types for mgcodec: codec configuration and frame-major utterance matrices.

pub mod config;
pub mod frame;
