// stride_replay/src/lib.rs

// This module contains everything the `stride-replay` binary needs on top of
// the pure `stride_core` library.
pub mod cli;
pub mod config;
pub mod serde_helpers;
