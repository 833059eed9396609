/*
[INPUT]:  Public API exports for the precog CLI crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point shared by the binary and tests
[UPDATE]: When adding new modules or public exports
*/

pub mod config;

pub use config::{PrecogConfig, expand_tilde};
