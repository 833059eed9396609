/*
[INPUT]:  Parsed `precog` subcommands
[OUTPUT]: Command handlers for the binary
[POS]:    CLI layer - command wiring
[UPDATE]: When adding or removing subcommands
*/

pub mod authenticate;
pub mod status;

pub use authenticate::run_authenticate;
pub use status::{run_logout, run_requirements, run_status};
