//! CLI subcommand implementations.

pub mod dump;
pub mod report;
pub mod status;
pub mod track;
pub mod util;
