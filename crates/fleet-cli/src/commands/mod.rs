//! CLI subcommand implementations.

pub mod allocate;
pub mod distribute;
pub mod normalize;
pub mod report;
pub mod shifts;
