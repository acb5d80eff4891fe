//! Command-line interface for building, querying, and inspecting saved
//! vector indexes.
//!
//! `build` ingests a text file of `id v1,v2,...` records, `query` runs a
//! nearest-neighbour search against a saved index, and `info` reports what a
//! saved index holds.

mod commands;
mod records;

pub use commands::{
    BuildCommand, Cli, CliError, Command, IndexInfo, InfoCommand, KindArg, MetricArg, Outcome,
    QueryCommand, render_outcome, run_cli,
};
pub use records::{Record, VectorArg, VectorParseError, parse_records};
