//! Command implementations

mod dump;

pub use dump::{DumpOptions, dump_command};
