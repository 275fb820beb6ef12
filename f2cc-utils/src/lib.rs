//! Shared utilities for the f2cc compiler: identifiers, source positions,
//! output streams, and the error taxonomy used across every stage from
//! the frontend through the synthesizer.
mod config;
mod errors;
mod id;
mod out_file;
mod pos_string;
mod position;

pub use config::{Config, Target};
pub use errors::{Error, ErrorKind, F2ccResult};
pub use id::{GSym, GetName, Id};
pub use out_file::OutputFile;
pub use pos_string::PosString;
pub use position::{
    FileIdx, GPosIdx, GlobalPositionTable, PosIdx, PositionTable, WithPos,
};
