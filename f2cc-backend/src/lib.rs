//! The Synthesizer (§4.4): turns a validated, ModelModifier-transformed
//! [`f2cc_ir::ProcessNetwork`] into a schedule-ordered C/CUDA-C
//! translation unit. Modules roughly mirror the eleven synthesis steps,
//! grouped by concern rather than kept one-module-per-step.

pub mod boundary;
pub mod codegen;
pub mod delay;
pub mod emit;
pub mod rename;
pub mod scheduler;
pub mod signal_set;
pub mod synth;
pub mod types;
pub mod wrap;

pub use emit::CodeSet;
pub use scheduler::schedule;
pub use signal_set::SignalSet;
pub use synth::synthesize;
